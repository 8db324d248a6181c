//! Plain-text rendering of results for terminals and response bodies.

use std::fmt::Write;

use crate::mapping::Video;
use crate::pipeline::{Outcome, Prediction};
use crate::profile::ModelProfile;

/// Confidence as a percentage with two decimals, e.g. `97.31 %`.
pub fn format_confidence(confidence: f32) -> String {
    format!("{:.2} %", confidence * 100.0)
}

pub fn format_video(video: &Video) -> String {
    if video.start_secs > 0 {
        format!("{} (from {}s)", video.url, video.start_secs)
    } else {
        video.url.clone()
    }
}

/// Result block: detected label, confidence, description and video link.
pub fn render_prediction(profile: &ModelProfile, prediction: &Prediction) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}: {}", profile.subject, prediction.label);
    let _ = writeln!(out, "Confidence : {}", format_confidence(prediction.confidence));
    if !prediction.description.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "# Information about {}", prediction.label);
        let _ = writeln!(out, "{}", prediction.description);
    }
    if let Some(video) = &prediction.video {
        let _ = writeln!(out);
        let _ = writeln!(out, "Video: {}", format_video(video));
    }
    out
}

/// Adds the `k` best classes below the main result.
pub fn render_ranking(prediction: &Prediction, k: usize) -> String {
    let mut out = String::new();
    for (rank, class) in prediction.top(k).iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. {:<12} {:>9}",
            rank + 1,
            class.label,
            format_confidence(class.confidence)
        );
    }
    out
}

/// Prompt followed by the profile's background text and idle video.
pub fn render_prompt(profile: &ModelProfile, message: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{message}");
    if !profile.description.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", profile.description);
    }
    if let Some(video) = &profile.idle_video {
        let _ = writeln!(out);
        let _ = writeln!(out, "Video: {}", format_video(video));
    }
    out
}

pub fn render_outcome(profile: &ModelProfile, outcome: &Outcome) -> String {
    match outcome {
        Outcome::Prompt(message) => render_prompt(profile, message),
        Outcome::Classified(prediction) => render_prediction(profile, prediction),
    }
}

/// Heading, background text and label list for a profile.
pub fn render_profile(profile: &ModelProfile, labels: &[&str]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", profile.title);
    if !profile.description.is_empty() {
        let _ = writeln!(out, "{}", profile.description);
    }
    let _ = writeln!(
        out,
        "input: {:?} ({}), {} classes",
        profile.input.shape(),
        profile.normalization.as_str(),
        labels.len()
    );
    for (id, label) in labels.iter().enumerate() {
        let _ = writeln!(out, "{id:>3}  {label}");
    }
    if let Some(video) = &profile.idle_video {
        let _ = writeln!(out, "Video: {}", format_video(video));
    }
    out
}
