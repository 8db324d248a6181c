use crate::grpc::{
    ModelDescription as ProtoModelDescription, Prediction as ProtoPrediction,
    Prompt as ProtoPrompt, RankedClass as ProtoRankedClass, Video as ProtoVideo,
    classify_response,
};
use crate::mapping::{LabelMap, Video};
use crate::pipeline::{Outcome, Prediction};
use crate::profile::ModelProfile;
use crate::render::render_prediction;

pub fn convert_video(video: &Video) -> ProtoVideo {
    ProtoVideo {
        url: video.url.clone(),
        start_secs: video.start_secs,
    }
}

/// Converts a prediction to the gRPC message, keeping the `top_k` best
/// classes in the ranking (all of them when `top_k` is zero).
pub fn convert_prediction(
    profile: &ModelProfile,
    internal: &Prediction,
    top_k: usize,
) -> ProtoPrediction {
    let k = if top_k == 0 { internal.ranked.len() } else { top_k };
    let ranked = internal
        .top(k)
        .iter()
        .map(|class| ProtoRankedClass {
            class_id: class.class_id as u32,
            label: class.label.clone(),
            confidence: class.confidence,
        })
        .collect::<Vec<_>>();

    ProtoPrediction {
        class_id: internal.class_id as u32,
        label: internal.label.clone(),
        confidence: internal.confidence,
        description: internal.description.clone(),
        video: internal.video.as_ref().map(convert_video),
        probabilities: internal.probabilities.clone(),
        ranked,
        report: render_prediction(profile, internal),
    }
}

/// The prompt together with the profile's background text and idle video.
pub fn convert_prompt(profile: &ModelProfile, message: &str) -> ProtoPrompt {
    ProtoPrompt {
        message: message.to_string(),
        description: profile.description.clone(),
        idle_video: profile.idle_video.as_ref().map(convert_video),
    }
}

pub fn convert_outcome(
    profile: &ModelProfile,
    outcome: &Outcome,
    top_k: usize,
) -> classify_response::Outcome {
    match outcome {
        Outcome::Prompt(message) => {
            classify_response::Outcome::Prompt(convert_prompt(profile, message))
        }
        Outcome::Classified(prediction) => {
            classify_response::Outcome::Prediction(convert_prediction(profile, prediction, top_k))
        }
    }
}

pub fn convert_profile(profile: &ModelProfile, labels: &LabelMap) -> ProtoModelDescription {
    ProtoModelDescription {
        name: profile.name.clone(),
        title: profile.title.clone(),
        description: profile.description.clone(),
        input_shape: profile.input.shape().iter().map(|&d| d as u32).collect(),
        normalization: profile.normalization.as_str().to_string(),
        labels: labels.names().map(str::to_string).collect(),
        idle_video: profile.idle_video.as_ref().map(convert_video),
    }
}
