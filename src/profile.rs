//! Model profiles.
//!
//! A profile carries everything that differs between the bundled classifiers:
//! input geometry, the normalization the model was trained with, the ordered
//! label set and the static text shown alongside a result. The chess and
//! fashion classifiers are two instances of the same pipeline, distinguished
//! only by their profile.

use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

use crate::error::{ClassifyError, Result};
use crate::mapping::{LabelEntry, LabelMap, Video, load_class_mapping};

/// Memory order of the model input tensor.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[batch, height, width, channels]`, the Keras convention.
    #[default]
    Nhwc,
    /// `[batch, channels, height, width]`.
    Nchw,
}

/// Pixel intensity scaling applied once to every 8-bit sample.
///
/// This is a property of the trained model and has no default.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// `x / 127.5 - 1`, mapping to `[-1, 1]`.
    Symmetric,
    /// `x / 255`, mapping to `[0, 1]`.
    Unit,
    /// Samples are passed through as `0..=255`.
    Raw,
}

impl Normalization {
    #[inline]
    pub fn apply(self, sample: u8) -> f32 {
        let x = sample as f32;
        match self {
            Normalization::Symmetric => x / 127.5 - 1.0,
            Normalization::Unit => x / 255.0,
            Normalization::Raw => x,
        }
    }

    /// Inclusive output range.
    pub fn range(self) -> (f32, f32) {
        match self {
            Normalization::Symmetric => (-1.0, 1.0),
            Normalization::Unit => (0.0, 1.0),
            Normalization::Raw => (0.0, 255.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Normalization::Symmetric => "symmetric",
            Normalization::Unit => "unit",
            Normalization::Raw => "raw",
        }
    }
}

/// Resampling filter used by fit-and-crop.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    Bilinear,
    /// Catmull-Rom cubic.
    Bicubic,
    #[default]
    Lanczos3,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InputSpec {
    pub height: u32,
    pub width: u32,
    /// 3 for RGB, 1 for grayscale.
    pub channels: usize,
    #[serde(default)]
    pub layout: TensorLayout,
    #[serde(default)]
    pub resize: ResizeFilter,
}

impl InputSpec {
    /// Full batch-of-one tensor shape in the configured layout.
    pub fn shape(&self) -> [usize; 4] {
        let (h, w, c) = (self.height as usize, self.width as usize, self.channels);
        match self.layout {
            TensorLayout::Nhwc => [1, h, w, c],
            TensorLayout::Nchw => [1, c, h, w],
        }
    }

    fn validate(&self) -> Result<()> {
        if self.height == 0 || self.width == 0 {
            return Err(ClassifyError::config(format!(
                "input size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !matches!(self.channels, 1 | 3) {
            return Err(ClassifyError::config(format!(
                "input channels must be 1 or 3, got {}",
                self.channels
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct OutputSpec {
    /// Set when the model emits logits rather than probabilities.
    #[serde(default)]
    pub softmax: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelProfile {
    pub name: String,
    /// Page heading.
    pub title: String,
    /// Prefix for the result line, e.g. "Detected Piece".
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Background paragraph about the domain.
    #[serde(default)]
    pub description: String,
    /// Model file, relative paths resolve against the profile file.
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    pub input: InputSpec,
    pub normalization: Normalization,
    #[serde(default)]
    pub output: OutputSpec,
    /// Shown while no image has been uploaded.
    #[serde(default)]
    pub idle_video: Option<Video>,
    #[serde(default)]
    pub labels: Vec<LabelEntry>,
    /// Alternative to inline `labels`: one class name per line.
    #[serde(default)]
    pub labels_file: Option<PathBuf>,
}

fn default_subject() -> String {
    "Prediction".to_string()
}

const CHESS_VIDEO_LIST: &str = "list=PL-qLOQ-OEls6ywMwN8sTJ7k7gRd2f5tO4";

impl ModelProfile {
    /// Six-way chess piece classifier, 224x224 RGB, inputs in `[-1, 1]`.
    pub fn chess() -> Self {
        let video = |id: &str, index: u32| {
            Video::new(format!(
                "https://www.youtube.com/watch?v={id}&{CHESS_VIDEO_LIST}&index={index}"
            ))
        };
        Self {
            name: "chess".to_string(),
            title: "Chess Piece Identification".to_string(),
            subject: "Detected Piece".to_string(),
            description: "A two-player strategy board game played on a checkered board, \
                where each player starts with sixteen pieces. The pieces are moved and used \
                to capture the opponent's pieces following specific rules."
                .to_string(),
            model_path: Some(PathBuf::from("chess_model.onnx")),
            input: InputSpec {
                height: 224,
                width: 224,
                channels: 3,
                layout: TensorLayout::Nhwc,
                resize: ResizeFilter::Lanczos3,
            },
            normalization: Normalization::Symmetric,
            output: OutputSpec::default(),
            idle_video: Some(Video::new(
                "https://www.youtube.com/watch?v=PSzQw1AnvCE&t=0s",
            )),
            labels: vec![
                LabelEntry::new(
                    "Bishop",
                    "The bishop moves diagonally any number of squares. It is particularly \
                     powerful on open diagonals.",
                )
                .with_video(video("_y3eA21rD1w", 4)),
                LabelEntry::new(
                    "King",
                    "The king moves one square in any direction. It is the most important \
                     piece, as the game is won by checkmating the king.",
                )
                .with_video(
                    Video::new(format!("https://youtu.be/ZWjDKiHBvZo?{CHESS_VIDEO_LIST}&t=27"))
                        .starting_at(27),
                ),
                LabelEntry::new(
                    "Knight",
                    "The knight moves in an L-shape: two squares in one direction and then \
                     one square perpendicular to that. It can jump over other pieces.",
                )
                .with_video(video("VGoT8FR0O_8", 5)),
                LabelEntry::new(
                    "Pawn",
                    "The pawn moves forward one square, but captures diagonally. On its \
                     first move, it can advance two squares.",
                )
                .with_video(video("00uUlbcPz5E", 6)),
                LabelEntry::new(
                    "Queen",
                    "The queen moves any number of squares in any direction: horizontally, \
                     vertically, or diagonally. It is the most powerful piece.",
                )
                .with_video(video("vwgwI0wnULU", 2)),
                LabelEntry::new(
                    "Rook",
                    "The rook moves any number of squares horizontally or vertically. It is \
                     especially powerful on open files and ranks.",
                )
                .with_video(video("PlgnoYqsK-8", 3)),
            ],
            labels_file: None,
        }
    }

    /// Ten-way clothing classifier, 28x28 grayscale, inputs in `[0, 1]`.
    pub fn fashion() -> Self {
        let labels = [
            "T-shirt",
            "Top",
            "Pullover",
            "Dress",
            "Coat",
            "Sandal",
            "Shirt",
            "Sneaker",
            "Bag",
            "Ankle Boot",
        ]
        .into_iter()
        .map(|name| LabelEntry::new(name, ""))
        .collect();

        Self {
            name: "fashion".to_string(),
            title: "Fashion Dataset".to_string(),
            subject: default_subject(),
            description: String::new(),
            model_path: Some(PathBuf::from("saved_fashion.onnx")),
            input: InputSpec {
                height: 28,
                width: 28,
                channels: 1,
                layout: TensorLayout::Nhwc,
                resize: ResizeFilter::Bicubic,
            },
            normalization: Normalization::Unit,
            output: OutputSpec::default(),
            idle_video: None,
            labels,
            labels_file: None,
        }
    }

    /// Built-in profile by name, or a TOML profile file by path.
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        match name_or_path {
            "chess" => Ok(Self::chess()),
            "fashion" => Ok(Self::fashion()),
            path => Self::load_from_path(path),
        }
    }

    /// Loads and validates a profile file. Relative `model_path` and
    /// `labels_file` entries are resolved against the file's directory.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut profile: Self = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        profile.model_path = profile.model_path.map(|p| rebase(base, p));
        profile.labels_file = profile.labels_file.map(|p| rebase(base, p));
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<()> {
        self.input.validate()?;
        if self.labels.is_empty() && self.labels_file.is_none() {
            return Err(ClassifyError::config(format!(
                "profile `{}` defines neither `labels` nor `labels_file`",
                self.name
            )));
        }
        if !self.labels.is_empty() && self.labels_file.is_some() {
            return Err(ClassifyError::config(format!(
                "profile `{}` defines both `labels` and `labels_file`",
                self.name
            )));
        }
        Ok(())
    }

    /// Builds the ordered label set, reading `labels_file` when labels are not inline.
    pub fn label_map(&self) -> Result<LabelMap> {
        match &self.labels_file {
            Some(file) if self.labels.is_empty() => LabelMap::new(load_class_mapping(file)?),
            _ => LabelMap::new(self.labels.clone()),
        }
    }
}

fn rebase(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_profiles_are_valid() {
        for profile in [ModelProfile::chess(), ModelProfile::fashion()] {
            profile.validate().unwrap();
            profile.label_map().unwrap();
        }
    }

    #[test]
    fn chess_matches_training_order() {
        let chess = ModelProfile::chess();
        let names: Vec<_> = chess.labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Bishop", "King", "Knight", "Pawn", "Queen", "Rook"]);
        assert_eq!(chess.input.shape(), [1, 224, 224, 3]);
        assert_eq!(chess.normalization, Normalization::Symmetric);
        assert!(chess.labels.iter().all(|l| l.video.is_some()));
        assert_eq!(chess.labels[1].video.as_ref().unwrap().start_secs, 27);
    }

    #[test]
    fn fashion_is_single_channel() {
        let fashion = ModelProfile::fashion();
        assert_eq!(fashion.labels.len(), 10);
        assert_eq!(fashion.labels[7].name, "Sneaker");
        assert_eq!(fashion.input.shape(), [1, 28, 28, 1]);
        assert_eq!(fashion.input.resize, ResizeFilter::Bicubic);
        assert_eq!(fashion.normalization, Normalization::Unit);
    }

    #[test]
    fn normalization_maps_endpoints() {
        assert_eq!(Normalization::Symmetric.apply(0), -1.0);
        assert_eq!(Normalization::Symmetric.apply(255), 1.0);
        assert_eq!(Normalization::Unit.apply(0), 0.0);
        assert_eq!(Normalization::Unit.apply(255), 1.0);
        assert_eq!(Normalization::Raw.apply(200), 200.0);
    }

    #[test]
    fn nchw_layout_moves_channels_first() {
        let input = InputSpec {
            height: 32,
            width: 64,
            channels: 3,
            layout: TensorLayout::Nchw,
            resize: ResizeFilter::default(),
        };
        assert_eq!(input.shape(), [1, 3, 32, 64]);
    }

    #[test]
    fn rejects_unsupported_channel_count() {
        let mut profile = ModelProfile::fashion();
        profile.input.channels = 4;
        assert!(matches!(profile.validate(), Err(ClassifyError::Config { .. })));
    }

    #[test]
    fn loads_profile_from_toml() {
        let dir = std::env::temp_dir().join(format!("profile-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("digits.toml");
        {
            let mut f = std::fs::File::create(&path).unwrap();
            write!(
                f,
                r#"
name = "digits"
title = "Digits"
model_path = "digits.onnx"
normalization = "unit"

[input]
height = 28
width = 28
channels = 1

[[labels]]
name = "zero"

[[labels]]
name = "one"
description = "A single stroke."
"#
            )
            .unwrap();
        }

        let profile = ModelProfile::load_from_path(&path).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(profile.subject, "Prediction");
        assert_eq!(profile.input.layout, TensorLayout::Nhwc);
        assert_eq!(profile.input.resize, ResizeFilter::Lanczos3);
        assert_eq!(profile.model_path, Some(dir.join("digits.onnx")));
        assert_eq!(profile.labels[1].description, "A single stroke.");
    }

    #[test]
    fn shipped_profiles_match_builtins() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");

        let chess = ModelProfile::load_from_path(dir.join("chess.toml")).unwrap();
        let builtin = ModelProfile::chess();
        assert_eq!(chess.labels, builtin.labels);
        assert_eq!(chess.description, builtin.description);
        assert_eq!(chess.idle_video, builtin.idle_video);
        assert_eq!(chess.input, builtin.input);

        let fashion = ModelProfile::load_from_path(dir.join("fashion.toml")).unwrap();
        let loaded: Vec<String> = fashion.label_map().unwrap().names().map(String::from).collect();
        let expected: Vec<String> = ModelProfile::fashion()
            .labels
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(loaded, expected);
        assert_eq!(fashion.input, ModelProfile::fashion().input);
        assert_eq!(fashion.normalization, Normalization::Unit);
    }

    #[test]
    fn normalization_is_required() {
        let dir = std::env::temp_dir().join(format!("profile-nonorm-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("p.toml");
        std::fs::write(
            &path,
            "name = \"x\"\ntitle = \"x\"\n[input]\nheight = 2\nwidth = 2\nchannels = 1\n[[labels]]\nname = \"a\"\n",
        )
        .unwrap();
        let result = ModelProfile::load_from_path(&path);
        std::fs::remove_dir_all(&dir).ok();
        assert!(result.is_err());
    }
}
