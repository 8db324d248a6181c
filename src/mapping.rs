use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;

use crate::error::{ClassifyError, Result};

/// Illustrative video shown next to a result.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Video {
    pub url: String,
    /// Playback offset in seconds.
    #[serde(default)]
    pub start_secs: u32,
}

impl Video {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            start_secs: 0,
        }
    }

    pub fn starting_at(mut self, start_secs: u32) -> Self {
        self.start_secs = start_secs;
        self
    }
}

/// One class of the model output, in training order.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LabelEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub video: Option<Video>,
}

impl LabelEntry {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            video: None,
        }
    }

    pub fn with_video(mut self, video: Video) -> Self {
        self.video = Some(video);
        self
    }
}

/// Ordered label set. Index `i` names the `i`-th score of the classifier output.
#[derive(Debug, Clone)]
pub struct LabelMap {
    entries: Vec<LabelEntry>,
}

impl LabelMap {
    pub fn new(entries: Vec<LabelEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(ClassifyError::config("label set is empty"));
        }
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.name.trim().is_empty() {
                return Err(ClassifyError::config("label names must not be blank"));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(ClassifyError::config(format!(
                    "duplicate label `{}`",
                    entry.name
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, class_id: usize) -> Option<&LabelEntry> {
        self.entries.get(class_id)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Fails unless the classifier emits exactly one score per label.
    pub fn ensure_width(&self, outputs: usize) -> Result<()> {
        if outputs != self.entries.len() {
            return Err(ClassifyError::LabelMismatch {
                labels: self.entries.len(),
                outputs,
            });
        }
        Ok(())
    }
}

/// Reads a label file with one class name per line. Line order is class order;
/// blank lines are skipped.
pub fn load_class_mapping<P: AsRef<Path>>(file_path: P) -> Result<Vec<LabelEntry>> {
    let file = File::open(file_path.as_ref())?;
    let reader = BufReader::new(file);

    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let name = line.trim();
        if !name.is_empty() {
            entries.push(LabelEntry::new(name, ""));
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn entries(names: &[&str]) -> Vec<LabelEntry> {
        names.iter().map(|n| LabelEntry::new(*n, "")).collect()
    }

    #[test]
    fn rejects_empty_and_duplicate_sets() {
        assert!(LabelMap::new(Vec::new()).is_err());
        assert!(LabelMap::new(entries(&["Pawn", "Pawn"])).is_err());
        assert!(LabelMap::new(entries(&["Pawn", " "])).is_err());
    }

    #[test]
    fn width_must_match_exactly() {
        let map = LabelMap::new(entries(&["Bishop", "King", "Knight"])).unwrap();
        assert!(map.ensure_width(3).is_ok());
        match map.ensure_width(4) {
            Err(ClassifyError::LabelMismatch { labels, outputs }) => {
                assert_eq!((labels, outputs), (3, 4));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn label_file_is_zero_based_and_skips_blanks() {
        let path = std::env::temp_dir().join(format!("labels-{}.txt", std::process::id()));
        {
            let mut f = File::create(&path).unwrap();
            writeln!(f, "Bag\n\n  Sneaker  \nCoat").unwrap();
        }
        let loaded = load_class_mapping(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let names: Vec<_> = loaded.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Bag", "Sneaker", "Coat"]);
    }
}
