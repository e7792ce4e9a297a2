//! Threshold/priority policy deciding how a query is answered.
//!
//! Modes are tried in a fixed order and each condition is a chain of `>=`
//! comparisons, so equal scores resolve to the earlier mode
//! (title, then filename, then content). This is not a max-score rule: a
//! title score that clears its threshold but trails the content score loses
//! the title branch even when it beats the filename score.

use serde::{Deserialize, Serialize};

use crate::{
    application::errors::{AppError, AppResult},
    domain::{LayerScores, RetrievalMode},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub title: f32,
    pub filename: f32,
    pub content: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            title: 0.65,
            filename: 0.60,
            content: 0.55,
        }
    }
}

impl Thresholds {
    /// Every threshold must sit in `(0, 1]`; a zero threshold would select a
    /// mode for a layer that returned nothing.
    pub fn validate(&self) -> AppResult<()> {
        for (name, value) in [
            ("title", self.title),
            ("filename", self.filename),
            ("content", self.content),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(AppError::Validation(format!(
                    "{name} threshold must be in (0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

pub fn select_mode(scores: &LayerScores, thresholds: &Thresholds) -> RetrievalMode {
    let LayerScores {
        title,
        filename,
        content,
    } = *scores;
    if title >= thresholds.title && title >= filename && title >= content {
        RetrievalMode::Title
    } else if filename >= thresholds.filename && filename >= content {
        RetrievalMode::Filename
    } else if content >= thresholds.content {
        RetrievalMode::Content
    } else {
        RetrievalMode::NoStrongMatch
    }
}
