//! Semantic classifier seam
//!
//! The detector's keyword pass is always available; a semantic classifier
//! is an optional collaborator plugged in behind this trait. Every call is
//! made with a bounded timeout and the detector degrades to keyword-only
//! matching when the classifier is slow, failing, or absent — degradation
//! is a fallback, not an error path.

use async_trait::async_trait;

use crate::error::DetectorError;

/// A label the classifier recognized in a message.
#[derive(Debug, Clone)]
pub struct SemanticMatch {
    /// Trigger type name as configured in the behavior definition
    pub label: String,
    /// Classifier confidence in [0,1]
    pub confidence: f64,
}

/// Async seam for an external semantic trigger classifier.
#[async_trait]
pub trait SemanticClassifier: Send + Sync {
    /// Classifies a message against the given candidate trigger labels.
    ///
    /// Returning an empty vector is success, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DetectorError`] when the classifier backend is
    /// unavailable; callers must treat this as a signal to degrade, never
    /// to fail message processing.
    async fn classify(
        &self,
        text: &str,
        labels: &[String],
    ) -> Result<Vec<SemanticMatch>, DetectorError>;
}

/// Minimum confidence for a classifier match to produce a trigger event.
pub const CONFIDENCE_THRESHOLD: f64 = 0.5;
