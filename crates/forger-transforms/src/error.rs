//! Error types for transform operations.
//!
//! Every failure is a deterministic validation failure surfaced to the
//! immediate caller; nothing is retried.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for transform operations.
#[derive(Error, Debug)]
pub enum TransformError {
    /// Out-of-range or malformed parameter.
    #[error("Invalid parameter `{name}`: {message}")]
    InvalidParameter { name: String, message: String },

    /// A crop or pad window leaves the image.
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// A tuple's length disagrees with the image dimension, or image and
    /// mask sizes differ.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// An operation that needs a mask received none.
    #[error("Missing operand: {0}")]
    MissingOperand(String),

    /// A segment-constrained crop found none of the requested labels.
    #[error("Empty region: mask does not include any item from {}", join_labels(.labels))]
    EmptyRegion { labels: Vec<i64> },

    /// Path does not exist.
    #[error("Path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    /// A series directory holds more than one series.
    #[error("Ambiguous series: {count} series in {}", .path.display())]
    AmbiguousSeries { path: PathBuf, count: usize },

    /// A series directory holds no series.
    #[error("Empty series: no image series in {}", .0.display())]
    EmptySeries(PathBuf),

    /// Failure reported by an image backend collaborator.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

fn join_labels(labels: &[i64]) -> String {
    labels.iter().map(|l| l.to_string()).collect::<Vec<_>>().join(", ")
}

impl TransformError {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid region error.
    pub fn invalid_region(msg: impl Into<String>) -> Self {
        Self::InvalidRegion(msg.into())
    }

    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(msg: impl Into<String>) -> Self {
        Self::DimensionMismatch(msg.into())
    }

    /// Create a missing operand error.
    pub fn missing_operand(msg: impl Into<String>) -> Self {
        Self::MissingOperand(msg.into())
    }

    /// Create a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Human-readable name of an axis, used in error messages.
pub fn axis_name(axis: usize) -> &'static str {
    match axis {
        0 => "width",
        1 => "height",
        2 => "depth",
        _ => "extent",
    }
}

/// Check that a tuple has one entry per image axis.
pub fn check_len<T>(what: &str, values: &[T], dimension: usize) -> Result<()> {
    if values.len() != dimension {
        return Err(TransformError::dimension_mismatch(format!(
            "length of {} ({}) should be the same as image dimension ({})",
            what,
            values.len(),
            dimension
        )));
    }
    Ok(())
}

/// Check that a probability lies in `[0, 1]`.
pub fn check_probability(p: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(TransformError::invalid_parameter(
            "p",
            format!("probability must be in [0.0, 1.0] (got {})", p),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TransformError::invalid_region("size + index cannot be greater than image size");
        assert!(matches!(err, TransformError::InvalidRegion(_)));
    }

    #[test]
    fn test_error_display() {
        let err = TransformError::invalid_parameter("p", "out of range");
        assert_eq!(err.to_string(), "Invalid parameter `p`: out of range");

        let err = TransformError::EmptyRegion { labels: vec![1, 3] };
        assert_eq!(err.to_string(), "Empty region: mask does not include any item from 1, 3");

        let err = TransformError::NotFound(PathBuf::from("/nowhere/image.nrrd"));
        assert_eq!(err.to_string(), "Path does not exist: /nowhere/image.nrrd");
    }

    #[test]
    fn test_check_helpers() {
        assert!(check_probability(0.0).is_ok());
        assert!(check_probability(1.0).is_ok());
        assert!(matches!(check_probability(1.5), Err(TransformError::InvalidParameter { .. })));
        assert!(matches!(check_probability(f64::NAN), Err(TransformError::InvalidParameter { .. })));
        assert!(matches!(check_len("size", &[1, 2], 3), Err(TransformError::DimensionMismatch(_))));
        assert_eq!(axis_name(1), "height");
    }
}
