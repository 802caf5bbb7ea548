//! Stage outcome
//!
//! Extraction of rich-text/OpenDocument files and feedback generation never
//! fail the upload: when they cannot do their job they hand back a readable
//! message instead. `Outcome` keeps that message distinguishable from real
//! output, even though both are persisted the same way.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a stage that degrades to a message instead of failing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The stage produced its real output
    Complete(String),
    /// The stage failed; the value is a human-readable description
    Degraded(String),
}

impl Outcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(_))
    }

    /// The carried text, whichever variant this is
    pub fn as_str(&self) -> &str {
        match self {
            Outcome::Complete(text) | Outcome::Degraded(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Outcome::Complete(text) | Outcome::Degraded(text) => text,
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        match self {
            Outcome::Complete(_) => OutcomeStatus::Complete,
            Outcome::Degraded(_) => OutcomeStatus::Degraded,
        }
    }
}

/// Variant tag of an [`Outcome`], as reported to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Complete,
    Degraded,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Complete => write!(f, "complete"),
            OutcomeStatus::Degraded => write!(f, "degraded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let ok = Outcome::Complete("text".to_string());
        let degraded = Outcome::Degraded("error".to_string());

        assert!(!ok.is_degraded());
        assert!(degraded.is_degraded());
        assert_eq!(ok.as_str(), "text");
        assert_eq!(degraded.clone().into_text(), "error");
        assert_eq!(ok.status(), OutcomeStatus::Complete);
        assert_eq!(degraded.status(), OutcomeStatus::Degraded);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&OutcomeStatus::Degraded).unwrap(), "\"degraded\"");
        assert_eq!(OutcomeStatus::Complete.to_string(), "complete");
    }
}
