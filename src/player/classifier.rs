use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

use super::events::PlatformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Format,
    Decoder,
    Permission,
    Drm,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Fatal,
    Recoverable,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Format => "format",
            ErrorCategory::Decoder => "decoder",
            ErrorCategory::Permission => "permission",
            ErrorCategory::Drm => "drm",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// Severity assumed when a structured error names a category but no severity
    fn default_severity(&self) -> ErrorSeverity {
        match self {
            ErrorCategory::Network => ErrorSeverity::Recoverable,
            _ => ErrorSeverity::Fatal,
        }
    }
}

/// A classified playback failure, kept on the state snapshot as a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerError {
    pub message: String,
    pub code: Option<String>,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    /// Retry budget for this error; 0 disables retrying it
    pub max_retries: u32,
}

impl fmt::Display for PlayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.category.as_str())
    }
}

impl PlayerError {
    pub fn is_recoverable(&self) -> bool {
        self.severity == ErrorSeverity::Recoverable
    }

    pub fn is_network(&self) -> bool {
        self.category == ErrorCategory::Network
    }

    /// Network failures routed to the automatic retry policy. The policy
    /// applies `max_retries` through its ceiling.
    pub fn is_auto_retryable(&self) -> bool {
        self.is_network() && self.is_recoverable()
    }

    pub fn allows_retry(&self) -> bool {
        self.max_retries > 0
    }
}

/// Map a raw native failure to a typed [`PlayerError`].
///
/// Structured errors are trusted as-is (including a `max_retries` of 0);
/// anything else degrades to `unknown`/`fatal` with the global ceiling.
pub fn classify(raw: &PlatformError, default_max_retries: u32) -> PlayerError {
    let message = if raw.message.trim().is_empty() {
        crate::constants::GENERIC_PLAYBACK_ERROR.to_string()
    } else {
        raw.message.clone()
    };

    let error = if raw.is_structured() {
        let category = raw.category.unwrap_or(ErrorCategory::Unknown);
        PlayerError {
            message,
            code: raw.code.clone(),
            category,
            severity: raw.severity.unwrap_or_else(|| category.default_severity()),
            max_retries: raw.max_retries.unwrap_or(default_max_retries),
        }
    } else {
        PlayerError {
            message,
            code: raw.code.clone(),
            category: ErrorCategory::Unknown,
            severity: ErrorSeverity::Fatal,
            max_retries: default_max_retries,
        }
    };

    trace!(
        "Classified error '{}' as {}/{:?} (max retries {})",
        error.message,
        error.category.as_str(),
        error.severity,
        error.max_retries
    );
    error
}

/// Classification for network-error events: always network/recoverable
pub fn classify_network(message: &str, default_max_retries: u32) -> PlayerError {
    classify(
        &PlatformError::new(message)
            .with_category(ErrorCategory::Network)
            .with_severity(ErrorSeverity::Recoverable),
        default_max_retries,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unstructured_message_is_unknown_fatal() {
        let error = classify(&PlatformError::new("Something broke"), 3);
        assert_eq!(error.message, "Something broke");
        assert_eq!(error.category, ErrorCategory::Unknown);
        assert_eq!(error.severity, ErrorSeverity::Fatal);
        assert_eq!(error.max_retries, 3);
        assert!(!error.is_auto_retryable());
    }

    #[test]
    fn test_structured_fields_are_trusted() {
        let raw = PlatformError::new("Unsupported codec")
            .with_code("E_CODEC")
            .with_category(ErrorCategory::Decoder)
            .with_severity(ErrorSeverity::Recoverable)
            .with_max_retries(1);
        let error = classify(&raw, 5);

        assert_eq!(error.category, ErrorCategory::Decoder);
        assert_eq!(error.severity, ErrorSeverity::Recoverable);
        assert_eq!(error.max_retries, 1);
        assert_eq!(error.code.as_deref(), Some("E_CODEC"));
    }

    #[test]
    fn test_zero_max_retries_override() {
        let raw = PlatformError::new("Stream gone")
            .with_category(ErrorCategory::Network)
            .with_max_retries(0);
        let error = classify(&raw, 3);

        assert_eq!(error.max_retries, 0);
        assert!(!error.allows_retry());
        assert!(error.is_auto_retryable());
    }

    #[test]
    fn test_structured_category_without_severity() {
        let network = classify(
            &PlatformError::new("timeout").with_category(ErrorCategory::Network),
            3,
        );
        assert_eq!(network.severity, ErrorSeverity::Recoverable);

        let format = classify(
            &PlatformError::new("bad container").with_category(ErrorCategory::Format),
            3,
        );
        assert_eq!(format.severity, ErrorSeverity::Fatal);
    }

    #[test]
    fn test_empty_message_degrades_to_generic() {
        let error = classify(&PlatformError::new("  "), 2);
        assert_eq!(error.message, crate::constants::GENERIC_PLAYBACK_ERROR);
        assert_eq!(error.category, ErrorCategory::Unknown);
    }

    #[test]
    fn test_network_classification() {
        let error = classify_network("Connection lost", 4);
        assert!(error.is_auto_retryable());
        assert_eq!(error.max_retries, 4);
    }
}
