use std::time::Duration;

use panel_core::contracts::BridgeFailure;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BridgeError {
    /// The tool ran and reported a typed failure.
    #[error("{message}")]
    Tool {
        message: String,
        code: Option<String>,
        status: Option<u16>,
        incident_id: Option<String>,
        details: Option<Value>,
    },
    #[error("bridge transport failed: {0}")]
    Transport(String),
    #[error("bridge returned an unreadable payload: {0}")]
    Decode(String),
    #[error("bridge call did not finish within {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl BridgeError {
    pub fn tool(message: impl Into<String>, code: &str, status: u16) -> Self {
        Self::Tool {
            message: message.into(),
            code: Some(code.to_string()),
            status: Some(status),
            incident_id: None,
            details: None,
        }
    }

    /// Flattens the error into the data the panel stores on a task.
    pub fn to_failure(&self) -> BridgeFailure {
        match self {
            Self::Tool {
                message,
                code,
                status,
                incident_id,
                details,
            } => BridgeFailure {
                message: message.clone(),
                code: code.clone(),
                status: *status,
                incident_id: incident_id.clone(),
                details: details.clone(),
            },
            Self::Transport(_) => BridgeFailure::new(self.to_string()).with_code("NETWORK_ERROR"),
            Self::Decode(_) => BridgeFailure::new(self.to_string()).with_code("INTERNAL_ERROR"),
            Self::Timeout(_) => BridgeFailure::new(self.to_string()).with_code("BRIDGE_TIMEOUT"),
        }
    }
}

impl From<BridgeFailure> for BridgeError {
    fn from(failure: BridgeFailure) -> Self {
        Self::Tool {
            message: failure.message,
            code: failure.code,
            status: failure.status,
            incident_id: failure.incident_id,
            details: failure.details,
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn tool_error_round_trips_failure_fields() {
        let failure = BridgeFailure::new("slow down")
            .with_code("RATE_LIMIT")
            .with_status(429)
            .with_incident("inc-3");
        let err = BridgeError::from(failure.clone());
        assert_eq!(err.to_string(), "slow down");
        assert_eq!(err.to_failure(), failure);
    }

    #[test]
    fn transport_and_timeout_map_to_catalog_codes() {
        let transport = BridgeError::Transport("connection reset".to_string()).to_failure();
        assert_eq!(transport.code.as_deref(), Some("NETWORK_ERROR"));
        assert_eq!(transport.message, "bridge transport failed: connection reset");

        let timeout = BridgeError::Timeout(Duration::from_millis(1_500)).to_failure();
        assert_eq!(timeout.code.as_deref(), Some("BRIDGE_TIMEOUT"));
        assert_eq!(timeout.message, "bridge call did not finish within 1500ms");
    }

    #[test]
    fn decode_errors_come_from_serde() {
        let err: BridgeError = serde_json::from_value::<Vec<String>>(json!({"a": 1}))
            .map_err(BridgeError::from)
            .expect_err("object is not a list");
        assert!(matches!(err, BridgeError::Decode(_)));
        assert_eq!(err.to_failure().code.as_deref(), Some("INTERNAL_ERROR"));
    }
}
