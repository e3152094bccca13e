use crate::contracts::BridgeFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorDescriptor {
    pub title: &'static str,
    pub description: &'static str,
    pub guidance: &'static str,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy)]
struct CatalogEntry {
    key: &'static str,
    title: &'static str,
    description: &'static str,
    guidance: &'static str,
    severity: Option<Severity>,
}

impl CatalogEntry {
    fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor {
            title: self.title,
            description: self.description,
            guidance: self.guidance,
            severity: self.severity.unwrap_or(Severity::Error),
        }
    }
}

const CODE_ALIASES: &[(&str, &str)] = &[
    ("RATE_LIMIT", "RATE_LIMITED"),
    ("CONCURRENCY", "RATE_LIMITED"),
    ("SCHEMA_INPUT", "VALIDATION_ERROR"),
    ("SCHEMA_OUTPUT", "VALIDATION_ERROR"),
    ("BAD_REQUEST", "VALIDATION_ERROR"),
    ("UNKNOWN_TOOL", "VALIDATION_ERROR"),
    ("FORBIDDEN_TOOL", "POLICY_DENIED"),
    ("READ_ONLY_TOOL", "POLICY_DENIED"),
    ("READ_ONLY_ENFORCED", "POLICY_DENIED"),
    ("MISSING_TOKEN", "POLICY_DENIED"),
    ("INVALID_TOKEN", "POLICY_DENIED"),
];

const CODE_CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        key: "VALIDATION_ERROR",
        title: "Input rejected",
        description: "The tool refused the request because its inputs did not match the expected schema.",
        guidance: "Check the highlighted inputs, adjust them, then preview again.",
        severity: None,
    },
    CatalogEntry {
        key: "POLICY_DENIED",
        title: "Blocked by policy",
        description: "The bridge policy does not allow this tool to run with the current credentials.",
        guidance: "Confirm the bridge token and that the tool is enabled for writes before retrying.",
        severity: None,
    },
    CatalogEntry {
        key: "RATE_LIMITED",
        title: "Too many runs in flight",
        description: "The bridge is throttling tool runs right now.",
        guidance: "Wait a few seconds and retry. Queued tasks keep their inputs.",
        severity: Some(Severity::Warning),
    },
    CatalogEntry {
        key: "TOOL_TIMEOUT",
        title: "Tool timed out",
        description: "The tool did not finish within the bridge time limit.",
        guidance: "Retry with a narrower scope or check the run diagnostics.",
        severity: Some(Severity::Warning),
    },
    CatalogEntry {
        key: "BRIDGE_TIMEOUT",
        title: "No response from bridge",
        description: "The bridge call did not complete before the panel deadline.",
        guidance: "Check that the bridge is running, then retry the same step.",
        severity: Some(Severity::Warning),
    },
    CatalogEntry {
        key: "NETWORK_ERROR",
        title: "Bridge unreachable",
        description: "The panel could not reach the tool bridge.",
        guidance: "Start the bridge or fix its address, then retry.",
        severity: None,
    },
    CatalogEntry {
        key: "INTERNAL_ERROR",
        title: "Tool crashed",
        description: "The tool failed while running.",
        guidance: "Open the telemetry link or share the incident ID with the tool owners.",
        severity: None,
    },
];

const STATUS_CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        key: "400",
        title: "Bad request",
        description: "The bridge could not understand the request.",
        guidance: "Review the inputs and try again.",
        severity: None,
    },
    CatalogEntry {
        key: "401",
        title: "Not signed in",
        description: "The bridge requires a valid token.",
        guidance: "Refresh the bridge token and retry.",
        severity: None,
    },
    CatalogEntry {
        key: "403",
        title: "Forbidden",
        description: "The bridge refused this operation.",
        guidance: "Ask for write access to this tool or run it as a preview only.",
        severity: None,
    },
    CatalogEntry {
        key: "404",
        title: "Not found",
        description: "The bridge does not know this tool or run.",
        guidance: "Reload the tool list and pick a tool again.",
        severity: None,
    },
    CatalogEntry {
        key: "408",
        title: "Request timed out",
        description: "The bridge gave up waiting for the tool.",
        guidance: "Retry in a moment.",
        severity: Some(Severity::Warning),
    },
    CatalogEntry {
        key: "409",
        title: "Conflicting change",
        description: "The target changed since the preview was generated.",
        guidance: "Preview again to refresh the plan before applying.",
        severity: Some(Severity::Warning),
    },
    CatalogEntry {
        key: "429",
        title: "Slow down",
        description: "Too many requests reached the bridge.",
        guidance: "Wait a few seconds and retry.",
        severity: Some(Severity::Warning),
    },
    CatalogEntry {
        key: "500",
        title: "Bridge error",
        description: "The bridge hit an unexpected error.",
        guidance: "Retry, and share the incident ID if it keeps failing.",
        severity: None,
    },
    CatalogEntry {
        key: "502",
        title: "Bad gateway",
        description: "The bridge could not reach the tool runner.",
        guidance: "Retry in a moment.",
        severity: None,
    },
    CatalogEntry {
        key: "503",
        title: "Bridge unavailable",
        description: "The bridge is not accepting runs right now.",
        guidance: "Retry once the bridge is back.",
        severity: Some(Severity::Warning),
    },
    CatalogEntry {
        key: "504",
        title: "Gateway timeout",
        description: "The tool runner took too long to answer.",
        guidance: "Retry with a narrower scope.",
        severity: Some(Severity::Warning),
    },
];

const FALLBACK: ErrorDescriptor = ErrorDescriptor {
    title: "Something went wrong",
    description: "The tool run failed for an unknown reason.",
    guidance: "Retry the step. If it fails again, check the bridge logs.",
    severity: Severity::Error,
};

/// Uppercases the code and folds known aliases onto their canonical code.
/// Blank codes normalize to `None`.
pub fn normalize_error_code(code: Option<&str>) -> Option<String> {
    let upper = code?.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return None;
    }
    let canonical = CODE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == upper)
        .map(|(_, canonical)| (*canonical).to_string());
    Some(canonical.unwrap_or(upper))
}

/// Code entry first, then the stringified HTTP status, then the fallback.
/// Total over every input.
pub fn resolve_error_descriptor(code: Option<&str>, status: Option<u16>) -> ErrorDescriptor {
    if let Some(normalized) = normalize_error_code(code) {
        if let Some(entry) = CODE_CATALOG.iter().find(|entry| entry.key == normalized) {
            return entry.descriptor();
        }
    }

    if let Some(status) = status {
        let key = status.to_string();
        if let Some(entry) = STATUS_CATALOG.iter().find(|entry| entry.key == key) {
            return entry.descriptor();
        }
    }

    FALLBACK
}

/// Everything the error view shows for one failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPresentation {
    pub descriptor: ErrorDescriptor,
    pub message: String,
    pub code: Option<String>,
    pub raw_code: Option<String>,
    pub status: Option<u16>,
    pub incident_id: Option<String>,
}

impl ErrorPresentation {
    pub fn from_failure(failure: &BridgeFailure) -> Self {
        let code = normalize_error_code(failure.code.as_deref());
        let raw_code = failure
            .code
            .as_ref()
            .filter(|raw| code.as_deref() != Some(raw.trim()))
            .cloned();
        Self {
            descriptor: resolve_error_descriptor(failure.code.as_deref(), failure.status),
            message: failure.message.clone(),
            code,
            raw_code,
            status: failure.status,
            incident_id: failure.incident_id.clone(),
        }
    }

    /// Secondary metadata line, e.g. `code RATE_LIMITED (RATE_LIMIT) · HTTP 429 · incident inc-4`.
    pub fn metadata_line(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            match &self.raw_code {
                Some(raw) => parts.push(format!("code {code} ({raw})")),
                None => parts.push(format!("code {code}")),
            }
        }
        if let Some(status) = self.status {
            parts.push(format!("HTTP {status}"));
        }
        if let Some(incident) = &self.incident_id {
            parts.push(format!("incident {incident}"));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" · "))
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn aliases_fold_onto_canonical_codes() {
        assert_eq!(
            normalize_error_code(Some("rate_limit")).as_deref(),
            Some("RATE_LIMITED")
        );
        assert_eq!(
            normalize_error_code(Some("CONCURRENCY")).as_deref(),
            Some("RATE_LIMITED")
        );
        assert_eq!(
            normalize_error_code(Some("unknown_tool")).as_deref(),
            Some("VALIDATION_ERROR")
        );
        assert_eq!(
            normalize_error_code(Some("MISSING_TOKEN")).as_deref(),
            Some("POLICY_DENIED")
        );
        assert_eq!(
            normalize_error_code(Some("custom_code")).as_deref(),
            Some("CUSTOM_CODE")
        );
        assert_eq!(normalize_error_code(Some("   ")), None);
        assert_eq!(normalize_error_code(None), None);
    }

    #[test]
    fn code_wins_over_status() {
        let descriptor = resolve_error_descriptor(Some("READ_ONLY_TOOL"), Some(429));
        assert_eq!(descriptor.title, "Blocked by policy");
        assert_eq!(descriptor.severity, Severity::Error);
    }

    #[test]
    fn unknown_code_falls_back_to_status() {
        let descriptor = resolve_error_descriptor(Some("SOMETHING_NEW"), Some(429));
        assert_eq!(descriptor.title, "Slow down");
        assert_eq!(descriptor.severity, Severity::Warning);
    }

    #[test]
    fn rate_limited_is_a_warning() {
        let descriptor = resolve_error_descriptor(Some("RATE_LIMIT"), None);
        assert_eq!(descriptor.title, "Too many runs in flight");
        assert_eq!(descriptor.severity, Severity::Warning);
    }

    #[test]
    fn resolver_is_total() {
        let codes = [
            None,
            Some(""),
            Some(" "),
            Some("rate_limit"),
            Some("VALIDATION_ERROR"),
            Some("???"),
            Some("ünïcödé"),
        ];
        let statuses = [None, Some(0), Some(200), Some(404), Some(499), Some(599), Some(u16::MAX)];
        for code in codes {
            for status in statuses {
                let descriptor = resolve_error_descriptor(code, status);
                assert!(!descriptor.title.is_empty());
                assert!(!descriptor.description.is_empty());
                assert!(!descriptor.guidance.is_empty());
            }
        }
        assert_eq!(resolve_error_descriptor(None, None), FALLBACK);
        assert_eq!(resolve_error_descriptor(Some("???"), Some(599)), FALLBACK);
    }

    #[test]
    fn presentation_shows_raw_code_only_when_aliased() {
        let aliased = ErrorPresentation::from_failure(
            &BridgeFailure::new("throttled")
                .with_code("RATE_LIMIT")
                .with_status(429)
                .with_incident("inc-4"),
        );
        assert_eq!(
            aliased.metadata_line().as_deref(),
            Some("code RATE_LIMITED (RATE_LIMIT) · HTTP 429 · incident inc-4")
        );

        let canonical =
            ErrorPresentation::from_failure(&BridgeFailure::new("bad").with_code("VALIDATION_ERROR"));
        assert_eq!(canonical.raw_code, None);
        assert_eq!(
            canonical.metadata_line().as_deref(),
            Some("code VALIDATION_ERROR")
        );

        assert_eq!(
            ErrorPresentation::from_failure(&BridgeFailure::new("plain")).metadata_line(),
            None
        );
    }
}
