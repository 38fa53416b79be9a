use std::fmt;

use anyhow::Error;
use serde::Serialize;
use serde_json::Value;

pub const SCRIPT_UNREADABLE: &str = "SCRIPT_UNREADABLE";
pub const UNKNOWN_PLATFORM: &str = "UNKNOWN_PLATFORM";
pub const UNKNOWN_TIME_FORMAT: &str = "UNKNOWN_TIME_FORMAT";
pub const UNKNOWN_EXPORT_FORMAT: &str = "UNKNOWN_EXPORT_FORMAT";
pub const INVALID_NOW: &str = "INVALID_NOW";
pub const INVALID_CURSOR: &str = "INVALID_CURSOR";
pub const EXPORT_FAILED: &str = "EXPORT_FAILED";
pub const FONT_ASSET_HASH_MISMATCH: &str = "FONT_ASSET_HASH_MISMATCH";
pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodedErrorKind {
    Usage,
    Input,
    Export,
}

impl CodedErrorKind {
    /// Process exit status. Usage matches clap's own argument errors.
    pub fn exit_code(self) -> u8 {
        match self {
            CodedErrorKind::Usage => 2,
            CodedErrorKind::Input => 3,
            CodedErrorKind::Export => 4,
        }
    }
}

/// Exit status for any error; uncoded failures exit with 1.
pub fn exit_code_for(error: &Error) -> u8 {
    find_coded_error(error).map_or(1, |coded| coded.kind.exit_code())
}

#[derive(Debug, Clone)]
pub struct CodedError {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
    pub kind: CodedErrorKind,
}

impl CodedError {
    pub fn usage(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(code, message, CodedErrorKind::Usage)
    }

    pub fn input(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(code, message, CodedErrorKind::Input)
    }

    pub fn export(message: impl Into<String>) -> Self {
        Self::new(EXPORT_FAILED, message, CodedErrorKind::Export)
    }

    fn new(code: &'static str, message: impl Into<String>, kind: CodedErrorKind) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            kind,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: self.code.to_owned(),
                message: self.message.clone(),
                details: self.details.clone(),
            },
        }
    }
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CodedError {}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorEnvelopeBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelopeBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub fn find_coded_error(error: &Error) -> Option<&CodedError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<CodedError>())
}

/// Envelope for any error; uncoded failures are reported as `INTERNAL`.
pub fn envelope_for(error: &Error) -> ErrorEnvelope {
    match find_coded_error(error) {
        Some(coded) => coded.envelope(),
        None => ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: "INTERNAL".to_owned(),
                message: format!("{error:#}"),
                details: None,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;
    use serde_json::json;

    use super::{
        envelope_for, exit_code_for, find_coded_error, CodedError, CONFIG_INVALID, EXPORT_FAILED,
        SCRIPT_UNREADABLE,
    };

    #[test]
    fn coded_error_is_found_through_context_layers() {
        let result: anyhow::Result<()> = Err(CodedError::input(SCRIPT_UNREADABLE, "nope").into());
        let error = result.context("while loading").unwrap_err();
        let coded = find_coded_error(&error).expect("coded error in chain");
        assert_eq!(coded.code, SCRIPT_UNREADABLE);
    }

    #[test]
    fn envelope_serializes_details_only_when_present() {
        let bare = serde_json::to_value(CodedError::export("try again").envelope()).unwrap();
        assert_eq!(bare["ok"], json!(false));
        assert_eq!(bare["error"]["code"], json!(EXPORT_FAILED));
        assert!(bare["error"].get("details").is_none());

        let detailed = CodedError::export("try again").with_details(json!({ "region": "chat" }));
        let value = serde_json::to_value(detailed.envelope()).unwrap();
        assert_eq!(value["error"]["details"]["region"], json!("chat"));
    }

    #[test]
    fn uncoded_errors_become_internal() {
        let error = anyhow::anyhow!("boom");
        assert_eq!(envelope_for(&error).error.code, "INTERNAL");
        assert_eq!(exit_code_for(&error), 1);
    }

    #[test]
    fn exit_code_follows_error_kind() {
        let usage = anyhow::Error::from(CodedError::usage(CONFIG_INVALID, "bad"));
        let input = anyhow::Error::from(CodedError::input(SCRIPT_UNREADABLE, "gone"))
            .context("while loading");
        let export = anyhow::Error::from(CodedError::export("disk full"));
        assert_eq!(exit_code_for(&usage), 2);
        assert_eq!(exit_code_for(&input), 3);
        assert_eq!(exit_code_for(&export), 4);
    }
}
