//! CLI-specific error types and exit code mapping

use streamalert_core::error::StreamAlertError;
use streamalert_rule_processor::RuleProcessorError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure, including a malformed
    /// invocation context.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Rule loading or validation failure.
    #[error("rule error: {0}")]
    Rule(String),

    /// JSON parsing of the event file or output rendering failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                 |
    /// |------|-------------------------|
    /// | 0    | Success                 |
    /// | 1    | General / command error |
    /// | 2    | Configuration error     |
    /// | 10   | IO error                |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Io(_) => 10,
            Self::Command(_) | Self::Rule(_) | Self::Json(_) => 1,
        }
    }
}

impl From<StreamAlertError> for CliError {
    fn from(e: StreamAlertError) -> Self {
        match e {
            StreamAlertError::Config(e) => Self::Config(e.to_string()),
            StreamAlertError::Io(e) => Self::Io(e),
            StreamAlertError::Processing(e) => Self::Command(e.to_string()),
        }
    }
}

impl From<RuleProcessorError> for CliError {
    fn from(e: RuleProcessorError) -> Self {
        match e {
            RuleProcessorError::Environment(_) | RuleProcessorError::Config { .. } => {
                Self::Config(e.to_string())
            }
            RuleProcessorError::RuleLoad { .. }
            | RuleProcessorError::RuleValidation { .. }
            | RuleProcessorError::Regex(_) => Self::Rule(e.to_string()),
            RuleProcessorError::Core(e) => e.into(),
            RuleProcessorError::Io(e) => Self::Io(e),
            other => Self::Command(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamalert_core::error::ConfigError;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_command_and_rule_errors() {
        assert_eq!(CliError::Command("x".to_owned()).exit_code(), 1);
        assert_eq!(CliError::Rule("x".to_owned()).exit_code(), 1);

        let json_err = serde_json::from_str::<serde_json::Value>("{invalid json")
            .expect_err("should fail parsing");
        assert_eq!(CliError::Json(json_err).exit_code(), 1);
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let display_str = err.to_string();
        assert!(display_str.contains("configuration error"));
        assert!(display_str.contains("invalid TOML syntax"));
    }

    #[test]
    fn test_from_core_config_error_is_config() {
        let core_err = StreamAlertError::Config(ConfigError::FileNotFound {
            path: "streamalert.toml".to_owned(),
        });
        let cli_err: CliError = core_err.into();
        assert_eq!(cli_err.exit_code(), 2);
        assert!(cli_err.to_string().contains("streamalert.toml"));
    }

    #[test]
    fn test_from_environment_error_is_config() {
        let err = RuleProcessorError::Environment(ConfigError::InvalidContext(
            "missing alias".to_owned(),
        ));
        let cli_err: CliError = err.into();
        assert!(matches!(cli_err, CliError::Config(_)));
    }

    #[test]
    fn test_from_rule_validation_error_is_rule() {
        let err = RuleProcessorError::RuleValidation {
            rule_id: "r1".to_owned(),
            reason: "empty title".to_owned(),
        };
        let cli_err: CliError = err.into();
        assert!(matches!(cli_err, CliError::Rule(_)));
        assert!(cli_err.to_string().contains("r1"));
    }

    #[test]
    fn test_from_delivery_error_is_command() {
        let cli_err: CliError = RuleProcessorError::Delivery("sink closed".to_owned()).into();
        assert!(matches!(cli_err, CliError::Command(_)));
        assert_eq!(cli_err.exit_code(), 1);
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let cli_err: CliError = RuleProcessorError::Io(io_err).into();
        match cli_err {
            CliError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            _ => panic!("expected Io error variant"),
        }
    }
}
