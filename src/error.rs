use axum::http::StatusCode;
use std::io;

/// Custom error type for push_deploy operations
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Invalid signature")]
    Authentication,

    #[error("Error executing shell script: {reason}\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    Execution {
        reason: String,
        stdout: String,
        stderr: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl DeployError {
    /// Execution failure without any captured output (spawn failure, timeout).
    pub fn execution(reason: impl Into<String>) -> Self {
        DeployError::Execution {
            reason: reason.into(),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// HTTP status a request-scoped error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DeployError::Payload(_) => StatusCode::BAD_REQUEST,
            DeployError::Authentication => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Helper type for Results that use DeployError
pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_errors_map_to_client_statuses() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(
            DeployError::Payload(parse_err).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DeployError::Authentication.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            DeployError::execution("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn startup_errors_are_internal() {
        let io_err: DeployError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(io_err, DeployError::Io(_)));
        assert_eq!(io_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let config_err = DeployError::Config("bad port".to_string());
        assert_eq!(config_err.to_string(), "Configuration error: bad port");
    }

    #[test]
    fn execution_message_echoes_output() {
        let err = DeployError::Execution {
            reason: "exit status: 1".to_string(),
            stdout: "building".to_string(),
            stderr: "no space left".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit status: 1"));
        assert!(msg.contains("building"));
        assert!(msg.contains("no space left"));
    }
}
