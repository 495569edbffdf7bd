use thiserror::Error;

/// Failures raised while bringing the process up or talking to its
/// runtime dependencies. The only IO this crate performs itself is
/// binding the public listener.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to bind the public listener: {0}")]
    Bind(#[from] std::io::Error),
    #[error("database unavailable: {message}")]
    Database { message: String },
    #[error("telemetry setup failed: {0}")]
    Telemetry(String),
    #[error("invalid deployment configuration: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_failures_wrap_the_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = InfraError::from(io);
        assert!(matches!(err, InfraError::Bind(_)));
        assert!(
            err.to_string()
                .contains("failed to bind the public listener")
        );
    }

    #[test]
    fn constructors_carry_their_messages() {
        assert_eq!(
            InfraError::database("pool exhausted").to_string(),
            "database unavailable: pool exhausted"
        );
        assert_eq!(
            InfraError::configuration("database url is not configured").to_string(),
            "invalid deployment configuration: database url is not configured"
        );
    }
}
