//! Error types for authentication operations

/// Errors that can occur during credential handling or signing
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Invalid API credentials
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Failed to serialize a signing payload
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Environment variable not set
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::EnvVarNotSet("LIQUID_TOKEN_ID".to_string());
        assert!(err.to_string().contains("LIQUID_TOKEN_ID"));
    }
}
