use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("validation error: {0}")]
    Validation(String),
}

/// Failures talking to the upstream GraphQL directory.
///
/// Checked in order: transport, HTTP status, decode, GraphQL `errors`.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("upstream returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("failed to decode upstream response: {0}")]
    Decode(String),
    #[error("upstream GraphQL errors: {}", .errors.join("; "))]
    GraphQl { errors: Vec<String> },
    #[error("upstream response has no '{0}' field")]
    MissingData(&'static str),
    #[error("invalid uuid '{0}': only ASCII letters, digits and '-' are allowed")]
    InvalidUuid(String),
}

impl UpstreamError {
    /// Short tag used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Transport(_) => "transport",
            UpstreamError::Http { .. } => "http",
            UpstreamError::Decode(_) => "decode",
            UpstreamError::GraphQl { .. } => "graphql",
            UpstreamError::MissingData(_) => "missing_data",
            UpstreamError::InvalidUuid(_) => "invalid_uuid",
        }
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors surfaced by the catalog service. Each variant maps to one
/// envelope `message`; the payload becomes `details`.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Database record not found: {0}")]
    NotFound(String),
    #[error("External API error: {0}")]
    ExternalApi(String),
    #[error("request deadline of {0:?} exceeded")]
    Timeout(std::time::Duration),
}

impl ServiceError {
    pub fn message(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => messages::VALIDATION_ERROR,
            ServiceError::Database(_) => messages::DATABASE_ERROR,
            ServiceError::NotFound(_) => messages::DATABASE_NOT_FOUND,
            ServiceError::ExternalApi(_) => messages::EXTERNAL_API_ERROR,
            ServiceError::Timeout(_) => messages::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn details(&self) -> String {
        match self {
            ServiceError::Validation(d)
            | ServiceError::Database(d)
            | ServiceError::NotFound(d)
            | ServiceError::ExternalApi(d) => d.clone(),
            ServiceError::Timeout(_) => "request deadline exceeded".to_string(),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.message(), self.details())
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => ServiceError::NotFound(e.to_string()),
            RepositoryError::Database(_) => ServiceError::Database(e.to_string()),
        }
    }
}

/// JSON error envelope returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub details: String,
}

impl ErrorResponse {
    pub fn new(message: &str, details: impl Into<String>) -> Self {
        Self {
            message: message.to_string(),
            details: details.into(),
        }
    }
}

/// Closed set of envelope messages.
#[allow(dead_code)]
pub mod messages {
    pub const INVALID_REQUEST_BODY: &str = "Invalid request body";
    pub const ROUTE_NOT_FOUND: &str = "Route not found";
    pub const METHOD_NOT_ALLOWED: &str = "Method not allowed";
    pub const VALIDATION_ERROR: &str = "Validation error";
    pub const INVALID_ID: &str = "Invalid id parameter";
    pub const INTERNAL_SERVER_ERROR: &str = "Internal server error";
    pub const DATABASE_ERROR: &str = "Database error";
    pub const DATABASE_NOT_FOUND: &str = "Database record not found";
    pub const EXTERNAL_API_ERROR: &str = "External API error";
    pub const UNAUTHORIZED: &str = "Unauthorized";
    pub const FORBIDDEN: &str = "Forbidden";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_record_not_found_message() {
        let err: ServiceError = RepositoryError::NotFound.into();
        assert_eq!(err.message(), "Database record not found");
    }

    #[test]
    fn graphql_error_joins_messages() {
        let err = UpstreamError::GraphQl {
            errors: vec!["first".into(), "second".into()],
        };
        assert_eq!(err.to_string(), "upstream GraphQL errors: first; second");
        assert_eq!(err.kind(), "graphql");
    }

    #[test]
    fn timeout_is_an_internal_server_error() {
        let err = ServiceError::Timeout(std::time::Duration::from_millis(50));
        assert_eq!(err.message(), "Internal server error");
        assert_eq!(err.details(), "request deadline exceeded");
    }

    #[test]
    fn envelope_serializes_message_and_details() {
        let body = serde_json::to_value(ServiceError::Validation("id must be an integer".into()).to_response()).unwrap();
        assert_eq!(body["message"], "Validation error");
        assert_eq!(body["details"], "id must be an integer");
    }
}
