use playground_core::error::{CoreError, FieldError};

/// Errors surfaced by the client crate.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced an HTTP response (DNS, refused, TLS, ...).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered 401 and no refresh could recover it.
    #[error("{0}")]
    Unauthenticated(String),

    /// The service answered with a non-2xx envelope.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        errors: Vec<FieldError>,
    },

    /// A 2xx response whose body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Local validation rejected the input before any request was made.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("No active session")]
    NoActiveSession,

    #[error("Unknown session")]
    UnknownSession,
}

impl ClientError {
    /// HTTP status of an API failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Unauthenticated(_) => Some(401),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}
