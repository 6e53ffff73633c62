use thiserror::Error;

/// A failure that ends a request, carrying the HTTP status it is reported with
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProxyError {
    #[error("Page not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    Upstream { status: Option<u16>, message: String },

    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn upstream<S: Into<String>>(status: Option<u16>, message: S) -> Self {
        ProxyError::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Status code the error is surfaced with. Upstream statuses outside the
    /// error range fall back to 502.
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::NotFound => 404,
            ProxyError::BadRequest(_) => 400,
            ProxyError::Upstream { status, .. } => match status {
                Some(code) if (400..600).contains(code) => *code,
                _ => 502,
            },
            ProxyError::Transport(_) | ProxyError::InvalidResponse(_) => 502,
            ProxyError::Internal(_) => 500,
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ProxyError::upstream(Some(status.as_u16()), err.to_string()),
            None => ProxyError::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::InvalidResponse(err.to_string())
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;
