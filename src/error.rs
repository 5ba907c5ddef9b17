use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("{detail} (HTTP {status})")]
    Status { status: u16, detail: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UiError {
    #[error("{operation} failed: {source}")]
    Network {
        operation: &'static str,
        #[source]
        source: GatewayError,
    },
    #[error("{0}")]
    Validation(String),
    #[error("{0} is no longer available")]
    NotFoundOrStale(String),
}

impl UiError {
    pub fn network(operation: &'static str, source: GatewayError) -> Self {
        Self::Network { operation, source }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn notice(&self) -> Notice {
        let kind = match self {
            Self::Network { .. } => NoticeKind::Error,
            Self::Validation(_) => NoticeKind::Validation,
            Self::NotFoundOrStale(_) => NoticeKind::Info,
        };
        Notice {
            kind,
            message: self.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Validation,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}
