use alloy::signers::local::LocalSignerError;
use derive_builder::UninitializedFieldError;
use reqwest::{Method, StatusCode, header};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

const THREAD_MARKERS: &[&str] = &["thread", "not found"];
const SESSION_MARKERS: &[&str] = &["authentication", "session", "unauthorized"];

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("all verification methods failed for {address}")]
    AuthExhausted { address: String },
    #[error("failed to get rate limits: {status_code} - {message}")]
    QuotaQuery {
        status_code: StatusCode,
        message: String,
    },
    #[error("send message failed: {status_code} - {message}")]
    Dispatch {
        status_code: StatusCode,
        message: String,
    },
    #[error("thread rejected: {status_code} - {message}")]
    ThreadInvalid {
        status_code: StatusCode,
        message: String,
    },
    #[error("session rejected: {status_code} - {message}")]
    SessionInvalid {
        status_code: StatusCode,
        message: String,
    },
    #[error("error({status_code}) making {method} call to {path} with {message}")]
    Status {
        status_code: StatusCode,
        method: Method,
        path: String,
        message: String,
    },
    #[error("verification response carried no session token")]
    MissingCredential,
    #[error("{0} endpoint returned no challenge token")]
    MissingChallengeToken(&'static str),
    #[error("no usable wallets configured")]
    NoWallets,
    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    InvalidHeaderValue(#[from] header::InvalidHeaderValue),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    LocalSigner(#[from] LocalSignerError),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Signer(#[from] alloy::signers::Error),
    #[error(transparent)]
    UninitializedField(#[from] UninitializedFieldError),
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Whether the remote side no longer accepts the thread id used for the failed call.
    #[must_use]
    pub fn invalidates_thread(&self) -> bool {
        matches!(self, Self::ThreadInvalid { .. }) || self.mentions(THREAD_MARKERS)
    }

    /// Whether the session token must be discarded and the wallet signed in again.
    #[must_use]
    pub fn invalidates_session(&self) -> bool {
        matches!(self, Self::SessionInvalid { .. }) || self.mentions(SESSION_MARKERS)
    }

    fn mentions(&self, markers: &[&str]) -> bool {
        let rendered = self.to_string().to_lowercase();
        markers.iter().any(|marker| rendered.contains(marker))
    }

    /// Maps a failed chat response onto the thread/session/dispatch taxonomy.
    pub(crate) fn from_dispatch(status_code: StatusCode, message: String) -> Self {
        let body = message.to_lowercase();
        if matches!(status_code, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            || SESSION_MARKERS.iter().any(|marker| body.contains(marker))
        {
            Self::SessionInvalid {
                status_code,
                message,
            }
        } else if status_code == StatusCode::NOT_FOUND
            || THREAD_MARKERS.iter().any(|marker| body.contains(marker))
        {
            Self::ThreadInvalid {
                status_code,
                message,
            }
        } else {
            Self::Dispatch {
                status_code,
                message,
            }
        }
    }
}
