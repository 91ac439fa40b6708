use std::time::Duration;

use shared::error::{ApiException, ErrorCode};
use thiserror::Error;

use crate::routes::Route;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally; nothing was sent.
    #[error("{0}")]
    Validation(String),
    /// The action needs an RSVP first. Callers should navigate to
    /// `redirect_to` once `after` has elapsed.
    #[error("{message}")]
    RsvpRequired {
        message: String,
        redirect_to: Route,
        after: Duration,
    },
    #[error(transparent)]
    Api(#[from] ApiException),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("session store: {0}")]
    Session(#[source] anyhow::Error),
}

impl ClientError {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api(e) => Some(e.code),
            _ => None,
        }
    }

    /// Admin calls rejected for a missing, expired or foreign session are
    /// answered by sending the operator to the sign-in page.
    pub fn requires_admin_login(&self) -> bool {
        matches!(
            self.code(),
            Some(ErrorCode::Unauthorized | ErrorCode::Forbidden)
        )
    }
}
