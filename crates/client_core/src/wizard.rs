//! The guest flow: RSVP, then optionally a gift, then optionally a message.

use std::time::Duration;

use shared::{
    domain::{Gift, GiftId, WishId},
    error::{ApiError, ErrorCode},
    protocol::{
        GiftListResponse, RsvpRequest, RsvpResponse, WishRequest, RSVP_REQUIRED_FOR_GIFT,
        RSVP_REQUIRED_FOR_WISH,
    },
};
use tracing::{info, warn};

use crate::{
    routes::Route,
    session::{GuestSession, SessionStore},
    ClientError, InviteClient,
};

/// Delay before sending a guest without an RSVP from the gift list to the form.
pub const GIFT_RSVP_REDIRECT_DELAY: Duration = Duration::from_secs(2);
/// Delay before moving on to the guestbook after a reservation.
pub const GUESTBOOK_REDIRECT_DELAY: Duration = Duration::from_secs(2);

/// Ordered; the wizard only ever moves to a later state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardState {
    Start,
    RsvpSubmitted,
    GiftReserved,
    MessagePosted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub to: Route,
    pub after: Duration,
}

pub struct Wizard<S: SessionStore> {
    client: InviteClient,
    store: S,
    session: Option<GuestSession>,
    state: WizardState,
    gifts: Option<GiftListResponse>,
    draft_message: String,
}

impl<S: SessionStore> Wizard<S> {
    /// Picks up a session left by an earlier visit, in which case the RSVP
    /// step counts as done.
    pub async fn resume(client: InviteClient, store: S) -> Result<Self, ClientError> {
        let session = store.load().await.map_err(ClientError::Session)?;
        let state = if session.is_some() {
            WizardState::RsvpSubmitted
        } else {
            WizardState::Start
        };
        Ok(Self {
            client,
            store,
            session,
            state,
            gifts: None,
            draft_message: String::new(),
        })
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn session(&self) -> Option<&GuestSession> {
        self.session.as_ref()
    }

    pub fn gifts(&self) -> Option<&GiftListResponse> {
        self.gifts.as_ref()
    }

    pub fn draft_message(&self) -> &str {
        &self.draft_message
    }

    pub fn set_draft_message(&mut self, message: impl Into<String>) {
        self.draft_message = message.into();
    }

    /// Where the page shown after the latest completed step sends the guest.
    pub fn next_navigation(&self) -> Option<Navigation> {
        match self.state {
            WizardState::Start => None,
            WizardState::RsvpSubmitted => Some(Navigation {
                to: Route::Gifts,
                after: Duration::ZERO,
            }),
            WizardState::GiftReserved => Some(Navigation {
                to: Route::Guestbook,
                after: GUESTBOOK_REDIRECT_DELAY,
            }),
            WizardState::MessagePosted => None,
        }
    }

    pub async fn submit_rsvp(&mut self, req: &RsvpRequest) -> Result<RsvpResponse, ClientError> {
        let req = req.normalized().map_err(validation)?;
        let resp = self.client.submit_rsvp(&req).await?;

        let session = GuestSession {
            guest_id: resp.guest_id,
            token: resp.guest_token.clone(),
        };
        self.store
            .save(&session)
            .await
            .map_err(ClientError::Session)?;
        self.session = Some(session);
        self.advance(WizardState::RsvpSubmitted);
        info!(guest_id = %resp.guest_id, "rsvp submitted");
        Ok(resp)
    }

    pub async fn refresh_gifts(&mut self) -> Result<&GiftListResponse, ClientError> {
        let gifts = self.client.list_gifts().await?;
        Ok(self.gifts.insert(gifts))
    }

    /// Reserves a gift for the session's guest and then reloads the gift list.
    pub async fn reserve_gift(&mut self, gift_id: GiftId) -> Result<Gift, ClientError> {
        let token = self
            .guest_token(RSVP_REQUIRED_FOR_GIFT, GIFT_RSVP_REDIRECT_DELAY)?
            .to_string();
        let resp = self
            .client
            .reserve_gift(Some(&token), gift_id)
            .await
            .map_err(|e| rsvp_on_unauthorized(e, GIFT_RSVP_REDIRECT_DELAY))?;

        self.advance(WizardState::GiftReserved);
        info!(%gift_id, "gift reserved");
        // The reservation is committed; a failed refresh only leaves the list stale.
        if let Err(err) = self.refresh_gifts().await {
            warn!(%gift_id, error = %err, "gift list refresh failed after reservation");
        }
        Ok(resp.gift)
    }

    /// Posts the current draft. The draft is cleared only on success.
    pub async fn post_wish(&mut self) -> Result<WishId, ClientError> {
        let token = self
            .guest_token(RSVP_REQUIRED_FOR_WISH, Duration::ZERO)?
            .to_string();
        let req = WishRequest {
            message: self.draft_message.clone(),
        }
        .normalized()
        .map_err(validation)?;
        let resp = self
            .client
            .post_wish(Some(&token), &req)
            .await
            .map_err(|e| rsvp_on_unauthorized(e, Duration::ZERO))?;

        self.draft_message.clear();
        self.advance(WizardState::MessagePosted);
        info!(wish_id = %resp.wish_id, "guestbook message posted");
        Ok(resp.wish_id)
    }

    fn guest_token(&self, message: &str, after: Duration) -> Result<&str, ClientError> {
        self.session
            .as_ref()
            .map(|s| s.token.as_str())
            .ok_or_else(|| ClientError::RsvpRequired {
                message: message.to_string(),
                redirect_to: Route::Rsvp,
                after,
            })
    }

    fn advance(&mut self, to: WizardState) {
        self.state = self.state.max(to);
    }
}

fn validation(err: ApiError) -> ClientError {
    ClientError::Validation(err.message)
}

/// A session the server no longer accepts is handled like a missing one.
fn rsvp_on_unauthorized(err: ClientError, after: Duration) -> ClientError {
    match err {
        ClientError::Api(e) if e.code == ErrorCode::Unauthorized => ClientError::RsvpRequired {
            message: e.message,
            redirect_to: Route::Rsvp,
            after,
        },
        other => other,
    }
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
