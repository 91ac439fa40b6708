use auth::{AdminClaims, TokenConfig};
use chrono::Utc;
use shared::{
    categories,
    domain::{GiftId, GuestId},
    error::{ApiError, ErrorCode},
    protocol::{
        AdminLoginRequest, AdminLoginResponse, DashboardResponse, EventDetails, ExportKind,
        GiftListResponse, ReserveGiftResponse, RsvpRequest, RsvpResponse, WishRequest,
        WishResponse, RSVP_REQUIRED_FOR_GIFT, RSVP_REQUIRED_FOR_WISH,
    },
};
use storage::{normalize_email, NewGuest, ReserveOutcome, Storage};
use tracing::{info, warn};

pub mod export;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub tokens: TokenConfig,
    pub admin_email: String,
    pub event: EventDetails,
}

pub fn event_details(ctx: &ApiContext) -> EventDetails {
    ctx.event.clone()
}

pub async fn submit_rsvp(ctx: &ApiContext, req: &RsvpRequest) -> Result<RsvpResponse, ApiError> {
    let req = req.normalized()?;
    let guest_id = ctx
        .storage
        .create_guest(&NewGuest {
            name: req.name,
            contact: req.contact,
            rsvp_status: req.rsvp_status,
            adults_count: req.adults_count,
            children_count: req.children_count,
        })
        .await
        .map_err(internal)?;
    let guest_token = auth::mint_guest_token(&ctx.tokens, guest_id)
        .map_err(|e| ApiError::new(ErrorCode::Internal, format!("token mint failed: {e}")))?;

    info!(%guest_id, status = %req.rsvp_status, "rsvp recorded");
    Ok(RsvpResponse {
        guest_id,
        guest_token,
    })
}

pub async fn list_gifts(ctx: &ApiContext) -> Result<GiftListResponse, ApiError> {
    let gifts = ctx.storage.list_gifts().await.map_err(internal)?;
    let categories = categories::partition(&gifts);
    Ok(GiftListResponse { gifts, categories })
}

pub async fn reserve_gift(
    ctx: &ApiContext,
    guest_token: Option<&str>,
    gift_id: GiftId,
) -> Result<ReserveGiftResponse, ApiError> {
    let guest_id = authenticate_guest(ctx, guest_token, RSVP_REQUIRED_FOR_GIFT).await?;

    match ctx
        .storage
        .reserve_gift(gift_id, guest_id, Utc::now())
        .await
        .map_err(internal)?
    {
        ReserveOutcome::Reserved(gift) => {
            info!(%gift_id, %guest_id, "gift reserved");
            Ok(ReserveGiftResponse { gift })
        }
        ReserveOutcome::AlreadyReserved(_) => {
            warn!(%gift_id, %guest_id, "gift already reserved");
            Err(ApiError::new(ErrorCode::Conflict, "gift is already reserved"))
        }
        ReserveOutcome::NotFound => Err(ApiError::new(ErrorCode::NotFound, "gift not found")),
    }
}

pub async fn post_wish(
    ctx: &ApiContext,
    guest_token: Option<&str>,
    req: &WishRequest,
) -> Result<WishResponse, ApiError> {
    let guest_id = authenticate_guest(ctx, guest_token, RSVP_REQUIRED_FOR_WISH).await?;
    let req = req.normalized()?;
    let wish_id = ctx
        .storage
        .insert_wish(guest_id, &req.message)
        .await
        .map_err(internal)?;
    info!(%wish_id, %guest_id, "guestbook message posted");
    Ok(WishResponse { wish_id })
}

/// Resolves the guest behind a session token. A missing token is reported
/// with `missing_message` so the caller can send the visitor to the RSVP form.
pub async fn authenticate_guest(
    ctx: &ApiContext,
    guest_token: Option<&str>,
    missing_message: &str,
) -> Result<GuestId, ApiError> {
    let Some(token) = guest_token.map(str::trim).filter(|t| !t.is_empty()) else {
        return Err(ApiError::new(ErrorCode::Unauthorized, missing_message));
    };
    let guest_id = auth::verify_guest_token(&ctx.tokens, token).map_err(|e| {
        warn!(error = %e, "guest token rejected");
        ApiError::new(ErrorCode::Unauthorized, "guest session is invalid or expired")
    })?;
    ctx.storage
        .guest(guest_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::Unauthorized, "guest not found"))?;
    Ok(guest_id)
}

pub async fn admin_login(
    ctx: &ApiContext,
    req: &AdminLoginRequest,
) -> Result<AdminLoginResponse, ApiError> {
    let email = normalize_email(&req.email);
    if email != normalize_email(&ctx.admin_email) {
        warn!(%email, "admin sign-in refused for unlisted identity");
        return Err(ApiError::new(
            ErrorCode::Forbidden,
            "You are not authorized to access the admin dashboard",
        ));
    }

    let invalid = || ApiError::new(ErrorCode::Unauthorized, "Invalid credentials");
    let hash = ctx
        .storage
        .admin_password_hash(&email)
        .await
        .map_err(internal)?
        .ok_or_else(invalid)?;
    let matches = auth::verify_password(&req.password, &hash)
        .map_err(|e| ApiError::new(ErrorCode::Internal, e.to_string()))?;
    if !matches {
        warn!(%email, "admin sign-in with wrong password");
        return Err(invalid());
    }

    let issued = auth::mint_admin_token(&ctx.tokens, &email)
        .map_err(|e| ApiError::new(ErrorCode::Internal, format!("token mint failed: {e}")))?;
    ctx.storage
        .create_admin_session(issued.session_id, &email, issued.expires_at)
        .await
        .map_err(internal)?;

    info!(%email, session_id = %issued.session_id, "admin signed in");
    Ok(AdminLoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
    })
}

/// Checks signature, audience, allowed identity and that the session has
/// not been signed out.
pub async fn authorize_admin(
    ctx: &ApiContext,
    admin_token: Option<&str>,
) -> Result<AdminClaims, ApiError> {
    let token = admin_token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::new(ErrorCode::Unauthorized, "sign-in required"))?;
    let claims = auth::verify_admin_token(&ctx.tokens, token)
        .map_err(|_| ApiError::new(ErrorCode::Unauthorized, "admin session is invalid or expired"))?;

    if normalize_email(claims.email()) != normalize_email(&ctx.admin_email) {
        return Err(ApiError::new(ErrorCode::Forbidden, "not the event owner"));
    }

    let session_email = ctx
        .storage
        .admin_session_email(claims.session_id(), Utc::now())
        .await
        .map_err(internal)?;
    if session_email.as_deref() != Some(normalize_email(claims.email()).as_str()) {
        return Err(ApiError::new(ErrorCode::Unauthorized, "admin session has ended"));
    }
    Ok(claims)
}

pub async fn admin_logout(ctx: &ApiContext, admin_token: Option<&str>) -> Result<(), ApiError> {
    let claims = authorize_admin(ctx, admin_token).await?;
    ctx.storage
        .delete_admin_session(claims.session_id())
        .await
        .map_err(internal)?;
    if let Err(error) = ctx.storage.purge_expired_admin_sessions(Utc::now()).await {
        warn!(%error, "failed to purge expired admin sessions");
    }
    info!(email = %claims.email(), "admin signed out");
    Ok(())
}

pub async fn dashboard(
    ctx: &ApiContext,
    _claims: &AdminClaims,
) -> Result<DashboardResponse, ApiError> {
    let (stats, guests, gifts, wishes) = futures::try_join!(
        ctx.storage.dashboard_stats(),
        ctx.storage.list_guests(),
        ctx.storage.list_gifts(),
        ctx.storage.list_wishes(),
    )
    .map_err(internal)?;

    Ok(DashboardResponse {
        reservation_ratio: stats.reservation_ratio(),
        stats,
        guests,
        gifts,
        wishes,
    })
}

pub async fn export_csv(
    ctx: &ApiContext,
    _claims: &AdminClaims,
    kind: ExportKind,
) -> Result<String, ApiError> {
    let csv = match kind {
        ExportKind::Guests => export::guests_csv(&ctx.storage.list_guests().await.map_err(internal)?),
        ExportKind::Gifts => export::gifts_csv(&ctx.storage.list_gifts().await.map_err(internal)?),
        ExportKind::Wishes => {
            export::wishes_csv(&ctx.storage.list_wishes().await.map_err(internal)?)
        }
    };
    info!(file = kind.filename(), bytes = csv.len(), "export generated");
    Ok(csv)
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
