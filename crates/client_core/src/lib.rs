use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::GiftId,
    error::{ApiError, ApiException, ErrorCode},
    protocol::{
        AdminLoginRequest, AdminLoginResponse, DashboardResponse, EventDetails, ExportKind,
        GiftListResponse, ReserveGiftResponse, RsvpRequest, RsvpResponse, WishRequest,
        WishResponse,
    },
};
use tracing::{debug, warn};
use url::Url;

pub mod error;
pub mod routes;
pub mod session;
pub mod wizard;

pub use error::ClientError;
pub use routes::{workflow_status, Route, StepStatus, WorkflowStep};
pub use session::{FileSessionStore, GuestSession, MemorySessionStore, SessionStore};
pub use wizard::{Navigation, Wizard, WizardState};

/// Thin HTTP binding of the invitation API. Holds no session state; tokens
/// are passed per call.
#[derive(Clone)]
pub struct InviteClient {
    http: Client,
    base: Url,
}

impl InviteClient {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(server_url)
            .map_err(|e| ClientError::Validation(format!("invalid server url '{server_url}': {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::Validation(format!("invalid request path '{path}': {e}")))
    }

    pub async fn event(&self) -> Result<EventDetails, ClientError> {
        let req = self.http.get(self.url("api/event")?);
        json_response(req).await
    }

    pub async fn submit_rsvp(&self, req: &RsvpRequest) -> Result<RsvpResponse, ClientError> {
        self.post_json("api/rsvp", None, req).await
    }

    pub async fn list_gifts(&self) -> Result<GiftListResponse, ClientError> {
        let req = self.http.get(self.url("api/gifts")?);
        json_response(req).await
    }

    pub async fn reserve_gift(
        &self,
        guest_token: Option<&str>,
        gift_id: GiftId,
    ) -> Result<ReserveGiftResponse, ClientError> {
        self.post_json(
            &format!("api/gifts/{gift_id}/reserve"),
            guest_token,
            &serde_json::json!({}),
        )
        .await
    }

    pub async fn post_wish(
        &self,
        guest_token: Option<&str>,
        req: &WishRequest,
    ) -> Result<WishResponse, ClientError> {
        self.post_json("api/wishes", guest_token, req).await
    }

    pub async fn admin_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AdminLoginResponse, ClientError> {
        let req = AdminLoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        self.post_json("api/admin/login", None, &req).await
    }

    pub async fn admin_logout(&self, admin_token: &str) -> Result<(), ClientError> {
        let req = self
            .http
            .post(self.url("api/admin/logout")?)
            .bearer_auth(admin_token);
        checked(req.send().await?).await?;
        Ok(())
    }

    pub async fn dashboard(&self, admin_token: &str) -> Result<DashboardResponse, ClientError> {
        let req = self
            .http
            .get(self.url("api/admin/dashboard")?)
            .bearer_auth(admin_token);
        json_response(req).await
    }

    /// Downloads one spreadsheet as CSV text.
    pub async fn export(&self, admin_token: &str, kind: ExportKind) -> Result<String, ClientError> {
        let req = self
            .http
            .get(self.url(&format!("api/admin/export/{}", kind.route_segment()))?)
            .bearer_auth(admin_token);
        Ok(checked(req.send().await?).await?.text().await?)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, ClientError> {
        let mut req = self.http.post(self.url(path)?).json(body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        json_response(req).await
    }
}

async fn json_response<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ClientError> {
    Ok(checked(req.send().await?).await?.json().await?)
}

/// Turns a non-success response into `ClientError::Api`, using the server's
/// error body when it has one.
async fn checked(res: Response) -> Result<Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        debug!(url = %res.url(), %status, "request succeeded");
        return Ok(res);
    }

    let url = res.url().clone();
    let body = res.text().await.unwrap_or_default();
    let err = serde_json::from_str::<ApiError>(&body).unwrap_or_else(|_| {
        ApiError::new(
            fallback_code(status.as_u16()),
            format!("server returned {status}"),
        )
    });
    warn!(%url, %status, code = ?err.code, message = %err.message, "request rejected");
    Err(ClientError::Api(ApiException::from(err)))
}

fn fallback_code(status: u16) -> ErrorCode {
    match status {
        400 | 413 | 415 | 422 => ErrorCode::Validation,
        401 => ErrorCode::Unauthorized,
        403 => ErrorCode::Forbidden,
        404 => ErrorCode::NotFound,
        409 => ErrorCode::Conflict,
        _ => ErrorCode::Internal,
    }
}

#[cfg(test)]
#[path = "tests/mock_server.rs"]
mod mock_server;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
