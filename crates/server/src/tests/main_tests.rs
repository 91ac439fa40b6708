use super::*;
use axum::{
    body::{self, Body},
    http::Request,
    response::Response,
};
use storage::NewGift;
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "owner@example.com";
const ADMIN_PASSWORD: &str = "let-me-in";

async fn test_app() -> (Router, Storage) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let settings = Settings {
        admin_email: ADMIN_EMAIL.into(),
        admin_password: Some(ADMIN_PASSWORD.into()),
        token_secret: "router-test-secret".into(),
        ..Settings::default()
    };
    bootstrap_admin(&storage, &settings).await.expect("bootstrap");

    let api = api_context(storage.clone(), settings);
    (build_router(Arc::new(AppState { api })), storage)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

async fn rsvp(app: &Router, name: &str) -> RsvpResponse {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/rsvp",
            None,
            serde_json::json!({
                "name": name,
                "contact": "guest@example.com",
                "rsvp_status": "attending",
                "adults_count": 1,
                "children_count": 0,
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await
}

async fn admin_token(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/admin/login",
            None,
            serde_json::json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    read_json::<AdminLoginResponse>(response).await.token
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let (app, _storage) = test_app().await;
    let response = app.oneshot(get("/healthz", None)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn event_route_serves_configured_details() {
    let (app, _storage) = test_app().await;
    let response = app.oneshot(get("/api/event", None)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let event: EventDetails = read_json(response).await;
    assert_eq!(event, EventDetails::default());
}

#[tokio::test]
async fn unknown_paths_return_not_found_json() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(get("/no/such/page", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let err: ApiError = read_json(response).await;
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn rsvp_with_missing_name_is_bad_request() {
    let (app, storage) = test_app().await;
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/rsvp",
            None,
            serde_json::json!({ "name": "", "contact": "x@example.com" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = read_json(response).await;
    assert_eq!(err.message, "Please fill out all required fields.");
    assert!(storage.list_guests().await.expect("guests").is_empty());
}

#[tokio::test]
async fn malformed_json_is_reported_as_validation_error() {
    let (app, _storage) = test_app().await;
    let request = Request::post("/api/rsvp")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = read_json(response).await;
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn non_numeric_gift_id_is_reported_as_validation_error() {
    let (app, _storage) = test_app().await;
    let guest = rsvp(&app, "Asha").await;
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/gifts/abc/reserve",
            Some(&guest.guest_token),
            serde_json::json!({}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = read_json(response).await;
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let (app, _storage) = test_app().await;
    let message = "x".repeat(MAX_REQUEST_BYTES + 1);
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/wishes",
            None,
            serde_json::json!({ "message": message }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn asha_reserves_stroller_and_leaves_message() {
    let (app, storage) = test_app().await;
    let stroller = storage
        .insert_gift(&NewGift {
            name: "Stroller".into(),
            ..NewGift::default()
        })
        .await
        .expect("gift");

    let asha = rsvp(&app, "Asha").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/gifts/{}/reserve", stroller.0),
            Some(&asha.guest_token),
            serde_json::json!({}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let reserved: ReserveGiftResponse = read_json(response).await;
    assert_eq!(reserved.gift.reserved_by(), Some(asha.guest_id));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/wishes",
            Some(&asha.guest_token),
            serde_json::json!({ "message": "Congratulations!" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/api/gifts", None))
        .await
        .expect("response");
    let listing: GiftListResponse = read_json(response).await;
    let gift = listing.gift(stroller).expect("listed");
    assert!(gift.is_reserved());
    assert_eq!(
        gift.reservation.as_ref().and_then(|r| r.guest_name.as_deref()),
        Some("Asha")
    );
}

#[tokio::test]
async fn reserve_without_token_is_unauthorized_and_leaves_gift_free() {
    let (app, storage) = test_app().await;
    let crib = storage
        .insert_gift(&NewGift {
            name: "Crib".into(),
            ..NewGift::default()
        })
        .await
        .expect("gift");

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/gifts/{}/reserve", crib.0),
            None,
            serde_json::json!({}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let err: ApiError = read_json(response).await;
    assert_eq!(err.message, "Please RSVP first to reserve a gift.");

    let stored = storage.gift(crib).await.expect("query").expect("gift");
    assert!(!stored.is_reserved());
}

#[tokio::test]
async fn second_reservation_returns_conflict() {
    let (app, storage) = test_app().await;
    let crib = storage
        .insert_gift(&NewGift {
            name: "Crib".into(),
            ..NewGift::default()
        })
        .await
        .expect("gift");
    let first = rsvp(&app, "Ada").await;
    let second = rsvp(&app, "Ben").await;
    let uri = format!("/api/gifts/{}/reserve", crib.0);

    let response = app
        .clone()
        .oneshot(json_request("POST", &uri, Some(&first.guest_token), serde_json::json!({})))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request("POST", &uri, Some(&second.guest_token), serde_json::json!({})))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn admin_routes_require_sign_in() {
    let (app, _storage) = test_app().await;
    let response = app
        .clone()
        .oneshot(get("/api/admin/dashboard", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let guest = rsvp(&app, "Asha").await;
    let response = app
        .oneshot(get("/api/admin/export/guests.csv", Some(&guest.guest_token)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_login_with_other_email_is_forbidden() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/admin/login",
            None,
            serde_json::json!({ "email": "intruder@example.com", "password": ADMIN_PASSWORD }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn dashboard_and_export_work_until_logout() {
    let (app, _storage) = test_app().await;
    rsvp(&app, "Asha").await;
    let token = admin_token(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/admin/dashboard", Some(&token)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let dash: DashboardResponse = read_json(response).await;
    assert_eq!(dash.stats.total_guests, 1);

    let response = app
        .clone()
        .oneshot(get("/api/admin/export/guests.csv", Some(&token)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"guest-list.csv\""
    );
    let csv = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let csv = String::from_utf8(csv.to_vec()).expect("utf8");
    assert!(csv.starts_with("Name,Contact,RSVP Status,Adults,Children,Date\n"));
    assert!(csv.contains("Asha,guest@example.com,attending,1,0,"));

    let response = app
        .clone()
        .oneshot(get("/api/admin/export/unknown.csv", Some(&token)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/admin/logout", Some(&token), serde_json::json!({})))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get("/api/admin/dashboard", Some(&token)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
