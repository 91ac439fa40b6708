use super::*;
use jsonwebtoken::{decode, DecodingKey, Validation};

fn cfg() -> TokenConfig {
    TokenConfig {
        issuer: "invite-test".into(),
        secret: "devsecret".into(),
        guest_ttl_seconds: 60,
        admin_ttl_seconds: 60,
    }
}

#[test]
fn guest_token_round_trips_to_same_guest() {
    let cfg = cfg();
    let token = mint_guest_token(&cfg, GuestId(7)).expect("token");
    assert_eq!(verify_guest_token(&cfg, &token).expect("verify"), GuestId(7));
}

#[test]
fn guest_token_claims_contain_subject_and_audience() {
    let cfg = cfg();
    let token = mint_guest_token(&cfg, GuestId(42)).expect("token");

    let mut validation = Validation::default();
    validation.set_audience(&[GUEST_AUDIENCE]);
    let decoded = decode::<serde_json::Value>(
        &token,
        &DecodingKey::from_secret(cfg.secret.as_bytes()),
        &validation,
    )
    .expect("decode");

    assert_eq!(decoded.claims["iss"], "invite-test");
    assert_eq!(decoded.claims["sub"], "guest:42");
    assert_eq!(decoded.claims["aud"], "guest");
}

#[test]
fn guest_token_signed_with_other_secret_is_rejected() {
    let token = mint_guest_token(&cfg(), GuestId(1)).expect("token");
    let mut other = cfg();
    other.secret = "not-the-secret".into();
    assert!(matches!(
        verify_guest_token(&other, &token),
        Err(AuthError::InvalidToken(_))
    ));
}

#[test]
fn expired_guest_token_is_rejected() {
    let mut cfg = cfg();
    cfg.guest_ttl_seconds = -120;
    let token = mint_guest_token(&cfg, GuestId(1)).expect("token");
    assert!(verify_guest_token(&cfg, &token).is_err());
}

#[test]
fn bare_guest_id_is_not_a_token() {
    assert!(verify_guest_token(&cfg(), "1").is_err());
}

#[test]
fn admin_and_guest_tokens_are_not_interchangeable() {
    let cfg = cfg();
    let guest = mint_guest_token(&cfg, GuestId(3)).expect("guest token");
    let admin = mint_admin_token(&cfg, "owner@example.com").expect("admin token");

    assert!(verify_admin_token(&cfg, &guest).is_err());
    assert!(verify_guest_token(&cfg, &admin.token).is_err());

    let claims = verify_admin_token(&cfg, &admin.token).expect("admin claims");
    assert_eq!(claims.email(), "owner@example.com");
    assert_eq!(claims.session_id(), admin.session_id);
    assert_eq!(claims.exp, admin.expires_at.timestamp());
}

#[test]
fn password_hash_verifies_only_the_original_password() {
    let hash = hash_password("correct horse").expect("hash");
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("correct horse", &hash).expect("verify"));
    assert!(!verify_password("wrong", &hash).expect("verify"));
    assert!(verify_password("correct horse", "not-a-phc-string").is_err());
}
