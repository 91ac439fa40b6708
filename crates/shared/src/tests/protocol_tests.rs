use crate::{
    domain::{format_price, RsvpStatus},
    error::{ApiError, ErrorCode},
    protocol::{
        DashboardStats, EventDetails, ExportKind, RsvpRequest, WishRequest, MAX_WISH_CHARS, MISSING_RSVP_FIELDS,
    },
};

fn request(name: &str, contact: &str, status: RsvpStatus) -> RsvpRequest {
    RsvpRequest {
        name: name.into(),
        contact: contact.into(),
        rsvp_status: status,
        adults_count: 2,
        children_count: 1,
    }
}

#[test]
fn rsvp_requires_name_and_contact() {
    for (name, contact) in [("", "a@b.c"), ("Asha", ""), ("   ", "a@b.c"), ("Asha", "\t")] {
        let err = request(name, contact, RsvpStatus::Attending)
            .normalized()
            .expect_err("should be rejected");
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.message, MISSING_RSVP_FIELDS);
    }
}

#[test]
fn rsvp_normalization_trims_and_zeroes_declined_party() {
    let ok = request("  Asha ", " asha@example.com", RsvpStatus::Attending)
        .normalized()
        .expect("valid");
    assert_eq!(ok.name, "Asha");
    assert_eq!(ok.contact, "asha@example.com");
    assert_eq!((ok.adults_count, ok.children_count), (2, 1));

    let declined = request("Ben", "0700", RsvpStatus::NotAttending)
        .normalized()
        .expect("valid");
    assert_eq!((declined.adults_count, declined.children_count), (0, 0));
}

#[test]
fn rsvp_rejects_oversized_party() {
    let mut req = request("Asha", "asha@example.com", RsvpStatus::Maybe);
    req.children_count = 51;
    assert_eq!(req.normalized().expect_err("too many").code, ErrorCode::Validation);
}

#[test]
fn wish_message_must_have_content_and_bounded_length() {
    let blank = WishRequest { message: "  \n ".into() };
    assert!(blank.normalized().is_err());

    let long = WishRequest {
        message: "x".repeat(MAX_WISH_CHARS + 1),
    };
    assert!(long.normalized().is_err());

    let ok = WishRequest {
        message: " Happy birthday! ".into(),
    }
    .normalized()
    .expect("valid");
    assert_eq!(ok.message, "Happy birthday!");
}

#[test]
fn rsvp_status_uses_snake_case_on_the_wire() {
    let json = serde_json::to_string(&RsvpStatus::NotAttending).expect("json");
    assert_eq!(json, "\"not_attending\"");
    assert_eq!("not_attending".parse::<RsvpStatus>(), Ok(RsvpStatus::NotAttending));
    assert!("sometimes".parse::<RsvpStatus>().is_err());
}

#[test]
fn rsvp_request_defaults_match_the_form() {
    let req: RsvpRequest =
        serde_json::from_str(r#"{"name":"Asha","contact":"asha@example.com"}"#).expect("json");
    assert_eq!(req.rsvp_status, RsvpStatus::Attending);
    assert_eq!(req.adults_count, 1);
    assert_eq!(req.children_count, 0);
}

#[test]
fn error_codes_serialize_snake_case() {
    let err = ApiError::new(ErrorCode::NotFound, "gift not found");
    let value = serde_json::to_value(&err).expect("json");
    assert_eq!(value["code"], "not_found");
    assert_eq!(value["message"], "gift not found");
}

#[test]
fn reservation_ratio_handles_empty_registry() {
    assert_eq!(DashboardStats::default().reservation_ratio(), 0.0);
    let stats = DashboardStats {
        total_gifts: 4,
        reserved_gifts: 1,
        ..DashboardStats::default()
    };
    assert!((stats.reservation_ratio() - 0.25).abs() < f64::EPSILON);
}

#[test]
fn export_route_segments_resolve() {
    assert_eq!(ExportKind::from_route_segment("gifts.csv"), Some(ExportKind::Gifts));
    assert_eq!(ExportKind::from_route_segment("gifts.json"), None);
    assert_eq!(ExportKind::Guests.filename(), "guest-list.csv");
}

#[test]
fn formats_prices_from_cents() {
    assert_eq!(format_price(12_345), "123.45");
    assert_eq!(format_price(5), "0.05");
    assert_eq!(format_price(-250), "-2.50");
}

#[test]
fn default_event_ships_the_photo_gallery_in_order() {
    let gallery = EventDetails::default().gallery;
    assert_eq!(gallery.len(), 19);
    assert_eq!(gallery[0].src, "/gallery/JJ1.jpeg");
    assert_eq!(gallery[0].alt, "Baby Jonathan wrapped in a soft blanket");
    assert_eq!(gallery[10].alt, "Jonathan with dad");
    assert_eq!(gallery[18].src, "/gallery/JJ21.jpeg");
    assert!(gallery.iter().all(|image| !image.alt.is_empty()));
}

#[test]
fn unknown_error_codes_are_rejected() {
    let parsed = serde_json::from_value::<ApiError>(serde_json::json!({
        "code": "rate_limited",
        "message": "slow down",
    }));
    assert!(parsed.is_err());
}
