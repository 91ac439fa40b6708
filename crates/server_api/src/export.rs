//! Spreadsheet exports for the admin dashboard.

use shared::{
    categories::effective_category,
    domain::{format_price, Gift, Guest, Wish},
};

const GUEST_HEADER: [&str; 6] = ["Name", "Contact", "RSVP Status", "Adults", "Children", "Date"];
const GIFT_HEADER: [&str; 7] = [
    "Name",
    "Category",
    "Price",
    "Reserved",
    "Reserved By",
    "Reserved At",
    "Link",
];
const WISH_HEADER: [&str; 3] = ["Guest", "Message", "Date"];

pub fn guests_csv(guests: &[Guest]) -> String {
    let mut out = String::new();
    push_row(&mut out, GUEST_HEADER);
    for guest in guests {
        push_row(
            &mut out,
            [
                guest.name.clone(),
                guest.contact.clone(),
                guest.rsvp_status.to_string(),
                guest.adults_count.to_string(),
                guest.children_count.to_string(),
                guest.created_at.format("%Y-%m-%d").to_string(),
            ],
        );
    }
    out
}

pub fn gifts_csv(gifts: &[Gift]) -> String {
    let mut out = String::new();
    push_row(&mut out, GIFT_HEADER);
    for gift in gifts {
        let (reserved_by, reserved_at) = match &gift.reservation {
            Some(r) => (
                r.guest_name
                    .clone()
                    .unwrap_or_else(|| format!("guest #{}", r.guest_id)),
                r.reserved_at.to_rfc3339(),
            ),
            None => (String::new(), String::new()),
        };
        push_row(
            &mut out,
            [
                gift.name.clone(),
                effective_category(gift).label().to_string(),
                gift.price_estimate_cents.map(format_price).unwrap_or_default(),
                if gift.is_reserved() { "Yes" } else { "No" }.to_string(),
                reserved_by,
                reserved_at,
                gift.link.clone().unwrap_or_default(),
            ],
        );
    }
    out
}

pub fn wishes_csv(wishes: &[Wish]) -> String {
    let mut out = String::new();
    push_row(&mut out, WISH_HEADER);
    for wish in wishes {
        push_row(
            &mut out,
            [
                wish.guest_name.clone().unwrap_or_default(),
                wish.message.clone(),
                wish.created_at.format("%Y-%m-%d").to_string(),
            ],
        );
    }
    out
}

/// Quotes a field when it contains a delimiter, quote or line break.
pub fn escape(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_row<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let row = fields
        .into_iter()
        .map(|f| escape(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&row);
    out.push('\n');
}

#[cfg(test)]
#[path = "tests/export_tests.rs"]
mod tests;
