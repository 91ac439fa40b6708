use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    categories::CategoryTab,
    domain::{Gift, GiftId, Guest, GuestId, RsvpStatus, Wish, WishId},
    error::{ApiError, ErrorCode},
};

pub const MAX_PARTY_MEMBERS: u32 = 50;
pub const MAX_WISH_CHARS: usize = 2000;
pub const MISSING_RSVP_FIELDS: &str = "Please fill out all required fields.";
pub const RSVP_REQUIRED_FOR_GIFT: &str = "Please RSVP first to reserve a gift.";
pub const RSVP_REQUIRED_FOR_WISH: &str = "Please RSVP first before leaving a message.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsvpRequest {
    pub name: String,
    pub contact: String,
    #[serde(default)]
    pub rsvp_status: RsvpStatus,
    #[serde(default = "default_adults")]
    pub adults_count: u32,
    #[serde(default)]
    pub children_count: u32,
}

fn default_adults() -> u32 {
    1
}

impl RsvpRequest {
    /// Trims the text fields and applies the form rules: name and contact
    /// are required, party sizes are bounded, and a guest who declines
    /// brings nobody.
    pub fn normalized(&self) -> Result<Self, ApiError> {
        let name = self.name.trim();
        let contact = self.contact.trim();
        if name.is_empty() || contact.is_empty() {
            return Err(ApiError::new(ErrorCode::Validation, MISSING_RSVP_FIELDS));
        }
        if self.adults_count > MAX_PARTY_MEMBERS || self.children_count > MAX_PARTY_MEMBERS {
            return Err(ApiError::new(
                ErrorCode::Validation,
                format!("party size is limited to {MAX_PARTY_MEMBERS} adults and {MAX_PARTY_MEMBERS} children"),
            ));
        }

        let (adults_count, children_count) = match self.rsvp_status {
            RsvpStatus::NotAttending => (0, 0),
            _ => (self.adults_count, self.children_count),
        };
        Ok(Self {
            name: name.to_string(),
            contact: contact.to_string(),
            rsvp_status: self.rsvp_status,
            adults_count,
            children_count,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsvpResponse {
    pub guest_id: GuestId,
    pub guest_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftListResponse {
    pub gifts: Vec<Gift>,
    pub categories: Vec<CategoryTab>,
}

impl GiftListResponse {
    pub fn gift(&self, gift_id: GiftId) -> Option<&Gift> {
        self.gifts.iter().find(|g| g.gift_id == gift_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveGiftResponse {
    pub gift: Gift,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishRequest {
    pub message: String,
}

impl WishRequest {
    pub fn normalized(&self) -> Result<Self, ApiError> {
        let message = self.message.trim();
        if message.is_empty() {
            return Err(ApiError::new(ErrorCode::Validation, "message cannot be empty"));
        }
        if message.chars().count() > MAX_WISH_CHARS {
            return Err(ApiError::new(
                ErrorCode::Validation,
                format!("message exceeds {MAX_WISH_CHARS} characters"),
            ));
        }
        Ok(Self {
            message: message.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishResponse {
    pub wish_id: WishId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_guests: u64,
    pub attending: u64,
    pub not_attending: u64,
    pub maybe: u64,
    pub total_adults: u64,
    pub total_children: u64,
    pub total_gifts: u64,
    pub reserved_gifts: u64,
    pub total_wishes: u64,
}

impl DashboardStats {
    /// Share of gifts already reserved, `0.0` for an empty registry.
    pub fn reservation_ratio(&self) -> f64 {
        if self.total_gifts == 0 {
            0.0
        } else {
            self.reserved_gifts as f64 / self.total_gifts as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub stats: DashboardStats,
    pub reservation_ratio: f64,
    pub guests: Vec<Guest>,
    pub gifts: Vec<Gift>,
    pub wishes: Vec<Wish>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Guests,
    Gifts,
    Wishes,
}

impl ExportKind {
    pub fn filename(self) -> &'static str {
        match self {
            Self::Guests => "guest-list.csv",
            Self::Gifts => "gift-registry.csv",
            Self::Wishes => "guestbook.csv",
        }
    }

    /// Path segment under `/api/admin/export/`.
    pub fn route_segment(self) -> &'static str {
        match self {
            Self::Guests => "guests.csv",
            Self::Gifts => "gifts.csv",
            Self::Wishes => "wishes.csv",
        }
    }

    pub fn from_route_segment(segment: &str) -> Option<Self> {
        [Self::Guests, Self::Gifts, Self::Wishes]
            .into_iter()
            .find(|kind| kind.route_segment() == segment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub label: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryImage {
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    pub title: String,
    pub headline: String,
    pub schedule: Vec<ScheduleEntry>,
    pub venue: Venue,
    #[serde(default)]
    pub gallery: Vec<GalleryImage>,
}

/// Landing page photos in display order, served from `/gallery/`.
const DEFAULT_GALLERY: &[(&str, &str)] = &[
    ("JJ1.jpeg", "Baby Jonathan wrapped in a soft blanket"),
    ("JJ2.jpeg", "Jonathan in star-patterned outfit"),
    ("JJ3.jpeg", "Jonathan in formal attire with bow tie"),
    ("JJ4.jpeg", "Jonathan in yellow overalls"),
    ("JJ5.jpeg", "Jonathan in adorable blue bear outfit"),
    ("JJ6.jpeg", "Jonathan in cozy blue bear costume"),
    ("JJ7.jpeg", "Jonathan in mint green outfit"),
    ("JJ8.jpeg", "Jonathan smiling in red outfit"),
    ("JJ9.jpeg", "Jonathan looking curious"),
    ("JJ10.jpeg", "Jonathan in blue fuzzy outfit smiling"),
    ("JJ11.jpeg", "Jonathan with dad"),
    ("JJ12.jpeg", "Jonathan on 1 month"),
    ("JJ13.jpeg", "Jonathan on 1 month"),
    ("JJ14.jpeg", "Jonathan on 1 month"),
    ("JJ15.jpeg", "Jonathan on 1 month"),
    ("JJ16.jpeg", "Jonathan on 1 month"),
    ("JJ18.jpeg", "Jonathan on 1 month"),
    ("JJ20.jpeg", "Jonathan on 1 month"),
    ("JJ21.jpeg", "Jonathan on 1 month"),
];

impl Default for EventDetails {
    fn default() -> Self {
        Self {
            title: "Welcome to Bill Adams' World".into(),
            headline: "Your presence and support mean the world to me!".into(),
            schedule: vec![
                ScheduleEntry {
                    label: "Graduation Ceremony".into(),
                    date: "2025-11-14".into(),
                    time: Some("9:00AM - 1:00PM".into()),
                },
                ScheduleEntry {
                    label: "Birthday Bash".into(),
                    date: "2025-11-15".into(),
                    time: None,
                },
            ],
            venue: Venue {
                name: "A.S.K Dome".into(),
                map_url: Some("https://maps.app.goo.gl/hj9t6Ah2ZooddgU76".into()),
            },
            gallery: DEFAULT_GALLERY
                .iter()
                .map(|(file, alt)| GalleryImage {
                    src: format!("/gallery/{file}"),
                    alt: (*alt).to_string(),
                })
                .collect(),
        }
    }
}
