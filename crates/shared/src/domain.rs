use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(GuestId);
id_newtype!(GiftId);
id_newtype!(WishId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    #[default]
    Attending,
    NotAttending,
    Maybe,
}

impl RsvpStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attending => "attending",
            Self::NotAttending => "not_attending",
            Self::Maybe => "maybe",
        }
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

impl FromStr for RsvpStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attending" | "yes" => Ok(Self::Attending),
            "not_attending" | "not-attending" | "no" => Ok(Self::NotAttending),
            "maybe" => Ok(Self::Maybe),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Tabs of the gift list. `All` doubles as the bucket for gifts no rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GiftCategory {
    All,
    Money,
    Fashion,
    Tech,
    Experience,
}

impl GiftCategory {
    pub const TAB_ORDER: [GiftCategory; 5] = [
        Self::All,
        Self::Money,
        Self::Fashion,
        Self::Tech,
        Self::Experience,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Money => "money",
            Self::Fashion => "fashion",
            Self::Tech => "tech",
            Self::Experience => "experience",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All Gifts",
            Self::Money => "Money Gifts",
            Self::Fashion => "Fashion & Style",
            Self::Tech => "Tech & Gadgets",
            Self::Experience => "Experiences & Development",
        }
    }
}

impl fmt::Display for GiftCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GiftCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "money" => Ok(Self::Money),
            "fashion" => Ok(Self::Fashion),
            "tech" => Ok(Self::Tech),
            "experience" => Ok(Self::Experience),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub guest_id: GuestId,
    pub name: String,
    pub contact: String,
    pub rsvp_status: RsvpStatus,
    pub adults_count: u32,
    pub children_count: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftReservation {
    pub guest_id: GuestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<String>,
    pub reserved_at: DateTime<Utc>,
}

/// A reserved gift always carries its reservation, so the reserved flag and
/// the reserving guest cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gift {
    pub gift_id: GiftId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_estimate_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<GiftCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation: Option<GiftReservation>,
}

impl Gift {
    pub fn is_reserved(&self) -> bool {
        self.reservation.is_some()
    }

    pub fn reserved_by(&self) -> Option<GuestId> {
        self.reservation.as_ref().map(|r| r.guest_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wish {
    pub wish_id: WishId,
    pub guest_id: GuestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Formats whole cents as `123.45`.
pub fn format_price(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
