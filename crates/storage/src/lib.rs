use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use uuid::Uuid;

use shared::{
    domain::{
        Gift, GiftCategory, GiftId, GiftReservation, Guest, GuestId, RsvpStatus, Wish, WishId,
    },
    protocol::DashboardStats,
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct NewGuest {
    pub name: String,
    pub contact: String,
    pub rsvp_status: RsvpStatus,
    pub adults_count: u32,
    pub children_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct NewGift {
    pub name: String,
    pub description: Option<String>,
    pub price_estimate_cents: Option<i64>,
    pub link: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<GiftCategory>,
}

/// Result of the conditional reservation update.
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    Reserved(Gift),
    AlreadyReserved(Gift),
    NotFound,
}

const GIFT_COLUMNS: &str = "g.id, g.name, g.description, g.price_estimate_cents, g.link, g.image_url, g.category,
     g.is_reserved, g.reserved_by, g.reserved_at, r.name AS reserved_by_name";

const WISH_COLUMNS: &str = "w.id, w.guest_id, w.message, w.created_at, u.name AS guest_name";

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let in_memory = database_url.contains(":memory:");
        let mut connect_options =
            SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        if !in_memory {
            connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
        }

        // each in-memory connection is its own database, so keep exactly one alive
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(connect_options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_guest(&self, guest: &NewGuest) -> Result<GuestId> {
        let rec = sqlx::query(
            "INSERT INTO guests (name, contact, rsvp_status, adults_count, children_count, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&guest.name)
        .bind(&guest.contact)
        .bind(guest.rsvp_status.as_str())
        .bind(i64::from(guest.adults_count))
        .bind(i64::from(guest.children_count))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(GuestId(rec.get::<i64, _>(0)))
    }

    pub async fn guest(&self, guest_id: GuestId) -> Result<Option<Guest>> {
        let row = sqlx::query(
            "SELECT id, name, contact, rsvp_status, adults_count, children_count, created_at
             FROM guests WHERE id = ?",
        )
        .bind(guest_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(guest_from_row).transpose()
    }

    /// Newest first.
    pub async fn list_guests(&self) -> Result<Vec<Guest>> {
        let rows = sqlx::query(
            "SELECT id, name, contact, rsvp_status, adults_count, children_count, created_at
             FROM guests
             ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(guest_from_row).collect()
    }

    pub async fn insert_gift(&self, gift: &NewGift) -> Result<GiftId> {
        let rec = sqlx::query(
            "INSERT INTO gifts (name, description, price_estimate_cents, link, image_url, category)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&gift.name)
        .bind(gift.description.as_deref())
        .bind(gift.price_estimate_cents)
        .bind(gift.link.as_deref())
        .bind(gift.image_url.as_deref())
        .bind(gift.category.map(GiftCategory::as_str))
        .fetch_one(&self.pool)
        .await?;
        Ok(GiftId(rec.get::<i64, _>(0)))
    }

    pub async fn gift(&self, gift_id: GiftId) -> Result<Option<Gift>> {
        let row = sqlx::query(&format!(
            "SELECT {GIFT_COLUMNS}
             FROM gifts g
             LEFT JOIN guests r ON r.id = g.reserved_by
             WHERE g.id = ?"
        ))
        .bind(gift_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(gift_from_row).transpose()
    }

    /// Ascending price, unpriced gifts last.
    pub async fn list_gifts(&self) -> Result<Vec<Gift>> {
        let rows = sqlx::query(&format!(
            "SELECT {GIFT_COLUMNS}
             FROM gifts g
             LEFT JOIN guests r ON r.id = g.reserved_by
             ORDER BY g.price_estimate_cents IS NULL, g.price_estimate_cents ASC, g.id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(gift_from_row).collect()
    }

    /// Marks the gift reserved only if it is still unreserved. SQLite
    /// serializes writers, so of several concurrent callers exactly one sees
    /// a changed row.
    pub async fn reserve_gift(
        &self,
        gift_id: GiftId,
        guest_id: GuestId,
        reserved_at: DateTime<Utc>,
    ) -> Result<ReserveOutcome> {
        let result = sqlx::query(
            "UPDATE gifts
             SET is_reserved = 1, reserved_by = ?, reserved_at = ?
             WHERE id = ? AND is_reserved = 0",
        )
        .bind(guest_id.0)
        .bind(reserved_at)
        .bind(gift_id.0)
        .execute(&self.pool)
        .await?;

        let current = self.gift(gift_id).await?;
        Ok(match (result.rows_affected(), current) {
            (1, Some(gift)) => ReserveOutcome::Reserved(gift),
            (_, Some(gift)) => ReserveOutcome::AlreadyReserved(gift),
            (_, None) => ReserveOutcome::NotFound,
        })
    }

    pub async fn insert_wish(&self, guest_id: GuestId, message: &str) -> Result<WishId> {
        let rec = sqlx::query(
            "INSERT INTO wishes (guest_id, message, created_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(guest_id.0)
        .bind(message)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(WishId(rec.get::<i64, _>(0)))
    }

    /// Newest first.
    pub async fn list_wishes(&self) -> Result<Vec<Wish>> {
        let rows = sqlx::query(&format!(
            "SELECT {WISH_COLUMNS}
             FROM wishes w
             LEFT JOIN guests u ON u.id = w.guest_id
             ORDER BY w.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(wish_from_row).collect()
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let guests = sqlx::query(
            "SELECT COUNT(*),
                    COALESCE(SUM(rsvp_status = 'attending'), 0),
                    COALESCE(SUM(rsvp_status = 'not_attending'), 0),
                    COALESCE(SUM(rsvp_status = 'maybe'), 0),
                    COALESCE(SUM(adults_count), 0),
                    COALESCE(SUM(children_count), 0)
             FROM guests",
        )
        .fetch_one(&self.pool)
        .await?;
        let gifts = sqlx::query("SELECT COUNT(*), COALESCE(SUM(is_reserved), 0) FROM gifts")
            .fetch_one(&self.pool)
            .await?;
        let total_wishes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM wishes")
            .fetch_one(&self.pool)
            .await?;

        let count = |row: &SqliteRow, idx: usize| -> Result<u64> {
            let value: i64 = row.try_get(idx)?;
            Ok(u64::try_from(value).unwrap_or_default())
        };

        Ok(DashboardStats {
            total_guests: count(&guests, 0)?,
            attending: count(&guests, 1)?,
            not_attending: count(&guests, 2)?,
            maybe: count(&guests, 3)?,
            total_adults: count(&guests, 4)?,
            total_children: count(&guests, 5)?,
            total_gifts: count(&gifts, 0)?,
            reserved_gifts: count(&gifts, 1)?,
            total_wishes: u64::try_from(total_wishes).unwrap_or_default(),
        })
    }

    pub async fn upsert_admin_credential(&self, email: &str, password_hash: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO admin_credentials (email, password_hash, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(email) DO UPDATE SET password_hash = excluded.password_hash, updated_at = excluded.updated_at",
        )
        .bind(normalize_email(email))
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn admin_password_hash(&self, email: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT password_hash FROM admin_credentials WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    pub async fn create_admin_session(
        &self,
        session_id: Uuid,
        email: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO admin_sessions (session_id, email, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id.to_string())
        .bind(normalize_email(email))
        .bind(Utc::now())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .context("failed to record admin session")?;
        Ok(())
    }

    /// Email of the signed-in operator if the session exists and has not expired.
    pub async fn admin_session_email(
        &self,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let row = sqlx::query("SELECT email, expires_at FROM admin_sessions WHERE session_id = ?")
            .bind(session_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let expires_at: DateTime<Utc> = row.try_get("expires_at")?;
        if expires_at <= now {
            return Ok(None);
        }
        Ok(Some(row.try_get("email")?))
    }

    pub async fn delete_admin_session(&self, session_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE session_id = ?")
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn purge_expired_admin_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn guest_from_row(row: &SqliteRow) -> Result<Guest> {
    let status: String = row.try_get("rsvp_status")?;
    let adults: i64 = row.try_get("adults_count")?;
    let children: i64 = row.try_get("children_count")?;
    Ok(Guest {
        guest_id: GuestId(row.try_get("id")?),
        name: row.try_get("name")?,
        contact: row.try_get("contact")?,
        rsvp_status: status
            .parse::<RsvpStatus>()
            .with_context(|| format!("corrupt rsvp_status '{status}'"))?,
        adults_count: u32::try_from(adults).unwrap_or_default(),
        children_count: u32::try_from(children).unwrap_or_default(),
        created_at: row.try_get("created_at")?,
    })
}

fn gift_from_row(row: &SqliteRow) -> Result<Gift> {
    let is_reserved: bool = row.try_get("is_reserved")?;
    let reserved_by: Option<i64> = row.try_get("reserved_by")?;
    let reserved_at: Option<DateTime<Utc>> = row.try_get("reserved_at")?;
    let reservation = match (is_reserved, reserved_by, reserved_at) {
        (true, Some(guest_id), Some(reserved_at)) => Some(GiftReservation {
            guest_id: GuestId(guest_id),
            guest_name: row.try_get("reserved_by_name")?,
            reserved_at,
        }),
        (false, None, None) => None,
        _ => anyhow::bail!(
            "gift {} has inconsistent reservation columns",
            row.try_get::<i64, _>("id")?
        ),
    };

    let category = row
        .try_get::<Option<String>, _>("category")?
        .map(|c| {
            c.parse::<GiftCategory>()
                .with_context(|| format!("corrupt gift category '{c}'"))
        })
        .transpose()?;
    Ok(Gift {
        gift_id: GiftId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price_estimate_cents: row.try_get("price_estimate_cents")?,
        link: row.try_get("link")?,
        image_url: row.try_get("image_url")?,
        category,
        reservation,
    })
}

fn wish_from_row(row: &SqliteRow) -> Result<Wish> {
    Ok(Wish {
        wish_id: WishId(row.try_get("id")?),
        guest_id: GuestId(row.try_get("guest_id")?),
        guest_name: row.try_get("guest_name")?,
        message: row.try_get("message")?,
        created_at: row.try_get("created_at")?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.contains(":memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
