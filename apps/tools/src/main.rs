use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use shared::{domain::GiftCategory, protocol::ExportKind};
use storage::{NewGift, Storage};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Operator tasks run directly against the invitation database")]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/invite.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add one gift to the registry.
    SeedGift {
        name: String,
        /// Estimate such as `250` or `19.99`.
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        category: Option<GiftCategory>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        link: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Add every `[[gift]]` entry of a TOML file.
    ImportGifts { file: PathBuf },
    /// Store or replace the password for the admin identity.
    SetAdmin {
        #[arg(long)]
        email: String,
        #[arg(long, env = "APP__ADMIN_PASSWORD")]
        password: String,
    },
    Stats,
    Export {
        #[arg(value_parser = parse_export_kind)]
        kind: ExportKind,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete admin sessions that have expired.
    PurgeSessions,
}

#[derive(Debug, Deserialize)]
struct GiftFile {
    #[serde(default, rename = "gift")]
    gifts: Vec<GiftEntry>,
}

#[derive(Debug, Deserialize)]
struct GiftEntry {
    name: String,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

impl GiftEntry {
    fn into_new_gift(self) -> Result<NewGift> {
        let category = self
            .category
            .as_deref()
            .map(str::parse::<GiftCategory>)
            .transpose()
            .with_context(|| format!("gift '{}' has an unknown category", self.name))?;
        Ok(NewGift {
            price_estimate_cents: self.price.as_deref().map(parse_price_cents).transpose()?,
            name: self.name,
            description: self.description,
            link: self.link,
            image_url: self.image_url,
            category,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::SeedGift {
            name,
            price,
            category,
            description,
            link,
            image_url,
        } => {
            let gift = NewGift {
                name,
                price_estimate_cents: price.as_deref().map(parse_price_cents).transpose()?,
                category,
                description,
                link,
                image_url,
            };
            let gift_id = storage.insert_gift(&gift).await?;
            println!("created gift_id={gift_id}");
        }
        Command::ImportGifts { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let parsed: GiftFile = toml::from_str(&raw)
                .with_context(|| format!("failed to parse {}", file.display()))?;
            let gifts = parsed
                .gifts
                .into_iter()
                .map(GiftEntry::into_new_gift)
                .collect::<Result<Vec<_>>>()?;
            for gift in &gifts {
                storage.insert_gift(gift).await?;
            }
            info!(count = gifts.len(), file = %file.display(), "gifts imported");
            println!("imported {} gifts", gifts.len());
        }
        Command::SetAdmin { email, password } => {
            if password.trim().is_empty() {
                bail!("password cannot be empty");
            }
            let hash = auth::hash_password(&password)?;
            storage.upsert_admin_credential(&email, &hash).await?;
            println!("admin credential stored for {}", storage::normalize_email(&email));
        }
        Command::Stats => {
            let s = storage.dashboard_stats().await?;
            println!(
                "guests={} attending={} not_attending={} maybe={}",
                s.total_guests, s.attending, s.not_attending, s.maybe
            );
            println!("adults={} children={}", s.total_adults, s.total_children);
            println!(
                "gifts={} reserved={} ratio={:.2}",
                s.total_gifts,
                s.reserved_gifts,
                s.reservation_ratio()
            );
            println!("wishes={}", s.total_wishes);
        }
        Command::Export { kind, out } => {
            let csv = match kind {
                ExportKind::Guests => server_api::export::guests_csv(&storage.list_guests().await?),
                ExportKind::Gifts => server_api::export::gifts_csv(&storage.list_gifts().await?),
                ExportKind::Wishes => server_api::export::wishes_csv(&storage.list_wishes().await?),
            };
            let path = out.unwrap_or_else(|| PathBuf::from(kind.filename()));
            std::fs::write(&path, csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        Command::PurgeSessions => {
            let removed = storage.purge_expired_admin_sessions(Utc::now()).await?;
            println!("removed {removed} expired admin sessions");
        }
    }

    Ok(())
}

fn parse_export_kind(raw: &str) -> Result<ExportKind, String> {
    let segment = if raw.ends_with(".csv") {
        raw.to_string()
    } else {
        format!("{raw}.csv")
    };
    ExportKind::from_route_segment(&segment)
        .ok_or_else(|| format!("unknown export '{raw}', expected guests, gifts or wishes"))
}

/// Parses a decimal amount into whole cents.
fn parse_price_cents(raw: &str) -> Result<i64> {
    let raw = raw.trim().trim_start_matches('$');
    let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
    // Digits only, so signs such as "-0.5" never reach the integer parser.
    let digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if whole.is_empty() || frac.len() > 2 || !digits(whole) || !digits(frac) {
        bail!("invalid price '{raw}'");
    }
    let whole: i64 = whole
        .parse()
        .with_context(|| format!("price '{raw}' is too large"))?;
    let frac_cents = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>()? * 10,
        _ => frac.parse::<i64>()?,
    };
    whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(frac_cents))
        .with_context(|| format!("price '{raw}' is too large"))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
