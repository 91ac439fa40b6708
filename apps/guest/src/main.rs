use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    workflow_status, ClientError, FileSessionStore, InviteClient, Route, SessionStore, StepStatus,
    Wizard,
};
use shared::{
    categories::effective_category,
    domain::{format_price, GiftCategory, GiftId, RsvpStatus},
    protocol::{ExportKind, RsvpRequest},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Guest and host command line for the invitation site")]
struct Args {
    #[arg(long, env = "INVITE_SERVER_URL", default_value = "http://127.0.0.1:8443")]
    server_url: String,
    /// Where the guest session is remembered between runs.
    #[arg(long, default_value = ".invite-session.json")]
    session_file: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the event, schedule and venue.
    Event,
    Rsvp {
        #[arg(long)]
        name: String,
        #[arg(long)]
        contact: String,
        #[arg(long, default_value = "attending")]
        status: RsvpStatus,
        #[arg(long, default_value_t = 1)]
        adults: u32,
        #[arg(long, default_value_t = 0)]
        children: u32,
    },
    /// List the gift registry, optionally one category tab.
    Gifts {
        #[arg(long)]
        category: Option<GiftCategory>,
    },
    Reserve {
        gift_id: i64,
    },
    /// Sign the guestbook.
    Wish {
        message: String,
    },
    /// Show which page a location opens and the wizard progress on it.
    Open {
        location: String,
    },
    /// Drop the remembered guest session.
    Forget,
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "INVITE_ADMIN_PASSWORD")]
        password: String,
    },
    Logout {
        #[arg(long, env = "INVITE_ADMIN_TOKEN")]
        token: String,
    },
    Dashboard {
        #[arg(long, env = "INVITE_ADMIN_TOKEN")]
        token: String,
    },
    Export {
        kind: ExportArg,
        #[arg(long, env = "INVITE_ADMIN_TOKEN")]
        token: String,
        /// Defaults to the export's own file name.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExportArg {
    Guests,
    Gifts,
    Wishes,
}

impl From<ExportArg> for ExportKind {
    fn from(value: ExportArg) -> Self {
        match value {
            ExportArg::Guests => ExportKind::Guests,
            ExportArg::Gifts => ExportKind::Gifts,
            ExportArg::Wishes => ExportKind::Wishes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let args = Args::parse();
    let client = InviteClient::new(&args.server_url)?;
    let store = FileSessionStore::new(&args.session_file);

    match args.command {
        Command::Event => {
            let event = client.event().await?;
            println!("{}", event.title);
            println!("{}", event.headline);
            for entry in &event.schedule {
                match &entry.time {
                    Some(time) => println!("  {}: {} ({time})", entry.label, entry.date),
                    None => println!("  {}: {}", entry.label, entry.date),
                }
            }
            println!("Venue: {}", event.venue.name);
            if let Some(map) = &event.venue.map_url {
                println!("Map: {map}");
            }
            for image in &event.gallery {
                println!("  [{}] {}", image.alt, image.src);
            }
        }
        Command::Rsvp {
            name,
            contact,
            status,
            adults,
            children,
        } => {
            let mut wizard = Wizard::resume(client, store).await?;
            let req = RsvpRequest {
                name,
                contact,
                rsvp_status: status,
                adults_count: adults,
                children_count: children,
            };
            match wizard.submit_rsvp(&req).await {
                Ok(resp) => {
                    println!("Thank you! RSVP recorded as guest #{}", resp.guest_id);
                    if let Some(next) = wizard.next_navigation() {
                        println!("Next: {}", next.to);
                    }
                }
                Err(e) => return report(e).await,
            }
        }
        Command::Gifts { category } => {
            let listing = client.list_gifts().await?;
            for tab in &listing.categories {
                println!("{} ({} available)", tab.label, tab.available_count);
            }
            println!();
            let wanted = category.unwrap_or(GiftCategory::All);
            for gift in listing
                .gifts
                .iter()
                .filter(|g| wanted == GiftCategory::All || effective_category(g) == wanted)
            {
                let price = gift
                    .price_estimate_cents
                    .map(format_price)
                    .unwrap_or_else(|| "-".into());
                let status = match &gift.reservation {
                    Some(r) => format!(
                        "reserved by {}",
                        r.guest_name.as_deref().unwrap_or("a guest")
                    ),
                    None => "available".into(),
                };
                println!("#{:<4} {:<32} {:>10}  {status}", gift.gift_id.0, gift.name, price);
            }
        }
        Command::Reserve { gift_id } => {
            let mut wizard = Wizard::resume(client, store).await?;
            match wizard.reserve_gift(GiftId(gift_id)).await {
                Ok(gift) => {
                    println!("Gift reserved: {}. Thank you!", gift.name);
                    if let Some(next) = wizard.next_navigation() {
                        tokio::time::sleep(next.after).await;
                        println!("Next: {}", next.to);
                    }
                }
                Err(e) => return report(e).await,
            }
        }
        Command::Wish { message } => {
            let mut wizard = Wizard::resume(client, store).await?;
            wizard.set_draft_message(message);
            match wizard.post_wish().await {
                Ok(_) => println!("Message posted. Thank you for your wishes!"),
                Err(e) => return report(e).await,
            }
        }
        Command::Open { location } => {
            let route = Route::parse(&location);
            match &route {
                Route::NotFound(path) => println!("404: no page at {path}"),
                _ => println!("page {route}"),
            }
            if let Some(current) = route.workflow_step() {
                for (index, (step, status)) in workflow_status(current).iter().enumerate() {
                    let marker = match status {
                        StepStatus::Completed => "x",
                        StepStatus::Current => ">",
                        StepStatus::Upcoming => " ",
                    };
                    println!(
                        "  [{marker}] {}. {} - {}",
                        index + 1,
                        step.label(),
                        step.description()
                    );
                }
            }
        }
        Command::Forget => {
            store.clear().await?;
            println!("Guest session forgotten.");
        }
        Command::Admin(cmd) => admin(&client, cmd).await?,
    }

    Ok(())
}

async fn admin(client: &InviteClient, cmd: AdminCommand) -> Result<()> {
    let result = match cmd {
        AdminCommand::Login { email, password } => {
            client.admin_login(&email, &password).await.map(|login| {
                println!("{}", login.token);
                eprintln!("signed in until {}", login.expires_at);
            })
        }
        AdminCommand::Logout { token } => client
            .admin_logout(&token)
            .await
            .map(|()| println!("Signed out.")),
        AdminCommand::Dashboard { token } => client.dashboard(&token).await.map(|dash| {
            let s = dash.stats;
            println!(
                "Guests:    {} ({} attending, {} not attending, {} maybe)",
                s.total_guests, s.attending, s.not_attending, s.maybe
            );
            println!("Headcount: {} adults, {} children", s.total_adults, s.total_children);
            println!(
                "Gifts:     {}/{} reserved ({:.0}%)",
                s.reserved_gifts,
                s.total_gifts,
                dash.reservation_ratio * 100.0
            );
            println!("Messages:  {}", s.total_wishes);
        }),
        AdminCommand::Export { kind, token, out } => {
            let kind = ExportKind::from(kind);
            match client.export(&token, kind).await {
                Ok(csv) => {
                    let path = out.unwrap_or_else(|| PathBuf::from(kind.filename()));
                    tokio::fs::write(&path, csv).await?;
                    info!(file = %path.display(), "export written");
                    println!("wrote {}", path.display());
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
    };

    match result {
        Err(e) if e.requires_admin_login() => {
            warn!(code = ?e.code(), "admin session rejected");
            eprintln!("{e}");
            eprintln!("Redirecting to {}", Route::Login);
            std::process::exit(2);
        }
        other => Ok(other?),
    }
}

/// Prints a failed wizard action the way the site would present it.
async fn report(err: ClientError) -> Result<()> {
    if let ClientError::RsvpRequired {
        message,
        redirect_to,
        after,
    } = &err
    {
        warn!(%redirect_to, "action needs an RSVP first");
        eprintln!("RSVP required: {message}");
        tokio::time::sleep(*after).await;
        eprintln!("Redirecting to {redirect_to}");
        std::process::exit(2);
    }
    Err(err.into())
}
