// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! GData contacts client validation tool.
//!
//! This is a standalone CLI example for testing the GData source implementation
//! against a real contacts endpoint. It serves as both a validation tool and
//! example code for driving [`GDataClient`] through the `RemoteSource` trait.

use std::error::Error;
use std::io::Write as _;

use absync_atom::{Context, Email, StructuredName};
use absync_core::{
    AbortFlag, ContactRecord, FetchPage, FetchQuery, RemoteSource as _, SourceSession, SyncStatus,
};
use absync_gdata::{GDataClient, GDataConfig};
use clap::{Parser, Subcommand};
use colored::Colorize as _;

/// GData contacts client validation tool.
#[derive(Parser)]
#[command(name = "gdata_cli")]
#[command(about = "GData contacts client validation tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Account whose address book to operate on (user@example.com)
    #[arg(long)]
    account: Option<String>,
    /// OAuth bearer token
    #[arg(long)]
    token: Option<String>,
    /// Contacts feed base URL (defaults to the Google endpoint)
    #[arg(long)]
    server: Option<String>,
    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,
    /// Download contact photos into the avatar cache
    #[arg(long)]
    avatars: bool,
    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// List contacts in the address book
    List {
        /// Only contacts changed since this date (e.g., "2025-01-01" or "today")
        #[arg(long)]
        since: Option<String>,
        /// Include deletion tombstones
        #[arg(long)]
        deleted: bool,
    },
    /// Show a single contact in full
    Show {
        /// Remote contact id (as printed by `list`)
        id: String,
    },
    /// Create a contact
    Add {
        /// Given name
        name: String,
        /// Family name
        #[arg(long)]
        family: Option<String>,
        /// Email address
        #[arg(long)]
        email: Option<String>,
    },
    /// Delete a contact
    Delete {
        /// Remote contact id (as printed by `list`)
        id: String,
    },
}

impl Cli {
    fn build_config(&self) -> Result<(GDataConfig, SourceSession), Box<dyn std::error::Error>> {
        // Read from environment variables first
        let account = self
            .account
            .clone()
            .or_else(|| std::env::var("ABSYNC_GDATA_ACCOUNT").ok())
            .ok_or_else(|| {
                "account must be provided via --account or ABSYNC_GDATA_ACCOUNT env var".to_string()
            })?;

        let token = self
            .token
            .clone()
            .or_else(|| std::env::var("ABSYNC_GDATA_TOKEN").ok())
            .ok_or_else(|| {
                "bearer token must be provided via --token or ABSYNC_GDATA_TOKEN env var"
                    .to_string()
            })?;

        let server = self
            .server
            .clone()
            .or_else(|| std::env::var("ABSYNC_GDATA_SERVER").ok());

        let mut config = GDataConfig {
            timeout_secs: self.timeout,
            fetch_avatars: self.avatars,
            ..GDataConfig::default()
        };
        if let Some(server) = server {
            config.base_url = server;
        }

        let session = SourceSession {
            account,
            token,
            target: "google".to_string(),
            abort: AbortFlag::new(),
        };

        Ok((config, session))
    }
}

/// Drains a full fetch into memory, failing on any non-success status.
async fn fetch_all(
    client: &mut GDataClient,
    query: FetchQuery,
) -> Result<Vec<ContactRecord>, Box<dyn std::error::Error>> {
    let (pages, mut rx) = tokio::sync::mpsc::channel::<FetchPage>(8);
    let collect = async {
        let mut records = Vec::new();
        while let Some(page) = rx.recv().await {
            records.extend(page.records);
        }
        records
    };
    let (status, records) = tokio::join!(client.fetch_contacts(query, pages), collect);
    if status != SyncStatus::Done {
        return Err(format!("fetch ended with status: {status}").into());
    }
    Ok(records)
}

async fn find_contact(
    client: &mut GDataClient,
    id: &str,
) -> Result<ContactRecord, Box<dyn std::error::Error>> {
    let records = fetch_all(client, FetchQuery::default()).await?;
    records
        .into_iter()
        .find(|record| record.remote_id.as_deref() == Some(id))
        .ok_or_else(|| format!("Contact not found: {id}").into())
}

async fn cmd_list(
    client: &mut GDataClient,
    since: Option<&str>,
    deleted: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let updated_since = match since {
        Some(date) => Some(parse_since(date)?),
        None => None,
    };
    let query = FetchQuery {
        updated_since,
        include_deleted: deleted,
    };

    let records = fetch_all(client, query).await?;

    if records.is_empty() {
        println!("No contacts found");
        return Ok(());
    }

    println!("{:-<100}", "");
    println!(
        "{:<28} {:<32} {:<24} {:<12}",
        "Name", "Email", "Id", "Updated"
    );
    println!("{:-<100}", "");

    for record in &records {
        let id = record.remote_id.as_deref().unwrap_or("-");
        if record.is_tombstone() {
            let deleted_at = record
                .deleted_at
                .map(|ts| ts.strftime("%Y-%m-%d").to_string())
                .unwrap_or_default();
            println!("{:<28} {:<32} {:<24} {:<12}", "(deleted)", "-", id, deleted_at);
            continue;
        }

        let mut name = record.display_name();
        if name.is_empty() {
            name = "-".to_string();
        }
        let email = record
            .emails
            .first()
            .map_or("-", |email| email.address.as_str());
        let updated = record
            .updated
            .map(|ts| ts.strftime("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!("{name:<28} {email:<32} {id:<24} {updated:<12}");
    }
    println!("{} contact(s)", records.len());

    Ok(())
}

async fn cmd_show(
    client: &mut GDataClient,
    id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let record = find_contact(client, id).await?;

    println!("Id: {id}");
    if let Some(etag) = &record.etag {
        println!("ETag: {}", etag.as_str());
    }
    if let Some(updated) = record.updated {
        println!("Updated: {updated}");
    }
    println!("Name: {}", record.display_name());
    if let Some(nickname) = &record.nickname {
        println!("Nickname: {nickname}");
    }
    if let Some(birthday) = record.birthday {
        println!("Birthday: {birthday}");
    }
    for email in &record.emails {
        println!("Email ({}): {}", email.context.as_str(), email.address);
    }
    for phone in &record.phones {
        println!("Phone ({}): {}", phone.kind.as_str(), phone.number);
    }
    for org in &record.organizations {
        let name = org.name.as_deref().unwrap_or("-");
        let title = org.title.as_deref().unwrap_or("-");
        println!("Organization: {name} ({title})");
    }
    for note in &record.notes {
        println!("Note: {}", note.text);
    }
    if !record.groups.is_empty() {
        println!("Groups: {}", record.groups.join(", "));
    }
    if let Some(avatar) = &record.avatar {
        println!("Avatar: {}", avatar.url);
    }

    Ok(())
}

async fn cmd_add(
    client: &mut GDataClient,
    name: &str,
    family: Option<&str>,
    email: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let record = ContactRecord {
        // Batch replies are correlated by local id
        local_id: Some("gdata-cli-add".into()),
        name: Some(StructuredName {
            given: Some(name.to_string()),
            family: family.map(str::to_string),
            ..StructuredName::default()
        }),
        emails: email
            .map(|address| {
                vec![Email {
                    address: address.to_string(),
                    context: Context::Home,
                }]
            })
            .unwrap_or_default(),
        ..ContactRecord::default()
    };

    client.begin_transaction();
    client.save_contacts(vec![record]);
    let outcome = client.commit().await;
    if outcome.status != SyncStatus::Done {
        return Err(format!("commit ended with status: {}", outcome.status).into());
    }

    let created = outcome
        .created
        .first()
        .ok_or_else(|| "Server acknowledged the batch but returned no contact".to_string())?;

    println!("{}", "✓ Contact created successfully".green());
    if let Some(id) = &created.remote_id {
        println!("Id: {}", id.as_str());
    }
    if let Some(etag) = &created.etag {
        println!("ETag: {}", etag.as_str());
    }

    Ok(())
}

async fn cmd_delete(
    client: &mut GDataClient,
    id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    // Fetch first to pick up the current version tag
    let mut record = find_contact(client, id).await?;
    // Batch replies are correlated by local id
    record.local_id = Some("gdata-cli-delete".into());

    client.begin_transaction();
    client.remove_contacts(vec![record]);
    let outcome = client.commit().await;
    if outcome.status != SyncStatus::Done {
        return Err(format!("commit ended with status: {}", outcome.status).into());
    }

    println!("{}", "✓ Contact deleted successfully".green());
    println!("Id: {id}");

    Ok(())
}

/// Parse a date string to a UTC timestamp for delta queries.
///
/// Accepts formats like:
/// - "today" → today at 00:00:00 UTC
/// - "2025-01-01" → 2025-01-01T00:00:00Z
/// - "2025-01-01T12:00:00Z" → parsed as given
fn parse_since(date: &str) -> Result<jiff::Timestamp, String> {
    let now = jiff::Zoned::now();

    if date.eq_ignore_ascii_case("today") {
        let start_of_day = jiff::civil::Date::from(now)
            .to_zoned(jiff::tz::TimeZone::UTC)
            .map_err(|e| format!("Failed to convert to UTC: {e}"))?;
        return Ok(start_of_day.timestamp());
    }

    // Try YYYY-MM-DD format
    if let Ok(dt) = jiff::civil::DateTime::strptime(date, "%Y-%m-%d") {
        let zoned = dt
            .to_zoned(jiff::tz::TimeZone::UTC)
            .map_err(|e| format!("Failed to convert to UTC: {e}"))?;
        return Ok(zoned.timestamp());
    }

    // Try a full RFC 3339 timestamp
    if let Ok(ts) = date.parse::<jiff::Timestamp>() {
        return Ok(ts);
    }

    Err(format!(
        "Invalid date format: '{date}'. Use YYYY-MM-DD, today, or a full datetime"
    ))
}

/// Format error for user-friendly display.
fn format_error(err: Box<dyn Error>) -> String {
    let err_str = err.to_string();
    if err_str.contains("authentication") || err_str.contains("401") || err_str.contains("403") {
        format!(
            "{} Authentication failed - check the bearer token",
            "Error:".red().bold()
        )
    } else if err_str.contains("404") || err_str.contains("not found") {
        format!("{} Contact not found", "Error:".red().bold())
    } else if err_str.contains("connection") || err_str.contains("network") {
        format!(
            "{} Network error - check the feed URL and connection",
            "Error:".red().bold()
        )
    } else {
        format!("{} {}", "Error:".red().bold(), err_str)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env files (if they exist)
    // Priority: .env.local (highest) -> .env -> existing environment variables (lowest)
    dotenvy::dotenv().ok(); // Load .env
    dotenvy::from_filename(".env.local").ok(); // Load .env.local (overrides .env)

    let cli = Cli::parse();
    let (config, session) = cli.build_config()?;
    let mut client = GDataClient::new(config);
    client
        .init(session)
        .map_err(|status| format!("source initialization failed: {status}"))?;

    // Create a new runtime for the async operations
    let runtime = tokio::runtime::Runtime::new()?;

    let result = runtime.block_on(async {
        match cli.command {
            Commands::List { since, deleted } => {
                cmd_list(&mut client, since.as_deref(), deleted).await
            }
            Commands::Show { id } => cmd_show(&mut client, &id).await,
            Commands::Add {
                name,
                family,
                email,
            } => cmd_add(&mut client, &name, family.as_deref(), email.as_deref()).await,
            Commands::Delete { id } => cmd_delete(&mut client, &id).await,
        }
    });

    if let Err(e) = result {
        // Flush stdout before printing error
        std::io::stdout().flush().ok();
        eprintln!("{}", format_error(e));
        std::process::exit(1);
    }

    Ok(())
}
