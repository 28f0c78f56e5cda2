//! List command implementation.

use anyhow::Result;

use keylink_core::store::EntryFilter;

use super::{GlobalArgs, ListArgs, ListTarget};
use crate::ui::{abbreviate, format_remaining};

/// Run the list command.
pub fn run(global: &GlobalArgs, args: &ListArgs) -> Result<()> {
    let config = super::load_config(global)?;
    let db = super::open_database(&config)?;

    match args.what {
        ListTarget::Entries { active, expired } => {
            let filter = match (active, expired) {
                (true, _) => EntryFilter::Active,
                (_, true) => EntryFilter::Expired,
                _ => EntryFilter::All,
            };
            let entries = db.links().enumerate(filter)?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            if entries.is_empty() {
                println!("No links.");
                return Ok(());
            }

            let now = keylink_core::unix_now();
            println!(
                "  {:<16} {:<24} {:<10} PATH",
                "TOKEN", "EXPIRES", "REMAINING"
            );
            for entry in &entries {
                println!(
                    "  {:<16} {:<24} {:<10} {}",
                    abbreviate(&entry.token),
                    entry.formatted_expiration(),
                    format_remaining(entry.expiration - now),
                    entry.path.display()
                );
            }
        }
        ListTarget::Attempts => {
            let records = db.attempts().list()?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            if records.is_empty() {
                println!("No failed attempts recorded.");
                return Ok(());
            }

            let limit = config.security.failed_attempt_limit;
            println!("  {:<40} {:<8} STATUS", "CLIENT", "FAILURES");
            for record in &records {
                let status = if record.failed_count >= limit {
                    "banned"
                } else {
                    ""
                };
                println!(
                    "  {:<40} {:<8} {}",
                    record.client_id, record.failed_count, status
                );
            }
        }
    }

    Ok(())
}
