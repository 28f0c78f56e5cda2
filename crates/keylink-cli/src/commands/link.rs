//! Link command implementation.

use anyhow::{bail, Context, Result};

use keylink_core::config::parse_duration;
use keylink_core::issue::LinkIssuer;

use super::{GlobalArgs, LinkArgs};
use crate::ui::{format_remaining, LinkBox};

/// Run the link command.
pub fn run(global: &GlobalArgs, args: &LinkArgs) -> Result<()> {
    let config = super::load_config(global)?;
    let db = super::open_database(&config)?;

    let mut issuer = LinkIssuer::new(&config, db.links());
    if let Some(expire) = &args.expire {
        let Some(lifetime) = parse_duration(expire).filter(|d| !d.is_zero()) else {
            bail!("Invalid expiration '{expire}' (use e.g. 30m, 24h, 7d)");
        };
        issuer = issuer.with_expiration(lifetime);
    }

    let link = issuer
        .issue(&args.path)
        .with_context(|| format!("Failed to issue link for {}", args.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&link)?);
        return Ok(());
    }

    if link.archived {
        println!();
        println!("  Archived directory to {}", link.path.display());
    }
    println!();
    LinkBox::new(&link.url)
        .with_expire(format_remaining(link.expiration - keylink_core::unix_now()))
        .display();
    println!();

    Ok(())
}
