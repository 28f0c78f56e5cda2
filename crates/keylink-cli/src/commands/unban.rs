//! Unban command implementation.

use anyhow::Result;

use super::{GlobalArgs, UnbanArgs};

/// Run the unban command.
pub fn run(global: &GlobalArgs, args: &UnbanArgs) -> Result<()> {
    let config = super::load_config(global)?;
    let db = super::open_database(&config)?;

    if db.attempts().reset(&args.client)? {
        tracing::info!(client = %args.client, "Cleared failed attempts");
        println!("Cleared failed attempts for {}", args.client);
    } else {
        println!("No failed attempts recorded for {}", args.client);
    }

    Ok(())
}
