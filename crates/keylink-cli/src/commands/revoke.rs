//! Revoke command implementation.

use anyhow::{Context, Result};

use keylink_core::token::Token;

use super::{GlobalArgs, RevokeArgs};

/// Run the revoke command.
pub fn run(global: &GlobalArgs, args: &RevokeArgs) -> Result<()> {
    let token = Token::parse(&args.token)
        .ok()
        .with_context(|| format!("'{}' is not a valid token", args.token))?;

    let config = super::load_config(global)?;
    let db = super::open_database(&config)?;

    if db.links().delete(token.as_str())? {
        tracing::info!(token = token.as_str(), "Revoked link");
        println!("Revoked {token}");
    } else {
        println!("No link with token {token}");
    }

    Ok(())
}
