//! Login and logout.

use secrecy::SecretString;

use super::{CommandContext, CommandError};

/// Persist a bearer token for later commands.
///
/// # Errors
///
/// Returns an error if the session file cannot be written.
pub fn login(ctx: &CommandContext, token: String) -> Result<(), CommandError> {
    ctx.store.set_bearer_token(&SecretString::from(token))?;
    tracing::info!("Logged in");
    Ok(())
}

/// Forget the persisted bearer token. The guest token, if any, is kept.
///
/// # Errors
///
/// Returns an error if the session file cannot be written.
pub fn logout(ctx: &CommandContext) -> Result<(), CommandError> {
    ctx.store.clear_bearer_token()?;
    tracing::info!("Logged out");
    Ok(())
}
