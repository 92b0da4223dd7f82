//! Application service: establish a session, falling back through identities.

use crate::application::ports::SessionOpener;
use crate::domain::{ConnectionError, Identity};

/// Try each identity in order and return the first session that authenticates.
///
/// A rejected identity is not fatal; only running out of identities is.
///
/// # Errors
///
/// Returns [`ConnectionError`] listing every attempt when none succeeded.
pub async fn login<O: SessionOpener>(
    opener: &O,
    host: &str,
    identities: &[Identity],
) -> Result<(O::Session, Identity), ConnectionError> {
    let mut attempts = Vec::with_capacity(identities.len());
    for &identity in identities {
        match opener.open(host, identity).await {
            Ok(session) => {
                tracing::info!(host, user = identity.user(), "logged in");
                return Ok((session, identity));
            }
            Err(e) => {
                tracing::debug!(host, user = identity.user(), error = %format!("{e:#}"), "login rejected");
                attempts.push(format!("{}: {e:#}", identity.user()));
            }
        }
    }
    Err(ConnectionError {
        host: host.to_string(),
        attempts,
    })
}
