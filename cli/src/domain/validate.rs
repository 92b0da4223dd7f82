//! Validation of the inputs collected by `berth init`.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::ValidationError;

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s'`$\\]+@[^@\s'`$\\]+\.[^@\s'`$\\]+$").expect("valid email regex")
});

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,62}$").expect("valid name regex"));

/// # Errors
///
/// Returns [`ValidationError::InvalidAddress`] unless `address` is a dotted IPv4 address.
pub fn validate_address(address: &str) -> Result<Ipv4Addr, ValidationError> {
    address
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| ValidationError::InvalidAddress(address.to_string()))
}

/// The email ends up inside the reverse proxy's compose file, so shell
/// metacharacters are rejected along with malformed addresses.
///
/// # Errors
///
/// Returns [`ValidationError::MissingEmail`] or [`ValidationError::InvalidEmail`].
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

/// # Errors
///
/// Returns [`ValidationError::InvalidName`] for empty names or names with
/// characters outside `[A-Za-z0-9._-]`.
pub fn validate_server_name(name: &str) -> Result<(), ValidationError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName(name.to_string()))
    }
}

const ADJECTIVES: &[&str] = &[
    "brave", "calm", "eager", "fancy", "gentle", "happy", "jolly", "keen", "lucid", "merry",
    "nimble", "proud", "quiet", "rapid", "sharp", "tidy", "vivid", "witty",
];

const NOUNS: &[&str] = &[
    "anchor", "beacon", "cove", "delta", "ferry", "harbor", "island", "jetty", "keel", "lagoon",
    "marina", "pier", "quay", "reef", "schooner", "tide", "wharf", "yawl",
];

/// A readable `adjective-noun` default for the server name prompt.
#[must_use]
pub fn suggest_name(seed: u64) -> String {
    #[allow(clippy::cast_possible_truncation)]
    let seed = seed as usize;
    let adjective = ADJECTIVES[seed % ADJECTIVES.len()];
    let noun = NOUNS[(seed / ADJECTIVES.len()) % NOUNS.len()];
    format!("{adjective}-{noun}")
}
