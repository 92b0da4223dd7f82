//! Server registry: known hosts, named contexts and the current-context pointer.
//!
//! Pure data and lookups only; loading and saving live in
//! `crate::infra::registry_store`.

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

/// Schema version written by this release.
pub const REGISTRY_VERSION: &str = "1";

/// Name given to the server and context synthesized from a legacy document.
pub const DEFAULT_NAME: &str = "default";

// ── Schema ───────────────────────────────────────────────────────────────────

/// A provisioned host and the age keypair used to encrypt its secrets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Server {
    pub name: String,
    pub address: String,
    pub cert_email: String,
    pub distro: String,
    pub platform_id: String,
    pub public_key: String,
    pub secret_key: String,
}

impl Server {
    /// A fresh server entry with no detected facts and no keypair.
    #[must_use]
    pub fn new(name: &str, address: &str, cert_email: &str) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
            cert_email: cert_email.to_string(),
            ..Self::default()
        }
    }

    /// Both halves of the keypair are present.
    #[must_use]
    pub fn has_keypair(&self) -> bool {
        !self.public_key.is_empty() && !self.secret_key.is_empty()
    }
}

/// A named alias for one server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    pub name: String,
    pub server: String,
}

impl Context {
    #[must_use]
    pub fn new(name: &str, server: &str) -> Self {
        Self {
            name: name.to_string(),
            server: server.to_string(),
        }
    }
}

/// Root of the berth config file.
///
/// Fields default individually so a document without `version` (the legacy
/// single-server layout) reads back with an empty version and is rejected as
/// outdated instead of silently accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub current_context: String,
    #[serde(default)]
    pub contexts: Vec<Context>,
    #[serde(default)]
    pub servers: Vec<Server>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            version: REGISTRY_VERSION.to_string(),
            current_context: String::new(),
            contexts: Vec::new(),
            servers: Vec::new(),
        }
    }
}

// ── Lookups and upserts ──────────────────────────────────────────────────────

trait Named {
    fn name(&self) -> &str;
}

impl Named for Server {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Context {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Replace the entry with the same name in place, or append.
fn upsert<T: Named>(items: &mut Vec<T>, item: T) {
    match items.iter().position(|e| e.name() == item.name()) {
        Some(idx) => items[idx] = item,
        None => items.push(item),
    }
}

impl Registry {
    /// `true` when the document was written by this schema version.
    #[must_use]
    pub fn is_current_version(&self) -> bool {
        self.version == REGISTRY_VERSION
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::ServerNotFound`] if no server has this name.
    pub fn find_server(&self, name: &str) -> Result<&Server, ConfigError> {
        self.servers
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ConfigError::ServerNotFound(name.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::ContextNotFound`] if no context has this name.
    pub fn find_context(&self, name: &str) -> Result<&Context, ConfigError> {
        self.contexts
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ConfigError::ContextNotFound(name.to_string()))
    }

    /// Resolve a context name to the server it points at.
    ///
    /// # Errors
    ///
    /// Returns an error if the context, or the server it references, is missing.
    pub fn find_server_by_context(&self, context: &str) -> Result<&Server, ConfigError> {
        let ctx = self.find_context(context)?;
        self.find_server(&ctx.server)
    }

    pub fn add_or_replace_server(&mut self, server: Server) {
        upsert(&mut self.servers, server);
    }

    pub fn add_or_replace_context(&mut self, context: Context) {
        upsert(&mut self.contexts, context);
    }

    /// Point the current context at an existing context.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ContextNotFound`] if `name` is not a known context.
    pub fn use_context(&mut self, name: &str) -> Result<(), ConfigError> {
        self.find_context(name)?;
        self.current_context = name.to_string();
        Ok(())
    }

    /// Record a provisioned server, give it a same-named context and make
    /// that context current.
    pub fn register_provisioned(&mut self, server: Server) {
        let context = Context::new(&server.name, &server.name);
        self.add_or_replace_server(server);
        self.current_context.clone_from(&context.name);
        self.add_or_replace_context(context);
    }
}

/// Convert a pre-versioning single-server document into a registry.
#[must_use]
pub fn migrate_legacy(mut server: Server) -> Registry {
    server.name = DEFAULT_NAME.to_string();
    Registry {
        version: REGISTRY_VERSION.to_string(),
        current_context: DEFAULT_NAME.to_string(),
        contexts: vec![Context::new(DEFAULT_NAME, DEFAULT_NAME)],
        servers: vec![server],
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
