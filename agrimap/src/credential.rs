//! Bearer credential sources.
//!
//! Credential retrieval is injected rather than read from ambient state, so
//! the KML fetcher and backend clients only ever see a `CredentialSource`.

use std::env;

/// Supplies a bearer token for authenticated requests.
pub trait CredentialSource: Send + Sync {
    /// Current token, or `None` when no credential is available.
    fn bearer_token(&self) -> Option<String>;
}

/// No credentials; every request is anonymous.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialSource for NoCredentials {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// A fixed token, typically obtained at login.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        non_empty(&self.0)
    }
}

/// Reads the token from an environment variable on every request.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

/// Environment variable consulted by [`EnvToken::default`].
pub const DEFAULT_TOKEN_VAR: &str = "AGRIMAP_TOKEN";

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_VAR)
    }
}

impl CredentialSource for EnvToken {
    fn bearer_token(&self) -> Option<String> {
        env::var(&self.var).ok().and_then(|v| non_empty(&v))
    }
}

fn non_empty(token: &str) -> Option<String> {
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}
