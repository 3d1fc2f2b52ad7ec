//! The canonical in-memory cookie representation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Path every synthesized session cookie is scoped to.
pub const ROOT_PATH: &str = "/";

/// Why a cookie could not be synthesized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CookieError {
    #[error("cookie name is empty")]
    EmptyName,

    #[error("cookie name contains an invalid character: {0:?}")]
    InvalidName(char),

    #[error("cookie value is empty")]
    EmptyValue,

    #[error("cookie value contains an invalid character")]
    InvalidValue,

    #[error("cookie domain is empty")]
    EmptyDomain,

    #[error("cookie domain contains an invalid character: {0:?}")]
    InvalidDomain(char),
}

/// Identity of a cookie within one set: name plus normalized domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CookieKey {
    pub name: String,
    pub domain: String,
}

impl CookieKey {
    pub fn new(name: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            domain: normalize_domain(domain),
        }
    }
}

/// One browser cookie.
///
/// Records are replaced rather than mutated once handed to a store;
/// [`CookieRecord::with_value`] produces the replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    /// No persisted expiry; the cookie lives as long as the browsing session.
    pub session_only: bool,
    /// Domain attribute is sent so the cookie also matches subdomains
    /// (community sites).
    #[serde(default)]
    pub share_with_subdomains: bool,
}

impl CookieRecord {
    /// Build a secure, session-only cookie scoped to `/` on `domain`.
    pub fn session_cookie(name: &str, value: &str, domain: &str) -> Result<Self, CookieError> {
        validate_name(name)?;
        validate_value(value)?;
        validate_domain(domain)?;

        Ok(Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
            path: ROOT_PATH.to_string(),
            secure: true,
            session_only: true,
            share_with_subdomains: false,
        })
    }

    /// Replacement record carrying `value`, every other attribute kept.
    pub fn with_value(&self, value: &str) -> Result<Self, CookieError> {
        validate_value(value)?;
        Ok(Self {
            value: value.to_string(),
            ..self.clone()
        })
    }

    pub fn shared_with_subdomains(mut self, share: bool) -> Self {
        self.share_with_subdomains = share;
        self
    }

    pub fn key(&self) -> CookieKey {
        CookieKey::new(&self.name, &self.domain)
    }

    pub fn is_for(&self, name: &str, domain: &str) -> bool {
        self.name == name && normalize_domain(&self.domain) == normalize_domain(domain)
    }
}

/// Lowercase and drop a leading dot so `.Example.com` and `example.com` match.
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_start_matches('.').to_ascii_lowercase()
}

// RFC 6265 token: visible ASCII minus separators.
fn validate_name(name: &str) -> Result<(), CookieError> {
    if name.is_empty() {
        return Err(CookieError::EmptyName);
    }
    match name
        .chars()
        .find(|c| !c.is_ascii_graphic() || "()<>@,;:\\\"/[]?={}".contains(*c))
    {
        Some(c) => Err(CookieError::InvalidName(c)),
        None => Ok(()),
    }
}

// RFC 6265 cookie-octet.
fn validate_value(value: &str) -> Result<(), CookieError> {
    if value.is_empty() {
        return Err(CookieError::EmptyValue);
    }
    let valid = value
        .bytes()
        .all(|b| matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E));
    if valid {
        Ok(())
    } else {
        Err(CookieError::InvalidValue)
    }
}

fn validate_domain(domain: &str) -> Result<(), CookieError> {
    let trimmed = domain.trim_start_matches('.');
    if trimmed.is_empty() {
        return Err(CookieError::EmptyDomain);
    }
    match trimmed
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '.'))
    {
        Some(c) => Err(CookieError::InvalidDomain(c)),
        None => Ok(()),
    }
}
