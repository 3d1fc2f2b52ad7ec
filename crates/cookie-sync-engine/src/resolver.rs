//! Domain credential resolution.
//!
//! Maps a [`CredentialView`] onto the four per-domain bundles the reconciler
//! works through. Pure: missing values are carried forward for the
//! reconciler to judge.

use crate::credentials::{CredentialView, TokenFormat};
use std::fmt;

/// The web surfaces a hybrid session authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainKind {
    Main,
    Lightning,
    Content,
    Visualforce,
}

impl DomainKind {
    pub fn label(&self) -> &'static str {
        match self {
            DomainKind::Main => "main",
            DomainKind::Lightning => "Lightning",
            DomainKind::Content => "Content",
            DomainKind::Visualforce => "Visualforce",
        }
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Cookies one domain needs for an authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct DomainSessionBundle {
    pub kind: DomainKind,
    pub domain: Option<String>,
    pub sid_cookie_name: String,
    pub sid_value: Option<String>,
    pub csrf_token: Option<String>,
    pub client_src: Option<String>,
    pub sid_client: Option<String>,
    pub org_id: Option<String>,
    /// Synthesized cookies match subdomains too (community logins).
    pub share_with_subdomains: bool,
}

impl DomainSessionBundle {
    /// Both a domain and a session identifier are known.
    pub fn is_present(&self) -> bool {
        self.domain.is_some() && self.sid_value.is_some()
    }
}

impl fmt::Debug for DomainSessionBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainSessionBundle")
            .field("kind", &self.kind)
            .field("domain", &self.domain)
            .field("sid_cookie_name", &self.sid_cookie_name)
            .field("has_sid", &self.sid_value.is_some())
            .field("org_id", &self.org_id)
            .field("share_with_subdomains", &self.share_with_subdomains)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainBundles {
    pub main: DomainSessionBundle,
    pub lightning: DomainSessionBundle,
    pub content: DomainSessionBundle,
    pub visualforce: DomainSessionBundle,
}

impl DomainBundles {
    /// Main, Lightning, Content, Visualforce.
    pub fn iter(&self) -> impl Iterator<Item = &DomainSessionBundle> {
        [&self.main, &self.lightning, &self.content, &self.visualforce].into_iter()
    }
}

/// Derive the four bundles from a credential.
///
/// `default_sid_cookie_name` applies when the credential does not name its
/// session cookie.
pub fn resolve_bundles(credential: &CredentialView, default_sid_cookie_name: &str) -> DomainBundles {
    let sid_cookie_name = credential
        .sid_cookie_name
        .clone()
        .unwrap_or_else(|| default_sid_cookie_name.to_string());

    let bundle = |kind: DomainKind, domain: Option<String>, sid_value: Option<String>| {
        DomainSessionBundle {
            kind,
            domain,
            sid_cookie_name: sid_cookie_name.clone(),
            sid_value,
            csrf_token: credential.csrf_token.clone(),
            client_src: credential.client_src.clone(),
            sid_client: credential.sid_client.clone(),
            org_id: credential.org_id.clone(),
            share_with_subdomains: credential.is_community(),
        }
    };

    // A JWT access token is not a browser session id.
    let main_sid = match credential.token_format {
        TokenFormat::Jwt => credential.parent_sid.clone(),
        TokenFormat::AccessToken => credential.access_token.clone(),
    };

    DomainBundles {
        main: bundle(DomainKind::Main, credential.main_domain(), main_sid),
        lightning: bundle(
            DomainKind::Lightning,
            credential.lightning_domain.clone(),
            credential.lightning_sid.clone(),
        ),
        content: bundle(
            DomainKind::Content,
            credential.content_domain.clone(),
            credential.content_sid.clone(),
        ),
        visualforce: bundle(
            DomainKind::Visualforce,
            credential.vf_domain.clone(),
            credential.vf_sid.clone(),
        ),
    }
}
