//! Read-only projection of the OAuth credential consumed by the engine.

use crate::scopes::ScopeSet;
use std::collections::HashMap;
use tracing::warn;
use url::Url;

/// How the main access token was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenFormat {
    #[default]
    AccessToken,
    /// JWT-based access token; not usable as a browser session id.
    Jwt,
}

impl TokenFormat {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("jwt") {
            TokenFormat::Jwt
        } else {
            TokenFormat::AccessToken
        }
    }
}

/// Everything the engine reads from an authenticated user's credential.
///
/// Supplied by the authentication subsystem and immutable for one
/// authentication event.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialView {
    pub user_id: String,
    pub instance_url: Option<Url>,
    /// Set for community (Experience Cloud) logins.
    pub community_url: Option<Url>,
    pub access_token: Option<String>,
    pub parent_sid: Option<String>,
    pub token_format: TokenFormat,
    pub lightning_domain: Option<String>,
    pub lightning_sid: Option<String>,
    pub content_domain: Option<String>,
    pub content_sid: Option<String>,
    pub vf_domain: Option<String>,
    pub vf_sid: Option<String>,
    pub client_src: Option<String>,
    pub sid_client: Option<String>,
    pub sid_cookie_name: Option<String>,
    pub csrf_token: Option<String>,
    pub org_id: Option<String>,
    pub scopes: ScopeSet,
}

impl CredentialView {
    /// Build a view from the parameter map of an OAuth token response.
    ///
    /// Empty values count as absent. When `org_id` / `user_id` are not given
    /// they are taken from the identity URL (`.../id/<org id>/<user id>`).
    pub fn from_oauth_params(params: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            params
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let url = |key: &str| {
            get(key).and_then(|raw| match Url::parse(&raw) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(param = key, error = %e, "Ignoring unparseable URL in OAuth response");
                    None
                }
            })
        };

        let (identity_org, identity_user) = get("id")
            .map(|raw| parse_identity_url(&raw))
            .unwrap_or((None, None));

        Self {
            user_id: get("user_id").or(identity_user).unwrap_or_default(),
            instance_url: url("instance_url"),
            community_url: url("sfdc_community_url"),
            access_token: get("access_token"),
            parent_sid: get("parent_sid"),
            token_format: get("token_format")
                .map(|raw| TokenFormat::parse(&raw))
                .unwrap_or_default(),
            lightning_domain: get("lightning_domain"),
            lightning_sid: get("lightning_sid"),
            content_domain: get("content_domain"),
            content_sid: get("content_sid"),
            vf_domain: get("visualforce_domain"),
            vf_sid: get("visualforce_sid"),
            client_src: get("cookie-clientSrc"),
            sid_client: get("cookie-sid_Client"),
            sid_cookie_name: get("sidCookieName"),
            csrf_token: get("csrf_token"),
            org_id: get("org_id").or(identity_org),
            scopes: get("scope").map(|raw| ScopeSet::parse(&raw)).unwrap_or_default(),
        }
    }

    /// Host of the instance URL, the main API domain.
    pub fn main_domain(&self) -> Option<String> {
        self.instance_url
            .as_ref()
            .and_then(|url| url.host_str())
            .filter(|host| !host.is_empty())
            .map(str::to_string)
    }

    pub fn is_community(&self) -> bool {
        self.community_url.is_some()
    }
}

// Session ids and tokens stay out of logs and panic messages.
impl std::fmt::Debug for CredentialView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialView")
            .field("user_id", &self.user_id)
            .field("instance_url", &self.instance_url.as_ref().map(Url::as_str))
            .field("community_url", &self.community_url.as_ref().map(Url::as_str))
            .field("token_format", &self.token_format)
            .field("lightning_domain", &self.lightning_domain)
            .field("content_domain", &self.content_domain)
            .field("vf_domain", &self.vf_domain)
            .field("org_id", &self.org_id)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

/// `https://host/id/<org id>/<user id>` -> (org id, user id)
fn parse_identity_url(raw: &str) -> (Option<String>, Option<String>) {
    let Ok(url) = Url::parse(raw) else {
        return (None, None);
    };
    let Some(segments) = url.path_segments() else {
        return (None, None);
    };
    let segments: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
    match segments.iter().position(|s| *s == "id") {
        Some(idx) => (
            segments.get(idx + 1).map(|s| s.to_string()),
            segments.get(idx + 2).map(|s| s.to_string()),
        ),
        None => (None, None),
    }
}
