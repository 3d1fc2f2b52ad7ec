//! Session cookie reconciliation.
//!
//! Merges the resolved domain bundles into the user's prior cookie snapshot.
//! Domains are processed in a fixed order: Main, Lightning, Content, then
//! Visualforce when front-door replacement is enabled.
//!
//! Strictness differs per domain:
//!
//! | Domain      | session id failure        | markers                  |
//! |-------------|---------------------------|--------------------------|
//! | Main        | abort                     | abort                    |
//! | Lightning   | abort (skip when absent)  | CSRF only, warning       |
//! | Content     | warning                   | none                     |
//! | Visualforce | warning                   | warning                  |
//!
//! CSRF cookie failures never abort. Main always carries the CSRF cookie,
//! not only when Lightning is absent.
//!
//! Session and marker cookies carried over from the prior snapshot survive
//! only on domains that received a session cookie in this pass. Anything
//! else the snapshot holds is kept as is.

use crate::config::SyncConfig;
use crate::cookie_set::{ReconciledCookieSet, Upsert};
use crate::error::{SyncError, SyncResult};
use crate::resolver::{DomainBundles, DomainKind, DomainSessionBundle};
use cookie_storage::{normalize_domain, CookieError, CookieRecord};
use std::collections::HashSet;
use tracing::{debug, warn};

pub const CLIENT_SRC_COOKIE: &str = "clientSrc";
pub const SID_CLIENT_COOKIE: &str = "sid_Client";
pub const ORG_ID_COOKIE: &str = "oid";
pub const CSRF_COOKIE: &str = "eikoocnekotMob";

/// A successful reconciliation: the full set to apply plus the problems that
/// were downgraded along the way.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub cookies: ReconciledCookieSet,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    front_door_sid_replacement: bool,
}

impl Reconciler {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            front_door_sid_replacement: config.front_door_sid_replacement,
        }
    }

    /// Reconcile `bundles` against `prior`.
    ///
    /// On error nothing is returned; the caller must not apply anything.
    pub fn reconcile(
        &self,
        bundles: &DomainBundles,
        prior: &[CookieRecord],
        user_id: &str,
    ) -> SyncResult<Reconciliation> {
        let mut pass = Pass {
            user_id,
            cookies: ReconciledCookieSet::from_snapshot(prior),
            warnings: Vec::new(),
            covered: HashSet::new(),
        };

        pass.main(&bundles.main)?;
        pass.lightning(&bundles.lightning)?;
        pass.content(&bundles.content);
        if self.front_door_sid_replacement {
            pass.visualforce(&bundles.visualforce);
        } else {
            debug!(user_id, "Front-door replacement disabled, skipping Visualforce");
        }
        pass.prune_uncovered(bundles);

        debug!(
            user_id,
            cookies = pass.cookies.len(),
            warnings = pass.warnings.len(),
            "Reconciled session cookies"
        );
        Ok(Reconciliation {
            cookies: pass.cookies,
            warnings: pass.warnings,
        })
    }
}

/// State of one reconcile call.
struct Pass<'a> {
    user_id: &'a str,
    cookies: ReconciledCookieSet,
    warnings: Vec<String>,
    /// Normalized domains that received a session cookie.
    covered: HashSet<String>,
}

impl Pass<'_> {
    fn main(&mut self, bundle: &DomainSessionBundle) -> SyncResult<()> {
        let domain = bundle.domain.as_deref().ok_or(SyncError::InvalidApiDomain)?;
        let sid = bundle
            .sid_value
            .as_deref()
            .ok_or(SyncError::MissingMainSidCookie)?;

        self.write_sid(bundle, domain, sid).map_err(|e| match e {
            CookieError::EmptyDomain | CookieError::InvalidDomain(_) => SyncError::InvalidApiDomain,
            _ => SyncError::MissingMainSidCookie,
        })?;

        let client_src = bundle.client_src.as_deref().ok_or(SyncError::InvalidClientSrc)?;
        self.write(bundle, domain, CLIENT_SRC_COOKIE, client_src)
            .map_err(SyncError::FailedToMakeClientSrcCookie)?;

        let sid_client = bundle.sid_client.as_deref().ok_or(SyncError::InvalidSidClient)?;
        self.write(bundle, domain, SID_CLIENT_COOKIE, sid_client)
            .map_err(SyncError::FailedToMakeSidClientCookie)?;

        let org_id = bundle
            .org_id
            .as_deref()
            .ok_or_else(|| SyncError::FailedToMakeOidCookie("org id is missing".to_string()))?;
        self.write(bundle, domain, ORG_ID_COOKIE, org_id)
            .map_err(|e| SyncError::FailedToMakeOidCookie(e.to_string()))?;

        self.write_csrf(bundle, domain);
        Ok(())
    }

    fn lightning(&mut self, bundle: &DomainSessionBundle) -> SyncResult<()> {
        let Some((domain, sid)) = present(bundle) else {
            self.skip(bundle);
            return Ok(());
        };

        if let Err(e) = self.write_sid(bundle, domain, sid) {
            warn!(user_id = self.user_id, domain, error = %e, "Lightning session cookie rejected");
            return Err(SyncError::MissingLightningSidCookie);
        }
        self.write_csrf(bundle, domain);
        Ok(())
    }

    fn content(&mut self, bundle: &DomainSessionBundle) {
        let Some((domain, sid)) = present(bundle) else {
            self.skip(bundle);
            return;
        };

        if let Err(e) = self.write_sid(bundle, domain, sid) {
            self.degrade(bundle, SyncError::MissingContentSidCookie, Some(e));
        }
    }

    fn visualforce(&mut self, bundle: &DomainSessionBundle) {
        let Some((domain, sid)) = present(bundle) else {
            self.skip(bundle);
            return;
        };

        if let Err(e) = self.write_sid(bundle, domain, sid) {
            // no markers without a session cookie
            self.degrade(bundle, SyncError::MissingVfSidCookie, Some(e));
            return;
        }

        match bundle.client_src.as_deref() {
            Some(value) => {
                if let Err(e) = self.write(bundle, domain, CLIENT_SRC_COOKIE, value) {
                    self.degrade(bundle, SyncError::FailedToMakeClientSrcCookie(e), None);
                }
            }
            None => self.degrade(bundle, SyncError::InvalidClientSrc, None),
        }

        match bundle.sid_client.as_deref() {
            Some(value) => {
                if let Err(e) = self.write(bundle, domain, SID_CLIENT_COOKIE, value) {
                    self.degrade(bundle, SyncError::FailedToMakeSidClientCookie(e), None);
                }
            }
            None => self.degrade(bundle, SyncError::InvalidSidClient, None),
        }

        match bundle.org_id.as_deref() {
            Some(value) => {
                if let Err(e) = self.write(bundle, domain, ORG_ID_COOKIE, value) {
                    self.degrade(bundle, SyncError::FailedToMakeOidCookie(e.to_string()), None);
                }
            }
            None => self.degrade(
                bundle,
                SyncError::FailedToMakeOidCookie("org id is missing".to_string()),
                None,
            ),
        }
    }

    fn write_sid(
        &mut self,
        bundle: &DomainSessionBundle,
        domain: &str,
        sid: &str,
    ) -> Result<Upsert, CookieError> {
        let outcome = self.write(bundle, domain, &bundle.sid_cookie_name, sid)?;
        self.covered.insert(normalize_domain(domain));
        Ok(outcome)
    }

    /// Drop carried-over session and marker cookies on domains without a
    /// session cookie from this pass.
    fn prune_uncovered(&mut self, bundles: &DomainBundles) {
        let mut managed: HashSet<&str> =
            HashSet::from([CLIENT_SRC_COOKIE, SID_CLIENT_COOKIE, ORG_ID_COOKIE, CSRF_COOKIE]);
        for bundle in bundles.iter() {
            managed.insert(bundle.sid_cookie_name.as_str());
        }

        let covered = &self.covered;
        let dropped = self.cookies.retain(|cookie| {
            !managed.contains(cookie.name.as_str())
                || covered.contains(&normalize_domain(&cookie.domain))
        });
        if dropped > 0 {
            debug!(user_id = self.user_id, dropped, "Dropped stale session cookies");
        }
    }

    fn write_csrf(&mut self, bundle: &DomainSessionBundle, domain: &str) {
        let Some(token) = bundle.csrf_token.as_deref() else {
            debug!(user_id = self.user_id, domain, "No CSRF token to set");
            return;
        };
        if let Err(e) = self.write(bundle, domain, CSRF_COOKIE, token) {
            self.warn(format!(
                "Failed to make {} cookie for {} domain: {}",
                CSRF_COOKIE, bundle.kind, e
            ));
        }
    }

    /// Update-or-insert one cookie. An existing cookie keeps its attributes
    /// and only takes the new value.
    fn write(
        &mut self,
        bundle: &DomainSessionBundle,
        domain: &str,
        name: &str,
        value: &str,
    ) -> Result<Upsert, CookieError> {
        let record = match self.cookies.get(name, domain) {
            Some(existing) if existing.value == value => return Ok(Upsert::Unchanged),
            Some(existing) => existing.with_value(value)?,
            None => CookieRecord::session_cookie(name, value, domain)?
                .shared_with_subdomains(bundle.share_with_subdomains),
        };

        let outcome = self.cookies.upsert(record);
        debug!(
            user_id = self.user_id,
            domain,
            cookie = %cookie_label(bundle.kind, name, &bundle.sid_cookie_name),
            outcome = ?outcome,
            "Set cookie"
        );
        Ok(outcome)
    }

    fn skip(&mut self, bundle: &DomainSessionBundle) {
        self.warn(format!(
            "{} domain or session id is missing, skipping its cookies",
            bundle.kind
        ));
    }

    fn degrade(&mut self, bundle: &DomainSessionBundle, err: SyncError, cause: Option<CookieError>) {
        let message = match cause {
            Some(cause) => format!("{} ({}), continuing", err, cause),
            None => format!("{} for {} domain, continuing", err, bundle.kind),
        };
        self.warn(message);
    }

    fn warn(&mut self, message: String) {
        warn!(user_id = self.user_id, "{}", message);
        self.warnings.push(message);
    }
}

fn present(bundle: &DomainSessionBundle) -> Option<(&str, &str)> {
    Some((bundle.domain.as_deref()?, bundle.sid_value.as_deref()?))
}

fn cookie_label(kind: DomainKind, name: &str, sid_cookie_name: &str) -> String {
    if name == sid_cookie_name {
        format!("sid for {}", kind)
    } else if name == CSRF_COOKIE {
        format!("csrf for {}", kind)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialView, TokenFormat};
    use crate::resolver::resolve_bundles;
    use url::Url;

    const MAIN: &str = "test.salesforce.com";
    const LIGHTNING: &str = "lightning.test.salesforce.com";
    const CONTENT: &str = "content.test.salesforce.com";
    const VF: &str = "vf.test.salesforce.com";

    fn credential() -> CredentialView {
        CredentialView {
            user_id: "005xx0000001".to_string(),
            instance_url: Url::parse("https://test.salesforce.com").ok(),
            lightning_domain: Some(LIGHTNING.to_string()),
            lightning_sid: Some("L1".to_string()),
            vf_domain: Some(VF.to_string()),
            vf_sid: Some("V1".to_string()),
            content_domain: Some(CONTENT.to_string()),
            content_sid: Some("C1".to_string()),
            access_token: Some("A1".to_string()),
            token_format: TokenFormat::AccessToken,
            client_src: Some("CS1".to_string()),
            sid_client: Some("SC1".to_string()),
            sid_cookie_name: Some("sid".to_string()),
            csrf_token: Some("X1".to_string()),
            org_id: Some("O1".to_string()),
            ..Default::default()
        }
    }

    fn reconcile_with(
        config: &SyncConfig,
        view: &CredentialView,
        prior: &[CookieRecord],
    ) -> SyncResult<Reconciliation> {
        let bundles = resolve_bundles(view, &config.default_sid_cookie_name);
        Reconciler::new(config).reconcile(&bundles, prior, &view.user_id)
    }

    fn reconcile(view: &CredentialView) -> SyncResult<Reconciliation> {
        reconcile_with(&SyncConfig::default(), view, &[])
    }

    fn triples(set: &ReconciledCookieSet) -> Vec<(String, String, String)> {
        set.iter()
            .map(|c| (c.name.clone(), c.value.clone(), c.domain.clone()))
            .collect()
    }

    fn triple(name: &str, value: &str, domain: &str) -> (String, String, String) {
        (name.to_string(), value.to_string(), domain.to_string())
    }

    #[test]
    fn test_full_credential_produces_twelve_writes_in_order() {
        let result = reconcile(&credential()).unwrap();
        assert_eq!(
            triples(&result.cookies),
            vec![
                triple("sid", "A1", MAIN),
                triple("clientSrc", "CS1", MAIN),
                triple("sid_Client", "SC1", MAIN),
                triple("oid", "O1", MAIN),
                triple("eikoocnekotMob", "X1", MAIN),
                triple("sid", "L1", LIGHTNING),
                triple("eikoocnekotMob", "X1", LIGHTNING),
                triple("sid", "C1", CONTENT),
                triple("sid", "V1", VF),
                triple("clientSrc", "CS1", VF),
                triple("sid_Client", "SC1", VF),
                triple("oid", "O1", VF),
            ]
        );
        assert!(result.warnings.is_empty());
        assert!(result
            .cookies
            .iter()
            .all(|c| c.secure && c.session_only && c.path == "/"));
    }

    #[test]
    fn test_front_door_disabled_skips_visualforce() {
        let config = SyncConfig {
            front_door_sid_replacement: false,
            ..SyncConfig::default()
        };
        let result = reconcile_with(&config, &credential(), &[]).unwrap();
        assert_eq!(result.cookies.len(), 8);
        assert!(result.cookies.iter().all(|c| c.domain != VF));
    }

    #[test]
    fn test_jwt_main_sid_is_parent_sid() {
        let mut view = credential();
        view.token_format = TokenFormat::Jwt;
        view.parent_sid = Some("P1".to_string());
        let result = reconcile(&view).unwrap();
        assert_eq!(result.cookies.get("sid", MAIN).unwrap().value, "P1");
        assert!(result.cookies.iter().all(|c| c.value != "A1"));
    }

    #[test]
    fn test_access_token_main_sid() {
        let result = reconcile(&credential()).unwrap();
        assert_eq!(result.cookies.get("sid", MAIN).unwrap().value, "A1");
    }

    #[test]
    fn test_missing_main_domain_or_sid_fails() {
        let mut view = credential();
        view.instance_url = None;
        assert!(matches!(reconcile(&view), Err(SyncError::InvalidApiDomain)));

        let mut view = credential();
        view.access_token = None;
        assert!(matches!(reconcile(&view), Err(SyncError::MissingMainSidCookie)));

        let mut view = credential();
        view.token_format = TokenFormat::Jwt;
        assert!(matches!(reconcile(&view), Err(SyncError::MissingMainSidCookie)));
    }

    #[test]
    fn test_unusable_main_sid_fails() {
        let mut view = credential();
        view.access_token = Some("not a cookie value".to_string());
        assert!(matches!(reconcile(&view), Err(SyncError::MissingMainSidCookie)));
    }

    #[test]
    fn test_main_markers_are_required() {
        let mut view = credential();
        view.client_src = None;
        assert!(matches!(reconcile(&view), Err(SyncError::InvalidClientSrc)));

        let mut view = credential();
        view.sid_client = None;
        assert!(matches!(reconcile(&view), Err(SyncError::InvalidSidClient)));

        let mut view = credential();
        view.org_id = None;
        assert!(matches!(reconcile(&view), Err(SyncError::FailedToMakeOidCookie(_))));
    }

    #[test]
    fn test_main_marker_synthesis_failures_abort() {
        let mut view = credential();
        view.client_src = Some("a;b".to_string());
        assert!(matches!(
            reconcile(&view),
            Err(SyncError::FailedToMakeClientSrcCookie(CookieError::InvalidValue))
        ));

        let mut view = credential();
        view.sid_client = Some("a b".to_string());
        assert!(matches!(
            reconcile(&view),
            Err(SyncError::FailedToMakeSidClientCookie(CookieError::InvalidValue))
        ));

        let mut view = credential();
        view.org_id = Some("\"quoted\"".to_string());
        assert!(matches!(reconcile(&view), Err(SyncError::FailedToMakeOidCookie(_))));
    }

    #[test]
    fn test_missing_content_warns_once() {
        let mut view = credential();
        view.content_domain = None;
        let result = reconcile(&view).unwrap();

        assert!(result.cookies.iter().all(|c| c.domain != CONTENT));
        let content_warnings: Vec<_> = result
            .warnings
            .iter()
            .filter(|w| w.contains("Content"))
            .collect();
        assert_eq!(content_warnings.len(), 1);
        assert_eq!(result.cookies.len(), 11);
    }

    #[test]
    fn test_dropped_domains_lose_carried_over_cookies() {
        let snapshot = reconcile(&credential()).unwrap().cookies.into_vec();
        let mut view = credential();
        view.content_domain = None;
        view.vf_sid = None;

        let result = reconcile_with(&SyncConfig::default(), &view, &snapshot).unwrap();

        assert!(result.cookies.iter().all(|c| c.domain != CONTENT && c.domain != VF));
        assert_eq!(result.cookies.len(), 7);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_missing_content_with_snapshot_warns_once() {
        let snapshot = reconcile(&credential()).unwrap().cookies.into_vec();
        let mut view = credential();
        view.content_domain = None;

        let result = reconcile_with(&SyncConfig::default(), &view, &snapshot).unwrap();

        assert!(result.cookies.iter().all(|c| c.domain != CONTENT));
        assert_eq!(
            result.warnings.iter().filter(|w| w.contains("Content")).count(),
            1
        );
        assert_eq!(result.cookies.len(), 11);
    }

    #[test]
    fn test_rejected_sid_drops_previous_value() {
        let snapshot = reconcile(&credential()).unwrap().cookies.into_vec();

        let mut view = credential();
        view.content_sid = Some("bad sid".to_string());
        let result = reconcile_with(&SyncConfig::default(), &view, &snapshot).unwrap();
        assert!(!result.cookies.contains("sid", CONTENT));

        let mut view = credential();
        view.vf_sid = Some("bad sid".to_string());
        let result = reconcile_with(&SyncConfig::default(), &view, &snapshot).unwrap();
        assert!(result.cookies.iter().all(|c| c.domain != VF));
    }

    #[test]
    fn test_front_door_disabled_drops_visualforce_snapshot() {
        let snapshot = reconcile(&credential()).unwrap().cookies.into_vec();
        let config = SyncConfig {
            front_door_sid_replacement: false,
            ..SyncConfig::default()
        };

        let result = reconcile_with(&config, &credential(), &snapshot).unwrap();

        assert_eq!(result.cookies.len(), 8);
        assert!(result.cookies.iter().all(|c| c.domain != VF));
    }

    #[test]
    fn test_missing_lightning_drops_its_csrf_cookie() {
        let snapshot = reconcile(&credential()).unwrap().cookies.into_vec();
        let mut view = credential();
        view.lightning_domain = None;

        let result = reconcile_with(&SyncConfig::default(), &view, &snapshot).unwrap();

        assert!(!result.cookies.contains("sid", LIGHTNING));
        assert!(!result.cookies.contains(CSRF_COOKIE, LIGHTNING));
        assert!(result.cookies.contains(CSRF_COOKIE, MAIN));
    }

    #[test]
    fn test_unmanaged_cookies_on_dropped_domain_survive() {
        let mut snapshot = reconcile(&credential()).unwrap().cookies.into_vec();
        snapshot.push(CookieRecord::session_cookie("BrowserId", "B1", CONTENT).unwrap());
        let mut view = credential();
        view.content_sid = None;

        let result = reconcile_with(&SyncConfig::default(), &view, &snapshot).unwrap();

        assert!(!result.cookies.contains("sid", CONTENT));
        assert_eq!(result.cookies.get("BrowserId", CONTENT).unwrap().value, "B1");
    }

    #[test]
    fn test_bad_content_sid_is_best_effort() {
        let mut view = credential();
        view.content_sid = Some("bad sid".to_string());
        let result = reconcile(&view).unwrap();
        assert!(!result.cookies.contains("sid", CONTENT));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Content"));
    }

    #[test]
    fn test_missing_lightning_is_skipped() {
        let mut view = credential();
        view.lightning_sid = None;
        let result = reconcile(&view).unwrap();
        assert!(result.cookies.iter().all(|c| c.domain != LIGHTNING));
        // main still carries the CSRF cookie
        assert!(result.cookies.contains(CSRF_COOKIE, MAIN));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Lightning"));
    }

    #[test]
    fn test_bad_lightning_sid_aborts() {
        let mut view = credential();
        view.lightning_sid = Some("bad,sid".to_string());
        assert!(matches!(reconcile(&view), Err(SyncError::MissingLightningSidCookie)));
    }

    #[test]
    fn test_visualforce_failures_are_best_effort() {
        let mut view = credential();
        view.vf_sid = Some("bad sid".to_string());
        let result = reconcile(&view).unwrap();
        assert!(result.cookies.iter().all(|c| c.domain != VF));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Visualforce"));

        let mut view = credential();
        view.vf_domain = Some("vf.test.salesforce.com/path".to_string());
        let result = reconcile(&view).unwrap();
        assert_eq!(result.cookies.len(), 8);
    }

    #[test]
    fn test_bad_csrf_token_only_warns() {
        let mut view = credential();
        view.csrf_token = Some("x y".to_string());
        let result = reconcile(&view).unwrap();
        assert!(!result.cookies.contains(CSRF_COOKIE, MAIN));
        assert!(!result.cookies.contains(CSRF_COOKIE, LIGHTNING));
        assert_eq!(result.cookies.len(), 10);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_reconciliation_is_idempotent() {
        let view = credential();
        let first = reconcile(&view).unwrap();
        let snapshot = first.cookies.clone().into_vec();

        let second = reconcile_with(&SyncConfig::default(), &view, &snapshot).unwrap();
        assert!(second.cookies.same_values_as(&snapshot));
        assert_eq!(second.cookies, first.cookies);
    }

    #[test]
    fn test_prior_snapshot_is_updated_in_place() {
        let view = credential();
        let stale = CookieRecord::session_cookie("sid", "OLD", MAIN)
            .unwrap()
            .shared_with_subdomains(true);
        let unrelated = CookieRecord::session_cookie("BrowserId", "B1", MAIN).unwrap();

        let result =
            reconcile_with(&SyncConfig::default(), &view, &[unrelated.clone(), stale]).unwrap();

        let sid = result.cookies.get("sid", MAIN).unwrap();
        assert_eq!(sid.value, "A1");
        assert!(sid.share_with_subdomains);
        assert_eq!(result.cookies.as_slice()[0], unrelated);
        assert_eq!(result.cookies.as_slice()[1].name, "sid");
        assert_eq!(result.cookies.len(), 13);
    }

    #[test]
    fn test_custom_sid_cookie_name() {
        let mut view = credential();
        view.sid_cookie_name = None;
        let config = SyncConfig {
            default_sid_cookie_name: "sid_x".to_string(),
            ..SyncConfig::default()
        };
        let result = reconcile_with(&config, &view, &[]).unwrap();
        assert!(result.cookies.contains("sid_x", MAIN));
        assert!(result.cookies.contains("sid_x", LIGHTNING));
        assert!(!result.cookies.contains("sid", MAIN));
    }

    #[test]
    fn test_community_cookies_share_with_subdomains() {
        let mut view = credential();
        view.community_url = Url::parse("https://mycommunity.force.com/s").ok();
        let result = reconcile(&view).unwrap();
        assert!(result.cookies.iter().all(|c| c.share_with_subdomains));
    }
}
