//! Granted OAuth scopes and the coverage check run before each cycle.

use std::collections::BTreeSet;

pub const SCOPE_FULL: &str = "full";
pub const SCOPE_WEB: &str = "web";
pub const SCOPE_VISUALFORCE: &str = "visualforce";
pub const SCOPE_LIGHTNING: &str = "lightning";
pub const SCOPE_CONTENT: &str = "content";

/// Set of granted scope tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSet(BTreeSet<String>);

impl ScopeSet {
    /// Parse the space-separated `scope` value of an OAuth response.
    pub fn parse(raw: &str) -> Self {
        raw.split_whitespace().collect()
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Checks that granted scopes cover every domain the engine authenticates.
pub struct ScopeInspector;

impl ScopeInspector {
    /// Warnings for each uncovered domain; empty when `full` is granted.
    /// Diagnostics only, never a reason to stop a cycle.
    pub fn inspect(scopes: &ScopeSet) -> Vec<String> {
        if scopes.contains(SCOPE_FULL) {
            return Vec::new();
        }

        let mut warnings = Vec::new();
        if !scopes.contains(SCOPE_WEB) {
            warnings.push("Missing web scope".to_string());
        }
        // web grants Visualforce access as well
        if !scopes.contains(SCOPE_VISUALFORCE) && !scopes.contains(SCOPE_WEB) {
            warnings.push("Missing visualforce scope".to_string());
        }
        if !scopes.contains(SCOPE_LIGHTNING) {
            warnings.push("Missing lightning scope".to_string());
        }
        if !scopes.contains(SCOPE_CONTENT) {
            warnings.push("Missing content scope".to_string());
        }
        warnings
    }
}
