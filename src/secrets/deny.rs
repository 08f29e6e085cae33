//! The hard-deny list: filenames that are excluded outright.
//!
//! Files matching these patterns are never included in output, regardless
//! of redaction settings. The list targets credential stores and key
//! material whose entire content is secret.

use crate::profile::match_options;
use glob::Pattern;
use once_cell::sync::Lazy;

const HARD_DENY_SOURCES: &[&str] = &[
    ".env",
    ".env.*",
    "*.pem",
    "*.key",
    "*.p12",
    "*.pfx",
    "*.jks",
    "*.keystore",
    "*.ppk",
    "*.kdbx",
    "id_rsa*",
    "id_dsa*",
    "id_ecdsa*",
    "id_ed25519*",
    "credentials",
    "credentials.*",
    "*credentials*.json",
    "service-account*.json",
    "service_account*.json",
    "secrets.*",
    ".netrc",
    ".npmrc",
    ".pypirc",
    ".htpasswd",
];

static HARD_DENY: Lazy<Vec<(&'static str, Pattern)>> = Lazy::new(|| {
    HARD_DENY_SOURCES
        .iter()
        .map(|source| {
            (
                *source,
                Pattern::new(source).expect("hard-deny pattern must compile"),
            )
        })
        .collect()
});

/// Returns the pattern that denies this path, matched against its
/// basename, or `None` when the file is allowed.
pub fn hard_deny_match(path: &str) -> Option<&'static str> {
    let basename = path.rsplit('/').next().unwrap_or(path);
    let options = match_options();
    HARD_DENY
        .iter()
        .find(|(_, pattern)| pattern.matches_with(basename, options))
        .map(|(source, _)| *source)
}

/// True when the path is on the hard-deny list.
pub fn is_hard_denied(path: &str) -> bool {
    hard_deny_match(path).is_some()
}
