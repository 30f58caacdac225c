//! Format checks backing the URL, email and timezone field specs

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

static EMAIL: OnceLock<Regex> = OnceLock::new();

const EMAIL_PATTERN: &str =
    r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$";

/// Accepts absolute http, https and ftp URLs with a host.
pub fn is_url(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "ftp") && url.host().is_some(),
        Err(_) => false,
    }
}

/// Accepts `local@domain.tld` addresses.
pub fn is_email(value: &str) -> bool {
    EMAIL
        .get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
        .is_match(value)
}

/// IANA timezone names known to `chrono-tz`.
pub fn timezone_names() -> BTreeSet<String> {
    chrono_tz::TZ_VARIANTS
        .iter()
        .map(|tz| tz.name().to_string())
        .collect()
}
