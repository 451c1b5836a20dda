//! `Cache-Control` header interpretation.

use std::time::Duration;

/// Freshness hint carried by a `Cache-Control` header value.
///
/// `no-store` and `no-cache` yield a zero TTL, `max-age=N` yields N seconds,
/// anything else yields no hint.
pub fn ttl_hint(header: &str) -> Option<Duration> {
    let mut max_age = None;
    for directive in header.split(',') {
        let directive = directive.trim().to_ascii_lowercase();
        if directive == "no-store" || directive == "no-cache" {
            return Some(Duration::ZERO);
        }
        if let Some(value) = directive.strip_prefix("max-age=") {
            if let Ok(secs) = value.trim().trim_matches('"').parse::<u64>() {
                max_age = Some(Duration::from_secs(secs));
            }
        }
    }
    max_age
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_age_is_parsed() {
        assert_eq!(ttl_hint("public, max-age=30"), Some(Duration::from_secs(30)));
        assert_eq!(ttl_hint("Max-Age=\"15\""), Some(Duration::from_secs(15)));
    }

    #[test]
    fn no_store_wins() {
        assert_eq!(ttl_hint("max-age=600, no-store"), Some(Duration::ZERO));
        assert_eq!(ttl_hint("no-cache"), Some(Duration::ZERO));
    }

    #[test]
    fn unrelated_directives_give_no_hint() {
        assert_eq!(ttl_hint("public"), None);
        assert_eq!(ttl_hint("max-age=soon"), None);
        assert_eq!(ttl_hint(""), None);
    }
}
