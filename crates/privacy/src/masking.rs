use regex::Regex;

pub const REDACTION_TOKEN: &str = "[REDACTED]";

pub fn truncate(value: &str, max_len: usize) -> String {
    if max_len == 0 || value.chars().count() <= max_len {
        return value.to_string();
    }
    value.chars().take(max_len).collect()
}

pub fn mask_patterns(value: &str, patterns: &[Regex]) -> String {
    let mut masked = value.to_string();
    for pattern in patterns {
        masked = pattern.replace_all(&masked, REDACTION_TOKEN).into_owned();
    }
    masked
}

/// Reduce a URL to its host when `keep_domain_only` is set, matching the
/// original collector's `urlparse(...).netloc` behavior without pulling
/// in a dedicated URL-parsing crate.
pub fn sanitize_url(value: &str, keep_domain_only: bool) -> String {
    if !keep_domain_only {
        return value.to_string();
    }
    match extract_netloc(value) {
        Some(netloc) => netloc,
        None => value.to_string(),
    }
}

fn extract_netloc(value: &str) -> Option<String> {
    let after_scheme = value.split_once("://").map(|(_, rest)| rest).unwrap_or(value);
    let end = after_scheme
        .find(['/', '?', '#'])
        .unwrap_or(after_scheme.len());
    let netloc = &after_scheme[..end];
    if netloc.is_empty() {
        None
    } else {
        Some(netloc.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_strings_untouched() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn truncate_cuts_long_strings() {
        assert_eq!(truncate("hello world", 5), "hello");
    }

    #[test]
    fn sanitize_url_keeps_only_the_host() {
        assert_eq!(
            sanitize_url("https://mail.example.com/inbox?id=5", true),
            "mail.example.com"
        );
    }

    #[test]
    fn sanitize_url_full_passthrough_when_disabled() {
        assert_eq!(
            sanitize_url("https://mail.example.com/inbox", false),
            "https://mail.example.com/inbox"
        );
    }

    #[test]
    fn mask_patterns_replaces_every_match() {
        let email_re = Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").unwrap();
        let masked = mask_patterns("contact alice@example.com or bob@example.com", &[email_re]);
        assert_eq!(masked, "contact [REDACTED] or [REDACTED]");
    }
}
