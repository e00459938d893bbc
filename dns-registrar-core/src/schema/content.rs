//! Per-type content grammar checks.
//!
//! Validators return a human-readable reason on rejection; canonicalization
//! (trailing dots, TXT quoting) happens in the parser after the raw value
//! passes its grammar.

use std::net::{Ipv4Addr, Ipv6Addr};

pub(crate) const MAX_TXT_LEN: usize = 1000;
pub(crate) const MAX_LABEL_LEN: usize = 63;

/// CAA property tags accepted by the schema.
pub(crate) const CAA_TAGS: &[&str] = &["issue", "issuewild", "issuemail", "iodef"];

pub(crate) fn validate_ipv4(s: &str) -> Result<(), String> {
    s.parse::<Ipv4Addr>()
        .map(|_| ())
        .map_err(|_| format!("'{s}' is not a valid IPv4 address (e.g. 192.168.1.1)"))
}

pub(crate) fn validate_ipv6(s: &str) -> Result<(), String> {
    s.parse::<Ipv6Addr>()
        .map(|_| ())
        .map_err(|_| format!("'{s}' is not a valid IPv6 address (e.g. 2606:50c0:8000::153)"))
}

fn valid_hostname_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && !label.starts_with('-')
        && !label.ends_with('-')
}

/// Hostname grammar for record targets. A trailing dot is accepted; the
/// parser appends one later either way.
pub(crate) fn validate_hostname(s: &str) -> Result<(), String> {
    let trimmed = s.strip_suffix('.').unwrap_or(s);
    let ok = !trimmed.is_empty() && trimmed.split('.').all(valid_hostname_label);
    if ok {
        Ok(())
    } else {
        Err(format!(
            "'{s}' is not a valid hostname (e.g. example.com or mail.example.com)"
        ))
    }
}

/// Relative record name inside a unit: lowercase letters, digits, dots,
/// underscores, hyphens. The apex marker `@` is handled by the caller.
pub(crate) fn validate_relative_name(s: &str) -> Result<(), String> {
    let ok = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));
    if ok {
        Ok(())
    } else {
        Err(format!(
            "record name '{s}' may only contain lowercase letters, digits, dots, underscores and hyphens"
        ))
    }
}

/// Subdomain label (the unit's own name): single DNS label, no leading or
/// trailing hyphen.
pub(crate) fn validate_subdomain_label(s: &str) -> Result<(), String> {
    let ok = !s.is_empty()
        && s.len() <= MAX_LABEL_LEN
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !s.starts_with('-')
        && !s.ends_with('-');
    if ok {
        Ok(())
    } else {
        Err(format!(
            "subdomain '{s}' must be a single label of lowercase letters, digits and hyphens, not starting or ending with a hyphen"
        ))
    }
}

/// Root-level record name: one label directly under the domain apex.
pub(crate) fn validate_root_level_name(s: &str) -> Result<(), String> {
    let ok = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-'));
    if ok {
        Ok(())
    } else {
        Err(format!(
            "root-level name '{s}' may only contain lowercase letters, digits, underscores and hyphens"
        ))
    }
}

pub(crate) fn validate_hex(s: &str) -> Result<(), String> {
    let ok = !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit());
    if ok {
        Ok(())
    } else {
        Err(format!(
            "'{s}' is not a valid hexadecimal digest (e.g. 0123456789abcdef)"
        ))
    }
}

pub(crate) fn validate_txt(s: &str) -> Result<(), String> {
    if s.is_empty() {
        Err("TXT content must not be empty".to_string())
    } else if s.len() > MAX_TXT_LEN {
        Err(format!("TXT content exceeds {MAX_TXT_LEN} characters"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_accepts_dotted_quad_only() {
        assert!(validate_ipv4("192.168.1.1").is_ok());
        assert!(validate_ipv4("256.1.1.1").is_err());
        assert!(validate_ipv4("1.2.3").is_err());
        assert!(validate_ipv4("2001:db8::1").is_err());
    }

    #[test]
    fn ipv6_accepts_compressed_forms() {
        assert!(validate_ipv6("2606:50c0:8000::153").is_ok());
        assert!(validate_ipv6("::1").is_ok());
        assert!(validate_ipv6("1.2.3.4").is_err());
    }

    #[test]
    fn hostname_grammar() {
        assert!(validate_hostname("example.com").is_ok());
        assert!(validate_hostname("example.com.").is_ok());
        assert!(validate_hostname("mail-1.example.com").is_ok());
        assert!(validate_hostname("_dmarc.example.com").is_ok());
        assert!(validate_hostname("-bad.example.com").is_err());
        assert!(validate_hostname("bad-.example.com").is_err());
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("a..b").is_err());
    }

    #[test]
    fn relative_name_charset() {
        assert!(validate_relative_name("_dmarc.mail").is_ok());
        assert!(validate_relative_name("sub-1").is_ok());
        assert!(validate_relative_name("UPPER").is_err());
        assert!(validate_relative_name("sp ace").is_err());
        assert!(validate_relative_name("").is_err());
    }

    #[test]
    fn subdomain_label_shape() {
        assert!(validate_subdomain_label("myblog").is_ok());
        assert!(validate_subdomain_label("a-b-c").is_ok());
        assert!(validate_subdomain_label("-ab").is_err());
        assert!(validate_subdomain_label("ab-").is_err());
        assert!(validate_subdomain_label("under_score").is_err());
        assert!(validate_subdomain_label(&"x".repeat(64)).is_err());
    }

    #[test]
    fn root_level_name_allows_underscore_but_not_dots() {
        assert!(validate_root_level_name("_vercel").is_ok());
        assert!(validate_root_level_name("a.b").is_err());
    }

    #[test]
    fn hex_digest() {
        assert!(validate_hex("0123456789abcdefABCDEF").is_ok());
        assert!(validate_hex("xyz").is_err());
        assert!(validate_hex("").is_err());
    }

    #[test]
    fn txt_length_bounds() {
        assert!(validate_txt("v=spf1 -all").is_ok());
        assert!(validate_txt("").is_err());
        assert!(validate_txt(&"x".repeat(1001)).is_err());
    }
}
