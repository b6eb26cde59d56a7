//! Field-level validation of bound values

use crate::config::types::Validate;
use crate::error::ValidationError;
use regex::Regex;
use std::sync::OnceLock;

/// Check `value` against every rule; the first failing constraint wins
pub fn validate_value(value: &str, rules: &[Validate]) -> Result<(), ValidationError> {
    rules.iter().try_for_each(|rule| validate_rule(value, rule))
}

fn validate_rule(value: &str, rule: &Validate) -> Result<(), ValidationError> {
    match rule.value_type.as_str() {
        "email" if !is_email(value) => return Err(ValidationError::NotEmail(value.to_string())),
        "url" if !is_url(value) => return Err(ValidationError::NotUrl(value.to_string())),
        "int" if !is_int(value) => return Err(ValidationError::NotInt(value.to_string())),
        _ => {}
    }

    if !rule.contain.is_empty() && !value.contains(rule.contain.as_str()) {
        return Err(ValidationError::MissingSubstring {
            needle: rule.contain.clone(),
            value: value.to_string(),
        });
    }
    if !rule.prefix.is_empty() && !value.starts_with(rule.prefix.as_str()) {
        return Err(ValidationError::MissingPrefix {
            prefix: rule.prefix.clone(),
            value: value.to_string(),
        });
    }
    if !rule.suffix.is_empty() && !value.ends_with(rule.suffix.as_str()) {
        return Err(ValidationError::MissingSuffix {
            suffix: rule.suffix.clone(),
            value: value.to_string(),
        });
    }

    let length = value.chars().count();
    if rule.min_length != 0 && length < rule.min_length {
        return Err(ValidationError::TooShort {
            min: rule.min_length,
            value: value.to_string(),
        });
    }
    if rule.max_length != 0 && length > rule.max_length {
        return Err(ValidationError::TooLong {
            max: rule.max_length,
            value: value.to_string(),
        });
    }

    if !rule.r#enum.is_empty() && !rule.r#enum.iter().any(|option| option == value) {
        return Err(ValidationError::NotInEnum {
            options: rule.r#enum.join(", "),
            value: value.to_string(),
        });
    }

    if !rule.regexp.is_empty() {
        let re = Regex::new(&rule.regexp).map_err(|source| ValidationError::InvalidRegex {
            pattern: rule.regexp.clone(),
            source,
        })?;
        if !re.is_match(value) {
            return Err(ValidationError::RegexMismatch {
                pattern: rule.regexp.clone(),
                value: value.to_string(),
            });
        }
    }

    Ok(())
}

fn is_email(value: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
        .map_or(false, |re| re.is_match(value))
}

/// Decimal integer of any width, without leading zeros
fn is_int(value: &str) -> bool {
    static INT: OnceLock<Option<Regex>> = OnceLock::new();
    INT.get_or_init(|| Regex::new(r"^[-+]?(0|[1-9][0-9]*)$").ok())
        .as_ref()
        .map_or(false, |re| re.is_match(value))
}

/// Optional scheme and credentials, then a host name, IPv4 or bracketed IPv6
/// address, an optional port and an optional path, query or fragment
fn is_url(value: &str) -> bool {
    static URL: OnceLock<Option<Regex>> = OnceLock::new();
    URL.get_or_init(|| {
        Regex::new(concat!(
            r"^(?:[A-Za-z][A-Za-z0-9+.\-]*://)?",
            r"(?:[^\s@/]+@)?",
            r"(?:localhost",
            r"|\[[0-9A-Fa-f:.]+\]",
            r"|[0-9]{1,3}(?:\.[0-9]{1,3}){3}",
            r"|(?:[A-Za-z0-9_](?:[A-Za-z0-9_\-]*[A-Za-z0-9])?\.)+[A-Za-z0-9\-]{2,})",
            r"(?::[0-9]{1,5})?",
            r"(?:[/?#]\S*)?$",
        ))
        .ok()
    })
    .as_ref()
    .map_or(false, |re| re.is_match(value))
}
