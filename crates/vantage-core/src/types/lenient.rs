//! Tolerant deserializers for values written by older tooling.
//!
//! Stores written by earlier versions use `True`/`False` for booleans and
//! sometimes render integer columns as floats (`200.0`).

use serde::{Deserialize, Deserializer};

/// Interpret common boolean spellings; empty means `false`
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "1.0" => Some(true),
        "false" | "0" | "no" | "n" | "0.0" | "" => Some(false),
        _ => None,
    }
}

/// Interpret an optional status code, accepting `200` and `200.0`
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_status_code(raw: &str) -> Option<u16> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<u16>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(f))
            .map(|f| f as u16)
    })
}

/// Deserialize a boolean column leniently
pub fn bool_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    parse_bool(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid boolean: {raw:?}")))
}

/// Deserialize an optional boolean column leniently; empty means `None`
pub fn optional_bool_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_bool(&raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid boolean: {raw:?}")))
}

/// Deserialize an optional status code column leniently
pub fn status_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_status_code(&raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid status code: {raw:?}")))
}

/// Deserialize an optional text column, treating empty text as `None`
pub fn non_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_accept_legacy_spellings() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("FALSE"), Some(false));
        assert_eq!(parse_bool(""), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn status_codes_accept_float_rendering() {
        assert_eq!(parse_status_code("200"), Some(200));
        assert_eq!(parse_status_code("403.0"), Some(403));
        assert_eq!(parse_status_code(""), None);
        assert_eq!(parse_status_code("2.5"), None);
    }
}
