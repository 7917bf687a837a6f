//! Environment variable helpers shared by `from_env` constructors.

use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

/// Parse an environment variable, falling back to `default` when unset or invalid.
///
/// A set but unparseable value is logged before the fallback applies.
pub fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match optional(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, default = %default, "Ignoring invalid environment value");
                default
            }
        },
        None => default,
    }
}

/// Parse an optional variable; invalid values are logged and treated as unset.
pub fn parse_optional<T: FromStr>(key: &str) -> Option<T> {
    let raw = optional(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring invalid environment value");
            None
        }
    }
}

/// Read a boolean flag. Accepts `1/0`, `true/false`, `yes/no` and `on/off`.
pub fn flag_or(key: &str, default: bool) -> bool {
    let Some(raw) = optional(key) else {
        return default;
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(key, value = %raw, default, "Ignoring invalid boolean environment value");
            default
        }
    }
}

/// Read a string variable, falling back to `default`.
pub fn string_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an optional, non-empty string variable.
pub fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEY: &str = "VPART_TEST_ENV_HELPER";

    #[test]
    #[serial]
    fn test_parse_or() {
        std::env::set_var(KEY, " 8 ");
        assert_eq!(parse_or(KEY, 4usize), 8);

        std::env::set_var(KEY, "abc");
        assert_eq!(parse_or(KEY, 4usize), 4);

        std::env::remove_var(KEY);
        assert_eq!(parse_or(KEY, 4usize), 4);
    }

    #[test]
    #[serial]
    fn test_parse_optional() {
        std::env::set_var(KEY, "600");
        assert_eq!(parse_optional::<u64>(KEY), Some(600));

        std::env::set_var(KEY, "ten minutes");
        assert_eq!(parse_optional::<u64>(KEY), None);
        std::env::remove_var(KEY);
    }

    #[test]
    #[serial]
    fn test_flag_or() {
        for (raw, expected) in [("1", true), ("YES", true), ("on", true), ("0", false), ("false", false)] {
            std::env::set_var(KEY, raw);
            assert_eq!(flag_or(KEY, !expected), expected, "value {raw}");
        }

        std::env::set_var(KEY, "maybe");
        assert!(flag_or(KEY, true));
        assert!(!flag_or(KEY, false));

        std::env::remove_var(KEY);
        assert!(flag_or(KEY, true));
    }
}
