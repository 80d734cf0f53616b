//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a config value.
///
/// `field` names the config key for error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_literal_unchanged() {
        assert_eq!(expand_env("localhost", "site.host").unwrap(), "localhost");
    }

    #[test]
    fn test_expand_env_default_used_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("PORTAL_EXPAND_UNSET");
        }

        let value = expand_env("${PORTAL_EXPAND_UNSET:-portal.local}", "site.host").unwrap();

        assert_eq!(value, "portal.local");
    }

    #[test]
    fn test_expand_env_missing_var_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("PORTAL_EXPAND_MISSING");
        }

        let err = expand_env("${PORTAL_EXPAND_MISSING}", "site.host").unwrap_err();

        let message = err.to_string();
        assert!(message.contains("site.host"));
        assert!(message.contains("PORTAL_EXPAND_MISSING"));
    }
}
