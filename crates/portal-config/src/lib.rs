//! Configuration management for the portal navigation engine.
//!
//! Parses `portal.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `site.website`
//! - `site.host`
//! - `site.fixture`
//!
//! ## Example
//!
//! ```toml
//! [site]
//! website = "Portal"
//! host = "${PORTAL_HOST:-localhost}"
//! fixture = "site.yaml"
//!
//! [paths]
//! root_aliases = ["/default.aspx", "/index.html"]
//!
//! [lookup]
//! strategy = "indexed"
//!
//! [validators]
//! listing = ["security", "hidden"]
//! ```

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override website name.
    pub website: Option<String>,
    /// Override request host.
    pub host: Option<String>,
    /// Override fixture path.
    pub fixture: Option<PathBuf>,
    /// Override lookup strategy.
    pub lookup: Option<LookupStrategy>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "portal.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Website selection.
    pub site: SiteConfig,
    /// Path canonicalization settings.
    pub paths: PathsConfig,
    /// Content lookup settings.
    pub lookup: LookupConfig,
    /// Validator chain composition.
    pub validators: ValidatorsConfig,
    /// Security oracle settings.
    pub security: SecurityConfig,

    /// Resolved fixture path (set after loading).
    #[serde(skip)]
    pub fixture_path: Option<PathBuf>,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Website selection.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Name of the website the navigation tree is bound to.
    pub website: String,
    /// Host the portal answers to. Used to vet internal-redirect paths.
    pub host: Option<String>,
    /// YAML fixture backing the in-memory store (relative to the config file).
    fixture: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            website: "Portal".to_owned(),
            host: None,
            fixture: None,
        }
    }
}

/// Path canonicalization settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Default-document paths treated as the root (`/`).
    pub root_aliases: Vec<String>,
    /// Virtual application root that `~/` paths resolve against.
    pub app_path: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root_aliases: vec!["/default.aspx".to_owned()],
            app_path: "/".to_owned(),
        }
    }
}

/// Content lookup strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupStrategy {
    /// One store query per path segment against live data.
    #[default]
    Recursive,
    /// Cached per-website path index.
    Indexed,
}

/// Content lookup settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Lookup strategy.
    pub strategy: LookupStrategy,
}

/// Named validator building blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorName {
    /// Read-right check through the security oracle.
    Security,
    /// Rejects records flagged hidden from navigation.
    Hidden,
    /// Accepts everything.
    Always,
    /// Rejects everything.
    Never,
}

/// Validator chain composition.
///
/// Each chain is an ordered list of validator names combined with logical
/// AND. A chain that is not configured defaults to `["security"]`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ValidatorsConfig {
    /// Gate for returning a resolved node to the requester.
    access: Option<Vec<ValidatorName>>,
    /// Gate for including a node in child listings.
    listing: Option<Vec<ValidatorName>>,
    /// The node's own security check.
    security: Option<Vec<ValidatorName>>,
}

impl ValidatorsConfig {
    /// Validators gating direct access.
    #[must_use]
    pub fn access(&self) -> Vec<ValidatorName> {
        chain_or_security(self.access.as_ref())
    }

    /// Validators gating inclusion in listings.
    #[must_use]
    pub fn listing(&self) -> Vec<ValidatorName> {
        chain_or_security(self.listing.as_ref())
    }

    /// Validators run for the node's own security check.
    #[must_use]
    pub fn security(&self) -> Vec<ValidatorName> {
        chain_or_security(self.security.as_ref())
    }
}

fn chain_or_security(chain: Option<&Vec<ValidatorName>>) -> Vec<ValidatorName> {
    chain.cloned().unwrap_or_else(|| vec![ValidatorName::Security])
}

/// Security oracle settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Role implicitly held by every authenticated requester.
    pub authenticated_role: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            authenticated_role: "Authenticated Users".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`site.host`").
        field: String,
        /// Error message (e.g., "${`PORTAL_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a path field to start with `/`.
fn require_rooted(value: &str, field: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "{field} must start with '/': {value}"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `portal.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(website) = &settings.website {
            self.site.website.clone_from(website);
        }
        if let Some(host) = &settings.host {
            self.site.host = Some(host.clone());
        }
        if let Some(fixture) = &settings.fixture {
            self.fixture_path = Some(fixture.clone());
        }
        if let Some(strategy) = settings.lookup {
            self.lookup.strategy = strategy;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            site: SiteConfig::default(),
            paths: PathsConfig::default(),
            lookup: LookupConfig::default(),
            validators: ValidatorsConfig::default(),
            security: SecurityConfig::default(),
            fixture_path: Some(base.join("site.yaml")),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_site()?;
        self.validate_paths()?;
        require_non_empty(
            &self.security.authenticated_role,
            "security.authenticated_role",
        )?;
        Ok(())
    }

    fn validate_site(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.site.website, "site.website")?;
        if let Some(host) = &self.site.host {
            require_non_empty(host, "site.host")?;
            if host.contains('/') {
                return Err(ConfigError::Validation(format!(
                    "site.host must be a bare host name: {host}"
                )));
            }
        }
        Ok(())
    }

    fn validate_paths(&self) -> Result<(), ConfigError> {
        require_rooted(&self.paths.app_path, "paths.app_path")?;
        for alias in &self.paths.root_aliases {
            require_rooted(alias, "paths.root_aliases")?;
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.site.website = expand::expand_env(&self.site.website, "site.website")?;
        if let Some(ref host) = self.site.host {
            self.site.host = Some(expand::expand_env(host, "site.host")?);
        }
        if let Some(ref fixture) = self.site.fixture {
            self.site.fixture = Some(expand::expand_env(fixture, "site.fixture")?);
        }
        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let fixture = self.site.fixture.as_deref().unwrap_or("site.yaml");
        self.fixture_path = Some(config_dir.join(fixture));
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));

        assert_eq!(config.site.website, "Portal");
        assert!(config.site.host.is_none());
        assert_eq!(config.paths.root_aliases, vec!["/default.aspx".to_owned()]);
        assert_eq!(config.paths.app_path, "/");
        assert_eq!(config.lookup.strategy, LookupStrategy::Recursive);
        assert_eq!(config.security.authenticated_role, "Authenticated Users");
        assert_eq!(config.fixture_path, Some(PathBuf::from("/test/site.yaml")));
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.site.website, "Portal");
        assert_eq!(config.lookup.strategy, LookupStrategy::Recursive);
    }

    #[test]
    fn test_parse_site_config() {
        let toml = r#"
[site]
website = "Community"
host = "portal.example.com"
fixture = "data/site.yaml"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.site.website, "Community");
        assert_eq!(config.site.host.as_deref(), Some("portal.example.com"));
        assert_eq!(config.site.fixture.as_deref(), Some("data/site.yaml"));
    }

    #[test]
    fn test_parse_lookup_strategy() {
        let toml = r#"
[lookup]
strategy = "indexed"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.lookup.strategy, LookupStrategy::Indexed);
    }

    #[test]
    fn test_parse_unknown_lookup_strategy_fails() {
        let toml = r#"
[lookup]
strategy = "magic"
"#;
        let result: Result<Config, _> = toml::from_str(toml);

        assert!(result.is_err());
    }

    #[test]
    fn test_validators_default_to_security_chain() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.validators.access(), vec![ValidatorName::Security]);
        assert_eq!(config.validators.listing(), vec![ValidatorName::Security]);
        assert_eq!(config.validators.security(), vec![ValidatorName::Security]);
    }

    #[test]
    fn test_validators_configured_independently() {
        let toml = r#"
[validators]
listing = ["security", "hidden"]
security = ["always"]
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.validators.access(), vec![ValidatorName::Security]);
        assert_eq!(
            config.validators.listing(),
            vec![ValidatorName::Security, ValidatorName::Hidden]
        );
        assert_eq!(config.validators.security(), vec![ValidatorName::Always]);
    }

    #[test]
    fn test_validators_unknown_name_fails() {
        let toml = r#"
[validators]
access = ["security", "telepathy"]
"#;
        let result: Result<Config, _> = toml::from_str(toml);

        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_paths_fixture_relative_to_config_dir() {
        let toml = r#"
[site]
fixture = "data/site.yaml"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();

        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.fixture_path,
            Some(PathBuf::from("/project/data/site.yaml"))
        );
    }

    #[test]
    fn test_resolve_paths_fixture_default() {
        let mut config: Config = toml::from_str("").unwrap();

        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.fixture_path, Some(PathBuf::from("/project/site.yaml")));
    }

    #[test]
    fn test_apply_cli_settings_multiple() {
        let mut config = Config::default_with_base(Path::new("/test"));

        let overrides = CliSettings {
            website: Some("Community".to_owned()),
            host: Some("portal.example.com".to_owned()),
            fixture: Some(PathBuf::from("/other/site.yaml")),
            lookup: Some(LookupStrategy::Indexed),
        };
        config.apply_cli_settings(&overrides);

        assert_eq!(config.site.website, "Community");
        assert_eq!(config.site.host.as_deref(), Some("portal.example.com"));
        assert_eq!(
            config.fixture_path,
            Some(PathBuf::from("/other/site.yaml"))
        );
        assert_eq!(config.lookup.strategy, LookupStrategy::Indexed);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));

        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(config.site.website, "Portal");
        assert_eq!(config.fixture_path, Some(PathBuf::from("/test/site.yaml")));
    }

    #[test]
    fn test_expand_env_vars_site_host() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("PORTAL_TEST_HOST", "portal.test");
        }

        let toml = r#"
[site]
host = "${PORTAL_TEST_HOST}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(config.site.host.as_deref(), Some("portal.test"));

        unsafe {
            std::env::remove_var("PORTAL_TEST_HOST");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("PORTAL_MISSING_WEBSITE");
        }

        let toml = r#"
[site]
website = "${PORTAL_MISSING_WEBSITE}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("site.website"));
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/test"));

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_website_fails() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.site.website = String::new();

        let err = config.validate().unwrap_err();

        assert!(err.to_string().contains("site.website cannot be empty"));
    }

    #[test]
    fn test_validate_host_with_path_fails() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.site.host = Some("portal.example.com/app".to_owned());

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_unrooted_root_alias_fails() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.paths.root_aliases = vec!["default.aspx".to_owned()];

        let err = config.validate().unwrap_err();

        assert!(err.to_string().contains("paths.root_aliases"));
    }

    #[test]
    fn test_load_explicit_missing_path_returns_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("portal.toml");

        let err = Config::load(Some(path.as_path()), None).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(p) if p == path));
    }

    #[test]
    fn test_load_from_file_resolves_and_records_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("portal.toml");
        fs::write(
            &path,
            "[site]\nwebsite = \"Community\"\nfixture = \"community.yaml\"\n",
        )
        .unwrap();

        let config = Config::load(Some(path.as_path()), None).unwrap();

        assert_eq!(config.site.website, "Community");
        assert_eq!(config.config_path, Some(path));
        assert_eq!(
            config.fixture_path,
            Some(temp_dir.path().join("community.yaml"))
        );
    }

    #[test]
    fn test_load_invalid_toml_returns_parse_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("portal.toml");
        fs::write(&path, "[site\nwebsite = ").unwrap();

        let err = Config::load(Some(path.as_path()), None).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_cli_settings_are_validated() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("portal.toml");
        fs::write(&path, "").unwrap();
        let overrides = CliSettings {
            website: Some(String::new()),
            ..Default::default()
        };

        let err = Config::load(Some(path.as_path()), Some(&overrides)).unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
