//! Engine setup shared by all commands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use portal_config::{CliSettings, Config, LookupStrategy as ConfigLookup, ValidatorName};
use portal_nav::{
    LookupStrategy, NavigationConfig, NavigationProvider, NavigationTree, RequestContext,
    TreeRegistry, ValidatorKind, ValidatorKinds,
};
use portal_store::{EntityStore, MemoryStore};

use crate::error::CliError;

/// Options shared by every command.
#[derive(Args, Debug, Default)]
pub(crate) struct GlobalArgs {
    /// Path to configuration file (default: auto-discover portal.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Website name (overrides config).
    #[arg(short, long, global = true)]
    pub website: Option<String>,

    /// YAML store fixture (overrides config).
    #[arg(long, global = true)]
    pub fixture: Option<PathBuf>,

    /// Use the cached path index instead of per-segment lookups.
    #[arg(long, global = true)]
    pub indexed: bool,

    /// Additional websites to federate with, in consultation order.
    #[arg(long = "federate", value_name = "WEBSITE", global = true)]
    pub federate: Vec<String>,

    /// Resolve as this authenticated user (default: anonymous).
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Role held by the user (repeatable).
    #[arg(short, long = "role", requires = "user", global = true)]
    pub roles: Vec<String>,

    /// Request host (overrides config).
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output (debug logs).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Loaded configuration, store and navigation tree for one invocation.
pub(crate) struct Session {
    pub tree: Arc<NavigationTree>,
    pub ctx: RequestContext,
    /// Keeps federated trees alive.
    _registry: Arc<TreeRegistry>,
}

impl Session {
    /// Load configuration and the fixture store, then build the trees.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or the fixture fails to load, or a
    /// named website does not exist.
    pub(crate) fn open(args: &GlobalArgs) -> Result<Self, CliError> {
        let cli_settings = CliSettings {
            website: args.website.clone(),
            host: args.host.clone(),
            fixture: args.fixture.clone(),
            lookup: args.indexed.then_some(ConfigLookup::Indexed),
        };
        let config = Config::load(args.config.as_deref(), Some(&cli_settings))?;

        let fixture = config
            .fixture_path
            .clone()
            .ok_or_else(|| CliError::Validation("No fixture configured".to_owned()))?;
        tracing::info!(fixture = %fixture.display(), "Loading store fixture");
        let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::load(&fixture)?);

        let registry = Arc::new(TreeRegistry::new());
        let nav_config = navigation_config(&config);
        let tree = Arc::new(build_tree(&store, &config.site.website, &nav_config, &registry)?);
        registry.register(Arc::clone(&tree) as Arc<dyn NavigationProvider>);
        for name in &args.federate {
            let federated = build_tree(&store, name, &nav_config, &registry)?;
            registry.register(Arc::new(federated));
        }

        Ok(Self {
            tree,
            ctx: request_context(args, &config),
            _registry: registry,
        })
    }
}

fn build_tree(
    store: &Arc<dyn EntityStore>,
    website: &str,
    config: &NavigationConfig,
    registry: &Arc<TreeRegistry>,
) -> Result<NavigationTree, CliError> {
    let website = store
        .find_website(website)?
        .ok_or_else(|| CliError::Validation(format!("Website '{website}' not found in store")))?;
    Ok(NavigationTree::new(
        website.name.clone(),
        website,
        Arc::clone(store),
        config.clone(),
    )
    .with_registry(registry))
}

/// Map loaded configuration onto engine settings.
pub(crate) fn navigation_config(config: &Config) -> NavigationConfig {
    NavigationConfig {
        root_aliases: config.paths.root_aliases.clone(),
        app_path: config.paths.app_path.clone(),
        lookup: match config.lookup.strategy {
            ConfigLookup::Recursive => LookupStrategy::Recursive,
            ConfigLookup::Indexed => LookupStrategy::Indexed,
        },
        validators: ValidatorKinds {
            access: validator_kinds(&config.validators.access()),
            listing: validator_kinds(&config.validators.listing()),
            security: validator_kinds(&config.validators.security()),
        },
        authenticated_role: config.security.authenticated_role.clone(),
    }
}

fn validator_kinds(names: &[ValidatorName]) -> Vec<ValidatorKind> {
    names
        .iter()
        .map(|name| match name {
            ValidatorName::Security => ValidatorKind::Security,
            ValidatorName::Hidden => ValidatorKind::Hidden,
            ValidatorName::Always => ValidatorKind::Always,
            ValidatorName::Never => ValidatorKind::Never,
        })
        .collect()
}

/// Requester described by the command line, on the configured host.
pub(crate) fn request_context(args: &GlobalArgs, config: &Config) -> RequestContext {
    let ctx = match &args.user {
        Some(user) => RequestContext::authenticated(user.clone(), args.roles.clone()),
        None => RequestContext::anonymous(),
    };
    match &config.site.host {
        Some(host) => ctx.with_host(host.clone()),
        None => ctx,
    }
}
