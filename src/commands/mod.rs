pub mod apply;
pub mod plan;
pub mod report;

use anyhow::{Context as _, Result};
use declarative::Catalog;

use crate::cli::IntentArgs;
use crate::config::Config;
use crate::{facts, templates};

/// Everything a catalog-building command works from
pub struct Session {
    pub config: Config,
    pub fqdn: String,
    pub catalog: Catalog,
}

/// Load the config, apply flags, gather facts and compile the catalog
pub fn load(args: &IntentArgs) -> Result<Session> {
    let mut config = Config::load(args.config.as_deref())?;
    config.apply_args(args);

    let fqdn = facts::resolve_fqdn(config.node.fqdn.as_deref())?;
    let store = templates::store(config.template_dir());

    let catalog = Catalog::compile(&config.intent, &fqdn, store.as_ref())
        .context("Failed to compile the catalog")?;
    log::info!(
        "Compiled {} resources for {} ({:?})",
        catalog.resources().len(),
        fqdn,
        config.intent.branch()
    );

    Ok(Session {
        config,
        fqdn,
        catalog,
    })
}
