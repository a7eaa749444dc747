//! Config file loading
//!
//! The config file is TOML. Top-level keys are the module settings
//! (`version`, `absent`, `template`, `[options]`, ...); the `[node]` and
//! `[templates]` tables hold machine facts and template lookup settings.
//!
//! ```toml
//! version = "1.0.42"
//! service_autorestart = false
//!
//! [options]
//! opt_a = "value_a"
//!
//! [node]
//! fqdn = "host.example.com"
//!
//! [templates]
//! dir = "/etc/adclictl/templates"
//! ```

use crate::cli::{IntentArgs, switch};
use crate::paths;
use anyhow::{Context, Result, bail};
use declarative::Intent;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Overrides the fqdn fact
    pub fqdn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory searched for template references
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node: NodeConfig,
    pub templates: TemplatesConfig,
    #[serde(flatten)]
    pub intent: Intent,
}

impl Config {
    /// Load the config
    ///
    /// An explicit path must exist. Without one, the default config file is
    /// read when present and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            return Self::load_from(path);
        }

        let default = paths::config_file();
        if default.exists() {
            Self::load_from(&default)
        } else {
            log::debug!(
                "No config file at {}, using defaults",
                default.display()
            );
            Ok(Self::default())
        }
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply command-line flags on top of the file values
    pub fn apply_args(&mut self, args: &IntentArgs) {
        let intent = &mut self.intent;

        set_flag(&mut intent.absent, switch(args.absent, args.no_absent));
        set_flag(&mut intent.disable, switch(args.disable, args.no_disable));
        set_flag(&mut intent.disableboot, switch(args.disableboot, args.no_disableboot));
        set_flag(&mut intent.noop, switch(args.noop, args.no_noop));
        set_flag(
            &mut intent.source_dir_purge,
            switch(args.source_dir_purge, args.no_source_dir_purge),
        );
        set_flag(&mut intent.audit_only, switch(args.audit_only, args.no_audit_only));
        set_flag(&mut intent.service_autorestart, args.service_autorestart);

        override_with(&mut intent.version, args.pkg_version.as_deref());
        override_with(&mut intent.template, args.template.as_deref());
        override_with(&mut intent.source, args.source.as_deref());
        override_with(&mut intent.source_dir, args.source_dir.as_deref());
        override_with(&mut intent.my_class, args.my_class.as_deref());
        override_with(&mut intent.config_file_mode, args.config_file_mode.as_deref());

        for (key, value) in &args.options {
            intent.options.insert(key.clone(), value.clone());
        }

        override_with(&mut self.node.fqdn, args.fqdn.as_deref());
        if let Some(dir) = &args.template_dir {
            self.templates.dir = Some(dir.display().to_string());
        }
    }

    /// Template directory, with `~` and variables expanded
    pub fn template_dir(&self) -> Option<PathBuf> {
        self.templates.dir.as_deref().map(paths::expand)
    }
}

fn override_with(target: &mut Option<String>, value: Option<&str>) {
    if let Some(value) = value {
        *target = Some(value.to_string());
    }
}

fn set_flag(target: &mut bool, value: Option<bool>) {
    if let Some(value) = value {
        *target = value;
    }
}
