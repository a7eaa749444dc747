//! Desired-configuration input
//!
//! An [`Intent`] is built once from configuration and flags, then passed by
//! reference to every derivation step. It is never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Names and paths of the managed package, service and files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Module name, used for file titles (`<name>.conf`, `<name>.dir`)
    pub name: String,
    pub package: String,
    pub service: String,
    pub config_file: PathBuf,
    pub config_dir: PathBuf,
}

impl Layout {
    /// Conventional layout for a module: package and service share the
    /// module name, config lives under `/etc/<name>/`
    pub fn for_module(name: &str) -> Self {
        let config_dir = PathBuf::from("/etc").join(name);
        Self {
            name: name.to_string(),
            package: name.to_string(),
            service: name.to_string(),
            config_file: config_dir.join(format!("{name}.conf")),
            config_dir,
        }
    }

    /// Title of the config file resource
    pub fn config_file_title(&self) -> String {
        format!("{}.conf", self.name)
    }

    /// Title of the config directory resource
    pub fn config_dir_title(&self) -> String {
        format!("{}.dir", self.name)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::for_module("adcli")
    }
}

/// The desired configuration of a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intent {
    /// Remove everything (overrides all other state flags)
    pub absent: bool,
    /// Stop the service and disable it at boot
    pub disable: bool,
    /// Disable at boot, leave the running state alone
    pub disableboot: bool,
    /// Report changes without applying them
    pub noop: bool,
    /// Pin the package to a version
    pub version: Option<String>,
    /// Template reference for the config file
    pub template: Option<String>,
    /// Source URI for the config file
    pub source: Option<String>,
    /// Source URI for the config directory
    pub source_dir: Option<String>,
    /// Remove unmanaged files from the config directory
    pub source_dir_purge: bool,
    /// Alternate content provider (`module::name`)
    pub my_class: Option<String>,
    /// Restart the service when configuration changes
    pub service_autorestart: bool,
    /// Never overwrite existing configuration files
    pub audit_only: bool,
    /// Octal mode for managed files
    pub config_file_mode: Option<String>,
    /// Custom template options
    pub options: BTreeMap<String, String>,
    pub layout: Layout,
}

impl Default for Intent {
    fn default() -> Self {
        Self {
            absent: false,
            disable: false,
            disableboot: false,
            noop: false,
            version: None,
            template: None,
            source: None,
            source_dir: None,
            source_dir_purge: false,
            my_class: None,
            service_autorestart: true,
            audit_only: false,
            config_file_mode: None,
            options: BTreeMap::new(),
            layout: Layout::default(),
        }
    }
}

/// Which state branch an intent selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Absent,
    Disable,
    DisableBoot,
    Default,
}

impl Intent {
    /// Intent for a module with default settings
    pub fn for_module(name: &str) -> Self {
        Self {
            layout: Layout::for_module(name),
            ..Self::default()
        }
    }

    /// The state branch, by precedence: absent, disable, disableboot
    pub fn branch(&self) -> Branch {
        if self.absent {
            Branch::Absent
        } else if self.disable {
            Branch::Disable
        } else if self.disableboot {
            Branch::DisableBoot
        } else {
            Branch::Default
        }
    }
}
