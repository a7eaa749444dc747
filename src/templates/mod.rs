//! Templates shipped with the binary

use declarative::{DirTemplates, MemoryTemplates, TemplateStore};
use std::path::PathBuf;

/// Default content of the config file
pub const DEFAULT_TEMPLATE: &str = include_str!("adcli.conf.tmpl");

/// Built-in templates
pub fn builtin() -> MemoryTemplates {
    MemoryTemplates::new().with_default(DEFAULT_TEMPLATE)
}

/// Template store for a run: the template directory if configured, backed
/// by the built-in templates
pub fn store(dir: Option<PathBuf>) -> Box<dyn TemplateStore> {
    match dir {
        Some(dir) => {
            log::debug!("Using template dir: {}", dir.display());
            Box::new(DirTemplates::new(dir, builtin()))
        }
        None => Box::new(builtin()),
    }
}
