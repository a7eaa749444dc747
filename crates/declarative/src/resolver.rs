//! State resolver - maps intent flags onto per-resource targets
//!
//! | branch      | package            | service   | enable | files   |
//! |-------------|--------------------|-----------|--------|---------|
//! | absent      | absent             | stopped   | false  | absent  |
//! | disable     | version or present | stopped   | false  | present |
//! | disableboot | version or present | unmanaged | false  | present |
//! | default     | version or present | running   | true   | present |
//!
//! `noop` is orthogonal: it flags every resource and changes no ensure value.

use crate::error::{ConfigError, Result};
use crate::intent::{Branch, Intent};
use crate::resource::{Resource, ResourceSet};
use crate::types::{ContentSource, Ensure, parse_mode};

/// Derive the resource set for an intent
///
/// Pure and deterministic: the same intent always yields the same set.
pub fn resolve(intent: &Intent) -> ResourceSet {
    let layout = &intent.layout;
    let version = intent.version.as_deref();

    let (package, service, enable, files) = match intent.branch() {
        Branch::Absent => (Ensure::Absent, Ensure::Stopped, false, Ensure::Absent),
        Branch::Disable => (
            Ensure::installed(version),
            Ensure::Stopped,
            false,
            Ensure::Present,
        ),
        Branch::DisableBoot => (
            Ensure::installed(version),
            Ensure::Unmanaged,
            false,
            Ensure::Present,
        ),
        Branch::Default => (
            Ensure::installed(version),
            Ensure::Running,
            true,
            Ensure::Present,
        ),
    };

    let mode = intent.config_file_mode.as_deref().and_then(parse_mode);

    let mut resources = vec![
        Resource::package(&layout.package, package),
        Resource::service(&layout.service, service, enable),
        Resource::file(
            &layout.config_file_title(),
            &layout.config_file,
            files.clone(),
            config_source(intent),
        ),
    ];

    if let Some(uri) = &intent.source_dir {
        resources.push(Resource::file(
            &layout.config_dir_title(),
            &layout.config_dir,
            files,
            ContentSource::SourceDir {
                uri: uri.clone(),
                purge: intent.source_dir_purge,
            },
        ));
    }

    for resource in &mut resources {
        resource.noop = intent.noop;
        if let Some(spec) = resource.file.as_mut() {
            spec.replace = !intent.audit_only;
            if !matches!(spec.source, ContentSource::SourceDir { .. }) {
                spec.mode = mode;
            }
        }
    }

    log::debug!(
        "Resolved {:?} branch into {} resources",
        intent.branch(),
        resources.len()
    );

    ResourceSet::new(resources)
}

/// Content source for the config file: my_class > source > template > default
pub fn config_source(intent: &Intent) -> ContentSource {
    if let Some(class) = &intent.my_class {
        ContentSource::Class {
            reference: class.replace("::", "/"),
        }
    } else if let Some(uri) = &intent.source {
        ContentSource::Source { uri: uri.clone() }
    } else if let Some(template) = &intent.template {
        ContentSource::Template {
            reference: template.clone(),
        }
    } else {
        ContentSource::Default
    }
}

/// Reject intents whose values cannot be resolved
pub fn validate(intent: &Intent) -> Result<()> {
    if let Some(mode) = &intent.config_file_mode
        && parse_mode(mode).is_none()
    {
        return Err(ConfigError::InvalidMode(mode.clone()));
    }
    Ok(())
}
