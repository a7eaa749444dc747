//! Template renderer - produces file content from a content source
//!
//! Templates use `{{ name }}` placeholders:
//! - `{{ fqdn }}` - the node's fully qualified domain name
//! - `{{ options.<key> }}` - a single custom option
//! - `{{ options }}` - every option as a `key: value` line, sorted by key
//!
//! Source-backed files are not rendered here; they keep their URI and the
//! file-delivery collaborator fetches the bytes at apply time.

use crate::error::{ConfigError, Result};
use crate::types::{ContentSource, FileContent};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^\s{}]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Extension tried when a class reference has no exact match
pub const TEMPLATE_EXTENSION: &str = "tmpl";

/// Bindings available to a template
///
/// Created fresh for each compilation and dropped once rendering is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    pub fqdn: String,
    pub options: BTreeMap<String, String>,
}

impl TemplateContext {
    pub fn new(fqdn: &str, options: &BTreeMap<String, String>) -> Self {
        Self {
            fqdn: fqdn.to_string(),
            options: options.clone(),
        }
    }

    fn lookup(&self, variable: &str) -> Option<String> {
        if variable == "fqdn" {
            return Some(self.fqdn.clone());
        }
        if variable == "options" {
            let mut out = String::new();
            for (key, value) in &self.options {
                let _ = writeln!(out, "{key}: {value}");
            }
            return Some(out.trim_end_matches('\n').to_string());
        }
        variable
            .strip_prefix("options.")
            .and_then(|key| self.options.get(key).cloned())
    }
}

/// Lookup of templates by reference
pub trait TemplateStore {
    /// Load a template, `Ok(None)` if the reference does not exist
    fn load(&self, reference: &str) -> io::Result<Option<String>>;

    /// The built-in default template
    fn default_template(&self) -> Option<String>;
}

/// In-memory template store
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplates {
    templates: BTreeMap<String, String>,
    default: Option<String>,
}

impl MemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template under a reference
    pub fn with(mut self, reference: &str, text: &str) -> Self {
        self.templates.insert(reference.to_string(), text.to_string());
        self
    }

    /// Set the default template
    pub fn with_default(mut self, text: &str) -> Self {
        self.default = Some(text.to_string());
        self
    }
}

impl TemplateStore for MemoryTemplates {
    fn load(&self, reference: &str) -> io::Result<Option<String>> {
        Ok(self.templates.get(reference).cloned())
    }

    fn default_template(&self) -> Option<String> {
        self.default.clone()
    }
}

/// Templates read from a directory, falling back to an in-memory store
#[derive(Debug, Clone)]
pub struct DirTemplates {
    root: PathBuf,
    fallback: MemoryTemplates,
}

impl DirTemplates {
    pub fn new(root: impl AsRef<Path>, fallback: MemoryTemplates) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            fallback,
        }
    }
}

impl TemplateStore for DirTemplates {
    fn load(&self, reference: &str) -> io::Result<Option<String>> {
        // References are relative; refuse anything that climbs out of root
        let relative = Path::new(reference);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Ok(None);
        }

        let path = self.root.join(relative);
        match fs::read_to_string(&path) {
            Ok(text) => {
                log::debug!("Loaded template {} from {}", reference, path.display());
                Ok(Some(text))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.fallback.load(reference),
            Err(e) => Err(e),
        }
    }

    fn default_template(&self) -> Option<String> {
        self.fallback.default_template()
    }
}

/// Render a content source into file content
pub fn render(
    source: &ContentSource,
    ctx: &TemplateContext,
    store: &dyn TemplateStore,
) -> Result<FileContent> {
    match source {
        ContentSource::Source { uri } => Ok(FileContent::Source { uri: uri.clone() }),
        ContentSource::SourceDir { uri, purge } => Ok(FileContent::Directory {
            source: uri.clone(),
            purge: *purge,
            // purging is a destructive sync, so it always forces
            force: *purge,
            keep: Vec::new(),
        }),
        ContentSource::Template { reference } => {
            let text = load(store, reference)?
                .ok_or_else(|| ConfigError::TemplateNotFound(reference.clone()))?;
            Ok(FileContent::Inline {
                text: render_str(reference, &text, ctx)?,
            })
        }
        ContentSource::Class { reference } => {
            let with_ext = format!("{reference}.{TEMPLATE_EXTENSION}");
            let text = match load(store, reference)? {
                Some(text) => text,
                None => load(store, &with_ext)?
                    .ok_or_else(|| ConfigError::TemplateNotFound(reference.clone()))?,
            };
            Ok(FileContent::Inline {
                text: render_str(reference, &text, ctx)?,
            })
        }
        ContentSource::Default => {
            let text = store
                .default_template()
                .ok_or_else(|| ConfigError::TemplateNotFound("<default>".to_string()))?;
            Ok(FileContent::Inline {
                text: render_str("<default>", &text, ctx)?,
            })
        }
    }
}

fn load(store: &dyn TemplateStore, reference: &str) -> Result<Option<String>> {
    store
        .load(reference)
        .map_err(|source| ConfigError::TemplateLoad {
            reference: reference.to_string(),
            source,
        })
}

/// Substitute placeholders in template text
pub fn render_str(name: &str, text: &str, ctx: &TemplateContext) -> Result<String> {
    let mut unknown = None;
    let rendered = PLACEHOLDER.replace_all(text, |caps: &Captures| {
        let variable = &caps[1];
        ctx.lookup(variable).unwrap_or_else(|| {
            unknown.get_or_insert_with(|| variable.to_string());
            String::new()
        })
    });

    match unknown {
        Some(variable) => Err(ConfigError::UnknownVariable {
            template: name.to_string(),
            variable,
        }),
        None => Ok(rendered.into_owned()),
    }
}
