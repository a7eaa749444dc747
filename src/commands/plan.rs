//! `plan` and `render` - inspect the compiled catalog without probing the machine

use anyhow::{Context as _, Result, bail};
use colored::Colorize;
use declarative::{Catalog, ContentSource, FileContent, FileProvider, FileSpec, ResourceKind};
use serde::Serialize;
use std::io::Write;

use super::{Session, load};
use crate::Context;
use crate::cli::{IntentArgs, OutputFormat, PlanArgs};
use crate::provider::LocalFiles;
use crate::ui;

/// One resource of the plan, in application order
#[derive(Debug, Serialize)]
struct PlanEntry<'a> {
    id: String,
    kind: ResourceKind,
    ensure: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    enable: Option<bool>,
    noop: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a FileSpec>,
    requires: Vec<String>,
    notifies: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Plan<'a> {
    fqdn: &'a str,
    resources: Vec<PlanEntry<'a>>,
}

fn build_plan<'a>(catalog: &'a Catalog, fqdn: &'a str) -> Plan<'a> {
    let resources = catalog.resources().as_slice();
    let entries = catalog
        .order()
        .iter()
        .map(|&index| {
            let resource = &resources[index];
            let id = resource.id();
            PlanEntry {
                ensure: resource.ensure.to_string(),
                enable: resource.enable,
                noop: resource.noop,
                requires: catalog
                    .graph()
                    .requirements(index)
                    .into_iter()
                    .map(|i| resources[i].id())
                    .collect(),
                notifies: catalog.notify_targets(&id).map(str::to_string).collect(),
                id,
                kind: resource.kind,
                file: resource.file.as_ref(),
            }
        })
        .collect();

    Plan {
        fqdn,
        resources: entries,
    }
}

fn describe_source(source: &ContentSource) -> String {
    match source {
        ContentSource::Template { reference } => format!("template {reference}"),
        ContentSource::Class { reference } => format!("class template {reference}"),
        ContentSource::Source { uri } => format!("source {uri}"),
        ContentSource::SourceDir { uri, purge: true } => format!("source dir {uri} (purge)"),
        ContentSource::SourceDir { uri, purge: false } => format!("source dir {uri}"),
        ContentSource::Default => "default template".to_string(),
    }
}

pub fn plan(_ctx: &Context, args: PlanArgs) -> Result<()> {
    let Session { fqdn, catalog, .. } = load(&args.intent)?;
    let plan = build_plan(&catalog, &fqdn);

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    ui::header(&format!("Plan for {fqdn}"));
    for entry in &plan.resources {
        let noop = if entry.noop {
            " [noop]".yellow().to_string()
        } else {
            String::new()
        };
        println!("  {} {}{}", entry.id.bold(), entry.ensure.cyan(), noop);

        if let Some(enable) = entry.enable {
            ui::kv("enable", &enable.to_string());
        }
        if let Some(file) = entry.file {
            ui::kv("path", &file.path.display().to_string());
            ui::kv("content", &describe_source(&file.source));
            if let Some(mode) = file.mode {
                ui::kv("mode", &format!("{mode:04o}"));
            }
            if !file.replace {
                ui::kv("replace", "false (audit only)");
            }
        }
        if !entry.requires.is_empty() {
            ui::kv("requires", &entry.requires.join(", "));
        }
        if !entry.notifies.is_empty() {
            ui::kv("notifies", &entry.notifies.join(", "));
        }
    }

    if catalog.edges().is_empty() {
        println!();
        ui::dim("No service restarts on configuration change");
    }
    Ok(())
}

/// Print the config file as it would be written
pub fn render(_ctx: &Context, args: IntentArgs) -> Result<()> {
    let Session {
        config, catalog, ..
    } = load(&args)?;

    let id = format!("File[{}]", config.intent.layout.config_file_title());
    let Some((_, resource)) = catalog.find(&id) else {
        bail!("{id} is not part of the catalog");
    };

    match resource.content() {
        Some(FileContent::Inline { text }) => {
            print!("{text}");
            std::io::stdout().flush()?;
        }
        Some(FileContent::Source { uri }) => {
            let bytes = LocalFiles::new()
                .fetch(uri)
                .with_context(|| format!("Failed to fetch {uri}"))?;
            std::io::stdout().write_all(&bytes)?;
        }
        Some(FileContent::Directory { source, .. }) => {
            bail!("{id} is synced as a directory from {source}")
        }
        None => bail!("{id} is absent, nothing to render"),
    }
    Ok(())
}
