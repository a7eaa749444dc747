//! Execution engine - applies a catalog in dependency order
//!
//! One synchronous pass: each resource is probed, diffed and converged
//! before the next one starts. A failure marks every resource that requires
//! the failed one as skipped; independent resources still run. Restarts
//! requested by notify edges run once, at the end of the pass.

use std::collections::{HashMap, HashSet};

use anyhow::{Context as _, Result};

use crate::catalog::Catalog;
use crate::context::{ApplyContext, NoProgress, ProgressCallback, Providers};
use crate::diff::{Change, ResourceDiff};
use crate::error::ApplyError;
use crate::report::{Action, ApplyReport, ReportEntry};
use crate::resource::Resource;
use crate::types::{Ensure, ExecuteOptions};

/// A service restart requested by one or more changed files
#[derive(Debug)]
struct Refresh {
    service: usize,
    triggers: Vec<String>,
    noop: bool,
}

/// Reconcile a catalog with the given options and progress callback
///
/// # Returns
/// The ordered report, or [`ApplyError::Failed`] carrying the partial report
/// if any resource failed.
pub fn execute<P: ProgressCallback>(
    catalog: &Catalog,
    providers: Providers<'_>,
    opts: &ExecuteOptions,
    progress: &mut P,
) -> std::result::Result<ApplyReport, ApplyError> {
    let resources = catalog.resources().as_slice();
    let graph = catalog.graph();

    let mut report = ApplyReport::new(opts.noop);
    // index -> id of the failed requirement
    let mut blocked: HashMap<usize, String> = HashMap::new();
    let mut broken: HashSet<usize> = HashSet::new();
    let mut refreshes: Vec<Refresh> = Vec::new();

    for &index in catalog.order() {
        let resource = &resources[index];
        let id = resource.id();
        progress.on_resource_start(&id, &resource.description());

        if let Some(failed) = blocked.get(&index) {
            log::warn!("Skipping {id}: requirement {failed} failed");
            let entry = ReportEntry::new(&id, Action::Skipped)
                .with_message(format!("requirement {failed} failed"));
            progress.on_resource_complete(&id, &entry.action);
            report.push(entry);
            broken.insert(index);
            continue;
        }

        let ctx = ApplyContext::new(opts.noop || resource.noop, providers);
        let entry = match reconcile(resource, &ctx) {
            Ok(entry) => entry,
            Err(e) => {
                log::error!("{id} failed: {e:#}");
                for dependent in graph.dependents(index) {
                    blocked.entry(dependent).or_insert_with(|| id.clone());
                }
                broken.insert(index);
                ReportEntry::new(&id, Action::Failed).with_message(format!("{e:#}"))
            }
        };

        if matches!(entry.action, Action::Changed | Action::WouldChange) {
            for service_id in catalog.notify_targets(&id) {
                let Some((service, _)) = catalog.find(service_id) else {
                    continue;
                };
                let noop = entry.action == Action::WouldChange;
                match refreshes.iter_mut().find(|r| r.service == service) {
                    Some(refresh) => {
                        refresh.triggers.push(id.clone());
                        refresh.noop &= noop;
                    }
                    None => refreshes.push(Refresh {
                        service,
                        triggers: vec![id.clone()],
                        noop,
                    }),
                }
            }
        }

        progress.on_resource_complete(&id, &entry.action);
        report.push(entry);
    }

    for refresh in refreshes {
        let service = &resources[refresh.service];
        if let Some(entry) = run_refresh(service, &refresh, &broken, providers, opts) {
            progress.on_resource_complete(&entry.resource_id, &entry.action);
            report.push(entry);
        }
    }

    let failed = report.failed();
    if failed.is_empty() {
        Ok(report)
    } else {
        Err(ApplyError::Failed {
            failed,
            report: Box::new(report),
        })
    }
}

/// Reconcile a catalog without progress reporting
pub fn apply(
    catalog: &Catalog,
    providers: Providers<'_>,
    opts: &ExecuteOptions,
) -> std::result::Result<ApplyReport, ApplyError> {
    execute(catalog, providers, opts, &mut NoProgress)
}

/// Converge a single resource
fn reconcile(resource: &Resource, ctx: &ApplyContext) -> Result<ReportEntry> {
    let id = resource.id();
    let diff = ResourceDiff::from_resource(resource, ctx.providers)?;

    let mut entry = if diff.is_in_sync() {
        log::debug!("{id} is in sync ({})", diff.current);
        ReportEntry::new(&id, Action::Unchanged)
    } else if ctx.noop {
        log::info!("{id} would change: {}", describe(&diff.changes));
        ReportEntry::new(&id, Action::WouldChange)
            .with_changes(diff.changes.iter().map(ToString::to_string).collect())
    } else {
        for change in &diff.changes {
            log::info!("{id}: {change}");
            perform(resource, change, ctx)?;
        }
        ReportEntry::new(&id, Action::Changed)
            .with_changes(diff.changes.iter().map(ToString::to_string).collect())
    };

    if !diff.notes.is_empty() {
        entry = entry.with_message(diff.notes.join("; "));
    }
    Ok(entry)
}

/// Carry out one change through the providers
fn perform(resource: &Resource, change: &Change, ctx: &ApplyContext) -> Result<()> {
    let name = resource.name.as_str();
    let providers = ctx.providers;
    let path = || {
        resource
            .path()
            .with_context(|| format!("{} has no path", resource.id()))
    };

    match change {
        Change::InstallPackage { version } => providers.packages.install(name, version.as_deref()),
        Change::RemovePackage => providers.packages.remove(name),
        Change::StartService => providers.services.start(name),
        Change::StopService => providers.services.stop(name),
        Change::EnableService => providers.services.enable(name),
        Change::DisableService => providers.services.disable(name),
        Change::WriteFile { content } => providers.files.write(path()?, content),
        Change::SetMode { mode } => providers.files.set_mode(path()?, *mode),
        Change::RemovePath => providers.files.remove(path()?),
        Change::SyncDir {
            source,
            purge,
            force,
            keep,
        } => providers.files.sync_dir(source, path()?, *purge, *force, keep),
    }
    .with_context(|| format!("Failed to {change} for {}", resource.id()))
}

/// Restart a notified service, or report why it was not
fn run_refresh(
    service: &Resource,
    refresh: &Refresh,
    broken: &HashSet<usize>,
    providers: Providers<'_>,
    opts: &ExecuteOptions,
) -> Option<ReportEntry> {
    let id = service.id();
    let triggered_by = format!("triggered by {}", refresh.triggers.join(", "));

    if broken.contains(&refresh.service) {
        log::warn!("Not restarting {id}: it was not reconciled");
        return Some(
            ReportEntry::new(&id, Action::Skipped)
                .with_message(format!("restart {triggered_by} skipped, service not reconciled")),
        );
    }

    // A stopped service ignores refresh events
    if service.ensure != Ensure::Running {
        log::debug!("Not restarting {id}: ensure is {}", service.ensure);
        return None;
    }

    if opts.noop || service.noop || refresh.noop {
        return Some(
            ReportEntry::new(&id, Action::WouldChange)
                .with_changes(vec!["restart".to_string()])
                .with_message(triggered_by),
        );
    }

    log::info!("Restarting {id} ({triggered_by})");
    Some(match providers.services.restart(&service.name) {
        Ok(()) => ReportEntry::new(&id, Action::Refreshed)
            .with_changes(vec!["restart".to_string()])
            .with_message(triggered_by),
        Err(e) => {
            log::error!("Restart of {id} failed: {e:#}");
            ReportEntry::new(&id, Action::Failed).with_message(format!("restart failed: {e:#}"))
        }
    })
}

fn describe(changes: &[Change]) -> String {
    changes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FileState, ServiceStatus};
    use crate::intent::Intent;
    use crate::template::MemoryTemplates;
    use crate::testing::MemorySystem;

    const CONF: &str = "/etc/adcli/adcli.conf";

    fn store() -> MemoryTemplates {
        MemoryTemplates::new().with_default("fqdn: {{ fqdn }}\n{{ options }}\n")
    }

    fn compile(intent: &Intent) -> Catalog {
        Catalog::compile(intent, "rspec.example42.com", &store()).unwrap()
    }

    fn run(catalog: &Catalog, system: &MemorySystem) -> ApplyReport {
        apply(catalog, system.providers(), &ExecuteOptions::default()).unwrap()
    }

    #[test]
    fn fresh_install_converges() {
        let system = MemorySystem::new();
        let report = run(&compile(&Intent::default()), &system);

        assert_eq!(report.action("Package[adcli]"), Some(&Action::Changed));
        assert_eq!(report.action("Service[adcli]"), Some(&Action::Changed));
        assert_eq!(report.action("File[adcli.conf]"), Some(&Action::Changed));
        assert_eq!(
            system.file_text(CONF).as_deref(),
            Some("fqdn: rspec.example42.com\n\n")
        );
        // file changed after the service started, so it is restarted once
        assert_eq!(
            system.calls(),
            vec![
                "install adcli",
                "start adcli",
                "enable adcli",
                "write /etc/adcli/adcli.conf",
                "restart adcli",
            ]
        );
        assert_eq!(
            report.entry("Service[adcli]").map(|e| &e.action),
            Some(&Action::Refreshed)
        );
    }

    #[test]
    fn second_pass_is_unchanged() {
        let system = MemorySystem::new();
        let intent = Intent {
            version: Some("1.0.42".into()),
            config_file_mode: Some("0640".into()),
            source_dir: Some("file:///srv/adcli".into()),
            source_dir_purge: true,
            ..Intent::default()
        };
        let catalog = compile(&intent);
        run(&catalog, &system);
        let calls_after_first = system.calls().len();

        let report = run(&catalog, &system);
        assert!(report.is_unchanged(), "{report:?}");
        assert_eq!(report.entries.len(), 4);
        assert_eq!(system.calls().len(), calls_after_first);
    }

    #[test]
    fn noop_never_mutates() {
        for global in [false, true] {
            let system = MemorySystem::new();
            let intent = Intent {
                noop: !global,
                ..Intent::default()
            };
            let report = apply(
                &compile(&intent),
                system.providers(),
                &ExecuteOptions { noop: global },
            )
            .unwrap();

            assert!(system.calls().is_empty());
            assert_eq!(report.action("Package[adcli]"), Some(&Action::WouldChange));
            assert_eq!(report.action("File[adcli.conf]"), Some(&Action::WouldChange));
            let refresh = report.entry("Service[adcli]").unwrap();
            assert_eq!(refresh.action, Action::WouldChange);
            assert_eq!(refresh.changes, vec!["restart".to_string()]);
        }
    }

    #[test]
    fn autorestart_disabled_never_restarts() {
        let system = MemorySystem::new();
        let intent = Intent {
            service_autorestart: false,
            ..Intent::default()
        };
        let report = run(&compile(&intent), &system);
        assert!(!system.calls().iter().any(|c| c.starts_with("restart")));
        assert!(!report.entries.iter().any(|e| e.action == Action::Refreshed));
    }

    #[test]
    fn file_drift_restarts_running_service() {
        let system = MemorySystem::new();
        let catalog = compile(&Intent::default());
        run(&catalog, &system);
        system.files.borrow_mut().insert(
            CONF.into(),
            FileState::File {
                content: b"tampered\n".to_vec(),
                mode: Some(0o644),
            },
        );
        system.calls.borrow_mut().clear();

        let report = run(&catalog, &system);
        assert_eq!(report.action("Package[adcli]"), Some(&Action::Unchanged));
        assert_eq!(report.action("File[adcli.conf]"), Some(&Action::Changed));
        assert_eq!(
            system.calls(),
            vec!["write /etc/adcli/adcli.conf", "restart adcli"]
        );
    }

    #[test]
    fn disable_stops_without_restart() {
        let system = MemorySystem::new();
        system.packages.borrow_mut().insert("adcli".into(), "1.0.0".into());
        system.services.borrow_mut().insert(
            "adcli".into(),
            ServiceStatus {
                running: true,
                enabled: true,
            },
        );
        let intent = Intent {
            disable: true,
            ..Intent::default()
        };
        run(&compile(&intent), &system);
        assert_eq!(
            system.calls(),
            vec!["stop adcli", "disable adcli", "write /etc/adcli/adcli.conf"]
        );
    }

    #[test]
    fn disableboot_leaves_running_state_alone() {
        let system = MemorySystem::new();
        system.packages.borrow_mut().insert("adcli".into(), "1.0.0".into());
        system.services.borrow_mut().insert(
            "adcli".into(),
            ServiceStatus {
                running: true,
                enabled: true,
            },
        );
        let intent = Intent {
            disableboot: true,
            ..Intent::default()
        };
        run(&compile(&intent), &system);
        let status = system.services.borrow()["adcli"];
        assert!(status.running);
        assert!(!status.enabled);
        assert!(!system.calls().iter().any(|c| c.starts_with("restart")));
    }

    #[test]
    fn absent_removes_everything() {
        let system = MemorySystem::new();
        let catalog = compile(&Intent::default());
        run(&catalog, &system);
        system.calls.borrow_mut().clear();

        let intent = Intent {
            absent: true,
            ..Intent::default()
        };
        let report = run(&compile(&intent), &system);
        assert_eq!(
            system.calls(),
            vec![
                "remove adcli",
                "stop adcli",
                "disable adcli",
                "rm /etc/adcli/adcli.conf"
            ]
        );
        assert!(report.entries.iter().all(|e| e.action == Action::Changed));
        assert!(system.file_text(CONF).is_none());
    }

    #[test]
    fn package_failure_skips_dependent_chain() {
        let system = MemorySystem::new().fail("install adcli");
        let err = apply(
            &compile(&Intent::default()),
            system.providers(),
            &ExecuteOptions::default(),
        )
        .unwrap_err();

        let report = err.report();
        assert_eq!(report.action("Package[adcli]"), Some(&Action::Failed));
        assert_eq!(report.action("Service[adcli]"), Some(&Action::Skipped));
        assert_eq!(report.action("File[adcli.conf]"), Some(&Action::Skipped));
        assert!(system.calls().is_empty());
        assert!(matches!(err, ApplyError::Failed { ref failed, .. } if failed == &["Package[adcli]"]));
    }

    #[test]
    fn service_failure_does_not_block_independent_file() {
        let system = MemorySystem::new().fail("start adcli");
        let err = apply(
            &compile(&Intent::default()),
            system.providers(),
            &ExecuteOptions::default(),
        )
        .unwrap_err();

        let report = err.report();
        assert_eq!(report.action("Package[adcli]"), Some(&Action::Changed));
        assert_eq!(report.action("Service[adcli]"), Some(&Action::Failed));
        assert_eq!(report.action("File[adcli.conf]"), Some(&Action::Changed));
        // restart of a service that failed to converge is not attempted
        assert!(!system.calls().iter().any(|c| c.starts_with("restart")));
        assert_eq!(
            report.entry("Service[adcli]").map(|e| &e.action),
            Some(&Action::Skipped)
        );
    }

    #[test]
    fn restart_failure_fails_the_pass() {
        let system = MemorySystem::new().fail("restart adcli");
        let err = apply(
            &compile(&Intent::default()),
            system.providers(),
            &ExecuteOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, ApplyError::Failed { ref failed, .. } if failed == &["Service[adcli]"]));
        let report = err.report();
        // the service itself converged; only the trailing restart failed
        assert_eq!(report.action("Service[adcli]"), Some(&Action::Changed));
        assert_eq!(report.action("File[adcli.conf]"), Some(&Action::Changed));
        let restart = report.entry("Service[adcli]").unwrap();
        assert_eq!(restart.action, Action::Failed);
        assert!(restart.message.as_deref().unwrap().starts_with("restart failed"));
    }

    #[test]
    fn probe_failure_is_reported() {
        let system = MemorySystem::new().fail("query adcli");
        let err = apply(
            &compile(&Intent::default()),
            system.providers(),
            &ExecuteOptions::default(),
        )
        .unwrap_err();
        let entry = &err.report().entries[0];
        assert_eq!(entry.action, Action::Failed);
        assert!(entry.message.as_deref().unwrap().contains("query adcli failed"));
    }

    #[test]
    fn source_file_is_fetched() {
        let uri = "https://files.example.com/adcli/spec";
        let system = MemorySystem::new().with_source(uri, "from source\n");
        let intent = Intent {
            source: Some(uri.into()),
            ..Intent::default()
        };
        run(&compile(&intent), &system);
        assert_eq!(system.file_text(CONF).as_deref(), Some("from source\n"));
    }

    #[test]
    fn missing_source_fails_file_only() {
        let system = MemorySystem::new();
        let intent = Intent {
            source: Some("https://files.example.com/missing".into()),
            ..Intent::default()
        };
        let err = apply(&compile(&intent), system.providers(), &ExecuteOptions::default())
            .unwrap_err();
        let report = err.report();
        assert_eq!(report.action("Service[adcli]"), Some(&Action::Changed));
        assert_eq!(report.action("File[adcli.conf]"), Some(&Action::Failed));
    }

    #[test]
    fn audit_only_keeps_existing_file() {
        let system = MemorySystem::new();
        system.files.borrow_mut().insert(
            CONF.into(),
            FileState::File {
                content: b"hand edited\n".to_vec(),
                mode: None,
            },
        );
        let intent = Intent {
            audit_only: true,
            ..Intent::default()
        };
        let report = run(&compile(&intent), &system);
        let entry = report.entry("File[adcli.conf]").unwrap();
        assert_eq!(entry.action, Action::Unchanged);
        assert!(entry.message.as_deref().unwrap().contains("not replaced"));
        assert_eq!(system.file_text(CONF).as_deref(), Some("hand edited\n"));
    }

    #[test]
    fn progress_sees_every_resource() {
        struct Recorder(Vec<String>);
        impl ProgressCallback for Recorder {
            fn on_resource_start(&mut self, id: &str, _description: &str) {
                self.0.push(format!("start {id}"));
            }
            fn on_resource_complete(&mut self, id: &str, action: &Action) {
                self.0.push(format!("{action} {id}"));
            }
        }

        let system = MemorySystem::new();
        let mut recorder = Recorder(Vec::new());
        execute(
            &compile(&Intent::default()),
            system.providers(),
            &ExecuteOptions { noop: true },
            &mut recorder,
        )
        .unwrap();
        assert_eq!(
            recorder.0,
            vec![
                "start Package[adcli]",
                "would-change Package[adcli]",
                "start Service[adcli]",
                "would-change Service[adcli]",
                "start File[adcli.conf]",
                "would-change File[adcli.conf]",
                "would-change Service[adcli]",
            ]
        );
    }
}
