//! CLI integration tests using the real adclictl binary
//!
//! Only commands that never touch the package manager or init system are
//! exercised here: `plan`, `render`, `report` and `completions`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const FQDN: &str = "rspec.example.com";

/// An isolated environment: empty config and state directories
struct Env {
    config: TempDir,
    state: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            config: TempDir::new().unwrap(),
            state: TempDir::new().unwrap(),
        }
    }

    #[allow(deprecated)]
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("adclictl").unwrap();
        cmd.env("ADCLICTL_CONFIG_DIR", self.config.path())
            .env("ADCLICTL_STATE_DIR", self.state.path())
            .env_remove("ADCLICTL_CONFIG")
            .env("NO_COLOR", "1");
        cmd
    }

    fn plan_json(&self, args: &[&str]) -> serde_json::Value {
        let output = self
            .cmd()
            .args(["plan", "--fqdn", FQDN, "--format", "json"])
            .args(args)
            .output()
            .unwrap();
        assert!(output.status.success(), "plan failed: {output:?}");
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

fn resource<'a>(plan: &'a serde_json::Value, id: &str) -> &'a serde_json::Value {
    plan["resources"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == id)
        .unwrap_or_else(|| panic!("{id} not in plan"))
}

#[test]
fn test_help_output() {
    Env::new()
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("report"));
}

#[test]
fn test_plan_defaults() {
    let plan = Env::new().plan_json(&[]);

    assert_eq!(resource(&plan, "Package[adcli]")["ensure"], "present");
    assert_eq!(resource(&plan, "Service[adcli]")["ensure"], "running");
    assert_eq!(resource(&plan, "Service[adcli]")["enable"], true);

    let file = resource(&plan, "File[adcli.conf]");
    assert_eq!(file["ensure"], "present");
    assert_eq!(file["file"]["path"], "/etc/adcli/adcli.conf");
    assert_eq!(file["notifies"][0], "Service[adcli]");
}

#[test]
fn test_plan_absent() {
    let plan = Env::new().plan_json(&["--absent"]);

    assert_eq!(resource(&plan, "Package[adcli]")["ensure"], "absent");
    assert_eq!(resource(&plan, "Service[adcli]")["ensure"], "stopped");
    assert_eq!(resource(&plan, "Service[adcli]")["enable"], false);
    assert_eq!(resource(&plan, "File[adcli.conf]")["ensure"], "absent");
}

#[test]
fn test_plan_disableboot_leaves_service_unmanaged() {
    let plan = Env::new().plan_json(&["--disableboot"]);

    let service = resource(&plan, "Service[adcli]");
    assert_eq!(service["ensure"], "unmanaged");
    assert_eq!(service["enable"], false);
}

#[test]
fn test_plan_version_and_noop() {
    let plan = Env::new().plan_json(&["--version", "1.0.42", "--noop"]);

    assert_eq!(resource(&plan, "Package[adcli]")["ensure"], "1.0.42");
    for r in plan["resources"].as_array().unwrap() {
        assert_eq!(r["noop"], true, "{} should be noop", r["id"]);
    }
}

#[test]
fn test_plan_without_autorestart_has_no_notify() {
    let plan = Env::new().plan_json(&["--service-autorestart", "false"]);
    assert!(
        resource(&plan, "File[adcli.conf]")["notifies"]
            .as_array()
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_plan_source_dir_with_purge() {
    let plan = Env::new().plan_json(&[
        "--source-dir",
        "file:///srv/adcli/conf",
        "--source-dir-purge",
    ]);

    let dir = resource(&plan, "File[adcli.dir]");
    assert_eq!(dir["file"]["path"], "/etc/adcli");
    let content = &dir["file"]["content"];
    assert_eq!(content["source"], "file:///srv/adcli/conf");
    assert_eq!(content["purge"], true);
    assert_eq!(content["force"], true);
    // the managed config file survives the purge
    assert_eq!(content["keep"][0], "adcli.conf");
}

#[test]
fn test_plan_text_output() {
    Env::new()
        .cmd()
        .args(["plan", "--fqdn", FQDN])
        .assert()
        .success()
        .stdout(predicate::str::contains("Service[adcli]"))
        .stdout(predicate::str::contains("default template"))
        .stdout(predicate::str::contains("notifies"));
}

#[test]
fn test_plan_reads_config_file() {
    let env = Env::new();
    fs::write(
        env.config.path().join("config.toml"),
        "version = \"1.0.42\"\nservice_autorestart = false\n\n[node]\nfqdn = \"from.config\"\n",
    )
    .unwrap();

    let output = env
        .cmd()
        .args(["plan", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(plan["fqdn"], "from.config");
    assert_eq!(resource(&plan, "Package[adcli]")["ensure"], "1.0.42");
}

#[test]
fn test_flag_turns_off_config_file_value() {
    let env = Env::new();
    fs::write(env.config.path().join("config.toml"), "absent = true\n").unwrap();

    let output = env
        .cmd()
        .args(["plan", "--fqdn", FQDN, "--format", "json", "--no-absent"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(resource(&plan, "Package[adcli]")["ensure"], "present");
    assert_eq!(resource(&plan, "Service[adcli]")["ensure"], "running");
}

#[test]
fn test_render_default_template_with_options() {
    Env::new()
        .cmd()
        .args(["render", "--fqdn", FQDN, "--option", "opt_a=value_a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fqdn: rspec.example.com"))
        .stdout(predicate::str::contains("value_a"));
}

#[test]
fn test_render_my_class() {
    let env = Env::new();
    let templates = TempDir::new().unwrap();
    fs::create_dir_all(templates.path().join("adcli")).unwrap();
    fs::write(
        templates.path().join("adcli/spec.tmpl"),
        "# spec\nfqdn: {{ fqdn }}\nopt_a: {{ options.opt_a }}\n",
    )
    .unwrap();

    env.cmd()
        .args(["render", "--fqdn", FQDN, "--my-class", "adcli::spec", "-o", "opt_a=value_a"])
        .arg("--template-dir")
        .arg(templates.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("fqdn: rspec.example.com"))
        .stdout(predicate::str::contains("opt_a: value_a"));
}

#[test]
fn test_render_source_file() {
    let env = Env::new();
    let source = env.config.path().join("adcli.conf.src");
    fs::write(&source, "from a source file\n").unwrap();

    env.cmd()
        .args(["render", "--fqdn", FQDN, "--source"])
        .arg(format!("file://{}", source.display()))
        .assert()
        .success()
        .stdout("from a source file\n");
}

#[test]
fn test_render_missing_template_fails() {
    Env::new()
        .cmd()
        .args(["render", "--fqdn", FQDN, "--template", "adcli/missing.conf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("template not found"));
}

#[test]
fn test_render_absent_fails() {
    Env::new()
        .cmd()
        .args(["render", "--fqdn", FQDN, "--absent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent"));
}

#[test]
fn test_invalid_mode_fails_before_apply() {
    Env::new()
        .cmd()
        .args(["plan", "--fqdn", FQDN, "--config-file-mode", "rw-r--r--"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid file mode"));
}

#[test]
fn test_report_without_runs() {
    Env::new()
        .cmd()
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("No apply has been recorded yet"));
}

#[test]
fn test_report_shows_last_run() {
    let env = Env::new();
    fs::write(
        env.state.path().join("last_run.json"),
        r#"{
  "finished_at": "2026-10-19T10:00:00Z",
  "fqdn": "rspec.example.com",
  "success": true,
  "report": {
    "noop": false,
    "entries": [
      { "resource_id": "Package[adcli]", "action": "changed", "changes": ["install"] },
      { "resource_id": "Service[adcli]", "action": "refreshed" }
    ]
  }
}"#,
    )
    .unwrap();

    env.cmd()
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("rspec.example.com"))
        .stdout(predicate::str::contains("Package[adcli]"))
        .stdout(predicate::str::contains("refreshed"));
}

#[test]
fn test_completions() {
    Env::new()
        .cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("adclictl"));
}
