//! Package provider - dpkg/apt-get on Debian, rpm/dnf on Red Hat

use crate::runner;
use anyhow::{Result, bail};
use declarative::PackageProvider;

/// A supported package manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    /// dpkg for queries, apt-get for changes
    Apt,
    /// rpm for queries, dnf for changes
    Dnf,
    /// rpm for queries, yum for changes
    Yum,
}

impl PackageManager {
    /// Pick the package manager available on this machine
    pub fn detect() -> Result<Self> {
        if runner::command_exists("apt-get") {
            Ok(Self::Apt)
        } else if runner::command_exists("dnf") {
            Ok(Self::Dnf)
        } else if runner::command_exists("yum") {
            Ok(Self::Yum)
        } else {
            bail!("No supported package manager found (apt-get, dnf or yum)")
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
        }
    }

    /// Package argument for an install, pinned if a version is given
    fn install_spec(self, name: &str, version: Option<&str>) -> String {
        match (self, version) {
            (_, None) => name.to_string(),
            (Self::Apt, Some(v)) => format!("{name}={v}"),
            (Self::Dnf | Self::Yum, Some(v)) => format!("{name}-{v}"),
        }
    }
}

/// Parse `dpkg-query -W -f '${Status}\t${Version}'` output
fn parse_dpkg_status(output: &str) -> Option<String> {
    let (status, version) = output.split_once('\t')?;
    if status.split_whitespace().last() == Some("installed") && !version.is_empty() {
        Some(version.to_string())
    } else {
        None
    }
}

impl PackageProvider for PackageManager {
    fn installed_version(&self, name: &str) -> Result<Option<String>> {
        match self {
            Self::Apt => {
                let (ok, out) = runner::run_status(
                    "dpkg-query",
                    &["-W", "-f", "${Status}\t${Version}", name],
                )?;
                Ok(if ok { parse_dpkg_status(&out) } else { None })
            }
            Self::Dnf | Self::Yum => {
                let (ok, out) =
                    runner::run_status("rpm", &["-q", "--qf", "%{VERSION}-%{RELEASE}", name])?;
                Ok(if ok && !out.is_empty() { Some(out) } else { None })
            }
        }
    }

    fn install(&self, name: &str, version: Option<&str>) -> Result<()> {
        let spec = self.install_spec(name, version);
        log::info!("{} install {spec}", self.name());
        match self {
            Self::Apt => runner::run_checked(
                "apt-get",
                &["install", "-y", "-q", "--allow-downgrades", &spec],
            ),
            Self::Dnf | Self::Yum => runner::run_checked(self.name(), &["install", "-y", &spec]),
        }
    }

    fn remove(&self, name: &str) -> Result<()> {
        log::info!("{} remove {name}", self.name());
        match self {
            Self::Apt => runner::run_checked("apt-get", &["remove", "-y", "-q", name]),
            Self::Dnf | Self::Yum => runner::run_checked(self.name(), &["remove", "-y", name]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_spec() {
        assert_eq!(PackageManager::Apt.install_spec("adcli", None), "adcli");
        assert_eq!(
            PackageManager::Apt.install_spec("adcli", Some("1.0.42")),
            "adcli=1.0.42"
        );
        assert_eq!(
            PackageManager::Dnf.install_spec("adcli", Some("1.0.42")),
            "adcli-1.0.42"
        );
    }

    #[test]
    fn test_parse_dpkg_status() {
        assert_eq!(
            parse_dpkg_status("install ok installed\t0.9.2-1"),
            Some("0.9.2-1".to_string())
        );
        assert_eq!(parse_dpkg_status("deinstall ok config-files\t0.9.2-1"), None);
        assert_eq!(parse_dpkg_status("unknown ok not-installed\t"), None);
        assert_eq!(parse_dpkg_status(""), None);
    }
}
