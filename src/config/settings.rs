//! Configuration file parsing for swiftbackup
//!
//! The file is TOML with a `[defaults]` table and one `[targets.<name>]`
//! table per target. Every per-target option falls back to the same option
//! in `[defaults]`, which in turn falls back to a built-in default, so a
//! minimal target only needs its backup entries. Unknown keys anywhere are
//! rejected.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BackupError, BackupResult};
use crate::models::{BackupSpec, RetentionPolicy, Target};

/// Configuration file consulted when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "/etc/swiftbackup.toml";

const DEFAULT_RSYNC_BIN: &str = "/usr/bin/rsync";
const DEFAULT_RSYNC_DEFAULTS: [&str; 5] = [
    "-ax",
    "--delete",
    "--delete-excluded",
    "--numeric-ids",
    "--relative",
];
const DEFAULT_PING_CMD: [&str; 3] = ["/bin/ping", "-w1", "-c1"];
const DEFAULT_LINK_FMT: &str = "%Y-%m-%d.%H%M";
const DEFAULT_BACKUP_DIRECTORY: &str = "/srv/swiftbackup";

/// Raw shape of the whole configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    defaults: Section,
    #[serde(default)]
    targets: BTreeMap<String, Section>,
}

/// Raw shape of `[defaults]` or one `[targets.<name>]` table
///
/// `ping` and `backup` are only meaningful on targets; their presence in
/// `[defaults]` is rejected after parsing, mirroring the per-section key
/// validation the tool has always done.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Section {
    retain_hourly: Option<u32>,
    retain_daily: Option<u32>,
    retain_weekly: Option<u32>,
    retain_monthly: Option<u32>,
    retain_yearly: Option<u32>,
    rsync_bin: Option<String>,
    rsync_defaults: Option<Vec<String>>,
    rsync_options: Option<Vec<String>>,
    rsync_exclude: Option<Vec<String>>,
    ping_cmd: Option<Vec<String>>,
    link_fmt: Option<String>,
    backup_directory: Option<PathBuf>,
    ping: Option<Vec<String>>,
    backup: Option<Vec<BackupEntry>>,
}

/// One `[[targets.<name>.backup]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct BackupEntry {
    src: String,
    #[serde(default)]
    dst: String,
    #[serde(default)]
    options: Vec<String>,
}

/// The fully validated configuration: one [`Target`] per section
#[derive(Debug, Clone, Default)]
pub struct Config {
    targets: BTreeMap<String, Target>,
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> BackupResult<Config> {
        let contents = fs::read_to_string(path).map_err(|e| {
            BackupError::Config(format!("{}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> BackupResult<Config> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| BackupError::Config(e.message().to_string()))?;

        if file.defaults.ping.is_some() {
            return Err(BackupError::Config(
                "in section [defaults]: unknown option 'ping'".into(),
            ));
        }
        if file.defaults.backup.is_some() {
            return Err(BackupError::Config(
                "in section [defaults]: unknown option 'backup'".into(),
            ));
        }

        let mut targets = BTreeMap::new();
        for (name, section) in &file.targets {
            let target = build_target(name, section, &file.defaults)
                .map_err(|e| BackupError::Config(format!("in section [targets.{}]: {}", name, e)))?;
            targets.insert(name.clone(), target);
        }
        Ok(Config { targets })
    }

    /// Look up a target by name
    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    /// All targets, sorted by name
    pub fn all(&self) -> Vec<Target> {
        self.targets.values().cloned().collect()
    }

    /// All configured target names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.targets.keys().map(String::as_str).collect()
    }

    /// True when the file declares no targets
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

fn build_target(name: &str, section: &Section, defaults: &Section) -> BackupResult<Target> {
    if name.contains(std::path::MAIN_SEPARATOR) {
        return Err(BackupError::Config(format!(
            "target name cannot contain path separator: {}",
            name
        )));
    }
    if name.is_empty() || name == "all" {
        return Err(BackupError::Config(format!("not a valid target name: {}", name)));
    }

    let entries = section
        .backup
        .as_ref()
        .ok_or_else(|| BackupError::Config("missing option 'backup'".into()))?;
    let backups = entries
        .iter()
        .map(|e| BackupSpec::new(e.src.clone(), e.dst.clone(), e.options.clone()))
        .collect::<BackupResult<Vec<_>>>()?;

    let builtin = RetentionPolicy::default();
    let retention = RetentionPolicy {
        hourly: pick(&section.retain_hourly, &defaults.retain_hourly, builtin.hourly),
        daily: pick(&section.retain_daily, &defaults.retain_daily, builtin.daily),
        weekly: pick(&section.retain_weekly, &defaults.retain_weekly, builtin.weekly),
        monthly: pick(&section.retain_monthly, &defaults.retain_monthly, builtin.monthly),
        yearly: pick(&section.retain_yearly, &defaults.retain_yearly, builtin.yearly),
    };

    Ok(Target {
        name: name.to_string(),
        retention,
        rsync_bin: pick(&section.rsync_bin, &defaults.rsync_bin, DEFAULT_RSYNC_BIN.into()),
        rsync_defaults: pick(
            &section.rsync_defaults,
            &defaults.rsync_defaults,
            DEFAULT_RSYNC_DEFAULTS.iter().map(|s| s.to_string()).collect(),
        ),
        rsync_options: pick(&section.rsync_options, &defaults.rsync_options, Vec::new()),
        rsync_exclude: pick(&section.rsync_exclude, &defaults.rsync_exclude, Vec::new()),
        ping_cmd: pick(
            &section.ping_cmd,
            &defaults.ping_cmd,
            DEFAULT_PING_CMD.iter().map(|s| s.to_string()).collect(),
        ),
        ping_hosts: section.ping.clone().unwrap_or_default(),
        backups,
        link_fmt: pick(&section.link_fmt, &defaults.link_fmt, DEFAULT_LINK_FMT.into()),
        backup_directory: pick(
            &section.backup_directory,
            &defaults.backup_directory,
            PathBuf::from(DEFAULT_BACKUP_DIRECTORY),
        ),
    })
}

/// Target value, else defaults value, else the built-in
fn pick<T: Clone>(section: &Option<T>, defaults: &Option<T>, builtin: T) -> T {
    section
        .clone()
        .or_else(|| defaults.clone())
        .unwrap_or(builtin)
}

/// The built-in defaults as a commented TOML template, for `write-config`
pub fn default_template() -> String {
    format!(
        r#"# swiftbackup configuration.
#
# Values in [defaults] apply to every target; each [targets.<name>] table
# may override any of them.

[defaults]
retain_hourly = 6
retain_daily = 7
retain_weekly = 4
retain_monthly = 6
retain_yearly = 0
rsync_bin = "{rsync_bin}"
rsync_defaults = ["-ax", "--delete", "--delete-excluded", "--numeric-ids", "--relative"]
rsync_options = []
rsync_exclude = []
ping_cmd = ["/bin/ping", "-w1", "-c1"]
link_fmt = "{link_fmt}"
backup_directory = "{backup_directory}"

# [targets.example]
# retain_daily = 14
# ping = ["example.com"]
#
# [[targets.example.backup]]
# src = "root@example.com:/etc"
# dst = "etc"
# options = ["-H"]
"#,
        rsync_bin = DEFAULT_RSYNC_BIN,
        link_fmt = DEFAULT_LINK_FMT,
        backup_directory = DEFAULT_BACKUP_DIRECTORY,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [defaults]
        retain_hourly = 4
        backup_directory = "/srv/backups"

        [targets.web]
        retain_daily = 14
        ping = ["web.example.com"]

        [[targets.web.backup]]
        src = "root@web.example.com:/etc"
        dst = "etc"
        options = ["-H"]

        [targets.db]
        [[targets.db.backup]]
        src = "/var/lib/db"
    "#;

    #[test]
    fn test_target_options_layer_over_defaults() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let web = config.get("web").unwrap();

        // From [defaults].
        assert_eq!(web.retention.hourly, 4);
        assert_eq!(web.backup_directory, PathBuf::from("/srv/backups"));
        // From the target section.
        assert_eq!(web.retention.daily, 14);
        assert_eq!(web.ping_hosts, vec!["web.example.com"]);
        // Built-in fallback.
        assert_eq!(web.retention.weekly, 4);
        assert_eq!(web.rsync_bin, DEFAULT_RSYNC_BIN);
        assert_eq!(web.link_fmt, DEFAULT_LINK_FMT);
    }

    #[test]
    fn test_backup_entries() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let web = config.get("web").unwrap();
        assert_eq!(web.backups.len(), 1);
        assert_eq!(web.backups[0].source, "root@web.example.com:/etc");
        assert_eq!(web.backups[0].dest, "etc");
        assert_eq!(web.backups[0].options, vec!["-H"]);

        let db = config.get("db").unwrap();
        assert_eq!(db.backups[0].dest, "");
        assert!(db.ping_hosts.is_empty());
    }

    #[test]
    fn test_names_are_sorted() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.names(), vec!["db", "web"]);
    }

    #[test]
    fn test_unknown_option_rejected() {
        let err = Config::from_toml("[defaults]\nretain_minutely = 3\n").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_ping_not_allowed_in_defaults() {
        let err = Config::from_toml("[defaults]\nping = [\"x\"]\n").unwrap_err();
        assert!(err.to_string().contains("unknown option 'ping'"));
    }

    #[test]
    fn test_target_requires_backup() {
        let err = Config::from_toml("[targets.web]\nretain_daily = 1\n").unwrap_err();
        assert!(err.to_string().contains("missing option 'backup'"));
    }

    #[test]
    fn test_reserved_target_name_rejected() {
        let toml = "[targets.all]\n[[targets.all.backup]]\nsrc = \"/etc\"\n";
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("not a valid target name"));
    }

    #[test]
    fn test_path_separator_in_target_name_rejected() {
        let toml = "[targets.\"a/b\"]\n[[targets.\"a/b\".backup]]\nsrc = \"/etc\"\n";
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("path separator"));
    }

    #[test]
    fn test_escaping_destination_rejected() {
        let toml = "[targets.web]\n[[targets.web.backup]]\nsrc = \"/etc\"\ndst = \"../up\"\n";
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("relative path inside the snapshot"));
    }

    #[test]
    fn test_template_parses_back() {
        let config = Config::from_toml(&default_template()).unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::load(Path::new("/nonexistent/swiftbackup.toml")).unwrap_err();
        assert!(err.is_config());
    }
}
