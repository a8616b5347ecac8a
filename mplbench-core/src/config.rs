//! Configuration loading from mplbench.toml
//!
//! Every top-level table of the config file is one section. The section name
//! declares one or more targets (comma separated, each optionally labelled
//! with a bracketed suffix) and its keys are either runner options, which are
//! typed and validated here, or extraneous keys, which are passed through to
//! the target untouched.
//!
//! ```toml
//! [DEFAULT]
//! ycsb_path = "/opt/ycsb/bin/ycsb"
//!
//! ["mysql[primary], mysql[replica]"]
//! workload_path = "workloads/workloada"
//! max_mpl = 16
//! recordcount = 100000
//! ```

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Name of the table whose keys apply to every section
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Target kinds the runner knows how to drive (matched case-insensitively)
pub const SUPPORTED_TARGETS: &[&str] = &[
    "mysql",
    "postgresql",
    "mongodb",
    "cassandra",
    "redis",
    "voltdb",
    "tokumx",
    "hbase",
];

static LABEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]").unwrap_or_else(|e| panic!("invalid label pattern: {e}"))
});

/// Errors from loading or processing the runner configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Runner config file '{0}' does not exist")]
    NotFound(PathBuf),

    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Top-level key '{0}' is not a section")]
    NotASection(String),

    #[error("[{section}] {key}: only strings, numbers and booleans are supported")]
    UnsupportedValue { section: String, key: String },

    #[error("[{section}] missing required option '{key}'")]
    MissingOption { section: String, key: String },

    #[error("[{section}] {key}: '{value}' is not an integer")]
    InvalidInteger {
        section: String,
        key: String,
        value: String,
    },

    #[error("[{section}] {key}: '{value}' is not a boolean")]
    InvalidBoolean {
        section: String,
        key: String,
        value: String,
    },

    #[error("[{section}] {key}: invalid value '{value}': {message}")]
    InvalidCustom {
        section: String,
        key: String,
        value: String,
        message: String,
    },

    #[error("[{section}] invalid sweep: {message}")]
    InvalidSweep { section: String, message: String },

    #[error("[{section}] label '{label}' must not contain path separators or '..'")]
    InvalidLabel { section: String, label: String },
}

/// A typed option value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    /// Parsed integer
    Integer(i64),
    /// Parsed boolean
    Boolean(bool),
    /// Raw string
    String(String),
    /// Filesystem path
    Path(PathBuf),
}

/// How a recognized option's raw string is turned into a [`ConfigValue`]
#[derive(Debug, Clone, Copy)]
pub enum OptionKind {
    /// Decimal integer
    Integer,
    /// `1/yes/true/on` or `0/no/false/off`, case-insensitive
    Boolean,
    /// Taken as-is
    String,
    /// Custom coercion; the error string explains the rejection
    Custom(fn(&str) -> Result<ConfigValue, String>),
}

/// A recognized runner option
#[derive(Debug, Clone, Copy)]
pub struct OptionDef {
    /// Key in the config section
    pub key: &'static str,
    /// Declared type
    pub kind: OptionKind,
    /// Value used when neither the section nor `[DEFAULT]` sets the key
    pub default: Option<&'static str>,
}

/// Expand a leading `~` to the home directory.
fn expand_path(raw: &str) -> Result<ConfigValue, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("path is empty".to_string());
    }
    let path = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            let home = std::env::var_os("HOME").ok_or("HOME is not set")?;
            let mut path = PathBuf::from(home);
            let rest = rest.trim_start_matches('/');
            if !rest.is_empty() {
                path.push(rest);
            }
            path
        }
        _ => PathBuf::from(raw),
    };
    Ok(ConfigValue::Path(path))
}

/// The fixed table of recognized runner options
pub const OPTION_TABLE: &[OptionDef] = &[
    OptionDef {
        key: "trials",
        kind: OptionKind::Integer,
        default: Some("1"),
    },
    OptionDef {
        key: "min_mpl",
        kind: OptionKind::Integer,
        default: Some("1"),
    },
    OptionDef {
        key: "max_mpl",
        kind: OptionKind::Integer,
        default: Some("1"),
    },
    OptionDef {
        key: "inc_mpl",
        kind: OptionKind::Integer,
        default: Some("1"),
    },
    OptionDef {
        key: "clean_data",
        kind: OptionKind::Boolean,
        default: Some("false"),
    },
    OptionDef {
        key: "ycsb_path",
        kind: OptionKind::Custom(expand_path),
        default: Some("ycsb"),
    },
    OptionDef {
        key: "workload_path",
        kind: OptionKind::Custom(expand_path),
        default: None,
    },
    OptionDef {
        key: "output_dir",
        kind: OptionKind::Custom(expand_path),
        default: Some("output"),
    },
    OptionDef {
        key: "clean_command",
        kind: OptionKind::String,
        default: Some(""),
    },
];

/// Recognized option keys are matched case-insensitively; other keys keep their case.
fn canonical_key(key: &str) -> String {
    OPTION_TABLE
        .iter()
        .find(|def| def.key.eq_ignore_ascii_case(key))
        .map_or_else(|| key.to_string(), |def| def.key.to_string())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// Typed values for every recognized option
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedConfig {
    values: BTreeMap<&'static str, ConfigValue>,
}

impl TypedConfig {
    /// Raw typed value of an option
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    /// Integer option value
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean option value
    pub fn boolean(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            ConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// String option value
    pub fn string(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Path option value
    pub fn path(&self, key: &str) -> Option<&Path> {
        match self.get(key)? {
            ConfigValue::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Option keys present, in table order
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    /// Build from a raw section, applying table defaults.
    ///
    /// Any missing or malformed option fails the whole section.
    pub fn from_section(section: &RawSection) -> Result<Self, ConfigError> {
        let mut values = BTreeMap::new();

        for def in OPTION_TABLE {
            let raw = section
                .values
                .get(def.key)
                .map(String::as_str)
                .or(def.default)
                .ok_or_else(|| ConfigError::MissingOption {
                    section: section.name.clone(),
                    key: def.key.to_string(),
                })?;

            let value = match def.kind {
                OptionKind::Integer => {
                    raw.trim()
                        .parse()
                        .map(ConfigValue::Integer)
                        .map_err(|_| ConfigError::InvalidInteger {
                            section: section.name.clone(),
                            key: def.key.to_string(),
                            value: raw.to_string(),
                        })?
                }
                OptionKind::Boolean => {
                    parse_bool(raw)
                        .map(ConfigValue::Boolean)
                        .ok_or_else(|| ConfigError::InvalidBoolean {
                            section: section.name.clone(),
                            key: def.key.to_string(),
                            value: raw.to_string(),
                        })?
                }
                OptionKind::String => ConfigValue::String(raw.to_string()),
                OptionKind::Custom(coerce) => {
                    coerce(raw).map_err(|message| ConfigError::InvalidCustom {
                        section: section.name.clone(),
                        key: def.key.to_string(),
                        value: raw.to_string(),
                        message,
                    })?
                }
            };

            values.insert(def.key, value);
        }

        Ok(Self { values })
    }
}

/// Sweep bounds and flags shared by every target of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSettings {
    /// Number of trials (1-based, inclusive)
    pub trials: u32,
    /// First MPL value
    pub min_mpl: u32,
    /// Largest MPL value executed
    pub max_mpl: u32,
    /// MPL step, at least 1
    pub inc_mpl: u32,
    /// Clean and reload the data store before every MPL step
    pub clean_data: bool,
}

impl SweepSettings {
    /// Extract and validate the sweep options of a typed config
    pub fn from_config(section: &str, config: &TypedConfig) -> Result<Self, ConfigError> {
        let bounded = |key: &str, min: i64| -> Result<u32, ConfigError> {
            let value = config.integer(key).ok_or_else(|| ConfigError::MissingOption {
                section: section.to_string(),
                key: key.to_string(),
            })?;
            if value < min {
                return Err(ConfigError::InvalidSweep {
                    section: section.to_string(),
                    message: format!("{} must be at least {}, got {}", key, min, value),
                });
            }
            u32::try_from(value).map_err(|_| ConfigError::InvalidSweep {
                section: section.to_string(),
                message: format!("{} is too large: {}", key, value),
            })
        };

        Ok(Self {
            trials: bounded("trials", 1)?,
            min_mpl: bounded("min_mpl", 0)?,
            max_mpl: bounded("max_mpl", 0)?,
            // A non-positive step would never leave the sweep
            inc_mpl: bounded("inc_mpl", 1)?,
            clean_data: config.boolean("clean_data").unwrap_or(false),
        })
    }
}

/// One target declared by a config section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    /// Target kind with the label stripped, as written in the config
    pub name: String,
    /// Instance label, empty when unlabelled
    pub label: String,
    /// Typed runner options
    pub config: TypedConfig,
    /// Validated sweep settings
    pub sweep: SweepSettings,
    /// Section keys that are not runner options, uninterpreted
    pub extraneous: BTreeMap<String, String>,
}

impl TargetSpec {
    /// `name`, or `name-label` when labelled; used in output file names
    pub fn tag(&self) -> String {
        if self.label.is_empty() {
            self.name.clone()
        } else {
            format!("{}-{}", self.name, self.label)
        }
    }
}

/// A config section as read from the file: its identifier and string values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSection {
    /// Section identifier, possibly listing several targets
    pub name: String,
    /// Flat key/value pairs, `[DEFAULT]` keys merged in
    pub values: BTreeMap<String, String>,
}

impl RawSection {
    /// Create a section from key/value pairs; option keys are normalized to
    /// lowercase
    pub fn new<K, V>(name: impl Into<String>, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            values: values
                .into_iter()
                .map(|(k, v)| {
                    let key: String = k.into();
                    (canonical_key(&key), v.into())
                })
                .collect(),
        }
    }

    /// Keys that are not recognized runner options
    pub fn extraneous(&self) -> BTreeMap<String, String> {
        let option_keys: BTreeSet<&str> = OPTION_TABLE.iter().map(|def| def.key).collect();
        self.values
            .iter()
            .filter(|(key, _)| !option_keys.contains(key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Split a target name into its bare kind and its label.
///
/// `"mysql[replica]"` → `("mysql", "replica")`; a name without a label
/// marker yields an empty label.
pub fn extract_label(name: &str) -> (String, String) {
    match LABEL_PATTERN.captures(name) {
        Some(caps) => {
            let label = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let bare = LABEL_PATTERN.replace_all(name, "");
            (bare.trim().to_string(), label.to_string())
        }
        None => (name.to_string(), String::new()),
    }
}

/// Labels end up in output file names
fn is_safe_label(label: &str) -> bool {
    !label.contains(['/', '\\']) && !label.contains("..")
}

fn is_supported(name: &str) -> bool {
    let lower = name.to_lowercase();
    SUPPORTED_TARGETS.contains(&lower.as_str())
}

/// Turn one raw section into its targets.
///
/// Every supported name in the section identifier yields one [`TargetSpec`];
/// all of them share the section's typed options and extraneous keys.
/// Unsupported names are skipped with a warning. A missing or malformed
/// option, or a label that could escape the output directory, fails the
/// whole section.
pub fn process_section(section: &RawSection) -> Result<Vec<TargetSpec>, ConfigError> {
    let config = TypedConfig::from_section(section)?;
    let sweep = SweepSettings::from_config(&section.name, &config)?;
    let extraneous = section.extraneous();

    let mut targets = Vec::new();
    for name in section.name.split(',').map(str::trim) {
        let (name, label) = extract_label(name);
        if !is_supported(&name) {
            tracing::warn!(
                "Invalid database found: {}. Only ({}) are supported. Skipping...",
                name,
                SUPPORTED_TARGETS.join(",")
            );
            continue;
        }
        if !is_safe_label(&label) {
            return Err(ConfigError::InvalidLabel {
                section: section.name.clone(),
                label,
            });
        }
        tracing::debug!(target_name = %name, label = %label, "configured target");
        targets.push(TargetSpec {
            name,
            label,
            config: config.clone(),
            sweep,
            extraneous: extraneous.clone(),
        });
    }

    Ok(targets)
}

/// Process every section in order, stopping at the first error
pub fn process_sections(sections: &[RawSection]) -> Result<Vec<TargetSpec>, ConfigError> {
    let mut targets = Vec::new();
    for section in sections {
        targets.extend(process_section(section)?);
    }
    Ok(targets)
}

/// The raw sections of a runner config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerConfigFile {
    /// Sections in file order
    pub sections: Vec<RawSection>,
}

impl RunnerConfigFile {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(content)?;

        let defaults = match table.get(DEFAULT_SECTION) {
            Some(toml::Value::Table(defaults)) => flatten_table(DEFAULT_SECTION, defaults)?,
            Some(_) => return Err(ConfigError::NotASection(DEFAULT_SECTION.to_string())),
            None => BTreeMap::new(),
        };

        let mut sections = Vec::new();
        for (name, value) in &table {
            if name == DEFAULT_SECTION {
                continue;
            }
            let toml::Value::Table(entries) = value else {
                return Err(ConfigError::NotASection(name.clone()));
            };
            let mut values = defaults.clone();
            values.extend(flatten_table(name, entries)?);
            sections.push(RawSection {
                name: name.clone(),
                values,
            });
        }

        Ok(Self { sections })
    }

    /// Process all sections into targets
    pub fn targets(&self) -> Result<Vec<TargetSpec>, ConfigError> {
        process_sections(&self.sections)
    }

    /// Generate a starter configuration as TOML string
    pub fn default_toml() -> String {
        r#"# mplbench configuration
#
# Each table is one benchmark section. A section name may declare several
# targets separated by commas, and a bracketed suffix labels an instance:
#   ["mysql[primary], mysql[replica]"]
# Keys that are not runner options are written into the generated workload.

[DEFAULT]
# YCSB launcher
ycsb_path = "ycsb"
# Directory for logs, generated workloads and statistics
output_dir = "output"

["mysql[local]"]
# Base workload file (Java properties)
workload_path = "workloads/workloada"
# Repetitions of the full MPL sweep
trials = 3
# MPL sweep: min_mpl, min_mpl + inc_mpl, ... up to max_mpl
min_mpl = 1
max_mpl = 16
inc_mpl = 4
# Clean and reload the data before every MPL step
clean_data = true
# Command that empties the data store (uncomment to enable)
# clean_command = "scripts/reset-mysql.sh"

# Workload properties
recordcount = 100000
operationcount = 100000
"db.url" = "jdbc:mysql://localhost:3306/ycsb"
"#
        .to_string()
    }
}

fn flatten_table(
    section: &str,
    table: &toml::Table,
) -> Result<BTreeMap<String, String>, ConfigError> {
    table
        .iter()
        .map(|(key, value)| {
            let raw = match value {
                toml::Value::String(s) => s.clone(),
                toml::Value::Integer(i) => i.to_string(),
                // Debug keeps the fraction, so `4.0` is not accepted as an integer
                toml::Value::Float(f) => format!("{:?}", f),
                toml::Value::Boolean(b) => b.to_string(),
                _ => {
                    return Err(ConfigError::UnsupportedValue {
                        section: section.to_string(),
                        key: key.clone(),
                    });
                }
            };
            Ok((canonical_key(key), raw))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str, pairs: &[(&str, &str)]) -> RawSection {
        RawSection::new(name, pairs.iter().copied())
    }

    fn minimal(name: &str) -> RawSection {
        section(name, &[("workload_path", "workloads/workloada")])
    }

    #[test]
    fn test_extract_label() {
        assert_eq!(
            extract_label("mysql[replica]"),
            ("mysql".to_string(), "replica".to_string())
        );
        assert_eq!(extract_label("mysql"), ("mysql".to_string(), String::new()));
        assert_eq!(extract_label("redis[]"), ("redis".to_string(), String::new()));
    }

    #[test]
    fn test_label_extraction_is_idempotent() {
        for name in ["mysql[a]", "cassandra[node 1]", "mongodb", "voltdb[x][y]"] {
            let (bare, _) = extract_label(name);
            assert!(!bare.contains('['), "{bare}");
            let (again, label) = extract_label(&bare);
            assert_eq!(again, bare);
            assert!(label.is_empty());
        }
    }

    #[test]
    fn test_defaults_applied() {
        let targets = process_section(&minimal("mysql")).unwrap();
        assert_eq!(targets.len(), 1);
        let t = &targets[0];
        assert_eq!(t.name, "mysql");
        assert_eq!(t.label, "");
        assert_eq!(
            t.sweep,
            SweepSettings {
                trials: 1,
                min_mpl: 1,
                max_mpl: 1,
                inc_mpl: 1,
                clean_data: false,
            }
        );
        assert_eq!(t.config.path("ycsb_path"), Some(Path::new("ycsb")));
        assert_eq!(t.config.string("clean_command"), Some(""));
        assert!(t.extraneous.is_empty());
    }

    #[test]
    fn test_multi_target_section_shares_config() {
        let raw = section(
            "mysql[primary], mysql[replica], postgresql",
            &[
                ("workload_path", "w"),
                ("max_mpl", "8"),
                ("clean_data", "yes"),
                ("recordcount", "1000"),
            ],
        );
        let targets = process_section(&raw).unwrap();
        assert_eq!(targets.len(), 3);

        let labels: Vec<_> = targets.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["primary", "replica", ""]);
        assert_eq!(targets[2].name, "postgresql");

        for t in &targets {
            assert_eq!(t.config, targets[0].config);
            assert_eq!(t.extraneous, targets[0].extraneous);
            assert_eq!(t.sweep.max_mpl, 8);
            assert!(t.sweep.clean_data);
        }
    }

    #[test]
    fn test_unsupported_names_skipped() {
        let raw = section("MySQL, sqlite, , redis[cache]", &[("workload_path", "w")]);
        let targets = process_section(&raw).unwrap();
        let names: Vec<_> = targets.iter().map(|t| t.name.as_str()).collect();
        // Case is preserved in the display name
        assert_eq!(names, vec!["MySQL", "redis"]);
    }

    #[test]
    fn test_extraneous_is_raw_minus_recognized() {
        let raw = section(
            "mongodb",
            &[
                ("workload_path", "w"),
                ("trials", "2"),
                ("recordcount", "1000"),
                ("db.url", "mongodb://localhost"),
            ],
        );
        let targets = process_section(&raw).unwrap();
        let keys: Vec<_> = targets[0].extraneous.keys().cloned().collect();
        assert_eq!(keys, vec!["db.url".to_string(), "recordcount".to_string()]);
        for def in OPTION_TABLE {
            assert!(!targets[0].extraneous.contains_key(def.key));
        }
        assert_eq!(targets[0].extraneous["db.url"], "mongodb://localhost");
    }

    #[test]
    fn test_missing_required_option_is_fatal() {
        let raw = section("mysql, redis", &[("trials", "2")]);
        let err = process_section(&raw).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingOption { ref key, .. } if key == "workload_path"
        ));
    }

    #[test]
    fn test_malformed_integer_is_fatal() {
        let raw = section("mysql", &[("workload_path", "w"), ("max_mpl", "lots")]);
        let err = process_section(&raw).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInteger { ref value, .. } if value == "lots"));
    }

    #[test]
    fn test_malformed_boolean_is_fatal() {
        let raw = section("mysql", &[("workload_path", "w"), ("clean_data", "maybe")]);
        assert!(matches!(
            process_section(&raw).unwrap_err(),
            ConfigError::InvalidBoolean { .. }
        ));
    }

    #[test]
    fn test_boolean_spellings() {
        for (raw, expected) in [("ON", true), ("1", true), ("No", false), ("off", false)] {
            assert_eq!(parse_bool(raw), Some(expected), "{raw}");
        }
    }

    #[test]
    fn test_zero_step_rejected() {
        let raw = section("mysql", &[("workload_path", "w"), ("inc_mpl", "0")]);
        assert!(matches!(
            process_section(&raw).unwrap_err(),
            ConfigError::InvalidSweep { .. }
        ));
    }

    #[test]
    fn test_zero_trials_rejected() {
        let raw = section("mysql", &[("workload_path", "w"), ("trials", "0")]);
        assert!(matches!(
            process_section(&raw).unwrap_err(),
            ConfigError::InvalidSweep { ref message, .. } if message.starts_with("trials")
        ));
    }

    #[test]
    fn test_option_keys_match_any_case() {
        let raw = section(
            "mysql",
            &[("Workload_Path", "w"), ("Max_MPL", "8"), ("RecordCount", "10")],
        );
        let targets = process_section(&raw).unwrap();
        assert_eq!(targets[0].sweep.max_mpl, 8);
        let keys: Vec<_> = targets[0].extraneous.keys().cloned().collect();
        assert_eq!(keys, vec!["RecordCount".to_string()]);
    }

    #[test]
    fn test_section_key_case_overrides_default() {
        let config = RunnerConfigFile::parse(
            "[DEFAULT]\nworkload_path = \"w\"\nmax_mpl = 2\n\n[mysql]\nMAX_MPL = 6\n",
        )
        .unwrap();
        assert_eq!(config.targets().unwrap()[0].sweep.max_mpl, 6);
    }

    #[test]
    fn test_float_for_integer_option_is_fatal() {
        let config =
            RunnerConfigFile::parse("[mysql]\nworkload_path = \"w\"\nmax_mpl = 4.0\n").unwrap();
        assert_eq!(config.sections[0].values["max_mpl"], "4.0");
        assert!(matches!(
            config.targets().unwrap_err(),
            ConfigError::InvalidInteger { ref value, .. } if value == "4.0"
        ));
    }

    #[test]
    fn test_path_like_labels_rejected() {
        for name in ["mysql[../../escape]", "mysql[a/b]", "mysql[a\\b]", "redis[ok], mysql[..]"] {
            let err = process_section(&minimal(name)).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidLabel { .. }), "{name}");
        }
        assert!(process_section(&minimal("mysql[node.1]")).is_ok());
    }

    #[test]
    fn test_custom_coercion_rejects_empty_path() {
        let raw = section("mysql", &[("workload_path", "  ")]);
        assert!(matches!(
            process_section(&raw).unwrap_err(),
            ConfigError::InvalidCustom { .. }
        ));
    }

    #[test]
    fn test_parse_toml_sections_and_defaults() {
        let config = RunnerConfigFile::parse(
            r#"
            [DEFAULT]
            workload_path = "base"
            trials = 2

            [mysql]
            trials = 5
            max_mpl = 4

            ["cassandra[a], cassandra[b]"]
            "cassandra.readconsistencylevel" = "QUORUM"
            clean_data = true
            "#,
        )
        .unwrap();

        assert_eq!(config.sections.len(), 2);
        assert_eq!(config.sections[0].name, "mysql");
        assert_eq!(config.sections[0].values["trials"], "5");
        assert_eq!(config.sections[0].values["workload_path"], "base");
        assert_eq!(config.sections[1].values["trials"], "2");
        assert_eq!(config.sections[1].values["clean_data"], "true");

        let targets = config.targets().unwrap();
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].sweep.trials, 5);
        assert_eq!(targets[1].tag(), "cassandra-a");
        assert_eq!(
            targets[2].extraneous["cassandra.readconsistencylevel"],
            "QUORUM"
        );
    }

    #[test]
    fn test_parse_rejects_nested_values() {
        let err = RunnerConfigFile::parse("[mysql]\nhosts = [\"a\", \"b\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedValue { .. }));

        let err = RunnerConfigFile::parse("trials = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::NotASection(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = RunnerConfigFile::load("/nonexistent/mplbench.toml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_default_toml_processes() {
        let config = RunnerConfigFile::parse(&RunnerConfigFile::default_toml()).unwrap();
        let targets = config.targets().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].label, "local");
        assert_eq!(targets[0].sweep.max_mpl, 16);
        assert_eq!(targets[0].extraneous["recordcount"], "100000");
    }
}
