//! Layered configuration.
//!
//! Values are merged in increasing priority:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML config file (`--config PATH`, or `dupfind/config.toml` in the
//!    platform config directory)
//! 3. The named profile `[profile.<name>]` from the same file
//! 4. Environment variables prefixed with `DUPFIND_` (e.g. `DUPFIND_IO_THREADS=8`)
//! 5. Command-line flags ([`Config::merge_cli`])
//!
//! # Example file
//!
//! ```toml
//! algorithm = "sha256"
//! io_threads = 8
//! ignore_patterns = ["*.tmp", "node_modules/"]
//!
//! [profile.media]
//! min_size = 1000000
//! skip_hidden = true
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::duplicates::{FinderConfig, WastedSpace};
use crate::output::OutputFormat;
use crate::scanner::hasher::DEFAULT_BUFFER_SIZE;
use crate::scanner::{HashAlgorithm, WalkerConfig};

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "DUPFIND_";

/// Keys accepted at the top level of the config file and inside profiles.
const KNOWN_KEYS: &[&str] = &[
    "algorithm",
    "io_threads",
    "buffer_size",
    "verify",
    "wasted_space",
    "skip_hidden",
    "skip_empty",
    "sort",
    "min_size",
    "max_size",
    "ignore_patterns",
    "output",
];

/// Errors from loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Config file {path}: {source}")]
    Io {
        /// Path of the config file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A value has the wrong type or the file is not valid TOML.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] Box<figment::Error>),

    /// Values are individually valid but inconsistent.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// No home directory to derive the platform config path from.
    #[error("Failed to determine the configuration directory")]
    NoConfigDir,
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Parse(Box::new(err))
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Digest algorithm.
    pub algorithm: HashAlgorithm,
    /// Concurrent hash workers.
    pub io_threads: usize,
    /// Read buffer size in bytes.
    pub buffer_size: usize,
    /// Byte-by-byte verification of duplicate groups.
    pub verify: bool,
    /// Wasted space definition.
    pub wasted_space: WastedSpace,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Skip zero-byte files.
    pub skip_empty: bool,
    /// Walk entries in file name order.
    pub sort: bool,
    /// Minimum file size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    /// Maximum file size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    /// Gitignore-style patterns to exclude.
    pub ignore_patterns: Vec<String>,
    /// Report format.
    pub output: OutputFormat,
    /// Named profiles, merged over the base values on request.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub profile: BTreeMap<String, toml::Table>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            io_threads: 4,
            buffer_size: DEFAULT_BUFFER_SIZE,
            verify: false,
            wasted_space: WastedSpace::default(),
            skip_hidden: false,
            skip_empty: false,
            sort: false,
            min_size: None,
            max_size: None,
            ignore_patterns: Vec::new(),
            output: OutputFormat::default(),
            profile: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load from the platform config path, falling back to defaults.
    #[must_use]
    pub fn load(profile: Option<&str>) -> Self {
        match Self::default_path() {
            Ok(path) => Self::load_from_path(path, profile),
            Err(e) => {
                log::debug!("{}, using defaults", e);
                Self::from_figment(Self::base_figment(None), profile).unwrap_or_default()
            }
        }
    }

    /// Load from `path`, falling back to defaults on any error.
    ///
    /// A missing file is not an error. Invalid files are reported at `warn`.
    #[must_use]
    pub fn load_from_path(path: impl AsRef<Path>, profile: Option<&str>) -> Self {
        let path = path.as_ref();
        match Self::try_load_from_path(path, profile) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load from `path`, reporting invalid files as errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is not valid TOML
    /// or holds a value of the wrong type.
    pub fn try_load_from_path(path: &Path, profile: Option<&str>) -> Result<Self, ConfigError> {
        let existing = if path.exists() {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            warn_unknown_keys(&content, path);
            Some(path)
        } else {
            log::debug!("No config file at {}", path.display());
            None
        };

        Self::from_figment(Self::base_figment(existing), profile)
    }

    fn base_figment(path: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        match path {
            Some(path) => figment.merge(Toml::file(path)),
            None => figment,
        }
    }

    fn from_figment(base: Figment, profile: Option<&str>) -> Result<Self, ConfigError> {
        let mut figment = base;
        if let Some(name) = profile {
            let config: Config = figment.extract()?;
            match config.profile.get(name) {
                Some(table) => {
                    log::debug!("Applying config profile '{}'", name);
                    figment = figment.merge(Serialized::defaults(table.clone()));
                }
                None => log::warn!("Config profile '{}' not found, using base values", name),
            }
        }

        let config = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
        Ok(config)
    }

    /// Default config file path: `<config dir>/dupfind/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] when no home directory is known.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("", "", "dupfind").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Override values with flags given on the command line.
    ///
    /// Absent flags keep the configured value. Boolean flags can only turn
    /// an option on.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(algorithm) = cli.algorithm {
            self.algorithm = algorithm;
        }
        if let Some(threads) = cli.io_threads {
            self.io_threads = threads;
        }
        if let Some(size) = cli.buffer_size {
            self.buffer_size = usize::try_from(size).unwrap_or(usize::MAX);
        }
        if let Some(mode) = cli.wasted {
            self.wasted_space = mode;
        }
        if let Some(output) = cli.output {
            self.output = output;
        }
        if cli.min_size.is_some() {
            self.min_size = cli.min_size;
        }
        if cli.max_size.is_some() {
            self.max_size = cli.max_size;
        }
        self.ignore_patterns.extend(cli.ignore_patterns.iter().cloned());
        self.verify |= cli.verify;
        self.skip_hidden |= cli.skip_hidden;
        self.skip_empty |= cli.skip_empty;
        self.sort |= cli.sort;
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero worker count or buffer
    /// size, or a minimum size above the maximum size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.io_threads == 0 {
            return Err(ConfigError::Invalid("io_threads must be at least 1".into()));
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid("buffer_size must be at least 1".into()));
        }
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if min > max {
                return Err(ConfigError::Invalid(format!(
                    "min_size ({}) is larger than max_size ({})",
                    min, max
                )));
            }
        }
        Ok(())
    }

    /// Walker settings derived from this configuration.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::default()
            .with_skip_hidden(self.skip_hidden)
            .with_skip_empty(self.skip_empty)
            .with_size_bounds(self.min_size, self.max_size)
            .with_ignore_patterns(self.ignore_patterns.clone())
            .with_sort_entries(self.sort)
    }

    /// Finder settings derived from this configuration.
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_walker_config(self.walker_config())
            .with_algorithm(self.algorithm)
            .with_io_threads(self.io_threads)
            .with_buffer_size(self.buffer_size)
            .with_verify(self.verify)
            .with_wasted_space(self.wasted_space)
    }
}

/// Unknown keys in `table`, each with the closest known key if one is near.
///
/// Profile tables are checked with the same key set.
#[must_use]
pub fn unknown_keys(table: &toml::Table) -> Vec<(String, Option<&'static str>)> {
    let mut unknown = Vec::new();
    for (key, value) in table {
        if key == "profile" {
            if let Some(profiles) = value.as_table() {
                for (name, profile) in profiles {
                    if let Some(profile) = profile.as_table() {
                        unknown.extend(
                            profile
                                .keys()
                                .filter(|k| !KNOWN_KEYS.contains(&k.as_str()))
                                .map(|k| (format!("profile.{}.{}", name, k), suggest_key(k))),
                        );
                    }
                }
            }
        } else if !KNOWN_KEYS.contains(&key.as_str()) {
            unknown.push((key.clone(), suggest_key(key)));
        }
    }
    unknown
}

fn suggest_key(key: &str) -> Option<&'static str> {
    KNOWN_KEYS
        .iter()
        .map(|known| (*known, strsim::jaro_winkler(key, known)))
        .filter(|(_, score)| *score > 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(known, _)| known)
}

fn warn_unknown_keys(content: &str, path: &Path) {
    // Syntax errors are reported by the figment extraction.
    let Ok(table) = content.parse::<toml::Table>() else {
        return;
    };
    for (key, suggestion) in unknown_keys(&table) {
        match suggestion {
            Some(known) => log::warn!(
                "Unknown config key '{}' in {} (did you mean '{}'?)",
                key,
                path.display(),
                known
            ),
            None => log::warn!("Unknown config key '{}' in {}", key, path.display()),
        }
    }
}
