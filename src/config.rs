//! Configuration management for medisort.
//!
//! `Config` mirrors the on-disk file (every field optional), `Settings` is the
//! fully resolved runtime configuration handed to each component.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default config file basename, searched as `medisort.{toml,yaml,yml,json}`.
pub const CONFIG_BASENAME: &str = "medisort";

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "MEDISORT_CONFIG";

/// Default query for the optional patient database.
pub const DEFAULT_PATIENT_QUERY: &str = "SELECT id, nom, prenom FROM patients";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where patient records come from.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientSettings {
    /// Comma-delimited patient list (header line, then `id,surname,given_name`).
    pub file: PathBuf,
    /// Optional SQLite database tried before the flat file.
    pub database: Option<PathBuf>,
    /// Query returning `(id, surname, given_name)` rows.
    pub query: String,
}

/// Tesseract parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrSettings {
    /// Tesseract language code(s), e.g. "fra" or "fra+eng".
    pub language: String,
    /// Resolution used when rasterising PDF pages.
    pub dpi: u32,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: "fra".to_string(),
            dpi: 300,
        }
    }
}

/// Thresholds for name matching and acceptance.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingSettings {
    /// Minimum similarity for a directory entry to count as a match.
    pub cutoff: f64,
    /// Number of close candidates ranked per lookup.
    pub max_candidates: usize,
    /// Minimum confidence (inclusive) to file a document automatically.
    pub acceptance_threshold: f64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            cutoff: 0.6,
            max_candidates: 3,
            acceptance_threshold: 0.8,
        }
    }
}

/// Inbox watcher behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchSettings {
    /// Time given to the writer to finish before a new file is read.
    pub settle_delay: Duration,
    /// Filename suffixes of partial downloads that are never processed.
    pub ignored_suffixes: Vec<String>,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            ignored_suffixes: vec![".tmp".to_string(), ".download".to_string()],
        }
    }
}

/// External delivery command run after a successful import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliverySettings {
    pub command: Option<String>,
    /// Arguments; `{file}`, `{patient_id}`, `{surname}` and `{given_name}` are substituted.
    pub args: Vec<String>,
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Folder the scanner drops new documents into.
    pub inbox_dir: PathBuf,
    /// Root for archived originals and reason-coded rejection folders.
    pub processed_dir: PathBuf,
    /// Folder the records application imports from.
    pub import_dir: PathBuf,
    /// Optional log file, in addition to stdout.
    pub log_file: Option<PathBuf>,
    pub patients: PatientSettings,
    pub ocr: OcrSettings,
    pub matching: MatchingSettings,
    pub watch: WatchSettings,
    pub delivery: DeliverySettings,
}

impl Default for Settings {
    fn default() -> Self {
        // Documents dir -> Home dir -> Current dir
        let documents = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Self::with_base_dir(documents)
    }
}

impl Settings {
    /// Settings with every path laid out under `base`.
    pub fn with_base_dir(base: PathBuf) -> Self {
        Self {
            inbox_dir: base.join("Scans_Entrants"),
            processed_dir: base.join("Scans_Traites"),
            import_dir: base.join("Medisort").join("Import"),
            log_file: Some(base.join("medisort.log")),
            patients: PatientSettings {
                file: base.join("liste_patients.txt"),
                database: None,
                query: DEFAULT_PATIENT_QUERY.to_string(),
            },
            ocr: OcrSettings::default(),
            matching: MatchingSettings::default(),
            watch: WatchSettings::default(),
            delivery: DeliverySettings::default(),
        }
    }

    /// Check thresholds and limits for values the matcher cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.matching;
        if !(0.0..=1.0).contains(&m.cutoff) {
            return Err(ConfigError::Invalid(format!(
                "matching.cutoff must be between 0 and 1 (got {})",
                m.cutoff
            )));
        }
        if !(0.0..=1.0).contains(&m.acceptance_threshold) {
            return Err(ConfigError::Invalid(format!(
                "matching.acceptance_threshold must be between 0 and 1 (got {})",
                m.acceptance_threshold
            )));
        }
        if m.max_candidates == 0 {
            return Err(ConfigError::Invalid(
                "matching.max_candidates must be at least 1".to_string(),
            ));
        }
        if self.ocr.dpi == 0 {
            return Err(ConfigError::Invalid("ocr.dpi must be positive".to_string()));
        }
        Ok(())
    }

    /// Ensure inbox, processed and import directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for (label, dir) in [
            ("inbox_dir", &self.inbox_dir),
            ("processed_dir", &self.processed_dir),
            ("import_dir", &self.import_dir),
        ] {
            #[cfg(unix)]
            Self::log_directory_diagnostics(dir, label);

            fs::create_dir_all(dir).map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("Failed to create {} '{}': {}", label, dir.display(), e),
                )
            })?;
        }
        Ok(())
    }

    /// Log diagnostic information about a directory for debugging (Unix only).
    #[cfg(unix)]
    fn log_directory_diagnostics(path: &Path, label: &str) {
        use std::os::unix::fs::MetadataExt;
        let uid = unsafe { libc::getuid() };
        let gid = unsafe { libc::getgid() };
        tracing::debug!(
            "{} check: path={}, running as uid={} gid={}",
            label,
            path.display(),
            uid,
            gid
        );

        match fs::metadata(path) {
            Ok(meta) => tracing::debug!(
                "{} exists: owner={}:{}, mode={:o}, is_dir={}",
                label,
                meta.uid(),
                meta.gid(),
                meta.mode() & 0o7777,
                meta.is_dir()
            ),
            Err(_) => tracing::debug!("{} does not exist, will attempt to create", label),
        }
    }
}

/// `[patients]` section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// `[ocr]` section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
}

/// `[matching]` section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_candidates: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_threshold: Option<f64>,
}

/// `[watch]` section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored_suffixes: Option<Vec<String>>,
}

/// `[delivery]` section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Watched scanner output folder.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "watched_dir")]
    pub inbox_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    #[serde(default)]
    pub patients: PatientsConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a specific file path.
    /// The format follows the extension: TOML, YAML, or JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        let parse_err = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        match ext {
            "json" => serde_json::from_str(contents).map_err(|e| parse_err(e.to_string())),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| parse_err(e.to_string())),
            _ => toml::from_str(contents).map_err(|e| parse_err(e.to_string())),
        }
    }

    /// Find a config file in the standard locations.
    ///
    /// Order: `$MEDISORT_CONFIG`, `./medisort.*`, `<config dir>/medisort/config.*`.
    pub fn discover() -> Option<PathBuf> {
        if let Some(path) = std::env::var(CONFIG_ENV).ok().filter(|s| !s.is_empty()) {
            return Some(PathBuf::from(shellexpand::tilde(&path).as_ref()));
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        if let Some(path) = find_config_in(&cwd, CONFIG_BASENAME) {
            return Some(path);
        }

        dirs::config_dir().and_then(|dir| find_config_in(&dir.join(CONFIG_BASENAME), "config"))
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (typically config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref dir) = self.inbox_dir {
            settings.inbox_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(ref dir) = self.processed_dir {
            settings.processed_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(ref dir) = self.import_dir {
            settings.import_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(ref log_file) = self.log_file {
            settings.log_file = if log_file.is_empty() {
                None
            } else {
                Some(self.resolve_path(log_file, base_dir))
            };
        }

        if let Some(ref file) = self.patients.file {
            settings.patients.file = self.resolve_path(file, base_dir);
        }
        if let Some(ref database) = self.patients.database {
            settings.patients.database = Some(self.resolve_path(database, base_dir));
        }
        if let Some(ref query) = self.patients.query {
            settings.patients.query = query.clone();
        }

        if let Some(ref language) = self.ocr.language {
            settings.ocr.language = language.clone();
        }
        if let Some(dpi) = self.ocr.dpi {
            settings.ocr.dpi = dpi;
        }

        if let Some(cutoff) = self.matching.cutoff {
            settings.matching.cutoff = cutoff;
        }
        if let Some(max) = self.matching.max_candidates {
            settings.matching.max_candidates = max;
        }
        if let Some(threshold) = self.matching.acceptance_threshold {
            settings.matching.acceptance_threshold = threshold;
        }

        if let Some(ms) = self.watch.settle_delay_ms {
            settings.watch.settle_delay = Duration::from_millis(ms);
        }
        if let Some(ref suffixes) = self.watch.ignored_suffixes {
            settings.watch.ignored_suffixes = suffixes.clone();
        }

        if let Some(ref command) = self.delivery.command {
            settings.delivery.command = Some(command.clone());
            settings.delivery.args = self.delivery.args.clone();
        }
    }

    /// Build a config file reflecting fully resolved settings (used by `init`).
    pub fn from_settings(settings: &Settings) -> Self {
        let path = |p: &Path| Some(p.display().to_string());
        Self {
            inbox_dir: path(&settings.inbox_dir),
            processed_dir: path(&settings.processed_dir),
            import_dir: path(&settings.import_dir),
            log_file: settings.log_file.as_deref().and_then(path),
            patients: PatientsConfig {
                file: path(&settings.patients.file),
                database: settings.patients.database.as_deref().and_then(path),
                query: None,
            },
            ocr: OcrConfig {
                language: Some(settings.ocr.language.clone()),
                dpi: Some(settings.ocr.dpi),
            },
            matching: MatchingConfig {
                cutoff: Some(settings.matching.cutoff),
                max_candidates: Some(settings.matching.max_candidates),
                acceptance_threshold: Some(settings.matching.acceptance_threshold),
            },
            watch: WatchConfig {
                settle_delay_ms: Some(settings.watch.settle_delay.as_millis() as u64),
                ignored_suffixes: Some(settings.watch.ignored_suffixes.clone()),
            },
            delivery: DeliveryConfig {
                command: settings.delivery.command.clone(),
                args: settings.delivery.args.clone(),
            },
            source_path: None,
        }
    }

    /// Serialize as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Look for `{basename}.{toml,yaml,yml,json}` in `dir`.
fn find_config_in(dir: &Path, basename: &str) -> Option<PathBuf> {
    ["toml", "yaml", "yml", "json"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", basename, ext)))
        .find(|path| path.exists())
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Inbox override from the command line or environment.
    pub inbox_dir: Option<PathBuf>,
}

/// Load settings: defaults, then the config file, then explicit overrides.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(
    options: LoadOptions,
) -> Result<(Settings, Config), ConfigError> {
    let config = match options.config_path.clone().or_else(Config::discover) {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            Config::load_from_path(&path).await?
        }
        None => {
            tracing::debug!("No config file found, using defaults");
            Config::default()
        }
    };

    let mut settings = Settings::default();
    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    config.apply_to_settings(&mut settings, &base_dir);

    if let Some(inbox) = options.inbox_dir {
        settings.inbox_dir = inbox;
    }

    settings.validate()?;
    Ok((settings, config))
}
