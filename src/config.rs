//! Layered configuration.
//!
//! Settings resolve from defaults, then `mocksmith.toml`, then environment
//! variables prefixed with `MOCKSMITH_` using double underscores for nesting:
//! `MOCKSMITH_GENERATION__CONCURRENCY=4` sets `generation.concurrency`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "mocksmith.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Workspace root (directory containing mocksmith.toml), detected if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationConfig {
    /// Bounded parse-worker count. 0 means one worker per available CPU.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Parser backend: full tree walk or compiled query
    #[serde(default)]
    pub parser: ParserBackendKind,

    /// Comment marker that opts a declaration into mock generation
    #[serde(default = "default_annotation")]
    pub annotation: String,

    /// File-name suffixes excluded from the declaration scan
    #[serde(default = "default_exclusion_suffixes")]
    pub exclusion_suffixes: Vec<String>,

    /// File-name suffixes excluded from the usage scan
    #[serde(default)]
    pub usage_exclusion_suffixes: Vec<String>,

    /// Where and how generated mocks are written
    #[serde(default)]
    pub output: OutputConfig,

    /// Render generic methods through Any-typed template handlers
    #[serde(default = "default_false")]
    pub use_template_func: bool,

    /// Force argument-history capture for every method
    #[serde(default = "default_false")]
    pub enable_args_history: bool,

    /// Sort rendered entities by name for reproducible builds
    #[serde(default = "default_true")]
    pub sort_output: bool,

    /// Module names that win merge conflicts, in order
    #[serde(default)]
    pub module_precedence: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParserBackendKind {
    /// Manual cursor walk over the syntax tree
    #[default]
    Syntax,
    /// Compiled tree-sitter query locating declarations
    Query,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// All mocks in one aggregate file
    #[default]
    SingleFile,
    /// One file per mocked entity
    PerEntity,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    #[serde(default)]
    pub mode: OutputMode,

    /// Aggregate file path, or directory for per-entity mode
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `pipeline = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_concurrency() -> usize {
    12
}
fn default_annotation() -> String {
    "@mockable".to_string()
}
fn default_exclusion_suffixes() -> Vec<String> {
    vec!["Mock".to_string(), "Mocks".to_string(), "Tests".to_string()]
}
fn default_output_path() -> PathBuf {
    PathBuf::from("Mocks.swift")
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            generation: GenerationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            parser: ParserBackendKind::default(),
            annotation: default_annotation(),
            exclusion_suffixes: default_exclusion_suffixes(),
            usage_exclusion_suffixes: Vec::new(),
            output: OutputConfig::default(),
            use_template_func: false,
            enable_args_history: false,
            sort_output: true,
            module_precedence: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            path: default_output_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path =
            Self::find_workspace_config().unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        Self::load_from(&config_path)
    }

    /// Load configuration with an explicit config file path.
    pub fn load_from(config_path: &Path) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(
                Env::prefixed("MOCKSMITH_")
                    .map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
            )
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = config_path
                        .parent()
                        .filter(|p| p.exists())
                        .map(Path::to_path_buf);
                }
                settings
            })
    }

    /// Find mocksmith.toml by walking from the current directory up to root.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            let candidate = ancestor.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}

impl GenerationConfig {
    /// Worker count actually used for parsing: the configured bound, with 0
    /// meaning one per CPU, never more workers than files.
    pub fn effective_workers(&self, file_count: usize) -> usize {
        let configured = if self.concurrency == 0 {
            num_cpus::get()
        } else {
            self.concurrency
        };
        configured.max(1).min(file_count.max(1))
    }

    /// File-stem suffix exclusion for the declaration scan.
    pub fn should_scan(&self, path: &Path) -> bool {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            return false;
        };
        !self
            .exclusion_suffixes
            .iter()
            .any(|suffix| stem.ends_with(suffix))
    }
}
