// Configuration loading and parsing (tournament.toml, scorer.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crease_core::tournament::MAX_OVERS_PER_INNINGS;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

/// Config files read from `config/`, in load order.
const TOURNAMENT_FILE: &str = "tournament.toml";
const SCORER_FILE: &str = "scorer.toml";
const CONFIG_FILES: [&str; 2] = [TOURNAMENT_FILE, SCORER_FILE];

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub tournament: TournamentConfig,
    pub ws_port: u16,
    /// Resolved database path; never empty.
    pub db_path: String,
    pub sync: SyncConfig,
}

// ---------------------------------------------------------------------------
// tournament.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[tournament]` table in tournament.toml.
#[derive(Debug, Clone, Deserialize)]
struct TournamentFile {
    tournament: TournamentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TournamentConfig {
    pub name: String,
    /// Overs per innings used when a new match does not specify its own.
    pub default_overs: u32,
    /// CSV roster imported on first start, relative to the working directory.
    pub roster_csv: String,
}

// ---------------------------------------------------------------------------
// scorer.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ScorerFile {
    websocket: WebsocketSection,
    database: DatabaseSection,
    #[serde(default)]
    sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct WebsocketSection {
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    /// Empty means "use the platform data directory".
    #[serde(default)]
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Remote snapshots arriving within this many milliseconds of a local
    /// write are ignored.
    pub suppress_window_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            suppress_window_ms: 3000,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/tournament.toml` and
/// `config/scorer.toml`, both relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- tournament.toml (required) ---
    let tournament_path = config_dir.join(TOURNAMENT_FILE);
    let tournament_text = read_file(&tournament_path)?;
    let tournament_file: TournamentFile =
        toml::from_str(&tournament_text).map_err(|e| ConfigError::ParseError {
            path: tournament_path.clone(),
            source: e,
        })?;

    // --- scorer.toml (required) ---
    let scorer_path = config_dir.join(SCORER_FILE);
    let scorer_text = read_file(&scorer_path)?;
    let scorer_file: ScorerFile =
        toml::from_str(&scorer_text).map_err(|e| ConfigError::ParseError {
            path: scorer_path.clone(),
            source: e,
        })?;

    let config = Config {
        tournament: tournament_file.tournament,
        ws_port: scorer_file.websocket.port,
        db_path: resolve_db_path(&scorer_file.database.path)?,
        sync: scorer_file.sync,
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/` from `defaults/` for every known config file the user has
/// not created yet. Returns the paths written; existing files are never
/// touched. A file with no default is left for `load_config_from` to report.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() && !config_dir.is_dir() {
        return Err(seed_error(format!(
            "neither defaults/ nor config/ found in {}; run from the crate root",
            base_dir.display()
        )));
    }

    let missing: Vec<&str> = CONFIG_FILES
        .into_iter()
        .filter(|name| !config_dir.join(name).exists())
        .collect();
    if missing.is_empty() {
        return Ok(Vec::new());
    }

    std::fs::create_dir_all(&config_dir)
        .map_err(|e| seed_error(format!("cannot create {}: {e}", config_dir.display())))?;

    let mut seeded = Vec::with_capacity(missing.len());
    for name in missing {
        let source = defaults_dir.join(name);
        if !source.is_file() {
            continue;
        }
        let target = config_dir.join(name);
        std::fs::copy(&source, &target).map_err(|e| {
            seed_error(format!(
                "cannot copy {} to {}: {e}",
                source.display(),
                target.display()
            ))
        })?;
        seeded.push(target);
    }
    Ok(seeded)
}

fn seed_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// An empty database path resolves to `crease.db` in the platform data
/// directory.
fn resolve_db_path(configured: &str) -> Result<String, ConfigError> {
    if !configured.trim().is_empty() {
        return Ok(configured.to_string());
    }
    let dirs = directories::ProjectDirs::from("", "", "crease").ok_or_else(|| {
        ConfigError::ValidationError {
            field: "database.path".into(),
            message: "empty and no platform data directory is available".into(),
        }
    })?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir).map_err(|e| ConfigError::ValidationError {
        field: "database.path".into(),
        message: format!("cannot create {}: {e}", data_dir.display()),
    })?;
    Ok(data_dir.join("crease.db").to_string_lossy().into_owned())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.tournament.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "tournament.name".into(),
            message: "must not be empty".into(),
        });
    }

    if !(1..=MAX_OVERS_PER_INNINGS).contains(&config.tournament.default_overs) {
        return Err(ConfigError::ValidationError {
            field: "tournament.default_overs".into(),
            message: format!(
                "must be between 1 and {MAX_OVERS_PER_INNINGS}, got {}",
                config.tournament.default_overs
            ),
        });
    }

    if config.ws_port == 0 {
        return Err(ConfigError::ValidationError {
            field: "websocket.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: returns the path to the crate root (works whether `cargo test`
    /// runs from the crate root or the workspace root).
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("crates/crease-app/defaults").exists() {
            cwd.join("crates/crease-app")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    /// Fresh temp dir with config/ populated from the shipped defaults.
    fn temp_config(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        let config_dir = tmp.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        let root = project_root();
        fs::copy(
            root.join("defaults/tournament.toml"),
            config_dir.join("tournament.toml"),
        )
        .unwrap();
        fs::copy(root.join("defaults/scorer.toml"), config_dir.join("scorer.toml")).unwrap();
        tmp
    }

    #[test]
    fn load_valid_config_from_defaults() {
        let tmp = temp_config("crease_config_valid");
        let config = load_config_from(&tmp).expect("should load valid config");

        assert_eq!(config.tournament.name, "Campus Premier League");
        assert_eq!(config.tournament.default_overs, 10);
        assert_eq!(config.tournament.roster_csv, "data/teams.csv");
        assert_eq!(config.ws_port, 9002);
        assert_eq!(config.db_path, "crease.db");
        assert_eq!(config.sync.suppress_window_ms, 3000);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_sync_section_uses_default() {
        let tmp = temp_config("crease_config_no_sync");
        fs::write(
            tmp.join("config/scorer.toml"),
            "[websocket]\nport = 9100\n\n[database]\npath = \"x.db\"\n",
        )
        .unwrap();
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.sync.suppress_window_ms, 3000);
        assert_eq!(config.ws_port, 9100);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_overs() {
        let tmp = temp_config("crease_config_zero_overs");
        fs::write(
            tmp.join("config/tournament.toml"),
            "[tournament]\nname = \"T\"\ndefault_overs = 0\nroster_csv = \"r.csv\"\n",
        )
        .unwrap();
        let err = load_config_from(&tmp).unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "tournament.default_overs");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_scorer_toml() {
        let tmp = temp_config("crease_config_missing_scorer");
        fs::remove_file(tmp.join("config/scorer.toml")).unwrap();
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = temp_config("crease_config_invalid");
        fs::write(tmp.join("config/tournament.toml"), "this is [not toml").unwrap();
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = std::env::temp_dir().join("crease_config_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);
        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();

        let root = project_root();
        fs::copy(
            root.join("defaults/tournament.toml"),
            defaults_dir.join("tournament.toml"),
        )
        .unwrap();
        fs::copy(root.join("defaults/scorer.toml"), defaults_dir.join("scorer.toml")).unwrap();
        fs::write(defaults_dir.join("scorer.toml.example"), "# example\n").unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 2);
        assert!(tmp.join("config/tournament.toml").exists());
        assert!(!tmp.join("config/scorer.toml.example").exists());

        // Second run copies nothing and keeps edits.
        fs::write(tmp.join("config/scorer.toml"), "# custom\n").unwrap();
        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        let content = fs::read_to_string(tmp.join("config/scorer.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_seeds_only_what_is_missing() {
        let tmp = std::env::temp_dir().join("crease_config_ensure_partial");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("defaults/tournament.toml"), "# default tournament\n").unwrap();
        fs::write(tmp.join("defaults/scorer.toml"), "# default scorer\n").unwrap();
        fs::write(tmp.join("config/scorer.toml"), "# mine\n").unwrap();

        let seeded = ensure_config_files(&tmp).unwrap();
        assert_eq!(seeded, vec![tmp.join("config/tournament.toml")]);
        assert_eq!(
            fs::read_to_string(tmp.join("config/scorer.toml")).unwrap(),
            "# mine\n"
        );

        // No defaults at all, but config/ exists: nothing to seed.
        fs::remove_dir_all(tmp.join("defaults")).unwrap();
        fs::remove_file(tmp.join("config/tournament.toml")).unwrap();
        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::FileNotFound { .. })
        ));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("crease_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = ensure_config_files(&tmp).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
