// Configuration loading and parsing (league.toml, schedule.toml, sync.toml).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use chitbook_core::{Match, MatchStatus, Member, Payout, PlayoffKind, Season, Team, TeamCode};

use crate::retry::RetryPolicy;
use crate::sheet::SheetLayout;

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

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub schedule: Vec<MatchEntry>,
    pub sync: SyncConfig,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub season: SeasonSection,
    pub teams: Vec<Team>,
    /// Members in the order their columns appear in the sheet.
    pub members: Vec<Member>,
    #[serde(default)]
    pub sheet: SheetLayout,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonSection {
    pub name: String,
    pub buy_in: i64,
    pub payout_per_win: i64,
    /// Member id bound to seat 8 on both teams.
    pub fixed_member: String,
}

// ---------------------------------------------------------------------------
// schedule.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ScheduleFile {
    #[serde(default)]
    matches: Vec<MatchEntry>,
}

/// One fixture as written in schedule.toml. Playoff entries may leave the
/// teams out until they are known.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchEntry {
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub team_a: Option<TeamCode>,
    #[serde(default)]
    pub team_b: Option<TeamCode>,
    #[serde(default)]
    pub playoff: Option<PlayoffKind>,
    /// Pins the status regardless of the date.
    #[serde(default)]
    pub status: Option<MatchStatus>,
}

// ---------------------------------------------------------------------------
// sync.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct SyncFile {
    sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// CSV export of the sheet read by the offline source.
    pub snapshot_path: String,
    pub throttle_secs: u64,
    pub fetch_timeout_secs: u64,
    pub retry_delay_ms: u64,
    pub max_attempts: u32,
    pub status_tick_secs: u64,
    /// How often `--watch` re-reads the snapshot.
    pub poll_secs: u64,
}

impl SyncConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
            timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_secs(self.throttle_secs)
    }

    pub fn status_tick(&self) -> Duration {
        Duration::from_secs(self.status_tick_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }
}

// ---------------------------------------------------------------------------
// Building domain state
// ---------------------------------------------------------------------------

impl Config {
    pub fn payout(&self) -> Payout {
        Payout {
            buy_in: self.league.season.buy_in,
            payout_per_win: self.league.season.payout_per_win,
        }
    }

    /// Build the season from the roster and schedule. Statuses start at
    /// their defaults; call `refresh_statuses` with today's date afterwards.
    pub fn build_season(&self) -> Result<Season, ConfigError> {
        let matches = self
            .schedule
            .iter()
            .map(match_from_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Season::new(
            self.league.members.clone(),
            matches,
            &self.league.season.fixed_member,
        )
        .map_err(|e| ConfigError::ValidationError {
            field: "season.fixed_member".into(),
            message: e.to_string(),
        })
    }
}

fn match_from_entry(entry: &MatchEntry) -> Result<Match, ConfigError> {
    let field = || format!("matches[{}]", entry.id);

    let mut m = match (entry.playoff, &entry.team_a, &entry.team_b) {
        (Some(kind), None, None) => Match::playoff(&entry.id, entry.date, kind),
        (Some(kind), Some(a), Some(b)) => {
            let mut m = Match::playoff(&entry.id, entry.date, kind);
            m.set_playoff_teams(a.clone(), b.clone())
                .map_err(|e| ConfigError::ValidationError {
                    field: field(),
                    message: e.to_string(),
                })?;
            m
        }
        (None, Some(a), Some(b)) if a != b => Match::league(&entry.id, entry.date, a.clone(), b.clone()),
        (None, Some(a), Some(_)) => {
            return Err(ConfigError::ValidationError {
                field: field(),
                message: format!("team_a and team_b are both {a}"),
            })
        }
        _ => {
            return Err(ConfigError::ValidationError {
                field: field(),
                message: "needs both team_a and team_b (or neither, for a playoff)".into(),
            })
        }
    };

    if let Some(status) = entry.status {
        m.override_status(Some(status));
    }
    Ok(m)
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml`,
/// `config/schedule.toml`, and `config/sync.toml`, all relative to the given
/// `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let [league_file, schedule_file, sync_file] = CONFIG_FILES;
    let league: LeagueConfig = parse_file(&config_dir.join(league_file))?;
    let schedule: ScheduleFile = parse_file(&config_dir.join(schedule_file))?;
    let sync: SyncFile = parse_file(&config_dir.join(sync_file))?;

    let config = Config {
        league,
        schedule: schedule.matches,
        sync: sync.sync,
    };

    validate(&config)?;

    Ok(config)
}

/// The files a league directory needs under `config/`.
pub const CONFIG_FILES: [&str; 3] = ["league.toml", "schedule.toml", "sync.toml"];

/// Seed `config/` with the shipped league, schedule and sync files from
/// `defaults/`. Files already present in `config/` are left alone, so local
/// edits to the roster or schedule survive upgrades. Returns the files copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");
    let seed_error = |message: String| ConfigError::DefaultsCopyError { message };

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(seed_error(format!(
                "no league config in {}: expected config/ with {} or a defaults/ to seed it from",
                base_dir.display(),
                CONFIG_FILES.join(", ")
            )));
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir)
        .map_err(|e| seed_error(format!("cannot create league config dir {}: {e}", config_dir.display())))?;

    let mut copied = Vec::new();
    for name in CONFIG_FILES {
        let target = config_dir.join(name);
        if target.exists() {
            continue;
        }
        let source = defaults_dir.join(name);
        let content = std::fs::read(&source).map_err(|e| {
            seed_error(format!(
                "config/{name} is missing and the shipped default {} cannot be read: {e}",
                source.display()
            ))
        })?;

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                std::io::Write::write_all(&mut dest, &content)
                    .map_err(|e| seed_error(format!("cannot seed {}: {e}", target.display())))?;
                info!("Seeded {} from defaults", target.display());
                copied.push(target);
            }
            // Another process seeded it first.
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(seed_error(format!("cannot create {}: {e}", target.display()))),
        }
    }

    Ok(copied)
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

fn parse_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let season = &config.league.season;
    if season.buy_in < 0 {
        return Err(invalid("season.buy_in", format!("must be >= 0, got {}", season.buy_in)));
    }
    if season.payout_per_win <= 0 {
        return Err(invalid(
            "season.payout_per_win",
            format!("must be > 0, got {}", season.payout_per_win),
        ));
    }

    // Teams: at least two, unique short codes
    if config.league.teams.len() < 2 {
        return Err(invalid("teams", "at least two teams are required"));
    }
    let mut codes = HashSet::new();
    for team in &config.league.teams {
        if !codes.insert(team.short_code.clone()) {
            return Err(invalid(
                "teams",
                format!("duplicate short code {}", team.short_code),
            ));
        }
    }

    // Members: unique ids and names, fixed member present
    let members = &config.league.members;
    if members.is_empty() {
        return Err(invalid("members", "at least one member is required"));
    }
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for member in members {
        if !ids.insert(member.id.as_str()) {
            return Err(invalid("members", format!("duplicate id `{}`", member.id)));
        }
        if !names.insert(member.name.to_lowercase()) {
            return Err(invalid("members", format!("duplicate name `{}`", member.name)));
        }
    }
    if !ids.contains(season.fixed_member.as_str()) {
        return Err(invalid(
            "season.fixed_member",
            format!("`{}` is not a member id", season.fixed_member),
        ));
    }

    // Sheet layout
    let sheet = &config.league.sheet;
    if sheet.columns_per_member < 5 {
        return Err(invalid(
            "sheet.columns_per_member",
            format!("must be >= 5, got {}", sheet.columns_per_member),
        ));
    }
    if sheet.first_member_column < 7 {
        return Err(invalid(
            "sheet.first_member_column",
            format!("must be >= 7, got {}", sheet.first_member_column),
        ));
    }

    // Schedule: unique ids, known teams
    let mut match_ids = HashSet::new();
    for entry in &config.schedule {
        if !match_ids.insert(entry.id.as_str()) {
            return Err(invalid("matches", format!("duplicate match id `{}`", entry.id)));
        }
        for code in [&entry.team_a, &entry.team_b].into_iter().flatten() {
            if !codes.contains(code) {
                return Err(invalid(
                    format!("matches[{}]", entry.id),
                    format!("unknown team {code}"),
                ));
            }
        }
    }

    // Sync timings
    let sync = &config.sync;
    let sync_fields: &[(&str, u64)] = &[
        ("sync.fetch_timeout_secs", sync.fetch_timeout_secs),
        ("sync.status_tick_secs", sync.status_tick_secs),
        ("sync.poll_secs", sync.poll_secs),
    ];
    for (name, val) in sync_fields {
        if *val == 0 {
            return Err(invalid(*name, "must be > 0"));
        }
    }
    if sync.max_attempts == 0 {
        return Err(invalid("sync.max_attempts", "must be > 0"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
