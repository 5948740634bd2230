use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "racedesk";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STAKE: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct RacedeskConfig {
    pub db_path: Option<PathBuf>,
    pub scratchings_url: Option<String>,
    pub odds_url: Option<String>,
    pub http_timeout_secs: u64,
    pub log_level: String,
    pub parallel: bool,
    /// Flat stake used when tallying P&L for value selections.
    pub stake: f64,
}

impl RacedeskConfig {
    /// Reads `.env.local`, then `.env`, then the process environment.
    pub fn load() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let db_path = env_string("RACEDESK_DB")
            .map(PathBuf::from)
            .or_else(crate::store::default_db_path);
        let http_timeout_secs = env::var("RACEDESK_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
            .clamp(2, 120);
        let log_level = env_string("RACEDESK_LOG")
            .unwrap_or_else(|| "info".to_string())
            .to_ascii_lowercase();
        let stake = env::var("RACEDESK_STAKE")
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(DEFAULT_STAKE);

        Self {
            db_path,
            scratchings_url: env_string("RACEDESK_SCRATCHINGS_URL"),
            odds_url: env_string("RACEDESK_ODDS_URL"),
            http_timeout_secs,
            log_level,
            parallel: env_bool("RACEDESK_PARALLEL", true),
            stake,
        }
    }
}

/// `$XDG_DATA_HOME/racedesk`, falling back to `~/.local/share/racedesk`.
pub fn app_data_dir() -> Option<PathBuf> {
    if let Some(base) = env_string("XDG_DATA_HOME") {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = env_string("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR),
    )
}

pub fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
