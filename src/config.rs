//! Layered run configuration.
//!
//! Precedence, lowest first: built-in defaults, `worksim.toml` (or an explicit
//! `--config` file), environment variables (after `.env` is loaded by the
//! binary), then CLI flags.
//!
//! ```toml
//! users = 7000
//! teams = 200
//! seed = 42
//! llm_percentage = 0
//! output = "output/worksim.sqlite"
//! llm_model = "openai/gpt-3.5-turbo"
//! now = "2025-06-18T15:30:00"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::content::remote::OPENROUTER_CHAT_URL;
use crate::errors::GenerationError;
use crate::temporal::parse_timestamp;

pub const DEFAULT_CONFIG_FILE: &str = "worksim.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Size of the user population.
    pub users: u32,
    /// Number of teams (each gets 2-8 projects).
    pub teams: u32,
    /// Seed for the single random stream.
    pub seed: u64,
    /// Share (0-100) of eligible text requests sent to the remote service.
    pub llm_percentage: u8,
    /// SQLite file the dataset is written to.
    pub output: PathBuf,
    pub llm_model: String,
    /// Never serialized back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_url: String,
    pub request_timeout_secs: u64,
    /// Reference "now" as `YYYY-MM-DDTHH:MM:SS`; the wall clock when unset.
    pub now: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            users: 7000,
            teams: 200,
            seed: 42,
            llm_percentage: 0,
            output: PathBuf::from("output/worksim.sqlite"),
            llm_model: "openai/gpt-3.5-turbo".to_string(),
            api_key: None,
            api_url: OPENROUTER_CHAT_URL.to_string(),
            request_timeout_secs: 30,
            now: None,
        }
    }
}

/// Values supplied on the command line; `None` leaves the lower layer alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub users: Option<u32>,
    pub teams: Option<u32>,
    pub seed: Option<u64>,
    pub llm_percentage: Option<u8>,
    pub output: Option<PathBuf>,
    pub now: Option<String>,
}

impl SimConfig {
    /// Load defaults, then the config file, then the process environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Overlay environment values looked up through `lookup`.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
        where
            T::Err: std::fmt::Display,
        {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("Invalid value for {}: '{}' ({})", key, raw, e))
        }

        if let Some(v) = lookup("NUMBER_OF_USERS") {
            self.users = parse("NUMBER_OF_USERS", &v)?;
        }
        if let Some(v) = lookup("NUMBER_OF_TEAMS") {
            self.teams = parse("NUMBER_OF_TEAMS", &v)?;
        }
        if let Some(v) = lookup("SEED") {
            self.seed = parse("SEED", &v)?;
        }
        if let Some(v) = lookup("LLM_PERCENTAGE") {
            self.llm_percentage = parse("LLM_PERCENTAGE", &v)?;
        }
        if let Some(v) = lookup("OUTPUT_DB") {
            self.output = PathBuf::from(v);
        }
        if let Some(v) = lookup("LLM_MODEL") {
            self.llm_model = v;
        }
        if let Some(v) = lookup("OPENROUTER_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = lookup("OPENROUTER_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = lookup("WORKSIM_NOW") {
            self.now = Some(v);
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(users) = overrides.users {
            self.users = users;
        }
        if let Some(teams) = overrides.teams {
            self.teams = teams;
        }
        if let Some(seed) = overrides.seed {
            self.seed = seed;
        }
        if let Some(pct) = overrides.llm_percentage {
            self.llm_percentage = pct;
        }
        if let Some(output) = &overrides.output {
            self.output = output.clone();
        }
        if let Some(now) = &overrides.now {
            self.now = Some(now.clone());
        }
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.users == 0 {
            return Err(GenerationError::InvalidConfig(
                "users must be at least 1".to_string(),
            ));
        }
        if self.teams == 0 {
            return Err(GenerationError::InvalidConfig(
                "teams must be at least 1".to_string(),
            ));
        }
        if self.llm_percentage > 100 {
            return Err(GenerationError::InvalidConfig(format!(
                "llm_percentage must be between 0 and 100, got {}",
                self.llm_percentage
            )));
        }
        if let Some(now) = &self.now {
            parse_timestamp(now).map_err(|e| GenerationError::InvalidConfig(e.to_string()))?;
        }
        Ok(())
    }

    /// The reference time every generator measures against.
    pub fn reference_now(&self) -> Result<NaiveDateTime> {
        match &self.now {
            Some(now) => parse_timestamp(now),
            None => {
                let now = Utc::now().naive_utc();
                Ok(now.with_nanosecond(0).unwrap_or(now))
            }
        }
    }
}
