/*
 * Copyright (C) 2026 Mark Wells Dev
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::bridge::HandlerOptions;

/// Server settings.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// SQLite database file.
    pub database: PathBuf,

    /// Wipe the database and load the demo data set at startup (default: true)
    #[serde(default = "default_seed_on_start")]
    pub seed_on_start: bool,

    /// Seconds a delete waits for the user to confirm (default: 300)
    #[serde(default = "default_elicitation_timeout")]
    pub elicitation_timeout: u64,

    /// Defaults of `run_really_long_task`.
    #[serde(default)]
    pub progress: ProgressConfig,
}

/// Defaults of the progress demo tool.
#[derive(Debug, Deserialize, Clone)]
pub struct ProgressConfig {
    /// Total seconds when the caller gives none (default: 30)
    #[serde(default = "default_duration")]
    pub default_duration: f64,

    /// Step count when the caller gives none (default: 10)
    #[serde(default = "default_steps")]
    pub default_steps: u32,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            default_duration: default_duration(),
            default_steps: default_steps(),
        }
    }
}

const fn default_seed_on_start() -> bool {
    true
}

const fn default_elicitation_timeout() -> u64 {
    300
}

const fn default_duration() -> f64 {
    30.0
}

const fn default_steps() -> u32 {
    10
}

/// `<data dir>/contract-manager/contract_manager.sqlite3`, or the working
/// directory when the platform has no data dir.
#[must_use]
pub fn default_database() -> PathBuf {
    dirs::data_local_dir().map_or_else(
        || PathBuf::from("contract_manager.sqlite3"),
        |dir| dir.join("contract-manager").join("contract_manager.sqlite3"),
    )
}

impl Config {
    /// Load configuration from standard paths or a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or a value has the wrong
    /// type.
    pub fn load(explicit_file: Option<PathBuf>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // 1. Start with defaults
        builder = builder
            .set_default("database", default_database().to_string_lossy().to_string())?
            .set_default("seed_on_start", default_seed_on_start())?
            .set_default("elicitation_timeout", default_elicitation_timeout())?
            .set_default("progress.default_duration", default_duration())?
            .set_default("progress.default_steps", i64::from(default_steps()))?;

        // 2. Load from user config directory (~/.config/contract-manager/config.toml)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("contract-manager").join("config.toml");
            if config_path.exists() {
                builder = builder.add_source(config::File::from(config_path));
            }
        }

        // 3. Load from explicit file if provided
        if let Some(path) = explicit_file {
            builder = builder.add_source(config::File::from(path));
        }

        // 4. Load from environment variables (CONTRACT_MANAGER_DATABASE,
        //    CONTRACT_MANAGER_PROGRESS__DEFAULT_STEPS, etc.)
        builder = builder.add_source(
            config::Environment::with_prefix("CONTRACT_MANAGER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .context("Failed to build configuration")?;

        config.try_deserialize().context("Failed to deserialize configuration")
    }

    /// Handler settings derived from this configuration.
    #[must_use]
    pub fn handler_options(&self) -> HandlerOptions {
        HandlerOptions {
            elicitation_timeout: Duration::from_secs(self.elicitation_timeout),
            default_duration: self.progress.default_duration,
            default_steps: self.progress.default_steps,
        }
    }
}
