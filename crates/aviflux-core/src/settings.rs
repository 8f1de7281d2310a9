// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::route::PlannerOptions;
use crate::tracking::TrackingConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PROVIDER_URL: &str = "https://opensky-network.org/api/states/all";
pub const PROVIDER_URL_ENV: &str = "AVIFLUX_PROVIDER_URL";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// User-tunable knobs. Every field falls back to its default when absent
/// from the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cruise_speed_kt: f64,
    pub poll_interval_secs: u64,
    pub audio_interval_secs: u64,
    pub cycle_interval_secs: u64,
    pub bbox_margin_deg: f64,
    pub max_live_flights: usize,
    pub synthesized_flights: usize,
    pub synthetic_progress_min: f64,
    pub synthetic_progress_max: f64,
    pub provider_url: String,
    pub provider_timeout_secs: u64,
    pub airports_csv: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cruise_speed_kt: 450.0,
            poll_interval_secs: 30,
            audio_interval_secs: 2,
            cycle_interval_secs: 5,
            bbox_margin_deg: 2.0,
            max_live_flights: 6,
            synthesized_flights: 3,
            synthetic_progress_min: 10.0,
            synthetic_progress_max: 80.0,
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            provider_timeout_secs: 10,
            airports_csv: None,
        }
    }
}

impl Settings {
    /// `<config dir>/settings.json`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "aviflux", "AviFlux").map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Loads from `path`, or from the default location when `None`.
    /// A missing file is not an error and yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default().with_env_overrides()),
            },
        };

        if !path.exists() {
            log::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default().with_env_overrides());
        }

        let content = std::fs::read_to_string(&path)?;
        let settings: Settings =
            serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings.with_env_overrides())
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(PROVIDER_URL_ENV) {
            if !url.trim().is_empty() {
                self.provider_url = url.trim().to_string();
            }
        }
        self
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs.max(1))
    }

    pub fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            cruise_speed_kt: self.cruise_speed_kt,
            circular: false,
        }
    }

    /// Zero intervals are raised to one second so timers never spin.
    pub fn tracking_config(&self) -> TrackingConfig {
        let (lo, hi) = if self.synthetic_progress_min <= self.synthetic_progress_max {
            (self.synthetic_progress_min, self.synthetic_progress_max)
        } else {
            (self.synthetic_progress_max, self.synthetic_progress_min)
        };
        TrackingConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            audio_interval: Duration::from_secs(self.audio_interval_secs.max(1)),
            cycle_interval: Duration::from_secs(self.cycle_interval_secs.max(1)),
            bbox_margin_deg: self.bbox_margin_deg.max(0.0),
            max_live_flights: self.max_live_flights,
            synthesized_flights: self.synthesized_flights,
            synthetic_progress: lo.clamp(0.0, 100.0)..hi.clamp(0.0, 100.0),
            rng_seed: None,
        }
    }
}
