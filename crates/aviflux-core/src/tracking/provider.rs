// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! External flight-state provider.
//!
//! The OpenSky `states/all` endpoint answers with rows of positional values.
//! Rows are turned into [`StateVector`] right here so the rest of the crate
//! never indexes into raw JSON arrays.

use crate::geo::BoundingBox;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub const METERS_TO_FEET: f64 = 3.28084;
pub const MPS_TO_KNOTS: f64 = 1.94384;

// Column positions in an OpenSky state row.
const IDX_ICAO24: usize = 0;
const IDX_CALLSIGN: usize = 1;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_BARO_ALTITUDE: usize = 7;
const IDX_ON_GROUND: usize = 8;
const IDX_VELOCITY: usize = 9;
const IDX_TRUE_TRACK: usize = 10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Flight-state provider unavailable: {0}")]
    Unavailable(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Malformed provider response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    pub icao24: String,
    pub callsign: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub baro_altitude_m: Option<f64>,
    pub on_ground: bool,
    pub velocity_ms: Option<f64>,
    pub true_track_deg: Option<f64>,
}

impl StateVector {
    /// Converts one positional row. Rows that are too short or lack an
    /// `icao24` string are rejected; other missing values become `None`.
    pub fn from_row(row: &[Value]) -> Option<Self> {
        if row.len() <= IDX_TRUE_TRACK {
            return None;
        }
        let icao24 = row[IDX_ICAO24].as_str()?.trim().to_lowercase();
        if icao24.is_empty() {
            return None;
        }

        let callsign = row[IDX_CALLSIGN]
            .as_str()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Some(Self {
            icao24,
            callsign,
            longitude: row[IDX_LONGITUDE].as_f64(),
            latitude: row[IDX_LATITUDE].as_f64(),
            baro_altitude_m: row[IDX_BARO_ALTITUDE].as_f64(),
            on_ground: row[IDX_ON_GROUND].as_bool().unwrap_or(false),
            velocity_ms: row[IDX_VELOCITY].as_f64(),
            true_track_deg: row[IDX_TRUE_TRACK].as_f64(),
        })
    }

    /// Airborne with a known position.
    pub fn is_trackable(&self) -> bool {
        !self.on_ground && self.latitude.is_some() && self.longitude.is_some()
    }

    pub fn altitude_ft(&self) -> i32 {
        self.baro_altitude_m
            .map(|m| (m * METERS_TO_FEET).round() as i32)
            .unwrap_or(0)
    }

    pub fn ground_speed_kt(&self) -> i32 {
        self.velocity_ms
            .map(|v| (v * MPS_TO_KNOTS).round() as i32)
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct StatesResponse {
    states: Option<Vec<Vec<Value>>>,
}

/// Decodes a full `states/all` body, dropping malformed rows.
pub fn parse_states(body: &[u8]) -> Result<Vec<StateVector>, ProviderError> {
    let response: StatesResponse =
        serde_json::from_slice(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    let rows = response.states.unwrap_or_default();
    let total = rows.len();
    let states: Vec<StateVector> = rows.iter().filter_map(|r| StateVector::from_row(r)).collect();
    if states.len() < total {
        log::debug!("Dropped {} malformed state rows", total - states.len());
    }
    Ok(states)
}

/// Source of aircraft state vectors inside a bounding box.
pub trait FlightStateProvider: Send + Sync {
    fn fetch_states(
        &self,
        bbox: BoundingBox,
    ) -> impl Future<Output = Result<Vec<StateVector>, ProviderError>> + Send;
}

/// OpenSky Network REST client.
pub struct OpenSkyClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenSkyClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }
}

impl FlightStateProvider for OpenSkyClient {
    async fn fetch_states(&self, bbox: BoundingBox) -> Result<Vec<StateVector>, ProviderError> {
        let url = reqwest::Url::parse_with_params(
            &self.base_url,
            &[
                ("lamin", bbox.min_lat.to_string()),
                ("lomin", bbox.min_lon.to_string()),
                ("lamax", bbox.max_lat.to_string()),
                ("lomax", bbox.max_lon.to_string()),
            ],
        )
        .map_err(|e| ProviderError::Unavailable(format!("bad provider URL: {}", e)))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let states = parse_states(&bytes)?;
        log::debug!(
            "OpenSky returned {} state vectors for [{:.2},{:.2}]x[{:.2},{:.2}]",
            states.len(),
            bbox.min_lat,
            bbox.max_lat,
            bbox.min_lon,
            bbox.max_lon
        );
        Ok(states)
    }
}

/// A provider that is never reachable. Forces the synthesized feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProvider;

impl FlightStateProvider for OfflineProvider {
    async fn fetch_states(&self, _bbox: BoundingBox) -> Result<Vec<StateVector>, ProviderError> {
        Err(ProviderError::Unavailable("offline mode".to_string()))
    }
}
