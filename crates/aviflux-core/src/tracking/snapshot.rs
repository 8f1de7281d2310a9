// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use super::provider::StateVector;
use crate::airports::Airport;
use crate::geo::{self, Coordinate};
use crate::route::RouteCodes;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const UNKNOWN_AIRCRAFT_TYPE: &str = "UNKN";

const AIRLINE_PREFIXES: &[&str] = &["AAL", "UAL", "DAL", "SWA", "BAW", "AFR", "DLH", "UAE"];
const AIRCRAFT_TYPES: &[&str] = &["B738", "A320", "A321", "B77W", "B789", "A359"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightStatus {
    Departed,
    Climbing,
    Cruising,
    EnRoute,
    Descending,
}

impl FlightStatus {
    pub fn from_progress(progress_pct: f64) -> Self {
        match progress_pct {
            p if p < 20.0 => FlightStatus::Departed,
            p if p < 40.0 => FlightStatus::Climbing,
            p if p < 60.0 => FlightStatus::Cruising,
            p if p < 80.0 => FlightStatus::EnRoute,
            _ => FlightStatus::Descending,
        }
    }

    /// Plausible altitude band for synthesized traffic.
    fn altitude_band_ft(&self) -> Range<i32> {
        match self {
            FlightStatus::Departed => 3_000..10_000,
            FlightStatus::Climbing => 10_000..28_000,
            FlightStatus::Cruising | FlightStatus::EnRoute => 31_000..39_000,
            FlightStatus::Descending => 12_000..24_000,
        }
    }
}

impl std::fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FlightStatus::Departed => "Departed",
            FlightStatus::Climbing => "Climbing",
            FlightStatus::Cruising => "Cruising",
            FlightStatus::EnRoute => "En Route",
            FlightStatus::Descending => "Descending",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveFlightSnapshot {
    pub flight_id: String,
    pub aircraft_type: String,
    pub altitude_ft: i32,
    pub ground_speed_kt: i32,
    pub heading_deg: f64,
    pub coordinates: Coordinate,
    pub status: FlightStatus,
    pub progress_pct: f64,
    pub eta: Option<DateTime<Utc>>,
    pub is_live_sourced: bool,
}

/// Where the current flight list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedState {
    Live,
    Synthesized,
    /// Departure or arrival did not resolve; the list is empty.
    InvalidRoute,
}

/// One published tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotUpdate {
    pub sequence: u64,
    pub route: RouteCodes,
    pub feed: FeedState,
    pub flights: Vec<LiveFlightSnapshot>,
}

fn progress_between(departure: Coordinate, position: Coordinate, arrival: Coordinate) -> f64 {
    let flown = geo::distance_nm(departure, position);
    let remaining = geo::distance_nm(position, arrival);
    let total = flown + remaining;
    if total <= 0.0 {
        return 0.0;
    }
    (flown / total * 100.0).clamp(0.0, 100.0)
}

fn eta_for(now: DateTime<Utc>, remaining_nm: f64, ground_speed_kt: i32) -> Option<DateTime<Utc>> {
    if ground_speed_kt <= 0 {
        return None;
    }
    let millis = remaining_nm / ground_speed_kt as f64 * 3_600_000.0;
    if !millis.is_finite() {
        return None;
    }
    now.checked_add_signed(chrono::Duration::milliseconds(millis.round() as i64))
}

impl LiveFlightSnapshot {
    /// Maps a provider record onto the route. Returns `None` for records on
    /// the ground or without a position.
    pub fn from_state_vector(
        state: &StateVector,
        departure: &Airport,
        arrival: &Airport,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        if !state.is_trackable() {
            return None;
        }
        let position = Coordinate::new(state.latitude?, state.longitude?);
        let dep = departure.coordinate();
        let arr = arrival.coordinate();

        let heading_deg = match state.true_track_deg {
            Some(track) if track.is_finite() => geo::normalize_heading(track),
            _ => geo::bearing_deg(position, arr),
        };
        let progress_pct = progress_between(dep, position, arr);
        let ground_speed_kt = state.ground_speed_kt();

        Some(Self {
            flight_id: state
                .callsign
                .clone()
                .unwrap_or_else(|| state.icao24.to_uppercase()),
            aircraft_type: UNKNOWN_AIRCRAFT_TYPE.to_string(),
            altitude_ft: state.altitude_ft(),
            ground_speed_kt,
            heading_deg,
            coordinates: position,
            status: FlightStatus::from_progress(progress_pct),
            progress_pct,
            eta: eta_for(now, geo::distance_nm(position, arr), ground_speed_kt),
            is_live_sourced: true,
        })
    }
}

/// Fabricates `count` plausible flights spread along the direct line between
/// the two airports.
pub fn synthesize<R: Rng + ?Sized>(
    rng: &mut R,
    departure: &Airport,
    arrival: &Airport,
    count: usize,
    progress: &Range<f64>,
    now: DateTime<Utc>,
) -> Vec<LiveFlightSnapshot> {
    let dep = departure.coordinate();
    let arr = arrival.coordinate();
    let total_nm = geo::distance_nm(dep, arr);
    let heading_deg = geo::bearing_deg(dep, arr);

    (0..count)
        .map(|_| {
            let progress_pct = if progress.start < progress.end {
                rng.gen_range(progress.clone())
            } else {
                progress.start
            };
            let status = FlightStatus::from_progress(progress_pct);
            let ground_speed_kt = rng.gen_range(420..500);
            let prefix = AIRLINE_PREFIXES.choose(rng).copied().unwrap_or("AAL");
            let aircraft_type = AIRCRAFT_TYPES.choose(rng).copied().unwrap_or("B738");
            let remaining_nm = total_nm * (1.0 - progress_pct / 100.0);

            LiveFlightSnapshot {
                flight_id: format!("{}{}", prefix, rng.gen_range(100..10_000)),
                aircraft_type: aircraft_type.to_string(),
                altitude_ft: rng.gen_range(status.altitude_band_ft()),
                ground_speed_kt,
                heading_deg,
                coordinates: geo::interpolate(dep, arr, progress_pct / 100.0),
                status,
                progress_pct,
                eta: eta_for(now, remaining_nm, ground_speed_kt),
                is_live_sourced: false,
            }
        })
        .collect()
}
