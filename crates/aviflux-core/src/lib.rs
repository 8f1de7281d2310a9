// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

pub mod airports;
pub mod geo;
pub mod route;
pub mod settings;
pub mod tracking;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

pub use airports::{Airport, AirportDirectory, DirectoryError};
pub use geo::{BoundingBox, Coordinate, Viewport};
pub use route::{
    parse_route_text, PlannedRoute, PlannerOptions, Route, RouteCodes, RouteError, RouteMetrics,
    RoutePlanner, RouteSegment,
};
pub use settings::{Settings, SettingsError};
pub use tracking::{
    FeedState, FlightStatus, LiveFlightSnapshot, SnapshotUpdate, TrackingConfig, TrackingEngine,
    TrackingSession, TrackingState,
};

/// Service summary printed by `aviflux health`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub supported_airports: usize,
    pub settings_source: Option<PathBuf>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn new(directory: &AirportDirectory, settings_source: Option<&Path>) -> Self {
        Self {
            status: if directory.is_empty() { "degraded" } else { "healthy" },
            version: env!("CARGO_PKG_VERSION"),
            supported_airports: directory.len(),
            settings_source: settings_source.map(Path::to_path_buf),
            checked_at: Utc::now(),
        }
    }
}
