// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Great-circle helpers over plain lat/lng coordinates.
//!
//! Everything here is a pure function of its inputs. Distances are nautical
//! miles on a spherical Earth, bearings are degrees clockwise from true north.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// Typical jet cruise speed used when no aircraft-specific figure is known.
pub const DEFAULT_CRUISE_SPEED_KT: f64 = 450.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Haversine distance between two points.
pub fn distance_nm(a: Coordinate, b: Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_NM * c
}

/// Initial bearing from `a` towards `b`, always in `[0, 360)`.
pub fn bearing_deg(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let y = d_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();
    normalize_heading(y.atan2(x).to_degrees())
}

/// Folds any finite angle into `[0, 360)`. Non-finite input maps to 0.
pub fn normalize_heading(deg: f64) -> f64 {
    if !deg.is_finite() {
        return 0.0;
    }
    let mut h = deg % 360.0;
    if h < 0.0 {
        h += 360.0;
    }
    // -1e-15 % 360 + 360 rounds to exactly 360.0
    if h >= 360.0 {
        h = 0.0;
    }
    h
}

/// Sum of leg distances along an ordered path.
pub fn route_distance_nm(waypoints: &[Coordinate]) -> f64 {
    waypoints
        .windows(2)
        .map(|pair| distance_nm(pair[0], pair[1]))
        .sum()
}

pub fn estimated_flight_hours(distance_nm: f64, cruise_speed_kt: f64) -> f64 {
    if cruise_speed_kt <= 0.0 || !cruise_speed_kt.is_finite() {
        return 0.0;
    }
    (distance_nm / cruise_speed_kt).max(0.0)
}

/// Straight lat/lng interpolation. `fraction` is clamped to `[0, 1]`.
pub fn interpolate(a: Coordinate, b: Coordinate, fraction: f64) -> Coordinate {
    let t = fraction.clamp(0.0, 1.0);
    Coordinate {
        lat: a.lat + (b.lat - a.lat) * t,
        lng: a.lng + (b.lng - a.lng) * t,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Smallest box enclosing every point, or `None` for an empty slice.
    pub fn around(points: &[Coordinate]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = Self::new(first.lat, first.lat, first.lng, first.lng);
        for p in &points[1..] {
            bbox.min_lat = bbox.min_lat.min(p.lat);
            bbox.max_lat = bbox.max_lat.max(p.lat);
            bbox.min_lon = bbox.min_lon.min(p.lng);
            bbox.max_lon = bbox.max_lon.max(p.lng);
        }
        Some(bbox)
    }

    /// Grows the box by `margin_deg` on every side, clamped to valid ranges.
    pub fn expand(&self, margin_deg: f64) -> Self {
        Self {
            min_lat: (self.min_lat - margin_deg).max(-90.0),
            max_lat: (self.max_lat + margin_deg).min(90.0),
            min_lon: (self.min_lon - margin_deg).max(-180.0),
            max_lon: (self.max_lon + margin_deg).min(180.0),
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    pub fn center(&self) -> Coordinate {
        Coordinate {
            lat: (self.min_lat + self.max_lat) / 2.0,
            lng: (self.min_lon + self.max_lon) / 2.0,
        }
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }
}

/// Map framing for a set of waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: Coordinate,
    pub zoom_level: u8,
}

/// Span thresholds (degrees) and the zoom level used below each one.
/// Tuned by eye for a slippy map; anything wider than the last step is zoom 2.
const ZOOM_LADDER: [(f64, u8); 5] = [(2.0, 7), (5.0, 6), (10.0, 5), (20.0, 4), (40.0, 3)];
const WIDEST_ZOOM: u8 = 2;

pub fn zoom_for_span(span_deg: f64) -> u8 {
    ZOOM_LADDER
        .iter()
        .find(|(limit, _)| span_deg < *limit)
        .map(|(_, zoom)| *zoom)
        .unwrap_or(WIDEST_ZOOM)
}

pub fn viewport(waypoints: &[Coordinate]) -> Viewport {
    match BoundingBox::around(waypoints) {
        Some(bbox) => Viewport {
            center: bbox.center(),
            zoom_level: zoom_for_span(bbox.lat_span().max(bbox.lon_span())),
        },
        None => Viewport {
            center: Coordinate::new(0.0, 0.0),
            zoom_level: WIDEST_ZOOM,
        },
    }
}
