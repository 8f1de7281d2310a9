// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Route planning: user-entered codes in, validated airports and metrics out.

pub mod manual;

pub use manual::parse_route_text;

use crate::airports::{normalize_code, Airport, AirportDirectory};
use crate::geo::{self, Coordinate, Viewport, DEFAULT_CRUISE_SPEED_KT};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Unknown airport code: {0}")]
    InvalidCode(String),
    #[error("A route needs at least a departure and an arrival airport")]
    InsufficientAirports,
}

/// An ordered, fully resolved route. Never mutated after planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub departure: Airport,
    pub arrival: Airport,
    pub waypoints: Vec<Airport>,
}

impl Route {
    /// Departure, intermediate waypoints, arrival.
    pub fn airports(&self) -> impl Iterator<Item = &Airport> {
        std::iter::once(&self.departure)
            .chain(self.waypoints.iter())
            .chain(std::iter::once(&self.arrival))
    }

    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.airports().map(|a| a.coordinate()).collect()
    }

    pub fn codes(&self) -> RouteCodes {
        RouteCodes {
            departure: self.departure.code.clone(),
            arrival: self.arrival.code.clone(),
            waypoints: self.waypoints.iter().map(|w| w.code.clone()).collect(),
        }
    }
}

/// Code-level view of a route. This is what tracking subscribes to; codes are
/// resolved against the directory each time they are used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteCodes {
    pub departure: String,
    pub arrival: String,
    pub waypoints: Vec<String>,
}

impl RouteCodes {
    pub fn new(departure: &str, arrival: &str) -> Self {
        Self {
            departure: normalize_code(departure),
            arrival: normalize_code(arrival),
            waypoints: Vec::new(),
        }
    }

    pub fn with_waypoints<S: AsRef<str>>(mut self, waypoints: &[S]) -> Self {
        self.waypoints = waypoints
            .iter()
            .map(|w| normalize_code(w.as_ref()))
            .filter(|w| !w.is_empty())
            .collect();
        self
    }

    /// Trims and upper-cases every code and drops blank waypoints.
    pub fn normalized(self) -> Self {
        Self::new(&self.departure, &self.arrival).with_waypoints(&self.waypoints)
    }

    /// All codes in flying order.
    pub fn all(&self) -> Vec<&str> {
        std::iter::once(self.departure.as_str())
            .chain(self.waypoints.iter().map(|w| w.as_str()))
            .chain(std::iter::once(self.arrival.as_str()))
            .collect()
    }
}

impl fmt::Display for RouteCodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.all().join("-"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteMetrics {
    pub total_distance_nm: f64,
    pub flight_time_hours: f64,
    /// Intermediate waypoints only.
    pub waypoint_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub from: String,
    pub to: String,
    pub distance_nm: f64,
    pub bearing_deg: f64,
}

/// GeoJSON `LineString` with `[lng, lat]` positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannerOptions {
    pub cruise_speed_kt: f64,
    /// Close the loop with an arrival → departure leg.
    pub circular: bool,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            cruise_speed_kt: DEFAULT_CRUISE_SPEED_KT,
            circular: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedRoute {
    pub route: Route,
    pub metrics: RouteMetrics,
    pub viewport: Viewport,
    pub circular: bool,
}

impl PlannedRoute {
    /// Flown path, including the closing leg for circular routes.
    fn flown_airports(&self) -> Vec<&Airport> {
        let mut path: Vec<&Airport> = self.route.airports().collect();
        if self.circular {
            path.push(&self.route.departure);
        }
        path
    }

    pub fn segments(&self) -> Vec<RouteSegment> {
        self.flown_airports()
            .windows(2)
            .map(|leg| {
                let (a, b) = (leg[0].coordinate(), leg[1].coordinate());
                RouteSegment {
                    from: leg[0].code.clone(),
                    to: leg[1].code.clone(),
                    distance_nm: geo::distance_nm(a, b),
                    bearing_deg: geo::bearing_deg(a, b),
                }
            })
            .collect()
    }

    pub fn geometry(&self) -> RouteGeometry {
        RouteGeometry {
            kind: "LineString".to_string(),
            coordinates: self
                .flown_airports()
                .iter()
                .map(|a| [a.lng, a.lat])
                .collect(),
        }
    }

    pub fn codes(&self) -> RouteCodes {
        self.route.codes()
    }
}

pub struct RoutePlanner<'a> {
    directory: &'a AirportDirectory,
    options: PlannerOptions,
}

impl<'a> RoutePlanner<'a> {
    pub fn new(directory: &'a AirportDirectory) -> Self {
        Self::with_options(directory, PlannerOptions::default())
    }

    pub fn with_options(directory: &'a AirportDirectory, options: PlannerOptions) -> Self {
        Self { directory, options }
    }

    pub fn plan_route<S: AsRef<str>>(
        &self,
        departure: &str,
        arrival: &str,
        waypoints: &[S],
    ) -> Result<PlannedRoute, RouteError> {
        let dep_code = normalize_code(departure);
        let arr_code = normalize_code(arrival);
        if dep_code.is_empty() || arr_code.is_empty() {
            return Err(RouteError::InsufficientAirports);
        }

        let departure = self.resolve(&dep_code)?;
        let waypoints = waypoints
            .iter()
            .map(|w| normalize_code(w.as_ref()))
            .filter(|w| !w.is_empty())
            .map(|w| self.resolve(&w))
            .collect::<Result<Vec<_>, _>>()?;
        let arrival = self.resolve(&arr_code)?;

        // Waypoints repeating the endpoints are kept as entered.
        for wp in &waypoints {
            if wp.code == departure.code || wp.code == arrival.code {
                log::debug!("Waypoint {} repeats a route endpoint", wp.code);
            }
        }

        let route = Route {
            departure,
            arrival,
            waypoints,
        };
        Ok(self.measure(route))
    }

    /// Plans from a flat list: first code departs, last code arrives.
    pub fn plan_codes<S: AsRef<str>>(&self, codes: &[S]) -> Result<PlannedRoute, RouteError> {
        let codes: Vec<String> = codes
            .iter()
            .map(|c| normalize_code(c.as_ref()))
            .filter(|c| !c.is_empty())
            .collect();
        match codes.as_slice() {
            [departure, middle @ .., arrival] => self.plan_route(departure, arrival, middle),
            _ => Err(RouteError::InsufficientAirports),
        }
    }

    pub fn plan(&self, codes: &RouteCodes) -> Result<PlannedRoute, RouteError> {
        self.plan_route(&codes.departure, &codes.arrival, &codes.waypoints)
    }

    fn resolve(&self, code: &str) -> Result<Airport, RouteError> {
        self.directory
            .lookup(code)
            .cloned()
            .ok_or_else(|| RouteError::InvalidCode(code.to_string()))
    }

    fn measure(&self, route: Route) -> PlannedRoute {
        let mut path = route.coordinates();
        let viewport = geo::viewport(&path);
        if self.options.circular {
            path.push(route.departure.coordinate());
        }

        let total_distance_nm = geo::route_distance_nm(&path);
        let metrics = RouteMetrics {
            total_distance_nm,
            flight_time_hours: geo::estimated_flight_hours(
                total_distance_nm,
                self.options.cruise_speed_kt,
            ),
            waypoint_count: route.waypoints.len(),
        };

        log::debug!(
            "Planned {} ({:.0} nm, {:.1} h)",
            route.codes(),
            metrics.total_distance_nm,
            metrics.flight_time_hours
        );

        PlannedRoute {
            route,
            metrics,
            viewport,
            circular: self.options.circular,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_route_builds_ordered_sequence() {
        let planner = RoutePlanner::new(AirportDirectory::builtin());
        let planned = planner.plan_route("kjfk", "KLAX", &["KORD", "kden"]).unwrap();
        let codes: Vec<&str> = planned.route.airports().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, vec!["KJFK", "KORD", "KDEN", "KLAX"]);
        assert_eq!(planned.metrics.waypoint_count, 2);
        assert_eq!(planned.segments().len(), 3);
    }

    #[test]
    fn test_invalid_code_reports_normalized_code() {
        let planner = RoutePlanner::new(AirportDirectory::builtin());
        let err = planner.plan_route("KJFK", "zzzz", &[] as &[&str]).unwrap_err();
        assert_eq!(err, RouteError::InvalidCode("ZZZZ".to_string()));
    }

    #[test]
    fn test_normalized_matches_constructor() {
        let raw = RouteCodes {
            departure: " kjfk".to_string(),
            arrival: "klax ".to_string(),
            waypoints: vec!["kord".to_string(), "  ".to_string()],
        };
        let expected = RouteCodes::new("KJFK", "KLAX").with_waypoints(&["KORD"]);
        assert_eq!(raw.normalized(), expected);
    }

    #[test]
    fn test_blank_waypoints_are_ignored() {
        let planner = RoutePlanner::new(AirportDirectory::builtin());
        let planned = planner.plan_route("KJFK", "KBOS", &["", "  "]).unwrap();
        assert!(planned.route.waypoints.is_empty());
    }

    #[test]
    fn test_circular_adds_closing_leg() {
        let dir = AirportDirectory::builtin();
        let open = RoutePlanner::new(dir)
            .plan_route("KJFK", "KBOS", &[] as &[&str])
            .unwrap();
        let closed = RoutePlanner::with_options(
            dir,
            PlannerOptions {
                circular: true,
                ..PlannerOptions::default()
            },
        )
        .plan_route("KJFK", "KBOS", &[] as &[&str])
        .unwrap();

        assert!(
            (closed.metrics.total_distance_nm - 2.0 * open.metrics.total_distance_nm).abs() < 1e-9
        );
        let segs = closed.segments();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[1].from, "KBOS");
        assert_eq!(segs[1].to, "KJFK");
        assert_eq!(closed.geometry().coordinates.len(), 3);
    }

    #[test]
    fn test_route_codes_display() {
        let codes = RouteCodes::new("kjfk", "klax").with_waypoints(&["kord"]);
        assert_eq!(codes.to_string(), "KJFK-KORD-KLAX");
    }
}
