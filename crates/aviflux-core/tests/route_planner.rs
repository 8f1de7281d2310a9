// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use aviflux_core::geo;
use aviflux_core::route::RouteGeometry;
use aviflux_core::{
    parse_route_text, Airport, AirportDirectory, PlannerOptions, RouteCodes, RouteError,
    RoutePlanner,
};

const NO_WAYPOINTS: &[&str] = &[];

#[test]
fn test_single_code_is_insufficient() {
    let planner = RoutePlanner::new(AirportDirectory::builtin());
    assert_eq!(
        planner.plan_codes(&["KJFK"]).unwrap_err(),
        RouteError::InsufficientAirports
    );
    assert_eq!(
        planner.plan_route("KJFK", "  ", NO_WAYPOINTS).unwrap_err(),
        RouteError::InsufficientAirports
    );
}

#[test]
fn test_unknown_code_is_rejected() {
    let planner = RoutePlanner::new(AirportDirectory::builtin());
    assert_eq!(
        planner.plan_codes(&["ZZZZ", "KLAX"]).unwrap_err(),
        RouteError::InvalidCode("ZZZZ".to_string())
    );
    // First unresolved code in flying order wins.
    assert_eq!(
        planner
            .plan_route("KJFK", "QQQQ", &["XXXX"])
            .unwrap_err(),
        RouteError::InvalidCode("XXXX".to_string())
    );
}

#[test]
fn test_metrics_match_geodesy() -> anyhow::Result<()> {
    let dir = AirportDirectory::builtin();
    let planned = RoutePlanner::new(dir).plan_codes(&["KJFK", "KORD", "KLAX"])?;

    let path: Vec<_> = ["KJFK", "KORD", "KLAX"]
        .iter()
        .filter_map(|c| dir.lookup(c))
        .map(Airport::coordinate)
        .collect();
    let expected = geo::route_distance_nm(&path);

    assert!((planned.metrics.total_distance_nm - expected).abs() < 1e-9);
    assert!((planned.metrics.flight_time_hours - expected / 450.0).abs() < 1e-9);
    assert_eq!(planned.metrics.waypoint_count, 1);

    let seg_total: f64 = planned.segments().iter().map(|s| s.distance_nm).sum();
    assert!((seg_total - expected).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_cruise_speed_is_configurable() -> anyhow::Result<()> {
    let dir = AirportDirectory::builtin();
    let slow = RoutePlanner::with_options(
        dir,
        PlannerOptions {
            cruise_speed_kt: 225.0,
            circular: false,
        },
    )
    .plan_route("EGLL", "LFPG", NO_WAYPOINTS)?;
    let normal = RoutePlanner::new(dir).plan_route("EGLL", "LFPG", NO_WAYPOINTS)?;

    assert!((slow.metrics.flight_time_hours - 2.0 * normal.metrics.flight_time_hours).abs() < 1e-9);
    assert_eq!(slow.metrics.total_distance_nm, normal.metrics.total_distance_nm);
    Ok(())
}

#[test]
fn test_waypoint_repeating_endpoint_is_kept() -> anyhow::Result<()> {
    let planned =
        RoutePlanner::new(AirportDirectory::builtin()).plan_route("KJFK", "KLAX", &["KJFK"])?;
    assert_eq!(planned.route.waypoints.len(), 1);
    assert_eq!(planned.metrics.waypoint_count, 1);
    assert_eq!(planned.segments()[0].distance_nm, 0.0);
    Ok(())
}

#[test]
fn test_geometry_serializes_as_geojson() -> anyhow::Result<()> {
    let planned =
        RoutePlanner::new(AirportDirectory::builtin()).plan_route("VIDP", "VOBL", NO_WAYPOINTS)?;
    let json = serde_json::to_value(planned.geometry())?;

    assert_eq!(json["type"], "LineString");
    let coords = json["coordinates"].as_array().expect("coordinates array");
    assert_eq!(coords.len(), 2);
    // GeoJSON positions are [lng, lat].
    assert_eq!(coords[0][0].as_f64(), Some(77.1));
    assert_eq!(coords[0][1].as_f64(), Some(28.5562));

    let back: RouteGeometry = serde_json::from_value(json)?;
    assert_eq!(back, planned.geometry());
    Ok(())
}

#[test]
fn test_manual_text_plans_like_selected_codes() -> anyhow::Result<()> {
    let planner = RoutePlanner::new(AirportDirectory::builtin());
    let codes = parse_route_text("kjfk, kden - ksfo").expect("three codes");
    let from_text = planner.plan(&codes)?;
    let from_codes = planner.plan(&RouteCodes::new("KJFK", "KSFO").with_waypoints(&["KDEN"]))?;

    assert_eq!(from_text, from_codes);
    assert_eq!(from_text.codes(), codes);
    Ok(())
}

#[test]
fn test_custom_directory_routes() -> anyhow::Result<()> {
    let dir = AirportDirectory::from_airports([
        Airport::new("aaaa", "Alpha", 0.0, 0.0),
        Airport::new("BBBB", "Bravo", 0.0, 1.0),
    ]);
    let planned = RoutePlanner::new(&dir).plan_route("AAAA", "bbbb", NO_WAYPOINTS)?;
    // One degree of longitude on the equator is 60 nm on this sphere.
    assert!((planned.metrics.total_distance_nm - 60.04).abs() < 0.01);
    assert_eq!(planned.viewport.zoom_level, 7);
    Ok(())
}
