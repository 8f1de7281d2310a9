// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use aviflux_core::settings::DEFAULT_PROVIDER_URL;
use aviflux_core::{Settings, SettingsError};
use std::fs;
use std::time::Duration;

#[test]
fn test_missing_file_yields_defaults() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let settings = Settings::load(Some(&temp_dir.path().join("settings.json")))?;

    let defaults = Settings::default();
    assert_eq!(settings.poll_interval_secs, defaults.poll_interval_secs);
    assert_eq!(settings.max_live_flights, 6);
    assert_eq!(settings.synthesized_flights, 3);
    assert!(settings.airports_csv.is_none());
    Ok(())
}

#[test]
fn test_save_then_load() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("nested").join("settings.json");

    let settings = Settings {
        cruise_speed_kt: 480.0,
        poll_interval_secs: 15,
        synthesized_flights: 5,
        airports_csv: Some(temp_dir.path().join("extra.csv")),
        ..Settings::default()
    };
    settings.save(&path)?;

    let loaded = Settings::load(Some(&path))?;
    assert_eq!(loaded.cruise_speed_kt, 480.0);
    assert_eq!(loaded.poll_interval_secs, 15);
    assert_eq!(loaded.synthesized_flights, 5);
    assert_eq!(loaded.airports_csv, settings.airports_csv);

    let cfg = loaded.tracking_config();
    assert_eq!(cfg.poll_interval, Duration::from_secs(15));
    assert_eq!(cfg.audio_interval, Duration::from_secs(2));
    assert_eq!(cfg.cycle_interval, Duration::from_secs(5));
    assert_eq!(cfg.synthesized_flights, 5);
    assert_eq!(loaded.planner_options().cruise_speed_kt, 480.0);
    Ok(())
}

#[test]
fn test_malformed_file_is_an_error() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("settings.json");
    fs::write(&path, "{ not json")?;

    match Settings::load(Some(&path)) {
        Err(SettingsError::Parse { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected parse error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_default_provider_url() {
    assert_eq!(Settings::default().provider_url, DEFAULT_PROVIDER_URL);
    assert_eq!(Settings::default().provider_timeout(), Duration::from_secs(10));
}
