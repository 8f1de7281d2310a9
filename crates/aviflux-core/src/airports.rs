// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub code: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Airport {
    pub fn new(code: &str, name: &str, lat: f64, lng: f64) -> Self {
        Self {
            code: normalize_code(code),
            name: name.to_string(),
            lat,
            lng,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Trims and uppercases user input so that " kjfk" and "KJFK" resolve alike.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// A well-formed ICAO-like code: exactly four ASCII letters or digits.
pub fn is_well_formed_code(code: &str) -> bool {
    code.len() == 4 && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// (code, lat, lng, name)
const BUILTIN_AIRPORTS: &[(&str, f64, f64, &str)] = &[
    ("KJFK", 40.6413, -73.7781, "John F. Kennedy International Airport"),
    ("KLAX", 33.9425, -118.4081, "Los Angeles International Airport"),
    ("KORD", 41.9742, -87.9073, "Chicago O'Hare International Airport"),
    ("KDEN", 39.8561, -104.6737, "Denver International Airport"),
    ("KSFO", 37.6213, -122.3790, "San Francisco International Airport"),
    ("KBOS", 42.3656, -71.0096, "Boston Logan International Airport"),
    ("KMIA", 25.7932, -80.2906, "Miami International Airport"),
    ("KIAH", 29.9844, -95.3414, "George Bush Intercontinental Airport"),
    ("VOBL", 13.1979, 77.7063, "Bengaluru International Airport"),
    ("VIDP", 28.5562, 77.1000, "Indira Gandhi International Airport"),
    ("EGLL", 51.4700, -0.4543, "London Heathrow Airport"),
    ("LFPG", 49.0097, 2.5479, "Charles de Gaulle Airport"),
];

static BUILTIN: OnceLock<AirportDirectory> = OnceLock::new();

/// Read-only code → airport table.
#[derive(Debug, Clone, Default)]
pub struct AirportDirectory {
    airports: BTreeMap<String, Airport>,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    code: String,
    name: String,
    lat: f64,
    lng: f64,
}

impl AirportDirectory {
    /// The process-wide built-in directory, built on first use.
    pub fn builtin() -> &'static AirportDirectory {
        BUILTIN.get_or_init(|| {
            Self::from_airports(
                BUILTIN_AIRPORTS
                    .iter()
                    .map(|(code, lat, lng, name)| Airport::new(code, name, *lat, *lng)),
            )
        })
    }

    /// Later entries with the same code replace earlier ones.
    pub fn from_airports<I: IntoIterator<Item = Airport>>(airports: I) -> Self {
        let mut dir = Self::default();
        for apt in airports {
            dir.insert(apt);
        }
        dir
    }

    fn insert(&mut self, mut airport: Airport) {
        airport.code = normalize_code(&airport.code);
        self.airports.insert(airport.code.clone(), airport);
    }

    pub fn lookup(&self, code: &str) -> Option<&Airport> {
        self.airports.get(&normalize_code(code))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.lookup(code).is_some()
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.airports.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Airport> {
        self.airports.values()
    }

    /// Per-code validity: well formed and present in the directory.
    pub fn validate_codes<S: AsRef<str>>(&self, codes: &[S]) -> Vec<(String, bool)> {
        codes
            .iter()
            .map(|c| {
                let code = normalize_code(c.as_ref());
                let ok = is_well_formed_code(&code) && self.contains(&code);
                (code, ok)
            })
            .collect()
    }

    /// Adds `code,name,lat,lng` rows from a CSV file.
    /// Returns the number of rows accepted.
    pub fn extend_from_csv<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, DirectoryError> {
        let file = File::open(path.as_ref())?;
        let added = self.load_csv(file)?;
        log::info!(
            "Loaded {} airports from {}",
            added,
            path.as_ref().display()
        );
        Ok(added)
    }

    pub fn load_csv<R: Read>(&mut self, reader: R) -> Result<usize, DirectoryError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut added = 0;
        for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = match result {
                Ok(r) => r,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    log::warn!("Skipping malformed airport row {}: {}", line + 2, e);
                    continue;
                }
            };

            let code = normalize_code(&row.code);
            if !is_well_formed_code(&code) {
                log::warn!("Skipping airport row {}: bad code '{}'", line + 2, row.code);
                continue;
            }
            if !Coordinate::new(row.lat, row.lng).is_valid() {
                log::warn!(
                    "Skipping airport {}: coordinates out of range ({}, {})",
                    code,
                    row.lat,
                    row.lng
                );
                continue;
            }

            self.insert(Airport::new(&code, row.name.trim(), row.lat, row.lng));
            added += 1;
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_normalizes_input() {
        let dir = AirportDirectory::builtin();
        let jfk = dir.lookup("  kjfk ").unwrap();
        assert_eq!(jfk.code, "KJFK");
        assert_eq!(jfk.lat, 40.6413);
        assert!(dir.lookup("ZZZZ").is_none());
        assert!(dir.lookup("").is_none());
    }

    #[test]
    fn test_builtin_is_complete() {
        let dir = AirportDirectory::builtin();
        assert_eq!(dir.len(), 12);
        assert!(dir.iter().all(|a| a.coordinate().is_valid()));
    }

    #[test]
    fn test_load_csv_skips_bad_rows() {
        let csv_data = "code,name,lat,lng\n\
                        rjtt,Tokyo Haneda,35.5494,139.7798\n\
                        TOOLONG,Bad,1.0,1.0\n\
                        YSSY,Sydney,-33.9399,151.1753\n\
                        XXXX,Nowhere,95.0,0.0\n\
                        KPDX,Portland,not-a-number,0.0\n";
        let mut dir = AirportDirectory::default();
        let added = dir.load_csv(csv_data.as_bytes()).unwrap();
        assert_eq!(added, 2);
        assert_eq!(dir.lookup("RJTT").unwrap().name, "Tokyo Haneda");
        assert!(dir.lookup("YSSY").is_some());
        assert!(dir.lookup("XXXX").is_none());
        assert!(dir.lookup("KPDX").is_none());
    }

    #[test]
    fn test_validate_codes() {
        let dir = AirportDirectory::builtin();
        let results = dir.validate_codes(&["egll", "ZZZZ", "JFK"]);
        assert_eq!(
            results,
            vec![
                ("EGLL".to_string(), true),
                ("ZZZZ".to_string(), false),
                ("JFK".to_string(), false),
            ]
        );
    }
}
