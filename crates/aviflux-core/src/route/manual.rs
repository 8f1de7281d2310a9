// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use super::RouteCodes;
use regex::Regex;
use std::sync::OnceLock;

static SEPARATORS: OnceLock<Regex> = OnceLock::new();

fn separators() -> &'static Regex {
    SEPARATORS.get_or_init(|| Regex::new(r"[\s,\-]+").expect("separator pattern is valid"))
}

/// Splits free text such as `"KJFK-KORD, KLAX"` into route codes.
///
/// Codes are uppercased but not checked against any directory. Fewer than two
/// codes means there is no route to fly and yields `None`.
pub fn parse_route_text(text: &str) -> Option<RouteCodes> {
    let codes: Vec<String> = separators()
        .split(text.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_uppercase())
        .collect();

    match codes.as_slice() {
        [departure, middle @ .., arrival] => Some(RouteCodes {
            departure: departure.clone(),
            arrival: arrival.clone(),
            waypoints: middle.to_vec(),
        }),
        _ => None,
    }
}
