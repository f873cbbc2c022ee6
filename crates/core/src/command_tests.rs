// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    trace = { "Trace", LogLevel::Trace },
    lowercase = { "debug", LogLevel::Debug },
    shouting = { "WARNING", LogLevel::Warning },
    padded = { "  Error ", LogLevel::Error },
    critical = { "Critical", LogLevel::Critical },
)]
fn parses_level_names(input: &str, expected: LogLevel) {
    assert_eq!(input.parse::<LogLevel>(), Ok(expected));
}

#[parameterized(
    empty = { "" },
    abbreviation = { "Info" },
    numeric = { "3" },
)]
fn rejects_unknown_levels(input: &str) {
    let err = input.parse::<LogLevel>().unwrap_err();
    assert_eq!(err, ParseLevelError(input.to_string()));
}

#[test]
fn display_round_trips_through_parse() {
    for level in LogLevel::ALL {
        assert_eq!(level.to_string().parse::<LogLevel>(), Ok(level));
    }
}

#[test]
fn create_log_deserializes_from_wire_shape() {
    let json = r#"{"client_id":"c-1","level":"Trace","message":"Q"}"#;
    let cmd: CreateLog = serde_json::from_str(json).unwrap();
    assert_eq!(cmd, CreateLog::new("c-1", "Trace", "Q"));
}
