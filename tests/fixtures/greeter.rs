#![allow(dead_code)]

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

/// Greets someone by name.
/// @bridge
pub fn greet(name: &str) -> String {
    format!("Hello, {name}!")
}

/// @bridge
pub fn distance(Point { x, y }: Point, (dx, _): (i64, i64)) -> i64 {
    (x + dx).abs() + y.abs()
}

/// @bridge
pub fn parse_port(text: &str) -> Result<u16, String> {
    text.parse::<u16>().map_err(|err| err.to_string())
}

/// @-bridge
pub fn untouched() -> u8 {
    7
}
