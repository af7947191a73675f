use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::domain::agent::Position;

/// What a zone is used for
///
/// Producers land on arrival zones after finishing work; reviewers land on
/// drop-off zones after a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ZoneType {
    #[default]
    #[serde(rename = "arrival", alias = "finish")]
    Arrival,
    #[serde(rename = "dropoff")]
    DropOff,
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneType::Arrival => write!(f, "arrival"),
            ZoneType::DropOff => write!(f, "dropoff"),
        }
    }
}

/// A rectangular layout cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub zone_type: ZoneType,
}

impl Zone {
    pub fn new(
        id: impl Into<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        zone_type: ZoneType,
    ) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            x,
            y,
            width,
            height,
            zone_type,
        }
    }

    /// Half-open containment: `[x, x+w) × [y, y+h)`
    pub fn contains(&self, point: &Position) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    pub fn center(&self) -> Position {
        Position::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Checks the zone is usable as layout data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Zone id cannot be empty".to_string());
        }
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(format!(
                "Zone {} must have a positive width and height",
                self.id
            ));
        }
        Ok(())
    }
}

/// Validates a whole layout, including id uniqueness
pub fn validate_layout(zones: &[Zone]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for zone in zones {
        zone.validate()?;
        if !seen.insert(zone.id.as_str()) {
            return Err(format!("Duplicate zone id: {}", zone.id));
        }
    }
    Ok(())
}

/// Layout used until one is saved: six arrival cells along the top edge
pub fn default_zones() -> Vec<Zone> {
    (0..6)
        .map(|i| {
            let mut zone = Zone::new(
                format!("finish-zone-{}", i + 1),
                50.0 + 150.0 * i as f64,
                50.0,
                100.0,
                100.0,
                ZoneType::Arrival,
            );
            zone.label = format!("Finish {}", i + 1);
            zone
        })
        .collect()
}
