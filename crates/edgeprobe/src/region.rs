//! Logical monitoring regions and the edge colo lookup table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A logical geographic vantage point that results are reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    UsEast,
    UsWest,
    EuWest,
    EuCentral,
    ApSoutheast,
    ApNortheast,
    SaEast,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown region: {0}")]
pub struct UnknownRegion(pub String);

impl Region {
    pub const ALL: [Region; 7] = [
        Region::UsEast,
        Region::UsWest,
        Region::EuWest,
        Region::EuCentral,
        Region::ApSoutheast,
        Region::ApNortheast,
        Region::SaEast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::UsEast => "us-east",
            Region::UsWest => "us-west",
            Region::EuWest => "eu-west",
            Region::EuCentral => "eu-central",
            Region::ApSoutheast => "ap-southeast",
            Region::ApNortheast => "ap-northeast",
            Region::SaEast => "sa-east",
        }
    }

    /// Translate an edge point of presence (IATA-style colo code) into the
    /// logical region it belongs to.
    pub fn from_colo(colo: &str) -> Option<Region> {
        let region = match colo.trim().to_ascii_uppercase().as_str() {
            // North America, east and central
            "IAD" | "EWR" | "ATL" | "MIA" | "BOS" | "ORD" | "DFW" | "YYZ" | "YUL" | "CLT" => {
                Region::UsEast
            }

            // North America, west
            "SJC" | "LAX" | "SEA" | "DEN" | "PHX" | "SLC" | "YVR" | "PDX" | "LAS" => Region::UsWest,

            // Western Europe
            "LHR" | "CDG" | "AMS" | "DUB" | "MAD" | "LIS" | "BRU" | "MAN" | "MRS" => Region::EuWest,

            // Central and northern Europe
            "FRA" | "MUC" | "WAW" | "VIE" | "ZRH" | "ARN" | "CPH" | "PRG" | "HAM" | "OSL"
            | "HEL" | "MXP" => Region::EuCentral,

            // South and south-east Asia, Oceania
            "SIN" | "SYD" | "MEL" | "BOM" | "DEL" | "HKG" | "KUL" | "BKK" | "CGK" | "MNL"
            | "AKL" => Region::ApSoutheast,

            // North-east Asia
            "NRT" | "HND" | "KIX" | "ICN" | "TPE" => Region::ApNortheast,

            // South America
            "GRU" | "GIG" | "EZE" | "SCL" | "BOG" | "LIM" => Region::SaEast,

            _ => return None,
        };
        Some(region)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = UnknownRegion;

    /// Accepts `us-east`, `US_EAST` and `US-EAST` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Region::ALL
            .into_iter()
            .find(|region| region.as_str() == normalized)
            .ok_or_else(|| UnknownRegion(s.to_string()))
    }
}
