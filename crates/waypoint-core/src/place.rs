use std::fmt;

use serde::{Deserialize, Serialize};

/// Geographic position in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    /// Build a position from the radian values reported by the simulator.
    pub fn from_radians(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: latitude.to_degrees(),
            longitude: longitude.to_degrees(),
        }
    }
}

/// The `address` object of a reverse-geocoding response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Human-readable location label, e.g. "Philadelphia, Pennsylvania, USA".
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Place(String);

impl Place {
    /// Join the administrative levels of an address. Returns `None` without a city.
    pub fn from_address(address: &Address) -> Option<Self> {
        let city = address.city.as_deref().filter(|c| !c.trim().is_empty())?;
        let parts: Vec<&str> = [Some(city), address.state.as_deref(), address.country.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        Some(Self(parts.join(", ")))
    }

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
