use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

/// A city as listed by the backend's `/cities` resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    /// Integer key as the backend issues it; a response with non-numeric
    /// ids fails to parse as a whole.
    pub id: i64,
    pub name: String,
}

/// One data point returned by `/weather`.
///
/// `date` is kept as the server sent it; the client never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub date: String,
    pub temperature_c: f64,
    pub temperature_f: f64,
}

/// Temperature unit choice. Exactly one is always selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Metric,
    Imperial,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Metric => "metric",
            Unit::Imperial => "imperial",
        }
    }

    pub const fn all() -> &'static [Unit] {
        &[Unit::Metric, Unit::Imperial]
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Unit {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" => Ok(Unit::Metric),
            "imperial" => Ok(Unit::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown unit '{value}'. Supported units: metric, imperial."
            )),
        }
    }
}

/// Query parameters for `/weather`, captured from the form at trigger time.
///
/// Values are not validated: an empty `city_id` or a malformed date goes
/// to the backend as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    pub city_id: String,
    pub start_date: String,
    pub end_date: String,
    pub unit: Unit,
}

impl WeatherQuery {
    /// Parameters in the order the backend documents them.
    pub fn params(&self) -> [(&'static str, &str); 4] {
        [
            ("city_id", self.city_id.as_str()),
            ("start_date", self.start_date.as_str()),
            ("end_date", self.end_date.as_str()),
            ("unit", self.unit.as_str()),
        ]
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CityCreate<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshPayload<'a> {
    pub city_name: &'a str,
}
