//! Turns weather records into container content.

use std::fmt;

use crate::model::WeatherRecord;

pub const NO_DATA_MESSAGE: &str =
    "No weather data available for the selected city and date range.";

/// One rendered record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherBlock {
    pub date: String,
    pub temperature: String,
}

impl WeatherBlock {
    pub fn date_line(&self) -> String {
        format!("Date: {}", self.date)
    }

    pub fn temperature_line(&self) -> String {
        format!("Temperature: {}", self.temperature)
    }
}

/// Everything the weather container can hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ContainerContent {
    /// Nothing fetched yet.
    #[default]
    Blank,
    NoData,
    Records(Vec<WeatherBlock>),
}

impl ContainerContent {
    pub fn blocks(&self) -> &[WeatherBlock] {
        match self {
            ContainerContent::Records(blocks) => blocks,
            _ => &[],
        }
    }

    /// Markup equivalent of the content, values escaped.
    pub fn to_html(&self) -> String {
        match self {
            ContainerContent::Blank => String::new(),
            ContainerContent::NoData => format!("<p>{NO_DATA_MESSAGE}</p>"),
            ContainerContent::Records(blocks) => blocks
                .iter()
                .map(|block| {
                    format!(
                        "<div class=\"weather-item\">\
                         <p><strong>Date:</strong> {}</p>\
                         <p><strong>Temperature:</strong> {}</p>\
                         </div>",
                        escape_html(&block.date),
                        escape_html(&block.temperature),
                    )
                })
                .collect(),
        }
    }
}

impl fmt::Display for ContainerContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerContent::Blank => Ok(()),
            ContainerContent::NoData => writeln!(f, "{NO_DATA_MESSAGE}"),
            ContainerContent::Records(blocks) => {
                for (i, block) in blocks.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    writeln!(f, "{}", block.date_line())?;
                    writeln!(f, "{}", block.temperature_line())?;
                }
                Ok(())
            }
        }
    }
}

/// Render `records` in input order. An empty slice renders the no-data
/// message.
pub fn render(records: &[WeatherRecord]) -> ContainerContent {
    if records.is_empty() {
        return ContainerContent::NoData;
    }

    ContainerContent::Records(
        records
            .iter()
            .map(|record| WeatherBlock {
                date: record.date.clone(),
                temperature: format_temperature(record.temperature_c, record.temperature_f),
            })
            .collect(),
    )
}

/// Uses `f64`'s shortest round-trip form (`10`, `27.5`). Extreme
/// magnitudes print positionally (`1e21` as `1000000000000000000000`),
/// never in exponent notation.
pub fn format_temperature(celsius: f64, fahrenheit: f64) -> String {
    format!("{celsius} °C / {fahrenheit} °F")
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
