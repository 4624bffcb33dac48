use crate::config::ConfigError;

use serde::Deserialize;
use thiserror::Error;
use time::{Date, OffsetDateTime};

use std::fmt;
use std::str::FromStr;

const KELVIN_OFFSET: f64 = 273.15;

/// The scale temperatures are shown in. Provider readings are always Kelvin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a Kelvin reading into this unit without rounding
    pub fn from_kelvin(&self, kelvin: f64) -> f64 {
        let celsius = kelvin - KELVIN_OFFSET;
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemperatureUnit::Celsius => write!(f, "Celsius"),
            TemperatureUnit::Fahrenheit => write!(f, "Fahrenheit"),
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "celsius" => Ok(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(ConfigError::UnknownUnit(s.to_string())),
        }
    }
}

impl TryFrom<String> for TemperatureUnit {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Round to one decimal place, correctly rounded on the exact binary value with ties to even
pub fn round_to_tenth(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}

/// A single 3-hour forecast reading as reported by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSample {
    /// Seconds since the epoch, UTC
    pub timestamp: i64,
    /// Kelvin
    pub temp_min: Option<f64>,
    /// Kelvin
    pub temp_max: Option<f64>,
}

/// The temperature range for one calendar day, in the display unit
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate {
    pub date: Date,
    pub min_temp: f64,
    pub max_temp: f64,
}

/// Fold forecast samples into one min/max entry per UTC date.
///
/// Entries come out in the order their dates were first seen in `samples`. Samples missing either
/// temperature contribute nothing, so a date whose samples are all incomplete never shows up.
pub fn aggregate(samples: &[ForecastSample], unit: TemperatureUnit) -> Vec<DailyAggregate> {
    let mut days: Vec<DailyAggregate> = Vec::new();

    for sample in samples {
        let (Some(temp_min), Some(temp_max)) = (sample.temp_min, sample.temp_max) else {
            debug!("Skipping sample at {} with missing temperature", sample.timestamp);
            continue;
        };
        let date = match OffsetDateTime::from_unix_timestamp(sample.timestamp) {
            Ok(dt) => dt.date(),
            Err(err) => {
                warn!("Skipping sample with invalid timestamp {}: {err}", sample.timestamp);
                continue;
            }
        };

        let temp_min = round_to_tenth(unit.from_kelvin(temp_min));
        let temp_max = round_to_tenth(unit.from_kelvin(temp_max));

        // a 5 day forecast only ever has a handful of dates, so a linear probe keeps insertion order
        let idx = match days.iter().position(|day| day.date == date) {
            Some(idx) => idx,
            None => {
                days.push(DailyAggregate {
                    date,
                    min_temp: f64::INFINITY,
                    max_temp: f64::NEG_INFINITY,
                });
                days.len() - 1
            }
        };
        let day = &mut days[idx];
        day.min_temp = day.min_temp.min(temp_min);
        day.max_temp = day.max_temp.max(temp_max);
    }

    days
}

/// No sample in the forecast carried both a minimum and a maximum temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no temperature data available")]
pub struct EmptyForecast;

/// Aggregated daily temperatures for one place, ready to be charted
#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    pub place: String,
    pub unit: TemperatureUnit,
    pub days: Vec<DailyAggregate>,
}

impl DailyForecast {
    /// Aggregate the samples, failing if not a single day could be built
    pub fn from_samples(
        place: String,
        samples: &[ForecastSample],
        unit: TemperatureUnit,
    ) -> Result<DailyForecast, EmptyForecast> {
        let days = aggregate(samples, unit);
        if days.is_empty() {
            return Err(EmptyForecast);
        }

        Ok(DailyForecast { place, unit, days })
    }

    pub fn min_temps(&self) -> Vec<f64> {
        self.days.iter().map(|day| day.min_temp).collect()
    }

    pub fn max_temps(&self) -> Vec<f64> {
        self.days.iter().map(|day| day.max_temp).collect()
    }
}
