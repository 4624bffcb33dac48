pub mod openweathermap;

use crate::forecast::ForecastSample;

use thiserror::Error;
use time::OffsetDateTime;

/// Something that can answer forecast and current-conditions queries for a named place
pub trait WeatherClient {
    /// Get the 5 day / 3 hour forecast for a place
    fn get_forecast(&self, place: &str) -> Result<Forecast, FetchError>;

    /// Get the conditions at a place right now
    fn get_current(&self, place: &str) -> Result<CurrentConditions, FetchError>;
}

/// Ways a call to the weather provider can fail
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("place not found: {0}")]
    PlaceNotFound(String),
    #[error("the provider rejected the API key")]
    Unauthorized,
    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unable to reach provider: {0}")]
    Transport(String),
    #[error("malformed response from provider: {0}")]
    Malformed(String),
}

/// The raw forecast for one place
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    /// Place name as resolved by the provider, ie "London, GB"
    pub place: String,
    pub samples: Vec<ForecastSample>,
    pub conditions: ConditionOutlook,
}

/// Which kinds of weather show up anywhere in the forecast window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionOutlook {
    pub rain: bool,
    pub clear: bool,
    pub fog: bool,
    pub clouds: bool,
    pub snow: bool,
    pub storm: bool,
    pub tornado: bool,
    pub hurricane: bool,
}

impl ConditionOutlook {
    /// Each condition with its display label, in display order
    pub fn entries(&self) -> [(&'static str, bool); 8] {
        [
            ("Rain", self.rain),
            ("Clear Skies", self.clear),
            ("Fog", self.fog),
            ("Clouds", self.clouds),
            ("Snow", self.snow),
            ("Storm", self.storm),
            ("Tornado", self.tornado),
            ("Hurricane", self.hurricane),
        ]
    }
}

/// Conditions at a place right now
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    /// Percent
    pub cloud_coverage: u8,
    /// Meters per second
    pub wind_speed: f64,
    /// Percent
    pub humidity: u8,
    pub sunrise: OffsetDateTime,
    pub sunset: OffsetDateTime,
}
