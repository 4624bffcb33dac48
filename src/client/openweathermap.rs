use crate::client::{ConditionOutlook, CurrentConditions, FetchError, Forecast, WeatherClient};
use crate::forecast::ForecastSample;

use reqwest::blocking::{Client, ClientBuilder};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;

use std::ops::RangeInclusive;
use std::time::Duration;

const API_KEY_PARAM: &str = "appid";

// Weather condition code groups, see https://openweathermap.org/weather-conditions
const RAIN_CODES: &[RangeInclusive<u16>] = &[300..=321, 500..=531];
const CLEAR_CODES: &[RangeInclusive<u16>] = &[800..=800];
const CLOUD_CODES: &[RangeInclusive<u16>] = &[801..=804];
const FOG_CODES: &[RangeInclusive<u16>] = &[741..=741];
const SNOW_CODES: &[RangeInclusive<u16>] = &[600..=622];
const TORNADO_CODES: &[RangeInclusive<u16>] = &[781..=781, 900..=900];
const STORM_CODES: &[RangeInclusive<u16>] = &[901..=901, 960..=961];
const HURRICANE_CODES: &[RangeInclusive<u16>] = &[902..=902, 962..=962];

pub struct OpenWeatherMapClient {
    api_key: String,
    base_url: String,
    http_client: Client,
}

impl OpenWeatherMapClient {
    pub fn new(
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<OpenWeatherMapClient, FetchError> {
        let http_client = ClientBuilder::new()
            .gzip(true)
            .timeout(timeout)
            .build()
            .map_err(|err| FetchError::Transport(format!("unable to construct HTTP client: {err}")))?;

        Ok(OpenWeatherMapClient {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Call an OpenWeatherMap endpoint for a place and deserialize the JSON body
    fn get_from_api<R: DeserializeOwned>(&self, endpoint: &str, place: &str) -> Result<R, FetchError> {
        let place = place.trim();
        if place.is_empty() {
            return Err(FetchError::PlaceNotFound(place.to_string()));
        }

        let req = self
            .http_client
            .get(format!("{}/{endpoint}", self.base_url))
            .query(&[("q", place), (API_KEY_PARAM, self.api_key.as_str())])
            .build()
            .map_err(|err| FetchError::Transport(format!("unable to construct request: {err}")))?;
        info!("Calling OpenWeatherMap: {}", redacted(req.url()));

        let res = self
            .http_client
            .execute(req)
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        let status = res.status();
        let body = res
            .text()
            .map_err(|err| FetchError::Transport(format!("unable to read response body: {err}")))?;

        match status {
            StatusCode::OK => {
                serde_json::from_str(&body).map_err(|err| FetchError::Malformed(err.to_string()))
            }
            StatusCode::NOT_FOUND => Err(FetchError::PlaceNotFound(place.to_string())),
            StatusCode::UNAUTHORIZED => Err(FetchError::Unauthorized),
            s => {
                let message = serde_json::from_str::<ApiError>(&body)
                    .ok()
                    .and_then(|err| err.message)
                    .unwrap_or_else(|| s.canonical_reason().unwrap_or("unknown error").to_string());
                warn!("OpenWeatherMap returned status {s} for {endpoint}: {message}");
                Err(FetchError::Status {
                    status: s.as_u16(),
                    message,
                })
            }
        }
    }
}

impl WeatherClient for OpenWeatherMapClient {
    fn get_forecast(&self, place: &str) -> Result<Forecast, FetchError> {
        let response: ForecastResponse = self.get_from_api("forecast", place)?;
        Ok(response.into_forecast(place))
    }

    fn get_current(&self, place: &str) -> Result<CurrentConditions, FetchError> {
        let response: CurrentResponse = self.get_from_api("weather", place)?;
        response.into_current()
    }
}

/// Copy of a request URL with the API key masked, safe to write to the log
fn redacted(url: &Url) -> Url {
    let mut out = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            if k == API_KEY_PARAM {
                (k.into_owned(), "***".to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();
    out.query_pairs_mut().clear().extend_pairs(pairs);
    out
}

fn matches_any(code: u16, groups: &[RangeInclusive<u16>]) -> bool {
    groups.iter().any(|group| group.contains(&code))
}

fn timestamp_to_utc(timestamp: i64) -> Result<OffsetDateTime, FetchError> {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|err| FetchError::Malformed(format!("invalid timestamp {timestamp}: {err}")))
}

/// Body of a non-200 response, ie `{"cod": "404", "message": "city not found"}`
#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

/// Response of the `forecast` endpoint
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastItem>,
    city: Option<City>,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt: i64,
    #[serde(default)]
    main: Option<MainTemps>,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainTemps {
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    humidity: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    id: u16,
}

#[derive(Debug, Deserialize)]
struct City {
    name: Option<String>,
    country: Option<String>,
}

impl ForecastResponse {
    fn into_forecast(self, queried: &str) -> Forecast {
        let codes: Vec<u16> = self
            .list
            .iter()
            .filter_map(|item| item.weather.first().map(|c| c.id))
            .collect();
        let any = |groups: &[RangeInclusive<u16>]| codes.iter().any(|&code| matches_any(code, groups));
        let conditions = ConditionOutlook {
            rain: any(RAIN_CODES),
            clear: any(CLEAR_CODES),
            fog: any(FOG_CODES),
            clouds: any(CLOUD_CODES),
            snow: any(SNOW_CODES),
            storm: any(STORM_CODES),
            tornado: any(TORNADO_CODES),
            hurricane: any(HURRICANE_CODES),
        };

        let place = match self.city {
            Some(City {
                name: Some(name),
                country: Some(country),
            }) if !country.is_empty() => format!("{name}, {country}"),
            Some(City { name: Some(name), .. }) => name,
            _ => queried.trim().to_string(),
        };

        let samples = self
            .list
            .into_iter()
            .map(|item| ForecastSample {
                timestamp: item.dt,
                temp_min: item.main.as_ref().and_then(|m| m.temp_min),
                temp_max: item.main.as_ref().and_then(|m| m.temp_max),
            })
            .collect();

        Forecast {
            place,
            samples,
            conditions,
        }
    }
}

/// Response of the `weather` endpoint
#[derive(Debug, Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    main: Option<MainTemps>,
    #[serde(default)]
    wind: Option<Wind>,
    #[serde(default)]
    clouds: Option<Clouds>,
    sys: Sys,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Clouds {
    all: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct Sys {
    sunrise: i64,
    sunset: i64,
}

impl CurrentResponse {
    fn into_current(self) -> Result<CurrentConditions, FetchError> {
        Ok(CurrentConditions {
            cloud_coverage: self.clouds.and_then(|c| c.all).unwrap_or(0),
            wind_speed: self.wind.and_then(|w| w.speed).unwrap_or(0.0),
            humidity: self.main.and_then(|m| m.humidity).unwrap_or(0),
            sunrise: timestamp_to_utc(self.sys.sunrise)?,
            sunset: timestamp_to_utc(self.sys.sunset)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use time::macros::datetime;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn forecast_body() -> serde_json::Value {
        json!({
            "cod": "200",
            "message": 0,
            "cnt": 3,
            "list": [
                {
                    "dt": 1709251200,
                    "main": {"temp": 283.1, "temp_min": 280.0, "temp_max": 290.0, "humidity": 71},
                    "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
                    "clouds": {"all": 90},
                    "wind": {"speed": 4.1, "deg": 200},
                    "dt_txt": "2024-03-01 00:00:00"
                },
                {
                    "dt": 1709262000,
                    "main": {"temp": 284.0, "temp_min": 278.0},
                    "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}],
                    "dt_txt": "2024-03-01 03:00:00"
                },
                {
                    "dt": 1709337600,
                    "main": {"temp": 290.0, "temp_min": 285.0, "temp_max": 295.0},
                    "weather": [{"id": 741, "main": "Fog", "description": "fog", "icon": "50d"}],
                    "dt_txt": "2024-03-02 00:00:00"
                }
            ],
            "city": {"id": 2643743, "name": "London", "country": "GB", "sunrise": 1709275000, "sunset": 1709315000}
        })
    }

    fn current_body() -> serde_json::Value {
        json!({
            "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
            "main": {"temp": 282.5, "temp_min": 281.0, "temp_max": 284.0, "humidity": 81},
            "wind": {"speed": 3.6, "deg": 250},
            "clouds": {"all": 20},
            "dt": 1709290000,
            "sys": {"country": "GB", "sunrise": 1709275236, "sunset": 1709315023},
            "name": "London",
            "cod": 200
        })
    }

    #[test]
    fn converts_forecast_response() {
        let response: ForecastResponse = serde_json::from_value(forecast_body()).unwrap();

        let forecast = response.into_forecast("london");

        assert_eq!(forecast.place, "London, GB");
        assert_eq!(
            forecast.samples,
            vec![
                ForecastSample {
                    timestamp: 1709251200,
                    temp_min: Some(280.0),
                    temp_max: Some(290.0),
                },
                ForecastSample {
                    timestamp: 1709262000,
                    temp_min: Some(278.0),
                    temp_max: None,
                },
                ForecastSample {
                    timestamp: 1709337600,
                    temp_min: Some(285.0),
                    temp_max: Some(295.0),
                },
            ]
        );
        assert_eq!(
            forecast.conditions,
            ConditionOutlook {
                rain: true,
                clouds: true,
                fog: true,
                ..ConditionOutlook::default()
            }
        );
    }

    #[test]
    fn falls_back_to_queried_place() {
        let response: ForecastResponse =
            serde_json::from_value(json!({"list": [], "city": null})).unwrap();

        let forecast = response.into_forecast("  Springfield ");

        assert_eq!(forecast.place, "Springfield");
        assert!(forecast.samples.is_empty());
        assert_eq!(forecast.conditions, ConditionOutlook::default());
    }

    #[test]
    fn only_primary_weather_entry_counts() {
        let response: ForecastResponse = serde_json::from_value(json!({
            "list": [{
                "dt": 1709251200,
                "main": {"temp_min": 270.0, "temp_max": 275.0},
                "weather": [
                    {"id": 500, "main": "Rain", "description": "light rain"},
                    {"id": 600, "main": "Snow", "description": "light snow"}
                ]
            }],
            "city": {"name": "Oslo", "country": "NO"}
        }))
        .unwrap();

        let forecast = response.into_forecast("oslo");

        assert!(forecast.conditions.rain);
        assert!(!forecast.conditions.snow);
    }

    #[test]
    fn classifies_condition_codes() {
        assert!(matches_any(301, RAIN_CODES));
        assert!(matches_any(531, RAIN_CODES));
        assert!(!matches_any(200, RAIN_CODES));
        assert!(matches_any(800, CLEAR_CODES));
        assert!(!matches_any(801, CLEAR_CODES));
        assert!(matches_any(781, TORNADO_CODES));
        assert!(matches_any(961, STORM_CODES));
        assert!(matches_any(962, HURRICANE_CODES));
        assert!(matches_any(622, SNOW_CODES));
    }

    #[test]
    fn converts_current_response() {
        let response: CurrentResponse = serde_json::from_value(current_body()).unwrap();

        let current = response.into_current().unwrap();

        assert_eq!(
            current,
            CurrentConditions {
                cloud_coverage: 20,
                wind_speed: 3.6,
                humidity: 81,
                sunrise: datetime!(2024-03-01 06:40:36 UTC),
                sunset: datetime!(2024-03-01 17:43:43 UTC),
            }
        );
    }

    #[test]
    fn missing_wind_defaults_to_zero() {
        let response: CurrentResponse = serde_json::from_value(json!({
            "main": {"humidity": 50},
            "clouds": {"all": 75},
            "sys": {"sunrise": 0, "sunset": 3600}
        }))
        .unwrap();

        let current = response.into_current().unwrap();

        assert_eq!(current.wind_speed, 0.0);
        assert_eq!(current.cloud_coverage, 75);
    }

    #[test]
    fn masks_api_key_in_logged_url() {
        let url = Url::parse("https://example.com/data/2.5/forecast?q=Paris&appid=secret").unwrap();
        let masked = redacted(&url);
        assert_eq!(masked.as_str(), "https://example.com/data/2.5/forecast?q=Paris&appid=***");
    }

    /// Run a blocking client call against the mock server off the async runtime
    async fn call<T, F>(server: &MockServer, f: F) -> Result<T, FetchError>
    where
        T: Send + 'static,
        F: FnOnce(&OpenWeatherMapClient) -> Result<T, FetchError> + Send + 'static,
    {
        let base_url = format!("{}/data/2.5", server.uri());
        tokio::task::spawn_blocking(move || {
            let client =
                OpenWeatherMapClient::new("test-key".to_string(), base_url, Duration::from_secs(5))?;
            f(&client)
        })
        .await
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetches_forecast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .and(query_param("q", "London"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .expect(1)
            .mount(&server)
            .await;

        let forecast = call(&server, |c| c.get_forecast("London")).await.unwrap();

        assert_eq!(forecast.place, "London, GB");
        assert_eq!(forecast.samples.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetches_current_conditions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "London"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .mount(&server)
            .await;

        let current = call(&server, |c| c.get_current("London")).await.unwrap();

        assert_eq!(current.humidity, 81);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_city_is_place_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"cod": "404", "message": "city not found"})),
            )
            .mount(&server)
            .await;

        let res = call(&server, |c| c.get_forecast("Atlantis")).await;

        assert!(matches!(res, Err(FetchError::PlaceNotFound(p)) if p == "Atlantis"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn bad_key_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"cod": 401, "message": "Invalid API key"})))
            .mount(&server)
            .await;

        let res = call(&server, |c| c.get_current("London")).await;

        assert!(matches!(res, Err(FetchError::Unauthorized)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn other_status_carries_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"cod": "500", "message": "internal error"})))
            .mount(&server)
            .await;

        let res = call(&server, |c| c.get_forecast("London")).await;

        match res {
            Err(FetchError::Status { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "internal error");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn garbage_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let res = call(&server, |c| c.get_forecast("London")).await;

        assert!(matches!(res, Err(FetchError::Malformed(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blank_place_never_hits_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .expect(0)
            .mount(&server)
            .await;

        let res = call(&server, |c| c.get_forecast("   ")).await;

        assert!(matches!(res, Err(FetchError::PlaceNotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_host_is_transport_error() {
        // nothing listens on the port once the server is gone
        let base_url = {
            let server = MockServer::start().await;
            format!("{}/data/2.5", server.uri())
        };

        let res = tokio::task::spawn_blocking(move || {
            let client = OpenWeatherMapClient::new("k".to_string(), base_url, Duration::from_secs(2))?;
            client.get_forecast("London")
        })
        .await
        .unwrap();

        assert!(matches!(res, Err(FetchError::Transport(_))));
    }
}
