use crate::client::{ConditionOutlook, CurrentConditions, FetchError, WeatherClient};
use crate::forecast::{DailyForecast, TemperatureUnit};
use crate::grapher::{ChartError, ChartStyle, draw_chart};
use crate::report::{format_conditions, format_current, format_daily_table};

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Display preferences applied to every query
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub unit: TemperatureUnit,
    pub chart: ChartStyle,
    pub output: PathBuf,
}

/// What happened to the forecast half of a query
#[derive(Debug)]
pub enum ForecastOutcome {
    Charted { daily: DailyForecast, chart: PathBuf },
    /// The place exists but no sample had both temperatures
    NoData { place: String },
    ChartFailed { daily: DailyForecast, err: ChartError },
    FetchFailed(FetchError),
}

/// What happened to the current-conditions half of a query
#[derive(Debug)]
pub enum CurrentOutcome {
    Ready {
        /// Missing when the forecast itself could not be fetched
        outlook: Option<ConditionOutlook>,
        current: CurrentConditions,
    },
    FetchFailed(FetchError),
}

#[derive(Debug)]
pub struct QueryReport {
    pub forecast: ForecastOutcome,
    pub current: CurrentOutcome,
}

/// Run both halves of a query for one place.
///
/// The halves fail independently: a forecast failure still lets current conditions through and
/// the other way around. The forecast is fetched once and its condition outlook reused.
pub fn run_query(client: &dyn WeatherClient, place: &str, prefs: &Preferences) -> QueryReport {
    let fetched = timed!(|| client.get_forecast(place), "Fetching forecast for {}", place);

    let (forecast, outlook) = match fetched {
        Ok(raw) => {
            let outlook = raw.conditions;
            // titled with the city as typed, not the provider's resolved name
            let outcome = match DailyForecast::from_samples(place.trim().to_string(), &raw.samples, prefs.unit) {
                Ok(daily) => match draw_chart(&daily, prefs.chart, &prefs.output) {
                    Ok(()) => ForecastOutcome::Charted {
                        daily,
                        chart: prefs.output.clone(),
                    },
                    Err(err) => {
                        error!("Unable to draw chart to {:?}: {err}", prefs.output);
                        ForecastOutcome::ChartFailed { daily, err }
                    }
                },
                Err(_) => {
                    warn!("No usable temperature data for {}", raw.place);
                    ForecastOutcome::NoData { place: raw.place }
                }
            };
            (outcome, Some(outlook))
        }
        Err(err) => {
            warn!("Forecast fetch for {place} failed: {err}");
            (ForecastOutcome::FetchFailed(err), None)
        }
    };

    let current = match timed!(|| client.get_current(place), "Fetching current weather for {}", place) {
        Ok(current) => CurrentOutcome::Ready { outlook, current },
        Err(err) => {
            warn!("Current weather fetch for {place} failed: {err}");
            CurrentOutcome::FetchFailed(err)
        }
    };

    QueryReport { forecast, current }
}

/// Write the user-facing summary of a query
pub fn print_report(report: &QueryReport, prefs: &Preferences, out: &mut dyn Write) -> io::Result<()> {
    match &report.forecast {
        ForecastOutcome::Charted { daily, chart } => {
            writeln!(out, "Temperature Forecast for {} ({})", daily.place, prefs.unit)?;
            for line in format_daily_table(daily) {
                writeln!(out, "{line}")?;
            }
            writeln!(out, "{} saved to {}", prefs.chart, chart.display())?;
        }
        ForecastOutcome::NoData { .. } => {
            writeln!(out, "Warning: No temperature data available for this city. Try another one!")?;
        }
        ForecastOutcome::ChartFailed { daily, err } => {
            writeln!(out, "Temperature Forecast for {} ({})", daily.place, prefs.unit)?;
            for line in format_daily_table(daily) {
                writeln!(out, "{line}")?;
            }
            writeln!(out, "Error: Unable to draw chart.")?;
            writeln!(out, "Error details: {err}")?;
        }
        ForecastOutcome::FetchFailed(err) => {
            writeln!(
                out,
                "Error: Error fetching weather data. Please check the city name and try again!"
            )?;
            writeln!(out, "Error details: {err}")?;
        }
    }

    writeln!(out)?;
    match &report.current {
        CurrentOutcome::Ready { outlook, current } => {
            writeln!(out, "🌍 Additional Weather Details")?;
            if let Some(outlook) = outlook {
                writeln!(out, "☁ Impending Weather Changes:")?;
                for line in format_conditions(outlook) {
                    writeln!(out, "{line}")?;
                }
            }
            for line in format_current(current) {
                writeln!(out, "{line}")?;
            }
        }
        CurrentOutcome::FetchFailed(err) => {
            writeln!(out, "Error: Error fetching current weather data.")?;
            writeln!(out, "Error details: {err}")?;
        }
    }

    Ok(())
}

/// Prompt for a city per line until EOF or `quit`, running a query for each
pub fn interactive(
    client: &dyn WeatherClient,
    prefs: &Preferences,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> io::Result<()> {
    writeln!(out, "Weather Forecast for 5 Days! 🌦")?;
    writeln!(
        out,
        "Enter a city ({}, {}), or 'quit' to exit.",
        prefs.unit, prefs.chart
    )?;

    let mut line = String::new();
    loop {
        write!(out, "City Name: ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }
        let place = line.trim();
        if place.is_empty() {
            continue;
        }
        if place.eq_ignore_ascii_case("quit") || place.eq_ignore_ascii_case("exit") {
            break;
        }

        let report = run_query(client, place, prefs);
        print_report(&report, prefs, out)?;
        writeln!(out)?;
    }

    Ok(())
}
