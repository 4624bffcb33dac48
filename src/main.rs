#![forbid(unsafe_code)]

extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate log;
extern crate reqwest;
extern crate serde;
extern crate time;

#[macro_use]
mod timed;
mod app;
mod client;
mod config;
mod forecast;
mod grapher;
mod report;

use crate::app::{Preferences, interactive, print_report, run_query};
use crate::client::openweathermap::OpenWeatherMapClient;
use crate::config::{Config, Overrides};
use crate::forecast::TemperatureUnit;
use crate::grapher::ChartStyle;

use clap::{Arg, Command};
use env_logger::Env;

use std::io;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

fn main() {
    let env = Env::default().filter_or("FORECAST_LOG_LEVEL", "warn");
    env_logger::init_from_env(env);

    let matches = Command::new("forecast-viewer")
        .version("0.1")
        .author("Chris Lieb")
        .about("5 day weather forecast for a city, charted by daily min/max temperature")
        .arg(
            Arg::new("city")
                .help("City to fetch the forecast for; prompts for cities when omitted"),
        )
        .arg(
            Arg::new("unit")
                .short('u')
                .long("unit")
                .help("Temperature unit: celsius or fahrenheit")
                .value_parser(clap::value_parser!(TemperatureUnit)),
        )
        .arg(
            Arg::new("chart")
                .short('c')
                .long("chart")
                .help("Chart style: line or bar")
                .value_parser(clap::value_parser!(ChartStyle)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Where to write the SVG chart")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Optional JSON config file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .get_matches();

    let overrides = Overrides {
        unit: matches.get_one::<TemperatureUnit>("unit").copied(),
        chart: matches.get_one::<ChartStyle>("chart").copied(),
        output: matches.get_one::<PathBuf>("output").cloned(),
    };
    let config = match Config::load(
        matches.get_one::<PathBuf>("config").map(PathBuf::as_path),
        overrides,
    ) {
        Ok(config) => config,
        Err(err) => {
            error!("Unable to load configuration: {err}");
            eprintln!("{err}");
            process::exit(1);
        }
    };

    let client = match OpenWeatherMapClient::new(
        config.api_key.clone(),
        config.base_url.clone(),
        Duration::from_secs(config.timeout_secs),
    ) {
        Ok(client) => client,
        Err(err) => {
            error!("Unable to set up weather client: {err}");
            eprintln!("{err}");
            process::exit(1);
        }
    };

    let prefs = Preferences {
        unit: config.unit,
        chart: config.chart,
        output: config.output,
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let res = match matches.get_one::<String>("city") {
        Some(city) => {
            let report = run_query(&client, city, &prefs);
            print_report(&report, &prefs, &mut out)
        }
        None => interactive(&client, &prefs, &mut io::stdin().lock(), &mut out),
    };
    if let Err(err) = res {
        error!("Unable to write output: {err}");
        process::exit(1);
    }
}
