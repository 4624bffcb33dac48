use crate::config::ConfigError;
use crate::forecast::DailyForecast;

use plotters::coord::ranged1d::{DefaultFormatting, KeyPointHint, Ranged};
use plotters::coord::types::RangedCoordf64;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::Deserialize;
use thiserror::Error;
use time::Date;
use time::macros::format_description;

use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DARK_BLUE: RGBColor = RGBColor(0, 0, 139);
const ORANGE: RGBColor = RGBColor(255, 165, 0);
const BAR_WIDTH: f64 = 0.35;
const CHART_SIZE: (u32, u32) = (800, 560);

/// How the daily temperatures are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ChartStyle {
    Line,
    Bar,
}

impl fmt::Display for ChartStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartStyle::Line => write!(f, "Line Graph"),
            ChartStyle::Bar => write!(f, "Bar Graph"),
        }
    }
}

impl FromStr for ChartStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(ChartStyle::Line),
            "bar" => Ok(ChartStyle::Bar),
            _ => Err(ConfigError::UnknownChartStyle(s.to_string())),
        }
    }
}

impl TryFrom<String> for ChartStyle {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("nothing to draw")]
    NoData,
    #[error("unable to draw chart: {0}")]
    Drawing(String),
    #[error("unable to write chart to {path:?}: {err}")]
    Write { path: PathBuf, err: std::io::Error },
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for ChartError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        ChartError::Drawing(err.to_string())
    }
}

/// Axis label for a date, ie "03/01"
pub fn date_label(date: Date) -> String {
    date.format(&format_description!("[month]/[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// Draw the daily min/max temperatures of a forecast to an SVG file
pub fn draw_chart(forecast: &DailyForecast, style: ChartStyle, path: &Path) -> Result<(), ChartError> {
    let svg = render_svg(forecast, style)?;
    fs::write(path, svg).map_err(|err| ChartError::Write {
        path: path.to_path_buf(),
        err,
    })?;
    debug!("Wrote {style} for {} to {path:?}", forecast.place);
    Ok(())
}

/// Render the chart as an SVG document.
///
/// Each day gets one slot on the x axis, in the order the days appear in the forecast.
pub fn render_svg(forecast: &DailyForecast, style: ChartStyle) -> Result<String, ChartError> {
    if forecast.days.is_empty() {
        return Err(ChartError::NoData);
    }

    let mins = forecast.min_temps();
    let maxs = forecast.max_temps();
    let labels: Vec<String> = forecast.days.iter().map(|day| date_label(day.date)).collect();

    let (mut low, mut high) = mins
        .iter()
        .chain(maxs.iter())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| (lo.min(t), hi.max(t)));
    if style == ChartStyle::Bar {
        // bars grow from zero
        low = low.min(0.0);
        high = high.max(0.0);
    }
    let padding = if (high - low).abs() > 1e-6 {
        (high - low) * 0.15
    } else {
        1.0
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("Temperature Forecast for {}", forecast.place),
                ("sans-serif", 24),
            )
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(
                DaySlots::new(forecast.days.len()),
                (low - padding)..(high + padding),
            )?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_label_formatter(&|x: &f64| slot_label(&labels, *x))
            .x_desc("Date")
            .y_desc(format!("Temperature ({})", forecast.unit))
            .draw()?;

        match style {
            ChartStyle::Line => {
                for (temps, color, name) in [(&mins, DARK_BLUE, "Min Temp"), (&maxs, ORANGE, "Max Temp")] {
                    chart
                        .draw_series(LineSeries::new(
                            temps.iter().enumerate().map(|(i, t)| (i as f64, *t)),
                            color.stroke_width(2),
                        ))?
                        .label(name)
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
                    chart.draw_series(
                        temps
                            .iter()
                            .enumerate()
                            .map(|(i, t)| Circle::new((i as f64, *t), 4, color.filled())),
                    )?;
                }
            }
            ChartStyle::Bar => {
                let label_style = TextStyle::from(("sans-serif", 13)).pos(Pos::new(HPos::Center, VPos::Bottom));
                for (temps, color, name, offset) in [
                    (&mins, DARK_BLUE, "Min Temp", -BAR_WIDTH / 2.0),
                    (&maxs, ORANGE, "Max Temp", BAR_WIDTH / 2.0),
                ] {
                    chart
                        .draw_series(temps.iter().enumerate().map(|(i, t)| {
                            let center = i as f64 + offset;
                            Rectangle::new(
                                [(center - BAR_WIDTH / 2.0, 0.0), (center + BAR_WIDTH / 2.0, *t)],
                                color.filled(),
                            )
                        }))?
                        .label(name)
                        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
                    chart.draw_series(temps.iter().enumerate().map(|(i, t)| {
                        Text::new(
                            format!("{t}°"),
                            (i as f64 + offset, t.max(0.0) + padding / 4.0),
                            label_style.clone(),
                        )
                    }))?;
                }
            }
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
    }
    Ok(svg)
}

/// X axis with one slot per day, centred on 0, 1, 2, ... and ticked only there
#[derive(Clone)]
struct DaySlots {
    coord: RangedCoordf64,
    count: usize,
}

impl DaySlots {
    fn new(count: usize) -> Self {
        DaySlots {
            coord: (-0.5..count as f64 - 0.5).into(),
            count,
        }
    }
}

impl Ranged for DaySlots {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        self.coord.map(value, limit)
    }

    fn key_points<Hint: KeyPointHint>(&self, _hint: Hint) -> Vec<f64> {
        (0..self.count).map(|i| i as f64).collect()
    }

    fn range(&self) -> Range<f64> {
        self.coord.range()
    }
}

/// Map an x axis position back to the label of the day drawn there
fn slot_label(labels: &[String], x: f64) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}
