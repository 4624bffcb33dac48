use crate::client::{ConditionOutlook, CurrentConditions};
use crate::forecast::DailyForecast;
use crate::grapher::date_label;

use time::OffsetDateTime;
use time::macros::format_description;

/// One line per condition saying whether it shows up in the forecast window
pub fn format_conditions(outlook: &ConditionOutlook) -> Vec<String> {
    outlook
        .entries()
        .iter()
        .map(|(label, will_happen)| {
            let mark = if *will_happen { "✅" } else { "❌" };
            format!("{mark} {label} expected in the next 5 days.")
        })
        .collect()
}

pub fn format_current(current: &CurrentConditions) -> Vec<String> {
    vec![
        format!("☁ Cloud Coverage: {}%", current.cloud_coverage),
        format!("💨 Wind Speed: {} m/s", current.wind_speed),
        format!("💧 Humidity: {}%", current.humidity),
        format!("🌅 Sunrise Time: {}", format_utc(current.sunrise)),
        format!("🌇 Sunset Time: {}", format_utc(current.sunset)),
    ]
}

/// Table of the daily temperatures, one row per day in forecast order
pub fn format_daily_table(forecast: &DailyForecast) -> Vec<String> {
    let symbol = forecast.unit.symbol();
    let mut lines = vec![format!("{:<7}{:>10}{:>10}", "Date", "Min", "Max")];
    lines.extend(forecast.days.iter().map(|day| {
        format!(
            "{:<7}{:>10}{:>10}",
            date_label(day.date),
            format!("{:.1}{symbol}", day.min_temp),
            format!("{:.1}{symbol}", day.max_temp)
        )
    }));
    lines
}

/// Render a UTC time as "2024-03-01 06:40:36 GMT"
fn format_utc(time: OffsetDateTime) -> String {
    time.format(&format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second] GMT"
    ))
    .unwrap_or_else(|_| time.to_string())
}
