//! Simulation window arithmetic.
//!
//! All windows derive from the date stem of the newest restart file and
//! "yesterday" in mountain time. GridMET publishes against America/Denver;
//! a fixed UTC−7 offset stands in since the toolchain carries no tz
//! database.

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Utc};

/// Mountain Standard Time offset used for "yesterday" calculations.
const MST_SECONDS: i32 = -7 * 3600;

/// Daily operational simulation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationalWindow {
    /// Date stem of the restart file the run initializes from.
    pub restart: NaiveDate,
    /// First simulated day (`restart + 1`).
    pub start: NaiveDate,
    /// Last simulated day.
    pub end: NaiveDate,
    /// Date stem of the restart file written for the next run
    /// (`end − 59 days`, keeping a two-month spin-up margin).
    pub save_restart: NaiveDate,
    /// End of the forecast horizon the daily ETL extracts alongside the
    /// simulation window.
    pub forecast_end: NaiveDate,
}

impl OperationalWindow {
    /// Window for a production run ending at `end` (the newest GridMET day).
    #[must_use]
    pub fn to_end(restart: NaiveDate, end: NaiveDate) -> Self {
        Self {
            restart,
            start: restart + Duration::days(1),
            end,
            save_restart: end - Duration::days(59),
            forecast_end: forecast_horizon(end),
        }
    }

    /// Short window for `--test` runs: `num_days` of simulation, restart
    /// saved at the end of the window. `forecast_end` comes from the
    /// profile override or defaults to the horizon past yesterday.
    #[must_use]
    pub fn for_testing(restart: NaiveDate, num_days: i64, forecast_end: NaiveDate) -> Self {
        let start = restart + Duration::days(1);
        let end = start + Duration::days(num_days);
        Self {
            restart,
            start,
            end,
            save_restart: end,
            forecast_end,
        }
    }
}

/// Sub-seasonal forecast window: 28 simulated days starting the day after
/// the forecast restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastWindow {
    pub restart: NaiveDate,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ForecastWindow {
    /// Window simulating `sim_days` days starting the day after `restart`.
    #[must_use]
    pub fn spanning(restart: NaiveDate, sim_days: i64) -> Self {
        let start = restart + Duration::days(1);
        Self {
            restart,
            start,
            end: start + Duration::days(sim_days - 1),
        }
    }

    /// The 28-day sub-seasonal forecast window.
    #[must_use]
    pub fn from_restart(restart: NaiveDate) -> Self {
        Self::spanning(restart, 28)
    }

    /// The 9-month seasonal forecast window (the CFSv2 seasonal range).
    #[must_use]
    pub fn seasonal(restart: NaiveDate) -> Self {
        Self::spanning(restart, 274)
    }
}

/// Yesterday's date in mountain time.
#[must_use]
pub fn yesterday_mst() -> NaiveDate {
    match FixedOffset::east_opt(MST_SECONDS) {
        Some(offset) => (Utc::now().with_timezone(&offset) - Duration::days(1)).date_naive(),
        // -7h is always a valid offset; fall back to UTC if chrono disagrees.
        None => (Utc::now() - Duration::days(1)).date_naive(),
    }
}

/// Today's date in mountain time — used to stamp archive folders.
#[must_use]
pub fn today_mst() -> NaiveDate {
    yesterday_mst() + Duration::days(1)
}

/// Forecast horizon extracted alongside a daily window (`base + 29 days`,
/// covering the 28-day sub-seasonal span plus the start offset).
#[must_use]
pub fn forecast_horizon(base: NaiveDate) -> NaiveDate {
    base + Duration::days(29)
}

/// Parse a `YYYY-MM-DD` date stem, e.g. from a restart filename.
///
/// # Errors
///
/// Returns an error when the stem is not a valid calendar date.
pub fn parse_date_stem(stem: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(stem.trim(), "%Y-%m-%d")
}

/// Format a date as the `YYYY-MM-DD` form used in filenames and env vars.
#[must_use]
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Format a date as the PRMS control-file time form
/// `YYYY,MM,DD,00,00,00`.
#[must_use]
pub fn control_time(date: NaiveDate) -> String {
    format!(
        "{:04},{:02},{:02},00,00,00",
        date.year(),
        date.month(),
        date.day()
    )
}
