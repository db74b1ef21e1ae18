//! GridMET availability gate.
//!
//! The daily pipeline only makes sense once GridMET has published through
//! yesterday. Each aggregate dataset's THREDDS `dataset.xml` carries its
//! end-of-coverage timestamp; all six must agree before a run proceeds.
//! Only the `<end>` element is extracted — no further catalog parsing.

use std::sync::OnceLock;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use regex::Regex;

use crate::dates::parse_date_stem;

/// THREDDS grid-subset service the aggregates are published under.
pub const THREDDS_SERVER: &str = "http://thredds.northwestknowledge.net:8080/thredds/ncss/grid";

/// The forcing datasets the daily pipeline consumes.
pub const DATASETS: &[&str] = &[
    "agg_met_tmmn_1979_CurrentYear_CONUS.nc",
    "agg_met_tmmx_1979_CurrentYear_CONUS.nc",
    "agg_met_pr_1979_CurrentYear_CONUS.nc",
    "agg_met_rmin_1979_CurrentYear_CONUS.nc",
    "agg_met_rmax_1979_CurrentYear_CONUS.nc",
    "agg_met_vs_1979_CurrentYear_CONUS.nc",
];

/// Source of per-dataset coverage end dates. The production implementation
/// queries THREDDS; tests answer from canned dates.
pub trait GridmetCatalog {
    /// Coverage end date of one dataset.
    ///
    /// # Errors
    ///
    /// Fails when the catalog cannot be reached or carries no end date.
    fn end_date(&self, dataset: &str) -> Result<NaiveDate>;
}

/// Catalog backed by the THREDDS HTTP service.
pub struct ThreddsCatalog {
    server: String,
}

impl ThreddsCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            server: THREDDS_SERVER.to_string(),
        }
    }

    /// Point at a different server (used in tests).
    #[must_use]
    pub fn with_server(server: String) -> Self {
        Self { server }
    }
}

impl Default for ThreddsCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl GridmetCatalog for ThreddsCatalog {
    fn end_date(&self, dataset: &str) -> Result<NaiveDate> {
        let url = format!("{}/{dataset}/dataset.xml", self.server);
        let body = ureq::get(&url)
            .call()
            .with_context(|| format!("fetching {url}"))?
            .into_string()
            .with_context(|| format!("reading {url}"))?;
        extract_end_date(&body).with_context(|| format!("no coverage end date in {url}"))
    }
}

/// Pull the first `<end>` element's date out of a `dataset.xml` body.
fn extract_end_date(body: &str) -> Result<NaiveDate> {
    static END_ELEMENT: OnceLock<Regex> = OnceLock::new();
    let re = END_ELEMENT.get_or_init(|| {
        #[allow(clippy::expect_used)] // compile-time constant pattern
        Regex::new(r"<end>\s*([^<\s]+)").expect("valid regex")
    });
    let raw = re
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .context("<end> element not found")?;
    // Timestamps look like 2024-03-05T00:00:00Z; the date part is enough.
    parse_date_stem(raw.get(..10).unwrap_or(raw))
        .with_context(|| format!("unparseable end timestamp '{raw}'"))
}

/// Consistency-checked coverage status across all datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridmetStatus {
    /// Shared coverage end date.
    pub end_date: NaiveDate,
    /// Whether that date is yesterday (fully up to date).
    pub fresh: bool,
}

/// Query every dataset and require a single consistent end date.
///
/// # Errors
///
/// Fails when any dataset cannot be queried or the datasets disagree on
/// their end date — a half-updated catalog is not a usable forcing set.
pub fn freshness<C: GridmetCatalog>(catalog: &C, yesterday: NaiveDate) -> Result<GridmetStatus> {
    let mut dates = Vec::with_capacity(DATASETS.len());
    for dataset in DATASETS {
        let date = catalog
            .end_date(dataset)
            .with_context(|| format!("checking availability of {dataset}"))?;
        dates.push((*dataset, date));
    }
    let first = dates[0].1;
    if let Some((dataset, date)) = dates.iter().find(|(_, d)| *d != first) {
        bail!(
            "GridMET datasets disagree on coverage: {} ends {} but {} ends {}",
            dates[0].0,
            dates[0].1,
            dataset,
            date
        );
    }
    Ok(GridmetStatus {
        end_date: first,
        fresh: first == yesterday,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedCatalog {
        dates: Vec<(&'static str, &'static str)>,
    }

    impl GridmetCatalog for CannedCatalog {
        fn end_date(&self, dataset: &str) -> Result<NaiveDate> {
            let stem = self
                .dates
                .iter()
                .find(|(name, _)| *name == dataset)
                .map(|(_, d)| *d)
                .context("unknown dataset")?;
            Ok(parse_date_stem(stem)?)
        }
    }

    fn canned(date: &'static str) -> CannedCatalog {
        CannedCatalog {
            dates: DATASETS.iter().map(|d| (*d, date)).collect(),
        }
    }

    #[test]
    fn consistent_and_current_is_fresh() {
        let yesterday = parse_date_stem("2024-03-05").expect("date");
        let status = freshness(&canned("2024-03-05"), yesterday).expect("status");
        assert!(status.fresh);
        assert_eq!(status.end_date, yesterday);
    }

    #[test]
    fn consistent_but_stale_is_not_fresh() {
        let yesterday = parse_date_stem("2024-03-05").expect("date");
        let status = freshness(&canned("2024-03-04"), yesterday).expect("status");
        assert!(!status.fresh);
        assert_eq!(status.end_date, parse_date_stem("2024-03-04").expect("date"));
    }

    #[test]
    fn disagreeing_datasets_are_an_error() {
        let mut catalog = canned("2024-03-05");
        catalog.dates[3].1 = "2024-03-04";
        let yesterday = parse_date_stem("2024-03-05").expect("date");
        let err = freshness(&catalog, yesterday).expect_err("inconsistent");
        assert!(err.to_string().contains("disagree"));
    }

    #[test]
    fn end_element_extraction() {
        let body = r"<gridDataset><TimeSpan><begin>1979-01-01T00:00:00Z</begin>
            <end>2024-03-05T00:00:00Z</end></TimeSpan></gridDataset>";
        assert_eq!(
            extract_end_date(body).expect("date"),
            parse_date_stem("2024-03-05").expect("date")
        );
        assert!(extract_end_date("<gridDataset/>").is_err());
    }
}
