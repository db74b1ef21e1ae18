//! Per-service environment derivation.
//!
//! Each pipeline service reads its configuration from environment
//! variables. The functions here compute those variable sets from the
//! profile and the simulation windows. All paths are in-container POSIX
//! paths rooted at `PROJECT_ROOT`, so they are assembled as strings rather
//! than host `PathBuf`s.

use clap::ValueEnum;
use serde::Serialize;

use crate::dates::{OperationalWindow, ForecastWindow, control_time, date_stamp};
use crate::profile::EnvironmentProfile;

/// Forecast post-processing method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastMethod {
    /// Single run forced by the ensemble-median climate fields.
    Median,
    /// One run per CFSv2 ensemble member.
    Ensemble,
}

impl ForecastMethod {
    /// Archive/directory tag for this method.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Median => "median",
            Self::Ensemble => "ensemble",
        }
    }

    /// Mode flag understood by the CFSv2 ETL service.
    #[must_use]
    pub fn cfsv2_mode(self) -> u8 {
        match self {
            Self::Median => 1,
            Self::Ensemble => 2,
        }
    }
}

/// Zarr conversion target mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Daily operational output.
    Op,
    /// Ensemble-median forecast output.
    Median,
    /// Per-member ensemble forecast output.
    Ensemble,
}

impl OutputMode {
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Op => "op",
            Self::Median => "median",
            Self::Ensemble => "ensemble",
        }
    }
}

fn pair(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

/// Profile overlay plus the operational window variables every service in
/// the daily pipeline reads.
#[must_use]
pub fn operational_overlay(
    profile: &EnvironmentProfile,
    window: &OperationalWindow,
) -> Vec<(String, String)> {
    let mut env = profile.to_overlay();
    env.push(pair("RESTART_DATE", date_stamp(window.restart)));
    env.push(pair("START_DATE", date_stamp(window.start)));
    env.push(pair("END_DATE", date_stamp(window.end)));
    env.push(pair("SAVE_RESTART_DATE", date_stamp(window.save_restart)));
    env.push(pair("FRCST_END_DATE", date_stamp(window.forecast_end)));
    env.push(pair("F_END_TIME", control_time(window.forecast_end)));
    env
}

/// ncf2cbh variables for the daily operational conversion.
#[must_use]
pub fn ncf2cbh_op_env(
    profile: &EnvironmentProfile,
    window: &OperationalWindow,
) -> Vec<(String, String)> {
    vec![
        pair("NCF2CBH_IDIR", profile.required("OP_NCF_IDIR")),
        pair("NCF2CBH_PREFIX", "converted_filled"),
        pair("NCF2CBH_START_DATE", date_stamp(window.start)),
        pair("NCF2CBH_ROOT_DIR", profile.required("PROJECT_ROOT")),
        pair("NCF2CBH_ENS_NUM", "0"),
        pair("NCF2CBH_MODE", "op"),
    ]
}

/// ncf2cbh variables for a forecast conversion. `member` is `None` for the
/// median method.
#[must_use]
pub fn ncf2cbh_forecast_env(
    profile: &EnvironmentProfile,
    window: &ForecastWindow,
    method: ForecastMethod,
    member: Option<u32>,
) -> Vec<(String, String)> {
    let forecast_idir = profile.required("CFSV2_NCF_IDIR");
    let start = date_stamp(window.start);
    let idir = match method {
        ForecastMethod::Median => format!("{forecast_idir}/ensemble_median/{start}"),
        ForecastMethod::Ensemble => format!("{forecast_idir}/ensembles/{start}"),
    };
    vec![
        pair("NCF2CBH_IDIR", idir),
        pair("NCF2CBH_PREFIX", "converted_filled"),
        pair("NCF2CBH_START_DATE", start),
        pair("NCF2CBH_ROOT_DIR", profile.required("PROJECT_ROOT")),
        pair("NCF2CBH_ENS_NUM", member.unwrap_or(0).to_string()),
        pair("NCF2CBH_MODE", method.tag()),
    ]
}

/// PRMS variables for the daily simulation run: initializes from the daily
/// restart, saves the forecast-seed restart at the window end.
#[must_use]
pub fn prms_run_env(
    profile: &EnvironmentProfile,
    window: &OperationalWindow,
) -> Vec<(String, String)> {
    let root = profile.required("PROJECT_ROOT");
    vec![
        pair("OP_DIR", root),
        pair("FRCST_DIR", root),
        pair("PRMS_START_TIME", control_time(window.start)),
        pair("PRMS_END_TIME", control_time(window.end)),
        pair("PRMS_INIT_VARS_FROM_FILE", "1"),
        pair("PRMS_RESTART_DATE", date_stamp(window.restart)),
        pair(
            "PRMS_VAR_INIT_FILE",
            format!("{root}/daily/restart/{}.restart", date_stamp(window.restart)),
        ),
        pair("PRMS_SAVE_VARS_TO_FILE", "1"),
        pair(
            "PRMS_VAR_SAVE_FILE",
            format!("{root}/forecast/restart/{}.restart", date_stamp(window.end)),
        ),
        pair("PRMS_CONTROL_FILE", profile.required("OP_PRMS_CONTROL_FILE")),
        pair("PRMS_RUN_TYPE", "0"),
        pair("PRMS_INPUT_DIR", format!("{root}/daily/input")),
        pair("PRMS_OUTPUT_DIR", format!("{root}/daily/output")),
    ]
}

/// PRMS variables for the restart-file update run: advances the daily
/// restart chain to `save_restart`.
#[must_use]
pub fn prms_restart_env(
    profile: &EnvironmentProfile,
    window: &OperationalWindow,
) -> Vec<(String, String)> {
    let root = profile.required("PROJECT_ROOT");
    vec![
        pair("OP_DIR", root),
        pair("FRCST_DIR", root),
        pair("PRMS_START_TIME", control_time(window.start)),
        pair("PRMS_END_TIME", control_time(window.save_restart)),
        pair("PRMS_INIT_VARS_FROM_FILE", "1"),
        pair(
            "PRMS_VAR_INIT_FILE",
            format!("{root}/daily/restart/{}.restart", date_stamp(window.restart)),
        ),
        pair("PRMS_SAVE_VARS_TO_FILE", "1"),
        pair(
            "PRMS_VAR_SAVE_FILE",
            format!(
                "{root}/daily/restart/{}.restart",
                date_stamp(window.save_restart)
            ),
        ),
        pair("PRMS_CONTROL_FILE", profile.required("OP_PRMS_CONTROL_FILE")),
        pair("PRMS_RUN_TYPE", "0"),
        pair("PRMS_INPUT_DIR", format!("{root}/daily/input")),
        pair("PRMS_OUTPUT_DIR", format!("{root}/daily/output")),
    ]
}

/// PRMS variables for a forecast run. `member` is `None` for the median
/// method, `Some(n)` for ensemble member `n`.
#[must_use]
pub fn prms_forecast_env(
    profile: &EnvironmentProfile,
    window: &ForecastWindow,
    method: ForecastMethod,
    member: Option<u32>,
) -> Vec<(String, String)> {
    let root = profile.required("PROJECT_ROOT");
    let start = date_stamp(window.start);
    let (input_dir, output_dir) = forecast_io_dirs(root, &start, method, member);
    vec![
        pair("OP_DIR", root),
        pair("FRCST_DIR", root),
        pair("PRMS_RESTART_DATE", date_stamp(window.restart)),
        pair("PRMS_START_TIME", control_time(window.start)),
        pair("PRMS_END_TIME", control_time(window.end)),
        pair("PRMS_INIT_VARS_FROM_FILE", "1"),
        pair(
            "PRMS_VAR_INIT_FILE",
            format!(
                "{root}/forecast/restart/{}.restart",
                date_stamp(window.restart)
            ),
        ),
        pair("PRMS_SAVE_VARS_TO_FILE", "0"),
        pair("PRMS_CONTROL_FILE", profile.required("OP_PRMS_CONTROL_FILE")),
        pair("PRMS_RUN_TYPE", "1"),
        pair("PRMS_INPUT_DIR", input_dir),
        pair("PRMS_OUTPUT_DIR", output_dir),
    ]
}

/// out2ncf variables for the daily operational conversion.
#[must_use]
pub fn out2ncf_op_env(profile: &EnvironmentProfile) -> Vec<(String, String)> {
    vec![
        pair(
            "OUT_WORK_PATH",
            format!("{}/output", profile.required("OP_DIR")),
        ),
        pair("OUT_ROOT_PATH", profile.required("PROJECT_ROOT")),
    ]
}

/// out2ncf variables for a forecast conversion.
#[must_use]
pub fn out2ncf_forecast_env(
    profile: &EnvironmentProfile,
    window: &ForecastWindow,
    method: ForecastMethod,
    member: Option<u32>,
) -> Vec<(String, String)> {
    let root = profile.required("PROJECT_ROOT");
    let start = date_stamp(window.start);
    let (_, output_dir) = forecast_io_dirs(root, &start, method, member);
    vec![
        pair("OUT_WORK_PATH", output_dir),
        pair("OUT_ROOT_PATH", root),
    ]
}

/// CFSv2 ETL variables for the given method.
#[must_use]
pub fn cfsv2_env(profile: &EnvironmentProfile, method: ForecastMethod) -> Vec<(String, String)> {
    vec![
        pair("MODEL_PARAM_FILE", profile.required("CFSV2_NCF_MPF")),
        pair("TARGET_FILE", profile.required("GM_TARGET_FILE")),
        pair("OUTPATH", profile.required("CFSV2_NCF_IDIR")),
        pair("WEIGHTS_FILE", profile.required("GM_WEIGHTS_FILE")),
        pair("METHOD", method.cfsv2_mode().to_string()),
    ]
}

/// ncf2zarr variables: the output directory to convert and its mode.
#[must_use]
pub fn ncf2zarr_env(output_path: &str, mode: OutputMode) -> Vec<(String, String)> {
    vec![
        pair("NCF2ZARR_OUTPUT_PATH", output_path),
        pair("NCF2ZARR_MODE", mode.tag()),
    ]
}

/// Forecast input/output directory pair for a method and optional member.
fn forecast_io_dirs(
    root: &str,
    start: &str,
    method: ForecastMethod,
    member: Option<u32>,
) -> (String, String) {
    match (method, member) {
        (ForecastMethod::Median, _) => (
            format!("{root}/forecast/input/ensemble_median/{start}"),
            format!("{root}/forecast/output/ensemble_median/{start}"),
        ),
        (ForecastMethod::Ensemble, Some(n)) => (
            format!("{root}/forecast/input/ensembles/{start}/ensemble_{n}"),
            format!("{root}/forecast/output/ensembles/{start}/ensemble_{n}"),
        ),
        (ForecastMethod::Ensemble, None) => (
            format!("{root}/forecast/input/ensembles/{start}"),
            format!("{root}/forecast/output/ensembles/{start}"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date_stem;
    use crate::profile::{EnvironmentProfile, REQUIRED_KEYS};
    use std::path::Path;

    fn profile() -> EnvironmentProfile {
        let content = REQUIRED_KEYS
            .iter()
            .map(|key| match *key {
                "PROJECT_ROOT" => "PROJECT_ROOT=/nhm/NHM_PRMS_UC_GF_1_1".to_string(),
                "OP_DIR" => "OP_DIR=/nhm/NHM_PRMS_UC_GF_1_1/daily".to_string(),
                other => format!("{other}=/nhm/{other}"),
            })
            .collect::<Vec<_>>()
            .join("\n");
        EnvironmentProfile::parse(Path::new("uc.env"), &content).expect("valid profile")
    }

    fn lookup<'a>(env: &'a [(String, String)], key: &str) -> &'a str {
        env.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or_else(|| panic!("missing {key}"))
    }

    #[test]
    fn operational_overlay_carries_the_window_dates() {
        let window = OperationalWindow::to_end(
            parse_date_stem("2024-03-01").expect("date"),
            parse_date_stem("2024-06-30").expect("date"),
        );
        let env = operational_overlay(&profile(), &window);
        assert_eq!(lookup(&env, "START_DATE"), "2024-03-02");
        assert_eq!(lookup(&env, "END_DATE"), "2024-06-30");
        assert_eq!(lookup(&env, "SAVE_RESTART_DATE"), "2024-05-02");
        assert_eq!(lookup(&env, "FRCST_END_DATE"), "2024-07-29");
        assert_eq!(lookup(&env, "F_END_TIME"), "2024,07,29,00,00,00");
        // The full profile rides along for compose interpolation.
        assert_eq!(lookup(&env, "PROJECT_ROOT"), "/nhm/NHM_PRMS_UC_GF_1_1");
    }

    #[test]
    fn prms_run_env_chains_daily_restart_to_forecast_seed() {
        let window = OperationalWindow::to_end(
            parse_date_stem("2024-03-01").expect("date"),
            parse_date_stem("2024-06-30").expect("date"),
        );
        let env = prms_run_env(&profile(), &window);
        assert_eq!(
            lookup(&env, "PRMS_VAR_INIT_FILE"),
            "/nhm/NHM_PRMS_UC_GF_1_1/daily/restart/2024-03-01.restart"
        );
        assert_eq!(
            lookup(&env, "PRMS_VAR_SAVE_FILE"),
            "/nhm/NHM_PRMS_UC_GF_1_1/forecast/restart/2024-06-30.restart"
        );
        assert_eq!(lookup(&env, "PRMS_START_TIME"), "2024,03,02,00,00,00");
        assert_eq!(lookup(&env, "PRMS_RUN_TYPE"), "0");
    }

    #[test]
    fn restart_env_advances_the_daily_chain() {
        let window = OperationalWindow::to_end(
            parse_date_stem("2024-03-01").expect("date"),
            parse_date_stem("2024-06-30").expect("date"),
        );
        let env = prms_restart_env(&profile(), &window);
        assert_eq!(
            lookup(&env, "PRMS_VAR_SAVE_FILE"),
            "/nhm/NHM_PRMS_UC_GF_1_1/daily/restart/2024-05-02.restart"
        );
        assert_eq!(lookup(&env, "PRMS_END_TIME"), "2024,05,02,00,00,00");
    }

    #[test]
    fn ensemble_member_dirs_are_member_scoped() {
        let window = ForecastWindow::from_restart(parse_date_stem("2024-03-01").expect("date"));
        let env = prms_forecast_env(&profile(), &window, ForecastMethod::Ensemble, Some(7));
        assert_eq!(
            lookup(&env, "PRMS_INPUT_DIR"),
            "/nhm/NHM_PRMS_UC_GF_1_1/forecast/input/ensembles/2024-03-02/ensemble_7"
        );
        assert_eq!(lookup(&env, "PRMS_SAVE_VARS_TO_FILE"), "0");
        assert_eq!(lookup(&env, "PRMS_RUN_TYPE"), "1");
    }

    #[test]
    fn median_dirs_are_method_scoped() {
        let window = ForecastWindow::from_restart(parse_date_stem("2024-03-01").expect("date"));
        let env = ncf2cbh_forecast_env(&profile(), &window, ForecastMethod::Median, None);
        assert_eq!(
            lookup(&env, "NCF2CBH_IDIR"),
            "/nhm/CFSV2_NCF_IDIR/ensemble_median/2024-03-02"
        );
        assert_eq!(lookup(&env, "NCF2CBH_MODE"), "median");
    }

    #[test]
    fn cfsv2_method_mapping() {
        let median = cfsv2_env(&profile(), ForecastMethod::Median);
        let ensemble = cfsv2_env(&profile(), ForecastMethod::Ensemble);
        assert_eq!(lookup(&median, "METHOD"), "1");
        assert_eq!(lookup(&ensemble, "METHOD"), "2");
    }
}
