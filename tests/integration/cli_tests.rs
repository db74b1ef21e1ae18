//! End-to-end CLI tests.
//!
//! Container-backed commands are exercised only up to their validation
//! boundary (no docker in CI); `fetch-op-results` runs host-side and is
//! driven to completion against temp directories.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn onhm() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("onhm"));
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Write a complete profile pointing its host paths into `dir`.
fn write_profile(dir: &Path) -> std::path::PathBuf {
    let bind = dir.join("bind");
    std::fs::create_dir_all(&bind).expect("bind dir");
    let content = format!(
        "# UC test profile\n\
         HOST_BIND_DIR={bind}\n\
         PROJECT_ROOT=/nhm/NHM_PRMS_UC_GF_1_1\n\
         ARCHIVE_DIR={archive}\n\
         OP_DIR=/nhm/NHM_PRMS_UC_GF_1_1/daily\n\
         OP_NCF_IDIR=/nhm/NHM_PRMS_UC_GF_1_1/daily/input\n\
         OP_PRMS_CONTROL_FILE=/nhm/NHM_PRMS_UC_GF_1_1/control.default\n\
         CFSV2_NCF_IDIR=/nhm/forecast_data\n\
         CFSV2_NCF_MPF=/nhm/forecast_data/model_params.nc\n\
         GM_TARGET_FILE=/nhm/gm_data/target.nc\n\
         GM_WEIGHTS_FILE=/nhm/gm_data/weights.csv\n\
         PRMS_SOURCE=https://example.com/NHM_PRMS_CONUS_GF_1_1.zip\n\
         PRMS_DATA_PKG=NHM_PRMS_CONUS_GF_1_1.zip\n\
         PRMS_TEST_SOURCE=https://example.com/NHM_PRMS_UC_GF_1_1.zip\n\
         PRMS_TEST_DATA_PKG=NHM_PRMS_UC_GF_1_1.zip\n",
        bind = bind.display(),
        archive = dir.join("archive").display(),
    );
    let path = dir.join("uc.env");
    std::fs::write(&path, content).expect("profile");
    path
}

// --- Help and version tests ---

#[test]
fn no_args_shows_help_and_exits_two() {
    // clap with arg_required_else_help shows help on stderr and exits 2
    onhm().assert().code(2).stderr(predicate::str::contains(
        "Operational National Hydrologic Model",
    ));
}

#[test]
fn help_lists_the_pipeline_commands() {
    onhm()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build-images"))
        .stdout(predicate::str::contains("run-operational"))
        .stdout(predicate::str::contains("run-sub-seasonal"))
        .stdout(predicate::str::contains("run-update-cfsv2-data"))
        .stdout(predicate::str::contains("conv-output-to-zarr"))
        .stdout(predicate::str::contains("run-seasonal"))
        .stdout(predicate::str::contains("fetch-op-results"));
}

#[test]
fn version_command_shows_version() {
    onhm()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("onhm 0.3.0"));
}

#[test]
fn version_command_json_outputs_valid_json() {
    onhm()
        .arg("version")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""version": "0.3.0""#));
}

#[test]
fn unknown_subcommand_is_rejected() {
    onhm()
        .arg("run-decadal")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// --- Validation failures (exit code 1) ---

#[test]
fn missing_env_file_exits_one() {
    onhm()
        .args(["run-operational", "--env-file", "/no/such/file.env"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot read environment file"));
}

#[test]
fn incomplete_profile_lists_every_missing_key() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("partial.env");
    std::fs::write(&path, "HOST_BIND_DIR=/tmp\nPROJECT_ROOT=/nhm\n").expect("write");
    onhm()
        .args(["run-operational", "--env-file"])
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing required keys"))
        .stderr(predicate::str::contains("ARCHIVE_DIR"))
        .stderr(predicate::str::contains("PRMS_TEST_DATA_PKG"));
}

#[test]
fn conv_zarr_forecast_mode_requires_a_date() {
    let dir = TempDir::new().expect("tempdir");
    let profile = write_profile(dir.path());
    onhm()
        .args(["conv-output-to-zarr", "--mode", "median", "--env-file"])
        .arg(&profile)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--date is required"));
}

#[test]
fn update_cfsv2_rejects_invalid_method() {
    let dir = TempDir::new().expect("tempdir");
    let profile = write_profile(dir.path());
    onhm()
        .args(["run-update-cfsv2-data", "--method", "bogus", "--env-file"])
        .arg(&profile)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("possible values"));
}

// --- Host-side end-to-end: fetch-op-results ---

#[test]
fn fetch_with_only_daily_output_is_partial() {
    let dir = TempDir::new().expect("tempdir");
    let profile = write_profile(dir.path());
    let daily = dir.path().join("bind/NHM_PRMS_UC_GF_1_1/daily/output");
    std::fs::create_dir_all(&daily).expect("daily output");
    std::fs::write(daily.join("seg_outflow.nc"), b"outflow").expect("write");

    // Daily output archives; the absent forecast methods fail best-effort.
    onhm()
        .args(["fetch-op-results", "--env-file"])
        .arg(&profile)
        .assert()
        .code(3);

    let archive = dir.path().join("archive");
    let dated: Vec<_> = std::fs::read_dir(&archive)
        .expect("archive exists")
        .filter_map(Result::ok)
        .collect();
    assert_eq!(dated.len(), 1, "one dated archive folder");
    assert!(dated[0].path().join("seg_outflow.nc").is_file());
}

#[test]
fn fetch_with_all_outputs_succeeds_and_tags_methods() {
    let dir = TempDir::new().expect("tempdir");
    let profile = write_profile(dir.path());
    let root = dir.path().join("bind/NHM_PRMS_UC_GF_1_1");
    let daily = root.join("daily/output");
    let median = root.join("forecast/output/ensemble_median/2024-03-02");
    let ensembles = root.join("forecast/output/ensembles/2024-03-02/ensemble_0");
    for d in [&daily, &median, &ensembles] {
        std::fs::create_dir_all(d).expect("mkdir");
    }
    std::fs::write(daily.join("seg_outflow.nc"), b"daily").expect("write");
    std::fs::write(median.join("seg_outflow.nc"), b"median").expect("write");
    std::fs::write(ensembles.join("seg_outflow.nc"), b"member0").expect("write");

    onhm()
        .args(["fetch-op-results", "--env-file"])
        .arg(&profile)
        .assert()
        .success();

    let archive = dir.path().join("archive");
    let dated = std::fs::read_dir(&archive)
        .expect("archive exists")
        .filter_map(Result::ok)
        .next()
        .expect("dated folder")
        .path();
    assert!(dated.join("seg_outflow.nc").is_file());
    assert!(dated.join("median/seg_outflow.nc").is_file());
    assert!(dated.join("ensemble/ensemble_0/seg_outflow.nc").is_file());
}

#[test]
fn fetch_json_reports_per_step_status() {
    let dir = TempDir::new().expect("tempdir");
    let profile = write_profile(dir.path());
    let daily = dir.path().join("bind/NHM_PRMS_UC_GF_1_1/daily/output");
    std::fs::create_dir_all(&daily).expect("daily output");
    std::fs::write(daily.join("seg_outflow.nc"), b"outflow").expect("write");

    onhm()
        .args(["fetch-op-results", "--json", "--env-file"])
        .arg(&profile)
        .assert()
        .code(3)
        .stdout(predicate::str::contains(r#""status": "partially_failed""#))
        .stdout(predicate::str::contains("fetch daily output"))
        .stdout(predicate::str::contains("fetch median forecast"))
        .stdout(predicate::str::contains("fetch ensemble forecast"));
}

#[test]
fn fetch_twice_is_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    let profile = write_profile(dir.path());
    let daily = dir.path().join("bind/NHM_PRMS_UC_GF_1_1/daily/output");
    std::fs::create_dir_all(&daily).expect("daily output");
    std::fs::write(daily.join("seg_outflow.nc"), b"outflow").expect("write");

    for _ in 0..2 {
        onhm()
            .args(["fetch-op-results", "--env-file"])
            .arg(&profile)
            .assert()
            .code(3);
    }
}
