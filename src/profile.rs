//! Environment profile loading and validation.
//!
//! A profile is a flat `KEY=VALUE` file (one assignment per line, `#`
//! comments and blank lines ignored) selecting which data scope a run
//! operates against — e.g. the CONUS production domain vs the UC test
//! domain. Values are passed through unmodified: no interpolation and no
//! shell expansion. Path handling happens inside the invoked services.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Keys every profile must define with a non-empty value before any
/// service is launched.
pub const REQUIRED_KEYS: &[&str] = &[
    "HOST_BIND_DIR",
    "PROJECT_ROOT",
    "ARCHIVE_DIR",
    "OP_DIR",
    "OP_NCF_IDIR",
    "OP_PRMS_CONTROL_FILE",
    "CFSV2_NCF_IDIR",
    "CFSV2_NCF_MPF",
    "GM_TARGET_FILE",
    "GM_WEIGHTS_FILE",
    "PRMS_SOURCE",
    "PRMS_DATA_PKG",
    "PRMS_TEST_SOURCE",
    "PRMS_TEST_DATA_PKG",
];

/// Default CFSv2 sub-seasonal ensemble member count when the profile does
/// not set `CFSV2_ENSEMBLE_COUNT`.
const DEFAULT_ENSEMBLE_COUNT: u32 = 48;

/// Mount point of the host bind directory inside every service container.
pub const CONTAINER_BIND_ROOT: &str = "/nhm";

/// Validated key/value environment for one run.
#[derive(Debug, Clone)]
pub struct EnvironmentProfile {
    path: PathBuf,
    vars: BTreeMap<String, String>,
}

impl EnvironmentProfile {
    /// Load and validate a profile file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unreadable`] when the file cannot be read,
    /// [`ConfigError::Malformed`] for a line without `=`, and
    /// [`ConfigError::MissingKeys`] naming EVERY required key that is
    /// absent or empty, so a user can fix all of them in one pass.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Parse profile content. Split out from [`Self::load`] for tests.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let mut vars = BTreeMap::new();
        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Malformed {
                    path: path.to_path_buf(),
                    line: idx + 1,
                });
            };
            vars.insert(key.trim().to_string(), value.to_string());
        }

        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| vars.get(**key).is_none_or(|v| v.trim().is_empty()))
            .map(|key| (*key).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys {
                path: path.to_path_buf(),
                keys: missing,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            vars,
        })
    }

    /// Path the profile was loaded from.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.path
    }

    /// Raw value lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Value of a required key. Validation at load time guarantees presence.
    #[must_use]
    pub fn required(&self, key: &str) -> &str {
        debug_assert!(REQUIRED_KEYS.contains(&key), "key {key} is not required");
        self.vars.get(key).map(String::as_str).unwrap_or_default()
    }

    /// Host directory bind-mounted into every service container.
    #[must_use]
    pub fn host_bind_dir(&self) -> PathBuf {
        PathBuf::from(self.required("HOST_BIND_DIR"))
    }

    /// In-container project root (the `/nhm` tree).
    #[must_use]
    pub fn project_root(&self) -> PathBuf {
        PathBuf::from(self.required("PROJECT_ROOT"))
    }

    /// Host-side archive root for relocated run outputs.
    #[must_use]
    pub fn archive_dir(&self) -> PathBuf {
        PathBuf::from(self.required("ARCHIVE_DIR"))
    }

    /// Operational model directory.
    #[must_use]
    pub fn op_dir(&self) -> PathBuf {
        PathBuf::from(self.required("OP_DIR"))
    }

    /// CFSv2 ensemble member count; profile override via
    /// `CFSV2_ENSEMBLE_COUNT`.
    #[must_use]
    pub fn ensemble_count(&self) -> u32 {
        self.get("CFSV2_ENSEMBLE_COUNT")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_ENSEMBLE_COUNT)
    }

    /// Map an in-container path under [`CONTAINER_BIND_ROOT`] to the host
    /// path behind the bind mount. Paths outside the mount are returned
    /// unchanged (already host-side).
    #[must_use]
    pub fn host_path(&self, container_path: &str) -> PathBuf {
        if container_path == CONTAINER_BIND_ROOT {
            return self.host_bind_dir();
        }
        match container_path.strip_prefix(CONTAINER_BIND_ROOT) {
            Some(rest) if rest.starts_with('/') => {
                self.host_bind_dir().join(rest.trim_start_matches('/'))
            }
            _ => PathBuf::from(container_path),
        }
    }

    /// The full variable set as an environment overlay for a service run.
    #[must_use]
    pub fn to_overlay(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_content() -> String {
        REQUIRED_KEYS
            .iter()
            .map(|key| format!("{key}=/nhm/value/{key}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn parses_complete_profile() {
        let profile =
            EnvironmentProfile::parse(Path::new("uc.env"), &complete_content()).expect("valid");
        assert_eq!(profile.required("PROJECT_ROOT"), "/nhm/value/PROJECT_ROOT");
        assert_eq!(profile.ensemble_count(), 48);
    }

    #[test]
    fn ignores_comments_and_blank_lines() {
        let content = format!("# header\n\n{}\n  # trailing comment\n", complete_content());
        let profile = EnvironmentProfile::parse(Path::new("uc.env"), &content).expect("valid");
        assert!(profile.get("# header").is_none());
    }

    #[test]
    fn reports_every_missing_key_not_just_the_first() {
        let content = complete_content()
            .lines()
            .filter(|l| !l.starts_with("PRMS_SOURCE=") && !l.starts_with("GM_TARGET_FILE="))
            .collect::<Vec<_>>()
            .join("\n");
        let err = EnvironmentProfile::parse(Path::new("uc.env"), &content).expect_err("missing");
        match err {
            ConfigError::MissingKeys { keys, .. } => {
                assert!(keys.contains(&"PRMS_SOURCE".to_string()));
                assert!(keys.contains(&"GM_TARGET_FILE".to_string()));
                assert_eq!(keys.len(), 2, "only the absent keys are reported: {keys:?}");
            }
            other => panic!("expected MissingKeys, got {other}"),
        }
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let content = complete_content().replace(
            "OP_PRMS_CONTROL_FILE=/nhm/value/OP_PRMS_CONTROL_FILE",
            "OP_PRMS_CONTROL_FILE=  ",
        );
        let err = EnvironmentProfile::parse(Path::new("uc.env"), &content).expect_err("empty");
        assert!(matches!(err, ConfigError::MissingKeys { keys, .. }
            if keys == vec!["OP_PRMS_CONTROL_FILE".to_string()]));
    }

    #[test]
    fn line_without_assignment_is_malformed() {
        let content = format!("{}\nJUST_A_WORD\n", complete_content());
        let err = EnvironmentProfile::parse(Path::new("uc.env"), &content).expect_err("malformed");
        assert!(matches!(err, ConfigError::Malformed { line, .. } if line == 15));
    }

    #[test]
    fn values_are_not_expanded() {
        let content = complete_content().replace(
            "PRMS_SOURCE=/nhm/value/PRMS_SOURCE",
            "PRMS_SOURCE=$HOME/data and spaces",
        );
        let profile = EnvironmentProfile::parse(Path::new("uc.env"), &content).expect("valid");
        assert_eq!(profile.required("PRMS_SOURCE"), "$HOME/data and spaces");
    }

    #[test]
    fn host_path_maps_the_bind_mount() {
        let content = complete_content().replace(
            "HOST_BIND_DIR=/nhm/value/HOST_BIND_DIR",
            "HOST_BIND_DIR=/data/onhm",
        );
        let profile = EnvironmentProfile::parse(Path::new("uc.env"), &content).expect("valid");
        assert_eq!(
            profile.host_path("/nhm/NHM_PRMS_UC_GF_1_1/daily/output"),
            PathBuf::from("/data/onhm/NHM_PRMS_UC_GF_1_1/daily/output")
        );
        assert_eq!(profile.host_path("/nhm"), PathBuf::from("/data/onhm"));
        // Paths outside the mount pass through untouched.
        assert_eq!(profile.host_path("/tmp/x"), PathBuf::from("/tmp/x"));
        assert_eq!(profile.host_path("/nhmx"), PathBuf::from("/nhmx"));
    }

    #[test]
    fn ensemble_count_override() {
        let content = format!("{}\nCFSV2_ENSEMBLE_COUNT=12\n", complete_content());
        let profile = EnvironmentProfile::parse(Path::new("uc.env"), &content).expect("valid");
        assert_eq!(profile.ensemble_count(), 12);
    }
}
