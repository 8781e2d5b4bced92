use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::data::classify::DEFAULT_MAX_GROUPS;

/// Dashboard settings shared by every page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// File the dashboard reads its students from.
    pub data_path: PathBuf,
    /// Numeric column treated as the exam score.
    pub score_column: String,
    /// Scores at or above this count as passing.
    pub pass_threshold: f64,
    /// Bins in the score distribution histogram.
    pub histogram_bins: usize,
    /// Columns with this many labels or more are not offered as groupings.
    pub max_groups: usize,
    /// Rows shown in the filtered student list.
    pub preview_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("StudentPerformanceFactors.csv"),
            score_column: "Exam_Score".to_string(),
            pass_threshold: 70.0,
            histogram_bins: 20,
            max_groups: DEFAULT_MAX_GROUPS,
            preview_rows: 20,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(#[from] Box<figment::Error>);

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `STUDENT_DASHBOARD_`)
/// 2. JSON config file, when given and present
/// 3. Built-in defaults
pub fn load_config(file: Option<&Path>) -> Result<DashboardConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(DashboardConfig::default()));

    if let Some(file) = file {
        if file.exists() {
            figment = figment.merge(Json::file(file));
        } else {
            log::warn!("Config file {} not found, using defaults", file.display());
        }
    }

    // STUDENT_DASHBOARD_DATA_PATH, STUDENT_DASHBOARD_PASS_THRESHOLD, ...
    figment = figment.merge(Env::prefixed("STUDENT_DASHBOARD_"));

    figment.extract().map_err(|e| ConfigError(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_dashboard() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.pass_threshold, 70.0);
        assert_eq!(cfg.histogram_bins, 20);
        assert_eq!(cfg.max_groups, 10);
        assert_eq!(cfg.score_column, "Exam_Score");
    }

    #[test]
    fn file_and_env_layers_override_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("dashboard.json", r#"{ "pass_threshold": 65, "preview_rows": 5 }"#)?;
            jail.set_env("STUDENT_DASHBOARD_PREVIEW_ROWS", "8");

            let cfg = load_config(Some(Path::new("dashboard.json"))).expect("config loads");
            assert_eq!(cfg.pass_threshold, 65.0);
            assert_eq!(cfg.preview_rows, 8);
            assert_eq!(cfg.histogram_bins, 20);
            Ok(())
        });
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        figment::Jail::expect_with(|_| {
            let cfg = load_config(Some(Path::new("absent.json"))).expect("config loads");
            assert_eq!(cfg, DashboardConfig::default());
            Ok(())
        });
    }
}
