// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::airports::{AirportDirectory, DirectoryKey};
use crate::geodesy::{DistanceModelKind, METRES_PER_NAUTICAL_MILE};
use crate::ledger::LedgerOptions;
use crate::{FmcError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Shortest allowed spacing between path points.
pub const MIN_SEGMENT_M: f64 = 1.0;

/// Replaces the directory's spelling of a country with the polygon source's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRename {
    pub from: String,
    pub to: String,
}

impl FromStr for CountryRename {
    type Err = FmcError;

    /// Parses `FROM=TO`.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('=') {
            Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
                Ok(CountryRename {
                    from: from.trim().to_string(),
                    to: to.trim().to_string(),
                })
            }
            _ => Err(FmcError::InvalidConfig(format!(
                "rename \"{}\" is not of the form FROM=TO",
                s
            ))),
        }
    }
}

/// Centre and field of view of a zoomed map inset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsetView {
    pub longitude: f64,
    pub latitude: f64,
    /// Half-width of the view in metres.
    pub field_of_view_m: f64,
}

impl InsetView {
    /// Continental United States.
    pub fn left_default() -> Self {
        InsetView {
            longitude: -97.871822,
            latitude: 39.411078,
            field_of_view_m: 2392.2e3,
        }
    }

    /// Western Europe.
    pub fn right_default() -> Self {
        InsetView {
            longitude: 3.172021,
            latitude: 49.879310,
            field_of_view_m: 2345.0e3,
        }
    }
}

/// Everything one report run needs. Passed explicitly into
/// [`crate::report::generate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub flight_log: PathBuf,
    pub airport_db: PathBuf,
    pub directory_key: DirectoryKey,
    pub country_names: PathBuf,
    pub output: Option<PathBuf>,
    pub extra_countries: Vec<String>,
    pub not_visited: Vec<String>,
    pub renames: Vec<CountryRename>,
    pub country_overrides: HashMap<String, String>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub distance_model: DistanceModelKind,
    pub max_iterations: usize,
    pub max_segment_m: f64,
    pub validate: bool,
    pub debug: bool,
    pub left_inset: InsetView,
    pub right_inset: InsetView,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let data_root = crate::get_data_root();
        Self {
            flight_log: PathBuf::new(),
            airport_db: AirportDirectory::default_path(),
            directory_key: DirectoryKey::default(),
            country_names: data_root.join("countries.geojson"),
            output: None,
            extra_countries: Vec::new(),
            not_visited: Vec::new(),
            renames: Vec::new(),
            country_overrides: AirportDirectory::default_overrides(),
            min_year: None,
            max_year: None,
            distance_model: DistanceModelKind::default(),
            max_iterations: 100,
            max_segment_m: 12.0 * METRES_PER_NAUTICAL_MILE,
            validate: false,
            debug: false,
            left_inset: InsetView::left_default(),
            right_inset: InsetView::right_default(),
        }
    }
}

impl ReportConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        FmcError::require(
            "Configuration file",
            path,
            "Pass an existing JSON file to --config, or leave it out to use defaults.",
        )?;
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Where the report lands: `output`, or the flight log with a `.json`
    /// extension.
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => self.flight_log.with_extension("json"),
        }
    }

    pub fn ledger_options(&self) -> LedgerOptions {
        LedgerOptions {
            min_year: self.min_year,
            max_year: self.max_year,
            max_segment_m: self.max_segment_m,
        }
    }

    pub fn check(&self) -> Result<()> {
        if self.flight_log.as_os_str().is_empty() {
            return Err(FmcError::InvalidConfig("no flight log given".into()));
        }
        if let (Some(min), Some(max)) = (self.min_year, self.max_year) {
            if min > max {
                return Err(FmcError::InvalidConfig(format!(
                    "min_year {} is after max_year {}",
                    min, max
                )));
            }
        }
        if !(self.max_segment_m >= MIN_SEGMENT_M && self.max_segment_m.is_finite()) {
            return Err(FmcError::InvalidConfig(format!(
                "max_segment_m must be at least {} m, got {}",
                MIN_SEGMENT_M,
                self.max_segment_m
            )));
        }
        if self.max_iterations == 0 {
            return Err(FmcError::InvalidConfig(
                "max_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_parsing() {
        let rename: CountryRename = "Czech Republic = Czechia".parse().unwrap();
        assert_eq!(rename.from, "Czech Republic");
        assert_eq!(rename.to, "Czechia");

        for bad in ["Czechia", "=Czechia", "Czech Republic=", ""] {
            assert!(bad.parse::<CountryRename>().is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_defaults() {
        let config = ReportConfig::default();
        assert_eq!(config.directory_key, DirectoryKey::Iata);
        assert_eq!(config.distance_model, DistanceModelKind::Vincenty);
        assert_eq!(config.max_iterations, 100);
        assert!((config.max_segment_m - 22_224.0).abs() < 1e-9);
        assert_eq!(
            config.country_overrides.get("TXL").map(String::as_str),
            Some("Germany")
        );
        assert_eq!(config.left_inset, InsetView::left_default());
        assert!(config.airport_db.ends_with("airports.dat"));
    }

    #[test]
    fn test_output_path_defaults_to_log_name() {
        let mut config = ReportConfig {
            flight_log: PathBuf::from("/logs/flights.csv"),
            ..ReportConfig::default()
        };
        assert_eq!(config.output_path(), PathBuf::from("/logs/flights.json"));

        config.output = Some(PathBuf::from("/out/map.json"));
        assert_eq!(config.output_path(), PathBuf::from("/out/map.json"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "flight_log": "flights.csv",
            "distance_model": "spherical",
            "renames": [{"from": "Congo (Kinshasa)", "to": "Dem. Rep. Congo"}],
            "min_year": 2015
        }"#;
        let config: ReportConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.distance_model, DistanceModelKind::Spherical);
        assert_eq!(config.min_year, Some(2015));
        assert_eq!(config.renames.len(), 1);
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.right_inset, InsetView::right_default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fmc.json");

        let config = ReportConfig {
            flight_log: PathBuf::from("flights.csv"),
            not_visited: vec!["France".to_string()],
            validate: true,
            ..ReportConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = ReportConfig::load(&path).unwrap();
        assert_eq!(loaded.flight_log, config.flight_log);
        assert_eq!(loaded.not_visited, config.not_visited);
        assert!(loaded.validate);
        assert_eq!(loaded.country_overrides, config.country_overrides);
        assert!((loaded.left_inset.latitude - 39.411078).abs() < 1e-9);
    }

    #[test]
    fn test_check_rejects_bad_values() {
        let base = ReportConfig {
            flight_log: PathBuf::from("flights.csv"),
            ..ReportConfig::default()
        };
        assert!(base.check().is_ok());

        let cases = [
            ReportConfig {
                flight_log: PathBuf::new(),
                ..base.clone()
            },
            ReportConfig {
                min_year: Some(2022),
                max_year: Some(2020),
                ..base.clone()
            },
            ReportConfig {
                max_segment_m: 0.0,
                ..base.clone()
            },
            ReportConfig {
                max_segment_m: 1e-300,
                ..base.clone()
            },
            ReportConfig {
                max_iterations: 0,
                ..base.clone()
            },
        ];
        for config in cases {
            assert!(matches!(config.check(), Err(FmcError::InvalidConfig(_))));
        }
    }
}
