// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

pub mod airports;
pub mod config;
pub mod countries;
pub mod geodesy;
pub mod ledger;
pub mod report;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use airports::{AirportDirectory, AirportRecord, DirectoryKey};
pub use config::{CountryRename, InsetView, ReportConfig};
pub use countries::{CountrySet, Reconciliation, ShapeNames};
pub use geodesy::{DistanceModel, DistanceModelKind, GeodesyError, Spherical, Vincenty};
pub use ledger::{FlightLedger, LedgerOptions, LedgerReport, Purpose, RouteKey};
pub use report::{generate, generate_with, Annotation, JsonReportSink, Report, ReportSink};

#[derive(Error, Debug)]
pub enum FmcError {
    #[error("{what} not found at {path}\n{hint}")]
    MissingResource {
        what: &'static str,
        path: PathBuf,
        hint: &'static str,
    },
    #[error("two airports have the {kind} code of \"{code}\"")]
    DataIntegrity { kind: &'static str, code: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FmcError>;

impl FmcError {
    /// Builds a `MissingResource` when `path` does not exist, so callers can
    /// bail out before opening anything.
    pub fn require(what: &'static str, path: &Path, hint: &'static str) -> Result<()> {
        if path.exists() {
            Ok(())
        } else {
            Err(FmcError::MissingResource {
                what,
                path: path.to_path_buf(),
                hint,
            })
        }
    }
}

/// Directory holding the separately provisioned reference datasets.
///
/// Falls back to the current directory when the platform has no notion of a
/// per-user data directory.
pub fn get_data_root() -> PathBuf {
    directories::ProjectDirs::from("org", "fmc", "fmc")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
