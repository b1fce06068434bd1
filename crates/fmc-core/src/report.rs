// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Report assembly: runs the whole pipeline for one [`ReportConfig`] and hands
//! the result to a [`ReportSink`].

use crate::airports::AirportDirectory;
use crate::config::{InsetView, ReportConfig};
use crate::countries::{CountrySet, Reconciliation, ShapeNames};
use crate::geodesy::{EARTH_MEAN_RADIUS_KM, EARTH_MOON_DISTANCE_KM};
use crate::ledger::{FlightLedger, RoutePath, SkippedRow, YearPurposeBins};
use crate::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub total_km: f64,
    pub earth_circuits: f64,
    pub moon_trips: f64,
}

impl Annotation {
    pub fn from_total_km(total_km: f64) -> Self {
        Self {
            total_km,
            earth_circuits: total_km / (2.0 * std::f64::consts::PI * EARTH_MEAN_RADIUS_KM),
            moon_trips: total_km / EARTH_MOON_DISTANCE_KM,
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "You have flown {} km. You have flown around the Earth {} times. You have flown to the Moon {} times.",
            group_thousands(self.total_km),
            group_thousands(self.earth_circuits),
            group_thousands(self.moon_trips)
        )
    }
}

/// One decimal place with `,` between thousands.
fn group_thousands(value: f64) -> String {
    let text = format!("{:.1}", value.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "0"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && text != "0.0" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Histogram bar, in thousands of km.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBar {
    pub year: i32,
    pub business: f64,
    pub pleasure: f64,
    pub total: f64,
}

impl HistogramBar {
    pub fn from_bins(bins: &YearPurposeBins) -> Vec<Self> {
        bins.iter()
            .map(|(year, totals)| HistogramBar {
                year,
                business: totals.business / 1000.0,
                pleasure: totals.pleasure / 1000.0,
                total: bins.year_total(year).unwrap_or(0.0) / 1000.0,
            })
            .collect()
    }
}

/// Everything a renderer needs to draw the map and histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub annotation: Annotation,
    pub accepted_legs: usize,
    pub unique_routes: usize,
    pub min_year: Option<i32>,
    pub max_year: i32,
    pub bins: YearPurposeBins,
    pub histogram: Vec<HistogramBar>,
    pub paths: Vec<RoutePath>,
    pub countries: Reconciliation,
    pub skipped: Vec<SkippedRow>,
    pub left_inset: InsetView,
    pub right_inset: InsetView,
}

impl Report {
    pub fn digest_lines(&self) -> Vec<String> {
        self.countries.digest_lines()
    }
}

/// Boundary to whatever draws the report.
pub trait ReportSink {
    fn write(&mut self, report: &Report) -> Result<()>;
}

/// Writes the report as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct JsonReportSink {
    path: PathBuf,
}

impl JsonReportSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JsonReportSink {
    fn write(&mut self, report: &Report) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(report)?;
        fs::write(&self.path, content)?;
        info!("Report written — path={}", self.path.display());
        Ok(())
    }
}

/// Builds the report and writes it next to the flight log, or to `output`.
pub fn generate(config: &ReportConfig) -> Result<Report> {
    let mut sink = JsonReportSink::new(config.output_path());
    generate_with(config, &mut sink)
}

pub fn generate_with<S: ReportSink + ?Sized>(config: &ReportConfig, sink: &mut S) -> Result<Report> {
    let report = build(config)?;
    sink.write(&report)?;
    Ok(report)
}

/// Runs the pipeline without writing anything.
pub fn build(config: &ReportConfig) -> Result<Report> {
    config.check()?;

    let directory = AirportDirectory::load(&config.airport_db, config.directory_key)?
        .with_overrides(config.country_overrides.clone());
    if config.validate {
        directory.validate()?;
    }
    let shapes = ShapeNames::load(&config.country_names)?;

    let model = config.distance_model.build(config.max_iterations);
    info!("Distance model — name={}", model.name());

    let ledger = FlightLedger::new(&directory, &*model, config.ledger_options())
        .process_file(&config.flight_log)?;

    let mut countries = CountrySet::new(ledger.touched)
        .with_extra(config.extra_countries.iter().cloned())
        .with_not_visited(config.not_visited.iter().cloned());
    countries.apply_renames(&config.renames);
    let reconciliation = countries.reconcile(shapes.iter());

    let histogram = HistogramBar::from_bins(&ledger.bins);
    Ok(Report {
        annotation: Annotation::from_total_km(ledger.total_distance_km),
        accepted_legs: ledger.accepted_legs,
        unique_routes: ledger.paths.len(),
        min_year: ledger.min_year,
        max_year: ledger.max_year,
        bins: ledger.bins,
        histogram,
        paths: ledger.paths,
        countries: reconciliation,
        skipped: ledger.skipped,
        left_inset: config.left_inset,
        right_inset: config.right_inset,
    })
}
