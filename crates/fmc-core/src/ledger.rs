// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::airports::AirportDirectory;
use crate::geodesy::{self, DistanceModel, LineString};
use crate::{FmcError, Result};
use chrono::{Datelike, NaiveDate};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::io::Read;
use std::path::Path;

const MISSING_LOG_HINT: &str = "Pass the path of your flight log: a CSV with \
`origin,destination,date,purpose` rows and no header.";

/// Date of a leg; month and day are optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LegDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl LegDate {
    /// Accepts `YYYY`, `YYYY-MM` and `YYYY-MM-DD` (anything after the day
    /// digits, such as a time, is ignored).
    ///
    /// Only the year decides acceptance: it must be exactly four ASCII digits.
    /// A month or day that does not form a real date is dropped.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().splitn(3, '-');
        let year_str = parts.next()?;
        if year_str.len() != 4 || !year_str.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year = year_str.parse::<i32>().ok()?;

        let month = parts
            .next()
            .and_then(leading_number)
            .filter(|m| (1..=12).contains(m));
        let day = month.and_then(|m| {
            parts
                .next()
                .and_then(leading_number)
                .filter(|&d| NaiveDate::from_ymd_opt(year, m, d).is_some())
        });

        Some(LegDate { year, month, day })
    }
}

fn leading_number(s: &str) -> Option<u32> {
    s.split(|c: char| !c.is_ascii_digit()).next()?.parse().ok()
}

/// Histogram bucket a leg can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurposeClass {
    Business,
    Pleasure,
}

/// Free-text purpose; only two values are recognised as buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Purpose {
    Business,
    Pleasure,
    Other(String),
}

impl Purpose {
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("business") {
            Purpose::Business
        } else if trimmed.eq_ignore_ascii_case("pleasure") {
            Purpose::Pleasure
        } else {
            Purpose::Other(trimmed.to_string())
        }
    }

    pub fn class(&self) -> Option<PurposeClass> {
        match self {
            Purpose::Business => Some(PurposeClass::Business),
            Purpose::Pleasure => Some(PurposeClass::Pleasure),
            Purpose::Other(_) => None,
        }
    }
}

/// Undirected route: the smaller code always comes first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    pub first: String,
    pub second: String,
}

impl RouteKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        RouteKey {
            first: first.to_string(),
            second: second.to_string(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightLeg {
    pub origin: String,
    pub destination: String,
    pub date: LegDate,
    pub purpose: Purpose,
}

impl FlightLeg {
    pub fn route(&self) -> RouteKey {
        RouteKey::new(&self.origin, &self.destination)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    ShortRow { columns: usize },
    MalformedCode { origin: String, destination: String },
    MalformedDate(String),
    BeforeMinYear { year: i32, min_year: i32 },
    AfterMaxYear { year: i32, max_year: i32 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ShortRow { columns } => {
                write!(f, "row has {} columns, expected at least 3", columns)
            }
            SkipReason::MalformedCode {
                origin,
                destination,
            } => write!(
                f,
                "flight does not have valid codes (\"{}\" and \"{}\")",
                origin, destination
            ),
            SkipReason::MalformedDate(raw) => write!(f, "unparsable date \"{}\"", raw),
            SkipReason::BeforeMinYear { year, min_year } => {
                write!(f, "flight took place in {}, which was before {}", year, min_year)
            }
            SkipReason::AfterMaxYear { year, max_year } => {
                write!(f, "flight took place in {}, which was after {}", year, max_year)
            }
        }
    }
}

/// Result of parsing one log row.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Parsed(FlightLeg),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PurposeTotals {
    pub business: f64,
    pub pleasure: f64,
}

impl PurposeTotals {
    pub fn get(&self, class: PurposeClass) -> f64 {
        match class {
            PurposeClass::Business => self.business,
            PurposeClass::Pleasure => self.pleasure,
        }
    }
}

/// Distance per year and purpose, dense over `[min_year, max_year]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearPurposeBins {
    bins: BTreeMap<i32, PurposeTotals>,
}

impl YearPurposeBins {
    pub fn new(min_year: i32, max_year: i32) -> Self {
        let bins = (min_year..=max_year)
            .map(|year| (year, PurposeTotals::default()))
            .collect();
        Self { bins }
    }

    /// Returns false when `year` has no bin.
    pub fn add(&mut self, year: i32, class: PurposeClass, km: f64) -> bool {
        match self.bins.get_mut(&year) {
            Some(totals) => {
                match class {
                    PurposeClass::Business => totals.business += km,
                    PurposeClass::Pleasure => totals.pleasure += km,
                }
                true
            }
            None => false,
        }
    }

    pub fn get(&self, year: i32, class: PurposeClass) -> Option<f64> {
        self.bins.get(&year).map(|t| t.get(class))
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.bins.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &PurposeTotals)> + '_ {
        self.bins.iter().map(|(y, t)| (*y, t))
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Business plus pleasure for one year.
    pub fn year_total(&self, year: i32) -> Option<f64> {
        self.bins.get(&year).map(|t| t.business + t.pleasure)
    }

    /// Sum over every bin of one class.
    pub fn total(&self, class: PurposeClass) -> f64 {
        self.bins.values().map(|t| t.get(class)).sum()
    }
}

/// Geometry for one unique route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePath {
    pub route: RouteKey,
    /// Initial course from `route.first` towards `route.second`, in degrees.
    pub bearing_deg: f64,
    /// Empty when no great circle could be drawn (antipodal endpoints).
    pub lines: Vec<LineString>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerOptions {
    pub min_year: Option<i32>,
    /// Defaults to the current year.
    pub max_year: Option<i32>,
    pub max_segment_m: f64,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            min_year: None,
            max_year: None,
            max_segment_m: 12.0 * geodesy::METRES_PER_NAUTICAL_MILE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerReport {
    pub total_distance_km: f64,
    pub accepted_legs: usize,
    pub min_year: Option<i32>,
    pub max_year: i32,
    pub bins: YearPurposeBins,
    pub paths: Vec<RoutePath>,
    pub touched: BTreeSet<String>,
    pub skipped: Vec<SkippedRow>,
}

/// Single pass over a flight log, accumulating distance, histogram bins,
/// route geometry and touched countries.
pub struct FlightLedger<'a> {
    directory: &'a AirportDirectory,
    model: &'a dyn DistanceModel,
    max_segment_m: f64,
    min_year: Option<i32>,
    max_year: i32,
    bins: Option<YearPurposeBins>,
    seen_routes: HashSet<RouteKey>,
    paths: Vec<RoutePath>,
    touched: BTreeSet<String>,
    total_km: f64,
    accepted: usize,
    skipped: Vec<SkippedRow>,
}

impl<'a> FlightLedger<'a> {
    pub fn new(
        directory: &'a AirportDirectory,
        model: &'a dyn DistanceModel,
        options: LedgerOptions,
    ) -> Self {
        Self {
            directory,
            model,
            max_segment_m: options.max_segment_m,
            min_year: options.min_year,
            max_year: options
                .max_year
                .unwrap_or_else(|| chrono::Local::now().year()),
            bins: None,
            seen_routes: HashSet::new(),
            paths: Vec::new(),
            touched: BTreeSet::new(),
            total_km: 0.0,
            accepted: 0,
            skipped: Vec::new(),
        }
    }

    pub fn process_file<P: AsRef<Path>>(self, path: P) -> Result<LedgerReport> {
        let path = path.as_ref();
        FmcError::require("Flight log", path, MISSING_LOG_HINT)?;
        let file = std::fs::File::open(path)?;
        info!("Reading flight log — path={}", path.display());
        Ok(self.process_reader(file))
    }

    /// Bad rows are recorded and skipped; reading never fails halfway.
    pub fn process_reader<R: Read>(mut self, reader: R) -> LedgerReport {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        for (i, result) in rdr.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    error!("CSV parsing error: {}", e);
                    continue;
                }
            };
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(i as u64 + 1);
            if record.iter().all(|f| f.is_empty()) {
                continue;
            }
            let fields: Vec<&str> = record.iter().collect();
            self.push_row(line, &fields);
        }

        self.finish()
    }

    /// Parses one row without touching any accumulator.
    pub fn parse_row(&self, fields: &[&str]) -> LineOutcome {
        if fields.len() < 3 {
            return LineOutcome::Skipped(SkipReason::ShortRow {
                columns: fields.len(),
            });
        }

        let (origin, destination) = (fields[0], fields[1]);
        let code_len = self.directory.key().code_len();
        if origin.chars().count() != code_len || destination.chars().count() != code_len {
            return LineOutcome::Skipped(SkipReason::MalformedCode {
                origin: origin.to_string(),
                destination: destination.to_string(),
            });
        }

        let date = match LegDate::parse(fields[2]) {
            Some(d) => d,
            None => return LineOutcome::Skipped(SkipReason::MalformedDate(fields[2].to_string())),
        };

        LineOutcome::Parsed(FlightLeg {
            origin: origin.to_string(),
            destination: destination.to_string(),
            date,
            purpose: Purpose::classify(fields.get(3).copied().unwrap_or("")),
        })
    }

    pub fn push_row(&mut self, line: u64, fields: &[&str]) {
        match self.parse_row(fields) {
            LineOutcome::Parsed(leg) => {
                if let Err(reason) = self.accept(&leg) {
                    self.skip(line, reason);
                }
            }
            LineOutcome::Skipped(reason) => self.skip(line, reason),
        }
    }

    fn skip(&mut self, line: u64, reason: SkipReason) {
        debug!("Skipping flight log row — line={} reason={}", line, reason);
        self.skipped.push(SkippedRow { line, reason });
    }

    /// Range check and accumulation for a parsed leg.
    pub fn accept(&mut self, leg: &FlightLeg) -> std::result::Result<(), SkipReason> {
        let year = leg.date.year;
        let min_year = *self.min_year.get_or_insert(year);
        let max_year = self.max_year;
        let bins = self
            .bins
            .get_or_insert_with(|| YearPurposeBins::new(min_year, max_year));

        if year < min_year {
            return Err(SkipReason::BeforeMinYear { year, min_year });
        }
        if year > max_year {
            return Err(SkipReason::AfterMaxYear { year, max_year });
        }

        let from = self.directory.resolve_coordinates(&leg.origin);
        let to = self.directory.resolve_coordinates(&leg.destination);

        let km = match self.model.distance_km(from, to) {
            Ok(km) => km,
            Err(e) => {
                warn!(
                    "{} distance failed for {}-{}, using spherical: {}",
                    self.model.name(),
                    leg.origin,
                    leg.destination,
                    e
                );
                geodesy::great_circle_distance(from.0, from.1, to.0, to.1)
            }
        };
        debug!(
            "Flown {} ({:+10.6},{:+11.6}) to {} ({:+10.6},{:+11.6}) — distance_km={:.1}",
            leg.origin, from.1, from.0, leg.destination, to.1, to.0, km
        );

        self.total_km += km;
        if let Some(class) = leg.purpose.class() {
            bins.add(year, class, km);
        }
        self.accepted += 1;

        self.touched
            .insert(self.directory.resolve_country(&leg.origin));
        self.touched
            .insert(self.directory.resolve_country(&leg.destination));

        let route = leg.route();
        if self.seen_routes.insert(route.clone()) {
            let lines =
                match geodesy::great_circle_path(from.0, from.1, to.0, to.1, self.max_segment_m) {
                    Ok(lines) => lines,
                    Err(e) => {
                        warn!("No great circle drawn for {}: {}", route, e);
                        Vec::new()
                    }
                };
            let (a, b) = if route.first == leg.origin {
                (from, to)
            } else {
                (to, from)
            };
            let bearing_deg = geodesy::initial_bearing(a.0, a.1, b.0, b.1);
            self.paths.push(RoutePath {
                route,
                bearing_deg,
                lines,
            });
        }

        Ok(())
    }

    pub fn finish(self) -> LedgerReport {
        let bins = match (self.bins, self.min_year) {
            (Some(bins), _) => bins,
            (None, Some(min_year)) => YearPurposeBins::new(min_year, self.max_year),
            (None, None) => YearPurposeBins::default(),
        };

        info!(
            "Flight log processed — accepted={} skipped={} routes={} total_km={:.1}",
            self.accepted,
            self.skipped.len(),
            self.paths.len(),
            self.total_km
        );

        LedgerReport {
            total_distance_km: self.total_km,
            accepted_legs: self.accepted,
            min_year: self.min_year,
            max_year: self.max_year,
            bins,
            paths: self.paths,
            touched: self.touched,
            skipped: self.skipped,
        }
    }
}
