// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use fmc_core::{CountryRename, DirectoryKey, DistanceModelKind, ReportConfig};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Flight log CSV: origin,destination,date,purpose (no header)
    flight_log: PathBuf,

    /// JSON configuration file; flags given here override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// OpenFlights airports.dat
    #[arg(long, env = "FMC_AIRPORTS")]
    airports: Option<PathBuf>,

    /// Which code column the log uses
    #[arg(long, value_enum)]
    key: Option<KeyArg>,

    /// Country outlines (GeoJSON, or a .txt list of names)
    #[arg(long, env = "FMC_COUNTRIES")]
    countries: Option<PathBuf>,

    /// Report path [default: flight log with a .json extension]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Country visited without flying there
    #[arg(long = "extra-country", value_name = "NAME")]
    extra_countries: Vec<String>,

    /// Country flown to but not visited
    #[arg(long = "not-visited", value_name = "NAME")]
    not_visited: Vec<String>,

    /// Rename a directory country to its outline name
    #[arg(long = "rename", value_name = "FROM=TO", value_parser = parse_rename)]
    renames: Vec<CountryRename>,

    #[arg(long)]
    min_year: Option<i32>,

    #[arg(long)]
    max_year: Option<i32>,

    #[arg(long, value_enum)]
    model: Option<ModelArg>,

    /// Iteration cap for the ellipsoidal solver
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Fail on duplicate airport codes
    #[arg(long)]
    validate: bool,

    #[arg(short, long, conflicts_with = "quiet")]
    debug: bool,

    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum KeyArg {
    Iata,
    Icao,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelArg {
    Spherical,
    Vincenty,
}

fn parse_rename(s: &str) -> std::result::Result<CountryRename, String> {
    s.parse::<CountryRename>().map_err(|e| e.to_string())
}

impl Cli {
    fn apply(self, config: &mut ReportConfig) {
        config.flight_log = self.flight_log;
        if let Some(path) = self.airports {
            config.airport_db = path;
        }
        if let Some(key) = self.key {
            config.directory_key = match key {
                KeyArg::Iata => DirectoryKey::Iata,
                KeyArg::Icao => DirectoryKey::Icao,
            };
        }
        if let Some(path) = self.countries {
            config.country_names = path;
        }
        if self.output.is_some() {
            config.output = self.output;
        }
        config.extra_countries.extend(self.extra_countries);
        config.not_visited.extend(self.not_visited);
        config.renames.extend(self.renames);
        if self.min_year.is_some() {
            config.min_year = self.min_year;
        }
        if self.max_year.is_some() {
            config.max_year = self.max_year;
        }
        if let Some(model) = self.model {
            config.distance_model = match model {
                ModelArg::Spherical => DistanceModelKind::Spherical,
                ModelArg::Vincenty => DistanceModelKind::Vincenty,
            };
        }
        if let Some(n) = self.max_iterations {
            config.max_iterations = n;
        }
        config.validate |= self.validate;
        config.debug |= self.debug;
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let quiet = cli.quiet;

    let mut config = match &cli.config {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ReportConfig::default(),
    };
    cli.apply(&mut config);

    let level = if config.debug {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .context("Failed to initialise logging")?;

    let report = fmc_core::generate(&config).with_context(|| {
        format!(
            "Failed to build flight map for {}",
            config.flight_log.display()
        )
    })?;

    println!("{}", report.annotation);
    for line in report.digest_lines() {
        println!("{}", line);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_file_values() {
        let mut config = ReportConfig {
            min_year: Some(2010),
            renames: vec!["A=B".parse().unwrap()],
            extra_countries: vec!["Canada".to_string()],
            ..ReportConfig::default()
        };

        let cli = Cli::try_parse_from([
            "fmc",
            "flights.csv",
            "--min-year",
            "2015",
            "--rename",
            "Czech Republic=Czechia",
            "--extra-country",
            "Mexico",
            "--model",
            "spherical",
            "--key",
            "icao",
        ])
        .unwrap();
        cli.apply(&mut config);

        assert_eq!(config.flight_log, PathBuf::from("flights.csv"));
        assert_eq!(config.min_year, Some(2015));
        assert_eq!(config.renames.len(), 2);
        assert_eq!(config.renames[1].to, "Czechia");
        assert_eq!(config.extra_countries, vec!["Canada", "Mexico"]);
        assert_eq!(config.distance_model, DistanceModelKind::Spherical);
        assert_eq!(config.directory_key, DirectoryKey::Icao);
        assert_eq!(config.output_path(), PathBuf::from("flights.json"));
    }

    #[test]
    fn test_rejects_malformed_rename() {
        assert!(Cli::try_parse_from(["fmc", "flights.csv", "--rename", "Czechia"]).is_err());
    }

    #[test]
    fn test_debug_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["fmc", "flights.csv", "--debug", "--quiet"]).is_err());
    }
}
