// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::{FmcError, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Country returned for a code that cannot be resolved.
pub const UNRESOLVED_COUNTRY: &str = "ERROR";

const MISSING_DB_HINT: &str = "The airport database is a separately provisioned dataset. \
Download `airports.dat` from the OpenFlights project (https://github.com/jpatokal/openflights, \
data/airports.dat) and place it at the path above, or pass its location with --airports.";

/// Column that flight log codes are matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryKey {
    #[default]
    Iata,
    Icao,
}

impl DirectoryKey {
    /// Length of a well-formed code for this key.
    pub fn code_len(self) -> usize {
        match self {
            DirectoryKey::Iata => 3,
            DirectoryKey::Icao => 4,
        }
    }

    fn label(self) -> &'static str {
        match self {
            DirectoryKey::Iata => "IATA",
            DirectoryKey::Icao => "ICAO",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportRecord {
    pub id: Option<i64>,
    pub name: String,
    pub city: String,
    /// As spelled by the directory, not normalized.
    pub country: String,
    pub iata: Option<String>,
    pub icao: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_ft: Option<f64>,
    pub utc_offset_hr: Option<f64>,
    pub dst: Option<String>,
    pub tz_name: Option<String>,
}

impl AirportRecord {
    fn from_fields(record: &csv::StringRecord) -> Self {
        let text = |i: usize| record.get(i).unwrap_or("").to_string();
        let number = |i: usize| record.get(i).and_then(|s| s.trim().parse::<f64>().ok());

        AirportRecord {
            id: record.get(0).and_then(|s| s.trim().parse::<i64>().ok()),
            name: text(1),
            city: text(2),
            country: text(3),
            iata: optional_text(record.get(4)),
            icao: optional_text(record.get(5)),
            latitude: number(6),
            longitude: number(7),
            altitude_ft: number(8),
            utc_offset_hr: number(9),
            dst: optional_text(record.get(10)),
            tz_name: optional_text(record.get(11)),
        }
    }

    pub fn code(&self, key: DirectoryKey) -> Option<&str> {
        match key {
            DirectoryKey::Iata => self.iata.as_deref(),
            DirectoryKey::Icao => self.icao.as_deref(),
        }
    }
}

/// OpenFlights writes `\N` for absent values.
fn optional_text(field: Option<&str>) -> Option<String> {
    match field {
        Some(s) if !s.is_empty() && s != "\\N" => Some(s.to_string()),
        _ => None,
    }
}

/// In-memory airport reference table.
///
/// Loaded once and never mutated; codes resolve through an index that keeps
/// the first record carrying each code.
#[derive(Debug, Clone)]
pub struct AirportDirectory {
    records: Vec<AirportRecord>,
    key: DirectoryKey,
    index: HashMap<String, usize>,
    overrides: HashMap<String, String>,
}

impl AirportDirectory {
    pub fn default_path() -> PathBuf {
        crate::get_data_root().join("airports.dat")
    }

    /// Overrides applied when no table is configured: airports that have been
    /// removed from the reference data but still appear in old logs.
    pub fn default_overrides() -> HashMap<String, String> {
        // Berlin Tegel, closed May 2021.
        HashMap::from([("TXL".to_string(), "Germany".to_string())])
    }

    pub fn load<P: AsRef<Path>>(path: P, key: DirectoryKey) -> Result<Self> {
        let path = path.as_ref();
        FmcError::require("Airport database", path, MISSING_DB_HINT)?;

        let file = std::fs::File::open(path)?;
        let directory = Self::parse(file, key)?;
        info!(
            "Loaded airport directory — path={} records={} key={}",
            path.display(),
            directory.len(),
            key.label()
        );
        Ok(directory)
    }

    pub fn parse<R: Read>(reader: R, key: DirectoryKey) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = Vec::with_capacity(8000);
        for result in rdr.byte_records() {
            let row = result?;
            if row.iter().any(|f| std::str::from_utf8(f).is_err()) {
                warn!(
                    "Airport row is not valid UTF-8, decoding lossily — line={}",
                    row.position().map(|p| p.line()).unwrap_or(0)
                );
            }
            let row = csv::StringRecord::from_byte_record_lossy(row);
            if row.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            records.push(AirportRecord::from_fields(&row));
        }

        Ok(Self::from_records(records, key))
    }

    pub fn from_records(records: Vec<AirportRecord>, key: DirectoryKey) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if let Some(code) = record.code(key) {
                index.entry(code.to_string()).or_insert(i);
            }
        }

        Self {
            records,
            key,
            index,
            overrides: Self::default_overrides(),
        }
    }

    pub fn with_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn key(&self) -> DirectoryKey {
        self.key
    }

    pub fn records(&self) -> &[AirportRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, code: &str) -> Option<&AirportRecord> {
        self.index.get(code).map(|&i| &self.records[i])
    }

    /// Returns `(lon, lat)` in degrees, or `(0.0, 0.0)` with a warning when the
    /// code is unknown or the record has no position.
    pub fn resolve_coordinates(&self, code: &str) -> (f64, f64) {
        match self.find(code) {
            Some(AirportRecord {
                longitude: Some(lon),
                latitude: Some(lat),
                ..
            }) => (*lon, *lat),
            Some(_) => {
                warn!("{} has no coordinates in the airport database", code);
                (0.0, 0.0)
            }
            None => {
                warn!("{} is not in the airport database", code);
                (0.0, 0.0)
            }
        }
    }

    /// Country name for `code`; the override table wins over the directory.
    pub fn resolve_country(&self, code: &str) -> String {
        if let Some(country) = self.overrides.get(code) {
            debug!("Country override applied — code={} country={}", code, country);
            return country.clone();
        }

        match self.find(code) {
            Some(record) => record.country.clone(),
            None => {
                warn!("{} is not in the airport database", code);
                UNRESOLVED_COUNTRY.to_string()
            }
        }
    }

    /// Fails on the first IATA (then ICAO) code carried by two records.
    pub fn validate(&self) -> Result<()> {
        for (kind, key) in [("IATA", DirectoryKey::Iata), ("ICAO", DirectoryKey::Icao)] {
            let mut seen = HashSet::new();
            for code in self.records.iter().filter_map(|r| r.code(key)) {
                if !seen.insert(code) {
                    return Err(FmcError::DataIntegrity {
                        kind,
                        code: code.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = r#"1,"Goroka Airport","Goroka","Papua New Guinea","GKA","AYGA",-6.081689834590001,145.391998291,5282,10,"U","Pacific/Port_Moresby","airport","OurAirports"
507,"London Heathrow Airport","London","United Kingdom","LHR","EGLL",51.4706,-0.461941,83,0,"E","Europe/London","airport","OurAirports"
3797,"John F Kennedy International Airport","New York","United States","JFK","KJFK",40.63980103,-73.77890015,13,-5,"A","America/New_York","airport","OurAirports"
9999,"Nowhere Strip","Nowhere","Atlantis",\N,"XXXX",not-a-number,12.5,\N,\N,\N,\N
"#;

    fn sample() -> AirportDirectory {
        AirportDirectory::parse(Cursor::new(SAMPLE), DirectoryKey::Iata).unwrap()
    }

    #[test]
    fn test_parse_airports() {
        let db = sample();
        assert_eq!(db.len(), 4);

        let lhr = db.find("LHR").unwrap();
        assert_eq!(lhr.id, Some(507));
        assert_eq!(lhr.city, "London");
        assert_eq!(lhr.country, "United Kingdom");
        assert_eq!(lhr.icao.as_deref(), Some("EGLL"));
        assert_eq!(lhr.altitude_ft, Some(83.0));
        assert_eq!(lhr.utc_offset_hr, Some(0.0));
        assert_eq!(lhr.dst.as_deref(), Some("E"));
        assert_eq!(lhr.tz_name.as_deref(), Some("Europe/London"));
    }

    #[test]
    fn test_absent_fields_are_not_zero() {
        let db = sample();
        let strip = &db.records()[3];
        assert_eq!(strip.iata, None);
        assert_eq!(strip.icao.as_deref(), Some("XXXX"));
        assert_eq!(strip.latitude, None);
        assert_eq!(strip.longitude, Some(12.5));
        assert_eq!(strip.altitude_ft, None);
        assert_eq!(strip.tz_name, None);
    }

    #[test]
    fn test_invalid_utf8_row_does_not_abort_load() {
        let mut data = Vec::new();
        data.extend_from_slice(
            b"507,\"London Heathrow Airport\",\"London\",\"United Kingdom\",\"LHR\",\"EGLL\",51.4706,-0.461941,83,0,\"E\",\"Europe/London\"\n",
        );
        data.extend_from_slice(
            b"42,\"Bad \xff Field\",\"Somewhere\",\"Nowhere\",\"BAD\",\"XBAD\",1.0,2.0,0,0,\"N\",\"UTC\"\n",
        );
        data.extend_from_slice(
            b"1382,\"Charles de Gaulle International Airport\",\"Paris\",\"France\",\"CDG\",\"LFPG\",49.012798,2.55,392,1,\"E\",\"Europe/Paris\"\n",
        );

        let db = AirportDirectory::parse(Cursor::new(data), DirectoryKey::Iata).unwrap();
        assert_eq!(db.len(), 3);
        assert_eq!(db.resolve_country("LHR"), "United Kingdom");
        assert_eq!(db.resolve_country("CDG"), "France");

        let bad = db.find("BAD").unwrap();
        assert!(bad.name.contains('\u{FFFD}'));
        assert_eq!(bad.latitude, Some(1.0));
    }

    #[test]
    fn test_resolve_coordinates() {
        let db = sample();
        let (lon, lat) = db.resolve_coordinates("JFK");
        assert!((lon - -73.77890015).abs() < 1e-9);
        assert!((lat - 40.63980103).abs() < 1e-9);
    }

    #[test]
    fn test_unresolved_code_uses_sentinels() {
        let db = AirportDirectory::parse(Cursor::new(SAMPLE), DirectoryKey::Iata)
            .unwrap()
            .with_overrides(HashMap::new());
        assert_eq!(db.resolve_coordinates("ZZZ"), (0.0, 0.0));
        assert_eq!(db.resolve_country("ZZZ"), UNRESOLVED_COUNTRY);
    }

    #[test]
    fn test_country_override_table() {
        let db = sample();
        // TXL is not in the sample but the default table knows it.
        assert_eq!(db.resolve_country("TXL"), "Germany");

        let custom = sample().with_overrides(HashMap::from([(
            "LHR".to_string(),
            "England".to_string(),
        )]));
        assert_eq!(custom.resolve_country("LHR"), "England");
        assert_eq!(custom.resolve_country("TXL"), UNRESOLVED_COUNTRY);
    }

    #[test]
    fn test_icao_keyed_directory() {
        let db = AirportDirectory::parse(Cursor::new(SAMPLE), DirectoryKey::Icao).unwrap();
        assert_eq!(db.key().code_len(), 4);
        assert_eq!(db.resolve_country("EGLL"), "United Kingdom");
        assert!(db.find("LHR").is_none());
        // Record without a latitude resolves to the sentinel position.
        assert_eq!(db.resolve_coordinates("XXXX"), (0.0, 0.0));
    }

    #[test]
    fn test_validate_detects_duplicates() {
        let db = sample();
        assert!(db.validate().is_ok());

        let dup = format!(
            "{}10,\"Other\",\"Elsewhere\",\"Nowhere\",\"LHR\",\"ZZZZ\",1,1,1,1,\"N\",\"UTC\"\n",
            SAMPLE
        );
        let db = AirportDirectory::parse(Cursor::new(dup), DirectoryKey::Iata).unwrap();
        match db.validate() {
            Err(FmcError::DataIntegrity { kind, code }) => {
                assert_eq!(kind, "IATA");
                assert_eq!(code, "LHR");
            }
            other => panic!("expected DataIntegrity, got {:?}", other),
        }
        // First record still wins for lookups.
        assert_eq!(db.resolve_country("LHR"), "United Kingdom");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AirportDirectory::load(dir.path().join("airports.dat"), DirectoryKey::Iata)
            .unwrap_err();
        assert!(matches!(err, FmcError::MissingResource { .. }));
    }
}
