// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::config::CountryRename;
use crate::{FmcError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const MISSING_NAMES_HINT: &str = "Country outlines come from Natural Earth. Download the \
admin-0 countries dataset (https://www.naturalearthdata.com/downloads/, e.g. \
ne_10m_admin_0_countries) as GeoJSON and place it at the path above, or pass its location \
with --countries.";

/// Countries gathered from the flight log plus the user's adjustments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountrySet {
    touched: BTreeSet<String>,
    not_visited: BTreeSet<String>,
}

impl CountrySet {
    pub fn new(touched: BTreeSet<String>) -> Self {
        Self {
            touched,
            not_visited: BTreeSet::new(),
        }
    }

    /// Countries visited without a flight.
    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.touched.extend(extra.into_iter().map(Into::into));
        self
    }

    /// Countries flown to but not counted, such as a transfer airport.
    pub fn with_not_visited<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.not_visited.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn touched(&self) -> &BTreeSet<String> {
        &self.touched
    }

    pub fn apply_renames(&mut self, renames: &[CountryRename]) {
        let touched = std::mem::take(&mut self.touched);
        self.touched = apply_renames(touched, renames);
    }

    pub fn reconcile<I, S>(self, external: I) -> Reconciliation
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        reconcile(self.touched, external, &self.not_visited)
    }
}

/// Applies renames in order; a rename whose source is absent does nothing.
pub fn apply_renames(mut touched: BTreeSet<String>, renames: &[CountryRename]) -> BTreeSet<String> {
    for rename in renames {
        if touched.remove(&rename.from) {
            debug!("Renamed country — from={} to={}", rename.from, rename.to);
            touched.insert(rename.to.clone());
        }
    }
    touched
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub visited: BTreeSet<String>,
    /// Touched but never found in the external source, or excluded by the
    /// not-visited list.
    pub unmatched: BTreeSet<String>,
}

impl Reconciliation {
    /// Console digest: unmatched names first, then visited, each sorted.
    pub fn digest_lines(&self) -> Vec<String> {
        let not_drawn = self
            .unmatched
            .iter()
            .map(|name| format!("\"{}\" was not drawn.", name));
        let visited = self
            .visited
            .iter()
            .map(|name| format!("\"{}\" has been visited.", name));
        not_drawn.chain(visited).collect()
    }
}

/// Scans `external` once, moving every matched name out of the working set.
pub fn reconcile<I, S>(
    mut touched: BTreeSet<String>,
    external: I,
    not_visited: &BTreeSet<String>,
) -> Reconciliation
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut visited = BTreeSet::new();
    for name in external {
        let name = name.as_ref();
        if not_visited.contains(name) {
            continue;
        }
        if let Some(found) = touched.take(name) {
            visited.insert(found);
        }
    }

    Reconciliation {
        visited,
        unmatched: touched,
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<FeatureProperties>,
}

#[derive(Deserialize)]
struct FeatureProperties {
    #[serde(rename = "NAME")]
    name_upper: Option<String>,
    #[serde(rename = "NAME_LONG")]
    name_long: Option<String>,
    name: Option<String>,
}

impl FeatureProperties {
    fn into_name(self) -> Option<String> {
        self.name_upper.or(self.name_long).or(self.name)
    }
}

/// Country names of the external polygon source, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeNames {
    names: Vec<String>,
}

impl ShapeNames {
    /// `.txt` and `.lst` files are name lists; anything else is GeoJSON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        FmcError::require("Country outlines", path, MISSING_NAMES_HINT)?;

        let file = BufReader::new(std::fs::File::open(path)?);
        let is_list = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("txt") || e.eq_ignore_ascii_case("lst"))
            .unwrap_or(false);

        let names = if is_list {
            Self::parse_list(file)?
        } else {
            Self::parse_geojson(file)?
        };
        info!(
            "Loaded country names — path={} names={}",
            path.display(),
            names.len()
        );
        Ok(names)
    }

    pub fn parse_geojson<R: Read>(reader: R) -> Result<Self> {
        let collection: FeatureCollection = serde_json::from_reader(reader)?;
        let names = collection
            .features
            .into_iter()
            .filter_map(|f| f.properties.and_then(FeatureProperties::into_name))
            .collect();
        Ok(Self { names })
    }

    pub fn parse_list<R: BufRead>(reader: R) -> Result<Self> {
        let mut names = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            names.push(trimmed.to_string());
        }
        Ok(Self { names })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn rename(from: &str, to: &str) -> CountryRename {
        CountryRename {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    #[test]
    fn test_apply_renames() {
        let touched = set(&["United States", "Czech Republic", "France"]);
        let renamed = apply_renames(
            touched,
            &[
                rename("United States", "United States of America"),
                rename("Czech Republic", "Czechia"),
                rename("Narnia", "Nowhere"),
            ],
        );
        assert_eq!(
            renamed,
            set(&["Czechia", "France", "United States of America"])
        );
    }

    #[test]
    fn test_renames_apply_in_order() {
        let renamed = apply_renames(set(&["A"]), &[rename("A", "B"), rename("B", "C")]);
        assert_eq!(renamed, set(&["C"]));

        // Two sources collapsing onto one target leave a single entry.
        let renamed = apply_renames(set(&["A", "B"]), &[rename("A", "C"), rename("B", "C")]);
        assert_eq!(renamed, set(&["C"]));
    }

    #[test]
    fn test_reconcile_classifies_each_country_once() {
        let touched = set(&["France", "Germany", "Atlantis", "Switzerland"]);
        let not_visited = set(&["Switzerland"]);
        let external = ["Germany", "France", "Switzerland", "Germany", "Italy"];

        let result = reconcile(touched.clone(), external, &not_visited);

        assert_eq!(result.visited, set(&["France", "Germany"]));
        assert_eq!(result.unmatched, set(&["Atlantis", "Switzerland"]));
        assert!(result.visited.is_disjoint(&result.unmatched));
        let union: BTreeSet<String> = result.visited.union(&result.unmatched).cloned().collect();
        assert_eq!(union, touched);
    }

    #[test]
    fn test_country_set_pipeline() {
        let mut countries = CountrySet::new(set(&["United States", "ERROR"]))
            .with_extra(["Canada"])
            .with_not_visited(vec!["Canada".to_string()]);
        countries.apply_renames(&[rename("United States", "United States of America")]);
        assert_eq!(
            countries.touched(),
            &set(&["Canada", "ERROR", "United States of America"])
        );

        let result = countries.reconcile(["Canada", "United States of America", "Mexico"]);
        assert_eq!(result.visited, set(&["United States of America"]));
        assert_eq!(result.unmatched, set(&["Canada", "ERROR"]));
    }

    #[test]
    fn test_digest_lines_order() {
        let result = Reconciliation {
            visited: set(&["Japan", "France"]),
            unmatched: set(&["Zanzibar", "ERROR"]),
        };
        assert_eq!(
            result.digest_lines(),
            vec![
                "\"ERROR\" was not drawn.",
                "\"Zanzibar\" was not drawn.",
                "\"France\" has been visited.",
                "\"Japan\" has been visited.",
            ]
        );
    }

    #[test]
    fn test_parse_geojson_names() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"NAME": "France", "NAME_LONG": "French Republic"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
                {"type": "Feature", "properties": {"NAME_LONG": "Kingdom of Spain"}, "geometry": null},
                {"type": "Feature", "properties": {"name": "Italy"}, "geometry": null},
                {"type": "Feature", "properties": null, "geometry": null}
            ]
        }"#;
        let names = ShapeNames::parse_geojson(Cursor::new(json)).unwrap();
        assert_eq!(
            names.iter().collect::<Vec<_>>(),
            vec!["France", "Kingdom of Spain", "Italy"]
        );
    }

    #[test]
    fn test_parse_name_list() {
        let list = "# Natural Earth names\nFrance\n\n  Germany  \n# end\n";
        let names = ShapeNames::parse_list(Cursor::new(list)).unwrap();
        assert_eq!(names.iter().collect::<Vec<_>>(), vec!["France", "Germany"]);
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let list = dir.path().join("names.txt");
        std::fs::write(&list, "Peru\nChile\n").unwrap();
        assert_eq!(ShapeNames::load(&list).unwrap().len(), 2);

        let geojson = dir.path().join("countries.geojson");
        std::fs::write(
            &geojson,
            r#"{"type":"FeatureCollection","features":[{"properties":{"NAME":"Peru"}}]}"#,
        )
        .unwrap();
        assert_eq!(ShapeNames::load(&geojson).unwrap().len(), 1);

        let err = ShapeNames::load(dir.path().join("missing.geojson")).unwrap_err();
        assert!(matches!(err, FmcError::MissingResource { .. }));
    }
}
