//! School and infrastructure tables.
//!
//! These are the data contracts handed over by the external loaders. The core
//! only relies on a unique, non-empty identity per row and a finite (lat, lon).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::coordinate::UniqueCoordinate;
use crate::error::{GcmError, GcmResult};

/// A school to be connected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GigaSchool {
    pub giga_id: String,
    pub lat: f64,
    pub lon: f64,
    pub has_electricity: bool,
    /// Already on the fiber backbone
    pub has_fiber: bool,
    /// Reported mobile coverage, e.g. "4G"
    #[serde(default)]
    pub cell_coverage_type: Option<String>,
    /// Required bandwidth in Mbps
    pub bandwidth_demand: f64,
    #[serde(default)]
    pub num_students: Option<u32>,
}

impl GigaSchool {
    pub fn new(giga_id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            giga_id: giga_id.into(),
            lat,
            lon,
            has_electricity: true,
            has_fiber: false,
            cell_coverage_type: None,
            bandwidth_demand: 20.0,
            num_students: None,
        }
    }

    pub fn with_electricity(mut self, has_electricity: bool) -> Self {
        self.has_electricity = has_electricity;
        self
    }

    pub fn with_fiber(mut self, has_fiber: bool) -> Self {
        self.has_fiber = has_fiber;
        self
    }

    pub fn with_bandwidth_demand(mut self, mbps: f64) -> Self {
        self.bandwidth_demand = mbps;
        self
    }

    pub fn with_coverage(mut self, coverage: impl Into<String>) -> Self {
        self.cell_coverage_type = Some(coverage.into());
        self
    }

    pub fn to_coordinate(&self) -> UniqueCoordinate {
        UniqueCoordinate::new(self.giga_id.clone(), self.lat, self.lon)
    }
}

/// A cell tower usable for cellular or P2P backhaul.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellTower {
    pub tower_id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub height_m: f64,
    /// Radio technologies offered, e.g. ["3G", "4G"]
    #[serde(default)]
    pub technologies: Vec<String>,
}

impl CellTower {
    pub fn new(tower_id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            tower_id: tower_id.into(),
            lat,
            lon,
            height_m: 30.0,
            technologies: vec!["4G".to_string()],
        }
    }

    pub fn with_technologies(mut self, technologies: &[&str]) -> Self {
        self.technologies = technologies.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn offers_any(&self, valid: &[String]) -> bool {
        self.technologies
            .iter()
            .any(|t| valid.iter().any(|v| v.eq_ignore_ascii_case(t)))
    }

    pub fn to_coordinate(&self) -> UniqueCoordinate {
        UniqueCoordinate::new(self.tower_id.clone(), self.lat, self.lon)
            .with_property("height_m", self.height_m)
    }
}

fn validate_rows<'a>(
    table: &str,
    rows: impl Iterator<Item = (&'a str, f64, f64)>,
) -> GcmResult<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for (id, lat, lon) in rows {
        if id.trim().is_empty() {
            return Err(GcmError::Validation(format!("{table}: empty id")));
        }
        if !seen.insert(id) {
            return Err(GcmError::Validation(format!("{table}: duplicate id '{id}'")));
        }
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err(GcmError::Validation(format!(
                "{table}: '{id}' has invalid location ({lat}, {lon})"
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GigaSchoolTable {
    pub schools: Vec<GigaSchool>,
}

impl GigaSchoolTable {
    pub fn new(schools: Vec<GigaSchool>) -> Self {
        Self { schools }
    }

    pub fn validate(&self) -> GcmResult<()> {
        validate_rows(
            "schools",
            self.schools.iter().map(|s| (s.giga_id.as_str(), s.lat, s.lon)),
        )?;
        if let Some(s) = self
            .schools
            .iter()
            .find(|s| !s.bandwidth_demand.is_finite() || s.bandwidth_demand < 0.0)
        {
            return Err(GcmError::Validation(format!(
                "schools: '{}' has invalid bandwidth demand {}",
                s.giga_id, s.bandwidth_demand
            )));
        }
        Ok(())
    }

    pub fn to_coordinates(&self) -> Vec<UniqueCoordinate> {
        self.schools.iter().map(GigaSchool::to_coordinate).collect()
    }

    pub fn get(&self, giga_id: &str) -> Option<&GigaSchool> {
        self.schools.iter().find(|s| s.giga_id == giga_id)
    }

    pub fn len(&self) -> usize {
        self.schools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schools.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellTowerTable {
    pub towers: Vec<CellTower>,
}

impl CellTowerTable {
    pub fn new(towers: Vec<CellTower>) -> Self {
        Self { towers }
    }

    pub fn validate(&self) -> GcmResult<()> {
        validate_rows(
            "cell towers",
            self.towers.iter().map(|t| (t.tower_id.as_str(), t.lat, t.lon)),
        )
    }

    /// Towers offering at least one of `valid` technologies.
    pub fn filter_technologies(&self, valid: &[String]) -> Vec<&CellTower> {
        self.towers.iter().filter(|t| t.offers_any(valid)).collect()
    }

    pub fn to_coordinates(&self) -> Vec<UniqueCoordinate> {
        self.towers.iter().map(CellTower::to_coordinate).collect()
    }

    pub fn len(&self) -> usize {
        self.towers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.towers.is_empty()
    }
}

/// Generic coordinate table, used for fiber nodes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueCoordinateTable {
    pub coordinates: Vec<UniqueCoordinate>,
}

impl UniqueCoordinateTable {
    pub fn new(coordinates: Vec<UniqueCoordinate>) -> Self {
        Self { coordinates }
    }

    pub fn validate(&self) -> GcmResult<()> {
        validate_rows(
            "coordinates",
            self.coordinates
                .iter()
                .map(|c| (c.coordinate_id.as_str(), c.lat(), c.lon())),
        )
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_school_ids_rejected() {
        let table = GigaSchoolTable::new(vec![
            GigaSchool::new("a", 0.0, 0.0),
            GigaSchool::new("a", 1.0, 1.0),
        ]);
        let err = table.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate id 'a'"));
    }

    #[test]
    fn test_non_finite_location_rejected() {
        let table = GigaSchoolTable::new(vec![GigaSchool::new("a", f64::NAN, 0.0)]);
        assert!(table.validate().is_err());
        let towers = CellTowerTable::new(vec![CellTower::new("t", 0.0, 200.0)]);
        assert!(towers.validate().is_err());
    }

    #[test]
    fn test_empty_id_rejected() {
        let table = UniqueCoordinateTable::new(vec![UniqueCoordinate::new(" ", 0.0, 0.0)]);
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_tower_technology_filter_is_case_insensitive() {
        let towers = CellTowerTable::new(vec![
            CellTower::new("t1", 0.0, 0.0).with_technologies(&["2G"]),
            CellTower::new("t2", 0.0, 0.0).with_technologies(&["4g", "3G"]),
        ]);
        let valid = vec!["4G".to_string()];
        let kept = towers.filter_technologies(&valid);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].tower_id, "t2");
    }

    #[test]
    fn test_school_table_deserializes_from_array() {
        let json = r#"[{"giga_id": "s1", "lat": 1.0, "lon": 2.0, "has_electricity": false,
                        "has_fiber": false, "bandwidth_demand": 40.0}]"#;
        let table: GigaSchoolTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.schools[0].cell_coverage_type.is_none());
        table.validate().unwrap();
    }
}
