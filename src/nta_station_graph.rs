// Static station topology: per-line adjacency, names and locations
use geo::{Distance, Haversine, Point};
use log::info;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::nta_models::{Lang, LineAdjacency, NTAError, Result, StationInfo};

const BUNDLED_STATIONS: &str = include_str!("../data/stations.json");

/// Read-only lookup table over the station dataset.
#[derive(Debug, Clone, Default)]
pub struct StationGraph {
    stations: HashMap<String, StationInfo>,
}

impl StationGraph {
    pub fn new(stations: Vec<StationInfo>) -> Self {
        StationGraph {
            stations: stations.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    /// The dataset compiled into the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_STATIONS)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            NTAError::FileError(format!("Failed to read station dataset {:?}: {}", path, e))
        })?;
        let graph = Self::from_json(&contents)?;
        info!("Loaded {} stations from {:?}", graph.len(), path);
        Ok(graph)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let stations: Vec<StationInfo> = serde_json::from_str(contents)
            .map_err(|e| NTAError::ParseError(format!("Invalid station dataset: {}", e)))?;
        Ok(Self::new(stations))
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn station(&self, id: &str) -> Option<&StationInfo> {
        self.stations.get(id)
    }

    /// Previous/next stations of `station` on `line`; `None` for branch termini,
    /// unknown stations and lines the station is not recorded on.
    pub fn adjacency(&self, station: &str, line: &str) -> Option<&LineAdjacency> {
        self.stations.get(station)?.lines.get(line)
    }

    /// Name in `lang`, falling back to Korean, then any name, then the raw id.
    pub fn display_name<'a>(&'a self, id: &'a str, lang: Lang) -> &'a str {
        let Some(station) = self.stations.get(id) else {
            return id;
        };
        station
            .names
            .get(lang.code())
            .or_else(|| station.names.get(Lang::Ko.code()))
            .or_else(|| station.names.values().next())
            .map(String::as_str)
            .unwrap_or(id)
    }

    /// Stations whose name in any language contains `text` (case-insensitive).
    /// Blank text matches nothing.
    ///
    /// With a location the nearest stations come first; stations without
    /// coordinates sort after located ones. Without a location the order is by
    /// Korean name, then id.
    pub fn search(&self, text: &str, near: Option<Point<f64>>) -> Vec<&StationInfo> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<&StationInfo> = self
            .stations
            .values()
            .filter(|station| {
                station
                    .names
                    .values()
                    .any(|name| name.to_lowercase().contains(&needle))
            })
            .collect();

        matches.sort_by(|a, b| {
            let by_distance = match near {
                Some(origin) => Self::compare_distance(a, b, origin),
                None => Ordering::Equal,
            };
            by_distance
                .then_with(|| Self::sort_name(a).cmp(Self::sort_name(b)))
                .then_with(|| a.id.cmp(&b.id))
        });

        matches
    }

    fn sort_name(station: &StationInfo) -> &str {
        station
            .names
            .get(Lang::Ko.code())
            .map(String::as_str)
            .unwrap_or(&station.id)
    }

    fn location(station: &StationInfo) -> Option<Point<f64>> {
        Some(Point::new(station.lon?, station.lat?))
    }

    fn compare_distance(a: &StationInfo, b: &StationInfo, origin: Point<f64>) -> Ordering {
        let distance = |s: &StationInfo| Self::location(s).map(|p| Haversine.distance(origin, p));
        match (distance(a), distance(b)) {
            (Some(da), Some(db)) => da.total_cmp(&db),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}
