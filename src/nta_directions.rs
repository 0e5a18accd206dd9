// Direction groups of the trains arriving at one station
use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap};

use crate::nta_countdown::Countdown;
use crate::nta_models::TrainRecord;
use crate::nta_station_graph::StationGraph;
use crate::nta_trains::{CellId, TrainCell, TrainStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

/// Trains heading the same way, earliest first.
#[derive(Debug, Clone)]
pub struct DirectionGroup {
    id: GroupId,
    key: String,
    line: String,
    line_name: String,
    /// Resolved when the group first appears and never recomputed
    previous_station: Option<String>,
    trains: Vec<CellId>,
    earliest_eta: NaiveDateTime,
}

impl DirectionGroup {
    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn line_name(&self) -> &str {
        &self.line_name
    }

    pub fn previous_station(&self) -> Option<&str> {
        self.previous_station.as_deref()
    }

    pub fn trains(&self) -> &[CellId] {
        &self.trains
    }
}

pub struct DirectionGrouper {
    station_id: String,
    supported_lines: BTreeSet<String>,
    groups: HashMap<String, DirectionGroup>,
    /// Group keys in display order
    order: Vec<String>,
    next_id: u64,
}

impl DirectionGrouper {
    pub fn new<I, S>(station_id: impl Into<String>, supported_lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DirectionGrouper {
            station_id: station_id.into(),
            supported_lines: supported_lines.into_iter().map(Into::into).collect(),
            groups: HashMap::new(),
            order: Vec::new(),
            next_id: 0,
        }
    }

    pub fn is_supported(&self, line: &str) -> bool {
        self.supported_lines.contains(line)
    }

    /// `"{destination}-{nextStation}"` when both are known, the line name otherwise.
    ///
    /// The fallback can put unrelated notices of one line (e.g. last-train
    /// messages) into a single group.
    pub fn direction_key(record: &TrainRecord) -> String {
        match (&record.destination, &record.next_station) {
            (Some(destination), Some(next)) => format!("{}-{}", destination, next),
            _ => record.line_name.clone(),
        }
    }

    /// Station a train heading to `next_station` on `line` has just left.
    ///
    /// `None` when the station has no adjacency on that line or the train's
    /// next stop matches neither neighbour (branches, gaps in the dataset).
    pub fn resolve_previous_station(
        graph: &StationGraph,
        station_id: &str,
        line: &str,
        next_station: Option<&str>,
    ) -> Option<String> {
        let next_station = next_station?;
        let adjacency = graph.adjacency(station_id, line)?;

        if adjacency.next_station.as_deref() == Some(next_station) {
            adjacency.prev_station.clone()
        } else if adjacency.prev_station.as_deref() == Some(next_station) {
            adjacency.next_station.clone()
        } else {
            None
        }
    }

    /// Rebuilds group membership from the store.
    ///
    /// Existing keys keep their group (id and previous station); new keys get a
    /// group with the previous station resolved once; keys absent from the store
    /// lose their group.
    pub fn regroup(&mut self, store: &TrainStore, graph: &StationGraph) {
        let mut buckets: HashMap<String, Vec<&TrainCell>> = HashMap::new();
        for cell in store.iter() {
            if !self.is_supported(&cell.record().line) {
                continue;
            }
            buckets
                .entry(Self::direction_key(cell.record()))
                .or_default()
                .push(cell);
        }

        self.groups.retain(|key, _| buckets.contains_key(key));

        for (key, mut cells) in buckets {
            cells.sort_by(|a, b| Countdown::compare(a.record(), b.record()));
            let first = cells[0].record();
            let trains: Vec<CellId> = cells.iter().map(|cell| cell.id()).collect();

            match self.groups.get_mut(&key) {
                Some(group) => {
                    group.trains = trains;
                    group.line = first.line.clone();
                    group.line_name = first.line_name.clone();
                    group.earliest_eta = first.eta;
                }
                None => {
                    let previous_station = Self::resolve_previous_station(
                        graph,
                        &self.station_id,
                        &first.line,
                        first.next_station.as_deref(),
                    );
                    let id = GroupId(self.next_id);
                    self.next_id += 1;
                    self.groups.insert(
                        key.clone(),
                        DirectionGroup {
                            id,
                            key,
                            line: first.line.clone(),
                            line_name: first.line_name.clone(),
                            previous_station,
                            trains,
                            earliest_eta: first.eta,
                        },
                    );
                }
            }
        }

        let mut order: Vec<&DirectionGroup> = self.groups.values().collect();
        order.sort_by(|a, b| {
            a.line
                .cmp(&b.line)
                .then_with(|| a.line_name.cmp(&b.line_name))
                .then_with(|| a.earliest_eta.cmp(&b.earliest_eta))
                .then_with(|| a.key.cmp(&b.key))
        });
        self.order = order.into_iter().map(|group| group.key.clone()).collect();
    }

    /// Groups in display order: line, then line name, then earliest arrival.
    pub fn groups(&self) -> impl Iterator<Item = &DirectionGroup> + '_ {
        self.order.iter().filter_map(|key| self.groups.get(key))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }
}
