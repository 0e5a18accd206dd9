// Stable per-train cells across arrival polls
use std::collections::{HashMap, HashSet};

use crate::nta_models::TrainRecord;

/// Stable handle of a train cell. Never reused within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

/// Train ids are only unique within a line, so cells are keyed by both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TrainKey {
    line: String,
    train: String,
}

impl TrainKey {
    fn of(record: &TrainRecord) -> Self {
        TrainKey {
            line: record.line.clone(),
            train: record.train.clone(),
        }
    }
}

/// Latest record of one physical train, plus view state anchored to the train.
#[derive(Debug, Clone)]
pub struct TrainCell {
    id: CellId,
    record: TrainRecord,
    expanded: bool,
}

impl TrainCell {
    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn record(&self) -> &TrainRecord {
        &self.record
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: Vec<CellId>,
    pub updated: Vec<CellId>,
    pub removed: Vec<CellId>,
}

#[derive(Debug, Default)]
pub struct TrainStore {
    cells: HashMap<CellId, TrainCell>,
    by_key: HashMap<TrainKey, CellId>,
    /// Cells in the order of the latest batch
    order: Vec<CellId>,
    next_id: u64,
}

impl TrainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a new batch into the store.
    ///
    /// Known trains keep their cell (and its view state) and get the new record;
    /// unknown trains get a fresh cell; trains missing from the batch lose theirs.
    /// A train listed twice in one batch keeps its last record.
    pub fn reconcile(&mut self, records: &[TrainRecord]) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        let mut seen: HashSet<CellId> = HashSet::with_capacity(records.len());
        let mut order = Vec::with_capacity(records.len());

        for record in records {
            let key = TrainKey::of(record);
            match self.by_key.get(&key).copied() {
                Some(id) => {
                    if let Some(cell) = self.cells.get_mut(&id) {
                        cell.record = record.clone();
                    }
                    if seen.insert(id) {
                        order.push(id);
                        summary.updated.push(id);
                    }
                }
                None => {
                    let id = CellId(self.next_id);
                    self.next_id += 1;
                    self.cells.insert(
                        id,
                        TrainCell {
                            id,
                            record: record.clone(),
                            expanded: false,
                        },
                    );
                    self.by_key.insert(key, id);
                    seen.insert(id);
                    order.push(id);
                    summary.added.push(id);
                }
            }
        }

        self.by_key.retain(|_, id| seen.contains(id));
        self.cells.retain(|id, _| {
            let keep = seen.contains(id);
            if !keep {
                summary.removed.push(*id);
            }
            keep
        });
        summary.removed.sort();
        self.order = order;

        summary
    }

    pub fn get(&self, id: CellId) -> Option<&TrainCell> {
        self.cells.get(&id)
    }

    /// Cells in the order of the latest batch.
    pub fn iter(&self) -> impl Iterator<Item = &TrainCell> + '_ {
        self.order.iter().filter_map(|id| self.cells.get(id))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.by_key.clear();
        self.order.clear();
    }

    pub fn toggle_expanded(&mut self, id: CellId) -> Option<bool> {
        let cell = self.cells.get_mut(&id)?;
        cell.expanded = !cell.expanded;
        Some(cell.expanded)
    }
}
