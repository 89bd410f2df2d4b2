// Per-match runs table keyed by position. A missing entry means "not yet
// entered", which is different from a score of 0.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::assignment::Assignment;
use crate::league::Match;
use crate::position::Position;

/// Counts from one batch of score writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreChanges {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl ScoreChanges {
    pub fn is_empty(&self) -> bool {
        self.inserted == 0 && self.updated == 0 && self.removed == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreTable {
    runs: BTreeMap<Position, u32>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pos: &Position) -> Option<u32> {
        self.runs.get(pos).copied()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Position, u32)> {
        self.runs.iter().map(|(p, r)| (p, *r))
    }

    /// Apply a batch of writes. `None` clears the entry, matching a cell that
    /// was emptied in the sheet.
    pub fn upsert_many<I>(&mut self, entries: I) -> ScoreChanges
    where
        I: IntoIterator<Item = (Position, Option<u32>)>,
    {
        let mut changes = ScoreChanges::default();
        for (pos, runs) in entries {
            match runs {
                Some(runs) => match self.runs.insert(pos, runs) {
                    None => changes.inserted += 1,
                    Some(old) if old != runs => changes.updated += 1,
                    Some(_) => changes.unchanged += 1,
                },
                None => {
                    if self.runs.remove(&pos).is_some() {
                        changes.removed += 1;
                    }
                }
            }
        }
        changes
    }

    /// Drop every entry whose position is not in `keep`. Returns how many
    /// were removed.
    pub fn retain_positions(&mut self, keep: &BTreeSet<Position>) -> usize {
        let before = self.runs.len();
        self.runs.retain(|pos, _| keep.contains(pos));
        before - self.runs.len()
    }

    /// Whether both of the assignment's positions have an entered score.
    /// A half-imported assignment is never complete.
    pub fn is_complete(&self, assignment: &Assignment, m: &Match) -> bool {
        assignment
            .positions(m)
            .iter()
            .all(|p| p.as_ref().is_some_and(|p| self.runs.contains_key(p)))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
