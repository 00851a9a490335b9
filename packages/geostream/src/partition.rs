// Time-bucket partitioning and the replay cursor
//
// Groups are computed once from the immutable dataset. Replay walks an index
// over that list and resets it to zero after the last group, so every cycle
// emits the same groups in the same order.

use crate::dataset::Dataset;
use crate::record::{Group, TimeKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Order in which distinct time keys are replayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupOrder {
    /// Order of first appearance in the dataset
    #[default]
    FirstSeen,
    /// Sorted by time key
    Ascending,
}

impl FromStr for GroupOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first-seen" | "first_seen" | "firstseen" => Ok(Self::FirstSeen),
            "ascending" | "asc" | "sorted" => Ok(Self::Ascending),
            other => Err(format!(
                "unknown group order '{}' (expected first-seen or ascending)",
                other
            )),
        }
    }
}

/// Partition dataset rows by time key.
///
/// Every row lands in exactly one group, rows keep their dataset order inside
/// a group, and the result is identical for identical input.
pub fn group_by_time(dataset: &Dataset, order: GroupOrder) -> Vec<Group> {
    let mut slots: HashMap<&TimeKey, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for record in dataset.records() {
        match slots.get(&record.time) {
            Some(&slot) => groups[slot].rows.push(record.clone()),
            None => {
                slots.insert(&record.time, groups.len());
                groups.push(Group {
                    key: record.time.clone(),
                    rows: vec![record.clone()],
                });
            }
        }
    }

    if order == GroupOrder::Ascending {
        groups.sort_by(|a, b| a.key.cmp(&b.key));
    }

    groups
}

/// Endless, restartable sequence of groups
#[derive(Debug, Clone)]
pub struct Partitioner {
    groups: Vec<Group>,
    order: GroupOrder,
    /// Index of the group `next_group` returns next. Always `< groups.len()`.
    position: usize,
    cycles: u64,
}

impl Partitioner {
    pub fn new(dataset: &Dataset, order: GroupOrder) -> Self {
        let groups = group_by_time(dataset, order);

        log::info!(
            "Partitioned {} rows into {} time buckets ({:?} order)",
            dataset.len(),
            groups.len(),
            order
        );

        Self {
            groups,
            order,
            position: 0,
            cycles: 0,
        }
    }

    /// The precomputed groups of one cycle
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn order(&self) -> GroupOrder {
        self.order
    }

    /// Number of distinct time buckets in one cycle
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Index of the group that will be returned next
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of full cycles emitted so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Return the next group and advance the cursor, wrapping to the first
    /// group once the last one has been handed out.
    ///
    /// A `Dataset` always has at least one row, so there is always a group.
    pub fn next_group(&mut self) -> &Group {
        let current = self.position;
        self.position += 1;
        if self.position == self.groups.len() {
            self.position = 0;
            self.cycles += 1;
            log::debug!("Replay cycle {} complete, restarting", self.cycles);
        }
        &self.groups[current]
    }

    /// Rewind to the first group of a fresh cycle
    pub fn reset(&mut self) {
        self.position = 0;
        self.cycles = 0;
    }

    /// Infinite iterator over the groups, independent of the cursor
    pub fn cycle(&self) -> impl Iterator<Item = &Group> + '_ {
        self.groups.iter().cycle()
    }
}
