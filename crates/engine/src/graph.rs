// PDL - PHP Debug Log
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Variable graph reconstruction
//!
//! Starting from the variables in scope, properties are fetched breadth-first
//! and their children queued behind them. Two names reaching the same storage
//! cell (a PHP reference, an object handle shared by two variables, or an
//! object that points back at itself) are detected by identity address: the
//! first name to reach a cell owns it, and every later name is recorded as a
//! reference to that owner without being expanded again. Since the set of
//! visited addresses only grows, the walk terminates even on cyclic graphs.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, trace};

use crate::{
    dbgp::DbgpResult,
    variable::{PlaceholderAddresses, Variable},
};

/// Anything properties can be fetched from by name
#[allow(async_fn_in_trait)]
pub trait PropertySource {
    /// Fetch one property and the names of its immediate children
    async fn fetch_property(
        &mut self,
        name: &str,
        addresses: &mut PlaceholderAddresses,
    ) -> DbgpResult<Variable>;
}

/// What a name resolved to in a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotEntry {
    /// The first name to reach a storage cell, with its contents
    Value(Variable),
    /// A later name for a cell already recorded under the given name
    Reference(String),
}

impl SnapshotEntry {
    /// Text printed after the name
    pub fn display_value(&self) -> String {
        match self {
            Self::Value(variable) => variable.to_string(),
            Self::Reference(owner) => format!("(Reference to {owner})"),
        }
    }

    /// Children to print below this entry; references have none
    pub fn children(&self) -> &[String] {
        match self {
            Self::Value(variable) => variable.children(),
            Self::Reference(_) => &[],
        }
    }
}

/// Every name reached from the variables in scope at one stop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    order: Vec<String>,
    entries: HashMap<String, SnapshotEntry>,
}

impl Snapshot {
    /// Entry recorded for a name; ignored names have none
    pub fn get(&self, name: &str) -> Option<&SnapshotEntry> {
        self.entries.get(name)
    }

    /// Whether a name was recorded
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Recorded names in the order they were reached
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    /// Number of recorded names
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn insert(&mut self, name: String, entry: SnapshotEntry) {
        self.order.push(name.clone());
        self.entries.insert(name, entry);
    }
}

/// Breadth-first walker over the debuggee's variables.
///
/// Owns the placeholder generator so placeholder identities stay unique for
/// the whole session; the visited set lives only as long as one
/// [`reconstruct`](Self::reconstruct) call.
#[derive(Debug, Default)]
pub struct GraphReconstructor {
    addresses: PlaceholderAddresses,
}

impl GraphReconstructor {
    /// A reconstructor with a fresh placeholder sequence
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk the graph below `roots`, skipping (and never fetching) every name
    /// for which `ignore` holds.
    pub async fn reconstruct<P, F>(
        &mut self,
        source: &mut P,
        roots: impl IntoIterator<Item = String>,
        ignore: F,
    ) -> DbgpResult<Snapshot>
    where
        P: PropertySource,
        F: Fn(&str) -> bool,
    {
        let mut worklist: VecDeque<String> = roots.into_iter().collect();
        // identity address -> first name that reached it
        let mut visited: HashMap<String, String> = HashMap::new();
        let mut snapshot = Snapshot::default();

        while let Some(name) = worklist.pop_front() {
            if ignore(&name) {
                trace!(%name, "Ignored");
                continue;
            }
            if snapshot.contains(&name) {
                continue;
            }

            let variable = source.fetch_property(&name, &mut self.addresses).await?;
            if let Some(owner) = visited.get(variable.address()) {
                trace!(%name, %owner, address = variable.address(), "Already visited");
                let entry = SnapshotEntry::Reference(owner.clone());
                snapshot.insert(name, entry);
                continue;
            }

            visited.insert(variable.address().to_string(), name.clone());
            worklist.extend(variable.children().iter().cloned());
            snapshot.insert(name, SnapshotEntry::Value(variable));
        }

        debug!(names = snapshot.len(), cells = visited.len(), "Snapshot reconstructed");
        Ok(snapshot)
    }
}
