/*! Branded identifiers. */

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one [`crate::snapshot::Snapshot`] within the lifetime of the process.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
pub struct SnapshotId(pub u64);

impl SnapshotId {
  /// Allocate a fresh, process-unique snapshot id.
  pub fn next() -> Self {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    Self(COUNTER.fetch_add(1, Ordering::Relaxed))
  }
}

/// Index of an element within its snapshot's arena. Meaningless outside that snapshot.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From, Into,
)]
pub struct ElementIndex(pub usize);

/// A resolved element reference: `(snapshot_id, element_index)` per the data model.
///
/// Not a pointer into the live UI — valid only for the lifetime of the snapshot that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
  pub snapshot_id: SnapshotId,
  pub index: ElementIndex,
}

impl ElementRef {
  pub const fn new(snapshot_id: SnapshotId, index: ElementIndex) -> Self {
    Self { snapshot_id, index }
  }
}

/// macOS process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
pub struct ProcessId(pub u32);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn snapshot_ids_are_unique_and_increasing() {
    let a = SnapshotId::next();
    let b = SnapshotId::next();
    assert_ne!(a, b);
    assert!(b.0 > a.0);
  }
}
