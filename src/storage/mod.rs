pub mod snapshots;

pub use snapshots::{SnapshotEntry, SnapshotStore, SNAPSHOT_SUFFIX};
