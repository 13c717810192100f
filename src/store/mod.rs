//!  State is owned by [activity_store::ActivityStore].
//!  The basic idea is:
//!   - There is a single snapshot file with the whole persisted state.
//!   - The snapshot is read once on startup and rewritten on every mutation.
//!   - Aggregates are recomputed from the in-memory list on each query.

pub mod activity_store;
pub mod entities;
pub mod snapshot;
