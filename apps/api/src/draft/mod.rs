// Draft editing engine: the in-memory resume model, change detection against
// the last persisted snapshot, the auto-save reconciler, the injected draft
// cache, and ordered-list reordering.

pub mod autosave;
pub mod cache;
pub mod diff;
pub mod model;
pub mod reorder;
