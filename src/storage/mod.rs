//! Persisted coordination state: the remote log bucket and the training
//! ledger that tracks which remote files already contributed to the model.

pub mod ledger;
pub mod object_store;

pub use ledger::{ProcessedFile, TrainingLedger};
pub use object_store::{LogStore, ObjectStore};
