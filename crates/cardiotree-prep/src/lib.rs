//! Train/test partitioning and rule-based cleaning for cardiotree tables.
//!
//! Both stages are pure: they take a [`cardiotree_io::Table`] by reference
//! and return new tables.

mod clean;
mod error;
mod partition;

pub use clean::{
    CleanConfig, CleanSummary, Cleaner, ColumnPolicy, DEFAULT_MISSING_THRESHOLD, DroppedColumn,
    Sentinel,
};
pub use error::PrepError;
pub use partition::{DEFAULT_TRAIN_FRACTION, Partition, Partitioner, StratumSplit};
