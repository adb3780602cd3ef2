//! Transformation module.
//!
//! - Resolver: target column → source column matching
//! - Rows: output table construction
//! - Grouper: split rows by product name
//! - Pipeline: read → resolve → transform → split → write

pub mod grouper;
pub mod pipeline;
pub mod resolver;
pub mod rows;

pub use grouper::{find_group_column, group_keys, partition, unit_name};
pub use pipeline::*;
pub use resolver::{resolve, resolve_all, similarity};
pub use rows::transform;
