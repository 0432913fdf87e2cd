//! Point-in-time snapshots of directory-tree disk usage.
//!
//! [`scan`] walks a tree and sums file sizes into every ancestor directory,
//! [`store`] persists the result and loads it back, and [`store::diff`]
//! ranks what grew or shrank between two snapshots.

pub mod cli;
pub mod config;
pub mod error;
pub mod platform;
pub mod report;
pub mod scan;
pub mod store;
pub mod util;
