pub mod block;
pub mod inflater;
pub mod tables;

pub use block::{BlockHeader, BlockKind, InflateStats, PendingCopy};
pub use inflater::{Inflater, TrailingReader};
