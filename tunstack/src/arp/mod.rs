//! Neighbor resolution state for an [`interface`](crate::interface).

mod table;

pub use table::{ArpConfig, ArpTable};
