#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::suspicious_map,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::op_ref
)]

//! Plans cable distribution over a network of installable routes: finds paths
//! between terminals along the routes, keeps the cheapest path per terminal pair,
//! and partitions the terminals into size-bounded groups.

pub mod config;
pub mod discovery;
pub mod errors;
pub mod export;
pub mod geometry;
pub mod graph;
pub mod grouping;
pub mod loader;
pub mod network;
pub mod path;
pub mod path_walker;
pub mod planner;
pub mod segment_walker;

#[cfg(test)]
mod test_planning;

pub use config::{DiscoveryMode, PlannerConfig};
pub use errors::{NoPathFound, PlanError, WalkFailure};
pub use graph::{EdgeData, EdgeMetric, GraphBuilder, TerminalGraph};
pub use grouping::{Group, GroupEdge, GroupPartitioner};
pub use network::{RouteNetwork, SnapMode, Terminal};
pub use path::DiscoveredPath;
pub use path_walker::{ObstacleSet, PathWalker, WalkParams};
pub use segment_walker::SegmentFrontierWalker;
