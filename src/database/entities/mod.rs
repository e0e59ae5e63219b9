pub mod script_nodes;
pub mod snapshots;
