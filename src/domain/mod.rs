//! Core domain types: listings, the stage graph, financing records and the
//! ports the application layer depends on.

pub mod financing;
pub mod listing;
pub mod ports;
pub mod request;
pub mod stage_graph;
