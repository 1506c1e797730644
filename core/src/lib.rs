//! Scan engine: classification, aggregation, scheduling and orchestration of
//! probe batches, plus the raw-socket prober that feeds them.

pub mod aggregator;
pub mod classifier;
pub mod network;
pub mod orchestrator;
pub mod prober;
pub mod scheduler;
