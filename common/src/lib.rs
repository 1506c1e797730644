pub mod config;
pub mod error;
pub mod log;
pub mod network;
pub mod probe;
pub mod scan;
pub mod utils;
pub mod vendors;

pub use tracing;
