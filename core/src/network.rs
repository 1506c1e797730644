pub mod raw;
pub mod transport;
