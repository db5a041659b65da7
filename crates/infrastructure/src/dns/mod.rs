pub mod client;
pub mod dissector;
pub mod names;
pub mod transport;
