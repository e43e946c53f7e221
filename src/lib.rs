pub mod cli;
pub mod config;
pub mod gateway;
pub mod namespaces;
pub mod server;
pub mod telemetry;
