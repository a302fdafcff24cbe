// Common library shared by the recorder and scheduler binaries

pub mod bootstrap;
pub mod capture;
pub mod config;
pub mod errors;
pub mod models;
pub mod naming;
pub mod recorder;
pub mod schedule;
pub mod scheduler;
pub mod storage;
pub mod telemetry;
