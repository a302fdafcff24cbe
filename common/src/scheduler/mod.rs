// Scheduler module for the named recording jobs in the periodic-task table

pub mod engine;
pub mod listing;

pub use engine::JobScheduler;
pub use listing::{render_listing, NO_JOBS};
