// Storage module for the periodic-task table
//
// The table is read once per invocation as a snapshot, changed locally and
// written back whole. There is no locking against a second writer.

pub mod file;
pub mod system;
pub mod table;

use crate::errors::StorageError;
use async_trait::async_trait;

pub use file::FileCrontab;
pub use system::SystemCrontab;
pub use table::CronTable;

/// JobTable reads and replaces the whole periodic-task table
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobTable: Send + Sync {
    /// Read the current table
    async fn read(&self) -> Result<CronTable, StorageError>;

    /// Replace the table with `table`
    async fn write(&self, table: &CronTable) -> Result<(), StorageError>;
}
