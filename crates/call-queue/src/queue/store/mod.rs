mod directory;
mod sqlite;

pub use directory::{DirectoryError, StaticDirectory};
pub use sqlite::SqliteCallStore;
