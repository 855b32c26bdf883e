pub mod connection;
pub mod ledger_file;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use ledger_file::JsonFileLedgerStore;
pub use repositories::{InMemoryRequestSheet, SqlRequestSheet};
