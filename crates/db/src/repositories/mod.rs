//! `RequestSheet` implementations. Row ids are 1-based append positions in both.

pub mod memory;
pub mod request_sheet;

pub use memory::InMemoryRequestSheet;
pub use request_sheet::SqlRequestSheet;
