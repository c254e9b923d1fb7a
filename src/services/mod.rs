//! Service layer for Kassenbuch
//!
//! The service layer provides business logic on top of the store, handling
//! validation, session lifecycle, CSV import, and derived statistics.

pub mod category;
pub mod import;
pub mod session;

pub use category::{CategoryService, ResolvedEntry};
pub use import::{CsvModel, ImportService};
pub use session::SessionService;
