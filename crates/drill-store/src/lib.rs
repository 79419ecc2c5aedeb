pub mod database;
pub mod error;
pub mod interactions;
pub mod repository;
pub mod row_helpers;
pub mod schema;

pub use database::Database;
pub use error::StoreError;
pub use interactions::InteractionRepo;
pub use repository::{InteractionRepository, SqliteInteractionStore};
