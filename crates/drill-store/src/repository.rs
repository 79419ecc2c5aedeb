//! Async seam between the live session server and interaction storage.

use async_trait::async_trait;

use drill_core::{InteractionRecord, NewInteraction};

use crate::database::Database;
use crate::error::StoreError;
use crate::interactions::InteractionRepo;

/// Durable storage for interaction records.
#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// Persist one record and return it with its assigned id and timestamp.
    async fn record_interaction(&self, entry: NewInteraction)
        -> Result<InteractionRecord, StoreError>;

    async fn get_interaction(&self, id: i64) -> Result<InteractionRecord, StoreError>;

    async fn list_for_simulation(
        &self,
        simulation_id: i64,
    ) -> Result<Vec<InteractionRecord>, StoreError>;

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<InteractionRecord>, StoreError>;
}

/// [`InteractionRepository`] over SQLite. Each call runs on the blocking pool.
#[derive(Clone)]
pub struct SqliteInteractionStore {
    repo: InteractionRepo,
}

impl SqliteInteractionStore {
    pub fn new(db: Database) -> Self {
        Self {
            repo: InteractionRepo::new(db),
        }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&InteractionRepo) -> Result<T, StoreError> + Send + 'static,
    {
        let repo = self.repo.clone();
        tokio::task::spawn_blocking(move || f(&repo)).await?
    }
}

#[async_trait]
impl InteractionRepository for SqliteInteractionStore {
    async fn record_interaction(
        &self,
        entry: NewInteraction,
    ) -> Result<InteractionRecord, StoreError> {
        self.run(move |repo| repo.insert(&entry)).await
    }

    async fn get_interaction(&self, id: i64) -> Result<InteractionRecord, StoreError> {
        self.run(move |repo| repo.get(id)).await
    }

    async fn list_for_simulation(
        &self,
        simulation_id: i64,
    ) -> Result<Vec<InteractionRecord>, StoreError> {
        self.run(move |repo| repo.list_for_simulation(simulation_id))
            .await
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<InteractionRecord>, StoreError> {
        self.run(move |repo| repo.list_for_user(user_id)).await
    }
}
