use chrono::Utc;
use tracing::instrument;

use drill_core::{InteractionAction, InteractionRecord, NewInteraction};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const TABLE: &str = "interactions";

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, simulation_id, action, details, created_at FROM interactions";

/// Synchronous access to the `interactions` table.
#[derive(Clone)]
pub struct InteractionRepo {
    db: Database,
}

impl InteractionRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a record. The id and creation timestamp are assigned here.
    #[instrument(skip(self, entry), fields(user_id = entry.user_id, simulation_id = entry.simulation_id, action = %entry.action))]
    pub fn insert(&self, entry: &NewInteraction) -> Result<InteractionRecord, StoreError> {
        let created_at = Utc::now().to_rfc3339();
        let details = serde_json::to_string(&entry.details)?;

        self.db.with_conn(|conn| {
            let _ = conn.execute(
                "INSERT INTO interactions (user_id, simulation_id, action, details, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    entry.user_id,
                    entry.simulation_id,
                    entry.action.as_str(),
                    details,
                    created_at,
                ],
            )?;

            Ok(InteractionRecord {
                id: conn.last_insert_rowid(),
                user_id: entry.user_id,
                simulation_id: entry.simulation_id,
                action: entry.action,
                details: entry.details.clone(),
                created_at,
            })
        })
    }

    /// Get a record by id.
    pub fn get(&self, id: i64) -> Result<InteractionRecord, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => row_to_interaction(row),
                None => Err(StoreError::NotFound(format!("interaction {id}"))),
            }
        })
    }

    /// All records for a simulation, oldest first.
    pub fn list_for_simulation(
        &self,
        simulation_id: i64,
    ) -> Result<Vec<InteractionRecord>, StoreError> {
        self.list_where("simulation_id", simulation_id)
    }

    /// All records for a participant, oldest first.
    pub fn list_for_user(&self, user_id: i64) -> Result<Vec<InteractionRecord>, StoreError> {
        self.list_where("user_id", user_id)
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM interactions", [], |row| row.get(0))?)
        })
    }

    fn list_where(
        &self,
        column: &'static str,
        value: i64,
    ) -> Result<Vec<InteractionRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{SELECT_COLUMNS} WHERE {column} = ?1 ORDER BY id ASC"))?;
            let mut rows = stmt.query([value])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(row_to_interaction(row)?);
            }
            Ok(out)
        })
    }
}

fn row_to_interaction(row: &rusqlite::Row<'_>) -> Result<InteractionRecord, StoreError> {
    let action: String = row_helpers::get(row, 3, TABLE, "action")?;
    let details: String = row_helpers::get(row, 4, TABLE, "details")?;
    Ok(InteractionRecord {
        id: row_helpers::get(row, 0, TABLE, "id")?,
        user_id: row_helpers::get(row, 1, TABLE, "user_id")?,
        simulation_id: row_helpers::get(row, 2, TABLE, "simulation_id")?,
        action: row_helpers::parse_enum::<InteractionAction>(&action, TABLE, "action")?,
        details: row_helpers::parse_json(&details, TABLE, "details")?,
        created_at: row_helpers::get(row, 5, TABLE, "created_at")?,
    })
}
