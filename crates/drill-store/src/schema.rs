/// SQL DDL for the interaction database.
pub const SCHEMA_VERSION: u32 = 1;

pub const PRAGMAS: &str = r"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA busy_timeout = 5000;
";

pub const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS interactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    simulation_id INTEGER NOT NULL,
    action TEXT NOT NULL,
    details TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_interactions_simulation ON interactions(simulation_id, id);
CREATE INDEX IF NOT EXISTS idx_interactions_user ON interactions(user_id, id);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
";
