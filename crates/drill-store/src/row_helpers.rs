use crate::error::StoreError;

/// Get a required column value from a row, returning `CorruptRow` on failure.
pub fn get<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

/// Parse a JSON string column, returning `CorruptRow` on parse failure.
pub fn parse_json(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<serde_json::Value, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: format!("invalid JSON: {e}"),
    })
}

/// Parse a text column through `FromStr`, returning `CorruptRow` on failure.
pub fn parse_enum<T>(raw: &str, table: &'static str, column: &'static str) -> Result<T, StoreError>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse().map_err(|detail| StoreError::CorruptRow {
        table,
        column,
        detail,
    })
}
