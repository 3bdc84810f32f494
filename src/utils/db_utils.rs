use sqlx::{MySql, MySqlConnection, query::Query};

use crate::utils::response::bad_request;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    U32(u32),
    Bool(bool),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Column assignments for a partial update. Column names come from typed
/// payloads, never from request JSON keys.
pub type Changes = Vec<(&'static str, SqlValue)>;

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
pub fn build_update_sql(
    table: &str,
    changes: Changes,
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, actix_web::Error> {
    if changes.is_empty() {
        return Err(bad_request("No fields provided for update"));
    }

    let set_clause = changes
        .iter()
        .map(|(column, _)| format!("{} = ?", column))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values: Vec<SqlValue> = changes.into_iter().map(|(_, v)| v).collect();
    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

fn bind_value<'q>(
    query: Query<'q, MySql, sqlx::mysql::MySqlArguments>,
    value: SqlValue,
) -> Query<'q, MySql, sqlx::mysql::MySqlArguments> {
    match value {
        SqlValue::String(v) => query.bind(v),
        SqlValue::U64(v) => query.bind(v),
        SqlValue::U32(v) => query.bind(v),
        SqlValue::Bool(v) => query.bind(v),
        SqlValue::Null => query.bind(None::<String>),
    }
}

/// ===============================
/// Execute the update
/// ===============================
/// Takes a connection so callers can run it inside their own transaction.
pub async fn execute_update(conn: &mut MySqlConnection, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = bind_value(query, value);
    }

    let result = query.execute(conn).await?;
    Ok(result.rows_affected())
}

/// LIMIT/OFFSET window for a list endpoint: page from 1, at most 100 rows.
/// The offset is widened to u64 so no page number can overflow it.
pub fn page_window(page: Option<u32>, per_page: Option<u32>) -> (u32, u32, u64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(10).clamp(1, 100);
    let offset = u64::from(page - 1) * u64::from(per_page);
    (page, per_page, offset)
}

/// True when the error is a UNIQUE constraint violation (duplicate key).
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
