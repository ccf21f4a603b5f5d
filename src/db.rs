use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

const SCHEMA: &str = include_str!("schema.sql");

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    // An in-memory SQLite database is private to its connection; with more
    // than one connection in the pool each would see an empty schema.
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

// Prepared statements take a single statement at a time, so the schema is
// applied statement by statement.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA.split(';') {
        let statement = statement.trim();
        if !statement.is_empty() {
            sqlx::query(statement).execute(pool).await?;
        }
    }
    Ok(())
}
