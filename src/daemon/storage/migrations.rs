use rusqlite::Connection;
use tracing::debug;

const MIGRATION_0001: &str = include_str!("../../../migrations/0001_daily_usage.sql");

/// Every migration is idempotent, so the whole list is replayed on each start.
const MIGRATIONS: &[(&str, &str)] = &[("0001_daily_usage", MIGRATION_0001)];

pub fn migrate(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    for (name, sql) in MIGRATIONS {
        debug!("Applying migration {name}");
        tx.execute_batch(sql)?;
    }
    tx.commit()
}
