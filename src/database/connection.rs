use log::{debug, error};
use rusqlite::{Connection, Result};

// Embed migrations from the migrations directory
refinery::embed_migrations!("migrations");

/// Opens a connection, enables foreign keys and brings the schema up to
/// date via the embedded refinery migrations.
pub fn init_connection(db_path: &str) -> Result<Connection> {
    let mut conn = Connection::open(db_path)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    match migrations::runner().run(&mut conn) {
        Ok(report) => {
            debug!("Applied {} migration(s)", report.applied_migrations().len());
        }
        Err(e) => {
            error!("Migration failure: {e}");
            return Err(rusqlite::Error::ExecuteReturnedResults);
        }
    }

    Ok(conn)
}
