//! SQLite connection ownership and schema migrations.
//!
//! The application is single-writer: one connection behind a mutex. Every
//! multi-statement write goes through [`Database::write`], which wraps the
//! closure in an IMMEDIATE transaction and commits only when it returns
//! `Ok`.

mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub(crate) use schema::REQUIRED_TABLES;

const BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

pub struct Database {
  conn: Mutex<Connection>,
  path: Option<PathBuf>,
}

impl Database {
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)?;
      }
    }
    let mut conn = Connection::open(path)?;
    configure(&conn)?;
    migrate(&mut conn)?;
    info!(path = %path.display(), "database opened");
    Ok(Self {
      conn: Mutex::new(conn),
      path: Some(path.to_path_buf()),
    })
  }

  pub fn open_in_memory() -> Result<Self> {
    let mut conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrate(&mut conn)?;
    Ok(Self {
      conn: Mutex::new(conn),
      path: None,
    })
  }

  /// File backing the database, `None` when in memory.
  pub fn path(&self) -> Option<&Path> {
    self.path.as_deref()
  }

  /// A panic while holding the lock leaves the connection usable; any open
  /// transaction was rolled back when it dropped.
  fn lock(&self) -> MutexGuard<'_, Connection> {
    self
      .conn
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  pub fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T>,
  {
    let conn = self.lock();
    f(&*conn)
  }

  pub fn write<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T>,
  {
    let mut conn = self.lock();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&*tx)?;
    tx.commit()?;
    Ok(value)
  }

  /// Exclusive access to the raw connection, for backup and restore.
  pub(crate) fn with_connection_mut<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut Connection) -> Result<T>,
  {
    let mut conn = self.lock();
    f(&mut *conn)
  }
}

pub(crate) fn configure(conn: &Connection) -> Result<()> {
  conn.execute_batch(
    "PRAGMA journal_mode=WAL;\
     PRAGMA synchronous=NORMAL;\
     PRAGMA foreign_keys=ON;",
  )?;
  conn.busy_timeout(BUSY_TIMEOUT)?;
  Ok(())
}

pub fn schema_version(conn: &Connection) -> Result<i64> {
  Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

pub fn supported_schema_version() -> i64 {
  schema::MIGRATIONS.len() as i64
}

pub(crate) fn migrate(conn: &mut Connection) -> Result<()> {
  let current = schema_version(conn)?;
  let supported = supported_schema_version();
  if current > supported {
    return Err(Error::SchemaTooNew {
      found: current,
      supported,
    });
  }
  for (index, sql) in schema::MIGRATIONS.iter().enumerate().skip(current as usize) {
    let version = index as i64 + 1;
    let tx = conn.transaction()?;
    tx.execute_batch(sql)?;
    tx.pragma_update(None, "user_version", version)?;
    tx.commit()?;
    info!(version, "applied schema migration");
  }
  debug!(version = supported, "schema up to date");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn fresh_database_is_fully_migrated() {
    let db = Database::open_in_memory().unwrap();
    let version = db.read(|conn| schema_version(conn)).unwrap();
    assert_eq!(version, supported_schema_version());
    let settings_rows: i64 = db
      .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM company_settings", [], |row| row.get(0))?))
      .unwrap();
    assert_eq!(settings_rows, 1);
  }

  #[test]
  fn reopening_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("comptoir.sqlite");
    drop(Database::open(&path).unwrap());
    let db = Database::open(&path).unwrap();
    assert_eq!(db.path(), Some(path.as_path()));
    let version = db.read(|conn| schema_version(conn)).unwrap();
    assert_eq!(version, supported_schema_version());
  }

  #[test]
  fn refuses_newer_schema() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("future.sqlite");
    {
      let conn = Connection::open(&path).unwrap();
      conn.pragma_update(None, "user_version", 99_i64).unwrap();
    }
    let err = Database::open(&path).err().unwrap();
    assert!(matches!(err, Error::SchemaTooNew { found: 99, .. }));
  }

  #[test]
  fn failed_write_rolls_back() {
    let db = Database::open_in_memory().unwrap();
    let result: Result<()> = db.write(|conn| {
      conn.execute("INSERT INTO clients (name) VALUES ('Rollback')", [])?;
      Err(Error::invalid("name", "forced"))
    });
    assert!(result.is_err());
    let count: i64 = db
      .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM clients", [], |row| row.get(0))?))
      .unwrap();
    assert_eq!(count, 0);
  }
}
