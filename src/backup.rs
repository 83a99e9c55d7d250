//! Database export and import through SQLite's online backup API.
//!
//! Import replaces the live database. A safety copy is taken first and put
//! back if the restore or the follow-up migration fails, so a bad file never
//! leaves the application without data.

use std::path::{Path, PathBuf};

use chrono::Local;
use rusqlite::backup::Progress;
use rusqlite::{Connection, DatabaseName, OpenFlags};
use tracing::{error, info, warn};

use crate::db::{self, Database, REQUIRED_TABLES};
use crate::error::{Error, Result};

fn ensure_parent(path: &Path) -> Result<()> {
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      std::fs::create_dir_all(parent)?;
    }
  }
  Ok(())
}

pub fn export(db: &Database, dest: &Path) -> Result<()> {
  ensure_parent(dest)?;
  db.with_connection_mut(|conn| {
    conn.backup(DatabaseName::Main, dest, None::<fn(Progress)>)?;
    Ok(())
  })?;
  info!(dest = %dest.display(), "database exported");
  Ok(())
}

/// Checks that `path` is a readable Comptoir database this build can
/// migrate. Returns its schema version.
pub fn inspect(path: &Path) -> Result<i64> {
  if !path.is_file() {
    return Err(Error::InvalidBackup(format!("{} is not a file", path.display())));
  }
  let conn = Connection::open_with_flags(
    path,
    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
  )
  .map_err(|err| Error::InvalidBackup(err.to_string()))?;
  let version = db::schema_version(&conn).map_err(|err| Error::InvalidBackup(err.to_string()))?;
  let supported = db::supported_schema_version();
  if version > supported {
    return Err(Error::SchemaTooNew {
      found: version,
      supported,
    });
  }
  for table in REQUIRED_TABLES {
    let present: bool = conn
      .query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [table],
        |row| row.get(0),
      )
      .map_err(|err| Error::InvalidBackup(err.to_string()))?;
    if !present {
      return Err(Error::InvalidBackup(format!("missing table {table}")));
    }
  }
  let check: String = conn
    .query_row("PRAGMA quick_check", [], |row| row.get(0))
    .map_err(|err| Error::InvalidBackup(err.to_string()))?;
  if check != "ok" {
    return Err(Error::InvalidBackup(format!("integrity check failed: {check}")));
  }
  Ok(version)
}

/// Replaces the live database with `src`. Returns the path of the safety
/// copy written under `safety_dir`.
pub fn import(db: &Database, src: &Path, safety_dir: &Path) -> Result<PathBuf> {
  let version = inspect(src)?;
  std::fs::create_dir_all(safety_dir)?;
  let safety = safety_dir.join(format!(
    "avant-import-{}.sqlite",
    Local::now().format("%Y%m%d-%H%M%S%.3f")
  ));

  db.with_connection_mut(|conn| {
    conn.backup(DatabaseName::Main, &safety, None::<fn(Progress)>)?;
    match restore_from(conn, src) {
      Ok(()) => {
        info!(src = %src.display(), version, safety = %safety.display(), "database imported");
        Ok(())
      }
      Err(err) => {
        warn!(src = %src.display(), error = %err, "import failed, restoring safety copy");
        if let Err(rollback) = restore_from(conn, &safety) {
          error!(safety = %safety.display(), error = %rollback, "safety copy restore failed");
        }
        Err(err)
      }
    }
  })?;
  Ok(safety)
}

fn restore_from(conn: &mut Connection, src: &Path) -> Result<()> {
  conn.flush_prepared_statement_cache();
  conn.restore(DatabaseName::Main, src, None::<fn(Progress)>)?;
  db::configure(conn)?;
  db::migrate(conn)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::clients;
  use crate::store::parties::PartyInput;
  use tempfile::TempDir;

  fn client_names(db: &Database) -> Vec<String> {
    db.read(|conn| clients::list(conn, None))
      .unwrap()
      .into_iter()
      .map(|client| client.name)
      .collect()
  }

  #[test]
  fn import_brings_back_exported_state() {
    let dir = TempDir::new().unwrap();
    let db = Database::open(dir.path().join("live.sqlite")).unwrap();
    db.write(|conn| clients::create(conn, &PartyInput::named("Avant")))
      .unwrap();

    let exported = dir.path().join("exports").join("copie.sqlite");
    export(&db, &exported).unwrap();
    assert_eq!(inspect(&exported).unwrap(), db::supported_schema_version());

    db.write(|conn| clients::create(conn, &PartyInput::named("Après")))
      .unwrap();
    let safety = import(&db, &exported, &dir.path().join("safety")).unwrap();

    assert_eq!(client_names(&db), vec!["Avant".to_string()]);
    assert!(safety.is_file());
  }

  #[test]
  fn garbage_file_is_rejected_and_data_kept() {
    let dir = TempDir::new().unwrap();
    let db = Database::open(dir.path().join("live.sqlite")).unwrap();
    db.write(|conn| clients::create(conn, &PartyInput::named("Intact")))
      .unwrap();

    let garbage = dir.path().join("notes.txt");
    std::fs::write(&garbage, b"ceci n'est pas une base").unwrap();
    let err = import(&db, &garbage, &dir.path().join("safety")).unwrap_err();
    assert_eq!(err.code(), "invalid_backup");
    assert_eq!(client_names(&db), vec!["Intact".to_string()]);
  }

  #[test]
  fn failed_migration_puts_the_safety_copy_back() {
    let dir = TempDir::new().unwrap();
    let db = Database::open(dir.path().join("live.sqlite")).unwrap();
    db.write(|conn| clients::create(conn, &PartyInput::named("Intact")))
      .unwrap();

    // Every expected table exists but the schema version says nothing was
    // migrated, so replaying the migrations collides with them.
    let stale = dir.path().join("stale.sqlite");
    {
      let conn = Connection::open(&stale).unwrap();
      for table in REQUIRED_TABLES {
        conn
          .execute_batch(&format!("CREATE TABLE {table} (id INTEGER PRIMARY KEY);"))
          .unwrap();
      }
    }
    assert_eq!(inspect(&stale).unwrap(), 0);

    let safety_dir = dir.path().join("safety");
    let err = import(&db, &stale, &safety_dir).unwrap_err();
    assert_eq!(err.code(), "storage");
    assert_eq!(client_names(&db), vec!["Intact".to_string()]);
    assert_eq!(std::fs::read_dir(&safety_dir).unwrap().count(), 1);
  }

  #[test]
  fn foreign_sqlite_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let other = dir.path().join("other.sqlite");
    {
      let conn = Connection::open(&other).unwrap();
      conn.execute_batch("CREATE TABLE notes (body TEXT);").unwrap();
    }
    let err = inspect(&other).unwrap_err();
    assert!(matches!(err, Error::InvalidBackup(_)));
  }
}
