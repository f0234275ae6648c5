use sqlx_sqlite_conn_mgr::{Error, SqliteDatabase, SqliteDatabaseConfig};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
   let mut name = OsString::from(path.as_os_str());
   name.push(suffix);
   PathBuf::from(name)
}

async fn pragma_i64(db: &SqliteDatabase, pragma: &str) -> i64 {
   let mut conn = db.acquire_writer().await.unwrap();
   sqlx::query_scalar(&format!("PRAGMA {pragma}"))
      .fetch_one(&mut *conn)
      .await
      .unwrap()
}

#[tokio::test]
async fn test_connect_creates_file_and_parents() {
   let dir = TempDir::new().unwrap();
   let test_path = dir.path().join("nested").join("app").join("storage.db");

   let db = SqliteDatabase::connect(&test_path, None).await.unwrap();

   assert!(test_path.exists(), "Database file should be created");
   assert_eq!(db.path(), std::fs::canonicalize(&test_path).unwrap());

   db.close().await.unwrap();
}

#[tokio::test]
async fn test_empty_path_rejected() {
   let result = SqliteDatabase::connect("", None).await;
   assert!(matches!(result, Err(Error::Io(_))));
}

#[tokio::test]
async fn test_second_open_rejected_until_closed() {
   let dir = TempDir::new().unwrap();
   let test_path = dir.path().join("single.db");

   let db = SqliteDatabase::connect(&test_path, None).await.unwrap();

   // A different spelling of the same file is still the same file
   let alias = dir.path().join(".").join("single.db");
   let second = SqliteDatabase::connect(&alias, None).await;
   assert!(
      matches!(second, Err(Error::AlreadyOpen(_))),
      "Second open should be rejected, got {second:?}"
   );

   db.close().await.unwrap();

   let reopened = SqliteDatabase::connect(&test_path, None).await.unwrap();
   reopened.close().await.unwrap();
}

#[tokio::test]
async fn test_drop_releases_path() {
   let dir = TempDir::new().unwrap();
   let test_path = dir.path().join("dropped.db");

   let db = SqliteDatabase::connect(&test_path, None).await.unwrap();
   drop(db);

   let reopened = SqliteDatabase::connect(&test_path, None).await.unwrap();
   reopened.close().await.unwrap();
}

#[tokio::test]
async fn test_memory_databases_never_registered() {
   let db1 = SqliteDatabase::connect(":memory:", None).await.unwrap();
   let db2 = SqliteDatabase::connect(":memory:", None).await.unwrap();

   // Each in-memory database is independent and keeps its data between acquires
   sqlx::query("CREATE TABLE only_in_one (id INTEGER)")
      .execute(&mut *db1.acquire_writer().await.unwrap())
      .await
      .unwrap();

   let in_db1: i64 = sqlx::query_scalar(
      "SELECT COUNT(*) FROM sqlite_master WHERE name = 'only_in_one'",
   )
   .fetch_one(&mut *db1.acquire_writer().await.unwrap())
   .await
   .unwrap();
   let in_db2: i64 = sqlx::query_scalar(
      "SELECT COUNT(*) FROM sqlite_master WHERE name = 'only_in_one'",
   )
   .fetch_one(&mut *db2.acquire_writer().await.unwrap())
   .await
   .unwrap();

   assert_eq!((in_db1, in_db2), (1, 0));

   db1.close().await.unwrap();
   db2.close().await.unwrap();
}

#[tokio::test]
async fn test_foreign_keys_deferred_until_pragmas_applied() {
   let dir = TempDir::new().unwrap();
   let db = SqliteDatabase::connect(dir.path().join("fk.db"), None)
      .await
      .unwrap();

   assert_eq!(pragma_i64(&db, "foreign_keys").await, 0);

   db.apply_pragmas().await.unwrap();

   // Session pragmas survive returning the connection to the pool
   assert_eq!(pragma_i64(&db, "foreign_keys").await, 1);
   assert_eq!(pragma_i64(&db, "synchronous").await, 1);

   let mut conn = db.acquire_writer().await.unwrap();
   let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
      .fetch_one(&mut *conn)
      .await
      .unwrap();
   assert_eq!(mode.to_lowercase(), "wal");
   drop(conn);

   db.close().await.unwrap();
}

#[tokio::test]
async fn test_custom_config() {
   let dir = TempDir::new().unwrap();

   let custom_config = SqliteDatabaseConfig {
      busy_timeout_secs: 10,
      pragmas: vec![("cache_size".into(), "-4000".into())],
      optimize_on_close: false,
   };

   let db = SqliteDatabase::connect(dir.path().join("custom.db"), Some(custom_config))
      .await
      .unwrap();
   db.apply_pragmas().await.unwrap();

   assert_eq!(pragma_i64(&db, "busy_timeout").await, 10_000);
   assert_eq!(pragma_i64(&db, "cache_size").await, -4000);
   // Not in the configured list, so still off
   assert_eq!(pragma_i64(&db, "foreign_keys").await, 0);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn test_invalid_pragmas_rejected_before_running() {
   let dir = TempDir::new().unwrap();

   let bad_name = SqliteDatabaseConfig {
      pragmas: vec![
         ("foreign_keys".into(), "ON".into()),
         ("journal mode".into(), "WAL".into()),
      ],
      ..Default::default()
   };
   let db = SqliteDatabase::connect(dir.path().join("bad_name.db"), Some(bad_name))
      .await
      .unwrap();

   let err = db.apply_pragmas().await.unwrap_err();
   assert!(matches!(err, Error::InvalidPragma(ref name) if name == "journal mode"));
   assert_eq!(pragma_i64(&db, "foreign_keys").await, 0, "Nothing should run");
   db.close().await.unwrap();

   let bad_value = SqliteDatabaseConfig {
      pragmas: vec![("foreign_keys".into(), "ON; DROP TABLE users".into())],
      ..Default::default()
   };
   let db = SqliteDatabase::connect(dir.path().join("bad_value.db"), Some(bad_value))
      .await
      .unwrap();

   assert!(matches!(
      db.apply_pragmas().await,
      Err(Error::InvalidPragma(_))
   ));
   db.close().await.unwrap();
}

#[tokio::test]
async fn test_wal_checkpoint_on_close() {
   let dir = TempDir::new().unwrap();
   let test_path = dir.path().join("test_wal_checkpoint.db");

   let db = SqliteDatabase::connect(&test_path, None).await.unwrap();
   db.apply_pragmas().await.unwrap();

   let mut conn = db.acquire_writer().await.unwrap();
   sqlx::query("CREATE TABLE test (id INTEGER, value TEXT)")
      .execute(&mut *conn)
      .await
      .unwrap();

   sqlx::query("INSERT INTO test (id, value) VALUES (1, 'test')")
      .execute(&mut *conn)
      .await
      .unwrap();

   drop(conn);

   // WAL file should exist with data
   let wal_path = sidecar(&test_path, "-wal");
   assert!(wal_path.exists(), "WAL file should exist after write");

   db.close().await.unwrap();

   // WAL file should be either 0 bytes or not exist
   if wal_path.exists() {
      let wal_size = std::fs::metadata(&wal_path).unwrap().len();
      assert_eq!(wal_size, 0, "WAL file should be 0 bytes after checkpoint");
   }

   // The data made it into the main file
   let db = SqliteDatabase::connect(&test_path, None).await.unwrap();
   let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM test")
      .fetch_one(&mut *db.acquire_writer().await.unwrap())
      .await
      .unwrap();
   assert_eq!(count, 1);
   db.close().await.unwrap();
}

#[tokio::test]
async fn test_remove() {
   let dir = TempDir::new().unwrap();
   let test_path = dir.path().join("test_close_remove.db");

   let db = SqliteDatabase::connect(&test_path, None).await.unwrap();
   db.apply_pragmas().await.unwrap();

   // Perform write to create WAL and SHM files
   sqlx::query("CREATE TABLE test (id INTEGER)")
      .execute(&mut *db.acquire_writer().await.unwrap())
      .await
      .unwrap();

   assert!(test_path.exists(), "Database file should exist");

   db.remove().await.unwrap();

   // All files should be removed
   assert!(!test_path.exists(), "Database file should be removed");
   assert!(!sidecar(&test_path, "-wal").exists(), "WAL file should be removed");
   assert!(!sidecar(&test_path, "-shm").exists(), "SHM file should be removed");

   // The path is free again
   let db = SqliteDatabase::connect(&test_path, None).await.unwrap();
   db.close().await.unwrap();
}

#[tokio::test]
async fn test_access_serialization() {
   use std::sync::atomic::{AtomicUsize, Ordering};
   use tokio::sync::Barrier;

   let dir = TempDir::new().unwrap();
   let db = Arc::new(
      SqliteDatabase::connect(dir.path().join("serial.db"), None)
         .await
         .unwrap(),
   );
   sqlx::raw_sql("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (0)")
      .execute(&mut *db.acquire_writer().await.unwrap())
      .await
      .unwrap();

   let barrier = Arc::new(Barrier::new(3));
   let (active, max) = (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)));

   let handles: Vec<_> = (0..3)
      .map(|_| {
         let (db, barrier, active, max) = (
            Arc::clone(&db),
            Arc::clone(&barrier),
            Arc::clone(&active),
            Arc::clone(&max),
         );
         tokio::spawn(async move {
            barrier.wait().await;
            let mut conn = db.acquire_writer().await.unwrap();
            max.fetch_max(active.fetch_add(1, Ordering::SeqCst) + 1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            sqlx::query("UPDATE t SET v = v + 1")
               .execute(&mut *conn)
               .await
               .unwrap();

            active.fetch_sub(1, Ordering::SeqCst);
         })
      })
      .collect();

   for h in handles {
      h.await.unwrap();
   }

   let v: i64 = sqlx::query_scalar("SELECT v FROM t")
      .fetch_one(&mut *db.acquire_writer().await.unwrap())
      .await
      .unwrap();

   assert_eq!(v, 3, "All 3 writes completed");
   assert_eq!(
      max.load(Ordering::SeqCst),
      1,
      "Expected serialized access (max 1 active), but {} were simultaneous",
      max.load(Ordering::SeqCst)
   );

   db.close().await.unwrap();
}
