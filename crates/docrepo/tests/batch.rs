//! Batch and streaming writes against the file-backed store.

mod common;

use docrepo::{BatchWriter, Error, Exporter, Loader, Repository, StreamWriter, WriteMode};
use docrepo_core::error::ConfigError;
use docrepo_file::FileStore;

use common::{User, temp_store, user_config};

fn writer(store: std::sync::Arc<FileStore>) -> BatchWriter<User, FileStore> {
    BatchWriter::new(store, user_config()).unwrap()
}

fn users(count: usize) -> Vec<User> {
    (0..count)
        .map(|i| User::new(&format!("s{:02}", i), &format!("streamed-{}", i), i as i64))
        .collect()
}

#[tokio::test]
async fn test_save_many_isolates_malformed_ids() {
    let (_dir, store) = temp_store();
    let repo = Repository::<User, FileStore>::new(store.clone(), user_config()).unwrap();
    repo.create(&mut User::new("existing", "old", 1)).await.unwrap();
    repo.update(&mut repo.load("existing").await.unwrap().unwrap())
        .await
        .unwrap();

    let mut batch = vec![
        User::new("existing", "replaced", 2),
        User::new("new-1", "fresh", 3),
        User::new("bad/id", "broken", 4),
        User::new("new-2", "fresh", 5),
    ];
    let result = writer(store).save_many(&mut batch).await.unwrap();

    assert_eq!(result.failed, vec![2]);
    assert_eq!(result.succeeded, vec![0, 1, 3]);
    assert_eq!(result.count(), 3);

    // Last writer wins: the stale version 0 overwrote version 2.
    let replaced = repo.load("existing").await.unwrap().unwrap();
    assert_eq!(replaced.name, "replaced");
    assert_eq!(replaced.version, 0);

    let created = repo.load("new-1").await.unwrap().unwrap();
    assert_eq!(created.version, 1);
    assert!(batch[1].created_at.is_some());
}

#[tokio::test]
async fn test_failed_batch_writes_nothing_and_restores_items() {
    let (dir, store) = temp_store();
    // A directory where the temp file for "b" would go fails the commit.
    let collection_dir = dir.path().join("collections").join("users");
    std::fs::create_dir_all(collection_dir.join("b.tmp")).unwrap();

    let mut batch = vec![
        User::new("a", "first", 1),
        User::new("b", "second", 2),
        User::new("", "auto", 3),
    ];
    batch[0].version = 5;
    batch[2].version = 9;
    assert!(writer(store.clone()).create_many(&mut batch).await.is_err());

    let loader = Loader::<User, FileStore>::new(store.clone(), user_config()).unwrap();
    assert!(loader.all().await.unwrap().is_empty());
    assert_eq!(batch[0].version, 5);
    assert_eq!(batch[1].version, 0);
    assert_eq!(batch[2].version, 9);
    assert!(batch[2].id.is_empty());

    let mut saves = vec![User::new("a", "first", 1), User::new("b", "second", 2)];
    saves[0].version = 4;
    assert!(writer(store).save_many(&mut saves).await.is_err());
    assert!(loader.all().await.unwrap().is_empty());
    assert_eq!(saves[0].version, 4);
}

#[tokio::test]
async fn test_save_many_fails_empty_ids() {
    let (_dir, store) = temp_store();

    let mut batch = vec![User::new("", "anon", 1), User::new("named", "n", 2)];
    let result = writer(store).save_many(&mut batch).await.unwrap();

    assert_eq!(result.failed, vec![0]);
    assert_eq!(result.succeeded, vec![1]);
}

#[tokio::test]
async fn test_create_many_reports_taken_and_duplicate_keys() {
    let (_dir, store) = temp_store();
    let repo = Repository::<User, FileStore>::new(store.clone(), user_config()).unwrap();
    repo.create(&mut User::new("taken", "t", 1)).await.unwrap();

    let mut batch = vec![
        User::new("taken", "x", 1),
        User::new("a", "x", 2),
        User::new("a", "dup", 3),
        User::new("", "auto", 4),
    ];
    let result = writer(store).create_many(&mut batch).await.unwrap();

    assert_eq!(result.failed, vec![0, 2]);
    assert_eq!(result.succeeded, vec![1, 3]);
    assert!(!batch[3].id.is_empty());
    assert_eq!(batch[3].version, 1);
    assert!(repo.exist(&batch[3].id).await.unwrap());
    assert_eq!(repo.load("a").await.unwrap().unwrap().name, "x");
}

#[tokio::test]
async fn test_update_many_skips_absent() {
    let (_dir, store) = temp_store();
    let repo = Repository::<User, FileStore>::new(store.clone(), user_config()).unwrap();
    repo.create(&mut User::new("a", "before", 1)).await.unwrap();

    let mut batch = vec![User::new("a", "after", 1), User::new("ghost", "g", 2)];
    let result = writer(store.clone()).update_many(&mut batch).await.unwrap();

    assert_eq!(result.succeeded, vec![0]);
    assert_eq!(result.failed, vec![1]);
    assert_eq!(repo.load("a").await.unwrap().unwrap().name, "after");

    let mut none = vec![User::new("ghost", "g", 2)];
    let result = writer(store).update_many(&mut none).await.unwrap();
    assert_eq!(result.count(), 0);
    assert!(!repo.exist("ghost").await.unwrap());
}

#[tokio::test]
async fn test_stream_writer_flushes_every_batch() {
    let (_dir, store) = temp_store();
    let mut stream = StreamWriter::new(writer(store.clone()), WriteMode::Save, 5).unwrap();

    let mut flushes = Vec::new();
    for (i, user) in users(12).into_iter().enumerate() {
        if let Some(result) = stream.write(user).await.unwrap() {
            flushes.push((i + 1, result.count()));
        }
    }

    assert_eq!(flushes, vec![(5, 5), (10, 5)]);
    assert_eq!(stream.pending(), 2);

    let loader = Loader::<User, FileStore>::new(store, user_config()).unwrap();
    assert_eq!(loader.all().await.unwrap().len(), 10);

    let last = stream.flush().await.unwrap();
    assert_eq!(last.count(), 2);
    assert_eq!(stream.pending(), 0);
    assert_eq!(loader.all().await.unwrap().len(), 12);

    assert_eq!(stream.flush().await.unwrap().count(), 0);
}

#[tokio::test]
async fn test_stream_writer_map_hook_and_create_mode() {
    let (_dir, store) = temp_store();
    let mut stream = StreamWriter::new(writer(store.clone()), WriteMode::Create, 10)
        .unwrap()
        .with_map(|u: &mut User| u.name = format!("mapped-{}", u.name));

    for user in users(3) {
        assert!(stream.write(user).await.unwrap().is_none());
    }
    stream.flush().await.unwrap();

    let loader = Loader::<User, FileStore>::new(store, user_config()).unwrap();
    let stored = loader.load("s01").await.unwrap().unwrap();
    assert_eq!(stored.name, "mapped-streamed-1");
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn test_failed_flush_discards_buffer() {
    let (dir, store) = temp_store();
    // A file where the collection directory should be makes every write fail.
    std::fs::create_dir_all(dir.path().join("collections")).unwrap();
    std::fs::write(dir.path().join("collections").join("users"), b"").unwrap();

    let mut stream = StreamWriter::new(writer(store), WriteMode::Save, 10).unwrap();
    for user in users(3) {
        stream.write(user).await.unwrap();
    }

    assert!(stream.flush().await.is_err());
    assert_eq!(stream.pending(), 0);
}

#[tokio::test]
async fn test_zero_batch_size_is_rejected() {
    let (_dir, store) = temp_store();
    let err = StreamWriter::new(writer(store), WriteMode::Save, 0)
        .err()
        .unwrap();
    assert!(matches!(err, Error::Configuration(ConfigError::BatchSize)));
}

#[tokio::test]
async fn test_export_writes_one_line_per_entity() {
    let (_dir, store) = temp_store();
    let mut batch = users(4);
    writer(store.clone()).save_many(&mut batch).await.unwrap();

    let loader = Loader::<User, FileStore>::new(store, user_config()).unwrap();
    let exporter = Exporter::new(loader.clone(), |u: &User| Ok(format!("{},{}", u.id, u.age)));
    let mut out = Vec::new();
    let count = exporter.export(&mut out).await.unwrap();

    assert_eq!(count, 4);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "s00,0\ns01,1\ns02,2\ns03,3\n"
    );

    let mut json = Vec::new();
    Exporter::json_lines(loader).export(&mut json).await.unwrap();
    let first = String::from_utf8(json).unwrap().lines().next().unwrap().to_string();
    let value: serde_json::Value = serde_json::from_str(&first).unwrap();
    assert_eq!(value["name"], "streamed-0");
}

#[tokio::test]
async fn test_delete_many_reports_absent_keys() {
    let (_dir, store) = temp_store();
    let mut batch = users(3);
    writer(store.clone()).save_many(&mut batch).await.unwrap();

    let result = writer(store.clone())
        .delete_many(&["s00", "ghost", "s02", "s00", "a/b"])
        .await
        .unwrap();

    assert_eq!(result.succeeded, vec![0, 2]);
    assert_eq!(result.failed, vec![1, 3, 4]);

    let loader = Loader::<User, FileStore>::new(store, user_config()).unwrap();
    let left: Vec<String> = loader.all().await.unwrap().into_iter().map(|u| u.id).collect();
    assert_eq!(left, vec!["s01"]);
}
