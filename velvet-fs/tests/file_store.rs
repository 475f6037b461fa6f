use std::fs;

use futures::{FutureExt, StreamExt, executor::block_on};
use serde_json::json;
use tempfile::tempdir;
use velvet::{
    AtomicDocumentStore, Card, CardConfig, CollectionPath, DocumentId, DocumentStore, Fields,
    PhotoRecord, WriteBatch,
};
use velvet_fs::{FileStore, FileStoreError};

fn fields(value: serde_json::Value) -> Fields {
    value.as_object().cloned().unwrap_or_default()
}

#[test]
fn test_documents_persist_as_json_files() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let store = FileStore::new(temp_dir.path())?;
    let photos = CollectionPath::new("artifacts/app/public/data/photos");

    let id = block_on(store.create_document(&photos, fields(json!({"caption": "Joy"}))))?;
    let file = store.document_file(&photos.doc(id.clone()))?;
    assert!(file.starts_with(temp_dir.path().join("artifacts/app/public/data/photos")));

    let on_disk: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file)?)?;
    assert_eq!(on_disk["caption"], json!("Joy"));
    assert!(on_disk["createdAt"].is_i64());

    // A second store over the same directory sees the data
    let reopened = FileStore::new(temp_dir.path())?;
    let listed = reopened.list(&photos)?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
    Ok(())
}

#[test]
fn test_update_merges_and_delete_is_idempotent() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let store = FileStore::new(temp_dir.path())?;
    let photos = CollectionPath::new("photos");

    let id = block_on(store.create_document(&photos, fields(json!({"caption": "Joy", "url": "a"}))))?;
    let path = photos.doc(id);
    block_on(store.update_fields(&path, fields(json!({"order": 0}))))?;

    let stored = store.get(&path)?.expect("document exists");
    assert_eq!(stored["caption"], json!("Joy"));
    assert_eq!(stored["order"], json!(0));

    block_on(store.delete_document(&path))?;
    block_on(store.delete_document(&path))?;
    assert_eq!(store.get(&path)?, None);

    let missing = block_on(store.update_fields(&path, fields(json!({"order": 1}))));
    assert!(matches!(missing, Err(FileStoreError::NotFound(_))));
    Ok(())
}

#[test]
fn test_failed_batch_leaves_files_untouched() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let store = FileStore::new(temp_dir.path())?;
    let photos = CollectionPath::new("photos");

    let a = block_on(store.create_document(&photos, fields(json!({"caption": "A"}))))?;
    let b = block_on(store.create_document(&photos, fields(json!({"caption": "B"}))))?;
    let before = store.list(&photos)?;

    let mut batch = WriteBatch::new();
    batch.update(photos.doc(a.clone()), fields(json!({"order": 0})));
    batch.update(photos.doc(b.clone()), fields(json!({"order": 1})));
    batch.update(photos.doc("deleted-meanwhile"), fields(json!({"order": 2})));

    let result = block_on(store.commit_batch(batch));
    assert!(matches!(result, Err(FileStoreError::NotFound(_))));
    assert_eq!(store.list(&photos)?, before);
    Ok(())
}

#[test]
fn test_batch_commit_notifies_subscribers_once_per_collection() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let store = FileStore::new(temp_dir.path())?;
    let photos = CollectionPath::new("photos");

    let a = block_on(store.create_document(&photos, fields(json!({"caption": "A"}))))?;
    let b = block_on(store.create_document(&photos, fields(json!({"caption": "B"}))))?;

    let mut feed = store.subscribe_collection(&photos)?;
    let initial = feed.next().now_or_never().flatten().expect("initial snapshot");
    assert_eq!(initial.len(), 2);

    let mut batch = WriteBatch::new();
    batch.update(photos.doc(a), fields(json!({"order": 1})));
    batch.update(photos.doc(b), fields(json!({"order": 0})));
    block_on(store.commit_batch(batch))?;

    let snapshot = feed.next().now_or_never().flatten().expect("snapshot after commit");
    let orders: Vec<_> = snapshot
        .documents
        .iter()
        .map(|doc| doc.fields["order"].clone())
        .collect();
    assert_eq!(orders.len(), 2);
    assert!(orders.contains(&json!(0)) && orders.contains(&json!(1)));
    assert!(feed.next().now_or_never().is_none());
    Ok(())
}

#[test]
fn test_card_over_file_store() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let store = FileStore::new(temp_dir.path())?;

    block_on(async {
        let mut card = Card::open(store.clone(), CardConfig::default()).await?;
        card.load_samples().await?;
        card.pump();
        assert_eq!(card.photos().len(), 4);

        let gallery = card.gallery_mut();
        gallery.begin_reorder()?;
        gallery.move_item(3, 0)?;
        let moved = gallery.session().expect("session is open").items()[0].id.clone();
        card.commit_reorder().await?;
        card.pump();

        assert_eq!(card.photos()[0].id, moved);
        let reopened = FileStore::new(temp_dir.path())?;
        let stored = reopened.list(&card.config().photos_path())?;
        let first = stored
            .iter()
            .map(PhotoRecord::from_stored)
            .find(|photo| photo.id == moved)
            .expect("moved photo is stored");
        assert_eq!(first.order, velvet::Position::Ordered(0));
        anyhow::Ok(())
    })
}

#[test]
fn test_ids_outside_latin1_get_their_own_files() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let store = FileStore::new(temp_dir.path())?;
    let guests = CollectionPath::new("guests");
    let wide = guests.doc("\u{100}");
    let narrow = guests.doc("\u{10}0");
    let cake = guests.doc("\u{1f382} party");

    block_on(store.upsert_document(&wide, fields(json!({"who": "wide"}))))?;
    block_on(store.upsert_document(&narrow, fields(json!({"who": "narrow"}))))?;
    block_on(store.upsert_document(&cake, fields(json!({"who": "cake"}))))?;

    assert_ne!(store.document_file(&wide)?, store.document_file(&narrow)?);
    assert_eq!(store.get(&wide)?, Some(fields(json!({"who": "wide"}))));
    assert_eq!(store.get(&narrow)?, Some(fields(json!({"who": "narrow"}))));

    let mut listed: Vec<DocumentId> = store.list(&guests)?.into_iter().map(|doc| doc.id).collect();
    listed.sort();
    let mut expected = vec![wide.id, narrow.id, cake.id];
    expected.sort();
    assert_eq!(listed, expected);
    Ok(())
}

#[test]
fn test_corrupt_files_are_listed_without_fields() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let store = FileStore::new(temp_dir.path())?;
    let photos = CollectionPath::new("photos");

    let good = block_on(store.create_document(&photos, fields(json!({"caption": "Joy"}))))?;
    let broken = photos.doc("broken");
    fs::write(store.document_file(&broken)?, "not json")?;
    let array = photos.doc("array");
    fs::write(store.document_file(&array)?, "[1, 2]")?;

    let listed = store.list(&photos)?;
    assert_eq!(listed.len(), 3);
    for doc in &listed {
        if doc.id == good {
            assert_eq!(doc.fields["caption"], json!("Joy"));
        } else {
            assert!(doc.fields.is_empty());
        }
    }

    let photo = PhotoRecord::from_stored(listed.iter().find(|doc| doc.id == broken.id).expect("listed"));
    assert_eq!(photo.order, velvet::Position::Unordered);
    assert!(matches!(store.get(&broken), Err(FileStoreError::Serialization(_))));
    Ok(())
}
