use super::memory::MemoryModel;
use super::*;
use bson::doc;

/// Seeds a store with `count` documents carrying a `seq` field in insertion
/// order, returning their ids.
async fn seed_sequence(model: &MemoryModel, count: i64) -> Vec<String> {
    let mut ids = Vec::new();
    for seq in 0..count {
        let created = model
            .create(doc! { "title": format!("doc {seq}"), "seq": seq })
            .await
            .unwrap();
        ids.push(created.get_str("_id").unwrap().to_string());
    }
    ids
}

#[test]
fn test_stamp_new_document_generates_bookkeeping_fields() {
    let document = stamp_new_document(doc! { "title": "Alpine Loop" });

    assert!(document.get_str("_id").is_ok());
    assert_eq!(document.get_i64(REVISION_FIELD).unwrap(), 1);
    // Both timestamps start out identical
    assert_eq!(
        document.get_str("created_at").unwrap(),
        document.get_str("updated_at").unwrap()
    );
}

#[test]
fn test_stamp_new_document_keeps_caller_id() {
    let document = stamp_new_document(doc! { "_id": "fixed-id", "title": "t" });
    assert_eq!(document.get_str("_id").unwrap(), "fixed-id");
}

#[test]
fn test_projection_include_retains_id() {
    let mut document = doc! { "_id": "a", "title": "t", "price": 4, "_rev": 1_i64 };
    Projection::Include(vec!["title".into()]).apply(&mut document);

    assert_eq!(document.len(), 2);
    assert!(document.get("_id").is_some());
    assert!(document.get("title").is_some());
}

#[test]
fn test_projection_exclude_removes_listed_fields() {
    let mut document = doc! { "_id": "a", "title": "t", "_rev": 1_i64 };
    Projection::Exclude(vec![REVISION_FIELD.into()]).apply(&mut document);

    assert!(document.get(REVISION_FIELD).is_none());
    assert!(document.get("title").is_some());
}

#[tokio::test]
async fn test_create_and_find_by_id() {
    let model = MemoryModel::new();
    let created = model.create(doc! { "title": "Alpine Loop" }).await.unwrap();
    let id = created.get_str("_id").unwrap();

    let found = model.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(found.get_str("title").unwrap(), "Alpine Loop");
}

#[tokio::test]
async fn test_find_by_id_missing_returns_none() {
    let model = MemoryModel::new();
    assert!(model.find_by_id("nonexistent").await.unwrap().is_none());
}

#[tokio::test]
async fn test_find_all_equality_filter() {
    let model = MemoryModel::new();
    model.create(doc! { "difficulty": "easy" }).await.unwrap();
    model.create(doc! { "difficulty": "hard" }).await.unwrap();

    let spec = FindSpec {
        filter: doc! { "difficulty": "easy" },
        ..FindSpec::default()
    };
    let found = model.find_all(spec).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get_str("difficulty").unwrap(), "easy");
}

#[tokio::test]
async fn test_find_all_comparison_operators() {
    let model = MemoryModel::new();
    for price in [100, 250, 400] {
        model.create(doc! { "price": price }).await.unwrap();
    }

    let spec = FindSpec {
        filter: doc! { "price": { "$gte": 250, "$lt": 400 } },
        ..FindSpec::default()
    };
    let found = model.find_all(spec).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get_i32("price").unwrap(), 250);
}

#[tokio::test]
async fn test_find_all_numeric_equality_across_types() {
    let model = MemoryModel::new();
    model.create(doc! { "price": 400_i32 }).await.unwrap();

    // The query pipeline parses literals as Int64
    let spec = FindSpec {
        filter: doc! { "price": 400_i64 },
        ..FindSpec::default()
    };
    assert_eq!(model.find_all(spec).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_find_all_filter_on_missing_field_matches_nothing() {
    let model = MemoryModel::new();
    model.create(doc! { "title": "t" }).await.unwrap();

    let spec = FindSpec {
        filter: doc! { "price": { "$gte": 1 } },
        ..FindSpec::default()
    };
    assert!(model.find_all(spec).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_find_all_multi_key_sort() {
    let model = MemoryModel::new();
    model.create(doc! { "name": "b", "age": 30 }).await.unwrap();
    model.create(doc! { "name": "a", "age": 20 }).await.unwrap();
    model.create(doc! { "name": "a", "age": 40 }).await.unwrap();

    let spec = FindSpec {
        sort: doc! { "name": 1, "age": -1 },
        ..FindSpec::default()
    };
    let found = model.find_all(spec).await.unwrap();
    let keys: Vec<(String, i32)> = found
        .iter()
        .map(|d| (d.get_str("name").unwrap().to_string(), d.get_i32("age").unwrap()))
        .collect();
    assert_eq!(keys, vec![("a".into(), 40), ("a".into(), 20), ("b".into(), 30)]);
}

#[tokio::test]
async fn test_find_all_skip_and_limit() {
    let model = MemoryModel::new();
    seed_sequence(&model, 25).await;

    let spec = FindSpec {
        sort: doc! { "seq": 1 },
        skip: 10,
        limit: 10,
        ..FindSpec::default()
    };
    let page = model.find_all(spec).await.unwrap();
    assert_eq!(page.len(), 10);
    assert_eq!(page.first().unwrap().get_i64("seq").unwrap(), 10);
    assert_eq!(page.last().unwrap().get_i64("seq").unwrap(), 19);
}

#[tokio::test]
async fn test_find_all_zero_limit_means_unlimited() {
    let model = MemoryModel::new();
    seed_sequence(&model, 5).await;

    let found = model.find_all(FindSpec::default()).await.unwrap();
    assert_eq!(found.len(), 5);
}

#[tokio::test]
async fn test_update_by_id_sets_fields_and_bumps_revision() {
    let model = MemoryModel::new();
    let created = model.create(doc! { "title": "old", "price": 1 }).await.unwrap();
    let id = created.get_str("_id").unwrap();

    let updated = model
        .update_by_id(id, doc! { "title": "new" })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.get_str("title").unwrap(), "new");
    assert_eq!(updated.get_i32("price").unwrap(), 1);
    assert_eq!(updated.get_i64(REVISION_FIELD).unwrap(), 2);
}

#[tokio::test]
async fn test_update_by_id_missing_returns_none() {
    let model = MemoryModel::new();
    let updated = model
        .update_by_id("nonexistent", doc! { "title": "new" })
        .await
        .unwrap();
    assert!(updated.is_none());
}

#[tokio::test]
async fn test_delete_many_counts_requested_and_deleted() {
    let model = MemoryModel::new();
    let ids = seed_sequence(&model, 3).await;

    let mut targets = vec![ids[0].clone(), ids[2].clone()];
    targets.push("nonexistent".to_string());

    let summary = model.delete_many(&targets).await.unwrap();
    assert_eq!(summary, DeleteSummary { requested: 3, deleted: 2 });
    assert_eq!(model.len().await, 1);
}
