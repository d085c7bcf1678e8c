//! Integration tests for the task store backed by on-disk JSON files.
//!
//! Covers the full add / prioritize / edit / complete cycle, the per-user
//! cap, duplicate rejection, and reloading lists after a restart.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use todobot_core::data::{DataManager, StoreError, TaskRepository};
use todobot_core::store::{AddOutcome, AddRejection, EditOutcome, TaskStore};
use todobot_core::task::{MAX_TASKS_PER_USER, Task, TaskId, UserId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn disk_store(dir: &tempfile::TempDir) -> TaskStore<DataManager> {
    TaskStore::new(DataManager::open(dir.path()).await)
}

async fn add(store: &TaskStore<DataManager>, user: &UserId, text: &str) -> Task {
    match store.add_task(user, text).await.expect("persist") {
        AddOutcome::Added(task) => task,
        AddOutcome::Rejected(r) => panic!("add of {text:?} rejected: {r:?}"),
    }
}

fn read_file(dir: &tempfile::TempDir, user: &str) -> serde_json::Value {
    let raw = std::fs::read_to_string(dir.path().join(format!("{user}.json"))).expect("file");
    serde_json::from_str(&raw).expect("json")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_cycle_is_mirrored_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = disk_store(&dir).await;
    let user = UserId::from(1001);

    let milk = add(&store, &user, "  buy milk ").await;
    let call = add(&store, &user, "call mom").await;
    assert_eq!(milk.text, "buy milk");

    assert_eq!(store.toggle_priority(&user, &call.id).await.unwrap(), Some(true));
    let edited = store.edit_task(&user, &milk.id, "buy oat milk").await.unwrap();
    assert!(matches!(edited, EditOutcome::Edited(ref t) if t.text == "buy oat milk"));

    let file = read_file(&dir, "1001");
    let list = file.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["text"], "buy oat milk");
    assert_eq!(list[1]["priority"], true);
    assert_eq!(list[1]["completed"], false);

    let removed = store.remove_task(&user, &milk.id).await.unwrap();
    assert_eq!(removed.map(|t| t.id), Some(milk.id));
    let file = read_file(&dir, "1001");
    assert_eq!(file.as_array().unwrap().len(), 1);
    assert_eq!(file[0]["id"], call.id.as_str());
}

#[tokio::test]
async fn cap_rejects_the_fifty_first_task() {
    let dir = tempfile::tempdir().unwrap();
    let store = disk_store(&dir).await;
    let user = UserId::new("cap");

    for i in 0..MAX_TASKS_PER_USER {
        add(&store, &user, &format!("task {i}")).await;
    }
    let outcome = store.add_task(&user, "one too many").await.unwrap();
    assert_eq!(
        outcome,
        AddOutcome::Rejected(AddRejection::Full {
            max: MAX_TASKS_PER_USER
        })
    );
    assert_eq!(store.get_task_list(&user).await.len(), MAX_TASKS_PER_USER);
    assert_eq!(
        read_file(&dir, "cap").as_array().unwrap().len(),
        MAX_TASKS_PER_USER
    );
}

#[tokio::test]
async fn duplicates_are_per_user() {
    let dir = tempfile::tempdir().unwrap();
    let store = disk_store(&dir).await;
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");

    add(&store, &alice, "water plants").await;
    assert_eq!(
        store.add_task(&alice, "water plants ").await.unwrap(),
        AddOutcome::Rejected(AddRejection::Duplicate)
    );
    add(&store, &bob, "water plants").await;

    assert_eq!(store.get_task_list(&alice).await.len(), 1);
    assert_eq!(store.get_task_list(&bob).await.len(), 1);
}

#[tokio::test]
async fn removing_twice_is_harmless() {
    let dir = tempfile::tempdir().unwrap();
    let store = disk_store(&dir).await;
    let user = UserId::new("u");
    let task = add(&store, &user, "once").await;

    assert!(store.remove_task(&user, &task.id).await.unwrap().is_some());
    assert!(store.remove_task(&user, &task.id).await.unwrap().is_none());
    assert!(
        store
            .remove_task(&UserId::new("nobody"), &TaskId::new("x"))
            .await
            .unwrap()
            .is_none()
    );
    assert!(store.get_task_list(&user).await.is_empty());
}

#[tokio::test]
async fn restart_reloads_every_list() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = (UserId::new("10"), UserId::new("20"));
    {
        let store = disk_store(&dir).await;
        add(&store, &a, "first").await;
        let starred = add(&store, &a, "second").await;
        store.toggle_priority(&a, &starred.id).await.unwrap();
        add(&store, &b, "other").await;
    }

    let store = disk_store(&dir).await;
    assert!(store.get_task_list(&a).await.is_empty());
    assert_eq!(store.warm_up().await, 2);

    let list = store.get_task_list(&a).await;
    let texts: Vec<&str> = list.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, ["first", "second"]);
    assert!(list[1].priority);
    assert_eq!(store.users_with_tasks().await.len(), 2);
}

#[tokio::test]
async fn warm_up_skips_corrupt_and_foreign_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("5.json"), "{not json").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();
    std::fs::write(
        dir.path().join("6.json"),
        r#"[{"id":"1700000000000","text":"legacy","completed":false,"priority":false}]"#,
    )
    .unwrap();

    let store = disk_store(&dir).await;
    let ids = store.repository().get_all_user_ids().await;
    assert_eq!(ids, [UserId::new("5"), UserId::new("6")]);

    store.warm_up().await;
    assert!(store.get_task_list(&UserId::new("5")).await.is_empty());

    let legacy = store.get_task_list(&UserId::new("6")).await;
    assert_eq!(legacy.len(), 1);
    let id = TaskId::new("1700000000000");
    assert_eq!(
        store.toggle_priority(&UserId::new("6"), &id).await.unwrap(),
        Some(true)
    );
}

#[tokio::test]
async fn concurrent_adds_all_land_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = std::sync::Arc::new(disk_store(&dir).await);
    let user = UserId::new("busy");

    let mut handles = Vec::new();
    for i in 0..20 {
        let store = std::sync::Arc::clone(&store);
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            store.add_task(&user, &format!("job {i}")).await.unwrap()
        }));
    }
    for handle in handles {
        assert!(matches!(handle.await.unwrap(), AddOutcome::Added(_)));
    }

    assert_eq!(read_file(&dir, "busy").as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn path_like_user_ids_stay_inside_the_data_dir() {
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    let store = TaskStore::new(DataManager::open(&data).await);

    let result = store.add_task(&UserId::new("../escaped"), "sneaky").await;
    assert!(matches!(result, Err(StoreError::InvalidUserId(_))));
    assert!(!root.path().join("escaped.json").exists());
    assert_eq!(std::fs::read_dir(&data).unwrap().count(), 0);
}
