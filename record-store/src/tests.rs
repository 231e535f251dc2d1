#[cfg(test)]
mod tests {
    use crate::{LockInfo, LocalStore, PendingLedger, RecordStore, RunLock};
    use chrono::{Duration, Utc};
    use std::env;
    use std::fs;
    use std::path::PathBuf;
    use sync_core::{
        CommentRecord, CoreError, NormalizedRecord, RowId, StoreError, SubmissionRecord,
    };

    fn test_dir() -> PathBuf {
        let dir = env::temp_dir().join(format!("test_saved_sync_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("Failed to create test directory");
        dir
    }

    fn comment(id: &str) -> NormalizedRecord {
        NormalizedRecord::Comment(CommentRecord {
            post_id: id.to_string(),
            link: format!("https://www.reddit.com/r/rust/comments/x/t/{}/", id),
            body: format!("body of {}", id),
            author: Some("someone".to_string()),
            subreddit: "rust".to_string(),
            created: "2021/01/01".to_string(),
            score: 3,
        })
    }

    fn submission(id: &str) -> NormalizedRecord {
        NormalizedRecord::Submission(SubmissionRecord {
            post_id: id.to_string(),
            link: format!("https://www.reddit.com/r/pics/comments/{}/x/", id),
            title: "A picture".to_string(),
            subreddit: "pics".to_string(),
            text: String::new(),
            is_video: false,
            has_gallery: false,
            has_img: true,
            img: Some("https://i.redd.it/abc.jpg".to_string()),
            author: None,
            flair: None,
            created: "2021/01/01".to_string(),
            score: 100,
            total_awards_received: 0,
            num_comments: 4,
            upvote_ratio: 0.5,
            shortlink: format!("https://redd.it/{}", id),
        })
    }

    fn ids(store: &LocalStore) -> Vec<&str> {
        store.records().iter().map(NormalizedRecord::post_id).collect()
    }

    #[test]
    fn test_prepend_puts_newest_first() {
        let mut store = LocalStore::from_records(vec![comment("old")]);

        // Diff order is oldest first
        let added = store.prepend(vec![comment("a"), submission("b"), comment("c")]);

        assert_eq!(added, 3);
        assert_eq!(ids(&store), vec!["c", "b", "a", "old"]);
    }

    #[test]
    fn test_prepend_skips_known_ids() {
        let mut store = LocalStore::from_records(vec![comment("a")]);
        let added = store.prepend(vec![comment("a"), comment("b"), comment("b")]);

        assert_eq!(added, 1);
        assert_eq!(ids(&store), vec!["b", "a"]);
    }

    #[test]
    fn test_missing_store_loads_empty() {
        let dir = test_dir();
        let store = RecordStore::new(dir.join("saved_posts_data.json"));

        let loaded = store.load().expect("Missing store should load");
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = test_dir();
        let store = RecordStore::new(dir.join("saved_posts_data.json"));
        let snapshot = LocalStore::from_records(vec![submission("b"), comment("a")]);

        store.save(&snapshot).expect("Failed to save store");
        let loaded = store.load().expect("Failed to load store");

        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.get("b").and_then(|r| r.author()), None);
    }

    #[test]
    fn test_saved_file_is_tagged_json_array() {
        let dir = test_dir();
        let path = dir.join("saved_posts_data.json");
        RecordStore::new(&path)
            .save(&LocalStore::from_records(vec![comment("a")]))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["type"], "Comment");
        assert_eq!(raw[0]["post_id"], "a");
    }

    #[test]
    fn test_corrupt_store_is_set_aside() {
        let dir = test_dir();
        let path = dir.join("saved_posts_data.json");
        fs::write(&path, "{ not json").unwrap();

        let loaded = RecordStore::new(&path).load().expect("Corrupt store should recover");
        assert!(loaded.is_empty());

        let backups: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("saved_posts_data.json.corrupt-")
            })
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(backups[0].path()).unwrap(), "{ not json");
    }

    #[test]
    fn test_legacy_false_author_loads_as_none() {
        let dir = test_dir();
        let path = dir.join("saved_posts_data.json");
        fs::write(
            &path,
            r#"[{"type": "Comment", "post_id": "a", "link": "https://www.reddit.com/r/x/a/",
                "body": "hi", "author": false, "subreddit": "x", "created": "2021/01/01",
                "score": 1}]"#,
        )
        .unwrap();

        let loaded = RecordStore::new(&path).load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.records()[0].author(), None);
    }

    #[test]
    fn test_pending_ledger_lifecycle() {
        let dir = test_dir();
        let store = RecordStore::new(dir.join("saved_posts_data.json"));

        let mut ledger = store.pending_ledger().unwrap();
        assert!(ledger.is_empty());

        ledger.add(["a", "b"]).unwrap();
        assert!(store.ledger_path().exists());

        let mut reloaded = store.pending_ledger().unwrap();
        assert_eq!(reloaded.ids(), vec!["a", "b"]);

        reloaded.remove("a").unwrap();
        reloaded.remove("b").unwrap();
        assert!(reloaded.is_empty());
        assert!(!store.ledger_path().exists());
    }

    #[test]
    fn test_ledger_keeps_row_and_rejections() {
        let dir = test_dir();
        let store = RecordStore::new(dir.join("saved_posts_data.json"));

        let mut ledger = store.pending_ledger().unwrap();
        ledger.add(["a", "b"]).unwrap();
        ledger.set_row("a", RowId("row-1".to_string())).unwrap();
        assert_eq!(ledger.record_rejection("a").unwrap(), 1);
        assert_eq!(ledger.record_rejection("a").unwrap(), 2);

        let reloaded = store.pending_ledger().unwrap();
        let entry = reloaded.entry("a").expect("a should still be pending");
        assert_eq!(entry.row, Some(RowId("row-1".to_string())));
        assert_eq!(entry.rejections, 2);
        assert_eq!(reloaded.row_of("b"), None);
        assert_eq!(reloaded.entry("b").unwrap().rejections, 0);
    }

    #[test]
    fn test_unreadable_ledger_is_ignored() {
        let dir = test_dir();
        let path = dir.join("ledger.json");
        fs::write(&path, "garbage").unwrap();

        let ledger = PendingLedger::load(&path).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_second_lock_is_refused_until_released() {
        let dir = test_dir();
        let store = RecordStore::new(dir.join("saved_posts_data.json"));

        let lock = store.lock().expect("First lock should succeed");
        assert!(matches!(
            store.lock(),
            Err(CoreError::Store(StoreError::Locked { .. }))
        ));

        drop(lock);
        assert!(!store.lock_path().exists());
        let _again: RunLock = store.lock().expect("Lock should be free after drop");
    }

    fn write_lock(store: &RecordStore, info: &LockInfo) {
        fs::write(store.lock_path(), serde_json::to_string(info).unwrap()).unwrap();
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_lock_of_dead_process_is_taken_over() {
        let dir = test_dir();
        let store = RecordStore::new(dir.join("saved_posts_data.json"));
        write_lock(
            &store,
            &LockInfo {
                pid: u32::MAX - 1,
                acquired_at: Utc::now(),
            },
        );

        let lock = store.lock().expect("Lock of a dead run should be taken over");
        let info: LockInfo =
            serde_json::from_str(&fs::read_to_string(store.lock_path()).unwrap()).unwrap();
        assert_eq!(info.pid, std::process::id());

        drop(lock);
        assert!(!store.lock_path().exists());
    }

    #[test]
    fn test_old_lock_is_taken_over() {
        let dir = test_dir();
        let store = RecordStore::new(dir.join("saved_posts_data.json"));
        write_lock(
            &store,
            &LockInfo {
                pid: std::process::id(),
                acquired_at: Utc::now() - Duration::days(2),
            },
        );

        assert!(store.lock().is_ok());
    }

    #[test]
    fn test_unreadable_lock_is_taken_over() {
        let dir = test_dir();
        let store = RecordStore::new(dir.join("saved_posts_data.json"));
        fs::write(store.lock_path(), "12345").unwrap();

        assert!(store.lock().is_ok());
    }

    #[test]
    fn test_recent_lock_of_live_process_is_refused() {
        let dir = test_dir();
        let store = RecordStore::new(dir.join("saved_posts_data.json"));
        write_lock(&store, &LockInfo::current());

        assert!(matches!(
            store.lock(),
            Err(CoreError::Store(StoreError::Locked { .. }))
        ));
        assert!(store.lock_path().exists());
    }
}
