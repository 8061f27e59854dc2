use chrono::{Duration, TimeZone, Utc};
use polwatch_core::hash_bytes;
use polwatch_journal::{Journal, NEW_PDF};
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_same_content_two_paths_one_record() {
    let journal = Journal::open_in_memory().unwrap();
    let fp = hash_bytes(b"%PDF-1.7 same bytes");
    let early = Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap();
    let late = early + Duration::hours(3);

    let a = journal
        .identity()
        .upsert_at(Path::new("/polizas/a/policy.pdf"), &fp, 19, early)
        .unwrap();
    let b = journal
        .identity()
        .upsert_at(Path::new("/polizas/b/copy.pdf"), &fp, 19, late)
        .unwrap();

    assert_eq!(a.file_id, b.file_id);
    let records = journal.identity().recent(10).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].first_seen, early);
    assert_eq!(records[0].last_seen, late);
    assert_eq!(records[0].path, "/polizas/b/copy.pdf");
}

#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("state.sqlite3");
    let fp = hash_bytes(b"persisted");

    let file_id = {
        let journal = Journal::open(&db_path).unwrap();
        let up = journal.identity().upsert(Path::new("/p.pdf"), &fp, 9).unwrap();
        journal.ledger().record(up.file_id, "s", "r", NEW_PDF).unwrap();
        up.file_id
    };

    let journal = Journal::open(&db_path).unwrap();
    let again = journal.identity().upsert(Path::new("/moved.pdf"), &fp, 9).unwrap();
    assert_eq!(again.file_id, file_id);
    assert!(!again.created);
    assert!(journal.ledger().has_alert(file_id, Some(NEW_PDF)).unwrap());
}

#[test]
fn test_concurrent_writers_converge_on_one_record() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("state.sqlite3");
    // Create the schema up front so writers don't race on DDL
    drop(Journal::open(&db_path).unwrap());

    let fp = hash_bytes(b"racing content");
    let writers = 4;
    let barrier = Arc::new(Barrier::new(writers));

    let handles: Vec<_> = (0..writers)
        .map(|i| {
            let barrier = barrier.clone();
            let db_path = db_path.clone();
            thread::spawn(move || {
                // Separate connections, like separate processes
                let journal = Journal::open(&db_path).unwrap();
                barrier.wait();
                let path = format!("/polizas/copy{i}.pdf");
                journal.identity().upsert(Path::new(&path), &fp, 14).unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let ids: std::collections::HashSet<_> = results.iter().map(|u| u.file_id).collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(results.iter().filter(|u| u.created).count(), 1);

    let journal = Journal::open(&db_path).unwrap();
    assert_eq!(journal.identity().count().unwrap(), 1);
}
