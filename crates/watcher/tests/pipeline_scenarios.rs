//! End-to-end scenarios for the event pipeline against a real journal

use parking_lot::Mutex;
use polwatch_journal::Journal;
use polwatch_watcher::{
    Alert, Content, Delivery, EventKind, IgnoreConfig, IgnoreRules, NotificationError, Notifier,
    Outcome, Pipeline, SettleConfig, Settler, SkipReason, WatchEvent, WatchOptions, Watcher,
};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Records every alert it is asked to send
#[derive(Clone, Default)]
struct Recorder {
    sent: Arc<Mutex<Vec<Alert>>>,
    failing: Arc<AtomicBool>,
}

impl Recorder {
    fn sent(&self) -> Vec<Alert> {
        self.sent.lock().clone()
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Notifier for Recorder {
    fn notify(&self, alert: &Alert) -> Result<Delivery, NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Transport("connection refused".to_string()));
        }
        self.sent.lock().push(alert.clone());
        Ok(Delivery {
            recipient: "ops@example.com".to_string(),
        })
    }
}

fn fast_settler() -> Settler {
    Settler::new(SettleConfig {
        quiescence: Duration::ZERO,
        poll_interval: Duration::from_millis(5),
        max_wait: Duration::from_secs(5),
    })
}

struct Fixture {
    dir: TempDir,
    journal: Journal,
    recorder: Recorder,
    pipeline: Pipeline,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let journal = Journal::open(&dir.path().join(".polwatch/state.sqlite3")).unwrap();
    let recorder = Recorder::default();
    let rules = IgnoreRules::load(dir.path(), IgnoreConfig::default()).unwrap();
    let pipeline = Pipeline::new(&journal, Box::new(recorder.clone()), rules)
        .with_settler(fast_settler());
    Fixture {
        dir,
        journal,
        recorder,
        pipeline,
    }
}

fn created(path: &Path) -> WatchEvent {
    WatchEvent::new(path, EventKind::Create)
}

#[test]
fn new_pdf_alerts_once_across_repeated_events() {
    let fx = fixture();
    let pdf = fx.dir.path().join("policy1.pdf");
    fs::write(&pdf, b"%PDF-1.7 policy one").unwrap();

    let first = fx.pipeline.process(&created(&pdf));
    match &first {
        Outcome::Notified {
            content, recipient, ..
        } => {
            assert_eq!(*content, Content::New);
            assert_eq!(recipient, "ops@example.com");
        }
        other => panic!("expected notification, got {other:?}"),
    }

    // The create is usually followed by one or more modify events
    let second = fx.pipeline.process(&WatchEvent::new(&pdf, EventKind::Modify));
    assert!(matches!(
        second,
        Outcome::Skipped(SkipReason::AlreadyAlerted {
            content: Content::Known,
            ..
        })
    ));

    let sent = fx.recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "[PDF Watcher] New PDF: policy1.pdf");
    assert_eq!(fx.journal.ledger().count().unwrap(), 1);
    assert_eq!(fx.journal.identity().count().unwrap(), 1);
}

#[test]
fn rename_updates_path_without_alerting() {
    let fx = fixture();
    let original = fx.dir.path().join("policy1.pdf");
    fs::write(&original, b"%PDF-1.7 same bytes").unwrap();
    assert!(fx.pipeline.process(&created(&original)).is_notified());

    let folder_b = fx.dir.path().join("folderB");
    fs::create_dir(&folder_b).unwrap();
    let renamed = folder_b.join("policy1_renamed.pdf");
    fs::rename(&original, &renamed).unwrap();

    assert_eq!(
        fx.pipeline.process(&WatchEvent::new(&original, EventKind::Delete)),
        Outcome::Skipped(SkipReason::NotASighting)
    );
    let outcome = fx.pipeline.process(&WatchEvent::new(&renamed, EventKind::Rename));
    let file_id = match outcome {
        Outcome::Skipped(SkipReason::AlreadyAlerted { file_id, content }) => {
            assert_eq!(content, Content::Known);
            file_id
        }
        other => panic!("expected already alerted, got {other:?}"),
    };

    let record = fx.journal.identity().get(file_id).unwrap().unwrap();
    assert_eq!(Path::new(&record.path), renamed.as_path());
    assert_eq!(record.name, "policy1_renamed.pdf");
    assert_eq!(fx.recorder.sent().len(), 1);
}

#[test]
fn copy_with_same_content_is_not_new() {
    let fx = fixture();
    let a = fx.dir.path().join("a.pdf");
    let b = fx.dir.path().join("b.pdf");
    fs::write(&a, b"%PDF shared").unwrap();
    fs::write(&b, b"%PDF shared").unwrap();

    assert!(fx.pipeline.process(&created(&a)).is_notified());
    assert!(!fx.pipeline.process(&created(&b)).is_notified());
    assert_eq!(fx.journal.identity().count().unwrap(), 1);
}

#[test]
fn changed_content_alerts_again() {
    let fx = fixture();
    let pdf = fx.dir.path().join("policy.pdf");
    fs::write(&pdf, b"%PDF version one").unwrap();
    assert!(fx.pipeline.process(&created(&pdf)).is_notified());

    fs::write(&pdf, b"%PDF version two, longer").unwrap();
    match fx.pipeline.process(&WatchEvent::new(&pdf, EventKind::Modify)) {
        Outcome::Notified { content, .. } => assert_eq!(content, Content::New),
        other => panic!("expected notification, got {other:?}"),
    }
    assert_eq!(fx.recorder.sent().len(), 2);
    assert_eq!(fx.journal.identity().count().unwrap(), 2);
}

#[test]
fn recorded_size_matches_fingerprinted_content() {
    let fx = fixture();
    let pdf = fx.dir.path().join("sized.pdf");
    let content = b"%PDF-1.7 exactly this many bytes";
    fs::write(&pdf, content).unwrap();

    let file_id = match fx.pipeline.process(&created(&pdf)) {
        Outcome::Notified {
            file_id,
            fingerprint,
            ..
        } => {
            assert_eq!(fingerprint, polwatch_core::hash_bytes(content));
            file_id
        }
        other => panic!("expected notification, got {other:?}"),
    };

    let record = fx.journal.identity().get(file_id).unwrap().unwrap();
    assert_eq!(record.size, content.len() as u64);
    assert_eq!(fx.recorder.sent()[0].size, content.len() as u64);
}

#[test]
fn vanished_file_leaves_no_trace() {
    let fx = fixture();
    let gone = fx.dir.path().join("gone.pdf");

    assert_eq!(
        fx.pipeline.process(&created(&gone)),
        Outcome::Skipped(SkipReason::Vanished)
    );
    assert_eq!(fx.journal.identity().count().unwrap(), 0);
    assert_eq!(fx.journal.ledger().count().unwrap(), 0);
    assert!(fx.recorder.sent().is_empty());
}

#[test]
fn failed_delivery_is_retried_by_the_next_event() {
    let fx = fixture();
    let pdf = fx.dir.path().join("policy.pdf");
    fs::write(&pdf, b"%PDF retry me").unwrap();

    fx.recorder.set_failing(true);
    let outcome = fx.pipeline.process(&created(&pdf));
    assert!(matches!(
        outcome,
        Outcome::Skipped(SkipReason::NotifyFailed { .. })
    ));
    // The sighting is recorded, the alert is not
    assert_eq!(fx.journal.identity().count().unwrap(), 1);
    assert_eq!(fx.journal.ledger().count().unwrap(), 0);

    fx.recorder.set_failing(false);
    match fx.pipeline.process(&WatchEvent::new(&pdf, EventKind::Modify)) {
        Outcome::Notified { content, .. } => assert_eq!(content, Content::Known),
        other => panic!("expected notification, got {other:?}"),
    }
    assert_eq!(fx.journal.ledger().count().unwrap(), 1);
}

#[test]
fn irrelevant_events_are_skipped() {
    let fx = fixture();
    let root = fx.dir.path();

    let txt = root.join("notes.txt");
    fs::write(&txt, b"hello").unwrap();
    assert_eq!(
        fx.pipeline.process(&created(&txt)),
        Outcome::Skipped(SkipReason::NotPdf)
    );

    let dir_named_pdf = root.join("bundle.pdf");
    fs::create_dir(&dir_named_pdf).unwrap();
    assert_eq!(
        fx.pipeline.process(&created(&dir_named_pdf)),
        Outcome::Skipped(SkipReason::NotAFile)
    );

    let partial = root.join("~$policy.pdf");
    fs::write(&partial, b"lock").unwrap();
    assert_eq!(
        fx.pipeline.process(&created(&partial)),
        Outcome::Skipped(SkipReason::Ignored)
    );

    let upper = root.join("SCAN.PDF");
    fs::write(&upper, b"%PDF upper").unwrap();
    assert!(fx.pipeline.process(&created(&upper)).is_notified());

    assert_eq!(fx.recorder.sent().len(), 1);
}

fn wait_for(recorder: &Recorder, count: usize, timeout: Duration) -> Vec<Alert> {
    let deadline = Instant::now() + timeout;
    loop {
        let sent = recorder.sent();
        if sent.len() >= count || Instant::now() >= deadline {
            return sent;
        }
        thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn startup_scan_picks_up_existing_files() {
    let fx = fixture();
    let root = fx.dir.path();
    fs::create_dir_all(root.join("2026")).unwrap();
    fs::write(root.join("2026/existing.pdf"), b"%PDF existing").unwrap();

    let watcher = Watcher::new(root, WatchOptions { scan_on_start: true }).unwrap();
    let running = watcher.start(fx.pipeline).unwrap();

    let sent = wait_for(&fx.recorder, 1, Duration::from_secs(10));
    let stats = running.stop().unwrap();

    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].name, "existing.pdf");
    assert!(stats.notified >= 1);
}

#[test]
fn live_watch_alerts_on_new_file() {
    let fx = fixture();
    let root = fx.dir.path().to_path_buf();
    let sub = root.join("incoming");
    fs::create_dir(&sub).unwrap();

    let watcher = Watcher::new(&root, WatchOptions::default()).unwrap();
    let running = watcher.start(fx.pipeline).unwrap();
    // Give the backend a moment to register the recursive watch
    thread::sleep(Duration::from_millis(200));

    fs::write(sub.join("dropped.pdf"), b"%PDF dropped in").unwrap();
    let sent = wait_for(&fx.recorder, 1, Duration::from_secs(10));
    running.stop().unwrap();

    assert!(!sent.is_empty());
    assert!(sent.iter().all(|a| a.name == "dropped.pdf"));
}
