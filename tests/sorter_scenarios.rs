// tests/sorter_scenarios.rs
//
// End-to-end routing through FileSorter with an in-memory store.
// Collaborators (audit, notifier, storage faults) are swapped for local mocks.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use file_sorter::audit::{AuditOutcome, AuditRecord, AuditSink};
use file_sorter::notify::Notifier;
use file_sorter::{
    DestinationMapping, FileSorter, IncomingFileEvent, Instrument, MemoryStore, ObjectLocation,
    ObjectStore, SortError, SortOptions,
};

const INCOMING_BUCKET: &str = "swsoc-incoming";
const TEST_BUCKET: &str = "hermes-spani";
const L0_FILE: &str = "hermes_SPANI_l0_2023040-000018_v01.bin";
const BAD_FILE: &str = "test-file-key.txt";
const ENVIRONMENT: &str = "test-environment";

#[derive(Default)]
struct RecordingAudit {
    records: Mutex<Vec<AuditRecord>>,
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record(&self, record: &AuditRecord) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Behaves like a Slack client with a revoked token.
struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _text: &str) -> Result<()> {
        bail!("slack api error: invalid_auth")
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

struct FailingAudit;

#[async_trait]
impl AuditSink for FailingAudit {
    async fn record(&self, _record: &AuditRecord) -> Result<()> {
        bail!("audit database unavailable")
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Source lookups work, copies always fail.
struct CopyFailsStore(MemoryStore);

#[async_trait]
impl ObjectStore for CopyFailsStore {
    async fn object_exists(&self, location: &ObjectLocation) -> Result<bool> {
        self.0.object_exists(location).await
    }
    async fn copy_object(&self, _s: &ObjectLocation, _d: &ObjectLocation) -> Result<()> {
        bail!("AccessDenied")
    }
    fn name(&self) -> &'static str {
        "copy-fails"
    }
}

fn store_with(keys: &[&str]) -> Arc<MemoryStore> {
    let store = MemoryStore::with_buckets([
        INCOMING_BUCKET,
        "hermes-eea",
        "hermes-nemisis",
        "hermes-merit",
        "hermes-spani",
    ]);
    for key in keys {
        store.put_object(INCOMING_BUCKET, key, b"test file".to_vec()).unwrap();
    }
    Arc::new(store)
}

fn sorter(store: Arc<MemoryStore>) -> FileSorter {
    FileSorter::builder(store).environment(ENVIRONMENT).build()
}

fn event(key: &str) -> IncomingFileEvent {
    IncomingFileEvent::new(INCOMING_BUCKET, key).with_etag("\"0123abcd\"")
}

#[tokio::test]
async fn dry_run_resolves_destination_without_copying() {
    let store = store_with(&[L0_FILE]);
    let result = sorter(store.clone()).sort(&event(L0_FILE), true).await.unwrap();

    assert!(result.success);
    assert!(result.dry_run);
    assert_eq!(result.instrument, Some(Instrument::Spani));
    assert_eq!(
        result.destination,
        Some(ObjectLocation::new(TEST_BUCKET, L0_FILE))
    );
    assert!(store.list_keys(TEST_BUCKET).is_empty());
}

#[tokio::test]
async fn real_run_copies_with_the_same_key() {
    let store = store_with(&[L0_FILE]);
    let result = sorter(store.clone()).sort(&event(L0_FILE), false).await.unwrap();

    assert!(result.success);
    assert!(!result.dry_run);
    assert_eq!(store.list_keys(TEST_BUCKET), vec![L0_FILE.to_string()]);
    assert_eq!(
        store.get_object(TEST_BUCKET, L0_FILE).as_deref(),
        Some(&b"test file"[..])
    );
    // The source stays where it was.
    assert!(store.get_object(INCOMING_BUCKET, L0_FILE).is_some());
}

#[tokio::test]
async fn malformed_filename_fails_without_copy() {
    let store = store_with(&[BAD_FILE]);
    let s = sorter(store.clone());

    for dry_run in [true, false] {
        let err = s.sort(&event(BAD_FILE), dry_run).await.unwrap_err();
        assert!(matches!(err, SortError::MalformedFilename(_)), "{err:?}");
    }
    for inst in Instrument::ALL {
        assert!(store.list_keys(&format!("hermes-{}", inst.code())).is_empty());
    }
}

#[tokio::test]
async fn missing_source_fails_in_both_modes() {
    let store = store_with(&[]);
    let s = sorter(store.clone());

    for dry_run in [true, false] {
        let err = s.sort(&event(L0_FILE), dry_run).await.unwrap_err();
        assert!(matches!(err, SortError::SourceNotFound(_)), "{err:?}");
        assert!(!err.is_retryable());
    }
    assert!(store.list_keys(TEST_BUCKET).is_empty());
}

#[tokio::test]
async fn missing_source_bucket_is_source_not_found() {
    let store = Arc::new(MemoryStore::with_buckets([TEST_BUCKET]));
    let s = sorter(store.clone());

    for dry_run in [true, false] {
        let err = s.sort(&event(L0_FILE), dry_run).await.unwrap_err();
        assert_eq!(err.kind(), "source_not_found", "dry_run={dry_run} {err:?}");
        assert!(!err.is_retryable());
    }
    assert!(store.list_keys(TEST_BUCKET).is_empty());
}

#[tokio::test]
async fn blank_event_fields_are_invalid_before_parsing() {
    let store = store_with(&[L0_FILE]);
    let s = sorter(store);

    let err = s.sort(&IncomingFileEvent::new("", L0_FILE), false).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_event");
    let err = s
        .sort(&IncomingFileEvent::new(INCOMING_BUCKET, "  "), false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_event");
}

#[tokio::test]
async fn every_instrument_lands_in_its_own_bucket() {
    let files = [
        ("hermes_EEA_l0_2023040-000018_v01.bin", "hermes-eea"),
        ("hermes_nem_l1_20230210T000018_v1.0.01.cdf", "hermes-nemisis"),
        ("hermes_mrt_ql_20230210_000018_v1.0.01.cdf", "hermes-merit"),
        ("hermes_spn_l2_20230210T000018_v1.0.0.cdf", "hermes-spani"),
    ];
    let keys: Vec<&str> = files.iter().map(|(k, _)| *k).collect();
    let store = store_with(&keys);
    let s = sorter(store.clone());

    for (key, bucket) in files {
        let result = s.sort(&event(key), false).await.unwrap();
        assert_eq!(result.destination.unwrap().bucket, bucket);
        assert_eq!(store.list_keys(bucket), vec![key.to_string()]);
    }
}

#[tokio::test]
async fn instrument_without_destination_is_unknown() {
    let store = store_with(&[L0_FILE]);
    let mapping = DestinationMapping::from_entries([(Instrument::Eea, "hermes-eea".to_string())]);
    let s = FileSorter::builder(store.clone())
        .mapping(mapping)
        .environment(ENVIRONMENT)
        .build();

    let err = s.sort(&event(L0_FILE), false).await.unwrap_err();
    assert!(matches!(err, SortError::UnknownInstrument(_)), "{err:?}");
    assert!(store.list_keys(TEST_BUCKET).is_empty());
}

#[tokio::test]
async fn development_environment_uses_dev_buckets() {
    let store = Arc::new(MemoryStore::with_buckets([INCOMING_BUCKET, "dev-hermes-spani"]));
    store.put_object(INCOMING_BUCKET, L0_FILE, b"x".to_vec()).unwrap();
    let s = FileSorter::builder(store.clone())
        .environment("DEVELOPMENT")
        .build();

    s.sort(&event(L0_FILE), false).await.unwrap();
    assert_eq!(store.list_keys("dev-hermes-spani"), vec![L0_FILE.to_string()]);
}

#[tokio::test]
async fn copy_errors_surface_as_transfer_failed() {
    let inner = MemoryStore::with_buckets([INCOMING_BUCKET, TEST_BUCKET]);
    inner.put_object(INCOMING_BUCKET, L0_FILE, b"x".to_vec()).unwrap();
    let s = FileSorter::builder(Arc::new(CopyFailsStore(inner)))
        .environment(ENVIRONMENT)
        .build();

    let err = s.sort(&event(L0_FILE), false).await.unwrap_err();
    assert!(matches!(err, SortError::TransferFailed(ref m) if m.contains("AccessDenied")));
    assert!(err.is_retryable());

    // A dry run never reaches the copy call.
    assert!(s.sort(&event(L0_FILE), true).await.unwrap().success);
}

#[tokio::test]
async fn missing_destination_bucket_is_a_transfer_failure() {
    let store = Arc::new(MemoryStore::with_buckets([INCOMING_BUCKET]));
    store.put_object(INCOMING_BUCKET, L0_FILE, b"x".to_vec()).unwrap();
    let err = sorter(store).sort(&event(L0_FILE), false).await.unwrap_err();
    assert_eq!(err.kind(), "transfer_failed");
}

#[tokio::test]
async fn notification_failure_does_not_undo_success() {
    let store = store_with(&[L0_FILE]);
    let s = FileSorter::builder(store.clone())
        .environment(ENVIRONMENT)
        .notifier(Arc::new(FailingNotifier))
        .audit(Arc::new(FailingAudit))
        .build();

    let dry = s.sort(&event(L0_FILE), true).await.unwrap();
    assert!(dry.success);
    assert!(store.list_keys(TEST_BUCKET).is_empty());

    let real = s.sort(&event(L0_FILE), false).await.unwrap();
    assert!(real.success);
    assert_eq!(store.list_keys(TEST_BUCKET), vec![L0_FILE.to_string()]);
}

#[tokio::test]
async fn every_outcome_is_audited_and_notified() {
    let store = store_with(&[L0_FILE, BAD_FILE]);
    let audit = Arc::new(RecordingAudit::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let s = FileSorter::builder(store)
        .environment(ENVIRONMENT)
        .audit(audit.clone())
        .notifier(notifier.clone())
        .build();

    s.sort(&event(L0_FILE), false).await.unwrap();
    s.sort(&event(BAD_FILE), false).await.unwrap_err();

    let records = audit.records.lock().unwrap().clone();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].outcome, AuditOutcome::Succeeded);
    assert_eq!(records[0].destination_bucket.as_deref(), Some(TEST_BUCKET));
    assert_eq!(records[0].new_file_key.as_deref(), Some(L0_FILE));
    assert_eq!(records[0].environment, ENVIRONMENT);
    assert_eq!(records[0].etag.as_deref(), Some("\"0123abcd\""));
    assert_eq!(records[1].outcome, AuditOutcome::Failed);
    assert_eq!(records[1].error_kind.as_deref(), Some("malformed_filename"));

    let messages = notifier.messages.lock().unwrap().clone();
    assert_eq!(
        messages[0],
        format!("File ({L0_FILE}) Successfully Sorted to {TEST_BUCKET}")
    );
    assert!(messages[1].starts_with(&format!("Error Sorting File ({BAD_FILE})")));
}

#[tokio::test]
async fn sort_event_handles_each_record_and_dry_run_override() {
    let store = store_with(&[L0_FILE]);
    let s = FileSorter::builder(store.clone())
        .environment(ENVIRONMENT)
        .dry_run(true)
        .build();

    let body = serde_json::json!({
        "Records": [
            {"s3": {"bucket": {"name": INCOMING_BUCKET}, "object": {"key": L0_FILE, "eTag": "e1"}}},
            {"s3": {"bucket": {"name": INCOMING_BUCKET}, "object": {"key": BAD_FILE}}},
            {"s3": {"object": {"key": L0_FILE}}}
        ]
    })
    .to_string();

    let outcomes = s.sort_event(&body, &SortOptions::default()).await.unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].1.as_ref().unwrap().dry_run);
    assert_eq!(outcomes[1].0.key, BAD_FILE);
    assert_eq!(outcomes[1].1.as_ref().unwrap_err().kind(), "malformed_filename");
    assert_eq!(outcomes[2].1.as_ref().unwrap_err().kind(), "invalid_event");
    assert!(store.list_keys(TEST_BUCKET).is_empty());

    let real = SortOptions {
        dry_run: Some(false),
        ..SortOptions::default()
    };
    let outcomes = s.sort_event(&body, &real).await.unwrap();
    assert!(!outcomes[0].1.as_ref().unwrap().dry_run);
    assert_eq!(store.list_keys(TEST_BUCKET), vec![L0_FILE.to_string()]);

    let err = s
        .sort_event("{\"Records\": []}", &SortOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_event");
}

#[tokio::test]
async fn invocation_environment_picks_buckets_and_is_audited() {
    let store = Arc::new(MemoryStore::with_buckets([
        INCOMING_BUCKET,
        TEST_BUCKET,
        "dev-hermes-spani",
    ]));
    store.put_object(INCOMING_BUCKET, L0_FILE, b"x".to_vec()).unwrap();
    let audit = Arc::new(RecordingAudit::default());
    let s = FileSorter::builder(store.clone())
        .environment("PRODUCTION")
        .audit(audit.clone())
        .build();

    let result = s
        .sort(&event(L0_FILE).with_environment("DEVELOPMENT"), false)
        .await
        .unwrap();
    assert_eq!(result.destination.unwrap().bucket, "dev-hermes-spani");
    assert_eq!(store.list_keys("dev-hermes-spani"), vec![L0_FILE.to_string()]);
    assert!(store.list_keys(TEST_BUCKET).is_empty());

    let body = serde_json::json!({
        "Records": [{"s3": {"bucket": {"name": INCOMING_BUCKET}, "object": {"key": L0_FILE}}}]
    })
    .to_string();
    let options = SortOptions {
        environment: Some("STAGING".to_string()),
        ..SortOptions::default()
    };
    let outcomes = s.sort_event(&body, &options).await.unwrap();
    assert_eq!(outcomes[0].1.as_ref().unwrap().destination.as_ref().unwrap().bucket, TEST_BUCKET);

    let records = audit.records.lock().unwrap();
    let environments: Vec<&str> = records.iter().map(|r| r.environment.as_str()).collect();
    assert_eq!(environments, ["DEVELOPMENT", "STAGING"]);
}

#[tokio::test]
async fn override_table_ignores_invocation_environment() {
    let store = store_with(&[L0_FILE]);
    let mapping =
        DestinationMapping::from_entries([(Instrument::Spani, TEST_BUCKET.to_string())]);
    let s = FileSorter::builder(store.clone())
        .mapping(mapping)
        .environment(ENVIRONMENT)
        .build();

    let result = s
        .sort(&event(L0_FILE).with_environment("DEVELOPMENT"), false)
        .await
        .unwrap();
    assert_eq!(result.destination.unwrap().bucket, TEST_BUCKET);
}
