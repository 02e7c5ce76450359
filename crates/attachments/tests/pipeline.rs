use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use lettre::Message;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};

use inboxproxy_attachments::{ChunkPolicy, ChunkedWriter, IngestError, Ingestor, StoreAttachmentJob};
use inboxproxy_blob::{LocalObjectStore, MemoryObjectStore, ObjectStore};
use inboxproxy_core::{AttachmentMetadata, sha256_hex};
use inboxproxy_executor::{JobQueue, JobState, QueueConfig};

const MIB: usize = 1024 * 1024;

fn queue_config(dir: &std::path::Path, max_retries: u32) -> QueueConfig {
    QueueConfig {
        workers: 4,
        max_retries,
        retry_delay: Duration::from_millis(1),
        failure_log: dir.join("failures.log"),
    }
}

fn reassemble(store: &MemoryObjectStore, meta: &AttachmentMetadata) -> Vec<u8> {
    let mut out = Vec::with_capacity(usize::try_from(meta.size).unwrap());
    for key in &meta.chunks {
        out.extend_from_slice(&store.get(key).unwrap());
    }
    out
}

#[tokio::test]
async fn small_and_large_attachments_stored_concurrently() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryObjectStore::new());
    let writer = Arc::new(
        ChunkedWriter::new(
            Arc::clone(&store) as Arc<dyn ObjectStore>,
            ChunkPolicy::default(),
        )
        .unwrap(),
    );
    let queue = JobQueue::new(queue_config(dir.path(), 3)).await.unwrap();

    let small = Bytes::from(vec![7u8; 10]);
    let large: Bytes = (0..26 * MIB).map(|i| (i % 253) as u8).collect::<Vec<u8>>().into();

    let a = StoreAttachmentJob::new(Arc::clone(&writer), "a.txt", "text/plain", small.clone());
    let b = StoreAttachmentJob::new(
        Arc::clone(&writer),
        "b.bin",
        "application/octet-stream",
        large.clone(),
    );
    let (a_slot, b_slot) = (a.slot(), b.slot());
    let a_id = queue.enqueue(Box::new(a)).await.unwrap();
    let b_id = queue.enqueue(Box::new(b)).await.unwrap();

    queue.wait().await;

    assert_eq!(queue.status(&a_id).unwrap().state, JobState::Done);
    assert_eq!(queue.status(&b_id).unwrap().state, JobState::Done);

    let a_meta = a_slot.get().unwrap();
    assert_eq!(a_meta.chunks, vec![a_meta.id.to_string()]);
    assert_eq!(store.get(&a_meta.id).unwrap(), small);

    let b_meta = b_slot.get().unwrap();
    assert_eq!(b_meta.size, (26 * MIB) as u64);
    assert_eq!(b_meta.chunks.len(), 6);
    assert_eq!(store.get(&b_meta.chunks[5]).unwrap().len(), MIB);
    for key in &b_meta.chunks[..5] {
        assert_eq!(store.get(key).unwrap().len(), 5 * MIB);
    }
    assert_eq!(reassemble(&store, &b_meta), large.to_vec());
    assert_eq!(b_meta.checksum, sha256_hex(&large));

    queue.close().await;
    let log = std::fs::read_to_string(dir.path().join("failures.log")).unwrap();
    assert!(log.is_empty());
}

fn message(attachments: &[(&str, &str, Vec<u8>)]) -> Vec<u8> {
    let mut body = MultiPart::mixed().singlepart(SinglePart::plain(String::from("attached")));
    for (name, ctype, data) in attachments {
        body = body.singlepart(
            Attachment::new((*name).to_owned()).body(data.clone(), ContentType::parse(ctype).unwrap()),
        );
    }
    Message::builder()
        .from("alice@example.com".parse().unwrap())
        .to("bob@example.com".parse().unwrap())
        .subject("report")
        .multipart(body)
        .unwrap()
        .formatted()
}

#[tokio::test]
async fn ingested_message_lands_on_local_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("objects");
    let store = Arc::new(LocalObjectStore::new(&root));
    let writer = ChunkedWriter::new(store as Arc<dyn ObjectStore>, ChunkPolicy::new(64, 32).unwrap())
        .unwrap();
    let queue = Arc::new(JobQueue::new(queue_config(dir.path(), 0)).await.unwrap());
    let ingestor = Ingestor::new(Arc::new(writer), Arc::clone(&queue));

    let report: Vec<u8> = (0..100u8).collect();
    let raw = message(&[
        ("notes.txt", "text/plain", b"short note".to_vec()),
        ("report.bin", "application/octet-stream", report.clone()),
    ]);

    let stored = ingestor.ingest(&raw).await.unwrap();

    assert_eq!(stored.len(), 2);
    let notes = &stored[0];
    assert_eq!(notes.file_name, "notes.txt");
    assert_eq!(std::fs::read(root.join(notes.id.as_str())).unwrap(), b"short note");

    let bin = &stored[1];
    assert_eq!(bin.content_type, "application/octet-stream");
    assert_eq!(bin.chunks.len(), 4);
    let mut on_disk = Vec::new();
    for key in &bin.chunks {
        on_disk.extend(std::fs::read(root.join(key)).unwrap());
    }
    assert_eq!(on_disk, report);
    assert_eq!(bin.checksum, sha256_hex(&report));

    queue.close().await;
}

#[tokio::test]
async fn storage_failure_is_audited_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryObjectStore::failing_from(1));
    let writer = ChunkedWriter::new(store as Arc<dyn ObjectStore>, ChunkPolicy::default()).unwrap();
    let queue = Arc::new(JobQueue::new(queue_config(dir.path(), 2)).await.unwrap());
    let ingestor = Ingestor::new(Arc::new(writer), Arc::clone(&queue));

    let raw = message(&[("a.txt", "text/plain", b"payload".to_vec())]);
    let err = ingestor.ingest(&raw).await.unwrap_err();
    assert!(matches!(err, IngestError::Attachment { ref file_name, .. } if file_name == "a.txt"));

    queue.close().await;
    let log = std::fs::read_to_string(dir.path().join("failures.log")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains(",failed to store "), "{}", lines[0]);
}
