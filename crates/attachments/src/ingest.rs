//! Turning a raw MIME message into stored attachments.

use std::sync::Arc;

use bytes::Bytes;
use mail_parser::decoders::base64::base64_decode;
use mail_parser::decoders::quoted_printable::quoted_printable_decode;
use mail_parser::{
    Encoding, HeaderName, Message, MessageParser, MessagePart, MessagePartId, MimeHeaders,
};
use tracing::{info, instrument};

use inboxproxy_core::{AttachmentMetadata, JobId};
use inboxproxy_executor::{JobQueue, JobState};

use crate::error::IngestError;
use crate::job::{MetadataSlot, StoreAttachmentJob};
use crate::writer::ChunkedWriter;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A named attachment pulled out of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPart {
    pub file_name: String,
    pub content_type: String,
    pub payload: Bytes,
}

/// Parse `raw` and return its named attachments in message order.
///
/// The top-level body must be multipart. Every leaf part below it that
/// carries a file name is returned, inline or not, with its body undone
/// from the transfer encoding but otherwise byte for byte as sent. The
/// content type is the part's full `Content-Type` value, parameters
/// included.
pub fn extract_parts(raw: &[u8]) -> Result<Vec<AttachmentPart>, IngestError> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| IngestError::Malformed("not a MIME message".into()))?;

    let Some(children) = message.root_part().sub_parts() else {
        return Err(IngestError::Malformed(
            "top-level body is not multipart".into(),
        ));
    };

    let mut parts = Vec::new();
    collect_named(&message, children, &mut parts);
    Ok(parts)
}

fn collect_named(message: &Message<'_>, ids: &[MessagePartId], out: &mut Vec<AttachmentPart>) {
    for part in ids.iter().filter_map(|&id| message.part(id)) {
        if let Some(children) = part.sub_parts() {
            collect_named(message, children, out);
            continue;
        }
        let Some(file_name) = part.attachment_name().filter(|n| !n.is_empty()) else {
            continue;
        };
        out.push(AttachmentPart {
            file_name: file_name.to_owned(),
            content_type: raw_content_type(message, part)
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned()),
            payload: Bytes::from(body_bytes(message, part)),
        });
    }
}

/// The part body with only the transfer encoding removed. The parser's own
/// decoded view converts text to UTF-8, so it is used only when the raw
/// body cannot be located or decoded.
fn body_bytes(message: &Message<'_>, part: &MessagePart<'_>) -> Vec<u8> {
    let decoded = message
        .raw_message
        .get(part.raw_body_offset()..part.raw_end_offset())
        .and_then(|body| match part.encoding {
            Encoding::None => Some(body.to_vec()),
            Encoding::Base64 => base64_decode(body),
            Encoding::QuotedPrintable => quoted_printable_decode(body),
        });
    decoded.unwrap_or_else(|| part.contents().to_vec())
}

/// Unfolded value of the part's last `Content-Type` header.
fn raw_content_type(message: &Message<'_>, part: &MessagePart<'_>) -> Option<String> {
    let header = part
        .headers
        .iter()
        .rev()
        .find(|h| matches!(h.name, HeaderName::ContentType))?;
    let value = message.raw_message.get(header.offset_start..header.offset_end)?;
    let value = String::from_utf8_lossy(value)
        .split_ascii_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!value.is_empty()).then_some(value)
}

/// Stores every attachment of a message by running one
/// [`StoreAttachmentJob`] per part on a shared [`JobQueue`].
pub struct Ingestor {
    writer: Arc<ChunkedWriter>,
    queue: Arc<JobQueue>,
}

impl Ingestor {
    pub fn new(writer: Arc<ChunkedWriter>, queue: Arc<JobQueue>) -> Self {
        Self { writer, queue }
    }

    /// Extract the attachments of `raw`, store them concurrently and return
    /// their metadata in message order.
    ///
    /// Returns once every job has reached a terminal state. The first part
    /// whose job failed is reported as [`IngestError::Attachment`]; parts
    /// stored before or after it are not rolled back.
    #[instrument(skip(self, raw), fields(size = raw.len()))]
    pub async fn ingest(&self, raw: &[u8]) -> Result<Vec<AttachmentMetadata>, IngestError> {
        let parts = extract_parts(raw)?;

        let mut pending = Vec::with_capacity(parts.len());
        for part in parts {
            let job = StoreAttachmentJob::new(
                Arc::clone(&self.writer),
                part.file_name.clone(),
                part.content_type,
                part.payload,
            );
            let slot = job.slot();
            let id = self.queue.enqueue(Box::new(job)).await?;
            pending.push((id, part.file_name, slot));
        }

        self.queue.wait().await;

        let stored = pending
            .into_iter()
            .map(|(id, file_name, slot)| self.collect(&id, file_name, &slot))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            attachments = stored.len(),
            bytes = stored.iter().map(|m| m.size).sum::<u64>(),
            "message ingested"
        );
        Ok(stored)
    }

    fn collect(
        &self,
        id: &JobId,
        file_name: String,
        slot: &MetadataSlot,
    ) -> Result<AttachmentMetadata, IngestError> {
        match self.queue.status(id) {
            Some(status) if status.state == JobState::Done => {
                slot.get().ok_or(IngestError::MissingResult { file_name })
            }
            Some(status) => {
                let state = status.state;
                Err(IngestError::Attachment {
                    file_name,
                    message: status
                        .last_error
                        .unwrap_or_else(|| format!("job ended {state}")),
                })
            }
            None => Err(IngestError::MissingResult { file_name }),
        }
    }
}
