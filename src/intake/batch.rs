// Batch intake - feeds JSON-lines submissions through the tagger.
//
// Each input line is one raw submission with an optional caller-supplied id:
//   {"id": 17, "category": "post", "fields": {"description": "..."}}
// Each output line carries either the verdict or the reason the line was
// rejected. A bad line never stops the batch.

use crate::core::moderation::{
    ModerationAction, ModerationService, RawSubmission, SubmissionError, Verdict,
};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Serialize)]
struct BatchOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Counts for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub flagged: usize,
    pub held: usize,
    /// Lines that were not valid JSON or not a valid submission
    pub rejected: usize,
}

/// Tag every line of `reader`, writing one JSON result line per input line.
///
/// Blank lines are skipped. I/O failures abort the run.
pub async fn run_batch<R, W>(
    service: &ModerationService,
    reader: R,
    mut writer: W,
) -> Result<BatchSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = BatchSummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        summary.total += 1;

        let outcome = match serde_json::from_str::<Value>(&line) {
            Ok(mut payload) => {
                let id = payload.as_object_mut().and_then(|o| o.remove("id"));
                match tag_payload(service, payload) {
                    Ok(verdict) => {
                        if verdict.flagged {
                            summary.flagged += 1;
                        }
                        if verdict.action == ModerationAction::HoldForReview {
                            summary.held += 1;
                        }
                        BatchOutcome {
                            id,
                            verdict: Some(verdict),
                            error: None,
                        }
                    }
                    Err(e) => {
                        summary.rejected += 1;
                        BatchOutcome {
                            id,
                            verdict: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(line = line_no, "Skipping malformed line: {}", e);
                summary.rejected += 1;
                BatchOutcome {
                    id: None,
                    verdict: None,
                    error: Some(format!("line {}: {}", line_no, e)),
                }
            }
        };

        let mut encoded = serde_json::to_vec(&outcome).context("failed to encode result")?;
        encoded.push(b'\n');
        writer
            .write_all(&encoded)
            .await
            .context("failed to write result")?;
    }

    writer.flush().await.context("failed to flush output")?;
    tracing::info!(
        total = summary.total,
        flagged = summary.flagged,
        held = summary.held,
        rejected = summary.rejected,
        "Batch complete"
    );
    Ok(summary)
}

/// Decode one payload (with the caller's id already removed) and tag it.
fn tag_payload(service: &ModerationService, payload: Value) -> Result<Verdict, SubmissionError> {
    let raw = RawSubmission::from_json(payload).map_err(|e| {
        tracing::warn!("Rejected submission: {}", e);
        e
    })?;
    service.tag_raw(raw)
}
