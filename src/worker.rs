//! Hosting for the classifier and the aggregator as isolated workers.
//!
//! Each worker is a tokio task that owns its state and receives requests over
//! a bounded channel, replying on a oneshot. A worker handles one request to
//! completion before it looks at the next, so requests are answered in the
//! order they were sent and a `COMPUTE` never overlaps an `INIT`.
//!
//! There is no cancellation: a caller that no longer wants an answer simply
//! drops it.

use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::aggregator::cache::{ModeCountCache, batches};
use crate::aggregator::{self, QsoRequest, QsoResponse, QsoResult, QsoSnapshot};
use crate::aggregator::{ComputePayload, InitPayload};
use crate::classifier::{self, MarkerDecision, MarkerRequest};
use crate::clock::Clock;
use crate::model::{ContactRecord, Park};

const QUEUE_DEPTH: usize = 32;

struct MarkerJob {
    request: MarkerRequest,
    reply: oneshot::Sender<Vec<MarkerDecision>>,
}

/// Handle to a running marker classifier.
#[derive(Clone)]
pub struct MarkerWorker {
    tx: mpsc::Sender<MarkerJob>,
}

impl MarkerWorker {
    /// Starts the worker on the current tokio runtime.
    pub fn spawn(clock: Arc<dyn Clock>) -> Self {
        let (tx, mut rx) = mpsc::channel::<MarkerJob>(QUEUE_DEPTH);

        tokio::spawn(async move {
            while let Some(MarkerJob { request, reply }) = rx.recv().await {
                let decisions = classifier::classify(&request, clock.as_ref());
                if reply.send(decisions).is_err() {
                    debug!("Classification caller went away, response dropped");
                }
            }
            debug!("Marker worker stopped");
        });

        Self { tx }
    }

    pub async fn classify(&self, request: MarkerRequest) -> Result<Vec<MarkerDecision>> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(MarkerJob { request, reply })
            .await
            .map_err(|_| anyhow!("marker worker stopped"))?;
        response
            .await
            .map_err(|_| anyhow!("marker worker dropped the request"))
    }
}

struct QsoJob {
    request: QsoRequest,
    reply: oneshot::Sender<QsoResponse>,
}

/// Handle to a running QSO aggregator. The snapshot lives inside the task.
#[derive(Clone)]
pub struct QsoWorker {
    tx: mpsc::Sender<QsoJob>,
}

impl QsoWorker {
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::channel::<QsoJob>(QUEUE_DEPTH);

        tokio::spawn(async move {
            let mut snapshot = QsoSnapshot::default();
            while let Some(QsoJob { request, reply }) = rx.recv().await {
                let (next, response) = aggregator::handle(snapshot, request);
                snapshot = next;
                if reply.send(response).is_err() {
                    debug!("QSO caller went away, response dropped");
                }
            }
            debug!("QSO worker stopped");
        });

        Self { tx }
    }

    pub async fn request(&self, request: QsoRequest) -> Result<QsoResponse> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(QsoJob { request, reply })
            .await
            .map_err(|_| anyhow!("qso worker stopped"))?;
        response
            .await
            .map_err(|_| anyhow!("qso worker dropped the request"))
    }

    /// Replaces the worker's snapshot.
    pub async fn init(&self, parks: Vec<Park>, activations: Vec<ContactRecord>) -> Result<()> {
        match self
            .request(QsoRequest::Init(InitPayload { parks, activations }))
            .await?
        {
            QsoResponse::InitOk => Ok(()),
            other => bail!("unexpected response to INIT: {other:?}"),
        }
    }

    pub async fn compute(&self, references: Vec<String>) -> Result<QsoResult> {
        match self
            .request(QsoRequest::Compute(ComputePayload { references }))
            .await?
        {
            QsoResponse::ComputeDone { result } => Ok(result),
            other => bail!("unexpected response to COMPUTE: {other:?}"),
        }
    }

    /// Fills `cache` for every reference it does not hold yet, asking in
    /// batches of at most `batch_size`. Returns how many references were computed.
    pub async fn compute_into(
        &self,
        cache: &mut ModeCountCache,
        references: &[String],
        batch_size: usize,
    ) -> Result<usize> {
        let pending = cache.missing(references);

        for batch in batches(&pending, batch_size) {
            let result = self.compute(batch.to_vec()).await?;
            debug!(batch = batch.len(), matched = result.len(), "Mode count batch done");
            cache.absorb(batch, result);
        }

        Ok(pending.len())
    }
}

/// Serves classification requests, one JSON message per line, until the
/// reader is exhausted. Lines that are not JSON are empty requests.
pub async fn serve_marker_lines<R, W>(reader: R, mut writer: W, worker: &MarkerWorker) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut served = 0usize;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let value = serde_json::from_str::<Value>(&line).unwrap_or_else(|e| {
            warn!(error = %e, "Classification request is not JSON");
            Value::Null
        });
        let decisions = worker.classify(MarkerRequest::from_value(value)).await?;

        write_line(&mut writer, &serde_json::to_vec(&decisions)?).await?;
        served += 1;
    }

    info!(served, "Marker worker input closed");
    Ok(served)
}

/// Serves the `INIT` / `COMPUTE` protocol, one JSON message per line.
/// Messages of unknown type get no response.
pub async fn serve_qso_lines<R, W>(reader: R, mut writer: W, worker: &QsoWorker) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut served = 0usize;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let Some(request) = serde_json::from_str::<Value>(&line)
            .ok()
            .and_then(QsoRequest::from_value)
        else {
            continue;
        };

        let response = worker.request(request).await?;
        write_line(&mut writer, &serde_json::to_vec(&response)?).await?;
        served += 1;
    }

    info!(served, "QSO worker input closed");
    Ok(served)
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, body: &[u8]) -> Result<()> {
    writer.write_all(body).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
