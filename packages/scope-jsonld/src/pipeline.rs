//! Two-stage streaming pipeline.
//!
//! The transform stage runs the blocking record reader on the blocking
//! thread pool and hands records to the serializer stage through a bounded
//! channel. The serializer stage wraps them in the JSON-LD envelope and
//! writes each chunk to an async sink as soon as it is produced.
//!
//! A full channel blocks the transform stage; a slow sink stalls the
//! serializer stage. Either stage failing closes the channel, which stops
//! the other one. The footer is only written after a clean end of input.

use std::io::BufRead;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{ConvertOptions, PipelineConfig, PropertyMap};
use crate::convert::ConversionStats;
use crate::envelope::Envelope;
use crate::error::{Result, ScopeError};
use crate::reader::RecordReader;
use crate::types::Record;

/// A configured conversion pipeline.
///
/// One pipeline can run any number of conversions; each `run` call owns its
/// own stacks and channel, so runs never share state.
#[derive(Debug, Clone)]
pub struct Pipeline {
    options: ConvertOptions,
    config: PipelineConfig,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Create a pipeline.
    #[must_use]
    pub fn new(options: ConvertOptions, config: PipelineConfig) -> Self {
        Self {
            options,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally controlled cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels every run of this pipeline.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Convert one input into one JSON-LD document written to `sink`.
    ///
    /// # Errors
    /// - parse errors from the transform stage, after which the document is
    ///   left unterminated
    /// - `ScopeError::Sink` if the sink rejects a write
    /// - `ScopeError::Cancelled` if the token was cancelled first
    /// - `ScopeError::Task` if the transform stage panicked
    pub async fn run<R, W>(&self, input: R, sink: &mut W) -> Result<ConversionStats>
    where
        R: BufRead + Send + 'static,
        W: AsyncWrite + Unpin + ?Sized,
    {
        let (tx, mut rx) = mpsc::channel(self.config.channel_capacity);
        let properties = self.options.properties.clone();
        let cancel = self.cancel.clone();

        tracing::debug!(
            channel_capacity = self.config.channel_capacity,
            mapped = properties.is_some(),
            "starting pipeline"
        );

        let transform =
            tokio::task::spawn_blocking(move || transform_stage(input, properties, &tx, &cancel));

        let outcome = self.serialize_stage(&mut rx, sink).await;

        // Unblocks a transform stage waiting on a full channel.
        drop(rx);
        let produced = transform.await?;

        let stats = outcome?;
        tracing::info!(
            records = stats.records,
            produced,
            bytes = stats.bytes_written,
            "pipeline complete"
        );
        Ok(stats)
    }

    async fn serialize_stage<W>(
        &self,
        rx: &mut mpsc::Receiver<Result<Record>>,
        sink: &mut W,
    ) -> Result<ConversionStats>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut envelope = Envelope::new(self.options.context.as_ref())?;
        let mut stats = ConversionStats::default();

        loop {
            let next = tokio::select! {
                biased;

                () = self.cancel.cancelled() => return Err(ScopeError::Cancelled),
                next = rx.recv() => next,
            };

            match next {
                Some(Ok(record)) => {
                    let chunk = envelope.record_chunk(&record)?;
                    write_chunk(sink, &chunk).await?;
                    stats.add_chunk(&chunk);
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }

        // The transform stage also stops quietly on cancellation.
        if self.cancel.is_cancelled() {
            return Err(ScopeError::Cancelled);
        }

        stats.records = envelope.records();
        let footer = envelope.finish();
        write_chunk(sink, &footer).await?;
        stats.add_chunk(&footer);
        sink.flush().await.map_err(ScopeError::Sink)?;

        Ok(stats)
    }
}

/// Run the record reader, forwarding every item until the input ends, the
/// receiver goes away or the run is cancelled. Returns the records sent.
fn transform_stage<R: BufRead>(
    input: R,
    properties: Option<PropertyMap>,
    tx: &mpsc::Sender<Result<Record>>,
    cancel: &CancellationToken,
) -> usize {
    let mut sent = 0;
    let records = RecordReader::new(input, properties).with_cancellation(cancel.clone());

    for item in records {
        if matches!(item, Err(ScopeError::Cancelled)) {
            tracing::debug!(sent, "transform stage cancelled");
            break;
        }

        let is_record = item.is_ok();
        if tx.blocking_send(item).is_err() {
            tracing::debug!(sent, "serializer stage closed, stopping transform");
            break;
        }
        if is_record {
            sent += 1;
        }
    }

    sent
}

async fn write_chunk<W>(sink: &mut W, chunk: &str) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    sink.write_all(chunk.as_bytes())
        .await
        .map_err(ScopeError::Sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::{self, Read};
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};

    const SAMPLE: &str = r#"<Root><Record Id="r1" IdName="Thing" ParentId=""><DataElement ElementId="1001"><ElementValue><TextValue>Alice</TextValue></ElementValue></DataElement></Record></Root>"#;

    fn many_records(count: usize) -> String {
        let mut xml = String::from("<Root>");
        for i in 0..count {
            xml.push_str(&format!(
                r#"<Record Id="r{i}" IdName="n{i}" ParentId=""><DataElement ElementId="seq"><ElementValue><TextValue>{i}</TextValue></ElementValue></DataElement></Record>"#
            ));
        }
        xml.push_str("</Root>");
        xml
    }

    fn input(xml: &str) -> io::Cursor<Vec<u8>> {
        io::Cursor::new(xml.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_pipeline_end_to_end() {
        let options = ConvertOptions::new()
            .with_context(json!({"name": "http://schema.org/name"}))
            .with_properties(PropertyMap::try_from([("1001", "title")]).unwrap());
        let pipeline = Pipeline::new(options, PipelineConfig::new());

        let mut out: Vec<u8> = Vec::new();
        let stats = pipeline.run(input(SAMPLE), &mut out).await.unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            doc,
            json!({
                "@context": {"name": "http://schema.org/name"},
                "@graph": [{"@id": "r1", "name": "Thing", "parent": "", "title": ["Alice"]}]
            })
        );
        assert_eq!(stats.records, 1);
        assert_eq!(stats.bytes_written, out.len() as u64);
    }

    #[tokio::test]
    async fn test_order_preserved_through_small_channel() {
        let pipeline = Pipeline::new(
            ConvertOptions::new(),
            PipelineConfig::new().with_channel_capacity(1),
        );

        let mut out: Vec<u8> = Vec::new();
        let stats = pipeline.run(input(&many_records(200)), &mut out).await.unwrap();
        assert_eq!(stats.records, 200);

        let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let graph = doc["@graph"].as_array().unwrap();
        for (i, entry) in graph.iter().enumerate() {
            assert_eq!(entry["@id"], format!("r{i}"));
            assert_eq!(entry["seq"], json!([i.to_string()]));
        }
    }

    #[tokio::test]
    async fn test_parse_error_leaves_document_unterminated() {
        let pipeline = Pipeline::new(ConvertOptions::new(), PipelineConfig::new());
        let xml = r#"<Root><Record Id="r1"/><Record Id="r2"></Root>"#;

        let mut out: Vec<u8> = Vec::new();
        let err = pipeline.run(input(xml), &mut out).await.unwrap_err();

        assert!(err.is_parse_error());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"r1\""));
        assert!(!text.ends_with("]}\n"));
        assert!(serde_json::from_str::<serde_json::Value>(&text).is_err());
    }

    struct FailingSink {
        accepted: usize,
    }

    impl AsyncWrite for FailingSink {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.accepted == 0 {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")));
            }
            self.accepted -= 1;
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_sink_failure_stops_transform_stage() {
        let pipeline = Pipeline::new(
            ConvertOptions::new(),
            PipelineConfig::new().with_channel_capacity(2),
        );
        let mut sink = FailingSink { accepted: 3 };

        let err = pipeline
            .run(input(&many_records(10_000)), &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, ScopeError::Sink(_)));
    }

    #[tokio::test]
    async fn test_cancelled_pipeline_writes_nothing() {
        let pipeline = Pipeline::new(ConvertOptions::new(), PipelineConfig::new());
        pipeline.cancellation_token().cancel();

        let mut out: Vec<u8> = Vec::new();
        let err = pipeline.run(input(SAMPLE), &mut out).await.unwrap_err();

        assert!(matches!(err, ScopeError::Cancelled));
        assert!(out.is_empty());
    }

    /// Source that cancels a token once `limit` bytes have been read.
    struct CancelAfter {
        data: io::Cursor<Vec<u8>>,
        limit: usize,
        read: Arc<AtomicUsize>,
        cancel: CancellationToken,
    }

    impl io::Read for CancelAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.read(buf)?;
            let total = self.read.fetch_add(n, Ordering::SeqCst) + n;
            if total >= self.limit {
                self.cancel.cancel();
            }
            Ok(n)
        }
    }

    #[tokio::test]
    async fn test_cancellation_inside_large_record_stops_reading() {
        let mut xml = String::from(r#"<Root><Record Id="big">"#);
        for i in 0..20_000 {
            xml.push_str(&format!(r#"<DataElement ElementId="{i}"/>"#));
        }
        xml.push_str("</Record></Root>");
        let total = xml.len();

        let pipeline = Pipeline::new(ConvertOptions::new(), PipelineConfig::new());
        let read = Arc::new(AtomicUsize::new(0));
        let source = CancelAfter {
            data: io::Cursor::new(xml.into_bytes()),
            limit: 4096,
            read: Arc::clone(&read),
            cancel: pipeline.cancellation_token(),
        };

        let mut out: Vec<u8> = Vec::new();
        let err = pipeline
            .run(io::BufReader::with_capacity(512, source), &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, ScopeError::Cancelled));
        assert!(read.load(Ordering::SeqCst) < total);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_independent_runs_share_nothing() {
        let pipeline = Pipeline::new(ConvertOptions::new(), PipelineConfig::new());
        let first = pipeline.clone();

        let (a, b) = tokio::join!(
            async move {
                let mut out: Vec<u8> = Vec::new();
                first.run(input(&many_records(50)), &mut out).await.map(|s| s.records)
            },
            async move {
                let mut out: Vec<u8> = Vec::new();
                pipeline.run(input(&many_records(7)), &mut out).await.map(|s| s.records)
            }
        );
        assert_eq!(a.unwrap(), 50);
        assert_eq!(b.unwrap(), 7);
    }
}
