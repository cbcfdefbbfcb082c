//! Blocking one-shot conversion from a reader to a writer.

use std::io::{BufRead, Write};

use serde::Serialize;

use crate::config::ConvertOptions;
use crate::envelope::EnvelopeChunks;
use crate::error::{Result, ScopeError};
use crate::reader::RecordReader;

/// Summary of a completed conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    /// Records written to the graph.
    pub records: usize,
    /// Bytes written to the sink, including the envelope.
    pub bytes_written: u64,
}

impl ConversionStats {
    pub(crate) fn add_chunk(&mut self, chunk: &str) {
        self.bytes_written += chunk.len() as u64;
    }
}

/// Convert a Scope export into a JSON-LD document.
///
/// Records are written as soon as they are parsed. On error the document is
/// left unterminated and the error is returned.
///
/// # Errors
/// Returns parse errors from the input and `ScopeError::Sink` if writing fails.
///
/// # Examples
/// ```
/// use scope_jsonld::{convert, ConvertOptions};
///
/// let xml = r#"<Root><Record Id="r1" IdName="Thing" ParentId=""/></Root>"#;
/// let mut out = Vec::new();
/// let stats = convert(xml.as_bytes(), &mut out, &ConvertOptions::new()).unwrap();
///
/// assert_eq!(stats.records, 1);
/// let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
/// assert_eq!(doc["@graph"][0]["@id"], "r1");
/// ```
pub fn convert<R, W>(input: R, mut output: W, options: &ConvertOptions) -> Result<ConversionStats>
where
    R: BufRead,
    W: Write,
{
    let mut records = 0usize;
    let reader = RecordReader::new(input, options.properties.clone()).inspect(|record| {
        if record.is_ok() {
            records += 1;
        }
    });
    let chunks = EnvelopeChunks::new(reader, options.context.as_ref())?;

    let mut stats = ConversionStats::default();
    for chunk in chunks {
        let chunk = chunk?;
        output.write_all(chunk.as_bytes()).map_err(ScopeError::Sink)?;
        stats.add_chunk(&chunk);
    }
    output.flush().map_err(ScopeError::Sink)?;

    stats.records = records;
    tracing::info!(
        records = stats.records,
        bytes = stats.bytes_written,
        "conversion complete"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PropertyMap;
    use crate::envelope::DOCUMENT_FOOTER;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io;

    const SAMPLE: &str = r#"<Root><Record Id="r1" IdName="Thing" ParentId=""><DataElement ElementId="1001"><ElementValue><TextValue>Alice</TextValue></ElementValue></DataElement></Record></Root>"#;

    #[test]
    fn test_end_to_end_sample() {
        let options = ConvertOptions::new()
            .with_context(json!({"name": "http://schema.org/name"}))
            .with_properties(PropertyMap::try_from([("1001", "title")]).unwrap());

        let mut out = Vec::new();
        let stats = convert(SAMPLE.as_bytes(), &mut out, &options).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "{\n\"@context\":{\"name\":\"http://schema.org/name\"},\n\"@graph\": [\n\
             {\"@id\":\"r1\",\"name\":\"Thing\",\"parent\":\"\",\"title\":[\"Alice\"]}\n]}\n"
        );
        assert_eq!(stats.records, 1);
        assert_eq!(stats.bytes_written, text.len() as u64);
    }

    #[test]
    fn test_malformed_input_leaves_document_open() {
        let xml = r#"<Root><Record Id="r1"/><Record Id="r2">"#;
        let mut out = Vec::new();
        let err = convert(xml.as_bytes(), &mut out, &ConvertOptions::new()).unwrap_err();

        assert!(err.is_parse_error());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"r1\""));
        assert!(!text.ends_with(DOCUMENT_FOOTER));
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_failure_is_reported() {
        let err = convert(SAMPLE.as_bytes(), BrokenSink, &ConvertOptions::new()).unwrap_err();
        assert!(matches!(err, ScopeError::Sink(_)));
    }

    #[test]
    fn test_empty_graph() {
        let mut out = Vec::new();
        let stats = convert("<Root/>".as_bytes(), &mut out, &ConvertOptions::new()).unwrap();

        assert_eq!(stats.records, 0);
        let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(doc, json!({"@context": null, "@graph": []}));
    }
}
