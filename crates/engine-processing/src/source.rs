//! Streams the elements of one top-level array field of a JSON document.
//!
//! The document is walked by a blocking reader task with `serde_json`'s
//! streaming deserializer; elements cross into async code one at a time
//! through a bounded channel, so at most `capacity` decoded elements are
//! held in memory regardless of file size.

use crate::error::{ImportError, SourceError};
use model::records::raw::RawItem;
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::Value;
use std::{
    fmt,
    io::BufReader,
    path::{Path, PathBuf},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

/// What the reader saw once the document was fully consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSummary {
    pub field_found: bool,
    pub items: u64,
}

pub struct JsonArraySource {
    path: PathBuf,
    rx: mpsc::Receiver<Value>,
    reader: JoinHandle<Result<ReadSummary, SourceError>>,
    position: u64,
}

impl JsonArraySource {
    /// Checks `path` and starts streaming the array stored under `field`.
    pub async fn open(path: &Path, field: &str, capacity: usize) -> Result<Self, ImportError> {
        let file = check_path(path).await?;
        let (tx, rx) = mpsc::channel(capacity.max(1));

        let field = field.to_string();
        let reader = tokio::task::spawn_blocking(move || read_document(file, &field, tx));

        debug!(path = %path.display(), capacity, "Started JSON array reader");

        Ok(Self {
            path: path.to_path_buf(),
            rx,
            reader,
            position: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next element with its zero-based array position, `None` once the
    /// reader has stopped (either at the end of the array or on an error;
    /// [`finish`](Self::finish) tells which).
    pub async fn next(&mut self) -> Option<RawItem> {
        let value = self.rx.recv().await?;
        let item = RawItem::new(self.position, value);
        self.position += 1;
        Some(item)
    }

    /// Waits for the reader and reports how the document ended.
    pub async fn finish(self) -> Result<ReadSummary, SourceError> {
        let Self { path, rx, reader, .. } = self;
        drop(rx);

        let summary = reader
            .await
            .map_err(|e| SourceError::Task(e.to_string()))??;

        if !summary.field_found {
            warn!(path = %path.display(), "Document has no data array, nothing to import");
        }
        Ok(summary)
    }

    /// Stops reading early. The reader exits at its next send.
    pub async fn cancel(self) -> Result<ReadSummary, SourceError> {
        let Self { mut rx, reader, .. } = self;
        rx.close();
        drop(rx);

        reader
            .await
            .map_err(|e| SourceError::Task(e.to_string()))?
    }
}

/// The path must exist, be a regular file and open for reading.
pub async fn check_path(path: &Path) -> Result<std::fs::File, ImportError> {
    let invalid = |reason: String| ImportError::FileValidation {
        path: path.display().to_string(),
        reason,
    };

    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| invalid(format!("cannot stat file: {e}")))?;
    if !meta.is_file() {
        return Err(invalid("not a regular file".to_string()));
    }

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| invalid(format!("cannot open for reading: {e}")))?;

    Ok(file.into_std().await)
}

fn read_document(
    file: std::fs::File,
    field: &str,
    tx: mpsc::Sender<Value>,
) -> Result<ReadSummary, SourceError> {
    let mut de = serde_json::Deserializer::from_reader(BufReader::new(file));
    let mut emitter = Emitter {
        tx,
        closed: false,
        field_found: false,
        sent: 0,
    };

    let seed = DocumentSeed {
        field,
        emitter: &mut emitter,
    };
    let result = seed.deserialize(&mut de).and_then(|()| de.end());

    match result {
        Ok(()) => Ok(ReadSummary {
            field_found: emitter.field_found,
            items: emitter.sent,
        }),
        Err(_) if emitter.closed => Err(SourceError::ReceiverClosed),
        Err(e) if e.is_io() => Err(SourceError::Io(e.into())),
        Err(e) => Err(SourceError::Json(e)),
    }
}

struct Emitter {
    tx: mpsc::Sender<Value>,
    closed: bool,
    field_found: bool,
    sent: u64,
}

/// Visits the top-level object, streaming `field` and skipping the rest.
struct DocumentSeed<'a> {
    field: &'a str,
    emitter: &'a mut Emitter,
}

impl<'de> DeserializeSeed<'de> for DocumentSeed<'_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for DocumentSeed<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a JSON object with a `{}` array", self.field)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        while let Some(key) = map.next_key::<String>()? {
            if key == self.field && !self.emitter.field_found {
                self.emitter.field_found = true;
                map.next_value_seed(ArraySeed {
                    emitter: &mut *self.emitter,
                })?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

struct ArraySeed<'a> {
    emitter: &'a mut Emitter,
}

impl<'de> DeserializeSeed<'de> for ArraySeed<'_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for ArraySeed<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of records")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        while let Some(value) = seq.next_element::<Value>()? {
            if self.emitter.tx.blocking_send(value).is_err() {
                self.emitter.closed = true;
                return Err(de::Error::custom("record receiver closed"));
            }
            self.emitter.sent += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn doc(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    async fn collect(path: &Path) -> (Vec<RawItem>, Result<ReadSummary, SourceError>) {
        let mut source = JsonArraySource::open(path, "data", 2).await.unwrap();
        let mut items = Vec::new();
        while let Some(item) = source.next().await {
            items.push(item);
        }
        (items, source.finish().await)
    }

    #[tokio::test]
    async fn streams_elements_with_positions_and_skips_other_keys() {
        let file = doc(
            r#"{
                "object": "list",
                "meta": { "data": ["not", "this"] },
                "data": [ {"id": "a"}, 7, {"id": "c"} ],
                "has_more": false
            }"#,
        );

        let (items, summary) = collect(file.path()).await;
        let summary = summary.unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].value, json!({ "id": "a" }));
        assert_eq!(items[1].position, 1);
        assert_eq!(items[1].value, json!(7));
        assert_eq!(items[2].position, 2);
        assert_eq!(
            summary,
            ReadSummary {
                field_found: true,
                items: 3
            }
        );
    }

    #[tokio::test]
    async fn missing_field_is_an_empty_stream() {
        let file = doc(r#"{ "object": "list", "total": 0 }"#);
        let (items, summary) = collect(file.path()).await;

        assert!(items.is_empty());
        assert!(!summary.unwrap().field_found);
    }

    #[tokio::test]
    async fn malformed_json_fails_after_good_prefix() {
        let file = doc(r#"{ "data": [ {"id": "a"}, {"id": "b"}, {"id": "#);
        let (items, summary) = collect(file.path()).await;

        assert_eq!(items.len(), 2);
        assert!(matches!(summary, Err(SourceError::Json(_))));
    }

    #[tokio::test]
    async fn top_level_array_is_rejected() {
        let file = doc(r#"[ {"id": "a"} ]"#);
        let (items, summary) = collect(file.path()).await;

        assert!(items.is_empty());
        assert!(matches!(summary, Err(SourceError::Json(_))));
    }

    #[tokio::test]
    async fn non_array_field_is_rejected() {
        let file = doc(r#"{ "data": { "id": "a" } }"#);
        let (_, summary) = collect(file.path()).await;
        assert!(matches!(summary, Err(SourceError::Json(_))));
    }

    #[tokio::test]
    async fn trailing_garbage_is_rejected() {
        let file = doc(r#"{ "data": [] } }"#);
        let (_, summary) = collect(file.path()).await;
        assert!(matches!(summary, Err(SourceError::Json(_))));
    }

    #[tokio::test]
    async fn directories_and_missing_paths_fail_validation() {
        let dir = tempfile::tempdir().unwrap();

        let err = JsonArraySource::open(dir.path(), "data", 4).await.err().unwrap();
        assert!(matches!(err, ImportError::FileValidation { .. }));

        let missing = dir.path().join("nope.json");
        let err = JsonArraySource::open(&missing, "data", 4).await.err().unwrap();
        assert!(matches!(err, ImportError::FileValidation { .. }));
    }

    #[tokio::test]
    async fn cancel_stops_reader() {
        let body = serde_json::to_string(&json!({
            "data": (0..500).map(|i| json!({ "id": i })).collect::<Vec<_>>()
        }))
        .unwrap();
        let file = doc(&body);

        let mut source = JsonArraySource::open(file.path(), "data", 1).await.unwrap();
        assert_eq!(source.next().await.unwrap().position, 0);

        let result = source.cancel().await;
        assert!(matches!(result, Err(SourceError::ReceiverClosed)));
    }
}
