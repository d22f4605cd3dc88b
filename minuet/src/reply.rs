//! Typed reply records and reply decoding.
//!
//! Every command's raw reply is a nested [`redis::Value`] tree of
//! integers, byte strings, and arrays. This module maps each tree to the
//! typed result the command contract promises: an acknowledgement, a
//! timestamp, a sample list, a per-series grouping, or a metadata record.
//!
//! Routing is a single match over the closed [`Command`] enum in
//! [`decode`], so a command without a decoder cannot exist. A reply whose
//! shape does not match its command surfaces as a [`DecodeError`] naming
//! the command and the offending shape; numeric coercion failures never
//! default to zero.

use std::collections::BTreeMap;

use redis::Value;
use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::DecodeError;
use crate::options::{AggregationType, DuplicatePolicy, Labels};

/// One timestamped sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since epoch.
    pub timestamp: i64,
    /// The sample value.
    pub value: f64,
}

impl Sample {
    /// Creates a sample.
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// One series' slice of a multi-series range reply.
///
/// Entries preserve server reply order; this layer never re-sorts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRange {
    /// Series key (or group key when the query grouped by a label).
    pub key: String,
    /// The label subset the query asked for; empty when none was requested.
    pub labels: Labels,
    /// Samples in the order the server returned them.
    pub samples: Vec<Sample>,
}

/// One series' slice of a multi-series last-sample reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesLast {
    /// Series key.
    pub key: String,
    /// The label subset the query asked for; empty when none was requested.
    pub labels: Labels,
    /// The latest sample, or `None` for a series with no samples.
    /// Timestamp and value are absent together, never one without the other.
    pub last: Option<Sample>,
}

/// A server-side compaction rule attached to a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactionRule {
    /// Destination series key.
    pub dest_key: String,
    /// Bucket width in milliseconds.
    pub bucket_ms: u64,
    /// Aggregation applied per bucket.
    pub aggregation: AggregationType,
}

/// Series metadata, decoded from the flat key/value info reply.
///
/// Fields that only newer servers report are `Option`: absence decodes to
/// `None`, never to an error. The legacy samples-per-chunk field of older
/// servers back-fills [`chunk_size`](Self::chunk_size) at 16 bytes per
/// sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesInfo {
    /// Total number of samples in the series.
    pub total_samples: u64,
    /// Memory used by the series, in bytes.
    pub memory_usage: u64,
    /// Timestamp of the earliest sample.
    pub first_timestamp: i64,
    /// Timestamp of the latest sample.
    pub last_timestamp: i64,
    /// Retention window in milliseconds; 0 means unbounded.
    pub retention_ms: u64,
    /// Number of memory chunks.
    pub chunk_count: u64,
    /// Samples per chunk, reported by older servers only.
    pub max_samples_per_chunk: Option<u64>,
    /// Chunk size in bytes; derived from the legacy field when only that
    /// is present.
    pub chunk_size: Option<u64>,
    /// Series duplicate policy; `None` when the server predates the
    /// setting or none is configured.
    pub duplicate_policy: Option<DuplicatePolicy>,
    /// Source series when this series is a compaction destination.
    pub source_key: Option<String>,
    /// Compaction rules with this series as their source.
    pub rules: Vec<CompactionRule>,
    /// Metadata labels.
    pub labels: Labels,
}

/// A decoded reply, one variant per reply shape in the command vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Acknowledgement: `true` iff the server answered with its canonical
    /// OK status.
    Ack(bool),
    /// Timestamp of an inserted or updated sample.
    Timestamp(i64),
    /// Per-entry insertion timestamps of a multi-series append, in input
    /// order.
    Timestamps(Vec<i64>),
    /// Number of deleted samples.
    Deleted(u64),
    /// Latest sample of a series, if any.
    LastSample(Option<Sample>),
    /// Range query result, in server order.
    Samples(Vec<Sample>),
    /// Multi-series range result, in server order.
    MultiRange(Vec<SeriesRange>),
    /// Multi-series last-sample result, in server order.
    MultiGet(Vec<SeriesLast>),
    /// Series metadata.
    Info(SeriesInfo),
    /// Matching series keys.
    Keys(Vec<String>),
}

impl Reply {
    fn kind(&self) -> &'static str {
        match self {
            Self::Ack(_) => "acknowledgement",
            Self::Timestamp(_) => "timestamp",
            Self::Timestamps(_) => "timestamp list",
            Self::Deleted(_) => "deleted count",
            Self::LastSample(_) => "last sample",
            Self::Samples(_) => "sample list",
            Self::MultiRange(_) => "multi-series ranges",
            Self::MultiGet(_) => "multi-series last samples",
            Self::Info(_) => "series info",
            Self::Keys(_) => "key list",
        }
    }

    fn mismatch(self, command: Command, expected: &'static str) -> DecodeError {
        DecodeError::UnexpectedShape {
            command: command.wire_name(),
            expected,
            actual: self.kind().to_string(),
        }
    }

    /// Extracts an acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedShape`] if this reply is a
    /// different variant.
    pub fn into_ack(self, command: Command) -> Result<bool, DecodeError> {
        match self {
            Self::Ack(ok) => Ok(ok),
            other => Err(other.mismatch(command, "acknowledgement")),
        }
    }

    /// Extracts a single insertion timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedShape`] if this reply is a
    /// different variant.
    pub fn into_timestamp(self, command: Command) -> Result<i64, DecodeError> {
        match self {
            Self::Timestamp(ts) => Ok(ts),
            other => Err(other.mismatch(command, "timestamp")),
        }
    }

    /// Extracts the per-entry timestamps of a multi-series append.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedShape`] if this reply is a
    /// different variant.
    pub fn into_timestamps(self, command: Command) -> Result<Vec<i64>, DecodeError> {
        match self {
            Self::Timestamps(ts) => Ok(ts),
            other => Err(other.mismatch(command, "timestamp list")),
        }
    }

    /// Extracts a deleted-sample count.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedShape`] if this reply is a
    /// different variant.
    pub fn into_deleted(self, command: Command) -> Result<u64, DecodeError> {
        match self {
            Self::Deleted(n) => Ok(n),
            other => Err(other.mismatch(command, "deleted count")),
        }
    }

    /// Extracts an optional last sample.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedShape`] if this reply is a
    /// different variant.
    pub fn into_last_sample(self, command: Command) -> Result<Option<Sample>, DecodeError> {
        match self {
            Self::LastSample(sample) => Ok(sample),
            other => Err(other.mismatch(command, "last sample")),
        }
    }

    /// Extracts a range result.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedShape`] if this reply is a
    /// different variant.
    pub fn into_samples(self, command: Command) -> Result<Vec<Sample>, DecodeError> {
        match self {
            Self::Samples(samples) => Ok(samples),
            other => Err(other.mismatch(command, "sample list")),
        }
    }

    /// Extracts a multi-series range result.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedShape`] if this reply is a
    /// different variant.
    pub fn into_multi_range(self, command: Command) -> Result<Vec<SeriesRange>, DecodeError> {
        match self {
            Self::MultiRange(entries) => Ok(entries),
            other => Err(other.mismatch(command, "multi-series ranges")),
        }
    }

    /// Extracts a multi-series last-sample result.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedShape`] if this reply is a
    /// different variant.
    pub fn into_multi_get(self, command: Command) -> Result<Vec<SeriesLast>, DecodeError> {
        match self {
            Self::MultiGet(entries) => Ok(entries),
            other => Err(other.mismatch(command, "multi-series last samples")),
        }
    }

    /// Extracts a series metadata record.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedShape`] if this reply is a
    /// different variant.
    pub fn into_info(self, command: Command) -> Result<SeriesInfo, DecodeError> {
        match self {
            Self::Info(info) => Ok(info),
            other => Err(other.mismatch(command, "series info")),
        }
    }

    /// Extracts a key list.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedShape`] if this reply is a
    /// different variant.
    pub fn into_keys(self, command: Command) -> Result<Vec<String>, DecodeError> {
        match self {
            Self::Keys(keys) => Ok(keys),
            other => Err(other.mismatch(command, "key list")),
        }
    }
}

/// Decodes a raw reply with the decoder registered for `command`.
///
/// This is the routing table of the adapter: one arm per command, checked
/// at compile time by the match over the closed enum.
///
/// # Errors
///
/// Returns a [`DecodeError`] when the reply's shape does not match the
/// command's contract or a numeric field fails coercion.
pub fn decode(command: Command, value: &Value) -> Result<Reply, DecodeError> {
    let name = command.wire_name();
    match command {
        Command::Create | Command::Alter | Command::CreateRule | Command::DeleteRule => {
            Ok(Reply::Ack(decode_ack(name, value)?))
        }
        Command::Add | Command::IncrBy | Command::DecrBy => {
            Ok(Reply::Timestamp(int_of(name, value)?))
        }
        Command::MAdd => Ok(Reply::Timestamps(decode_timestamps(name, value)?)),
        Command::Del => Ok(Reply::Deleted(count_of(name, value)?)),
        Command::Get => Ok(Reply::LastSample(decode_last_sample(name, value)?)),
        Command::Range | Command::RevRange => Ok(Reply::Samples(decode_samples(name, value)?)),
        Command::MRange | Command::MRevRange => {
            Ok(Reply::MultiRange(decode_multi_range(name, value)?))
        }
        Command::MGet => Ok(Reply::MultiGet(decode_multi_get(name, value)?)),
        Command::Info => Ok(Reply::Info(decode_info(name, value)?)),
        Command::QueryIndex => Ok(Reply::Keys(decode_keys(name, value)?)),
    }
}

/// Short shape description for error messages.
fn shape_of(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Int(_) => "integer".to_string(),
        Value::Double(_) => "double".to_string(),
        Value::BulkString(_) => "bulk string".to_string(),
        Value::SimpleString(_) | Value::Okay => "status".to_string(),
        Value::Array(items) => format!("array of {}", items.len()),
        Value::Map(pairs) => format!("map of {}", pairs.len()),
        _ => "unsupported value".to_string(),
    }
}

fn unexpected(command: &'static str, expected: &'static str, value: &Value) -> DecodeError {
    DecodeError::UnexpectedShape {
        command,
        expected,
        actual: shape_of(value),
    }
}

fn int_of(command: &'static str, value: &Value) -> Result<i64, DecodeError> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::BulkString(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            text.parse().map_err(|_| DecodeError::NotANumber {
                command,
                text: text.into_owned(),
            })
        }
        Value::SimpleString(text) => text.parse().map_err(|_| DecodeError::NotANumber {
            command,
            text: text.clone(),
        }),
        other => Err(unexpected(command, "integer", other)),
    }
}

fn count_of(command: &'static str, value: &Value) -> Result<u64, DecodeError> {
    let n = int_of(command, value)?;
    u64::try_from(n).map_err(|_| unexpected(command, "non-negative integer", value))
}

#[allow(clippy::cast_precision_loss)] // sample values are doubles on the wire
fn float_of(command: &'static str, value: &Value) -> Result<f64, DecodeError> {
    match value {
        Value::Int(i) => Ok(*i as f64),
        Value::Double(d) => Ok(*d),
        Value::BulkString(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            text.parse().map_err(|_| DecodeError::NotANumber {
                command,
                text: text.into_owned(),
            })
        }
        Value::SimpleString(text) => text.parse().map_err(|_| DecodeError::NotANumber {
            command,
            text: text.clone(),
        }),
        other => Err(unexpected(command, "numeric value", other)),
    }
}

fn string_of(command: &'static str, value: &Value) -> Result<String, DecodeError> {
    match value {
        Value::BulkString(bytes) => String::from_utf8(bytes.clone())
            .map_err(|_| unexpected(command, "UTF-8 text", value)),
        Value::SimpleString(text) => Ok(text.clone()),
        Value::Int(i) => Ok(i.to_string()),
        other => Err(unexpected(command, "text", other)),
    }
}

fn array_of<'a>(
    command: &'static str,
    expected: &'static str,
    value: &'a Value,
) -> Result<&'a [Value], DecodeError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(unexpected(command, expected, other)),
    }
}

fn decode_ack(command: &'static str, value: &Value) -> Result<bool, DecodeError> {
    match value {
        Value::Okay => Ok(true),
        Value::SimpleString(text) => Ok(text == "OK"),
        Value::BulkString(bytes) => Ok(bytes.as_slice() == b"OK"),
        other => Err(unexpected(command, "OK status", other)),
    }
}

fn decode_timestamps(command: &'static str, value: &Value) -> Result<Vec<i64>, DecodeError> {
    array_of(command, "array of timestamps", value)?
        .iter()
        .map(|item| int_of(command, item))
        .collect()
}

fn decode_sample(command: &'static str, value: &Value) -> Result<Sample, DecodeError> {
    match array_of(command, "[timestamp, value] pair", value)? {
        [ts, val] => Ok(Sample::new(int_of(command, ts)?, float_of(command, val)?)),
        _ => Err(unexpected(command, "[timestamp, value] pair", value)),
    }
}

fn decode_last_sample(
    command: &'static str,
    value: &Value,
) -> Result<Option<Sample>, DecodeError> {
    match value {
        // A series with no samples answers with an empty array (nil on
        // some server versions).
        Value::Nil => Ok(None),
        Value::Array(items) if items.is_empty() => Ok(None),
        other => Ok(Some(decode_sample(command, other)?)),
    }
}

fn decode_samples(command: &'static str, value: &Value) -> Result<Vec<Sample>, DecodeError> {
    array_of(command, "array of samples", value)?
        .iter()
        .map(|item| decode_sample(command, item))
        .collect()
}

fn decode_labels(command: &'static str, value: &Value) -> Result<Labels, DecodeError> {
    let mut labels = Labels::new();
    match value {
        Value::Nil => {}
        Value::Array(pairs) => {
            for pair in pairs {
                match array_of(command, "[label, value] pair", pair)? {
                    [key, val] => {
                        labels.insert(string_of(command, key)?, string_of(command, val)?);
                    }
                    _ => return Err(unexpected(command, "[label, value] pair", pair)),
                }
            }
        }
        Value::Map(pairs) => {
            for (key, val) in pairs {
                labels.insert(string_of(command, key)?, string_of(command, val)?);
            }
        }
        other => return Err(unexpected(command, "label pairs", other)),
    }
    Ok(labels)
}

fn decode_multi_range(
    command: &'static str,
    value: &Value,
) -> Result<Vec<SeriesRange>, DecodeError> {
    array_of(command, "array of series entries", value)?
        .iter()
        .map(|entry| {
            match array_of(command, "[key, labels, samples] entry", entry)? {
                [key, labels, samples] => Ok(SeriesRange {
                    key: string_of(command, key)?,
                    labels: decode_labels(command, labels)?,
                    samples: decode_samples(command, samples)?,
                }),
                _ => Err(unexpected(command, "[key, labels, samples] entry", entry)),
            }
        })
        .collect()
}

fn decode_multi_get(
    command: &'static str,
    value: &Value,
) -> Result<Vec<SeriesLast>, DecodeError> {
    array_of(command, "array of series entries", value)?
        .iter()
        .map(|entry| {
            match array_of(command, "[key, labels, sample] entry", entry)? {
                [key, labels, last] => Ok(SeriesLast {
                    key: string_of(command, key)?,
                    labels: decode_labels(command, labels)?,
                    last: decode_last_sample(command, last)?,
                }),
                _ => Err(unexpected(command, "[key, labels, sample] entry", entry)),
            }
        })
        .collect()
}

fn decode_keys(command: &'static str, value: &Value) -> Result<Vec<String>, DecodeError> {
    array_of(command, "array of keys", value)?
        .iter()
        .map(|item| string_of(command, item))
        .collect()
}

/// Bytes per sample assumed when deriving a chunk size from the legacy
/// samples-per-chunk field of pre-1.4 servers.
const LEGACY_SAMPLE_SIZE: u64 = 16;

fn decode_info(command: &'static str, value: &Value) -> Result<SeriesInfo, DecodeError> {
    // Zip the flat key/value reply into a map first, then extract named
    // fields; servers of different versions report different subsets.
    let mut fields: BTreeMap<String, &Value> = BTreeMap::new();
    match value {
        Value::Array(items) => {
            if items.len() % 2 != 0 {
                return Err(unexpected(command, "flat key/value array", value));
            }
            for pair in items.chunks_exact(2) {
                fields.insert(string_of(command, &pair[0])?, &pair[1]);
            }
        }
        Value::Map(pairs) => {
            for (key, val) in pairs {
                fields.insert(string_of(command, key)?, val);
            }
        }
        other => return Err(unexpected(command, "flat key/value array", other)),
    }

    let opt_u64 = |field: &str| -> Result<Option<u64>, DecodeError> {
        match fields.get(field) {
            None | Some(Value::Nil) => Ok(None),
            Some(v) => count_of(command, v).map(Some),
        }
    };
    let opt_i64 = |field: &str| -> Result<Option<i64>, DecodeError> {
        match fields.get(field) {
            None | Some(Value::Nil) => Ok(None),
            Some(v) => int_of(command, v).map(Some),
        }
    };

    let mut info = SeriesInfo {
        total_samples: opt_u64("totalSamples")?.unwrap_or(0),
        memory_usage: opt_u64("memoryUsage")?.unwrap_or(0),
        first_timestamp: opt_i64("firstTimestamp")?.unwrap_or(0),
        last_timestamp: opt_i64("lastTimestamp")?.unwrap_or(0),
        retention_ms: opt_u64("retentionTime")?.unwrap_or(0),
        chunk_count: opt_u64("chunkCount")?.unwrap_or(0),
        max_samples_per_chunk: opt_u64("maxSamplesPerChunk")?,
        chunk_size: opt_u64("chunkSize")?,
        ..SeriesInfo::default()
    };

    // Older servers report samples-per-chunk instead of a byte size.
    if info.chunk_size.is_none() {
        info.chunk_size = info.max_samples_per_chunk.map(|n| n * LEGACY_SAMPLE_SIZE);
    }

    info.duplicate_policy = match fields.get("duplicatePolicy") {
        None | Some(Value::Nil) => None,
        Some(v) => {
            let tag = string_of(command, v)?;
            Some(
                tag.parse::<DuplicatePolicy>()
                    .map_err(|_| DecodeError::UnknownTag {
                        command,
                        field: "duplicatePolicy",
                        tag,
                    })?,
            )
        }
    };

    info.source_key = match fields.get("sourceKey") {
        None | Some(Value::Nil) => None,
        Some(v) => {
            let key = string_of(command, v)?;
            if key.is_empty() { None } else { Some(key) }
        }
    };

    if let Some(labels) = fields.get("labels") {
        info.labels = decode_labels(command, labels)?;
    }

    if let Some(rules) = fields.get("rules") {
        info.rules = decode_rules(command, rules)?;
    }

    Ok(info)
}

fn decode_rules(
    command: &'static str,
    value: &Value,
) -> Result<Vec<CompactionRule>, DecodeError> {
    array_of(command, "array of compaction rules", value)?
        .iter()
        .map(|rule| {
            match array_of(command, "[dest, bucket, aggregation] rule", rule)? {
                [dest, bucket, aggregation] => {
                    let tag = string_of(command, aggregation)?;
                    Ok(CompactionRule {
                        dest_key: string_of(command, dest)?,
                        bucket_ms: count_of(command, bucket)?,
                        aggregation: tag.parse::<AggregationType>().map_err(|_| {
                            DecodeError::UnknownTag {
                                command,
                                field: "rule aggregation",
                                tag,
                            }
                        })?,
                    })
                }
                _ => Err(unexpected(command, "[dest, bucket, aggregation] rule", rule)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(text: &str) -> Value {
        Value::BulkString(text.as_bytes().to_vec())
    }

    fn pair(ts: i64, value: &str) -> Value {
        Value::Array(vec![Value::Int(ts), bulk(value)])
    }

    #[test]
    fn test_decode_ack() {
        assert_eq!(decode(Command::Create, &Value::Okay).unwrap(), Reply::Ack(true));
        assert_eq!(
            decode(Command::Alter, &Value::SimpleString("OK".to_string())).unwrap(),
            Reply::Ack(true)
        );
        // Right shape, wrong content: decodes, but is not an ack.
        assert_eq!(
            decode(Command::CreateRule, &Value::SimpleString("QUEUED".to_string())).unwrap(),
            Reply::Ack(false)
        );
        // Wrong shape entirely.
        assert!(decode(Command::DeleteRule, &Value::Int(1)).is_err());
    }

    #[test]
    fn test_decode_insertion_timestamp() {
        assert_eq!(
            decode(Command::Add, &Value::Int(1589636004)).unwrap(),
            Reply::Timestamp(1589636004)
        );
        assert_eq!(
            decode(Command::IncrBy, &bulk("77")).unwrap(),
            Reply::Timestamp(77)
        );
    }

    #[test]
    fn test_decode_madd_preserves_input_order() {
        let reply = Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(
            decode(Command::MAdd, &reply).unwrap(),
            Reply::Timestamps(vec![1, 2, 3])
        );
    }

    #[test]
    fn test_decode_deleted_count() {
        assert_eq!(decode(Command::Del, &Value::Int(42)).unwrap(), Reply::Deleted(42));
        assert!(decode(Command::Del, &Value::Int(-1)).is_err());
    }

    #[test]
    fn test_decode_get_empty_series() {
        // Empty array and nil both mean "no data"; never a half-filled pair.
        assert_eq!(
            decode(Command::Get, &Value::Array(vec![])).unwrap(),
            Reply::LastSample(None)
        );
        assert_eq!(
            decode(Command::Get, &Value::Nil).unwrap(),
            Reply::LastSample(None)
        );
    }

    #[test]
    fn test_decode_get_sample() {
        assert_eq!(
            decode(Command::Get, &pair(2, "3")).unwrap(),
            Reply::LastSample(Some(Sample::new(2, 3.0)))
        );
    }

    #[test]
    fn test_decode_range_coerces_text_values() {
        let reply = Value::Array(vec![pair(1, "1"), pair(2, "3.5")]);
        assert_eq!(
            decode(Command::Range, &reply).unwrap(),
            Reply::Samples(vec![Sample::new(1, 1.0), Sample::new(2, 3.5)])
        );
    }

    #[test]
    fn test_decode_range_rejects_non_numeric_text() {
        let reply = Value::Array(vec![pair(1, "not-a-number")]);
        let err = decode(Command::Range, &reply).unwrap_err();
        assert_eq!(
            err,
            DecodeError::NotANumber {
                command: "TS.RANGE",
                text: "not-a-number".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_range_rejects_wrong_shape() {
        let err = decode(Command::Range, &Value::Int(3)).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedShape { command: "TS.RANGE", .. }));
    }

    #[test]
    fn test_decode_multi_range_preserves_server_order() {
        let reply = Value::Array(vec![
            Value::Array(vec![
                bulk("z:series"),
                Value::Array(vec![Value::Array(vec![bulk("env"), bulk("prod")])]),
                Value::Array(vec![pair(1, "5")]),
            ]),
            Value::Array(vec![
                bulk("a:series"),
                Value::Array(vec![]),
                Value::Array(vec![]),
            ]),
        ]);

        let Reply::MultiRange(entries) = decode(Command::MRange, &reply).unwrap() else {
            panic!("expected multi-range reply");
        };
        // Server order, not lexicographic order.
        assert_eq!(entries[0].key, "z:series");
        assert_eq!(entries[0].labels.get("env").map(String::as_str), Some("prod"));
        assert_eq!(entries[0].samples, vec![Sample::new(1, 5.0)]);
        assert_eq!(entries[1].key, "a:series");
        assert!(entries[1].labels.is_empty());
        assert!(entries[1].samples.is_empty());
    }

    #[test]
    fn test_decode_multi_get_empty_and_populated() {
        let reply = Value::Array(vec![
            Value::Array(vec![bulk("empty"), Value::Array(vec![]), Value::Array(vec![])]),
            Value::Array(vec![
                bulk("live"),
                Value::Array(vec![Value::Array(vec![bulk("env"), bulk("prod")])]),
                pair(9, "1.25"),
            ]),
        ]);

        let Reply::MultiGet(entries) = decode(Command::MGet, &reply).unwrap() else {
            panic!("expected multi-get reply");
        };
        assert_eq!(entries[0].key, "empty");
        assert_eq!(entries[0].last, None);
        assert_eq!(entries[1].last, Some(Sample::new(9, 1.25)));
        assert_eq!(entries[1].labels.get("env").map(String::as_str), Some("prod"));
    }

    fn info_reply(extra: Vec<Value>) -> Value {
        let mut items = vec![
            bulk("totalSamples"),
            Value::Int(100),
            bulk("memoryUsage"),
            Value::Int(4184),
            bulk("firstTimestamp"),
            Value::Int(10),
            bulk("lastTimestamp"),
            Value::Int(200),
            bulk("retentionTime"),
            Value::Int(20),
            bulk("chunkCount"),
            Value::Int(1),
            bulk("labels"),
            Value::Array(vec![Value::Array(vec![bulk("Time"), bulk("Series")])]),
            bulk("sourceKey"),
            bulk(""),
            bulk("rules"),
            Value::Array(vec![Value::Array(vec![
                bulk("dest"),
                Value::Int(60000),
                bulk("AVG"),
            ])]),
        ];
        items.extend(extra);
        Value::Array(items)
    }

    #[test]
    fn test_decode_info_modern_server() {
        let reply = info_reply(vec![
            bulk("chunkSize"),
            Value::Int(4096),
            bulk("duplicatePolicy"),
            bulk("last"),
        ]);

        let Reply::Info(info) = decode(Command::Info, &reply).unwrap() else {
            panic!("expected info reply");
        };
        assert_eq!(info.total_samples, 100);
        assert_eq!(info.retention_ms, 20);
        assert_eq!(info.chunk_size, Some(4096));
        assert_eq!(info.duplicate_policy, Some(DuplicatePolicy::Last));
        assert_eq!(info.source_key, None);
        assert_eq!(info.labels.get("Time").map(String::as_str), Some("Series"));
        assert_eq!(
            info.rules,
            vec![CompactionRule {
                dest_key: "dest".to_string(),
                bucket_ms: 60000,
                aggregation: AggregationType::Avg,
            }]
        );
    }

    #[test]
    fn test_decode_info_old_server_without_duplicate_policy() {
        // Pre-1.4 server: no duplicatePolicy, legacy samples-per-chunk.
        let reply = info_reply(vec![bulk("maxSamplesPerChunk"), Value::Int(256)]);

        let Reply::Info(info) = decode(Command::Info, &reply).unwrap() else {
            panic!("expected info reply");
        };
        assert_eq!(info.duplicate_policy, None);
        assert_eq!(info.max_samples_per_chunk, Some(256));
        assert_eq!(info.chunk_size, Some(256 * 16));
    }

    #[test]
    fn test_decode_info_nil_duplicate_policy() {
        let reply = info_reply(vec![bulk("duplicatePolicy"), Value::Nil]);
        let Reply::Info(info) = decode(Command::Info, &reply).unwrap() else {
            panic!("expected info reply");
        };
        assert_eq!(info.duplicate_policy, None);
    }

    #[test]
    fn test_decode_info_rejects_unknown_rule_aggregation() {
        let reply = info_reply(vec![]);
        // Patch in a rule with an unknown aggregation tag.
        let Value::Array(mut items) = reply else { unreachable!() };
        let rules_at = items.len() - 1;
        items[rules_at] = Value::Array(vec![Value::Array(vec![
            bulk("dest"),
            Value::Int(1),
            bulk("median"),
        ])]);
        let err = decode(Command::Info, &Value::Array(items)).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownTag { field: "rule aggregation", .. }));
    }

    #[test]
    fn test_decode_query_index() {
        let reply = Value::Array(vec![bulk("sensor:1"), bulk("sensor:2")]);
        assert_eq!(
            decode(Command::QueryIndex, &reply).unwrap(),
            Reply::Keys(vec!["sensor:1".to_string(), "sensor:2".to_string()])
        );
    }

    #[test]
    fn test_reply_extraction_mismatch() {
        let err = Reply::Ack(true).into_samples(Command::Range).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedShape { command: "TS.RANGE", .. }));
    }

    #[test]
    fn test_result_records_serialize() {
        let sample = Sample::new(5, 1.5);
        assert_eq!(
            serde_json::to_string(&sample).unwrap(),
            r#"{"timestamp":5,"value":1.5}"#
        );

        let info = SeriesInfo::default();
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["duplicate_policy"], serde_json::Value::Null);
        assert_eq!(json["total_samples"], 0);
    }
}
