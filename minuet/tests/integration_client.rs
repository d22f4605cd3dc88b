//! Integration tests for the typed client over a scripted transport.

use std::collections::VecDeque;

use minuet::client::{Client, Transport};
use minuet::error::MinuetError;
use minuet::options::{
    Aggregation, AggregationType, CreateOptions, MGetOptions, MultiRangeOptions, RangeOptions,
    Timestamp,
};
use minuet::reply::Sample;
use redis::{RedisResult, Value};

/// Transport double: records every issued command and pops canned replies
/// in order.
struct Scripted {
    issued: Vec<(String, Vec<String>)>,
    replies: VecDeque<Value>,
}

impl Scripted {
    fn new(replies: impl IntoIterator<Item = Value>) -> Self {
        Self {
            issued: Vec::new(),
            replies: replies.into_iter().collect(),
        }
    }
}

impl Transport for Scripted {
    fn execute(&mut self, name: &str, args: &[String]) -> RedisResult<Value> {
        self.issued.push((name.to_string(), args.to_vec()));
        Ok(self.replies.pop_front().expect("script exhausted"))
    }
}

fn bulk(text: &str) -> Value {
    Value::BulkString(text.as_bytes().to_vec())
}

fn sample_value(ts: i64, value: &str) -> Value {
    Value::Array(vec![Value::Int(ts), bulk(value)])
}

#[test]
fn test_create_then_info_round_trip() {
    // create k1 with retention 20ms and label {Time: Series}; info echoes both.
    let info_reply = Value::Array(vec![
        bulk("totalSamples"),
        Value::Int(0),
        bulk("memoryUsage"),
        Value::Int(4184),
        bulk("firstTimestamp"),
        Value::Int(0),
        bulk("lastTimestamp"),
        Value::Int(0),
        bulk("retentionTime"),
        Value::Int(20),
        bulk("chunkCount"),
        Value::Int(1),
        bulk("chunkSize"),
        Value::Int(4096),
        bulk("duplicatePolicy"),
        Value::Nil,
        bulk("labels"),
        Value::Array(vec![Value::Array(vec![bulk("Time"), bulk("Series")])]),
        bulk("sourceKey"),
        bulk(""),
        bulk("rules"),
        Value::Array(vec![]),
    ]);
    let mut client = Client::new(Scripted::new([Value::Okay, info_reply]));

    let options = CreateOptions::default()
        .with_retention_ms(20)
        .with_label("Time", "Series");
    assert!(client.create("k1", &options).unwrap());

    let info = client.info("k1").unwrap();
    assert_eq!(info.retention_ms, 20);
    assert_eq!(info.labels.get("Time").map(String::as_str), Some("Series"));
    assert_eq!(info.duplicate_policy, None);
    assert_eq!(info.source_key, None);
    assert!(info.rules.is_empty());

    let issued = client.into_inner().issued;
    assert_eq!(
        issued[0],
        (
            "TS.CREATE".to_string(),
            vec![
                "k1".to_string(),
                "RETENTION".to_string(),
                "20".to_string(),
                "LABELS".to_string(),
                "Time".to_string(),
                "Series".to_string(),
            ]
        )
    );
    assert_eq!(issued[1], ("TS.INFO".to_string(), vec!["k1".to_string()]));
}

#[test]
fn test_add_then_range() {
    // add (1,1) and (2,3) to k2; range 0..10 decodes [(1,1.0),(2,3.0)].
    let mut client = Client::new(Scripted::new([
        Value::Int(1),
        Value::Int(2),
        Value::Array(vec![sample_value(1, "1"), sample_value(2, "3")]),
    ]));

    assert_eq!(client.add("k2", 1, 1.0, &Default::default()).unwrap(), 1);
    assert_eq!(client.add("k2", 2, 3.0, &Default::default()).unwrap(), 2);

    let samples = client.range("k2", 0, 10, &RangeOptions::default()).unwrap();
    assert_eq!(samples, vec![Sample::new(1, 1.0), Sample::new(2, 3.0)]);
}

#[test]
fn test_range_and_rev_range_are_exact_reverses() {
    let ascending = vec![sample_value(1, "1"), sample_value(2, "3"), sample_value(3, "5")];
    let descending: Vec<Value> = ascending.iter().rev().cloned().collect();

    let mut client = Client::new(Scripted::new([
        Value::Array(ascending),
        Value::Array(descending),
    ]));

    let forward = client.range("k", 0, 10, &RangeOptions::default()).unwrap();
    let backward = client.rev_range("k", 0, 10, &RangeOptions::default()).unwrap();

    let mut reversed = backward;
    reversed.reverse();
    assert_eq!(forward, reversed);

    // Identical token sequences; only the command name differs.
    let issued = client.into_inner().issued;
    assert_eq!(issued[0].0, "TS.RANGE");
    assert_eq!(issued[1].0, "TS.REVRANGE");
    assert_eq!(issued[0].1, issued[1].1);
}

#[test]
fn test_multi_add_preserves_input_order() {
    let mut client = Client::new(Scripted::new([Value::Array(vec![
        Value::Int(1),
        Value::Int(2),
        Value::Int(3),
    ])]));

    let entries = [
        ("a", Timestamp::Millis(1), 5.0),
        ("a", Timestamp::Millis(2), 10.0),
        ("a", Timestamp::Millis(3), 15.0),
    ];
    assert_eq!(client.multi_add(&entries).unwrap(), vec![1, 2, 3]);

    let issued = client.into_inner().issued;
    assert_eq!(
        issued[0].1,
        vec!["a", "1", "5", "a", "2", "10", "a", "3", "15"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_get_empty_series_is_none() {
    let mut client = Client::new(Scripted::new([
        Value::Array(vec![]),
        sample_value(2, "3"),
    ]));

    assert_eq!(client.get("empty").unwrap(), None);
    assert_eq!(client.get("live").unwrap(), Some(Sample::new(2, 3.0)));
}

#[test]
fn test_counter_commands() {
    let mut client = Client::new(Scripted::new([Value::Int(10), Value::Int(11)]));

    assert_eq!(client.incr_by("hits", 2.0, &Default::default()).unwrap(), 10);
    assert_eq!(client.decr_by("hits", 1.0, &Default::default()).unwrap(), 11);

    let issued = client.into_inner().issued;
    assert_eq!(issued[0].0, "TS.INCRBY");
    assert_eq!(issued[1].0, "TS.DECRBY");
}

#[test]
fn test_delete_range_count() {
    let mut client = Client::new(Scripted::new([Value::Int(7)]));
    assert_eq!(client.delete_range("k", 0, 100).unwrap(), 7);

    let issued = client.into_inner().issued;
    assert_eq!(issued[0], ("TS.DEL".to_string(), vec!["k".into(), "0".into(), "100".into()]));
}

#[test]
fn test_rule_commands() {
    let mut client = Client::new(Scripted::new([Value::Okay, Value::Okay]));

    let agg = Aggregation::new(AggregationType::Avg, 60_000);
    assert!(client.create_rule("src", "dst", agg).unwrap());
    assert!(client.delete_rule("src", "dst").unwrap());

    let issued = client.into_inner().issued;
    assert_eq!(
        issued[0].1,
        vec!["src", "dst", "AGGREGATION", "avg", "60000"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
    assert_eq!(issued[1].1, vec!["src".to_string(), "dst".to_string()]);
}

#[test]
fn test_multi_range_with_grouping() {
    let reply = Value::Array(vec![Value::Array(vec![
        bulk("region=eu"),
        Value::Array(vec![Value::Array(vec![bulk("region"), bulk("eu")])]),
        Value::Array(vec![sample_value(1, "12.5")]),
    ])]);
    let mut client = Client::new(Scripted::new([reply]));

    let options = MultiRangeOptions::default()
        .with_labels()
        .with_group_by("region", "sum");
    let entries = client
        .multi_range(0, 100, &["env=prod"], &options)
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "region=eu");
    assert_eq!(entries[0].samples, vec![Sample::new(1, 12.5)]);

    let issued = client.into_inner().issued;
    assert_eq!(issued[0].0, "TS.MRANGE");
    // Trailing groups: label selection, filters, then group-by pair with
    // the reduce tag upper-cased.
    assert_eq!(
        issued[0].1,
        vec![
            "0", "100", "WITHLABELS", "FILTER", "env=prod", "GROUPBY", "region", "REDUCE", "SUM",
        ]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>()
    );
}

#[test]
fn test_multi_get() {
    let reply = Value::Array(vec![
        Value::Array(vec![bulk("a"), Value::Array(vec![]), Value::Array(vec![])]),
        Value::Array(vec![bulk("b"), Value::Array(vec![]), sample_value(4, "2")]),
    ]);
    let mut client = Client::new(Scripted::new([reply]));

    let entries = client.multi_get(&["env=prod"], &MGetOptions::default()).unwrap();
    assert_eq!(entries[0].key, "a");
    assert_eq!(entries[0].last, None);
    assert_eq!(entries[1].last, Some(Sample::new(4, 2.0)));
}

#[test]
fn test_query_index() {
    let reply = Value::Array(vec![bulk("sensor:1"), bulk("sensor:2")]);
    let mut client = Client::new(Scripted::new([reply]));

    assert_eq!(
        client.query_index(&["room=lab"]).unwrap(),
        vec!["sensor:1".to_string(), "sensor:2".to_string()]
    );
}

#[test]
fn test_validation_errors_issue_no_request() {
    let mut client = Client::new(Scripted::new([]));

    // Both label-selection modes at once.
    let options = MultiRangeOptions::default()
        .with_labels()
        .with_selected_labels(["region"]);
    let err = client
        .multi_range(0, 10, &["env=prod"], &options)
        .unwrap_err();
    assert!(matches!(err, MinuetError::Validation(_)));

    // Half-open value filter.
    let options = RangeOptions {
        filter_by_max_value: Some(3.5),
        ..Default::default()
    };
    let err = client.range("k", 0, 10, &options).unwrap_err();
    assert!(matches!(err, MinuetError::Validation(_)));

    assert!(client.into_inner().issued.is_empty());
}

#[test]
fn test_decode_error_names_command_and_shape() {
    // A range command answered with a bare integer is a protocol mismatch.
    let mut client = Client::new(Scripted::new([Value::Int(5)]));
    let err = client.range("k", 0, 10, &RangeOptions::default()).unwrap_err();

    let MinuetError::Decode(decode) = err else {
        panic!("expected a decode error, got {err:?}");
    };
    let message = decode.to_string();
    assert!(message.contains("TS.RANGE"), "message was: {message}");
    assert!(message.contains("integer"), "message was: {message}");
}

#[test]
fn test_server_error_passes_through() {
    struct Failing;
    impl Transport for Failing {
        fn execute(&mut self, _name: &str, _args: &[String]) -> RedisResult<Value> {
            Err(redis::RedisError::from((
                redis::ErrorKind::ResponseError,
                "TSDB: the key does not exist",
            )))
        }
    }

    let mut client = Client::new(Failing);
    let err = client.get("missing").unwrap_err();
    let MinuetError::Server(server) = err else {
        panic!("expected a server error, got {err:?}");
    };
    assert!(server.to_string().contains("the key does not exist"));
}
