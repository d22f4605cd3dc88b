//! Command vocabulary and wire-token assembly.
//!
//! Each public function here is the builder for one command: it takes the
//! required positional arguments plus the command family's option record
//! and produces the exact ordered token sequence the server expects. The
//! builders are pure; nothing here touches a transport.
//!
//! Optional groups are keyword-marked (`RETENTION`, `LABELS`,
//! `AGGREGATION`, ...) and each command emits its groups in a fixed
//! relative order. Token order *inside* a group is part of the contract;
//! the leading marker makes the groups themselves self-describing.

use std::fmt;

use crate::error::ValidationError;
use crate::options::{
    AddOptions, Aggregation, Align, AlterOptions, CounterOptions, CreateOptions, DuplicatePolicy,
    Labels, MGetOptions, MultiRangeOptions, RangeOptions, TimeBound, Timestamp,
};

/// The closed command vocabulary of the time-series store.
///
/// Every command this client can issue is a variant here; the reply
/// decoder routes on the same enum, so an unregistered decoder cannot
/// exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Create a new series.
    Create,
    /// Update retention, labels, or duplicate policy of a series.
    Alter,
    /// Append one sample.
    Add,
    /// Append samples to several series in one call.
    MAdd,
    /// Increment the latest sample (counter semantics).
    IncrBy,
    /// Decrement the latest sample (counter semantics).
    DecrBy,
    /// Delete all samples in a time range.
    Del,
    /// Create a compaction rule.
    CreateRule,
    /// Delete a compaction rule.
    DeleteRule,
    /// Query a range, ascending.
    Range,
    /// Query a range, descending.
    RevRange,
    /// Query a range across series matched by filters, ascending.
    MRange,
    /// Query a range across series matched by filters, descending.
    MRevRange,
    /// Read the last sample of a series.
    Get,
    /// Read the last sample of every series matched by filters.
    MGet,
    /// Read series metadata.
    Info,
    /// List the keys of series matched by filters.
    QueryIndex,
}

impl Command {
    /// Returns the literal wire token for this command.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Create => "TS.CREATE",
            Self::Alter => "TS.ALTER",
            Self::Add => "TS.ADD",
            Self::MAdd => "TS.MADD",
            Self::IncrBy => "TS.INCRBY",
            Self::DecrBy => "TS.DECRBY",
            Self::Del => "TS.DEL",
            Self::CreateRule => "TS.CREATERULE",
            Self::DeleteRule => "TS.DELETERULE",
            Self::Range => "TS.RANGE",
            Self::RevRange => "TS.REVRANGE",
            Self::MRange => "TS.MRANGE",
            Self::MRevRange => "TS.MREVRANGE",
            Self::Get => "TS.GET",
            Self::MGet => "TS.MGET",
            Self::Info => "TS.INFO",
            Self::QueryIndex => "TS.QUERYINDEX",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Ordered token accumulator with one append helper per optional group.
///
/// Each helper emits nothing when its option is absent, so builders read
/// as the literal group order of the wire contract.
#[derive(Debug, Default)]
struct ArgBuf {
    args: Vec<String>,
}

impl ArgBuf {
    fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, token: impl fmt::Display) {
        self.args.push(token.to_string());
    }

    fn retention(&mut self, retention_ms: Option<u64>) {
        if let Some(ms) = retention_ms {
            self.push("RETENTION");
            self.push(ms);
        }
    }

    fn uncompressed(&mut self, uncompressed: bool) {
        if uncompressed {
            self.push("UNCOMPRESSED");
        }
    }

    fn chunk_size(&mut self, chunk_size: Option<u64>) {
        if let Some(bytes) = chunk_size {
            self.push("CHUNK_SIZE");
            self.push(bytes);
        }
    }

    /// The marker differs by command: `DUPLICATE_POLICY` configures the
    /// series (create/alter), `ON_DUPLICATE` overrides one insertion (add).
    fn duplicate_policy(&mut self, marker: &'static str, policy: Option<DuplicatePolicy>) {
        if let Some(policy) = policy {
            self.push(marker);
            self.push(policy.wire_tag());
        }
    }

    /// An empty label set emits no marker at all.
    fn labels(&mut self, labels: &Labels) {
        if labels.is_empty() {
            return;
        }
        self.push("LABELS");
        for (key, value) in labels {
            self.push(key);
            self.push(value);
        }
    }

    fn timestamp(&mut self, timestamp: Option<Timestamp>) {
        if let Some(ts) = timestamp {
            self.push("TIMESTAMP");
            self.push(ts);
        }
    }

    fn ts_filter(&mut self, timestamps: &[i64]) {
        if timestamps.is_empty() {
            return;
        }
        self.push("FILTER_BY_TS");
        for ts in timestamps {
            self.push(ts);
        }
    }

    /// Bounds are emitted together or not at all; `validate` has already
    /// rejected the half-open case.
    fn value_filter(&mut self, min: Option<f64>, max: Option<f64>) {
        if let (Some(min), Some(max)) = (min, max) {
            self.push("FILTER_BY_VALUE");
            self.push(min);
            self.push(max);
        }
    }

    fn count(&mut self, count: Option<u64>) {
        if let Some(n) = count {
            self.push("COUNT");
            self.push(n);
        }
    }

    fn align(&mut self, align: Option<Align>) {
        if let Some(align) = align {
            self.push("ALIGN");
            self.push(align);
        }
    }

    fn aggregation(&mut self, aggregation: Option<&Aggregation>) {
        if let Some(agg) = aggregation {
            self.push("AGGREGATION");
            self.push(agg.kind.wire_tag());
            self.push(agg.bucket_ms);
        }
    }

    fn label_selection(&mut self, with_labels: bool, selected: &[String]) {
        if with_labels {
            self.push("WITHLABELS");
        } else if !selected.is_empty() {
            self.push("SELECTED_LABELS");
            for label in selected {
                self.push(label);
            }
        }
    }

    /// Filter expressions are opaque text, passed through in document order.
    fn filters<S: AsRef<str>>(&mut self, exprs: &[S]) {
        self.push("FILTER");
        for expr in exprs {
            self.push(expr.as_ref());
        }
    }

    fn group_by(&mut self, group_by: Option<&str>, reduce: Option<&str>) {
        if let (Some(label), Some(reduce)) = (group_by, reduce) {
            self.push("GROUPBY");
            self.push(label);
            self.push("REDUCE");
            self.push(reduce.to_ascii_uppercase());
        }
    }

    fn into_args(self) -> Vec<String> {
        self.args
    }
}

/// Builds the token sequence for series creation.
pub fn create(key: &str, options: &CreateOptions) -> Vec<String> {
    let mut buf = ArgBuf::new();
    buf.push(key);
    buf.retention(options.retention_ms);
    buf.uncompressed(options.uncompressed);
    buf.chunk_size(options.chunk_size);
    buf.duplicate_policy("DUPLICATE_POLICY", options.duplicate_policy);
    buf.labels(&options.labels);
    buf.into_args()
}

/// Builds the token sequence for altering an existing series.
pub fn alter(key: &str, options: &AlterOptions) -> Vec<String> {
    let mut buf = ArgBuf::new();
    buf.push(key);
    buf.retention(options.retention_ms);
    buf.duplicate_policy("DUPLICATE_POLICY", options.duplicate_policy);
    buf.labels(&options.labels);
    buf.into_args()
}

/// Builds the token sequence for appending one sample.
pub fn add(key: &str, timestamp: Timestamp, value: f64, options: &AddOptions) -> Vec<String> {
    let mut buf = ArgBuf::new();
    buf.push(key);
    buf.push(timestamp);
    buf.push(value);
    buf.retention(options.retention_ms);
    buf.uncompressed(options.uncompressed);
    buf.chunk_size(options.chunk_size);
    buf.duplicate_policy("ON_DUPLICATE", options.on_duplicate);
    buf.labels(&options.labels);
    buf.into_args()
}

/// Builds the token sequence for a multi-series append.
///
/// Entries are flattened in document order; the reply carries one
/// timestamp per entry in the same order.
pub fn madd<K: AsRef<str>>(entries: &[(K, Timestamp, f64)]) -> Vec<String> {
    let mut buf = ArgBuf::new();
    for (key, timestamp, value) in entries {
        buf.push(key.as_ref());
        buf.push(timestamp);
        buf.push(value);
    }
    buf.into_args()
}

/// Builds the token sequence for the increment/decrement counter commands.
///
/// The two commands share one shape; only the command name differs.
pub fn counter(key: &str, value: f64, options: &CounterOptions) -> Vec<String> {
    let mut buf = ArgBuf::new();
    buf.push(key);
    buf.push(value);
    buf.timestamp(options.timestamp);
    buf.retention(options.retention_ms);
    buf.uncompressed(options.uncompressed);
    buf.chunk_size(options.chunk_size);
    buf.labels(&options.labels);
    buf.into_args()
}

/// Builds the token sequence for deleting a sample range.
pub fn del(key: &str, from: TimeBound, to: TimeBound) -> Vec<String> {
    let mut buf = ArgBuf::new();
    buf.push(key);
    buf.push(from);
    buf.push(to);
    buf.into_args()
}

/// Builds the token sequence for creating a compaction rule.
pub fn create_rule(source_key: &str, dest_key: &str, aggregation: &Aggregation) -> Vec<String> {
    let mut buf = ArgBuf::new();
    buf.push(source_key);
    buf.push(dest_key);
    buf.aggregation(Some(aggregation));
    buf.into_args()
}

/// Builds the token sequence for deleting a compaction rule.
pub fn delete_rule(source_key: &str, dest_key: &str) -> Vec<String> {
    let mut buf = ArgBuf::new();
    buf.push(source_key);
    buf.push(dest_key);
    buf.into_args()
}

/// Builds the token sequence for a single-series range query.
///
/// Shared by the ascending and descending commands.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the options fail their cross-field
/// checks; no token is emitted in that case.
pub fn range(
    key: &str,
    from: TimeBound,
    to: TimeBound,
    options: &RangeOptions,
) -> Result<Vec<String>, ValidationError> {
    options.validate()?;

    let mut buf = ArgBuf::new();
    buf.push(key);
    buf.push(from);
    buf.push(to);
    buf.ts_filter(&options.filter_by_ts);
    buf.value_filter(options.filter_by_min_value, options.filter_by_max_value);
    buf.count(options.count);
    buf.align(options.align);
    buf.aggregation(options.aggregation.as_ref());
    Ok(buf.into_args())
}

/// Builds the token sequence for a multi-series range query.
///
/// Shared by the ascending and descending commands. Filter expressions
/// are opaque `label=value` text, passed through unmodified.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the options fail their cross-field
/// checks; no token is emitted in that case.
pub fn multi_range<S: AsRef<str>>(
    from: TimeBound,
    to: TimeBound,
    filters: &[S],
    options: &MultiRangeOptions,
) -> Result<Vec<String>, ValidationError> {
    options.validate()?;

    let mut buf = ArgBuf::new();
    buf.push(from);
    buf.push(to);
    buf.ts_filter(&options.filter_by_ts);
    buf.value_filter(options.filter_by_min_value, options.filter_by_max_value);
    buf.count(options.count);
    buf.align(options.align);
    buf.aggregation(options.aggregation.as_ref());
    buf.label_selection(options.with_labels, &options.selected_labels);
    buf.filters(filters);
    buf.group_by(options.group_by.as_deref(), options.reduce.as_deref());
    Ok(buf.into_args())
}

/// Builds the token sequence for reading the last sample of a series.
pub fn get(key: &str) -> Vec<String> {
    vec![key.to_string()]
}

/// Builds the token sequence for the multi-series last-sample query.
pub fn mget<S: AsRef<str>>(filters: &[S], options: &MGetOptions) -> Vec<String> {
    let mut buf = ArgBuf::new();
    if options.with_labels {
        buf.push("WITHLABELS");
    }
    buf.filters(filters);
    buf.into_args()
}

/// Builds the token sequence for reading series metadata.
pub fn info(key: &str) -> Vec<String> {
    vec![key.to_string()]
}

/// Builds the token sequence for listing keys matched by filters.
pub fn query_index<S: AsRef<str>>(filters: &[S]) -> Vec<String> {
    filters.iter().map(|f| f.as_ref().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::AggregationType;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| (*t).to_string()).collect()
    }

    #[test]
    fn test_create_minimal() {
        assert_eq!(create("temp:1", &CreateOptions::default()), strings(&["temp:1"]));
    }

    #[test]
    fn test_create_full_option_order() {
        let opts = CreateOptions::default()
            .with_retention_ms(60_000)
            .with_uncompressed()
            .with_chunk_size(4096)
            .with_duplicate_policy(DuplicatePolicy::Last)
            .with_label("region", "eu")
            .with_label("host", "web1");

        // Group order is fixed: retention, compression flag, chunk size,
        // duplicate policy, labels.
        assert_eq!(
            create("temp:1", &opts),
            strings(&[
                "temp:1",
                "RETENTION",
                "60000",
                "UNCOMPRESSED",
                "CHUNK_SIZE",
                "4096",
                "DUPLICATE_POLICY",
                "last",
                "LABELS",
                "host",
                "web1",
                "region",
                "eu",
            ])
        );
    }

    #[test]
    fn test_empty_labels_emit_no_marker() {
        let args = create("k", &CreateOptions::default().with_retention_ms(5));
        assert!(!args.contains(&"LABELS".to_string()));
    }

    #[test]
    fn test_alter_uses_series_policy_marker() {
        let opts = AlterOptions {
            retention_ms: Some(10),
            duplicate_policy: Some(DuplicatePolicy::Block),
            labels: Labels::new(),
        };
        assert_eq!(
            alter("k", &opts),
            strings(&["k", "RETENTION", "10", "DUPLICATE_POLICY", "block"])
        );
    }

    #[test]
    fn test_add_uses_on_duplicate_marker() {
        let opts = AddOptions {
            on_duplicate: Some(DuplicatePolicy::Max),
            ..Default::default()
        };
        assert_eq!(
            add("k", Timestamp::Millis(1), 1.5, &opts),
            strings(&["k", "1", "1.5", "ON_DUPLICATE", "max"])
        );
    }

    #[test]
    fn test_add_auto_timestamp_sentinel() {
        assert_eq!(
            add("k", Timestamp::Auto, 2.0, &AddOptions::default()),
            strings(&["k", "*", "2"])
        );
    }

    #[test]
    fn test_madd_flattens_in_document_order() {
        let entries = [
            ("a", Timestamp::Millis(1), 5.0),
            ("a", Timestamp::Millis(2), 10.0),
            ("b", Timestamp::Auto, 15.0),
        ];
        assert_eq!(
            madd(&entries),
            strings(&["a", "1", "5", "a", "2", "10", "b", "*", "15"])
        );
    }

    #[test]
    fn test_counter_with_timestamp_group() {
        let opts = CounterOptions {
            timestamp: Some(Timestamp::Millis(7)),
            retention_ms: Some(100),
            ..Default::default()
        };
        assert_eq!(
            counter("hits", 1.0, &opts),
            strings(&["hits", "1", "TIMESTAMP", "7", "RETENTION", "100"])
        );
    }

    #[test]
    fn test_del_bounds() {
        assert_eq!(
            del("k", TimeBound::Earliest, TimeBound::Latest),
            strings(&["k", "-", "+"])
        );
        assert_eq!(
            del("k", 10.into(), 20.into()),
            strings(&["k", "10", "20"])
        );
    }

    #[test]
    fn test_create_rule_pair() {
        let agg = Aggregation::new(AggregationType::Avg, 60_000);
        assert_eq!(
            create_rule("src", "dst", &agg),
            strings(&["src", "dst", "AGGREGATION", "avg", "60000"])
        );
    }

    #[test]
    fn test_range_group_order() {
        let opts = RangeOptions::default()
            .with_ts_filter([5, 15])
            .with_value_filter(0.0, 100.0)
            .with_count(10)
            .with_align(Align::Start)
            .with_aggregation(Aggregation::new(AggregationType::Max, 1000));

        assert_eq!(
            range("k", 0.into(), 1000.into(), &opts).unwrap(),
            strings(&[
                "k",
                "0",
                "1000",
                "FILTER_BY_TS",
                "5",
                "15",
                "FILTER_BY_VALUE",
                "0",
                "100",
                "COUNT",
                "10",
                "ALIGN",
                "-",
                "AGGREGATION",
                "max",
                "1000",
            ])
        );
    }

    #[test]
    fn test_range_rejects_half_open_value_filter() {
        let opts = RangeOptions {
            filter_by_min_value: Some(1.0),
            ..Default::default()
        };
        let err = range("k", 0.into(), 10.into(), &opts).unwrap_err();
        assert!(matches!(err, ValidationError::HalfOpenValueFilter { .. }));
    }

    #[test]
    fn test_multi_range_trailing_groups() {
        let opts = MultiRangeOptions::default()
            .with_aggregation(Aggregation::new(AggregationType::Sum, 500))
            .with_labels()
            .with_group_by("region", "sum");

        assert_eq!(
            multi_range(TimeBound::Earliest, TimeBound::Latest, &["env=prod"], &opts).unwrap(),
            strings(&[
                "-",
                "+",
                "AGGREGATION",
                "sum",
                "500",
                "WITHLABELS",
                "FILTER",
                "env=prod",
                "GROUPBY",
                "region",
                "REDUCE",
                "SUM",
            ])
        );
    }

    #[test]
    fn test_multi_range_selected_labels() {
        let opts = MultiRangeOptions::default().with_selected_labels(["region", "host"]);
        assert_eq!(
            multi_range(TimeBound::At(0), TimeBound::At(10), &["a=b", "c=d"], &opts).unwrap(),
            strings(&[
                "0",
                "10",
                "SELECTED_LABELS",
                "region",
                "host",
                "FILTER",
                "a=b",
                "c=d",
            ])
        );
    }

    #[test]
    fn test_multi_range_rejects_conflicting_label_selection() {
        let opts = MultiRangeOptions::default()
            .with_labels()
            .with_selected_labels(["x"]);
        let err = multi_range(TimeBound::At(0), TimeBound::At(1), &["a=b"], &opts).unwrap_err();
        assert_eq!(err, ValidationError::ConflictingLabelSelection);
    }

    #[test]
    fn test_mget_with_labels() {
        let opts = MGetOptions { with_labels: true };
        assert_eq!(
            mget(&["env=prod"], &opts),
            strings(&["WITHLABELS", "FILTER", "env=prod"])
        );
        assert_eq!(
            mget(&["env=prod"], &MGetOptions::default()),
            strings(&["FILTER", "env=prod"])
        );
    }

    #[test]
    fn test_query_index_passthrough() {
        assert_eq!(
            query_index(&["env=prod", "role!=db"]),
            strings(&["env=prod", "role!=db"])
        );
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(Command::Create.wire_name(), "TS.CREATE");
        assert_eq!(Command::MRevRange.wire_name(), "TS.MREVRANGE");
        assert_eq!(Command::QueryIndex.wire_name(), "TS.QUERYINDEX");
        assert_eq!(Command::Del.wire_name(), "TS.DEL");
    }
}
