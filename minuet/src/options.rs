//! Option records and closed vocabularies for time-series commands.
//!
//! Every command family has an explicit options struct with each recognized
//! option named, typed, and defaulted. The server parses keyword-marked
//! option groups, so unrecognized names cannot be smuggled through: if a
//! field is not here, it is not part of the contract.
//!
//! Cross-field constraints (mutually exclusive options, required pairings)
//! are checked by the `validate` routines before any token is emitted.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Label set attached to a series: a name-to-value mapping.
///
/// Semantically unordered; `BTreeMap` keeps token emission deterministic
/// regardless of insertion order.
pub type Labels = BTreeMap<String, String>;

/// Aggregation function applied by the server over fixed-width buckets.
///
/// The vocabulary is closed: an unrecognized tag fails validation on the
/// client, before any request is issued.
///
/// # Examples
///
/// ```rust
/// use minuet::options::AggregationType;
///
/// let agg: AggregationType = "avg".parse()?;
/// assert_eq!(agg, AggregationType::Avg);
/// assert!("bogus".parse::<AggregationType>().is_err());
/// # Ok::<(), minuet::error::ValidationError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregationType {
    /// Arithmetic mean of the bucket.
    Avg,
    /// Sum of the bucket.
    Sum,
    /// Minimum of the bucket.
    Min,
    /// Maximum of the bucket.
    Max,
    /// Difference between maximum and minimum.
    Range,
    /// Number of samples in the bucket.
    Count,
    /// Earliest sample in the bucket.
    First,
    /// Latest sample in the bucket.
    Last,
    /// Population standard deviation.
    StdP,
    /// Sample standard deviation.
    StdS,
    /// Population variance.
    VarP,
    /// Sample variance.
    VarS,
}

impl AggregationType {
    /// Returns the wire tag the server expects for this aggregation.
    pub fn wire_tag(self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Range => "range",
            Self::Count => "count",
            Self::First => "first",
            Self::Last => "last",
            Self::StdP => "std.p",
            Self::StdS => "std.s",
            Self::VarP => "var.p",
            Self::VarS => "var.s",
        }
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_tag())
    }
}

impl FromStr for AggregationType {
    type Err = ValidationError;

    /// Parses a wire tag, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownAggregationType`] for tags outside
    /// the closed vocabulary.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "avg" => Ok(Self::Avg),
            "sum" => Ok(Self::Sum),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "range" => Ok(Self::Range),
            "count" => Ok(Self::Count),
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            "std.p" => Ok(Self::StdP),
            "std.s" => Ok(Self::StdS),
            "var.p" => Ok(Self::VarP),
            "var.s" => Ok(Self::VarS),
            _ => Err(ValidationError::UnknownAggregationType { tag: s.to_string() }),
        }
    }
}

/// An aggregation request: function plus bucket width.
///
/// The server requires the two as an inseparable pair; constructing them
/// together makes a lone bucket size or lone type unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Which aggregation function to apply.
    pub kind: AggregationType,
    /// Bucket width in milliseconds.
    pub bucket_ms: u64,
}

impl Aggregation {
    /// Creates an aggregation pair.
    pub fn new(kind: AggregationType, bucket_ms: u64) -> Self {
        Self { kind, bucket_ms }
    }
}

/// Conflict-resolution rule for a sample whose timestamp collides with an
/// existing one.
///
/// Applied server-side; the client only validates that the tag is one of
/// the five recognized values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Reject the colliding sample with an error.
    Block,
    /// Keep the existing value, ignore the new one.
    First,
    /// Override with the new value.
    Last,
    /// Keep the lower of the two values.
    Min,
    /// Keep the higher of the two values.
    Max,
}

impl DuplicatePolicy {
    /// Returns the wire tag the server expects for this policy.
    pub fn wire_tag(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::First => "first",
            Self::Last => "last",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_tag())
    }
}

impl FromStr for DuplicatePolicy {
    type Err = ValidationError;

    /// Parses a wire tag, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownDuplicatePolicy`] for tags outside
    /// the five recognized values.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            _ => Err(ValidationError::UnknownDuplicatePolicy { tag: s.to_string() }),
        }
    }
}

/// Timestamp argument for sample insertion.
///
/// `Auto` is the `*` sentinel: the server stamps the sample with its own
/// clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timestamp {
    /// Let the server choose the current time.
    Auto,
    /// Explicit timestamp in milliseconds since epoch.
    Millis(i64),
}

impl From<i64> for Timestamp {
    fn from(ms: i64) -> Self {
        Self::Millis(ms)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("*"),
            Self::Millis(ms) => write!(f, "{ms}"),
        }
    }
}

/// One end of a queried time range.
///
/// `Earliest`/`Latest` are the `-`/`+` sentinels for the minimum and
/// maximum possible timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeBound {
    /// The minimum possible timestamp (`-`).
    Earliest,
    /// The maximum possible timestamp (`+`).
    Latest,
    /// Explicit timestamp in milliseconds since epoch.
    At(i64),
}

impl From<i64> for TimeBound {
    fn from(ms: i64) -> Self {
        Self::At(ms)
    }
}

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Earliest => f.write_str("-"),
            Self::Latest => f.write_str("+"),
            Self::At(ms) => write!(f, "{ms}"),
        }
    }
}

/// Bucket alignment for range aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Align {
    /// Align buckets to the range start (`-`).
    Start,
    /// Align buckets to the range end (`+`).
    End,
    /// Align buckets to an explicit timestamp.
    At(i64),
}

impl fmt::Display for Align {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("-"),
            Self::End => f.write_str("+"),
            Self::At(ms) => write!(f, "{ms}"),
        }
    }
}

/// Options for creating a new series.
///
/// # Example
///
/// ```rust
/// use minuet::options::{CreateOptions, DuplicatePolicy};
///
/// let opts = CreateOptions::default()
///     .with_retention_ms(60_000)
///     .with_duplicate_policy(DuplicatePolicy::Last)
///     .with_label("sensor", "temp");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateOptions {
    /// Maximum sample age relative to the latest event time, in
    /// milliseconds. `None` (or 0) means the series is never trimmed.
    pub retention_ms: Option<u64>,

    /// Keep samples uncompressed. Compression is the server default.
    pub uncompressed: bool,

    /// Memory chunk size for the series, in bytes.
    pub chunk_size: Option<u64>,

    /// Conflict-resolution rule for colliding timestamps. `None` uses the
    /// server-wide default.
    pub duplicate_policy: Option<DuplicatePolicy>,

    /// Metadata labels. An empty set emits no `LABELS` group at all.
    pub labels: Labels,
}

impl CreateOptions {
    /// Sets the retention window in milliseconds.
    #[must_use]
    pub fn with_retention_ms(mut self, ms: u64) -> Self {
        self.retention_ms = Some(ms);
        self
    }

    /// Requests uncompressed storage.
    #[must_use]
    pub fn with_uncompressed(mut self) -> Self {
        self.uncompressed = true;
        self
    }

    /// Sets the chunk size in bytes.
    #[must_use]
    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = Some(bytes);
        self
    }

    /// Sets the duplicate policy.
    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = Some(policy);
        self
    }

    /// Adds one metadata label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Options for altering an existing series.
///
/// The alter command recognizes a subset of the creation options:
/// compression and chunk size are fixed at creation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlterOptions {
    /// New retention window in milliseconds.
    pub retention_ms: Option<u64>,

    /// New duplicate policy.
    pub duplicate_policy: Option<DuplicatePolicy>,

    /// Replacement label set. An empty set leaves labels untouched.
    pub labels: Labels,
}

/// Options for appending a sample.
///
/// Creation options are honored only when the series does not exist yet;
/// the duplicate policy here is the per-call `ON_DUPLICATE` override, not
/// the series-level setting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddOptions {
    /// Retention window if the series is created by this call.
    pub retention_ms: Option<u64>,

    /// Uncompressed storage if the series is created by this call.
    pub uncompressed: bool,

    /// Chunk size if the series is created by this call.
    pub chunk_size: Option<u64>,

    /// Per-call override of the series duplicate policy.
    pub on_duplicate: Option<DuplicatePolicy>,

    /// Labels if the series is created by this call.
    pub labels: Labels,
}

/// Options for the increment/decrement counter commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterOptions {
    /// Timestamp of the resulting sample. `None` lets the server use its
    /// own clock without emitting a `TIMESTAMP` group.
    pub timestamp: Option<Timestamp>,

    /// Retention window if the series is created by this call.
    pub retention_ms: Option<u64>,

    /// Uncompressed storage if the series is created by this call.
    pub uncompressed: bool,

    /// Chunk size if the series is created by this call.
    pub chunk_size: Option<u64>,

    /// Labels if the series is created by this call.
    pub labels: Labels,
}

/// Options for single-series range queries.
///
/// # Example
///
/// ```rust
/// use minuet::options::{Aggregation, AggregationType, RangeOptions};
///
/// let opts = RangeOptions::default()
///     .with_count(100)
///     .with_aggregation(Aggregation::new(AggregationType::Avg, 10_000));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeOptions {
    /// Restrict the result to samples at exactly these timestamps.
    pub filter_by_ts: Vec<i64>,

    /// Lower bound of the value filter. Must be paired with
    /// [`filter_by_max_value`](Self::filter_by_max_value).
    pub filter_by_min_value: Option<f64>,

    /// Upper bound of the value filter. Must be paired with
    /// [`filter_by_min_value`](Self::filter_by_min_value).
    pub filter_by_max_value: Option<f64>,

    /// Maximum number of returned samples.
    pub count: Option<u64>,

    /// Bucket alignment for the aggregation, if any.
    pub align: Option<Align>,

    /// Aggregation function and bucket width.
    pub aggregation: Option<Aggregation>,
}

impl RangeOptions {
    /// Sets the result count limit.
    #[must_use]
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Restricts the result to the given timestamps.
    #[must_use]
    pub fn with_ts_filter(mut self, timestamps: impl IntoIterator<Item = i64>) -> Self {
        self.filter_by_ts = timestamps.into_iter().collect();
        self
    }

    /// Restricts the result to samples whose value lies in `[min, max]`.
    #[must_use]
    pub fn with_value_filter(mut self, min: f64, max: f64) -> Self {
        self.filter_by_min_value = Some(min);
        self.filter_by_max_value = Some(max);
        self
    }

    /// Sets the bucket alignment.
    #[must_use]
    pub fn with_align(mut self, align: Align) -> Self {
        self.align = Some(align);
        self
    }

    /// Sets the aggregation function and bucket width.
    #[must_use]
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    /// Checks the cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::HalfOpenValueFilter`] if exactly one of
    /// the value-filter bounds is set.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.filter_by_min_value.is_some() != self.filter_by_max_value.is_some() {
            return Err(ValidationError::HalfOpenValueFilter {
                min: self.filter_by_min_value,
                max: self.filter_by_max_value,
            });
        }
        Ok(())
    }
}

/// Options for multi-series range queries.
///
/// Extends [`RangeOptions`] with label selection and grouping; the filter
/// expressions themselves are positional arguments of the query, not
/// options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiRangeOptions {
    /// Restrict the result to samples at exactly these timestamps.
    pub filter_by_ts: Vec<i64>,

    /// Lower bound of the value filter. Must be paired with
    /// [`filter_by_max_value`](Self::filter_by_max_value).
    pub filter_by_min_value: Option<f64>,

    /// Upper bound of the value filter. Must be paired with
    /// [`filter_by_min_value`](Self::filter_by_min_value).
    pub filter_by_max_value: Option<f64>,

    /// Maximum number of returned samples per series.
    pub count: Option<u64>,

    /// Bucket alignment for the aggregation, if any.
    pub align: Option<Align>,

    /// Aggregation function and bucket width.
    pub aggregation: Option<Aggregation>,

    /// Return every label of each matched series. Mutually exclusive with
    /// [`selected_labels`](Self::selected_labels).
    pub with_labels: bool,

    /// Return only these labels of each matched series. Mutually exclusive
    /// with [`with_labels`](Self::with_labels).
    pub selected_labels: Vec<String>,

    /// Group matched series by this label. Requires
    /// [`reduce`](Self::reduce).
    pub group_by: Option<String>,

    /// Reduce function applied across each group; upper-cased at emission.
    /// Requires [`group_by`](Self::group_by).
    pub reduce: Option<String>,
}

impl MultiRangeOptions {
    /// Sets the per-series result count limit.
    #[must_use]
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Restricts the result to the given timestamps.
    #[must_use]
    pub fn with_ts_filter(mut self, timestamps: impl IntoIterator<Item = i64>) -> Self {
        self.filter_by_ts = timestamps.into_iter().collect();
        self
    }

    /// Restricts the result to samples whose value lies in `[min, max]`.
    #[must_use]
    pub fn with_value_filter(mut self, min: f64, max: f64) -> Self {
        self.filter_by_min_value = Some(min);
        self.filter_by_max_value = Some(max);
        self
    }

    /// Sets the bucket alignment.
    #[must_use]
    pub fn with_align(mut self, align: Align) -> Self {
        self.align = Some(align);
        self
    }

    /// Sets the aggregation function and bucket width.
    #[must_use]
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    /// Requests every label of each matched series.
    #[must_use]
    pub fn with_labels(mut self) -> Self {
        self.with_labels = true;
        self
    }

    /// Requests only the named labels of each matched series.
    #[must_use]
    pub fn with_selected_labels(
        mut self,
        labels: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.selected_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Groups matched series by a label and reduces each group.
    #[must_use]
    pub fn with_group_by(
        mut self,
        label: impl Into<String>,
        reduce: impl Into<String>,
    ) -> Self {
        self.group_by = Some(label.into());
        self.reduce = Some(reduce.into());
        self
    }

    /// Checks the cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if both label-selection modes are
    /// requested, the value filter has only one bound, or only one half of
    /// the group-by/reduce pair is set.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.with_labels && !self.selected_labels.is_empty() {
            return Err(ValidationError::ConflictingLabelSelection);
        }

        if self.filter_by_min_value.is_some() != self.filter_by_max_value.is_some() {
            return Err(ValidationError::HalfOpenValueFilter {
                min: self.filter_by_min_value,
                max: self.filter_by_max_value,
            });
        }

        if self.group_by.is_some() != self.reduce.is_some() {
            return Err(ValidationError::IncompleteGroupBy {
                group_by: self.group_by.clone(),
                reduce: self.reduce.clone(),
            });
        }

        Ok(())
    }
}

/// Options for the multi-series last-sample query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MGetOptions {
    /// Return every label of each matched series.
    pub with_labels: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregation_type_round_trip() {
        let tags = [
            "avg", "sum", "min", "max", "range", "count", "first", "last", "std.p", "std.s",
            "var.p", "var.s",
        ];
        for tag in tags {
            let parsed: AggregationType = tag.parse().unwrap();
            assert_eq!(parsed.wire_tag(), tag);
        }

        // Case-insensitive parse (the server echoes upper-case tags)
        assert_eq!("AVG".parse::<AggregationType>().unwrap(), AggregationType::Avg);
        assert_eq!("Std.P".parse::<AggregationType>().unwrap(), AggregationType::StdP);
    }

    #[test]
    fn test_aggregation_type_rejects_unknown() {
        let err = "bogus".parse::<AggregationType>().unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownAggregationType {
                tag: "bogus".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_policy_round_trip() {
        for tag in ["block", "first", "last", "min", "max"] {
            let parsed: DuplicatePolicy = tag.parse().unwrap();
            assert_eq!(parsed.wire_tag(), tag);
        }
        assert!("upsert".parse::<DuplicatePolicy>().is_err());
    }

    #[test]
    fn test_sentinel_display() {
        assert_eq!(Timestamp::Auto.to_string(), "*");
        assert_eq!(Timestamp::Millis(1500).to_string(), "1500");
        assert_eq!(TimeBound::Earliest.to_string(), "-");
        assert_eq!(TimeBound::Latest.to_string(), "+");
        assert_eq!(TimeBound::At(42).to_string(), "42");
        assert_eq!(Align::Start.to_string(), "-");
        assert_eq!(Align::End.to_string(), "+");
        assert_eq!(Align::At(1000).to_string(), "1000");
    }

    #[test]
    fn test_range_options_half_open_filter() {
        let opts = RangeOptions {
            filter_by_min_value: Some(1.0),
            ..Default::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(ValidationError::HalfOpenValueFilter { .. })
        ));

        let opts = RangeOptions {
            filter_by_max_value: Some(9.5),
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let opts = RangeOptions::default().with_value_filter(1.0, 9.5);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_multi_range_options_label_selection_conflict() {
        let opts = MultiRangeOptions::default()
            .with_labels()
            .with_selected_labels(["region"]);
        assert_eq!(
            opts.validate(),
            Err(ValidationError::ConflictingLabelSelection)
        );

        assert!(MultiRangeOptions::default().with_labels().validate().is_ok());
        assert!(
            MultiRangeOptions::default()
                .with_selected_labels(["region"])
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_multi_range_options_incomplete_group_by() {
        let opts = MultiRangeOptions {
            group_by: Some("region".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(ValidationError::IncompleteGroupBy { .. })
        ));

        let opts = MultiRangeOptions {
            reduce: Some("sum".to_string()),
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let opts = MultiRangeOptions::default().with_group_by("region", "sum");
        assert!(opts.validate().is_ok());
    }
}
