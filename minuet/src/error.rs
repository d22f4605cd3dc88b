//! Error types for the minuet time-series client.

use thiserror::Error;

/// The main error type for all minuet operations.
///
/// Every fallible client call resolves to exactly one of three concerns:
/// the caller supplied an invalid option combination (caught before any
/// network interaction), the server's reply did not have the shape the
/// command's decoder expects, or the server itself reported a failure.
#[derive(Error, Debug)]
pub enum MinuetError {
    /// Client-side rejection of a malformed option combination.
    ///
    /// Raised before any token is emitted or any request is issued.
    /// Always recoverable by correcting the arguments; never retried.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A reply did not match the shape registered for its command.
    ///
    /// Indicates a protocol or version mismatch between client and server.
    /// Never silently swallowed and never converted to a default value.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The server reported a failure (unknown key, blocked duplicate, ...).
    ///
    /// The server's error text is passed through unmodified; this layer
    /// does not reinterpret or retry it.
    #[error("server error: {0}")]
    Server(#[from] redis::RedisError),
}

/// Errors raised while validating command options, before token emission.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// An aggregation type tag outside the closed vocabulary.
    #[error(
        "unknown aggregation type '{tag}' (expected one of: avg, sum, min, max, \
         range, count, first, last, std.p, std.s, var.p, var.s)"
    )]
    UnknownAggregationType {
        /// The tag that failed to parse.
        tag: String,
    },

    /// A duplicate policy tag outside the five recognized values.
    #[error("unknown duplicate policy '{tag}' (expected one of: block, first, last, min, max)")]
    UnknownDuplicatePolicy {
        /// The tag that failed to parse.
        tag: String,
    },

    /// Both `with_labels` and `selected_labels` were requested.
    #[error("with_labels and selected_labels are mutually exclusive")]
    ConflictingLabelSelection,

    /// A value-range filter was given with only one bound.
    #[error("value filter requires both bounds: min={min:?}, max={max:?}")]
    HalfOpenValueFilter {
        /// The lower bound, if supplied.
        min: Option<f64>,
        /// The upper bound, if supplied.
        max: Option<f64>,
    },

    /// A group-by field was given without a reduce function, or vice versa.
    #[error("group_by and reduce must be given together: group_by={group_by:?}, reduce={reduce:?}")]
    IncompleteGroupBy {
        /// The grouping label, if supplied.
        group_by: Option<String>,
        /// The reduce function tag, if supplied.
        reduce: Option<String>,
    },
}

/// Errors raised while decoding a server reply into a typed result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The reply's overall shape does not match the command's contract.
    #[error("unexpected reply shape for {command}: expected {expected}, got {actual}")]
    UnexpectedShape {
        /// Wire name of the command whose reply failed to decode.
        command: &'static str,
        /// Description of the shape the decoder expected.
        expected: &'static str,
        /// Description of the value actually received.
        actual: String,
    },

    /// A value that must be numeric could not be coerced.
    #[error("non-numeric value in {command} reply: {text:?}")]
    NotANumber {
        /// Wire name of the command whose reply failed to decode.
        command: &'static str,
        /// The text that failed numeric coercion.
        text: String,
    },

    /// A tag field in the reply is outside its closed vocabulary.
    #[error("unrecognized {field} tag {tag:?} in {command} reply")]
    UnknownTag {
        /// Wire name of the command whose reply failed to decode.
        command: &'static str,
        /// Which reply field carried the tag.
        field: &'static str,
        /// The unrecognized tag text.
        tag: String,
    },
}

/// Type alias for `Result<T, MinuetError>`.
pub type Result<T> = std::result::Result<T, MinuetError>;
