//! Synchronous client over a transport capability.
//!
//! The client owns protocol logic only: it builds tokens, hands them to a
//! [`Transport`], and decodes the reply. It holds the transport by
//! composition rather than extending a connection type, so any
//! request/response primitive can sit behind it — a real connection, a
//! mock in tests, or a recording proxy.
//!
//! Every call is stateless: build, execute, decode, return. The only
//! shared state is the compile-time command-to-decoder routing in
//! [`reply::decode`], so a client is safe to rebuild or share freely.
//!
//! # Example
//!
//! ```rust,no_run
//! use minuet::client::Client;
//! use minuet::options::{Aggregation, AggregationType, CreateOptions, RangeOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let redis = redis::Client::open("redis://127.0.0.1:6379")?;
//! let mut client = Client::new(redis.get_connection()?);
//!
//! client.create(
//!     "sensor:temp",
//!     &CreateOptions::default()
//!         .with_retention_ms(60_000)
//!         .with_label("room", "lab"),
//! )?;
//! client.add("sensor:temp", 1_589_636_004_000, 21.5, &Default::default())?;
//!
//! let samples = client.range(
//!     "sensor:temp",
//!     0,
//!     1_589_636_010_000,
//!     &RangeOptions::default()
//!         .with_aggregation(Aggregation::new(AggregationType::Avg, 1000)),
//! )?;
//! for sample in samples {
//!     println!("{}: {}", sample.timestamp, sample.value);
//! }
//! # Ok(())
//! # }
//! ```

use redis::{RedisResult, Value};
use tracing::trace;

use crate::command::{self, Command};
use crate::error::{DecodeError, Result};
use crate::options::{
    AddOptions, Aggregation, AlterOptions, CounterOptions, CreateOptions, MGetOptions,
    MultiRangeOptions, RangeOptions, TimeBound, Timestamp,
};
use crate::reply::{self, Reply, Sample, SeriesInfo, SeriesLast, SeriesRange};

/// A request/response primitive against the remote store.
///
/// The one operation this layer needs from its collaborator: send a
/// command name plus ordered argument tokens, get the raw reply back.
/// Connection lifecycle, pooling, authentication, retries, and timeouts
/// all live behind this seam.
pub trait Transport {
    /// Executes one command and returns its raw reply.
    ///
    /// # Errors
    ///
    /// Returns the transport's own error, including server-reported
    /// failures passed through unmodified.
    fn execute(&mut self, name: &str, args: &[String]) -> RedisResult<Value>;

    /// Executes a batch of commands and returns one reply per command, in
    /// submission order.
    ///
    /// The default implementation issues the commands one at a time;
    /// transports with a real pipelining primitive should override it.
    ///
    /// # Errors
    ///
    /// Returns the transport's own error.
    fn execute_batch(&mut self, commands: &[(&str, &[String])]) -> RedisResult<Vec<Value>> {
        commands
            .iter()
            .map(|&(name, args)| self.execute(name, args))
            .collect()
    }
}

impl Transport for redis::Connection {
    fn execute(&mut self, name: &str, args: &[String]) -> RedisResult<Value> {
        let mut cmd = redis::cmd(name);
        for arg in args {
            cmd.arg(arg);
        }
        cmd.query(self)
    }

    fn execute_batch(&mut self, commands: &[(&str, &[String])]) -> RedisResult<Vec<Value>> {
        let mut pipe = redis::pipe();
        for &(name, args) in commands {
            pipe.cmd(name);
            for arg in args {
                pipe.arg(arg);
            }
        }
        pipe.query(self)
    }
}

/// Typed time-series client over a [`Transport`].
///
/// One method per command in the vocabulary. Each call validates its
/// options, builds the token sequence, executes it, and decodes the reply
/// into the command's typed result.
#[derive(Debug)]
pub struct Client<T> {
    transport: T,
}

impl<T: Transport> Client<T> {
    /// Creates a client over the given transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Consumes the client and returns the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// One build/execute/decode turn.
    fn call(&mut self, command: Command, args: Vec<String>) -> Result<Reply> {
        trace!(command = command.wire_name(), argc = args.len(), "issuing command");
        let value = self.transport.execute(command.wire_name(), &args)?;
        Ok(reply::decode(command, &value)?)
    }

    /// Creates a new series.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the command or the reply
    /// cannot be decoded.
    pub fn create(&mut self, key: &str, options: &CreateOptions) -> Result<bool> {
        Ok(self
            .call(Command::Create, command::create(key, options))?
            .into_ack(Command::Create)?)
    }

    /// Updates retention, labels, or duplicate policy of a series.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the command or the reply
    /// cannot be decoded.
    pub fn alter(&mut self, key: &str, options: &AlterOptions) -> Result<bool> {
        Ok(self
            .call(Command::Alter, command::alter(key, options))?
            .into_ack(Command::Alter)?)
    }

    /// Appends a sample and returns its insertion timestamp.
    ///
    /// With [`Timestamp::Auto`] the server stamps the sample with its own
    /// clock and the returned timestamp is the one it chose.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the sample (for example a
    /// timestamp collision under a blocking duplicate policy) or the reply
    /// cannot be decoded.
    pub fn add(
        &mut self,
        key: &str,
        timestamp: impl Into<Timestamp>,
        value: f64,
        options: &AddOptions,
    ) -> Result<i64> {
        Ok(self
            .call(Command::Add, command::add(key, timestamp.into(), value, options))?
            .into_timestamp(Command::Add)?)
    }

    /// Appends samples to several series and returns one insertion
    /// timestamp per entry, in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the command or the reply
    /// cannot be decoded.
    pub fn multi_add<K: AsRef<str>>(&mut self, entries: &[(K, Timestamp, f64)]) -> Result<Vec<i64>> {
        Ok(self
            .call(Command::MAdd, command::madd(entries))?
            .into_timestamps(Command::MAdd)?)
    }

    /// Increments the latest sample and returns the resulting timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the command or the reply
    /// cannot be decoded.
    pub fn incr_by(&mut self, key: &str, value: f64, options: &CounterOptions) -> Result<i64> {
        Ok(self
            .call(Command::IncrBy, command::counter(key, value, options))?
            .into_timestamp(Command::IncrBy)?)
    }

    /// Decrements the latest sample and returns the resulting timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the command or the reply
    /// cannot be decoded.
    pub fn decr_by(&mut self, key: &str, value: f64, options: &CounterOptions) -> Result<i64> {
        Ok(self
            .call(Command::DecrBy, command::counter(key, value, options))?
            .into_timestamp(Command::DecrBy)?)
    }

    /// Deletes all samples in a time range and returns how many were
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the command or the reply
    /// cannot be decoded.
    pub fn delete_range(
        &mut self,
        key: &str,
        from: impl Into<TimeBound>,
        to: impl Into<TimeBound>,
    ) -> Result<u64> {
        Ok(self
            .call(Command::Del, command::del(key, from.into(), to.into()))?
            .into_deleted(Command::Del)?)
    }

    /// Creates a compaction rule from `source_key` into `dest_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the command or the reply
    /// cannot be decoded.
    pub fn create_rule(
        &mut self,
        source_key: &str,
        dest_key: &str,
        aggregation: Aggregation,
    ) -> Result<bool> {
        Ok(self
            .call(
                Command::CreateRule,
                command::create_rule(source_key, dest_key, &aggregation),
            )?
            .into_ack(Command::CreateRule)?)
    }

    /// Deletes a compaction rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the command or the reply
    /// cannot be decoded.
    pub fn delete_rule(&mut self, source_key: &str, dest_key: &str) -> Result<bool> {
        Ok(self
            .call(Command::DeleteRule, command::delete_rule(source_key, dest_key))?
            .into_ack(Command::DeleteRule)?)
    }

    /// Queries a range, ascending by timestamp.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request when the options are
    /// inconsistent, or a server/decode error afterwards.
    pub fn range(
        &mut self,
        key: &str,
        from: impl Into<TimeBound>,
        to: impl Into<TimeBound>,
        options: &RangeOptions,
    ) -> Result<Vec<Sample>> {
        let args = command::range(key, from.into(), to.into(), options)?;
        Ok(self.call(Command::Range, args)?.into_samples(Command::Range)?)
    }

    /// Queries a range, descending by timestamp.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request when the options are
    /// inconsistent, or a server/decode error afterwards.
    pub fn rev_range(
        &mut self,
        key: &str,
        from: impl Into<TimeBound>,
        to: impl Into<TimeBound>,
        options: &RangeOptions,
    ) -> Result<Vec<Sample>> {
        let args = command::range(key, from.into(), to.into(), options)?;
        Ok(self
            .call(Command::RevRange, args)?
            .into_samples(Command::RevRange)?)
    }

    /// Queries a range across all series matched by `filters`, ascending.
    ///
    /// Entries arrive in server reply order and are never re-sorted here.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request when the options are
    /// inconsistent, or a server/decode error afterwards.
    pub fn multi_range<S: AsRef<str>>(
        &mut self,
        from: impl Into<TimeBound>,
        to: impl Into<TimeBound>,
        filters: &[S],
        options: &MultiRangeOptions,
    ) -> Result<Vec<SeriesRange>> {
        let args = command::multi_range(from.into(), to.into(), filters, options)?;
        Ok(self
            .call(Command::MRange, args)?
            .into_multi_range(Command::MRange)?)
    }

    /// Queries a range across all series matched by `filters`, descending.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request when the options are
    /// inconsistent, or a server/decode error afterwards.
    pub fn multi_rev_range<S: AsRef<str>>(
        &mut self,
        from: impl Into<TimeBound>,
        to: impl Into<TimeBound>,
        filters: &[S],
        options: &MultiRangeOptions,
    ) -> Result<Vec<SeriesRange>> {
        let args = command::multi_range(from.into(), to.into(), filters, options)?;
        Ok(self
            .call(Command::MRevRange, args)?
            .into_multi_range(Command::MRevRange)?)
    }

    /// Reads the last sample of a series, or `None` if it has no samples.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the command or the reply
    /// cannot be decoded.
    pub fn get(&mut self, key: &str) -> Result<Option<Sample>> {
        Ok(self
            .call(Command::Get, command::get(key))?
            .into_last_sample(Command::Get)?)
    }

    /// Reads the last sample of every series matched by `filters`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the command or the reply
    /// cannot be decoded.
    pub fn multi_get<S: AsRef<str>>(
        &mut self,
        filters: &[S],
        options: &MGetOptions,
    ) -> Result<Vec<SeriesLast>> {
        Ok(self
            .call(Command::MGet, command::mget(filters, options))?
            .into_multi_get(Command::MGet)?)
    }

    /// Reads series metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the command or the reply
    /// cannot be decoded.
    pub fn info(&mut self, key: &str) -> Result<SeriesInfo> {
        Ok(self
            .call(Command::Info, command::info(key))?
            .into_info(Command::Info)?)
    }

    /// Lists the keys of all series matched by `filters`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the command or the reply
    /// cannot be decoded.
    pub fn query_index<S: AsRef<str>>(&mut self, filters: &[S]) -> Result<Vec<String>> {
        Ok(self
            .call(Command::QueryIndex, command::query_index(filters))?
            .into_keys(Command::QueryIndex)?)
    }
}

/// A queue of validated commands for batched submission.
///
/// Commands are validated and token-built as they are queued, so a
/// malformed option combination fails at queue time, before anything is
/// sent. [`query`](Self::query) submits the whole batch through the
/// transport and decodes each reply with the decoder matching its
/// command, in submission order.
///
/// # Example
///
/// ```rust,no_run
/// use minuet::client::Pipeline;
/// use minuet::options::CreateOptions;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let redis = redis::Client::open("redis://127.0.0.1:6379")?;
/// let mut con = redis.get_connection()?;
///
/// let mut pipe = Pipeline::new();
/// pipe.create("sensor:temp", &CreateOptions::default());
/// pipe.add("sensor:temp", 1, 21.5, &Default::default());
/// pipe.add("sensor:temp", 2, 21.7, &Default::default());
///
/// let replies = pipe.query(&mut con)?;
/// assert_eq!(replies.len(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Pipeline {
    pub(crate) queued: Vec<(Command, Vec<String>)>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    /// Whether the pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Drops all queued commands.
    pub fn clear(&mut self) {
        self.queued.clear();
    }

    fn queue(&mut self, command: Command, args: Vec<String>) -> &mut Self {
        self.queued.push((command, args));
        self
    }

    /// Queues a series creation.
    pub fn create(&mut self, key: &str, options: &CreateOptions) -> &mut Self {
        self.queue(Command::Create, command::create(key, options))
    }

    /// Queues a series alteration.
    pub fn alter(&mut self, key: &str, options: &AlterOptions) -> &mut Self {
        self.queue(Command::Alter, command::alter(key, options))
    }

    /// Queues a sample append.
    pub fn add(
        &mut self,
        key: &str,
        timestamp: impl Into<Timestamp>,
        value: f64,
        options: &AddOptions,
    ) -> &mut Self {
        self.queue(Command::Add, command::add(key, timestamp.into(), value, options))
    }

    /// Queues a multi-series append.
    pub fn multi_add<K: AsRef<str>>(&mut self, entries: &[(K, Timestamp, f64)]) -> &mut Self {
        self.queue(Command::MAdd, command::madd(entries))
    }

    /// Queues a counter increment.
    pub fn incr_by(&mut self, key: &str, value: f64, options: &CounterOptions) -> &mut Self {
        self.queue(Command::IncrBy, command::counter(key, value, options))
    }

    /// Queues a counter decrement.
    pub fn decr_by(&mut self, key: &str, value: f64, options: &CounterOptions) -> &mut Self {
        self.queue(Command::DecrBy, command::counter(key, value, options))
    }

    /// Queues a range deletion.
    pub fn delete_range(
        &mut self,
        key: &str,
        from: impl Into<TimeBound>,
        to: impl Into<TimeBound>,
    ) -> &mut Self {
        self.queue(Command::Del, command::del(key, from.into(), to.into()))
    }

    /// Queues a compaction-rule creation.
    pub fn create_rule(
        &mut self,
        source_key: &str,
        dest_key: &str,
        aggregation: Aggregation,
    ) -> &mut Self {
        self.queue(
            Command::CreateRule,
            command::create_rule(source_key, dest_key, &aggregation),
        )
    }

    /// Queues a compaction-rule deletion.
    pub fn delete_rule(&mut self, source_key: &str, dest_key: &str) -> &mut Self {
        self.queue(Command::DeleteRule, command::delete_rule(source_key, dest_key))
    }

    /// Queues an ascending range query.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::ValidationError`] if the options are
    /// inconsistent; nothing is queued in that case.
    pub fn range(
        &mut self,
        key: &str,
        from: impl Into<TimeBound>,
        to: impl Into<TimeBound>,
        options: &RangeOptions,
    ) -> Result<&mut Self> {
        let args = command::range(key, from.into(), to.into(), options)?;
        Ok(self.queue(Command::Range, args))
    }

    /// Queues a descending range query.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::ValidationError`] if the options are
    /// inconsistent; nothing is queued in that case.
    pub fn rev_range(
        &mut self,
        key: &str,
        from: impl Into<TimeBound>,
        to: impl Into<TimeBound>,
        options: &RangeOptions,
    ) -> Result<&mut Self> {
        let args = command::range(key, from.into(), to.into(), options)?;
        Ok(self.queue(Command::RevRange, args))
    }

    /// Queues an ascending multi-series range query.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::ValidationError`] if the options are
    /// inconsistent; nothing is queued in that case.
    pub fn multi_range<S: AsRef<str>>(
        &mut self,
        from: impl Into<TimeBound>,
        to: impl Into<TimeBound>,
        filters: &[S],
        options: &MultiRangeOptions,
    ) -> Result<&mut Self> {
        let args = command::multi_range(from.into(), to.into(), filters, options)?;
        Ok(self.queue(Command::MRange, args))
    }

    /// Queues a descending multi-series range query.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::ValidationError`] if the options are
    /// inconsistent; nothing is queued in that case.
    pub fn multi_rev_range<S: AsRef<str>>(
        &mut self,
        from: impl Into<TimeBound>,
        to: impl Into<TimeBound>,
        filters: &[S],
        options: &MultiRangeOptions,
    ) -> Result<&mut Self> {
        let args = command::multi_range(from.into(), to.into(), filters, options)?;
        Ok(self.queue(Command::MRevRange, args))
    }

    /// Queues a last-sample read.
    pub fn get(&mut self, key: &str) -> &mut Self {
        self.queue(Command::Get, command::get(key))
    }

    /// Queues a multi-series last-sample read.
    pub fn multi_get<S: AsRef<str>>(&mut self, filters: &[S], options: &MGetOptions) -> &mut Self {
        self.queue(Command::MGet, command::mget(filters, options))
    }

    /// Queues a metadata read.
    pub fn info(&mut self, key: &str) -> &mut Self {
        self.queue(Command::Info, command::info(key))
    }

    /// Queues a key listing.
    pub fn query_index<S: AsRef<str>>(&mut self, filters: &[S]) -> &mut Self {
        self.queue(Command::QueryIndex, command::query_index(filters))
    }

    /// Submits the batch and decodes one reply per queued command, in
    /// submission order.
    ///
    /// The queue is left intact; call [`clear`](Self::clear) to reuse the
    /// pipeline for a different batch.
    ///
    /// # Errors
    ///
    /// Returns a server error from the transport, or a decode error if a
    /// reply does not match its command (including a reply count different
    /// from the submission count).
    pub fn query<T: Transport>(&self, transport: &mut T) -> Result<Vec<Reply>> {
        trace!(commands = self.queued.len(), "issuing pipeline");
        let wire: Vec<(&str, &[String])> = self
            .queued
            .iter()
            .map(|(command, args)| (command.wire_name(), args.as_slice()))
            .collect();
        let values = transport.execute_batch(&wire)?;

        if values.len() != self.queued.len() {
            return Err(DecodeError::UnexpectedShape {
                command: "pipeline",
                expected: "one reply per queued command",
                actual: format!("{} replies for {} commands", values.len(), self.queued.len()),
            }
            .into());
        }

        self.queued
            .iter()
            .zip(&values)
            .map(|((command, _), value)| Ok(reply::decode(*command, value)?))
            .collect()
    }
}
