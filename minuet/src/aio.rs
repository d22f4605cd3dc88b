//! Async client variant over an async transport capability.
//!
//! Builders and decoders are the same pure functions the synchronous
//! client uses; the only difference is the single suspend point awaiting
//! the transport's reply. This module is only available when the `aio`
//! feature is enabled.
//!
//! # Example
//!
//! ```rust,no_run
//! use minuet::aio::AsyncClient;
//! use minuet::options::CreateOptions;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let redis = redis::Client::open("redis://127.0.0.1:6379")?;
//! let con = redis.get_multiplexed_async_connection().await?;
//! let mut client = AsyncClient::new(con);
//!
//! client.create("sensor:temp", &CreateOptions::default()).await?;
//! let ts = client.add("sensor:temp", 1, 21.5, &Default::default()).await?;
//! # Ok(())
//! # }
//! ```

use redis::{RedisResult, Value};
use tracing::trace;

use crate::client::Pipeline;
use crate::command::{self, Command};
use crate::error::{DecodeError, Result};
use crate::options::{
    AddOptions, Aggregation, AlterOptions, CounterOptions, CreateOptions, MGetOptions,
    MultiRangeOptions, RangeOptions, TimeBound, Timestamp,
};
use crate::reply::{self, Reply, Sample, SeriesInfo, SeriesLast, SeriesRange};

/// An async request/response primitive against the remote store.
///
/// The async twin of [`Transport`](crate::client::Transport): one
/// operation, one suspend point, everything else behind the seam.
#[allow(async_fn_in_trait)]
pub trait AsyncTransport {
    /// Executes one command and returns its raw reply.
    ///
    /// # Errors
    ///
    /// Returns the transport's own error, including server-reported
    /// failures passed through unmodified.
    async fn execute(&mut self, name: &str, args: &[String]) -> RedisResult<Value>;

    /// Executes a batch of commands and returns one reply per command, in
    /// submission order.
    ///
    /// The default implementation issues the commands one at a time;
    /// transports with a real pipelining primitive should override it.
    ///
    /// # Errors
    ///
    /// Returns the transport's own error.
    async fn execute_batch(&mut self, commands: &[(&str, &[String])]) -> RedisResult<Vec<Value>> {
        let mut replies = Vec::with_capacity(commands.len());
        for &(name, args) in commands {
            replies.push(self.execute(name, args).await?);
        }
        Ok(replies)
    }
}

impl AsyncTransport for redis::aio::MultiplexedConnection {
    async fn execute(&mut self, name: &str, args: &[String]) -> RedisResult<Value> {
        let mut cmd = redis::cmd(name);
        for arg in args {
            cmd.arg(arg);
        }
        cmd.query_async(self).await
    }

    async fn execute_batch(&mut self, commands: &[(&str, &[String])]) -> RedisResult<Vec<Value>> {
        let mut pipe = redis::pipe();
        for &(name, args) in commands {
            pipe.cmd(name);
            for arg in args {
                pipe.arg(arg);
            }
        }
        pipe.query_async(self).await
    }
}

/// Typed time-series client over an [`AsyncTransport`].
///
/// The surface mirrors [`Client`](crate::client::Client) method for
/// method; see the synchronous documentation for per-command details.
#[derive(Debug)]
pub struct AsyncClient<T> {
    transport: T,
}

impl<T: AsyncTransport> AsyncClient<T> {
    /// Creates a client over the given transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Consumes the client and returns the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    async fn call(&mut self, command: Command, args: Vec<String>) -> Result<Reply> {
        trace!(command = command.wire_name(), argc = args.len(), "issuing command");
        let value = self.transport.execute(command.wire_name(), &args).await?;
        Ok(reply::decode(command, &value)?)
    }

    /// Async variant of [`Client::create`](crate::client::Client::create).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn create(&mut self, key: &str, options: &CreateOptions) -> Result<bool> {
        Ok(self
            .call(Command::Create, command::create(key, options))
            .await?
            .into_ack(Command::Create)?)
    }

    /// Async variant of [`Client::alter`](crate::client::Client::alter).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn alter(&mut self, key: &str, options: &AlterOptions) -> Result<bool> {
        Ok(self
            .call(Command::Alter, command::alter(key, options))
            .await?
            .into_ack(Command::Alter)?)
    }

    /// Async variant of [`Client::add`](crate::client::Client::add).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn add(
        &mut self,
        key: &str,
        timestamp: impl Into<Timestamp>,
        value: f64,
        options: &AddOptions,
    ) -> Result<i64> {
        Ok(self
            .call(Command::Add, command::add(key, timestamp.into(), value, options))
            .await?
            .into_timestamp(Command::Add)?)
    }

    /// Async variant of
    /// [`Client::multi_add`](crate::client::Client::multi_add).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn multi_add<K: AsRef<str>>(
        &mut self,
        entries: &[(K, Timestamp, f64)],
    ) -> Result<Vec<i64>> {
        Ok(self
            .call(Command::MAdd, command::madd(entries))
            .await?
            .into_timestamps(Command::MAdd)?)
    }

    /// Async variant of [`Client::incr_by`](crate::client::Client::incr_by).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn incr_by(
        &mut self,
        key: &str,
        value: f64,
        options: &CounterOptions,
    ) -> Result<i64> {
        Ok(self
            .call(Command::IncrBy, command::counter(key, value, options))
            .await?
            .into_timestamp(Command::IncrBy)?)
    }

    /// Async variant of [`Client::decr_by`](crate::client::Client::decr_by).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn decr_by(
        &mut self,
        key: &str,
        value: f64,
        options: &CounterOptions,
    ) -> Result<i64> {
        Ok(self
            .call(Command::DecrBy, command::counter(key, value, options))
            .await?
            .into_timestamp(Command::DecrBy)?)
    }

    /// Async variant of
    /// [`Client::delete_range`](crate::client::Client::delete_range).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn delete_range(
        &mut self,
        key: &str,
        from: impl Into<TimeBound>,
        to: impl Into<TimeBound>,
    ) -> Result<u64> {
        Ok(self
            .call(Command::Del, command::del(key, from.into(), to.into()))
            .await?
            .into_deleted(Command::Del)?)
    }

    /// Async variant of
    /// [`Client::create_rule`](crate::client::Client::create_rule).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn create_rule(
        &mut self,
        source_key: &str,
        dest_key: &str,
        aggregation: Aggregation,
    ) -> Result<bool> {
        Ok(self
            .call(
                Command::CreateRule,
                command::create_rule(source_key, dest_key, &aggregation),
            )
            .await?
            .into_ack(Command::CreateRule)?)
    }

    /// Async variant of
    /// [`Client::delete_rule`](crate::client::Client::delete_rule).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn delete_rule(&mut self, source_key: &str, dest_key: &str) -> Result<bool> {
        Ok(self
            .call(Command::DeleteRule, command::delete_rule(source_key, dest_key))
            .await?
            .into_ack(Command::DeleteRule)?)
    }

    /// Async variant of [`Client::range`](crate::client::Client::range).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn range(
        &mut self,
        key: &str,
        from: impl Into<TimeBound>,
        to: impl Into<TimeBound>,
        options: &RangeOptions,
    ) -> Result<Vec<Sample>> {
        let args = command::range(key, from.into(), to.into(), options)?;
        Ok(self
            .call(Command::Range, args)
            .await?
            .into_samples(Command::Range)?)
    }

    /// Async variant of
    /// [`Client::rev_range`](crate::client::Client::rev_range).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn rev_range(
        &mut self,
        key: &str,
        from: impl Into<TimeBound>,
        to: impl Into<TimeBound>,
        options: &RangeOptions,
    ) -> Result<Vec<Sample>> {
        let args = command::range(key, from.into(), to.into(), options)?;
        Ok(self
            .call(Command::RevRange, args)
            .await?
            .into_samples(Command::RevRange)?)
    }

    /// Async variant of
    /// [`Client::multi_range`](crate::client::Client::multi_range).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn multi_range<S: AsRef<str>>(
        &mut self,
        from: impl Into<TimeBound>,
        to: impl Into<TimeBound>,
        filters: &[S],
        options: &MultiRangeOptions,
    ) -> Result<Vec<SeriesRange>> {
        let args = command::multi_range(from.into(), to.into(), filters, options)?;
        Ok(self
            .call(Command::MRange, args)
            .await?
            .into_multi_range(Command::MRange)?)
    }

    /// Async variant of
    /// [`Client::multi_rev_range`](crate::client::Client::multi_rev_range).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn multi_rev_range<S: AsRef<str>>(
        &mut self,
        from: impl Into<TimeBound>,
        to: impl Into<TimeBound>,
        filters: &[S],
        options: &MultiRangeOptions,
    ) -> Result<Vec<SeriesRange>> {
        let args = command::multi_range(from.into(), to.into(), filters, options)?;
        Ok(self
            .call(Command::MRevRange, args)
            .await?
            .into_multi_range(Command::MRevRange)?)
    }

    /// Async variant of [`Client::get`](crate::client::Client::get).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn get(&mut self, key: &str) -> Result<Option<Sample>> {
        Ok(self
            .call(Command::Get, command::get(key))
            .await?
            .into_last_sample(Command::Get)?)
    }

    /// Async variant of
    /// [`Client::multi_get`](crate::client::Client::multi_get).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn multi_get<S: AsRef<str>>(
        &mut self,
        filters: &[S],
        options: &MGetOptions,
    ) -> Result<Vec<SeriesLast>> {
        Ok(self
            .call(Command::MGet, command::mget(filters, options))
            .await?
            .into_multi_get(Command::MGet)?)
    }

    /// Async variant of [`Client::info`](crate::client::Client::info).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn info(&mut self, key: &str) -> Result<SeriesInfo> {
        Ok(self
            .call(Command::Info, command::info(key))
            .await?
            .into_info(Command::Info)?)
    }

    /// Async variant of
    /// [`Client::query_index`](crate::client::Client::query_index).
    ///
    /// # Errors
    ///
    /// Same contract as the synchronous method.
    pub async fn query_index<S: AsRef<str>>(&mut self, filters: &[S]) -> Result<Vec<String>> {
        Ok(self
            .call(Command::QueryIndex, command::query_index(filters))
            .await?
            .into_keys(Command::QueryIndex)?)
    }
}

impl Pipeline {
    /// Submits the batch through an async transport and decodes one reply
    /// per queued command, in submission order.
    ///
    /// # Errors
    ///
    /// Same contract as [`Pipeline::query`].
    pub async fn query_async<T: AsyncTransport>(&self, transport: &mut T) -> Result<Vec<Reply>> {
        trace!(commands = self.queued.len(), "issuing pipeline");
        let wire: Vec<(&str, &[String])> = self
            .queued
            .iter()
            .map(|(command, args)| (command.wire_name(), args.as_slice()))
            .collect();
        let values = transport.execute_batch(&wire).await?;

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
