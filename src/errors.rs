// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for RabbitMQ Operations
//!
//! This module provides the error type for all broker operations exposed by
//! the crate. The `AmqpError` enum represents the error scenarios that can
//! occur during connection, channel, exchange, queue, binding, and consumer
//! operations.

use thiserror::Error;

/// Represents errors that can occur during AMQP/RabbitMQ operations.
///
/// Every operation surfaces exactly one variant; the underlying cause is
/// logged at the failure site. Errors are terminal to the operation that
/// produced them — there is no retry anywhere in the crate.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmqpError {
    /// Error establishing a connection to the RabbitMQ server
    #[error("failure to connect")]
    ConnectionError,

    /// Error creating a channel from an established connection
    #[error("failure to create a channel")]
    ChannelError,

    /// Error declaring an exchange with the given name
    #[error("failure to declare an exchange `{0}`")]
    DeclareExchangeError(String),

    /// Error declaring a queue with the given name
    #[error("failure to declare a queue `{0}`")]
    DeclareQueueError(String),

    /// Error binding a queue to an exchange
    #[error("failure to bind queue `{0}` to exchange `{1}`")]
    BindingError(String, String),

    /// Error registering a consumer on a queue
    #[error("failure to register a consumer on queue `{0}`")]
    ConsumerError(String),
}
