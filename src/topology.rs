// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Topology Operations
//!
//! Exchange declaration, queue declaration, and queue-to-exchange binding.
//! Each operation opens its own channel, fires one RPC against the broker,
//! and releases the channel before returning — on the success and failure
//! paths alike. The broker remains the sole owner of the resulting
//! topology; nothing is cached locally.

use crate::{client::AmqpClient, errors::AmqpError, exchange::ExchangeKind, queue::QueueInfo};
use lapin::{
    options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel,
};
use tracing::{debug, error};

impl AmqpClient {
    /// Declares a durable, non-auto-deleted exchange of the given kind.
    ///
    /// Idempotent if the exchange already exists with matching properties;
    /// fails if an incompatible exchange of the same name exists.
    ///
    /// # Parameters
    /// * `name` - The name of the exchange
    /// * `kind` - The exchange kind
    ///
    /// # Returns
    /// Ok(()) on success or `AmqpError::DeclareExchangeError` on failure
    pub async fn declare_exchange(&self, name: &str, kind: ExchangeKind) -> Result<(), AmqpError> {
        let channel = self.channel().await?;

        debug!(name = name, "declaring exchange");

        let declared = channel
            .exchange_declare(
                name,
                kind.into(),
                ExchangeDeclareOptions {
                    passive: false,
                    durable: true,
                    auto_delete: false,
                    internal: false,
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await;

        release(channel).await;

        match declared {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    name = name,
                    "failure to declare the exchange"
                );
                Err(AmqpError::DeclareExchangeError(name.to_owned()))
            }
            Ok(()) => {
                debug!(name = name, "exchange declared");
                Ok(())
            }
        }
    }

    /// Declares a durable, non-exclusive, non-auto-deleted queue.
    ///
    /// Idempotent under matching properties.
    ///
    /// # Parameters
    /// * `name` - The name of the queue
    ///
    /// # Returns
    /// The broker's queue descriptor on success or
    /// `AmqpError::DeclareQueueError` on failure
    pub async fn declare_queue(&self, name: &str) -> Result<QueueInfo, AmqpError> {
        let channel = self.channel().await?;

        debug!(name = name, "declaring queue");

        let declared = channel
            .queue_declare(
                name,
                QueueDeclareOptions {
                    passive: false,
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await;

        release(channel).await;

        match declared {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    name = name,
                    "failure to declare the queue"
                );
                Err(AmqpError::DeclareQueueError(name.to_owned()))
            }
            Ok(queue) => {
                debug!(name = name, "queue declared");
                Ok(QueueInfo::from(queue))
            }
        }
    }

    /// Binds a queue to an exchange with the given routing key.
    ///
    /// Idempotent; fails if either named entity does not exist.
    ///
    /// # Parameters
    /// * `queue_name` - The queue to bind
    /// * `exchange_name` - The exchange to bind it to
    /// * `routing_key` - The routing key of the binding
    ///
    /// # Returns
    /// Ok(()) on success or `AmqpError::BindingError` on failure
    pub async fn bind(
        &self,
        queue_name: &str,
        exchange_name: &str,
        routing_key: &str,
    ) -> Result<(), AmqpError> {
        let channel = self.channel().await?;

        debug!(
            queue = queue_name,
            exchange = exchange_name,
            routing_key = routing_key,
            "binding queue to exchange"
        );

        let bound = channel
            .queue_bind(
                queue_name,
                exchange_name,
                routing_key,
                QueueBindOptions { nowait: false },
                FieldTable::default(),
            )
            .await;

        release(channel).await;

        match bound {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    queue = queue_name,
                    exchange = exchange_name,
                    "failure to bind queue to exchange"
                );
                Err(AmqpError::BindingError(
                    queue_name.to_owned(),
                    exchange_name.to_owned(),
                ))
            }
            Ok(()) => {
                debug!(queue = queue_name, "queue bound");
                Ok(())
            }
        }
    }
}

/// Releases a one-shot RPC channel.
///
/// 200 is the reply-success code. A failed RPC may already have taken the
/// channel down broker-side, in which case closing it again fails too.
async fn release(channel: Channel) {
    if let Err(err) = channel.close(200, "").await {
        debug!(error = err.to_string(), "channel already released");
    }
}
