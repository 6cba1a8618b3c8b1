// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Consumer
//!
//! This module implements the consume loop: it registers a consumer on a
//! queue and processes deliveries strictly one at a time in arrival order.
//! Each delivery is handed to the caller-supplied handler; with manual
//! acknowledgment enabled, the loop acks the single delivery after the
//! handler returns. An ack failure is logged and does not stop the loop.

use crate::{
    client::AmqpClient,
    errors::AmqpError,
    handler::{ConsumerHandler, Delivery},
};
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    acker::Acker,
    options::{BasicAckOptions, BasicConsumeOptions},
    types::FieldTable,
};
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use tracing::{debug, error};

impl AmqpClient {
    /// Consumes messages from a queue until the delivery stream closes.
    ///
    /// Opens one channel and keeps it open for the duration of the call.
    /// The consumer is registered with the tag `consumer-of-<queue_name>`
    /// and with auto-acknowledge set per `auto_ack`. Deliveries are
    /// processed one at a time: the handler runs first, then (when
    /// `auto_ack` is false) the delivery is acked.
    ///
    /// # Parameters
    /// * `queue_name` - The queue to consume from
    /// * `auto_ack` - Whether the broker acks deliveries before they are sent
    /// * `handler` - Handler invoked with each delivery
    ///
    /// # Returns
    /// Ok(()) when the delivery stream closes, or
    /// `AmqpError::ConsumerError` if consumer registration fails.
    pub async fn consume(
        &self,
        queue_name: &str,
        auto_ack: bool,
        handler: Arc<dyn ConsumerHandler>,
    ) -> Result<(), AmqpError> {
        // This channel is the one exception to the channel-per-RPC scoping:
        // it must stay open to carry the delivery stream, and is released
        // only when the call returns.
        let channel = self.channel().await?;
        let tag = consumer_tag(queue_name);

        let mut consumer = match channel
            .basic_consume(
                queue_name,
                &tag,
                BasicConsumeOptions {
                    no_local: false,
                    no_ack: auto_ack,
                    exclusive: false,
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await
        {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    queue = queue_name,
                    "failure to register the consumer"
                );
                Err(AmqpError::ConsumerError(queue_name.to_owned()))
            }
            Ok(c) => Ok(c),
        }?;

        debug!(queue = queue_name, tag = tag, "consumer registered");

        let spawned = tokio::spawn(async move {
            while let Some(result) = consumer.next().await {
                match result {
                    Ok(delivery) => {
                        let (delivery, acker) = Delivery::from_lapin(delivery);
                        dispatch(handler.as_ref(), &delivery, &acker, auto_ack).await;
                    }
                    Err(err) => {
                        error!(error = err.to_string(), "failure to receive a delivery")
                    }
                }
            }

            debug!("delivery stream closed");
        })
        .await;

        if spawned.is_err() {
            return Err(AmqpError::ConsumerError(queue_name.to_owned()));
        }

        Ok(())
    }
}

pub(crate) fn consumer_tag(queue_name: &str) -> String {
    format!("consumer-of-{}", queue_name)
}

/// The acknowledgment capability of one delivery.
///
/// Implemented by lapin's `Acker`; the seam keeps the dispatch path
/// exercisable without a broker.
#[cfg_attr(test, automock)]
#[async_trait]
pub(crate) trait Acknowledger: Send + Sync {
    async fn ack(&self) -> lapin::Result<()>;
}

#[async_trait]
impl Acknowledger for Acker {
    async fn ack(&self) -> lapin::Result<()> {
        Acker::ack(self, BasicAckOptions { multiple: false }).await
    }
}

/// Processes one delivery: handler first, then the single-delivery ack
/// when manual acknowledgment is in effect.
pub(crate) async fn dispatch(
    handler: &dyn ConsumerHandler,
    delivery: &Delivery,
    acker: &dyn Acknowledger,
    auto_ack: bool,
) {
    debug!(
        tag = delivery.delivery_tag,
        exchange = delivery.exchange.as_str(),
        "delivery received"
    );

    handler.handle(delivery).await;

    if auto_ack {
        return;
    }

    if let Err(err) = acker.ack().await {
        // TODO: revisit whether a failed ack should end the consume loop
        // instead of leaving the delivery unacked on the broker.
        error!(
            error = err.to_string(),
            tag = delivery.delivery_tag,
            "failure to ack delivery"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapin::BasicProperties;
    use std::sync::Mutex;

    fn delivery(tag: u64, data: &[u8]) -> Delivery {
        Delivery {
            delivery_tag: tag,
            exchange: "orders-ex".to_owned(),
            routing_key: "new".to_owned(),
            redelivered: false,
            properties: BasicProperties::default(),
            data: data.to_vec(),
        }
    }

    struct RecordingHandler {
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ConsumerHandler for RecordingHandler {
        async fn handle(&self, delivery: &Delivery) {
            self.log
                .lock()
                .unwrap()
                .push(format!("handle:{}", delivery.delivery_tag));
        }
    }

    struct RecordingAcker {
        log: Arc<Mutex<Vec<String>>>,
        tag: u64,
    }

    #[async_trait]
    impl Acknowledger for RecordingAcker {
        async fn ack(&self) -> lapin::Result<()> {
            self.log.lock().unwrap().push(format!("ack:{}", self.tag));
            Ok(())
        }
    }

    struct PayloadHandler {
        payloads: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    #[async_trait]
    impl ConsumerHandler for PayloadHandler {
        async fn handle(&self, delivery: &Delivery) {
            self.payloads.lock().unwrap().push(delivery.data.clone());
        }
    }

    #[test]
    fn consumer_tag_derives_from_the_queue_name() {
        assert_eq!(consumer_tag("orders"), "consumer-of-orders");
    }

    #[tokio::test]
    async fn manual_ack_happens_once_after_the_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = RecordingHandler { log: log.clone() };
        let acker = RecordingAcker {
            log: log.clone(),
            tag: 1,
        };

        dispatch(&handler, &delivery(1, b"payload"), &acker, false).await;

        assert_eq!(log.lock().unwrap().as_slice(), ["handle:1", "ack:1"]);
    }

    #[tokio::test]
    async fn auto_ack_issues_no_wrapper_ack() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = RecordingHandler { log: log.clone() };
        let mut acker = MockAcknowledger::new();
        acker.expect_ack().never();

        dispatch(&handler, &delivery(1, b"payload"), &acker, true).await;

        assert_eq!(log.lock().unwrap().as_slice(), ["handle:1"]);
    }

    #[tokio::test]
    async fn deliveries_are_fully_processed_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = RecordingHandler { log: log.clone() };
        let first_acker = RecordingAcker {
            log: log.clone(),
            tag: 1,
        };
        let second_acker = RecordingAcker {
            log: log.clone(),
            tag: 2,
        };

        dispatch(&handler, &delivery(1, b"first"), &first_acker, false).await;
        dispatch(&handler, &delivery(2, b"second"), &second_acker, false).await;

        assert_eq!(
            log.lock().unwrap().as_slice(),
            ["handle:1", "ack:1", "handle:2", "ack:2"]
        );
    }

    #[tokio::test]
    async fn ack_failure_is_logged_not_propagated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = RecordingHandler { log: log.clone() };
        let mut acker = MockAcknowledger::new();
        acker.expect_ack().times(1).returning(|| {
            Err(lapin::Error::InvalidChannelState(
                lapin::ChannelState::Closed,
            ))
        });

        dispatch(&handler, &delivery(1, b"payload"), &acker, false).await;

        // The handler ran and dispatch returned despite the failed ack.
        assert_eq!(log.lock().unwrap().as_slice(), ["handle:1"]);
    }

    #[tokio::test]
    async fn handler_sees_the_payload() {
        let payloads = Arc::new(Mutex::new(Vec::new()));
        let handler = PayloadHandler {
            payloads: payloads.clone(),
        };
        let mut acker = MockAcknowledger::new();
        acker.expect_ack().times(1).returning(|| Ok(()));

        dispatch(&handler, &delivery(7, b"order #42"), &acker, false).await;

        assert_eq!(payloads.lock().unwrap().as_slice(), [b"order #42".to_vec()]);
    }
}
