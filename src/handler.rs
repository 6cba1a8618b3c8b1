// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Deliveries and Message Handlers
//!
//! This module defines the delivery view handed to message handlers and the
//! handler trait itself. The acknowledgment capability is split off the
//! delivery during conversion: handlers only see the message, never the
//! acker, so acknowledgment stays the consume loop's responsibility.

use async_trait::async_trait;
use lapin::{acker::Acker, BasicProperties};

/// One inbound message instance received from the broker.
///
/// Carries the payload, the broker-assigned metadata, and the opaque
/// delivery tag used for acknowledgment.
#[derive(Debug)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub exchange: String,
    pub routing_key: String,
    pub redelivered: bool,
    pub properties: BasicProperties,
    pub data: Vec<u8>,
}

impl Delivery {
    /// Splits a lapin delivery into the handler-facing view and its acker.
    pub(crate) fn from_lapin(delivery: lapin::message::Delivery) -> (Delivery, Acker) {
        let lapin::message::Delivery {
            delivery_tag,
            exchange,
            routing_key,
            redelivered,
            properties,
            data,
            acker,
        } = delivery;

        (
            Delivery {
                delivery_tag,
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                redelivered,
                properties,
                data,
            },
            acker,
        )
    }
}

/// A handler for consumed messages.
///
/// Implementations process one delivery at a time and must not assume any
/// acknowledgment responsibility — with manual acknowledgment enabled, the
/// consume loop acks each delivery after `handle` returns.
#[async_trait]
pub trait ConsumerHandler: Send + Sync {
    async fn handle(&self, delivery: &Delivery);
}
