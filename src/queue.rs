// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Descriptor
//!
//! The broker's answer to a queue declaration: the queue name plus the
//! message and consumer counts at declaration time.

/// Broker-side queue descriptor returned by
/// [`declare_queue`](crate::client::AmqpClient::declare_queue).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueInfo {
    pub name: String,
    pub message_count: u32,
    pub consumer_count: u32,
}

impl From<lapin::Queue> for QueueInfo {
    fn from(queue: lapin::Queue) -> QueueInfo {
        QueueInfo {
            name: queue.name().as_str().to_owned(),
            message_count: queue.message_count(),
            consumer_count: queue.consumer_count(),
        }
    }
}
