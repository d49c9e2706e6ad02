//! Message queues for inter-component communication.
//!
//! Provides both point-to-point (Queue) and broadcast (BroadcastQueue) messaging.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{NodeGraphError, Result};

/// MPMC (multi-producer, multi-consumer) queue.
///
/// Used for completion notifications where every message is consumed by
/// exactly one receiver. Backed by flume, so senders may live on any thread.
#[derive(Clone)]
pub struct Queue<T> {
    receiver: Arc<flume::Receiver<T>>,
    sender: Arc<flume::Sender<T>>,
}

#[allow(unused)]
impl<T> Queue<T> {
    /// create a new bounded queue
    pub fn new(cap: usize) -> Arc<Self> {
        let (tx, rx) = flume::bounded(cap);
        Self::from_parts(tx, rx)
    }

    /// create a new queue whose senders never wait
    pub fn unbounded() -> Arc<Self> {
        let (tx, rx) = flume::unbounded();
        Self::from_parts(tx, rx)
    }

    fn from_parts(
        tx: flume::Sender<T>,
        rx: flume::Receiver<T>,
    ) -> Arc<Self> {
        Arc::new(Self {
            receiver: Arc::new(rx),
            sender: Arc::new(tx),
        })
    }

    /// send a message to the queue
    pub fn send(
        &self,
        msg: T,
    ) -> Result<()> {
        self.sender.send(msg).map_err(|e| NodeGraphError::Queue(e.to_string()))
    }

    /// receive a message without waiting
    pub fn try_next(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// receive a message from the queue asynchronously
    pub async fn next_async(&self) -> Option<T> {
        self.receiver.recv_async().await.ok()
    }
}

/// Broadcast queue for one-to-many message distribution.
///
/// Used for job event broadcasting where all subscribers receive every message.
/// Backed by tokio's broadcast channel.
#[derive(Clone)]
pub struct BroadcastQueue<T> {
    sender: Arc<broadcast::Sender<T>>,
}

impl<T: Clone> BroadcastQueue<T> {
    /// create a new broadcast queue
    pub fn new(cap: usize) -> Arc<Self> {
        let (tx, _) = broadcast::channel(cap);

        Arc::new(Self {
            sender: Arc::new(tx),
        })
    }

    /// send a message to the queue; fails when nobody is subscribed
    pub fn send(
        &self,
        msg: T,
    ) -> Result<()> {
        self.sender.send(msg).map_err(|e| NodeGraphError::Queue(e.to_string()))?;
        Ok(())
    }

    /// subscribe to the queue
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_roundtrip() {
        let queue = Queue::unbounded();
        queue.send(1).unwrap();
        queue.send(2).unwrap();
        assert_eq!(queue.next_async().await, Some(1));
        assert_eq!(queue.try_next(), Some(2));
        assert_eq!(queue.try_next(), None);
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let queue = BroadcastQueue::new(4);
        assert!(queue.send("lost").is_err());
        let mut rx = queue.subscribe();
        queue.send("seen").unwrap();
        assert_eq!(rx.try_recv().unwrap(), "seen");
    }
}
