//! # Notifier
//!
//! Order confirmations are delivered by a background task so placing an order
//! never waits on delivery. The notifier owns its own tokio runtime: the rest
//! of the desk is synchronous and the runtime lives exactly as long as the
//! notifier object in the container's arena.
//!
//! Shutdown follows the channel-closure pattern:
//!
//! 1. [`Close::close`] drops the sender, which closes the channel
//! 2. the worker drains what is queued and exits its receive loop
//! 3. `close` blocks until the worker has finished
//!
//! The container calls `close` when the arena holding the notifier is
//! finalized, after everything that depends on it is gone.

use crate::error::DeskError;
use crate::model::OrderId;
use kinit::Close;
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::{Builder, Runtime as TokioRuntime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// An order confirmation addressed to a customer.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub order_id: OrderId,
    pub email: String,
    pub message: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "to {} [{}]: {}", self.email, self.order_id, self.message)
    }
}

/// Where delivered notifications end up. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    delivered: Arc<Mutex<Vec<Notification>>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, notification: Notification) {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub struct Notifier {
    runtime: TokioRuntime,
    sender: RefCell<Option<mpsc::Sender<Notification>>>,
    worker: RefCell<Option<JoinHandle<usize>>>,
}

impl Notifier {
    /// Starts the delivery worker with a queue of `capacity` notifications.
    /// The capacity must be positive.
    pub fn start(capacity: usize, outbox: Outbox) -> Result<Self, DeskError> {
        if capacity == 0 {
            return Err(DeskError::Notification(
                "queue capacity must be positive".into(),
            ));
        }
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("notifier")
            .enable_all()
            .build()
            .map_err(|e| DeskError::Notification(e.to_string()))?;

        let (sender, mut receiver) = mpsc::channel::<Notification>(capacity);
        let worker = runtime.spawn(async move {
            info!(capacity, "Notifier started");
            let mut delivered = 0;
            while let Some(notification) = receiver.recv().await {
                debug!(order_id = %notification.order_id, "Delivered");
                outbox.push(notification);
                delivered += 1;
            }
            delivered
        });

        Ok(Self {
            runtime,
            sender: RefCell::new(Some(sender)),
            worker: RefCell::new(Some(worker)),
        })
    }

    /// Queues `notification`, waiting while the queue is full.
    pub fn notify(&self, notification: Notification) -> Result<(), DeskError> {
        let sender = self.sender.borrow();
        let sender = sender
            .as_ref()
            .ok_or_else(|| DeskError::Notification("notifier is closed".into()))?;
        sender
            .blocking_send(notification)
            .map_err(|e| DeskError::Notification(e.to_string()))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.borrow().is_none()
    }
}

impl Close for Notifier {
    fn close(&self) -> Result<(), kinit::Error> {
        drop(self.sender.borrow_mut().take());
        let Some(worker) = self.worker.borrow_mut().take() else {
            return Ok(());
        };
        let delivered = self
            .runtime
            .block_on(worker)
            .map_err(|e| DeskError::Notification(e.to_string()))?;
        info!(delivered, "Notifier stopped");
        Ok(())
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmation(id: u32) -> Notification {
        Notification {
            order_id: OrderId(id),
            email: "alice@example.com".into(),
            message: "confirmed".into(),
        }
    }

    #[test]
    fn close_drains_the_queue() {
        let outbox = Outbox::new();
        let notifier = Notifier::start(1, outbox.clone()).unwrap();
        for id in 1..=3 {
            notifier.notify(confirmation(id)).unwrap();
        }
        notifier.close().unwrap();

        let delivered: Vec<_> = outbox.delivered().iter().map(|n| n.order_id).collect();
        assert_eq!(delivered, vec![OrderId(1), OrderId(2), OrderId(3)]);
    }

    #[test]
    fn notify_after_close_fails() {
        let notifier = Notifier::start(4, Outbox::new()).unwrap();
        notifier.close().unwrap();
        assert!(notifier.is_closed());
        assert!(matches!(
            notifier.notify(confirmation(1)),
            Err(DeskError::Notification(_))
        ));
        notifier.close().unwrap();
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(
            Notifier::start(0, Outbox::new()).map(|_| ()),
            Err(DeskError::Notification(
                "queue capacity must be positive".into()
            ))
        );
    }

    #[test]
    fn notification_display() {
        assert_eq!(
            confirmation(7).to_string(),
            "to alice@example.com [order_7]: confirmed"
        );
    }
}
