//! Post-commit fan-out of order events.
//!
//! Appending to the event store is what makes a change durable; the bus
//! only tells projections about it afterwards. A projection may see the
//! same envelope twice and has to skip sequence numbers it already applied.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// One consumer's inbox. Every subscription gets its own copy of each
/// published message.
#[derive(Debug)]
pub struct Subscription<M> {
    inbox: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(inbox: Receiver<M>) -> Self {
        Self { inbox }
    }

    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.inbox.try_recv()
    }

    /// Wait up to `timeout` so the consumer can poll its shutdown signal.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.inbox.recv_timeout(timeout)
    }
}

pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        B::publish(self, message)
    }

    fn subscribe(&self) -> Subscription<M> {
        B::subscribe(self)
    }
}
