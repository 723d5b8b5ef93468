use tokio::sync::mpsc;
use tracing::warn;

/// Abstracts over "send this event somewhere", so connectors and the
/// [`crate::ws::WsClient`] don't need to know whether the receiving end is
/// the real [`crate::subscription`] router or a test harness.
pub trait Tx<T> {
    /// Error returned when the receiving end has gone away.
    type Error: std::fmt::Debug;

    fn send(&self, item: T) -> Result<(), Self::Error>;
}

impl<T> Tx<T> for mpsc::UnboundedSender<T> {
    type Error = mpsc::error::SendError<T>;

    fn send(&self, item: T) -> Result<(), Self::Error> {
        mpsc::UnboundedSender::send(self, item)
    }
}

/// An unbounded [`Tx`] that swallows send errors after logging, for
/// fire-and-forget fan-out where the caller has no one to propagate the
/// error to (e.g. publishing a market event to a channel nobody is
/// currently subscribed on).
#[derive(Debug, Clone)]
pub struct ChannelTxDroppable<Inner> {
    tx: Inner,
    label: &'static str,
}

impl<Inner> ChannelTxDroppable<Inner> {
    pub fn new(tx: Inner, label: &'static str) -> Self {
        Self { tx, label }
    }

    pub fn send<T>(&self, item: T)
    where
        Inner: Tx<T>,
    {
        if self.tx.send(item).is_err() {
            warn!(channel = self.label, "dropping message, receiver gone");
        }
    }
}

/// Construct an unbounded mpsc pair, returning the sending half already
/// wrapped for fire-and-forget use.
pub fn unbounded_droppable<T>(
    label: &'static str,
) -> (ChannelTxDroppable<mpsc::UnboundedSender<T>>, mpsc::UnboundedReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelTxDroppable::new(tx, label), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn droppable_send_delivers_while_receiver_alive() {
        let (tx, mut rx) = unbounded_droppable::<u32>("test");
        tx.send(7);
        assert_eq!(rx.recv().await, Some(7));
    }

    #[tokio::test]
    async fn droppable_send_does_not_panic_after_receiver_dropped() {
        let (tx, rx) = unbounded_droppable::<u32>("test");
        drop(rx);
        tx.send(7);
    }
}
