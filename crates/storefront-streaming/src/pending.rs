//! One-shot pending response.

use tokio::sync::oneshot;

/// A result that settles exactly once.
///
/// The first `resolve` or `reject` wins; later calls are ignored and
/// report `false`.
#[derive(Debug)]
pub(crate) struct PendingResponse<T, E> {
    tx: Option<oneshot::Sender<Result<T, E>>>,
}

impl<T, E> PendingResponse<T, E> {
    /// Create a pending cell and the receiver awaiting it.
    pub(crate) fn new() -> (Self, oneshot::Receiver<Result<T, E>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Settle with a value. Returns `true` if the waiter received it.
    pub(crate) fn resolve(&mut self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Settle with an error. Returns `true` if the waiter received it.
    pub(crate) fn reject(&mut self, error: E) -> bool {
        self.settle(Err(error))
    }

    /// Whether this cell has already been settled.
    pub(crate) fn is_settled(&self) -> bool {
        self.tx.is_none()
    }

    fn settle(&mut self, result: Result<T, E>) -> bool {
        match self.tx.take() {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_settlement_wins() {
        let (mut pending, rx) = PendingResponse::<u16, String>::new();
        assert!(!pending.is_settled());

        assert!(pending.resolve(200));
        assert!(pending.is_settled());
        assert!(!pending.resolve(500));
        assert!(!pending.reject("late".into()));

        assert_eq!(rx.await.unwrap(), Ok(200));
    }

    #[tokio::test]
    async fn test_reject() {
        let (mut pending, rx) = PendingResponse::<u16, String>::new();
        assert!(pending.reject("shell".into()));
        assert_eq!(rx.await.unwrap(), Err("shell".to_string()));
    }

    #[test]
    fn test_dropped_waiter() {
        let (mut pending, rx) = PendingResponse::<u16, String>::new();
        drop(rx);
        assert!(!pending.resolve(200));
        assert!(pending.is_settled());
    }
}
