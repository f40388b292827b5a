//! Cooperative cancellation shared by estimation and commit.

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancellation signal.
///
/// Cancelling any clone cancels all of them. Work that has already finished is
/// never undone; callers only stop starting new work.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in `self`, so `wait_for` only errors after every clone is gone.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// A token scoped to one request.
    ///
    /// It is cancelled when `self` is, or when the returned guard is dropped.
    /// Cancelling the child never reaches the parent. Must be called inside a
    /// tokio runtime.
    pub fn child(&self) -> CancelGuard {
        let child = CancelToken::new();
        if self.is_cancelled() {
            child.cancel();
            return CancelGuard { token: child };
        }
        let parent = self.clone();
        let forward = child.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = parent.cancelled() => forward.cancel(),
                _ = forward.cancelled() => {}
            }
        });
        CancelGuard { token: child }
    }
}

/// Cancels its token on drop, e.g. when a client disconnects mid-request.
#[derive(Debug)]
pub struct CancelGuard {
    token: CancelToken,
}

impl CancelGuard {
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_is_seen_by_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        let waiter = tokio::spawn(async move { clone.cancelled().await });
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter finished")
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn child_follows_parent_but_not_the_reverse() {
        let parent = CancelToken::new();
        let guard = parent.child();
        let child = guard.token().clone();

        child.cancel();
        assert!(!parent.is_cancelled());

        let other = parent.child();
        let other_token = other.token().clone();
        parent.cancel();
        tokio::time::timeout(Duration::from_secs(1), other_token.cancelled())
            .await
            .expect("child cancelled with parent");
    }

    #[tokio::test]
    async fn dropping_the_guard_cancels_the_child() {
        let parent = CancelToken::new();
        let guard = parent.child();
        let token = guard.token().clone();
        assert!(!token.is_cancelled());

        drop(guard);
        assert!(token.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn child_of_cancelled_parent_starts_cancelled() {
        let parent = CancelToken::new();
        parent.cancel();
        // No runtime needed: nothing is spawned for an already-cancelled parent.
        assert!(parent.child().token().is_cancelled());
    }
}
