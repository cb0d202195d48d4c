//! Cancellation helpers built on [`CancellationToken`].
//!
//! A single token is threaded through an entire staging call tree. Consumers
//! check it at every suspension point and abort without rolling back side
//! effects that were already committed.

use crate::error::StageError;
use futures::future::select_all;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Returns `Err(StageError::Cancelled)` if the token has fired.
#[inline]
pub fn check(token: &CancellationToken) -> Result<(), StageError> {
    if token.is_cancelled() {
        Err(StageError::Cancelled)
    } else {
        Ok(())
    }
}

/// Combines several tokens into one that fires when any source fires.
///
/// A source that is already cancelled cancels the combination immediately.
/// Otherwise a watcher task is spawned on the current tokio runtime; it exits
/// once any source or the combined token itself is cancelled.
///
/// # Panics
///
/// Panics if called outside a tokio runtime while no source has fired yet.
pub fn merge(tokens: &[CancellationToken]) -> CancellationToken {
    let merged = CancellationToken::new();

    if tokens.is_empty() {
        return merged;
    }
    if tokens.iter().any(CancellationToken::is_cancelled) {
        merged.cancel();
        return merged;
    }

    let sources: Vec<CancellationToken> = tokens.to_vec();
    let watcher = merged.clone();
    tokio::spawn(async move {
        let waits = sources
            .into_iter()
            .map(|token| Box::pin(async move { token.cancelled().await }));

        tokio::select! {
            _ = select_all(waits) => watcher.cancel(),
            _ = watcher.cancelled() => {}
        }
    });

    merged
}

/// Races a fallible future against the token.
///
/// Returns `Err(StageError::Cancelled)` as soon as the token fires, dropping
/// the future. The token is polled first so an already-cancelled token never
/// starts the work.
pub async fn run_cancellable<T, F>(token: &CancellationToken, future: F) -> Result<T, StageError>
where
    F: Future<Output = Result<T, StageError>>,
{
    check(token)?;
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(StageError::Cancelled),
        result = future => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_check_reports_cancellation() {
        let token = CancellationToken::new();
        assert!(check(&token).is_ok());

        token.cancel();
        assert_eq!(check(&token), Err(StageError::Cancelled));
    }

    #[tokio::test]
    async fn test_merge_fires_when_any_source_fires() {
        let a = CancellationToken::new();
        let b = CancellationToken::new();
        let merged = merge(&[a.clone(), b.clone()]);

        assert!(!merged.is_cancelled());
        b.cancel();

        tokio::time::timeout(Duration::from_secs(1), merged.cancelled())
            .await
            .expect("merged token should fire");
        assert!(!a.is_cancelled());
    }

    #[tokio::test]
    async fn test_merge_with_already_cancelled_source() {
        let a = CancellationToken::new();
        a.cancel();

        let merged = merge(&[a, CancellationToken::new()]);
        assert!(merged.is_cancelled());
    }

    #[tokio::test]
    async fn test_merge_does_not_cancel_sources() {
        let a = CancellationToken::new();
        let merged = merge(&[a.clone()]);

        merged.cancel();
        assert!(!a.is_cancelled());
    }

    #[tokio::test]
    async fn test_merge_empty_is_live() {
        let merged = merge(&[]);
        assert!(!merged.is_cancelled());
    }

    #[tokio::test]
    async fn test_run_cancellable_completes() {
        let token = CancellationToken::new();
        let result = run_cancellable(&token, async { Ok::<_, StageError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_run_cancellable_aborts_pending_work() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = run_cancellable(&token, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, StageError>(())
        })
        .await;

        assert_eq!(result, Err(StageError::Cancelled));
    }

    #[tokio::test]
    async fn test_run_cancellable_never_starts_when_cancelled() {
        let token = CancellationToken::new();
        token.cancel();

        let started = std::sync::atomic::AtomicBool::new(false);
        let result = run_cancellable(&token, async {
            started.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok::<_, StageError>(())
        })
        .await;

        assert_eq!(result, Err(StageError::Cancelled));
        assert!(!started.load(std::sync::atomic::Ordering::SeqCst));
    }
}
