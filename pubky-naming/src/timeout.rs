//!
//! Deadline handling shared by every public operation.
//!

use std::{future::Future, time::Duration};

/// The caller supplied deadline elapsed before the operation completed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("operation timed out after {0:?}")]
pub struct TimeoutError(pub Duration);

/// Race `operation` against `timeout`.
///
/// With `None` the operation runs unbounded. On expiry the operation future is
/// dropped, which is the cancellation signal for anything it was awaiting.
/// Work that already left the future (spawned or blocking tasks) is not
/// stopped by this function.
pub async fn with_timeout<T, E, F>(timeout: Option<Duration>, operation: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimeoutError>,
{
    let Some(duration) = timeout else {
        return operation.await;
    };
    match tokio::time::timeout(duration, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!("Operation exceeded its deadline of {duration:?}.");
            Err(TimeoutError(duration).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Timeout(TimeoutError),
        Inner,
    }

    impl From<TimeoutError> for TestError {
        fn from(e: TimeoutError) -> Self {
            TestError::Timeout(e)
        }
    }

    #[tokio::test]
    async fn passes_through_without_deadline() {
        let res: Result<u8, TestError> = with_timeout(None, async { Ok(7) }).await;
        assert_eq!(res, Ok(7));

        let res: Result<u8, TestError> = with_timeout(None, async { Err(TestError::Inner) }).await;
        assert_eq!(res, Err(TestError::Inner));
    }

    #[tokio::test(start_paused = true)]
    async fn fails_when_deadline_elapses() {
        let deadline = Duration::from_millis(50);
        let res: Result<u8, TestError> = with_timeout(Some(deadline), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(1)
        })
        .await;
        assert_eq!(res, Err(TestError::Timeout(TimeoutError(deadline))));
    }

    #[tokio::test(start_paused = true)]
    async fn completes_before_deadline() {
        let res: Result<u8, TestError> = with_timeout(Some(Duration::from_secs(1)), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(3)
        })
        .await;
        assert_eq!(res, Ok(3));
    }
}
