use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Indicates whether an error should be retried or treated as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

/// Result of running an operation under the retry policy.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The error was considered fatal and should bubble up immediately.
    Fatal(E),
    /// The error was retryable, but the configured attempts were exhausted.
    AttemptsExceeded(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal(err) | RetryError::AttemptsExceeded(err) => err,
        }
    }
}

/// Linear backoff: the delay after the n-th failed attempt is
/// `base_delay × n`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// One initial attempt plus `max_retries` retries.
    pub fn linear(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_retries as usize + 1,
            base_delay: delay,
        }
    }

    /// Executes the operation with the configured retry policy.
    pub async fn run<F, Fut, T, E, Classifier>(
        &self,
        op: F,
        classify: Classifier,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Classifier: Fn(&E) -> RetryDisposition,
    {
        self.run_with_notify(op, classify, |_, _, _| {}).await
    }

    /// Like [`run`](Self::run), calling `on_retry(failed_attempt, &err, delay)`
    /// before each backoff sleep.
    pub async fn run_with_notify<F, Fut, T, E, Classifier, Notify>(
        &self,
        mut op: F,
        classify: Classifier,
        mut on_retry: Notify,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Classifier: Fn(&E) -> RetryDisposition,
        Notify: FnMut(usize, &E, Duration),
    {
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(result) => return Ok(result),
                Err(err) => match classify(&err) {
                    RetryDisposition::Stop => return Err(RetryError::Fatal(err)),
                    RetryDisposition::Retry => {
                        if attempt >= self.max_attempts {
                            return Err(RetryError::AttemptsExceeded(err));
                        }

                        let delay = self.backoff_delay(attempt);
                        on_retry(attempt, &err, delay);
                        sleep(delay).await;
                        attempt += 1;
                    }
                },
            }
        }
    }

    /// Delay after the `attempt`-th failure (1-based).
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        let delay_ms = self
            .base_delay
            .as_millis()
            .saturating_mul(attempt.max(1) as u128);
        Duration::from_millis(delay_ms.min(u64::MAX as u128) as u64)
    }
}
