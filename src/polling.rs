//! Bounded status polling shared by assistant runs and detection jobs.

use std::fmt;
use std::time::Duration;

/// Fixed-interval, bounded polling schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before each status check.
    pub interval: Duration,
    /// Maximum number of status checks.
    pub max_attempts: u32,
}

impl PollPolicy {
    /// Build a policy from an interval and an attempt budget.
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Default schedule for assistant runs: 30 checks, 2 s apart.
    pub const fn assistant_run() -> Self {
        Self::new(Duration::from_secs(2), 30)
    }

    /// Default schedule for detection jobs: 60 checks, 2 s apart.
    pub const fn detection_job() -> Self {
        Self::new(Duration::from_secs(2), 60)
    }

    /// Sleep for one interval.
    pub async fn wait(&self) {
        tokio::time::sleep(self.interval).await;
    }

    /// Check again while `pending` holds for the latest observation, sleeping one interval
    /// before each check. `initial` counts as an observation but not as an attempt.
    pub async fn poll<T, E, P, F, Fut>(
        &self,
        initial: T,
        pending: P,
        mut check: F,
    ) -> Result<Polled<T>, E>
    where
        P: Fn(&T) -> bool,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut current = initial;
        let mut attempts = 0;
        while pending(&current) {
            if attempts == self.max_attempts {
                return Ok(Polled::Exhausted {
                    attempts,
                    last: current,
                });
            }
            self.wait().await;
            attempts += 1;
            current = check(attempts).await?;
        }
        Ok(Polled::Settled {
            attempts,
            value: current,
        })
    }
}

/// Result of [`PollPolicy::poll`].
#[derive(Debug, PartialEq, Eq)]
pub enum Polled<T> {
    /// An observation that is no longer pending.
    Settled {
        /// Checks issued before settling.
        attempts: u32,
        /// Settled observation.
        value: T,
    },
    /// Attempt budget spent while still pending.
    Exhausted {
        /// Checks issued.
        attempts: u32,
        /// Last observation.
        last: T,
    },
}

/// In-memory status of a long-running provider job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    /// Accepted but not started.
    Queued,
    /// Still running.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully.
    Failed,
}

impl JobStatus {
    /// Whether another poll could change the outcome.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Queued | Self::InProgress)
    }

    /// Stable label used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn defaults_match_documented_bounds() {
        assert_eq!(PollPolicy::assistant_run().max_attempts, 30);
        assert_eq!(PollPolicy::detection_job().max_attempts, 60);
        assert_eq!(PollPolicy::detection_job().interval, Duration::from_secs(2));
    }

    #[test]
    fn only_queued_and_running_are_pending() {
        assert!(JobStatus::Queued.is_pending());
        assert!(JobStatus::InProgress.is_pending());
        assert!(!JobStatus::Completed.is_pending());
        assert!(!JobStatus::Failed.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn assistant_runs_get_thirty_checks_two_seconds_apart() {
        let started = tokio::time::Instant::now();
        let mut checked_at = Vec::new();

        let polled = PollPolicy::assistant_run()
            .poll(JobStatus::Queued, |status| status.is_pending(), |_| {
                checked_at.push(started.elapsed());
                async { Ok::<_, Infallible>(JobStatus::InProgress) }
            })
            .await
            .expect("infallible");

        assert_eq!(
            polled,
            Polled::Exhausted {
                attempts: 30,
                last: JobStatus::InProgress
            }
        );
        assert_eq!(checked_at.len(), 30);
        let mut previous = Duration::ZERO;
        for at in &checked_at {
            let gap = *at - previous;
            assert!(gap >= Duration::from_secs(2), "{gap:?}");
            assert!(gap < Duration::from_millis(2100), "{gap:?}");
            previous = *at;
        }
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(58), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(62), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn settled_initial_observation_is_never_rechecked() {
        let started = tokio::time::Instant::now();

        let polled = PollPolicy::assistant_run()
            .poll(JobStatus::Completed, |status| status.is_pending(), |_| async {
                Err::<JobStatus, _>("checked")
            })
            .await
            .expect("no status check");

        assert_eq!(
            polled,
            Polled::Settled {
                attempts: 0,
                value: JobStatus::Completed
            }
        );
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_check_stops_polling() {
        let mut checks = 0;

        let error = PollPolicy::detection_job()
            .poll(JobStatus::Queued, |status| status.is_pending(), |attempt| {
                checks += 1;
                async move {
                    if attempt == 3 {
                        Err("throttled")
                    } else {
                        Ok(JobStatus::InProgress)
                    }
                }
            })
            .await
            .expect_err("third check fails");

        assert_eq!(error, "throttled");
        assert_eq!(checks, 3);
    }
}
