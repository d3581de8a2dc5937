use crate::error::{CaptionError, Result};
use crate::transcribe::{JobId, JobStatus, TranscriptionService};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long and how often to query a job's status.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Delay between two status queries.
    pub interval: Duration,
    /// Give up once this much time has passed without a terminal status.
    pub max_wait: Duration,
    /// Consecutive transient query failures tolerated before giving up.
    pub max_transport_errors: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_wait: Duration::from_secs(30 * 60),
            max_transport_errors: 3,
        }
    }
}

/// Terminal success of a polled job.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub job_id: JobId,
    pub text: String,
    /// Number of status queries issued, failed ones included.
    pub polls: u32,
}

/// Query the job until it reaches `completed` or `error`.
///
/// Transient failures of the status query itself are retried at the same
/// interval; the counter resets whenever the service answers. A query that
/// is still outstanding when `max_wait` runs out counts as a timeout.
pub async fn poll_until_complete(
    service: &dyn TranscriptionService,
    job_id: &JobId,
    policy: &PollPolicy,
) -> Result<PollOutcome> {
    let started = Instant::now();
    let mut polls = 0u32;
    let mut transport_errors = 0u32;

    loop {
        polls += 1;

        let remaining = policy.max_wait.saturating_sub(started.elapsed());
        let reply = match tokio::time::timeout(remaining, service.status(job_id)).await {
            Ok(reply) => reply,
            Err(_) => {
                warn!("Status query for job {} still pending at the wait limit", job_id);
                return Err(CaptionError::TranscriptionTimeout {
                    job_id: job_id.to_string(),
                    waited: started.elapsed(),
                });
            }
        };

        match reply {
            Ok(job) => {
                transport_errors = 0;
                debug!("Job {} status: {} (poll {})", job_id, job.status, polls);

                match job.status {
                    JobStatus::Completed => {
                        let text = job.text.unwrap_or_default();
                        if text.trim().is_empty() {
                            return Err(CaptionError::TranscriptionFailed(format!(
                                "job {job_id} completed with an empty transcript"
                            )));
                        }
                        return Ok(PollOutcome {
                            job_id: job_id.clone(),
                            text,
                            polls,
                        });
                    }
                    JobStatus::Error => {
                        let reason = job
                            .error
                            .unwrap_or_else(|| "service reported an error".to_string());
                        return Err(CaptionError::TranscriptionFailed(format!(
                            "job {job_id}: {reason}"
                        )));
                    }
                    JobStatus::Unknown => {
                        warn!("Job {} reported an unrecognised status", job_id);
                    }
                    JobStatus::Queued | JobStatus::Processing => {}
                }
            }
            Err(e) if e.is_transient() => {
                transport_errors += 1;
                if transport_errors > policy.max_transport_errors {
                    return Err(status_query_failed(job_id, e));
                }
                warn!(
                    "Status query for job {} failed ({}/{}): {}",
                    job_id, transport_errors, policy.max_transport_errors, e
                );
            }
            Err(e) => return Err(status_query_failed(job_id, e)),
        }

        let waited = started.elapsed();
        if waited >= policy.max_wait {
            return Err(CaptionError::TranscriptionTimeout {
                job_id: job_id.to_string(),
                waited,
            });
        }

        tokio::time::sleep(policy.interval).await;
    }
}

fn status_query_failed(job_id: &JobId, source: CaptionError) -> CaptionError {
    CaptionError::StatusQuery {
        job_id: job_id.to_string(),
        source: Box::new(source),
    }
}
