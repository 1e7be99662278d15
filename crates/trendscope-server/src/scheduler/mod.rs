//! Background warm-refresh scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the daily
//! snapshot warm-refresh job, so the first request of the day after the TTL
//! lapses does not pay the full aggregation latency.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use trendscope_discovery::SnapshotCache;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(cache: SnapshotCache) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_warm_refresh_job(&scheduler, cache).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the daily warm-refresh job.
///
/// Runs every day at 03:00 UTC (`0 0 3 * * *`) and force-refreshes every
/// configured scenario at its default geo.
async fn register_warm_refresh_job(
    scheduler: &JobScheduler,
    cache: SnapshotCache,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async("0 0 3 * * *", move |_uuid, _lock| {
        let cache = cache.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting daily snapshot warm refresh");
            run_warm_refresh(&cache).await;
            tracing::info!("scheduler: daily snapshot warm refresh complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Force-refresh every configured scenario, spaced out so consecutive
/// scenarios do not hammer the upstream rate limit.
async fn run_warm_refresh(cache: &SnapshotCache) {
    let ids: Vec<String> = cache.scenarios().iter().map(|s| s.id.clone()).collect();

    for (idx, scenario_id) in ids.iter().enumerate() {
        match cache.force_refresh(scenario_id, None).await {
            Ok(served) => tracing::info!(
                scenario = %scenario_id,
                stale = served.stale,
                top = served.snapshot.top_keywords.len(),
                related = served.snapshot.related_kws.len(),
                "scheduler: scenario refreshed"
            ),
            Err(e) => tracing::error!(
                scenario = %scenario_id,
                error = %e,
                "scheduler: scenario refresh failed"
            ),
        }

        if idx + 1 < ids.len() {
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        }
    }
}
