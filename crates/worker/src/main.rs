use std::sync::Arc;
use std::time::Duration;

use ronda_domain::aggregator::Aggregator;
use ronda_domain::ports::jobs::ModerationJobRepository;
use ronda_domain::ports::posts::PostRepository;
use ronda_domain::reconciler::ResultReconciler;
use ronda_domain::sweeper::{SweeperConfig, TimeoutSweeper};
use ronda_infra::bus::RedisModerationBus;
use ronda_infra::config::AppConfig;
use ronda_infra::logging::init_tracing;
use ronda_infra::repositories::{InMemoryModerationJobRepository, InMemoryPostRepository};
use tracing::{error, info};

const REQUEUE_BATCH: usize = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config)?;

    let jobs: Arc<dyn ModerationJobRepository> = Arc::new(InMemoryModerationJobRepository::new());
    let posts: Arc<dyn PostRepository> = Arc::new(InMemoryPostRepository::new());

    let bus = RedisModerationBus::connect(
        &config.redis_url,
        &config.bus_key_prefix,
        &config.routing_text_job,
        &config.routing_image_job,
        &config.results_queue,
    )
    .await?;

    let requeued = bus.requeue_processing_results(REQUEUE_BATCH).await?;
    if requeued > 0 {
        info!(requeued, "requeued result deliveries stranded by a previous run");
    }

    let aggregator = Aggregator::new(jobs.clone(), posts.clone());
    let reconciler = ResultReconciler::new(jobs.clone(), posts.clone(), aggregator);
    let sweeper = TimeoutSweeper::new(
        jobs,
        posts,
        SweeperConfig {
            job_timeout: Duration::from_millis(config.job_timeout_ms),
            check_interval: Duration::from_millis(config.timeout_check_interval_ms),
        },
    );

    let sweep_task = tokio::spawn(run_sweeper(sweeper));
    let poll_timeout = Duration::from_millis(config.result_poll_timeout_ms);

    info!("moderation worker started");
    tokio::select! {
        _ = run_result_consumer(bus, reconciler, poll_timeout) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    sweep_task.abort();
    info!("moderation worker stopped");
    Ok(())
}

async fn run_result_consumer(
    bus: RedisModerationBus,
    reconciler: ResultReconciler,
    poll_timeout: Duration,
) {
    loop {
        let inbound = match bus.dequeue_result(poll_timeout).await {
            Ok(Some(inbound)) => inbound,
            Ok(None) => continue,
            Err(err) => {
                error!(error = %err, "failed to dequeue moderation result");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        match reconciler
            .handle_job_result(inbound.message, inbound.correlation_id.as_deref())
            .await
        {
            Ok(outcome) => {
                info!(?outcome, "handled moderation result");
                if let Err(err) = bus.ack_result(&inbound.delivery_token).await {
                    error!(error = %err, "failed to ack moderation result");
                }
            }
            Err(err) => {
                // Storage trouble: leave the delivery in processing so a
                // restart redelivers it.
                error!(error = %err, "failed to reconcile moderation result");
            }
        }
    }
}

async fn run_sweeper(sweeper: TimeoutSweeper) {
    let mut ticker = tokio::time::interval(sweeper.check_interval());
    loop {
        ticker.tick().await;
        if let Err(err) = sweeper.sweep().await {
            error!(error = %err, "timeout sweep failed");
        }
    }
}
