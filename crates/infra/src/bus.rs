use std::time::Duration;

use metrics::counter;
use redis::aio::ConnectionManager;
use ronda_domain::job::JobContentType;
use ronda_domain::messages::{JobRequestedMessage, JobResultMessage};
use ronda_domain::ports::BoxFuture;
use ronda_domain::ports::bus::{BusError, JobRequestPublisher};
use serde::{Deserialize, Serialize};
use tracing::warn;

const PUBLISHED_TOTAL: &str = "ronda_bus_job_requests_published_total";
const RESULTS_CONSUMED_TOTAL: &str = "ronda_bus_job_results_consumed_total";
const RESULTS_MALFORMED_TOTAL: &str = "ronda_bus_job_results_malformed_total";

/// Transport framing: the payload plus the transport-level correlation
/// token (the job id), kept outside the payload so identity survives
/// workers that trim or mangle the body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BusEnvelope {
    pub correlation_id: Option<String>,
    pub payload: serde_json::Value,
}

/// One consumed result delivery. `delivery_token` is what `ack` needs;
/// `message` is the leniently parsed payload (malformed bodies degrade to
/// an empty message the reconciler will drop).
#[derive(Clone, Debug)]
pub struct InboundJobResult {
    pub delivery_token: String,
    pub correlation_id: Option<String>,
    pub message: JobResultMessage,
}

/// Redis-backed broker adapter. Job requests go to one ready list per
/// routing key; results are consumed from the results queue with the
/// BRPOPLPUSH ready/processing pattern and acknowledged by LREM, so a
/// worker crash mid-handling redelivers rather than loses the message.
#[derive(Clone)]
pub struct RedisModerationBus {
    manager: ConnectionManager,
    text_requests_key: String,
    image_requests_key: String,
    results_ready_key: String,
    results_processing_key: String,
}

impl RedisModerationBus {
    pub async fn connect(
        redis_url: &str,
        prefix: &str,
        routing_text_job: &str,
        routing_image_job: &str,
        results_queue: &str,
    ) -> Result<Self, BusError> {
        let client = redis::Client::open(redis_url)
            .map_err(|err| BusError::Unavailable(err.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|err| BusError::Unavailable(err.to_string()))?;
        Ok(Self {
            manager,
            text_requests_key: format!("{prefix}:{routing_text_job}"),
            image_requests_key: format!("{prefix}:{routing_image_job}"),
            results_ready_key: format!("{prefix}:{results_queue}:ready"),
            results_processing_key: format!("{prefix}:{results_queue}:processing"),
        })
    }

    fn serialize(envelope: &BusEnvelope) -> Result<String, BusError> {
        serde_json::to_string(envelope).map_err(|err| BusError::Serialization(err.to_string()))
    }

    fn request_key_for(&self, content_type: JobContentType) -> &str {
        match content_type {
            JobContentType::Text => &self.text_requests_key,
            JobContentType::Image => &self.image_requests_key,
        }
    }

    /// Blocks up to `timeout` for the next job result. Returns `None` on
    /// timeout. A body that is not even a valid envelope is degraded to an
    /// empty message instead of failing the consumer.
    pub async fn dequeue_result(
        &self,
        timeout: Duration,
    ) -> Result<Option<InboundJobResult>, BusError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = redis::cmd("BRPOPLPUSH")
            .arg(&self.results_ready_key)
            .arg(&self.results_processing_key)
            .arg(block_seconds(timeout))
            .query_async(&mut conn)
            .await
            .map_err(|err| BusError::Operation(err.to_string()))?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        counter!(RESULTS_CONSUMED_TOTAL).increment(1);
        let (correlation_id, message) = match serde_json::from_str::<BusEnvelope>(&raw) {
            Ok(envelope) => {
                let message = serde_json::from_value::<JobResultMessage>(envelope.payload)
                    .unwrap_or_else(|err| {
                        counter!(RESULTS_MALFORMED_TOTAL).increment(1);
                        warn!(error = %err, "job result payload did not parse, passing empty message");
                        JobResultMessage::default()
                    });
                (envelope.correlation_id, message)
            }
            Err(err) => {
                counter!(RESULTS_MALFORMED_TOTAL).increment(1);
                warn!(error = %err, "job result delivery is not a bus envelope");
                (None, JobResultMessage::default())
            }
        };

        Ok(Some(InboundJobResult {
            delivery_token: raw,
            correlation_id,
            message,
        }))
    }

    pub async fn ack_result(&self, delivery_token: &str) -> Result<(), BusError> {
        let mut conn = self.manager.clone();
        let _: i64 = redis::cmd("LREM")
            .arg(&self.results_processing_key)
            .arg(1)
            .arg(delivery_token)
            .query_async(&mut conn)
            .await
            .map_err(|err| BusError::Operation(err.to_string()))?;
        Ok(())
    }

    /// Moves any deliveries stranded in the processing list by a crashed
    /// consumer back to ready. Run once at startup.
    pub async fn requeue_processing_results(&self, limit: usize) -> Result<usize, BusError> {
        if limit == 0 {
            return Ok(0);
        }
        let mut conn = self.manager.clone();
        let stranded: Vec<String> = redis::cmd("LRANGE")
            .arg(&self.results_processing_key)
            .arg(0)
            .arg((limit.saturating_sub(1)) as i64)
            .query_async(&mut conn)
            .await
            .map_err(|err| BusError::Operation(err.to_string()))?;
        if stranded.is_empty() {
            return Ok(0);
        }
        let _: i64 = redis::cmd("RPUSH")
            .arg(&self.results_ready_key)
            .arg(stranded.clone())
            .query_async(&mut conn)
            .await
            .map_err(|err| BusError::Operation(err.to_string()))?;
        let _: String = redis::cmd("LTRIM")
            .arg(&self.results_processing_key)
            .arg(stranded.len() as i64)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(|err| BusError::Operation(err.to_string()))?;
        Ok(stranded.len())
    }
}

/// BRPOPLPUSH takes whole seconds, and zero means block forever. Round the
/// configured poll timeout up so a sub-second value still yields a bounded
/// wait.
fn block_seconds(timeout: Duration) -> usize {
    timeout.as_millis().div_ceil(1000).max(1) as usize
}

impl JobRequestPublisher for RedisModerationBus {
    fn publish(&self, message: &JobRequestedMessage) -> BoxFuture<'_, Result<(), BusError>> {
        let key = self.request_key_for(message.content_type).to_string();
        let envelope = serde_json::to_value(message)
            .map(|payload| BusEnvelope {
                correlation_id: Some(message.job_id.clone()),
                payload,
            })
            .map_err(|err| BusError::Serialization(err.to_string()));
        Box::pin(async move {
            let payload = Self::serialize(&envelope?)?;
            let mut conn = self.manager.clone();
            let _: i64 = redis::cmd("RPUSH")
                .arg(&key)
                .arg(payload)
                .query_async(&mut conn)
                .await
                .map_err(|err| BusError::Operation(err.to_string()))?;
            counter!(PUBLISHED_TOTAL).increment(1);
            Ok(())
        })
    }
}
