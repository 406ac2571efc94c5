use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_env: String,
    pub log_level: String,
    pub redis_url: String,
    pub data_backend: String,
    pub bus_key_prefix: String,
    pub routing_text_job: String,
    pub routing_image_job: String,
    pub results_queue: String,
    pub job_timeout_ms: u64,
    pub timeout_check_interval_ms: u64,
    pub result_poll_timeout_ms: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let cfg = config::Config::builder()
            .set_default("app_env", "development")?
            .set_default("log_level", "info")?
            .set_default("redis_url", "redis://127.0.0.1:6379")?
            .set_default("data_backend", "memory")?
            .set_default("bus_key_prefix", "ronda:moderation")?
            .set_default("routing_text_job", "moderation.job.text")?
            .set_default("routing_image_job", "moderation.job.image")?
            .set_default("results_queue", "moderation.results")?
            .set_default("job_timeout_ms", 600_000)?
            .set_default("timeout_check_interval_ms", 60_000)?
            .set_default("result_poll_timeout_ms", 5_000)?
            .add_source(config::Environment::default().separator("__"))
            .build()?;
        cfg.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}
