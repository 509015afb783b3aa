use std::env;
use std::time::Duration;

use ws_core::ManagerConfig;

/// Process-level configuration, constructed once at startup from the
/// environment. Falls back to the defaults in [`ManagerConfig::default`]
/// for anything unset.
pub struct GatewayConfig {
    pub bind_addr: String,
    pub log_level: String,
    pub manager: ManagerConfig,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let manager = ManagerConfig {
            max_message_size: env_usize("WS_MAX_MESSAGE_SIZE").unwrap_or(64 * 1024),
            send_channel_buffer: env_usize("WS_SEND_CHANNEL_BUFFER").unwrap_or(64),
            write_wait: env_duration_secs("WS_WRITE_WAIT_SECS").unwrap_or(Duration::from_secs(10)),
            pong_wait: env_duration_secs("WS_PONG_WAIT_SECS").unwrap_or(Duration::from_secs(60)),
            ping_period: env_duration_secs("WS_PING_PERIOD_SECS").unwrap_or(Duration::from_secs(54)),
            ack_timeout: env_duration_secs("WS_ACK_TIMEOUT_SECS").unwrap_or(Duration::from_secs(10)),
            request_timeout: env_duration_secs("WS_REQUEST_TIMEOUT_SECS").unwrap_or(Duration::from_secs(15)),
            allowed_origins: env::var("WS_ALLOWED_ORIGINS")
                .map(|value| value.split(',').map(str::to_string).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
        };
        manager.validate().expect("invalid manager configuration");

        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            manager,
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn env_duration_secs(key: &str) -> Option<Duration> {
    env_usize(key).map(|secs| Duration::from_secs(secs as u64))
}
