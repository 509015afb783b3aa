use std::time::Duration;

/// Tuning knobs for a [`crate::manager::Manager`]. Constructed once at
/// startup, typically from environment variables, and shared read-only
/// across every connection.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub max_message_size: usize,
    pub send_channel_buffer: usize,
    pub write_wait: Duration,
    pub pong_wait: Duration,
    pub ping_period: Duration,
    pub ack_timeout: Duration,
    pub request_timeout: Duration,
    /// `*` matches any origin. An empty `Origin` header is always permitted
    /// (non-browser clients don't send one).
    pub allowed_origins: Vec<String>,
}

impl ManagerConfig {
    /// Panics if `ping_period >= pong_wait`, since a ping could never be
    /// acknowledged before the read deadline it's meant to refresh expires.
    pub fn validate(&self) -> Result<(), String> {
        if self.ping_period >= self.pong_wait {
            return Err(format!(
                "ping_period ({:?}) must be less than pong_wait ({:?})",
                self.ping_period, self.pong_wait
            ));
        }
        Ok(())
    }

    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        let Some(origin) = origin else {
            return true;
        };
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed == origin)
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_message_size: 64 * 1024,
            send_channel_buffer: 64,
            write_wait: Duration::from_secs(10),
            pong_wait: Duration::from_secs(60),
            ping_period: Duration::from_secs(54),
            ack_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
            allowed_origins: vec!["*".to_string()],
        }
    }
}
