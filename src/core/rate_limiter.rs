use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Jittered pause between consecutive requests to the same provider.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    min_ms: u64,
    max_ms: u64,
}

impl RateLimiter {
    /// Delay window appropriate for the named data source.
    pub fn for_source(source: &str) -> Self {
        match source.to_uppercase().as_str() {
            // FRED allows 120 req/min; jitter keeps us well clear of the WAF
            "FRED" => Self { min_ms: 500, max_ms: 1500 },
            "RSS" => Self { min_ms: 100, max_ms: 300 },
            _ => Self::disabled(),
        }
    }

    pub fn disabled() -> Self {
        Self { min_ms: 0, max_ms: 0 }
    }

    pub async fn wait(&self) {
        if self.max_ms == 0 {
            return;
        }
        let delay = {
            let mut rng = rand::thread_rng();
            rng.gen_range(self.min_ms..=self.max_ms)
        };
        sleep(Duration::from_millis(delay)).await;
    }
}
