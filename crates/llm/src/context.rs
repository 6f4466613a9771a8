//! The immutable per-request context threaded through every converter and log call:
//! created at ingress, read-only afterward.

use std::time::{SystemTime, UNIX_EPOCH};

/// Conversion context for a single inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub start_epoch_ms: i64,
    pub original_model: String,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

impl RequestContext {
    pub fn new(request_id: String, original_model: String, user_agent: Option<String>, ip: Option<String>) -> Self {
        Self {
            request_id,
            start_epoch_ms: now_ms(),
            original_model,
            user_agent,
            ip,
        }
    }

    pub fn elapsed_ms(&self) -> i64 {
        now_ms() - self.start_epoch_ms
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_ms_is_non_negative() {
        let ctx = RequestContext::new("req_1".to_string(), "claude-3-sonnet-20240229".to_string(), None, None);
        assert!(ctx.elapsed_ms() >= 0);
    }
}
