use rand::Rng;
use rand_distr::Alphanumeric;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const TOKEN_LEN: usize = 32;

struct IssuedToken {
    process_id: String,
    issued_at: Instant,
}

/// Single-use freshness tokens for inbound trigger requests.
///
/// Every outbound dispatch mints a token bound to its process identifier;
/// the matching inbound trigger consumes it. A token verifies at most once,
/// so replaying a captured trigger request is rejected, and unused tokens
/// age out after `ttl`.
pub struct TriggerAuth {
    ttl: Duration,
    issued: Mutex<HashMap<String, IssuedToken>>,
}

impl TriggerAuth {
    pub fn new(ttl: Duration) -> Self {
        TriggerAuth {
            ttl,
            issued: Mutex::new(HashMap::new()),
        }
    }

    pub fn issue(&self, process_id: &str) -> String {
        let token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        let mut issued = self.issued.lock().unwrap();
        let ttl = self.ttl;
        issued.retain(|_, entry| entry.issued_at.elapsed() < ttl);
        issued.insert(
            token.clone(),
            IssuedToken {
                process_id: process_id.to_string(),
                issued_at: Instant::now(),
            },
        );
        token
    }

    /// Consumes `token`. Returns `true` only when it was minted for
    /// `process_id` and has not expired or been used before.
    pub fn verify(&self, process_id: &str, token: &str) -> bool {
        let Some(entry) = self.issued.lock().unwrap().remove(token) else {
            return false;
        };
        entry.process_id == process_id && entry.issued_at.elapsed() < self.ttl
    }
}

impl Default for TriggerAuth {
    fn default() -> Self {
        TriggerAuth::new(Duration::from_secs(600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_verifies_exactly_once() {
        let auth = TriggerAuth::default();
        let token = auth.issue("brand_sync");
        assert!(auth.verify("brand_sync", &token));
        assert!(!auth.verify("brand_sync", &token));
    }

    #[test]
    fn token_is_bound_to_its_process() {
        let auth = TriggerAuth::default();
        let token = auth.issue("brand_sync");
        assert!(!auth.verify("slot_sync", &token));
        // consumed by the failed attempt
        assert!(!auth.verify("brand_sync", &token));
    }

    #[test]
    fn unknown_token_is_rejected() {
        let auth = TriggerAuth::default();
        assert!(!auth.verify("brand_sync", "made-up"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = TriggerAuth::new(Duration::ZERO);
        let token = auth.issue("brand_sync");
        assert!(!auth.verify("brand_sync", &token));
    }

    #[test]
    fn tokens_are_unique_and_alphanumeric() {
        let auth = TriggerAuth::default();
        let a = auth.issue("brand_sync");
        let b = auth.issue("brand_sync");
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
