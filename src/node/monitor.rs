//! Token-loss detection for the regeneration authority.
//!
//! The watch keeps the two fields the receive path and the monitor tick both
//! touch: when a token was last seen, and whether the authority's own token
//! is still out in the ring. Both are only ever mutated by the node controller.
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct TokenWatch {
    ring_ready: bool,
    last_token_seen: Instant,
    in_transit: bool,
}

impl TokenWatch {
    pub fn new(now: Instant) -> Self {
        Self {
            ring_ready: false,
            last_token_seen: now,
            in_transit: false,
        }
    }

    /// Bootstrap is over; silence from now on may mean a lost token.
    pub fn mark_ready(&mut self) {
        self.ring_ready = true;
    }

    pub fn token_seen(&mut self, now: Instant) {
        self.last_token_seen = now;
    }

    /// The authority handed its token to the successor.
    pub fn token_sent(&mut self) {
        self.in_transit = true;
    }

    /// The authority's own token came back.
    pub fn token_returned(&mut self) {
        self.in_transit = false;
    }

    pub fn is_ready(&self) -> bool {
        self.ring_ready
    }

    pub fn in_transit(&self) -> bool {
        self.in_transit
    }

    pub fn silence(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_token_seen)
    }

    /// True when a replacement token may be minted without risking a
    /// second live token from the same authority.
    pub fn should_regenerate(&self, now: Instant, token_timeout: Duration) -> bool {
        self.ring_ready && !self.in_transit && self.silence(now) > token_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(8);

    #[test]
    fn test_not_ready_never_regenerates() {
        let start = Instant::now();
        let watch = TokenWatch::new(start);
        assert!(!watch.should_regenerate(start + Duration::from_secs(60), TIMEOUT));
    }

    #[test]
    fn test_regenerates_after_timeout() {
        let start = Instant::now();
        let mut watch = TokenWatch::new(start);
        watch.mark_ready();

        assert!(!watch.should_regenerate(start + Duration::from_secs(8), TIMEOUT));
        assert!(watch.should_regenerate(start + Duration::from_secs(9), TIMEOUT));
    }

    #[test]
    fn test_in_transit_suppresses_regeneration() {
        let start = Instant::now();
        let mut watch = TokenWatch::new(start);
        watch.mark_ready();
        watch.token_sent();

        assert!(!watch.should_regenerate(start + Duration::from_secs(600), TIMEOUT));

        watch.token_returned();
        assert!(watch.should_regenerate(start + Duration::from_secs(600), TIMEOUT));
    }

    #[test]
    fn test_token_seen_resets_silence() {
        let start = Instant::now();
        let mut watch = TokenWatch::new(start);
        watch.mark_ready();
        watch.token_seen(start + Duration::from_secs(5));

        assert_eq!(watch.silence(start + Duration::from_secs(7)), Duration::from_secs(2));
        assert!(!watch.should_regenerate(start + Duration::from_secs(12), TIMEOUT));
        assert!(watch.should_regenerate(start + Duration::from_secs(14), TIMEOUT));
    }
}
