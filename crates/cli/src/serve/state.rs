//! Application state and rate limiting.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use petsoft_storage::{
    CheckoutProvider, HostedCheckout, InMemoryPetStorage, InMemoryUserDirectory, PetService,
    StaticSession, UserDirectory, UserIdentity,
};
use tokio::sync::Mutex;

use super::RATE_LIMIT_WINDOW_SECS;
use crate::config::ServeConfig;

/// Per-IP request tracker: (request count, window start time).
type IpTracker = HashMap<IpAddr, (u64, Instant)>;

/// In-memory per-IP rate limiter.
pub(crate) struct RateLimiter {
    /// Request counts per IP per window.
    tracker: Mutex<IpTracker>,
    /// Maximum requests per window.
    pub(crate) max_requests: u64,
}

impl RateLimiter {
    pub(crate) fn new(max_requests: u64) -> Self {
        Self {
            tracker: Mutex::new(HashMap::new()),
            max_requests,
        }
    }

    /// Check if a request from the given IP is allowed.
    /// Returns Ok(()) if allowed, Err(retry_after_secs) if rate limited.
    pub(crate) async fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let mut tracker = self.tracker.lock().await;
        let now = Instant::now();

        let entry = tracker.entry(ip).or_insert((0, now));

        let elapsed = now.duration_since(entry.1).as_secs();
        if elapsed >= RATE_LIMIT_WINDOW_SECS {
            entry.0 = 0;
            entry.1 = now;
        }

        entry.0 += 1;
        if entry.0 > self.max_requests {
            Err(RATE_LIMIT_WINDOW_SECS.saturating_sub(elapsed))
        } else {
            Ok(())
        }
    }
}

/// Server actions for one authenticated request.
pub(crate) type RequestActions = PetService<InMemoryPetStorage, StaticSession>;

/// Application state shared across request handlers.
pub(crate) struct AppState {
    pub(crate) pets: Arc<InMemoryPetStorage>,
    pub(crate) users: Arc<dyn UserDirectory>,
    pub(crate) checkout: Arc<dyn CheckoutProvider>,
    /// Expected `X-Webhook-Secret`. None = webhook disabled.
    pub(crate) webhook_secret: Option<String>,
    pub(crate) rate_limiter: RateLimiter,
}

impl AppState {
    /// Build state from config, seeding the user directory.
    pub(crate) async fn from_config(config: &ServeConfig) -> Self {
        let users = InMemoryUserDirectory::new();
        for seed in &config.users {
            users.insert(seed.identity(), seed.token.as_str()).await;
        }

        Self {
            pets: Arc::new(InMemoryPetStorage::new()),
            users: Arc::new(users),
            checkout: Arc::new(HostedCheckout::new(config.checkout.provider.clone())),
            webhook_secret: config
                .checkout
                .webhook_secret
                .clone()
                .filter(|s| !s.is_empty()),
            rate_limiter: RateLimiter::new(config.rate_limit),
        }
    }

    /// Pet actions running as `user`.
    pub(crate) fn actions_for(&self, user: UserIdentity) -> RequestActions {
        PetService::new(self.pets.clone(), StaticSession::signed_in(user))
    }
}
