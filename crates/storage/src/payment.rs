//! Lifetime-access checkout through a hosted payment page.
//!
//! The payment protocol itself lives with the provider. This module only
//! opens a session for a user and, once the provider reports the session
//! paid, tells the caller whose access to unlock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use petsoft_core::UserId;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::record::{CheckoutSession, UserIdentity};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("checkout session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("checkout session {session_id} already completed")]
    AlreadyCompleted { session_id: String },

    /// The user already has lifetime access.
    #[error("user {user_id} already has access")]
    AlreadyPaid { user_id: UserId },
}

/// Hosted checkout provider contract.
#[async_trait]
pub trait CheckoutProvider: Send + Sync + 'static {
    /// Open a checkout session for `user`.
    async fn create_checkout_session(
        &self,
        user: &UserIdentity,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Mark a session paid and return the user it was opened for.
    async fn complete(&self, session_id: &str) -> Result<UserId, PaymentError>;
}

/// Settings for [`HostedCheckout`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Base URL of the hosted payment page; the session id is appended.
    pub base_url: String,
    pub price_label: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            base_url: "https://checkout.petsoft.dev/pay".to_string(),
            price_label: "299€".to_string(),
            success_url: "http://localhost:8080/payment?success=true".to_string(),
            cancel_url: "http://localhost:8080/payment?canceled=true".to_string(),
        }
    }
}

struct OpenSession {
    user_id: UserId,
    completed: bool,
}

/// Tracks sessions locally and hands out hosted-page URLs.
pub struct HostedCheckout {
    config: CheckoutConfig,
    sessions: Mutex<HashMap<String, OpenSession>>,
    next_id: AtomicU64,
}

impl HostedCheckout {
    pub fn new(config: CheckoutConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }
}

#[async_trait]
impl CheckoutProvider for HostedCheckout {
    async fn create_checkout_session(
        &self,
        user: &UserIdentity,
    ) -> Result<CheckoutSession, PaymentError> {
        if user.has_access {
            return Err(PaymentError::AlreadyPaid {
                user_id: user.id.clone(),
            });
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("cs_{n:08}");
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), id);

        self.sessions.lock().await.insert(
            id.clone(),
            OpenSession {
                user_id: user.id.clone(),
                completed: false,
            },
        );
        tracing::info!(session_id = %id, user_id = %user.id, "checkout session opened");

        Ok(CheckoutSession {
            id,
            url,
            user_id: user.id.clone(),
            price_label: self.config.price_label.clone(),
            success_url: self.config.success_url.clone(),
            cancel_url: self.config.cancel_url.clone(),
        })
    }

    async fn complete(&self, session_id: &str) -> Result<UserId, PaymentError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| PaymentError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;
        if session.completed {
            return Err(PaymentError::AlreadyCompleted {
                session_id: session_id.to_string(),
            });
        }
        session.completed = true;
        Ok(session.user_id.clone())
    }
}
