use petsoft_core::UserId;
use serde::{Deserialize, Serialize};

/// The signed-in user, as reported by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: UserId,
    pub email: String,
    /// Whether the user has paid for lifetime access.
    #[serde(default)]
    pub has_access: bool,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            email: email.into(),
            has_access: false,
        }
    }

    pub fn with_access(mut self) -> Self {
        self.has_access = true;
        self
    }
}

/// A hosted checkout session opened for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub id: String,
    /// Where the user is sent to pay.
    pub url: String,
    pub user_id: UserId,
    /// Display price, e.g. `"299€"`.
    pub price_label: String,
    /// Where the provider redirects after a successful payment.
    pub success_url: String,
    /// Where the provider redirects if the user cancels.
    pub cancel_url: String,
}
