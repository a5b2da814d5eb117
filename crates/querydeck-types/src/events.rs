use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session lifecycle notifications pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEvent {
    /// A new session was opened by sign-up or sign-in
    SignedIn {
        user_id: Uuid,
        session_id: Uuid,
        email: String,
    },

    /// The session was torn down
    SignedOut { user_id: Uuid, session_id: Uuid },

    /// A fresh token was issued for an existing session
    TokenRefreshed { user_id: Uuid, session_id: Uuid },
}

impl SessionEvent {
    pub fn user_id(&self) -> Uuid {
        match self {
            Self::SignedIn { user_id, .. }
            | Self::SignedOut { user_id, .. }
            | Self::TokenRefreshed { user_id, .. } => *user_id,
        }
    }

    pub fn session_id(&self) -> Uuid {
        match self {
            Self::SignedIn { session_id, .. }
            | Self::SignedOut { session_id, .. }
            | Self::TokenRefreshed { session_id, .. } => *session_id,
        }
    }

    /// Event name used on the SSE stream.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SignedIn { .. } => "signed_in",
            Self::SignedOut { .. } => "signed_out",
            Self::TokenRefreshed { .. } => "token_refreshed",
        }
    }
}
