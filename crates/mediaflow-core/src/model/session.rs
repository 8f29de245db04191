//! Fila de metadata de sesión (la fila `META`, §3.1).

use serde::{Deserialize, Serialize};

pub const SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub owner_subject: String,
    pub status: SessionStatus,
    pub trip_context: Option<String>,
    pub uploaded_keys: Option<Vec<String>>,
    pub created_at: i64,
    pub expires_at: i64,
}

impl Session {
    /// Construye la fila META de una sesión nueva; `expires_at` se deriva de
    /// `created_at` siempre como `created_at + 24h` (invariante TTL, §8.1.5).
    pub fn new(id: String, owner_subject: String, trip_context: Option<String>, created_at: i64) -> Self {
        Session {
            id,
            owner_subject,
            status: SessionStatus::Active,
            trip_context,
            uploaded_keys: None,
            created_at,
            expires_at: created_at + SESSION_TTL_SECONDS,
        }
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_expires_24h_after_creation() {
        let s = Session::new("s1".into(), "user-1".into(), None, 1_000);
        assert_eq!(s.expires_at, 1_000 + SESSION_TTL_SECONDS);
        assert_eq!(s.status, SessionStatus::Active);
    }

    #[test]
    fn is_expired_at_boundary() {
        let s = Session::new("s1".into(), "user-1".into(), None, 0);
        assert!(!s.is_expired_at(SESSION_TTL_SECONDS - 1));
        assert!(s.is_expired_at(SESSION_TTL_SECONDS));
        assert!(s.is_expired_at(SESSION_TTL_SECONDS + 1));
    }
}
