use chrono::{DateTime, Utc};
use serde::Serialize;

/// An authentication token issued by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    id: String,
    expires_at: DateTime<Utc>,
}

impl Token {
    pub(crate) fn new(id: String, expires_at: DateTime<Utc>) -> Self {
        Self { id, expires_at }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn test_expired() {
        let token = Token::new("abc".to_string(), Utc::now() + Duration::hours(1));
        assert!(!token.is_expired());

        let token = Token::new("abc".to_string(), Utc::now() - Duration::seconds(1));
        assert!(token.is_expired());
    }

    #[test]
    fn test_serialize() {
        let expires_at = Utc.with_ymd_and_hms(2015, 11, 9, 1, 42, 57).unwrap();
        let token = Token::new("0123456789".to_string(), expires_at);
        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": "0123456789",
                "expires_at": "2015-11-09T01:42:57Z"
            })
        );
    }
}
