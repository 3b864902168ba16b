use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access tokens open the API; refresh tokens only buy a new pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Registered claims plus the token kind. `sub` holds the numeric user id
/// as a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub jti: Uuid,
    pub kind: TokenKind,
}

impl Claims {
    pub fn user_id(&self) -> anyhow::Result<i64> {
        self.sub
            .parse()
            .map_err(|_| anyhow::anyhow!("subject {:?} is not a user id", self.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_must_be_numeric() {
        let mut claims = Claims {
            sub: "12".into(),
            iat: 0,
            exp: 0,
            iss: "storefront".into(),
            aud: "storefront-admin".into(),
            jti: Uuid::nil(),
            kind: TokenKind::Access,
        };
        assert_eq!(claims.user_id().unwrap(), 12);
        claims.sub = "8b0c6a2e-uuid".into();
        assert!(claims.user_id().is_err());
    }

    #[test]
    fn kind_is_lowercase_on_the_wire() {
        assert_eq!(serde_json::to_string(&TokenKind::Refresh).unwrap(), r#""refresh""#);
    }
}
