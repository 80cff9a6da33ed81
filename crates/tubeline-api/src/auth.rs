use std::time::Duration;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use tubeline_db::models::UserRow;
use tubeline_types::api::{AccessClaims, RefreshClaims, TokenPair};

/// Secrets and lifetimes for the two token kinds.
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub access_ttl: Duration,
    pub refresh_secret: String,
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    pub fn issue_access(&self, user_id: Uuid, username: &str, email: &str) -> anyhow::Result<String> {
        let claims = AccessClaims {
            sub: user_id,
            username: username.to_string(),
            email: email.to_string(),
            exp: expiry(self.access_ttl)?,
        };
        sign(&claims, &self.access_secret)
    }

    pub fn issue_refresh(&self, user_id: Uuid) -> anyhow::Result<String> {
        let claims = RefreshClaims {
            sub: user_id,
            jti: Uuid::new_v4(),
            exp: expiry(self.refresh_ttl)?,
        };
        sign(&claims, &self.refresh_secret)
    }

    pub fn issue_pair(&self, user: &UserRow) -> anyhow::Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access(user.id, &user.username, &user.email)?,
            refresh_token: self.issue_refresh(user.id)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> jsonwebtoken::errors::Result<AccessClaims> {
        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.access_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> jsonwebtoken::errors::Result<RefreshClaims> {
        decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.refresh_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
    }
}

fn expiry(ttl: Duration) -> anyhow::Result<usize> {
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let exp = now
        .checked_add(ttl.as_secs())
        .and_then(|exp| usize::try_from(exp).ok())
        .ok_or_else(|| anyhow::anyhow!("token lifetime of {}s overflows", ttl.as_secs()))?;
    Ok(exp)
}

fn sign<T: serde::Serialize>(claims: &T, secret: &str) -> anyhow::Result<String> {
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Argon2id PHC string with a random salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("stored password hash is invalid: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TokenConfig {
        TokenConfig {
            access_secret: "access-test-secret".into(),
            access_ttl: Duration::from_secs(60),
            refresh_secret: "refresh-test-secret".into(),
            refresh_ttl: Duration::from_secs(600),
        }
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn tokens_verify_with_their_own_secret_only() {
        let tokens = config();
        let user_id = Uuid::new_v4();

        let access = tokens.issue_access(user_id, "alice", "alice@example.com").unwrap();
        let claims = tokens.verify_access(&access).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "alice");
        assert!(tokens.verify_refresh(&access).is_err());

        let refresh = tokens.issue_refresh(user_id).unwrap();
        assert_eq!(tokens.verify_refresh(&refresh).unwrap().sub, user_id);
        assert!(tokens.verify_access(&refresh).is_err());
    }

    #[test]
    fn refresh_tokens_are_unique() {
        let tokens = config();
        let user_id = Uuid::new_v4();
        assert_ne!(tokens.issue_refresh(user_id).unwrap(), tokens.issue_refresh(user_id).unwrap());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let tokens = config();
        let claims = AccessClaims {
            sub: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            exp: (chrono::Utc::now().timestamp() - 3600) as usize,
        };
        let token = sign(&claims, &tokens.access_secret).unwrap();
        assert!(tokens.verify_access(&token).is_err());
    }

    #[test]
    fn huge_lifetimes_fail_instead_of_wrapping() {
        assert!(expiry(Duration::from_secs(60)).unwrap() > chrono::Utc::now().timestamp() as usize);
        assert!(expiry(Duration::from_secs(u64::MAX)).is_err());

        let tokens = TokenConfig {
            access_ttl: Duration::from_secs(u64::MAX),
            ..config()
        };
        assert!(tokens.issue_access(Uuid::new_v4(), "alice", "alice@example.com").is_err());
    }
}
