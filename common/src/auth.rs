use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{self, AddCode};

/// Access token lifetime, also used as the access cookie max-age.
pub const ACCESS_TOKEN_TTL_SECONDS: i64 = 3600;

pub static ENCODING_KEY: Lazy<EncodingKey> = Lazy::new(|| {
    let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
    EncodingKey::from_secret(secret.as_bytes())
});

pub static DECODING_KEY: Lazy<DecodingKey> = Lazy::new(|| {
    let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
    DecodingKey::from_secret(secret.as_bytes())
});

#[derive(Debug, Clone, PartialEq)]
pub enum Auth {
    Service(String),
    Admin(ObjectId),
    User(ObjectId),
    None,
}

impl Auth {
    pub fn id(&self) -> Option<&ObjectId> {
        match self {
            Auth::Admin(id) => Some(id),
            Auth::User(id) => Some(id),
            _ => None,
        }
    }

    pub fn full_access(&self) -> bool {
        matches!(self, Auth::Admin(_) | Auth::Service(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Role {
    Admin,
    User,
    Service,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    role: Role,
    user_id: Option<String>,
    service_name: Option<String>,
    exp: i64,
}

impl Auth {
    pub fn from_token(token: &str) -> error::Result<Self> {
        let claims = decode::<Claims>(token, &DECODING_KEY, &Validation::new(Algorithm::HS512))
            .map_err(|err| anyhow::anyhow!("Invalid token: {}", err).code(401))?
            .claims;

        match claims.role {
            Role::Admin => {
                let id = claims
                    .user_id
                    .ok_or_else(|| anyhow::anyhow!("Admin token without user id").code(401))?
                    .parse()?;
                Ok(Auth::Admin(id))
            }
            Role::User => {
                let id = claims
                    .user_id
                    .ok_or_else(|| anyhow::anyhow!("User token without user id").code(401))?
                    .parse()?;
                Ok(Auth::User(id))
            }
            Role::Service => {
                let name = claims
                    .service_name
                    .ok_or_else(|| anyhow::anyhow!("Service token without name").code(401))?;
                Ok(Auth::Service(name))
            }
        }
    }

    pub fn to_token(&self) -> error::Result<String> {
        let header = Header {
            alg: Algorithm::HS512,
            ..Default::default()
        };
        let exp = Utc::now().timestamp() + ACCESS_TOKEN_TTL_SECONDS;
        let claims = match self {
            Auth::Service(name) => Claims {
                role: Role::Service,
                user_id: None,
                service_name: Some(name.clone()),
                exp,
            },
            Auth::Admin(id) => Claims {
                role: Role::Admin,
                user_id: Some(id.to_hex()),
                service_name: None,
                exp,
            },
            Auth::User(id) => Claims {
                role: Role::User,
                user_id: Some(id.to_hex()),
                service_name: None,
                exp,
            },
            Auth::None => {
                return Err(anyhow::anyhow!("Cannot create token for Auth::None").code(500))
            }
        };

        match jsonwebtoken::encode(&header, &claims, &ENCODING_KEY) {
            Ok(token) => Ok(token),
            Err(_) => Err(anyhow::anyhow!("Failed to encode token").code(500)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        std::env::set_var("JWT_SECRET", "test-secret");

        let id = ObjectId::new();
        let token = Auth::User(id).to_token().unwrap();
        assert_eq!(Auth::from_token(&token).unwrap(), Auth::User(id));

        let token = Auth::Service("waitlist".to_string()).to_token().unwrap();
        assert_eq!(
            Auth::from_token(&token).unwrap(),
            Auth::Service("waitlist".to_string())
        );
    }

    #[test]
    fn garbage_token_is_rejected() {
        std::env::set_var("JWT_SECRET", "test-secret");
        assert!(Auth::from_token("not-a-token").is_err());
    }
}
