use mongodb::bson::{oid::ObjectId, Bson};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use common::{
    auth::Auth,
    auth_session::REFRESH_TTL_SECONDS,
    context::Context,
    default_timestamp,
    entities::{
        code::Code,
        letter::CreateLetter,
        session::Session,
        user::{PublicUser, User},
    },
    error::{self, AddCode},
    repository::Repository,
    services::{MAIL_SERVICE, PROTOCOL},
    verification::verify_captcha,
};

const SALT_LENGTH: usize = 10;
const SESSION_TOKEN_LENGTH: usize = 64;
const RESET_CODE_LENGTH: usize = 6;
const MIN_PASSWORD_LENGTH: usize = 8;

/// Reset codes are valid for one hour.
const RESET_CODE_TTL_MICROS: i64 = 60 * 60 * 1_000_000;

pub const MSG_INVALID_EMAIL: &str = "Bitte gib eine gültige E-Mail-Adresse ein.";
pub const MSG_WEAK_PASSWORD: &str = "Das Passwort muss mindestens 8 Zeichen lang sein.";
pub const MSG_EMAIL_TAKEN: &str = "Diese E-Mail-Adresse ist bereits registriert.";
pub const MSG_BAD_CREDENTIALS: &str = "E-Mail-Adresse oder Passwort ist falsch.";
pub const MSG_BAD_CODE: &str = "Der Code ist ungültig oder abgelaufen.";
pub const MSG_NOT_SIGNED_IN: &str = "Du bist nicht angemeldet.";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub captcha_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub captcha_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub captcha_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdatePasswordRequest {
    pub code: String,
    pub password: String,
}

/// Outcome of a successful login or refresh. The handler turns the tokens
/// into HTTP-only cookies; only the user ever reaches the response body.
pub struct SessionTokens {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    context: Context,
}

impl AuthService {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    fn hash_password(mut password: String, salt: &str) -> String {
        password.push_str(salt);
        sha256::digest(password)
    }

    fn request_access(auth_password: String, correct_password: &str, salt: &str) -> bool {
        Self::hash_password(auth_password, salt) == correct_password
    }

    fn random_token(length: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect()
    }

    fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Creates the account and opens a session right away, so the caller
    /// is signed in without a separate login round trip.
    pub async fn signup(
        &self,
        request: SignupRequest,
        remote_ip: Option<&str>,
    ) -> error::Result<SessionTokens> {
        let email = Self::normalize_email(&request.email);
        if email.is_empty() || !email.contains('@') {
            return Err(anyhow::anyhow!(MSG_INVALID_EMAIL).code(400));
        }
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(anyhow::anyhow!(MSG_WEAK_PASSWORD).code(400));
        }
        let name = request
            .name
            .map(|name| name.trim().to_string())
            .unwrap_or_default();

        verify_captcha(
            self.context.client(),
            request.captcha_token.as_deref().unwrap_or_default(),
            remote_ip,
        )
        .await?;

        let users = self.context.try_get_repository::<User>()?;

        let salt = Self::random_token(SALT_LENGTH);
        let user = User {
            id: ObjectId::new(),
            email,
            password: Self::hash_password(request.password, &salt),
            salt,
            name,
            created_at: default_timestamp(),
        };

        // Atomic on the email key, so concurrent signups for one address
        // cannot both create an account.
        if users
            .insert_unique("email", &Bson::String(user.email.clone()), &user)
            .await?
            .is_some()
        {
            return Err(anyhow::anyhow!(MSG_EMAIL_TAKEN).code(409));
        }

        self.open_session(user).await
    }

    pub async fn login(
        &self,
        request: LoginRequest,
        remote_ip: Option<&str>,
    ) -> error::Result<SessionTokens> {
        verify_captcha(
            self.context.client(),
            request.captcha_token.as_deref().unwrap_or_default(),
            remote_ip,
        )
        .await?;

        let users = self.context.try_get_repository::<User>()?;

        let email = Self::normalize_email(&request.email);
        let Some(user) = users.find("email", &Bson::String(email)).await? else {
            return Err(anyhow::anyhow!(MSG_BAD_CREDENTIALS).code(401));
        };

        if !Self::request_access(request.password, &user.password, &user.salt) {
            return Err(anyhow::anyhow!(MSG_BAD_CREDENTIALS).code(401));
        }

        self.open_session(user).await
    }

    async fn open_session(&self, user: User) -> error::Result<SessionTokens> {
        let sessions = self.context.try_get_repository::<Session>()?;

        let session = Session {
            id: ObjectId::new(),
            token: Self::random_token(SESSION_TOKEN_LENGTH),
            user_id: user.id,
            created_at: default_timestamp(),
        };
        sessions.insert(&session).await?;

        Ok(SessionTokens {
            access_token: Auth::User(user.id).to_token()?,
            refresh_token: session.token,
            user: user.into(),
        })
    }

    /// Exchanges a refresh token for a fresh access token. The session row
    /// stays until it outlives the refresh lifetime, then it is dropped and
    /// the caller has to log in again.
    pub async fn refresh(&self, refresh_token: &str) -> error::Result<SessionTokens> {
        let sessions = self.context.try_get_repository::<Session>()?;
        let users = self.context.try_get_repository::<User>()?;

        let Some(session) = sessions
            .find("token", &Bson::String(refresh_token.to_string()))
            .await?
        else {
            return Err(anyhow::anyhow!(MSG_NOT_SIGNED_IN).code(401));
        };

        if default_timestamp() - session.created_at > REFRESH_TTL_SECONDS * 1_000_000 {
            sessions.delete("id", &Bson::ObjectId(session.id)).await?;
            return Err(anyhow::anyhow!(MSG_NOT_SIGNED_IN).code(401));
        }

        let Some(user) = users.find("id", &Bson::ObjectId(session.user_id)).await? else {
            return Err(anyhow::anyhow!(MSG_NOT_SIGNED_IN).code(401));
        };

        Ok(SessionTokens {
            access_token: Auth::User(user.id).to_token()?,
            refresh_token: session.token,
            user: user.into(),
        })
    }

    pub async fn logout(&self, refresh_token: &str) -> error::Result<()> {
        let sessions = self.context.try_get_repository::<Session>()?;
        sessions
            .delete("token", &Bson::String(refresh_token.to_string()))
            .await?;
        Ok(())
    }

    /// Issues a reset code. Always succeeds from the caller's point of view,
    /// whether or not the address is registered.
    pub async fn reset_password(
        &self,
        request: ResetPasswordRequest,
        remote_ip: Option<&str>,
    ) -> error::Result<()> {
        verify_captcha(
            self.context.client(),
            request.captcha_token.as_deref().unwrap_or_default(),
            remote_ip,
        )
        .await?;

        let users = self.context.try_get_repository::<User>()?;

        let email = Self::normalize_email(&request.email);
        let Some(user) = users.find("email", &Bson::String(email)).await? else {
            log::info!("Password reset requested for unknown address");
            return Ok(());
        };

        let codes = self.context.try_get_repository::<Code>()?;
        let code = Code {
            id: ObjectId::new(),
            code: Self::random_token(RESET_CODE_LENGTH),
            email: user.email.clone(),
            created_at: default_timestamp(),
        };
        codes.insert(&code).await?;

        if let Err(err) = self.try_send_reset_email(&user, &code.code).await {
            log::warn!("Could not send reset code to {}: {}", user.email, err);
        }

        Ok(())
    }

    async fn try_send_reset_email(&self, user: &User, code: &str) -> error::Result<()> {
        let message = include_str!("../../templates/reset_code.txt")
            .replace("{name}", &user.name)
            .replace("{code}", code);

        let letter = CreateLetter {
            email: user.email.clone(),
            message,
            subject: "Dein Code zum Zurücksetzen des Passworts".to_string(),
        };

        self.context
            .make_request()
            .auth(self.context.server_auth())
            .post(format!(
                "{}://{}/api/mail",
                PROTOCOL.as_str(),
                MAIL_SERVICE.as_str()
            ))
            .json(&letter)
            .send()
            .await?;

        Ok(())
    }

    pub async fn update_password(&self, request: UpdatePasswordRequest) -> error::Result<()> {
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(anyhow::anyhow!(MSG_WEAK_PASSWORD).code(400));
        }

        let codes = self.context.try_get_repository::<Code>()?;

        let Some(code) = codes
            .find("code", &Bson::String(request.code.clone()))
            .await?
        else {
            return Err(anyhow::anyhow!(MSG_BAD_CODE).code(400));
        };

        // Codes are single use either way.
        codes.delete("id", &Bson::ObjectId(code.id)).await?;

        if default_timestamp() - code.created_at > RESET_CODE_TTL_MICROS {
            return Err(anyhow::anyhow!(MSG_BAD_CODE).code(400));
        }

        let users = self.context.try_get_repository::<User>()?;
        let Some(mut user) = users
            .find("email", &Bson::String(code.email.clone()))
            .await?
        else {
            return Err(anyhow::anyhow!(MSG_BAD_CODE).code(400));
        };

        let salt = Self::random_token(SALT_LENGTH);
        user.password = Self::hash_password(request.password, &salt);
        user.salt = salt;

        users.delete("id", &Bson::ObjectId(user.id)).await?;
        users.insert(&user).await?;

        Ok(())
    }

    pub async fn me(&self) -> error::Result<PublicUser> {
        let Some(id) = self.context.auth().id().copied() else {
            return Err(anyhow::anyhow!(MSG_NOT_SIGNED_IN).code(401));
        };

        let users = self.context.try_get_repository::<User>()?;
        let Some(user) = users.find("id", &Bson::ObjectId(id)).await? else {
            return Err(anyhow::anyhow!(MSG_NOT_SIGNED_IN).code(401));
        };

        Ok(user.into())
    }
}
