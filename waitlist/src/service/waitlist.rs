use mongodb::bson::{oid::ObjectId, Bson};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use common::{
    context::Context,
    default_timestamp,
    entities::{letter::CreateLetter, waitlist::WaitlistEntry},
    error,
    repository::{ConfirmableEntityRepository, ConfirmableRepositoryObject, Repository},
    services::{FRONTEND, MAIL_SERVICE, PROTOCOL},
};

const TOKEN_LENGTH: usize = 32;

const MSG_INVALID_EMAIL: &str = "Bitte gib eine gültige E-Mail-Adresse ein.";
const MSG_JOINED: &str =
    "Du bist dabei! Bitte bestätige deine E-Mail-Adresse über den Link, den wir dir gesendet haben.";
const MSG_ALREADY: &str = "Du bist bereits auf der Warteliste!";
const MSG_RESENT: &str =
    "Du bist bereits auf der Warteliste! Wir haben dir die Bestätigungs-E-Mail erneut gesendet.";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WaitlistSubmission {
    pub email: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WaitlistResult {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfirmOutcome {
    Success,
    /// A bad token and an already-confirmed token are indistinguishable:
    /// the conditional update matched zero rows either way.
    AlreadyOrInvalid,
}

pub struct WaitlistService {
    context: Context,
}

impl WaitlistService {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    pub async fn submit(&self, submission: WaitlistSubmission) -> error::Result<WaitlistResult> {
        let email = submission.email.trim().to_lowercase();

        // Local validation, before any repository or network call.
        if email.is_empty() || !email.contains('@') {
            return Ok(WaitlistResult {
                success: false,
                message: MSG_INVALID_EMAIL.to_string(),
            });
        }

        let entries = self
            .context
            .try_get_repository_manual::<ConfirmableRepositoryObject<WaitlistEntry>>()?;

        let entry = WaitlistEntry {
            id: ObjectId::new(),
            email,
            name: normalize(submission.name),
            role: normalize(submission.role),
            city: normalize(submission.city),
            confirmed: false,
            confirmation_token: generate_token(),
            confirmed_at: None,
            created_at: default_timestamp(),
        };

        // One atomic operation keyed on the email: either our entry goes in,
        // or we get the row a previous (possibly concurrent) submission
        // created. There is no window in which two rows can exist.
        let existing = entries
            .insert_unique("email", &Bson::String(entry.email.clone()), &entry)
            .await?;

        match existing {
            Some(existing) if existing.confirmed => Ok(WaitlistResult {
                success: true,
                message: MSG_ALREADY.to_string(),
            }),
            // Unconfirmed duplicate: re-send the existing token, do not mint
            // a new one. Deliberately a success, not an error.
            Some(existing) => {
                self.send_confirmation_email(&existing).await;
                Ok(WaitlistResult {
                    success: true,
                    message: MSG_RESENT.to_string(),
                })
            }
            None => {
                self.send_confirmation_email(&entry).await;
                Ok(WaitlistResult {
                    success: true,
                    message: MSG_JOINED.to_string(),
                })
            }
        }
    }

    pub async fn confirm(&self, token: &str) -> error::Result<ConfirmOutcome> {
        let entries = self
            .context
            .try_get_repository_manual::<ConfirmableRepositoryObject<WaitlistEntry>>()?;

        match entries.confirm_by_token(token, default_timestamp()).await? {
            Some(entry) => {
                log::info!("Waitlist entry confirmed for {}", entry.email);
                Ok(ConfirmOutcome::Success)
            }
            None => Ok(ConfirmOutcome::AlreadyOrInvalid),
        }
    }

    /// Delivery failure must not fail the registration: the entry is already
    /// stored and the user can resubmit the form to trigger a re-send.
    async fn send_confirmation_email(&self, entry: &WaitlistEntry) {
        if let Err(err) = self.try_send_confirmation_email(entry).await {
            log::warn!(
                "Failed to send confirmation email to {}: {}",
                entry.email,
                err
            );
        }
    }

    async fn try_send_confirmation_email(&self, entry: &WaitlistEntry) -> error::Result<()> {
        let confirm_url = format!(
            "{}/api/confirm?token={}",
            FRONTEND.as_str(),
            entry.confirmation_token
        );

        let greeting = entry
            .name
            .as_deref()
            .map(|name| format!(" {}", name))
            .unwrap_or_default();

        let message = include_str!("../../templates/confirmation.txt")
            .replace("{name}", &greeting)
            .replace("{link}", &confirm_url);

        let letter = CreateLetter {
            email: entry.email.clone(),
            message,
            subject: "Bitte bestätige deine Anmeldung – Das Portal".to_string(),
        };

        let response = self
            .context
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

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Mail service responded with {}", response.status()).into());
        }

        Ok(())
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
