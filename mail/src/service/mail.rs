use lettre::{transport::smtp::authentication::Credentials, Message, SmtpTransport, Transport};
use mongodb::bson::oid::ObjectId;

use common::{
    context::Context,
    entities::letter::{CreateLetter, Letter},
    error::{self, AddCode},
    repository::Repository,
};

lazy_static::lazy_static! {
    static ref SMTP_RELAY: String =
        std::env::var("SMTP_RELAY").unwrap_or_else(|_| "smtp.gmail.com".to_string());
    static ref EMAIL_ADDRESS: String = std::env::var("HELLO_MAIL_ADDRESS")
        .unwrap_or_else(|_| "no-reply@das-portal.org".to_string());
    static ref EMAIL_PASSWORD: String =
        std::env::var("HELLO_MAIL_PASSWORD").unwrap_or_default();
}

pub struct MailService {
    pub context: Context,
}

impl MailService {
    pub fn new(context: Context) -> MailService {
        MailService { context }
    }

    pub(crate) fn build_message(letter: &Letter) -> error::Result<Message> {
        Ok(Message::builder()
            .from(EMAIL_ADDRESS.parse()?)
            .to(letter.email.parse()?)
            .subject(letter.subject.clone())
            .body(letter.message.clone())?)
    }

    fn send_email(letter: &Letter) -> error::Result<()> {
        let message = Self::build_message(letter)?;

        let mailer = SmtpTransport::relay(SMTP_RELAY.as_str())?
            .credentials(Credentials::new(
                EMAIL_ADDRESS.to_string(),
                EMAIL_PASSWORD.to_string(),
            ))
            .build();

        mailer
            .send(&message)
            .map_err(|err| anyhow::anyhow!("Error sending email: {}", err).code(502))?;

        Ok(())
    }

    /// Archives the letter, then hands it to the SMTP relay. Only services
    /// and admins may send; user and anonymous callers are rejected.
    pub async fn send_letter(&self, letter: CreateLetter) -> error::Result<()> {
        let auth = self.context.auth();
        if !auth.full_access() {
            return Err(anyhow::anyhow!("Not allowed to send mail: {:?}", auth).code(403));
        }

        let letters = self.context.try_get_repository::<Letter>()?;

        let letter = Letter {
            id: ObjectId::new(),
            email: letter.email,
            message: letter.message,
            subject: letter.subject,
        };

        letters.insert(&letter).await?;

        Self::send_email(&letter)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::oid::ObjectId;

    use common::entities::letter::Letter;

    use super::MailService;

    fn letter(email: &str) -> Letter {
        Letter {
            id: ObjectId::new(),
            email: email.to_string(),
            message: "Hallo!".to_string(),
            subject: "Testnachricht".to_string(),
        }
    }

    #[test]
    fn message_carries_recipient() {
        let message = MailService::build_message(&letter("anna@example.com")).unwrap();
        let recipients: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(|address| address.to_string())
            .collect();
        assert_eq!(recipients, vec!["anna@example.com".to_string()]);
    }

    #[test]
    fn invalid_recipient_is_rejected() {
        assert!(MailService::build_message(&letter("keine-adresse")).is_err());
    }
}
