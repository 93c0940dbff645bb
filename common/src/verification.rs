use serde::Deserialize;

use crate::error::{self, AddCode};

const SITEVERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(rename = "error-codes")]
    error_codes: Option<Vec<String>>,
}

/// Verifies a Cloudflare Turnstile token. Verification is skipped when
/// TURNSTILE_SECRET_KEY is not configured (development mode).
pub async fn verify_captcha(
    client: &reqwest::Client,
    token: &str,
    remote_ip: Option<&str>,
) -> error::Result<()> {
    let Ok(secret) = std::env::var("TURNSTILE_SECRET_KEY") else {
        log::warn!("TURNSTILE_SECRET_KEY not configured, skipping captcha verification");
        return Ok(());
    };

    if token.is_empty() {
        return Err(anyhow::anyhow!("Captcha token is required").code(400));
    }

    let mut form = vec![
        ("secret", secret),
        ("response", token.to_string()),
    ];
    if let Some(ip) = remote_ip {
        form.push(("remoteip", ip.to_string()));
    }

    let response = client.post(SITEVERIFY_URL).form(&form).send().await?;

    if !response.status().is_success() {
        return Err(anyhow::anyhow!("Captcha verification request failed").code(400));
    }

    let result: SiteverifyResponse = response.json().await?;
    if !result.success {
        let codes = result
            .error_codes
            .map(|codes| codes.join(", "))
            .unwrap_or_else(|| "unknown_error".to_string());
        return Err(anyhow::anyhow!("Captcha verification failed: {}", codes).code(400));
    }

    Ok(())
}
