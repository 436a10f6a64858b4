use anyhow::Context;
use axum::async_trait;
use serde_json::json;
use tracing::{debug, error};

use crate::config::MailConfig;

pub mod templates;

const WELCOME_TEMPLATE_UUID: &str = "e65925d1-a9d1-4a40-ae7c-d92b37d593df";

/// One outbound message. HTML sends carry a subject and a category label;
/// template sends reference a provider-side template with variables.
#[derive(Debug, Clone)]
pub enum Email {
    Html {
        subject: String,
        html: String,
        category: &'static str,
    },
    Template {
        template_uuid: &'static str,
        variables: serde_json::Value,
    },
}

impl Email {
    pub fn verification(code: &str) -> Self {
        Self::Html {
            subject: "Verify your email".into(),
            html: templates::VERIFICATION_EMAIL_TEMPLATE.replace("{verificationCode}", code),
            category: "Email Verification",
        }
    }

    pub fn welcome(name: &str) -> Self {
        Self::Template {
            template_uuid: WELCOME_TEMPLATE_UUID,
            variables: json!({
                "company_info_name": "Authflow",
                "name": name,
            }),
        }
    }

    pub fn password_reset(reset_url: &str) -> Self {
        Self::Html {
            subject: "Reset your password".into(),
            html: templates::PASSWORD_RESET_REQUEST_TEMPLATE.replace("{resetURL}", reset_url),
            category: "Password Reset",
        }
    }

    pub fn password_reset_success() -> Self {
        Self::Html {
            subject: "Password Reset Successful".into(),
            html: templates::PASSWORD_RESET_SUCCESS_TEMPLATE.into(),
            category: "Password Reset",
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, email: Email) -> anyhow::Result<()>;
}

/// Mailtrap-style HTTP send API client.
#[derive(Clone)]
pub struct MailtrapClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    sender_email: String,
    sender_name: String,
}

impl MailtrapClient {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            sender_email: config.sender_email.clone(),
            sender_name: config.sender_name.clone(),
        }
    }

    fn payload(&self, to: &str, email: Email) -> serde_json::Value {
        let from = json!({ "email": self.sender_email, "name": self.sender_name });
        let recipient = json!([{ "email": to }]);
        match email {
            Email::Html {
                subject,
                html,
                category,
            } => json!({
                "from": from,
                "to": recipient,
                "subject": subject,
                "html": html,
                "category": category,
            }),
            Email::Template {
                template_uuid,
                variables,
            } => json!({
                "from": from,
                "to": recipient,
                "template_uuid": template_uuid,
                "template_variables": variables,
            }),
        }
    }
}

#[async_trait]
impl Mailer for MailtrapClient {
    async fn send(&self, to: &str, email: Email) -> anyhow::Result<()> {
        let payload = self.payload(to, email);
        let response = self
            .http
            .post(format!("{}/api/send", self.endpoint))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .context("mail send request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "mail API rejected send");
            anyhow::bail!("mail API returned {status}");
        }
        debug!(to = %to, "email sent");
        Ok(())
    }
}
