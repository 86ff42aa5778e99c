//! Purchase confirmation emails
//!
//! Emails are rendered by a hosted template service (EmailJS). This side only
//! fills in the template parameters and posts them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{PaymentError, Result};

const DEFAULT_API_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// Sends purchase emails
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &PurchaseEmail) -> Result<()>;
}

/// Template parameters for a purchase confirmation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseEmail {
    pub to_email: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub poster_title: String,
    #[serde(default)]
    pub canva_link: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// EmailJS account settings
#[derive(Clone, Debug)]
pub struct EmailJsConfig {
    pub api_url: String,
    pub service_id: String,
    pub template_id: String,

    /// Sent as `user_id`
    pub public_key: String,

    /// Sent as `accessToken`; required when the account enforces it
    pub private_key: Option<String>,
}

impl EmailJsConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let required = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| PaymentError::Config(format!("{name} not set")))
        };

        Ok(Self {
            api_url: std::env::var("EMAILJS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into()),
            service_id: required("EMAILJS_SERVICE_ID")?,
            template_id: required("EMAILJS_TEMPLATE_ID")?,
            public_key: required("EMAILJS_PUBLIC_KEY")?,
            private_key: std::env::var("EMAILJS_PRIVATE_KEY").ok().filter(|v| !v.is_empty()),
        })
    }
}

/// Mailer posting to the EmailJS REST API
pub struct EmailJsMailer {
    client: reqwest::Client,
    config: EmailJsConfig,
}

impl EmailJsMailer {
    pub fn new(config: EmailJsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Request body for one email
    fn payload(&self, email: &PurchaseEmail) -> serde_json::Value {
        let mut body = json!({
            "service_id": self.config.service_id,
            "template_id": self.config.template_id,
            "user_id": self.config.public_key,
            "template_params": {
                "to_email": email.to_email,
                "customer_name": email.customer_name.as_deref().unwrap_or("there"),
                "poster_title": email.poster_title,
                "canva_link": email.canva_link.as_deref().unwrap_or_default(),
                "receipt_url": email.receipt_url.as_deref().unwrap_or_default(),
                "session_id": email.session_id.as_deref().unwrap_or_default(),
            },
        });

        if let Some(key) = &self.config.private_key {
            body["accessToken"] = json!(key);
        }

        body
    }
}

#[async_trait]
impl Mailer for EmailJsMailer {
    async fn send(&self, email: &PurchaseEmail) -> Result<()> {
        let response = self
            .client
            .post(&self.config.api_url)
            .json(&self.payload(email))
            .send()
            .await
            .map_err(|e| PaymentError::Email(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(to = %email.to_email, poster = %email.poster_title, "Purchase email sent");
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(PaymentError::Email(format!("{status}: {text}")))
        }
    }
}
