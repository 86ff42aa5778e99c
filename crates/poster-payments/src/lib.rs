//! # poster-payments
//!
//! Payment processing and order fulfillment for the poster shop.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌──────────────────┐
//! │  Poster     │────▶│  Stripe Hosted  │────▶│  /success page   │
//! │  page       │     │  Checkout Page  │     │  (purchase look) │
//! └─────────────┘     └────────┬────────┘     └──────────────────┘
//!                              │ checkout.session.completed
//!                              ▼
//!                     ┌─────────────────┐     ┌──────────────────┐
//!                     │ WebhookHandler  │────▶│ purchases table  │
//!                     │ (verify + parse)│     └──────────────────┘
//!                     └────────┬────────┘
//!                              ▼
//!                     ┌─────────────────┐
//!                     │ Mailer (EmailJS)│
//!                     └─────────────────┘
//! ```
//!
//! Stripe is reached through the [`PaymentGateway`] trait and the email
//! provider through [`Mailer`], so the webhook flow can be exercised without
//! network access.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use poster_payments::{CheckoutRequest, PaymentGateway, StripeClient};
//!
//! let client = StripeClient::new("sk_test_xxx", "whsec_xxx");
//!
//! let session = client.create_checkout_session(CheckoutRequest {
//!     poster,
//!     customer_email: None,
//!     success_url: "https://posters.example/success?session_id={CHECKOUT_SESSION_ID}".into(),
//!     cancel_url: "https://posters.example/".into(),
//! }).await?;
//!
//! // Redirect user to: session.url
//! ```

mod backfill;
mod checkout;
mod email;
mod error;
mod webhook;

pub use backfill::{BackfillReport, MAX_BACKFILL_SESSIONS, backfill_purchases};
pub use checkout::{CheckoutRequest, CheckoutSession, PaymentGateway, StripeClient};
pub use email::{EmailJsConfig, EmailJsMailer, Mailer, PurchaseEmail};
pub use error::{PaymentError, Result};
pub use webhook::{
    SessionDetails, WebhookEvent, WebhookHandler, WebhookOutcome, sign_payload, verify_signature,
};
