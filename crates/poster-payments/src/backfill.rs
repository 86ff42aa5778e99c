//! Purchase backfill
//!
//! Imports recent paid checkout sessions from Stripe as purchase rows. Used to
//! recover purchases whose webhook never arrived.

use serde::Serialize;

use poster_store::{CatalogStore, NewPurchase, PurchaseStatus, PurchaseStore};

use crate::checkout::PaymentGateway;
use crate::error::Result;

/// Stripe's page size cap for session listing
pub const MAX_BACKFILL_SESSIONS: u8 = 100;

/// Per-item tallies of one backfill run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub processed: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

/// Insert a purchase for every paid session that does not have one yet.
///
/// Items are independent: a failure is counted and the run moves on.
pub async fn backfill_purchases<S>(
    gateway: &dyn PaymentGateway,
    store: &S,
    limit: u8,
) -> Result<BackfillReport>
where
    S: CatalogStore + PurchaseStore + ?Sized,
{
    let sessions = gateway
        .recent_sessions(limit.min(MAX_BACKFILL_SESSIONS))
        .await?;
    let mut report = BackfillReport::default();

    for session in sessions {
        report.processed += 1;

        if !session.is_paid() {
            report.skipped += 1;
            continue;
        }
        let Some(poster_id) = session.poster_id else {
            tracing::debug!(session_id = %session.session_id, "Session has no poster_id");
            report.skipped += 1;
            continue;
        };

        let canva_link = match store.get_poster(poster_id).await {
            Ok(poster) => poster.and_then(|p| p.canva_link),
            Err(e) => {
                tracing::warn!(error = %e, session_id = %session.session_id, "Poster lookup failed");
                report.errors += 1;
                continue;
            }
        };

        let purchase = NewPurchase {
            stripe_session_id: session.session_id.clone(),
            poster_id,
            customer_email: session.customer_email,
            status: PurchaseStatus::Completed,
            receipt_url: None,
            canva_link,
        };

        match store.insert_if_absent(&purchase).await {
            Ok(outcome) if outcome.is_created() => report.inserted += 1,
            Ok(_) => report.skipped += 1,
            Err(e) => {
                tracing::warn!(error = %e, session_id = %session.session_id, "Backfill insert failed");
                report.errors += 1;
            }
        }
    }

    tracing::info!(
        processed = report.processed,
        inserted = report.inserted,
        skipped = report.skipped,
        errors = report.errors,
        "Backfill finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use poster_store::{MemoryStore, Poster};
    use uuid::Uuid;

    use crate::checkout::{CheckoutRequest, CheckoutSession};
    use crate::error::PaymentError;
    use crate::webhook::SessionDetails;

    struct ListingGateway(Vec<SessionDetails>);

    #[async_trait]
    impl PaymentGateway for ListingGateway {
        fn webhook_secret(&self) -> &str {
            "whsec_unused"
        }

        async fn create_checkout_session(&self, _request: CheckoutRequest) -> Result<CheckoutSession> {
            Err(PaymentError::Stripe("not used".into()))
        }

        async fn receipt_url(&self, _payment_intent_id: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn recent_sessions(&self, limit: u8) -> Result<Vec<SessionDetails>> {
            Ok(self.0.iter().take(usize::from(limit)).cloned().collect())
        }
    }

    fn session(id: &str, poster_id: Option<Uuid>, paid: bool) -> SessionDetails {
        SessionDetails {
            session_id: id.into(),
            poster_id,
            customer_email: Some("buyer@example.com".into()),
            payment_intent_id: None,
            status: Some(if paid { "complete" } else { "open" }.into()),
            payment_status: Some(if paid { "paid" } else { "unpaid" }.into()),
        }
    }

    #[tokio::test]
    async fn test_backfill_counts_each_outcome() {
        let poster = Poster::new("Dune Sea", 1800).with_canva_link("https://canva.example/d");
        let store = MemoryStore::with_posters([poster.clone()]);
        store
            .insert_if_absent(&NewPurchase::completed("cs_existing", poster.id))
            .await
            .unwrap();

        let gateway = ListingGateway(vec![
            session("cs_new", Some(poster.id), true),
            session("cs_existing", Some(poster.id), true),
            session("cs_open", Some(poster.id), false),
            session("cs_orphan", None, true),
            session("", Some(poster.id), true),
        ]);

        let report = backfill_purchases(&gateway, &store, MAX_BACKFILL_SESSIONS)
            .await
            .unwrap();

        assert_eq!(
            report,
            BackfillReport {
                processed: 5,
                inserted: 1,
                skipped: 3,
                errors: 1,
            }
        );
        let row = store.get_purchase("cs_new").await.unwrap().unwrap();
        assert_eq!(row.canva_link.as_deref(), Some("https://canva.example/d"));
    }
}
