//! Cross-service publish to the central marketplace catalog
//!
//! Best-effort mirror: a failed publish is logged and dropped, the local
//! listing is the source of truth and is never rolled back. The publisher
//! is only constructed when `MARKETPLACE_SERVICE_URL` is configured.

use std::time::Duration;

use serde::Serialize;

use crate::db::models::Listing;

/// Attempts per publish, with linear backoff between them
const PUBLISH_ATTEMPTS: u32 = 3;
const PUBLISH_BACKOFF: Duration = Duration::from_millis(500);
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Payload mirrored to the central catalog
///
/// Flat snapshot: the remote service keeps its own schema, it only needs
/// identity, terms and discovery fields.
#[derive(Debug, Serialize)]
struct PublishPayload<'a> {
    listing_id: String,
    farmer_id: String,
    crop_name: &'a str,
    quantity: rust_decimal::Decimal,
    unit: shared::listing::QuantityUnit,
    price_per_unit: rust_decimal::Decimal,
    currency: &'a str,
    is_organic: bool,
    grade: &'a str,
    status: shared::listing::ListingStatus,
    expires_at: String,
}

/// HTTP client for the central marketplace catalog
#[derive(Clone)]
pub struct MarketplacePublisher {
    client: reqwest::Client,
    base_url: String,
}

impl MarketplacePublisher {
    pub fn new(base_url: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(PUBLISH_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Push a listing snapshot to the central catalog
    ///
    /// Retries transient failures a bounded number of times; the caller
    /// treats any final error as log-and-continue.
    pub async fn publish(&self, listing: &Listing) -> anyhow::Result<()> {
        let Some(id) = &listing.id else {
            anyhow::bail!("listing has no record id");
        };
        let payload = PublishPayload {
            listing_id: id.to_string(),
            farmer_id: listing.farmer.to_string(),
            crop_name: &listing.crop_name,
            quantity: listing.quantity.available,
            unit: listing.quantity.unit,
            price_per_unit: listing.pricing.price_per_unit,
            currency: &listing.pricing.currency,
            is_organic: listing.quality.is_organic,
            grade: &listing.quality.grade,
            status: listing.status,
            expires_at: listing.expires_at.to_string(),
        };
        let url = format!("{}/internal/listings", self.base_url);

        let request_id = uuid::Uuid::new_v4().to_string();

        let mut last_err = None;
        for attempt in 1..=PUBLISH_ATTEMPTS {
            match self
                .client
                .post(&url)
                .header("x-request-id", &request_id)
                .json(&payload)
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => {
                    tracing::info!(listing = %payload.listing_id, "published to marketplace catalog");
                    return Ok(());
                }
                Ok(resp) => {
                    let status = resp.status();
                    // 4xx means the payload itself is rejected, retrying
                    // cannot help
                    if status.is_client_error() {
                        anyhow::bail!("marketplace rejected publish: {status}");
                    }
                    last_err = Some(anyhow::anyhow!("marketplace returned {status}"));
                }
                Err(e) => {
                    last_err = Some(e.into());
                }
            }
            if attempt < PUBLISH_ATTEMPTS {
                tracing::debug!(attempt, listing = %payload.listing_id, "publish attempt failed, retrying");
                tokio::time::sleep(PUBLISH_BACKOFF * attempt).await;
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("publish failed")))
    }
}
