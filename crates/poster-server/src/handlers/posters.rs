//! Catalog listing

use axum::{Json, extract::State};
use serde::Serialize;
use uuid::Uuid;

use poster_store::{CatalogStore, Poster};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PosterListing {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price_cents: i64,
    pub currency: String,
}

impl From<Poster> for PosterListing {
    fn from(poster: Poster) -> Self {
        Self {
            id: poster.id,
            title: poster.title,
            description: poster.description,
            image_url: poster.image_url,
            price_cents: poster.price_cents,
            currency: poster.currency,
        }
    }
}

/// Published posters. Delivery links stay server-side.
pub async fn list_posters(State(state): State<AppState>) -> Result<Json<Vec<PosterListing>>, ApiError> {
    let posters = state.store.list_published().await?;
    Ok(Json(posters.into_iter().map(Into::into).collect()))
}
