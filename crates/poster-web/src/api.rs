//! API Client

use serde::Deserialize;

/// Poster as listed by `/api/posters`
#[derive(Clone, Debug, Deserialize)]
pub struct PosterListing {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub price_cents: i64,
    pub currency: String,
}

impl PosterListing {
    pub fn price_label(&self) -> String {
        format!(
            "{}.{:02} {}",
            self.price_cents / 100,
            self.price_cents % 100,
            self.currency.to_uppercase()
        )
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PosterRef {
    pub title: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Purchase as returned by `/api/purchases/{session_id}`
#[derive(Clone, Debug, Deserialize)]
pub struct PurchaseSummary {
    pub session_id: String,
    pub status: String,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub canva_link: Option<String>,
    #[serde(default)]
    pub poster: Option<PosterRef>,
}

fn origin() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_else(|| "http://localhost:3000".into())
}

async fn error_message(response: reqwest::Response) -> String {
    let data: serde_json::Value = response.json().await.unwrap_or_default();
    data["error"].as_str().unwrap_or("Request failed").to_string()
}

/// Fetch published posters
pub async fn list_posters() -> Result<Vec<PosterListing>, String> {
    let response = reqwest::get(format!("{}/api/posters", origin()))
        .await
        .map_err(|e| e.to_string())?;

    if response.status().is_success() {
        response.json().await.map_err(|e| e.to_string())
    } else {
        Err(error_message(response).await)
    }
}

/// Create a Stripe checkout session; returns the URL to redirect to
pub async fn create_checkout(poster_id: &str) -> Result<String, String> {
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/checkout", origin()))
        .json(&serde_json::json!({ "poster_id": poster_id }))
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if response.status().is_success() {
        let data: serde_json::Value = response.json().await.map_err(|e| e.to_string())?;
        data["url"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| "No checkout URL returned".to_string())
    } else {
        Err(error_message(response).await)
    }
}

/// Look up the purchase for a finished checkout
pub async fn get_purchase(session_id: &str) -> Result<PurchaseSummary, String> {
    let response = reqwest::get(format!("{}/api/purchases/{session_id}", origin()))
        .await
        .map_err(|e| e.to_string())?;

    if response.status().is_success() {
        response.json().await.map_err(|e| e.to_string())
    } else {
        Err(error_message(response).await)
    }
}
