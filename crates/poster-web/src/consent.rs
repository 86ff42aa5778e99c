//! Cookie Consent
//!
//! The visitor's choice is a small JSON blob in `localStorage`:
//!
//! ```json
//! { "necessary": true, "analytics": false, "marketing": false, "updated_at": "2026-01-01T00:00:00Z" }
//! ```
//!
//! Optional scripts are only initialised after the matching category was accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// localStorage key holding the consent blob
pub const STORAGE_KEY: &str = "cookie-consent";

/// Categories the visitor agreed to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentPreferences {
    /// Always true; the site cannot work without these
    #[serde(default = "always")]
    pub necessary: bool,
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub marketing: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn always() -> bool {
    true
}

impl ConsentPreferences {
    pub fn custom(analytics: bool, marketing: bool) -> Self {
        Self {
            necessary: true,
            analytics,
            marketing,
            updated_at: Some(Utc::now()),
        }
    }

    pub fn accept_all() -> Self {
        Self::custom(true, true)
    }

    pub fn reject_optional() -> Self {
        Self::custom(false, false)
    }
}

/// Key-value storage the consent blob lives in
pub trait ConsentStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    fn remove(&self, key: &str);
}

/// The browser's `window.localStorage`
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window().and_then(|w| w.local_storage().ok().flatten())
    }
}

impl ConsentStorage for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage().and_then(|s| s.get_item(key).ok().flatten())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let storage = Self::storage().ok_or("localStorage unavailable")?;
        storage
            .set_item(key, value)
            .map_err(|e| format!("localStorage write failed: {e:?}"))
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}

/// Stored choice, or None if the visitor has not decided.
///
/// A blob that no longer parses counts as no decision.
pub fn load(storage: &impl ConsentStorage) -> Option<ConsentPreferences> {
    let raw = storage.get(STORAGE_KEY)?;
    match serde_json::from_str::<ConsentPreferences>(&raw) {
        Ok(mut prefs) => {
            prefs.necessary = true;
            Some(prefs)
        }
        Err(e) => {
            leptos::logging::warn!("Ignoring unreadable cookie consent: {e}");
            None
        }
    }
}

pub fn save(storage: &impl ConsentStorage, prefs: &ConsentPreferences) -> Result<(), String> {
    let prefs = ConsentPreferences {
        necessary: true,
        ..prefs.clone()
    };
    let json = serde_json::to_string(&prefs).map_err(|e| e.to_string())?;
    storage.set(STORAGE_KEY, &json)
}

/// Forget the choice so the banner shows again
pub fn clear(storage: &impl ConsentStorage) {
    storage.remove(STORAGE_KEY);
}

/// Which optional initialisers ran
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Applied {
    pub analytics: bool,
    pub marketing: bool,
}

/// Start the optional scripts the visitor allowed
pub fn apply(prefs: &ConsentPreferences) -> Applied {
    if prefs.analytics {
        init_analytics();
    }
    if prefs.marketing {
        init_marketing();
    }
    Applied {
        analytics: prefs.analytics,
        marketing: prefs.marketing,
    }
}

// No analytics or marketing vendor is wired up yet; these are the hook points.
fn init_analytics() {
    leptos::logging::log!("analytics consent granted");
}

fn init_marketing() {
    leptos::logging::log!("marketing consent granted");
}
