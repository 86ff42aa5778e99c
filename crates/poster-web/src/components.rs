//! UI Components

use leptos::prelude::*;

use crate::api::PosterListing;
use crate::consent::{self, ConsentPreferences, LocalStorage};

/// Poster tile with a buy button
#[component]
pub fn PosterCard(poster: PosterListing, on_buy: Callback<String>) -> impl IntoView {
    let id = poster.id.clone();
    let price = poster.price_label();

    view! {
        <div class="poster">
            {poster.image_url.clone().map(|src| view! { <img src=src alt=poster.title.clone() /> })}
            <h3>{poster.title.clone()}</h3>
            <p class="description">{poster.description.clone().unwrap_or_default()}</p>
            <div class="price">{price}</div>
            <button class="btn btn-primary" on:click=move |_| on_buy.run(id.clone())>
                "Buy"
            </button>
        </div>
    }
}

/// Cookie banner shown until the visitor makes a choice
#[component]
pub fn CookieBanner() -> impl IntoView {
    let stored = consent::load(&LocalStorage);
    if let Some(prefs) = &stored {
        consent::apply(prefs);
    }
    let (decided, set_decided) = signal(stored.is_some());

    let choose = move |prefs: ConsentPreferences| {
        if let Err(e) = consent::save(&LocalStorage, &prefs) {
            leptos::logging::warn!("Could not store cookie consent: {e}");
        }
        consent::apply(&prefs);
        set_decided.set(true);
    };

    let reopen = move |_| {
        consent::clear(&LocalStorage);
        set_decided.set(false);
    };

    view! {
        <Show
            when=move || !decided.get()
            fallback=move || view! {
                <button class="cookie-settings" on:click=reopen>"Cookie settings"</button>
            }
        >
            <div class="cookie-banner">
                <p>
                    "We use necessary cookies to run the shop. With your permission we also "
                    "use analytics and marketing cookies."
                </p>
                <div class="cookie-actions">
                    <button class="btn" on:click=move |_| choose(ConsentPreferences::reject_optional())>
                        "Necessary only"
                    </button>
                    <button class="btn" on:click=move |_| choose(ConsentPreferences::custom(true, false))>
                        "Allow analytics"
                    </button>
                    <button class="btn btn-primary" on:click=move |_| choose(ConsentPreferences::accept_all())>
                        "Accept all"
                    </button>
                </div>
            </div>
        </Show>
    }
}
