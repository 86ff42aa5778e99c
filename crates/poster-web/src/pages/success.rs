//! Checkout Success Page

use leptos::prelude::*;
use leptos_router::hooks::use_query_map;

use crate::api;

#[component]
pub fn SuccessPage() -> impl IntoView {
    let query = use_query_map();
    let (purchase, set_purchase) = signal(None::<api::PurchaseSummary>);
    let (error, set_error) = signal(None::<String>);

    match query.get_untracked().get("session_id") {
        Some(session_id) => leptos::task::spawn_local(async move {
            match api::get_purchase(&session_id).await {
                Ok(found) => set_purchase.set(Some(found)),
                Err(e) => set_error.set(Some(e)),
            }
        }),
        None => set_error.set(Some("Missing session id".into())),
    }

    view! {
        <div class="success">
            <h1>"Thank you!"</h1>
            {move || error.get().map(|e| view! {
                <p class="error">{e}</p>
                <p>"If you just paid, your purchase may take a few seconds to appear. Refresh to retry."</p>
            })}
            {move || purchase.get().map(|p| view! {
                <div class="purchase">
                    <h2>{p.poster.as_ref().map_or_else(|| "Your poster".to_string(), |poster| poster.title.clone())}</h2>
                    <p class="status">"Status: " {p.status.clone()}</p>
                    {p.canva_link.clone().map(|link| view! {
                        <a class="btn btn-primary" href=link target="_blank">"Open your design"</a>
                    })}
                    {p.receipt_url.clone().map(|link| view! {
                        <a class="btn" href=link target="_blank">"View receipt"</a>
                    })}
                    <p class="session">"Order reference: " {p.session_id.clone()}</p>
                </div>
            })}
        </div>
    }
}
