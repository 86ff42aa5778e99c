//! Catalog Page

use leptos::prelude::*;
use leptos_router::hooks::use_query_map;

use crate::api;
use crate::components::PosterCard;

/// Banner text for a checkout the buyer backed out of
fn checkout_notice(canceled: Option<&str>) -> Option<&'static str> {
    matches!(canceled, Some("true" | "1"))
        .then_some("Checkout canceled. You have not been charged.")
}

#[component]
pub fn HomePage() -> impl IntoView {
    let query = use_query_map();
    let notice = move || query.with(|q| checkout_notice(q.get("canceled").as_deref()));
    let (posters, set_posters) = signal(Vec::<api::PosterListing>::new());
    let (error, set_error) = signal(None::<String>);

    leptos::task::spawn_local(async move {
        match api::list_posters().await {
            Ok(list) => set_posters.set(list),
            Err(e) => set_error.set(Some(e)),
        }
    });

    let buy = Callback::new(move |poster_id: String| {
        leptos::task::spawn_local(async move {
            match api::create_checkout(&poster_id).await {
                Ok(url) => {
                    if let Some(window) = web_sys::window() {
                        let _ = window.location().set_href(&url);
                    }
                }
                Err(e) => set_error.set(Some(e)),
            }
        });
    });

    view! {
        <div class="home">
            <header class="hero">
                <h1>"Posters"</h1>
                <p class="tagline">"Printable designs, delivered as an editable Canva link"</p>
            </header>

            {move || notice().map(|text| view! { <p class="notice">{text}</p> })}
            {move || error.get().map(|e| view! { <p class="error">{e}</p> })}

            <section class="posters">
                <For
                    each=move || posters.get()
                    key=|poster| poster.id.clone()
                    children=move |poster| view! { <PosterCard poster=poster on_buy=buy /> }
                />
            </section>
        </div>
    }
}
