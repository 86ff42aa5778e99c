//! Main App Component

use leptos::prelude::*;
use leptos_router::{components::*, path};

use crate::components::CookieBanner;
use crate::pages::{HomePage, SuccessPage};

/// Root application component
#[component]
pub fn App() -> impl IntoView {
    view! {
        <Router>
            <main class="app">
                <Routes fallback=|| view! { <p>"Page not found"</p> }>
                    <Route path=path!("/") view=HomePage />
                    <Route path=path!("/posters") view=HomePage />
                    <Route path=path!("/posters/:id") view=HomePage />
                    <Route path=path!("/success") view=SuccessPage />
                </Routes>
            </main>
            <CookieBanner />
        </Router>
    }
}
