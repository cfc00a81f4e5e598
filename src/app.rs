//! Task Manager App
//!
//! Application shell: wires services, gates the current route on the session
//! and reloads to the login page when the server ends the session.

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api::SessionEvent;
use crate::config::AppConfig;
use crate::context::{use_app_context, AppContext, Services};
use crate::dashboard::{self, DashboardSummary};
use crate::navigation;
use crate::routes::{self, Decision, Route};
use crate::session::{SessionState, SessionStatus};

#[component]
pub fn App() -> impl IntoView {
    let config = AppConfig::load();
    let login_path = config.login_path.clone();
    let services = Services::browser(config);

    services.client.events().subscribe(move |event| {
        if let SessionEvent::Invalidated { .. } = event {
            if navigation::needs_redirect(&navigation::current_path(), &login_path) {
                navigation::hard_redirect(&login_path);
            }
        }
    });
    services.session.initialize();

    let ctx = AppContext::new(services);
    provide_context(ctx.clone());

    let route = Route::from_path(&navigation::current_path());
    let state = ctx.session_state.clone();
    let resolved = ctx.session_resolved.clone();
    let decision = move || {
        let status = resolved.get().then(|| state.get().status());
        routes::decide(status, route)
    };

    view! {
        <main class="app-layout">
            {move || match decision() {
                Decision::Pending => view! { <p class="loading">"Loading..."</p> }.into_any(),
                Decision::Redirect(target) => {
                    tracing::debug!(from = route.path(), to = target.path(), "route redirect");
                    navigation::hard_redirect(target.path());
                    view! { <p class="loading">"Redirecting..."</p> }.into_any()
                }
                Decision::Allow => view! { <RouteView route=route /> }.into_any(),
            }}
        </main>
    }
}

#[component]
fn RouteView(route: Route) -> impl IntoView {
    let ctx = use_app_context();
    let authenticated = signed_in(ctx.session_state.clone());

    view! {
        <header class="top-bar">
            <h1>{route.title()}</h1>
            <Show when=authenticated>
                <LogoutButton />
            </Show>
        </header>
        {match route {
            Route::Dashboard => view! { <DashboardPanel /> }.into_any(),
            _ => view! { <div class="page" data-route=route.path()></div> }.into_any(),
        }}
    }
}

/// Tracked view of whether the session is authenticated
fn signed_in(state: ArcReadSignal<SessionState>) -> impl Fn() -> bool + Send + Sync + 'static {
    move || state.with(|state| state.status() == SessionStatus::Authenticated)
}

#[component]
fn LogoutButton() -> impl IntoView {
    let ctx = use_app_context();
    view! {
        <button class="logout-btn" on:click=move |_| ctx.with_services(Services::logout)>
            "Log out"
        </button>
    }
}

#[component]
fn DashboardPanel() -> impl IntoView {
    let ctx = use_app_context();
    let (summary, set_summary) = signal(None::<DashboardSummary>);
    let (error, set_error) = signal(None::<String>);

    let services = ctx.services();
    spawn_local(async move {
        match dashboard::load(&services.tasks, &services.reminders).await {
            Ok(loaded) => set_summary.set(Some(loaded)),
            Err(e) => set_error.set(Some(e.to_string())),
        }
    });

    view! {
        <section class="dashboard">
            {move || error.get().map(|message| view! { <p class="error">{message}</p> })}
            {move || summary.get().map(|s| view! {
                <p class="counts">{format!("{} tasks, {} reminders", s.task_count, s.reminder_count)}</p>
                <ul class="recent-tasks">
                    {s.recent_tasks.into_iter().map(|task| view! { <li>{task.name}</li> }).collect_view()}
                </ul>
            })}
        </section>
    }
}
