//! Routes and Route Guard
//!
//! The guard is a pure function of the session status at navigation time.
//! Before the session is initialized it answers `Pending`, so nothing renders
//! until the stored token has been read.

use crate::session::{Session, SessionStatus};

/// What a route requires of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Root,
    Login,
    Register,
    VerifyEmail,
    Dashboard,
    Tasks,
    Reminders,
    NotFound,
}

impl Route {
    pub fn from_path(path: &str) -> Self {
        let path = path.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
        match path.trim_end_matches('/') {
            "" => Route::Root,
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/verify-email" => Route::VerifyEmail,
            "/dashboard" => Route::Dashboard,
            "/tasks" => Route::Tasks,
            "/reminders" => Route::Reminders,
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::VerifyEmail => "/verify-email",
            Route::Dashboard => "/dashboard",
            Route::Tasks => "/tasks",
            Route::Reminders => "/reminders",
            Route::NotFound => "/404",
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Dashboard | Route::Tasks | Route::Reminders => Access::Authenticated,
            _ => Access::Public,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Root | Route::Dashboard => "Dashboard",
            Route::Login => "Log in",
            Route::Register => "Create an account",
            Route::VerifyEmail => "Verify your email",
            Route::Tasks => "Tasks",
            Route::Reminders => "Reminders",
            Route::NotFound => "Page not found",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(Route),
    /// Session not initialized yet; render nothing
    Pending,
}

/// Decide a navigation. `status` is `None` while the session is unresolved.
pub fn decide(status: Option<SessionStatus>, route: Route) -> Decision {
    let Some(status) = status else {
        return Decision::Pending;
    };
    if route == Route::Root {
        return Decision::Redirect(Route::Dashboard);
    }
    match (route.access(), status) {
        (Access::Public, _) | (Access::Authenticated, SessionStatus::Authenticated) => Decision::Allow,
        (Access::Authenticated, _) => Decision::Redirect(Route::Login),
    }
}

/// Convenience over a live session, read untracked
pub fn guard(session: &Session, route: Route) -> Decision {
    decide(session.resolved_status(), route)
}
