//! Router Module
//!
//! Static route table, the global navigation guard, and current-location
//! tracking. The router observes the session so that an expired session
//! sends the user back to the login page.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::session::{AuthState, SessionContext, SessionEvent, SessionListener};

pub const LOGIN_PATH: &str = "/login";
pub const LOGOUT_PATH: &str = "/logout";
pub const DASHBOARD_PATH: &str = "/dashboard";

const MAX_REDIRECTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteName {
    Login,
    Logout,
    Home,
    Dashboard,
    Customers,
    Deals,
    Reports,
    Settings,
    Approvals,
    Users,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    /// Roles allowed to enter; empty means any authenticated user
    pub roles: &'static [&'static str],
}

impl RouteMeta {
    const PUBLIC: RouteMeta = RouteMeta {
        requires_auth: false,
        roles: &[],
    };
    const PROTECTED: RouteMeta = RouteMeta {
        requires_auth: true,
        roles: &[],
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub name: RouteName,
    pub meta: RouteMeta,
    pub redirect: Option<&'static str>,
}

const fn route(path: &'static str, name: RouteName, meta: RouteMeta) -> Route {
    Route {
        path,
        name,
        meta,
        redirect: None,
    }
}

pub static ROUTES: &[Route] = &[
    route(LOGIN_PATH, RouteName::Login, RouteMeta::PUBLIC),
    route(LOGOUT_PATH, RouteName::Logout, RouteMeta::PUBLIC),
    Route {
        path: "/",
        name: RouteName::Home,
        meta: RouteMeta::PROTECTED,
        redirect: Some(DASHBOARD_PATH),
    },
    route(DASHBOARD_PATH, RouteName::Dashboard, RouteMeta::PROTECTED),
    route("/customers", RouteName::Customers, RouteMeta::PROTECTED),
    route("/deals", RouteName::Deals, RouteMeta::PROTECTED),
    route("/reports", RouteName::Reports, RouteMeta::PROTECTED),
    route("/settings", RouteName::Settings, RouteMeta::PROTECTED),
    route("/approvals", RouteName::Approvals, RouteMeta::PROTECTED),
    route(
        "/users",
        RouteName::Users,
        RouteMeta {
            requires_auth: true,
            roles: &["ADMIN"],
        },
    ),
];

/// Match a location against the route table, ignoring query, fragment
/// and a trailing slash.
pub fn resolve(location: &str) -> Option<&'static Route> {
    let path = location.split(['?', '#']).next().unwrap_or_default();
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    ROUTES.iter().find(|r| r.path == path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(&'static str),
}

/// Decide whether navigation to `to` may complete.
pub fn guard(to: &Route, auth: &AuthState) -> GuardDecision {
    if to.meta.requires_auth && !auth.authenticated {
        return GuardDecision::Redirect(LOGIN_PATH);
    }
    if to.path == LOGIN_PATH && auth.authenticated {
        return GuardDecision::Redirect(DASHBOARD_PATH);
    }
    if !to.meta.roles.is_empty() {
        let allowed = auth
            .role
            .as_deref()
            .is_some_and(|role| to.meta.roles.iter().any(|allowed| *allowed == role));
        if !allowed {
            return GuardDecision::Redirect(DASHBOARD_PATH);
        }
    }
    GuardDecision::Proceed
}

/// Outcome of a completed navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub requested: String,
    pub location: &'static str,
    pub route: RouteName,
    pub redirected: bool,
}

pub struct Router {
    session: SessionContext,
    current: watch::Sender<&'static str>,
}

impl Router {
    /// Create a router starting at the login page and subscribe it to `session`
    pub fn new(session: SessionContext) -> Arc<Self> {
        let (current, _) = watch::channel(LOGIN_PATH);
        let router = Arc::new(Self {
            session: session.clone(),
            current,
        });
        session.subscribe(&router);
        router
    }

    /// Navigate to `location`, following route redirects and guard decisions
    pub fn navigate(&self, location: &str) -> Result<Navigation, RouterError> {
        let auth = self.session.auth_state();
        let mut target =
            resolve(location).ok_or_else(|| RouterError::NotFound(location.to_string()))?;
        let mut redirected = false;

        for _ in 0..MAX_REDIRECTS {
            let next = match target.redirect {
                Some(path) => path,
                None => match guard(target, &auth) {
                    GuardDecision::Proceed => {
                        self.current.send_replace(target.path);
                        info!("Navigated to {}", target.path);
                        return Ok(Navigation {
                            requested: location.to_string(),
                            location: target.path,
                            route: target.name,
                            redirected,
                        });
                    }
                    GuardDecision::Redirect(path) => path,
                },
            };

            debug!("Redirecting {} -> {}", target.path, next);
            target = resolve(next).ok_or_else(|| RouterError::NotFound(next.to_string()))?;
            redirected = true;
        }

        Err(RouterError::RedirectLoop(location.to_string()))
    }

    pub fn current(&self) -> &'static str {
        *self.current.borrow()
    }

    /// Watch the current location
    pub fn subscribe(&self) -> watch::Receiver<&'static str> {
        self.current.subscribe()
    }
}

impl SessionListener for Router {
    fn on_session_event(&self, event: SessionEvent) {
        if event != SessionEvent::Expired {
            return;
        }
        if let Err(e) = self.navigate(LOGIN_PATH) {
            warn!("Failed to leave expired session: {}", e);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("No route matches {0}")]
    NotFound(String),

    #[error("Too many redirects while navigating to {0}")]
    RedirectLoop(String),
}
