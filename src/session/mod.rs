use time::OffsetDateTime;

use crate::alert::{self, AlertQueue};
use crate::remote::{Credentials, NotesApi};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub email: String,
    /// Whatever the login endpoint returned. Kept for display only.
    pub payload: serde_json::Value,
    pub signed_in_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Session {
    #[default]
    Unauthenticated,
    Authenticated(SessionInfo),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Landing,
    Dashboard,
}

#[derive(Debug, Default)]
pub struct SessionController {
    session: Session,
    loading: bool,
    alerts: AlertQueue,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// On failure the current session is left untouched and an alert queued.
    pub fn login(&mut self, api: &dyn NotesApi, email: &str, password: &str) -> bool {
        let credentials = Credentials::new(email.trim(), password);
        self.loading = true;
        let result = api.login(&credentials);
        self.loading = false;
        match result {
            Ok(payload) => {
                tracing::info!(email = %credentials.email, "signed in");
                self.session = Session::Authenticated(SessionInfo {
                    email: credentials.email,
                    payload,
                    signed_in_at: OffsetDateTime::now_utc(),
                });
                true
            }
            Err(err) => {
                tracing::error!(%err, email = %credentials.email, "login failed");
                self.alerts.push(alert::LOGIN_FAILED);
                false
            }
        }
    }

    /// Discards the session. There is no server-side invalidation.
    pub fn logout(&mut self) {
        if let Session::Authenticated(info) = std::mem::take(&mut self.session) {
            tracing::info!(email = %info.email, "signed out");
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn info(&self) -> Option<&SessionInfo> {
        match &self.session {
            Session::Authenticated(info) => Some(info),
            Session::Unauthenticated => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.session, Session::Authenticated(_))
    }

    pub fn view(&self) -> View {
        if self.is_authenticated() {
            View::Dashboard
        } else {
            View::Landing
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn take_alerts(&mut self) -> Vec<String> {
        self.alerts.drain()
    }
}
