//! Screens of the portal and the session-driven redirects between them.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Screen {
    Landing,
    Auth,
    Dashboard,
    NewReport,
    Track,
}

impl Screen {
    pub fn path(self) -> &'static str {
        match self {
            Screen::Landing => "/",
            Screen::Auth => "/auth",
            Screen::Dashboard => "/dashboard",
            Screen::NewReport => "/new-report",
            Screen::Track => "/track",
        }
    }

    fn requires_session(self) -> bool {
        matches!(self, Screen::Dashboard)
    }

    fn guests_only(self) -> bool {
        matches!(self, Screen::Auth)
    }
}

impl FromStr for Screen {
    type Err = String;

    /// Accepts both screen names (`new-report`) and paths (`/new-report`).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().trim_start_matches('/') {
            "" | "landing" => Ok(Screen::Landing),
            "auth" => Ok(Screen::Auth),
            "dashboard" => Ok(Screen::Dashboard),
            "new-report" => Ok(Screen::NewReport),
            "track" => Ok(Screen::Track),
            other => Err(format!("unknown screen '{}'", other)),
        }
    }
}

/// Where a visitor to `screen` must be sent instead, if anywhere.
pub fn guard(screen: Screen, has_session: bool) -> Option<Screen> {
    if screen.requires_session() && !has_session {
        Some(Screen::Auth)
    } else if screen.guests_only() && has_session {
        Some(Screen::Dashboard)
    } else {
        None
    }
}
