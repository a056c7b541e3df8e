//! Top-level screen selection from session state.

use serde::Serialize;

use super::events::Navigation;
use super::state::SessionSnapshot;

/// Top-level screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Loading,
    ProfileCreation,
    AdminDashboard,
    StudentDashboard,
    PublicSite,
}

/// Pick the screen to render for a snapshot.
pub fn select_view(snapshot: &SessionSnapshot) -> View {
    if snapshot.is_loading {
        return View::Loading;
    }
    if snapshot.show_profile_prompt {
        return View::ProfileCreation;
    }
    match &snapshot.profile {
        Some(profile) if profile.is_admin() => View::AdminDashboard,
        Some(profile) if profile.has_dashboard_access() => View::StudentDashboard,
        _ => View::PublicSite,
    }
}

impl Navigation {
    pub fn view(&self) -> View {
        match self {
            Navigation::AdminDashboard => View::AdminDashboard,
            Navigation::StudentDashboard => View::StudentDashboard,
            Navigation::Home => View::PublicSite,
        }
    }
}
