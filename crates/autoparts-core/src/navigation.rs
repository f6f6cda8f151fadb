//! Screen admission driven by session state.
//!
//! The gate is a pure function of [`SessionState`]; `navigate` adds the one
//! side effect a protected screen may need, fetching the profile.

use serde::Serialize;
use tracing::debug;

use crate::api::AuthError;
use crate::models::Profile;
use crate::session::{SessionController, SessionState};

/// Shown by the profile screen when the fetch failed
pub const PROFILE_UNAVAILABLE_MESSAGE: &str = "No profile data available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum Screen {
    Login,
    Register,
    Home,
    Profile,
}

impl Screen {
    pub const ALL: [Screen; 4] = [Screen::Login, Screen::Register, Screen::Home, Screen::Profile];

    /// Requires an authenticated session
    pub fn is_protected(self) -> bool {
        matches!(self, Screen::Home | Screen::Profile)
    }

    pub fn needs_profile(self) -> bool {
        self == Screen::Profile
    }

    pub fn title(self) -> &'static str {
        match self {
            Screen::Login => "Login",
            Screen::Register => "Register",
            Screen::Home => "Home",
            Screen::Profile => "Profile",
        }
    }
}

/// Gate decision for one navigation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Enter,
    /// Enter, and resolve the profile the screen displays
    EnterAndFetchProfile,
    Redirect(Screen),
}

/// Display state of the profile screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileView {
    Loading,
    Loaded(Profile),
    Unavailable,
}

impl ProfileView {
    /// What the profile screen shows for the current state, before any fetch
    pub fn from_state(state: &SessionState) -> Self {
        match state.profile() {
            Some(profile) => ProfileView::Loaded(profile.clone()),
            None if state.is_authenticated() => ProfileView::Loading,
            None => ProfileView::Unavailable,
        }
    }
}

/// Result of `NavigationGate::navigate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// The screen actually shown
    pub screen: Screen,
    pub profile: Option<ProfileView>,
    /// Message to surface alongside a redirect
    pub notice: Option<String>,
}

impl Navigation {
    fn enter(screen: Screen) -> Self {
        Self {
            screen,
            profile: None,
            notice: None,
        }
    }
}

pub struct NavigationGate;

impl NavigationGate {
    /// Decide whether `screen` may be entered in `state`.
    ///
    /// `Authenticating` and `LoggingOut` count as unauthenticated.
    pub fn admit(state: &SessionState, screen: Screen) -> Admission {
        if !screen.is_protected() {
            return Admission::Enter;
        }
        match state {
            SessionState::LoggedIn { profile, .. } => {
                if screen.needs_profile() && profile.is_none() {
                    Admission::EnterAndFetchProfile
                } else {
                    Admission::Enter
                }
            }
            SessionState::LoggedOut
            | SessionState::Authenticating
            | SessionState::LoggingOut => Admission::Redirect(Screen::Login),
        }
    }

    pub fn allowed_screens(state: &SessionState) -> Vec<Screen> {
        Screen::ALL
            .into_iter()
            .filter(|screen| !matches!(Self::admit(state, *screen), Admission::Redirect(_)))
            .collect()
    }

    /// Where the app starts for a given state
    pub fn landing(state: &SessionState) -> Screen {
        if state.is_authenticated() {
            Screen::Home
        } else {
            Screen::Login
        }
    }

    /// Route after a successful login
    pub fn after_login() -> Screen {
        Screen::Home
    }

    /// Route after a successful registration
    pub fn after_register() -> Screen {
        Screen::Login
    }

    /// Route after logout or session expiry
    pub fn after_logout() -> Screen {
        Screen::Login
    }

    /// Admit `screen` against the controller's current state and perform the
    /// profile fetch a protected screen needs.
    pub async fn navigate(controller: &SessionController, screen: Screen) -> Navigation {
        let state = controller.state();
        match Self::admit(&state, screen) {
            Admission::Redirect(target) => {
                debug!(from = ?screen, to = ?target, "Redirecting unauthenticated navigation");
                Navigation::enter(target)
            }
            Admission::Enter => {
                let mut navigation = Navigation::enter(screen);
                if screen.needs_profile() {
                    navigation.profile = Some(ProfileView::from_state(&state));
                }
                navigation
            }
            Admission::EnterAndFetchProfile => match controller.fetch_profile().await {
                Ok(profile) => Navigation {
                    screen,
                    profile: Some(ProfileView::Loaded(profile)),
                    notice: None,
                },
                Err(e @ AuthError::SessionInvalid) => Navigation {
                    screen: Self::after_logout(),
                    profile: None,
                    notice: Some(e.user_message()),
                },
                // Logged out while the fetch was in flight
                Err(AuthError::NotAuthenticated) => Navigation::enter(Self::after_logout()),
                Err(e) => Navigation {
                    screen,
                    profile: Some(ProfileView::Unavailable),
                    notice: Some(e.user_message()),
                },
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
