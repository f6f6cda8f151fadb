//! Command handlers.
//!
//! `App` wires the configured store and client into a `SessionController`
//! and plays the part of the app's screens: it prompts, dispatches intents
//! and prints what each screen would show.

use std::io::{self, Write};

use anyhow::Result;
use tracing::{debug, warn};

use autoparts_core::dialog::{LOGOUT_DIALOG_PROMPT, LOGOUT_DIALOG_TITLE};
use autoparts_core::navigation::PROFILE_UNAVAILABLE_MESSAGE;
use autoparts_core::{
    open_store, AuthClient, AuthError, Config, ConfirmationDialog, Credentials, NavigationGate,
    NewAccount, ProfileView, Screen, SessionController,
};

// ============================================================================
// Constants
// ============================================================================

/// Pre-fills the login username
const USERNAME_ENV: &str = "AUTOPARTS_USERNAME";

/// Pre-fills the password for login and register
const PASSWORD_ENV: &str = "AUTOPARTS_PASSWORD";

pub struct App {
    config: Config,
    /// False when the config file could not be read; it is then never rewritten
    config_writable: bool,
    controller: SessionController,
}

impl App {
    /// Open the configured session store and pick up any persisted session
    pub async fn new(config: Config, config_writable: bool) -> Result<Self> {
        let store = open_store(&config)?;
        let client = AuthClient::from_config(&config)?;
        let controller = SessionController::new(client, store);

        let state = controller.restore().await;
        debug!(state = ?state.tag(), "Session restored");

        Ok(Self {
            config,
            config_writable,
            controller,
        })
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub async fn login(&mut self, username: Option<String>) -> Result<bool> {
        if self.controller.is_authenticated() {
            println!("Already logged in.");
            return Ok(true);
        }

        let username = match username.or_else(|| std::env::var(USERNAME_ENV).ok()) {
            Some(username) => username,
            None => self.prompt_username()?,
        };
        let password = Self::password()?;

        println!("\nAuthenticating...");
        let credentials = Credentials::new(username, password);
        if let Err(e) = self.controller.login(&credentials).await {
            eprintln!("Login Failed: {}", e.user_message());
            return Ok(false);
        }

        println!("Login successful!");
        self.remember_username(&credentials.username);
        self.show(NavigationGate::after_login());
        Ok(true)
    }

    pub async fn register(&mut self, username: String, email: String) -> Result<bool> {
        let password = Self::password()?;
        let account = NewAccount::new(username, email, password);

        if let Err(e) = self.controller.register(&account).await {
            eprintln!("Registration Failed: {}", e.user_message());
            return Ok(false);
        }

        println!("Registration successful! Please log in.");
        self.show(NavigationGate::after_register());
        Ok(true)
    }

    pub async fn profile(&mut self) -> Result<bool> {
        let navigation = NavigationGate::navigate(&self.controller, Screen::Profile).await;

        if navigation.screen != Screen::Profile {
            let notice = navigation
                .notice
                .unwrap_or_else(|| AuthError::NotAuthenticated.user_message());
            eprintln!("{}", notice);
            self.show(navigation.screen);
            return Ok(false);
        }

        match navigation.profile {
            Some(ProfileView::Loaded(profile)) => {
                println!("Username: {}", profile.username);
                println!("Email:    {}", profile.email);
                Ok(true)
            }
            _ => {
                if let Some(notice) = navigation.notice {
                    debug!(notice = %notice, "Profile unavailable");
                }
                eprintln!("{}", PROFILE_UNAVAILABLE_MESSAGE);
                Ok(false)
            }
        }
    }

    pub async fn logout(&mut self, assume_yes: bool) -> Result<bool> {
        if !self.controller.is_authenticated() {
            println!("Not logged in.");
            return Ok(true);
        }

        let mut dialog = ConfirmationDialog::new();
        dialog.request();

        let accepted = if assume_yes {
            true
        } else {
            println!("{}", LOGOUT_DIALOG_TITLE);
            print!("{} [y/N]: ", LOGOUT_DIALOG_PROMPT);
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            is_confirmation(&input)
        };

        let Some(confirmed) = accepted.then(|| dialog.confirm()).flatten() else {
            dialog.cancel();
            println!("Logout cancelled.");
            return Ok(true);
        };

        if let Err(e) = self.controller.logout(confirmed).await {
            eprintln!("Logout Failed: {}", e.user_message());
            return Ok(false);
        }

        println!("Logged out.");
        self.show(NavigationGate::after_logout());
        Ok(true)
    }

    pub fn status(&self) -> Result<bool> {
        let status = self.controller.status();
        println!("{}", serde_json::to_string_pretty(&status)?);
        Ok(true)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn show(&self, screen: Screen) {
        println!("-> {}", screen.title());
    }

    /// Only `last_username` is written; the in-memory config may carry
    /// environment overrides or fallback defaults that must not reach disk.
    fn remember_username(&mut self, username: &str) {
        self.config.last_username = Some(username.to_string());
        if !self.config_writable {
            debug!("Config file failed to load, leaving it untouched");
            return;
        }
        if let Err(e) = Config::remember_username(username) {
            warn!(error = %format!("{:#}", e), "Failed to save config");
        }
    }

    fn prompt_username(&self) -> Result<String> {
        match self.config.last_username {
            Some(ref last_user) => print!("Username [{}]: ", last_user),
            None => print!("Username: "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        match (&self.config.last_username, input.is_empty()) {
            (Some(last_user), true) => Ok(last_user.clone()),
            _ => Ok(input.to_string()),
        }
    }

    fn password() -> Result<String> {
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            return Ok(password);
        }
        Ok(rpassword::prompt_password("Password: ")?)
    }
}

/// Dialog answer; anything but an explicit yes cancels
fn is_confirmation(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes" | "ok")
}
