use std::str::FromStr;

/// When an expired session should send the user back to the landing route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectMode {
    /// Clear credentials and report, never navigate.
    Never,
    /// Always navigate to the landing route.
    Always,
    /// Navigate unless the user is already on the landing route.
    #[default]
    UnlessOnLanding,
}

impl FromStr for RedirectMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" => Ok(Self::Never),
            "always" => Ok(Self::Always),
            "unless-landing" | "unless_landing" => Ok(Self::UnlessOnLanding),
            other => Err(format!(
                "unknown session expiry mode {other:?} (expected never, always or unless-landing)"
            )),
        }
    }
}

/// What page controllers do after a refresh fails for good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryPolicy {
    mode: RedirectMode,
    landing_route: String,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            mode: RedirectMode::default(),
            landing_route: "/".into(),
        }
    }
}

impl ExpiryPolicy {
    #[must_use]
    pub fn new(mode: RedirectMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_landing_route(mut self, route: impl Into<String>) -> Self {
        self.landing_route = route.into();
        self
    }

    #[must_use]
    pub fn mode(&self) -> RedirectMode {
        self.mode
    }

    #[must_use]
    pub fn landing_route(&self) -> &str {
        &self.landing_route
    }

    /// Where to navigate from `current_route`, if anywhere.
    #[must_use]
    pub fn redirect_for(&self, current_route: &str) -> Option<String> {
        match self.mode {
            RedirectMode::Never => None,
            RedirectMode::Always => Some(self.landing_route.clone()),
            RedirectMode::UnlessOnLanding => {
                let path = current_route
                    .split(['?', '#'])
                    .next()
                    .unwrap_or(current_route);
                (path != self.landing_route).then(|| self.landing_route.clone())
            }
        }
    }
}

/// `/login?redirect=<route>` with the route percent-encoded.
#[must_use]
pub fn login_redirect(current_route: &str) -> String {
    format!("/login?redirect={}", urlencoding::encode(current_route))
}
