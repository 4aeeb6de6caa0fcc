use super::{Effects, Notice, failure, landing};
use crate::api::{ApiClient, ProfileUpdate};
use crate::session::Transport;
use crate::types::ProfileSnapshot;

const ROUTE: &str = "/profile";

pub struct ProfilePage<T> {
    api: ApiClient<T>,
    profile: Option<ProfileSnapshot>,
    form: ProfileUpdate,
    editing: bool,
}

impl<T: Transport> ProfilePage<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>) -> Self {
        Self {
            api,
            profile: None,
            form: ProfileUpdate::default(),
            editing: false,
        }
    }

    pub async fn open(&mut self) -> Effects {
        if !self.api.credentials().is_logged_in() {
            return Effects::navigate(landing(&self.api));
        }
        self.load().await
    }

    /// Loads the profile and the edit form; refreshes the cached snapshot.
    pub async fn load(&mut self) -> Effects {
        let profile = match self.api.profile().get().await {
            Ok(reply) => reply.data,
            Err(e) => return failure(&self.api, ROUTE, &e, "Could not load your profile."),
        };
        if let Err(e) = self.api.credentials().save_user_profile(&profile) {
            tracing::warn!(error = %e, "Could not cache profile");
        }
        self.profile = Some(profile);

        match self.api.profile().get_for_update().await {
            Ok(reply) => self.form = ProfileUpdate::from_payload(&reply.data),
            Err(e) => tracing::debug!(error = %e, "Profile edit form unavailable"),
        }
        Effects::none()
    }

    pub fn enable_edit(&mut self) {
        self.editing = true;
    }

    pub fn cancel_edit(&mut self) {
        self.editing = false;
    }

    pub fn form_mut(&mut self) -> &mut ProfileUpdate {
        &mut self.form
    }

    pub async fn save(&mut self) -> Effects {
        if let Err(e) = self.form.validate() {
            return Effects::notice(Notice::warning(e.to_string()));
        }
        if let Err(e) = self.api.profile().update(&self.form).await {
            return failure(&self.api, ROUTE, &e, "Could not save your profile.");
        }
        self.editing = false;
        let reloaded = self.load().await;
        if reloaded.notice.is_some() {
            return reloaded;
        }
        Effects::notice(Notice::success("Your profile was saved."))
    }

    #[must_use]
    pub fn profile(&self) -> Option<&ProfileSnapshot> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn form(&self) -> &ProfileUpdate {
        &self.form
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.editing
    }
}
