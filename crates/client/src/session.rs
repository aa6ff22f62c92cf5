//! Session gate and account settings.
//!
//! The login flag and the user profile live in a [`ClientStore`] under the
//! keys `isLoggedIn` and `userData`. This gates what the client shows; it is
//! not an authorization boundary, the backend is.
//!
//! Operations that need the current user take a [`SessionContext`]
//! explicitly; nothing reads the store behind the caller's back.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::InventoryApi;
use crate::error::{ApiError, ServiceError, ServiceResult};
use crate::store::ClientStore;

pub const LOGGED_IN_KEY: &str = "isLoggedIn";
pub const PROFILE_KEY: &str = "userData";

/// The user object the backend returns on login.
///
/// Fields other than `name` and `username` are kept as-is so that a
/// persisted profile round-trips unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Settings form input.
#[derive(Clone, Default)]
pub struct SettingsUpdate {
    pub name: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SettingsUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsUpdate")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `PUT /login`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdate {
    pub original_username: String,
    pub name: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AccountUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountUpdate")
            .field("original_username", &self.original_username)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The logged-in user, handed to operations that stamp an author.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    profile: UserProfile,
}

impl SessionContext {
    pub fn new(profile: UserProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Display name recorded as `author` on new records.
    pub fn author(&self) -> &str {
        &self.profile.name
    }

    pub fn username(&self) -> &str {
        &self.profile.username
    }
}

/// Outcome of the gate check before a protected view.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Allow(SessionContext),
    RedirectToLogin,
}

pub struct SessionManager<S> {
    store: S,
}

impl<S: ClientStore> SessionManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Allow only when the flag is exactly `"true"` and a profile decodes.
    pub async fn restore(&self) -> ServiceResult<GateDecision> {
        let flag = self.store.get(LOGGED_IN_KEY).await?;
        if flag.as_deref() != Some("true") {
            return Ok(GateDecision::RedirectToLogin);
        }

        let Some(raw) = self.store.get(PROFILE_KEY).await? else {
            return Ok(GateDecision::RedirectToLogin);
        };
        match serde_json::from_str::<UserProfile>(&raw) {
            Ok(profile) => Ok(GateDecision::Allow(SessionContext::new(profile))),
            Err(err) => {
                tracing::warn!(error = %err, "stored profile is unreadable; login required");
                Ok(GateDecision::RedirectToLogin)
            }
        }
    }

    /// Like [`restore`](Self::restore), but an absent session is an error.
    pub async fn require(&self) -> ServiceResult<SessionContext> {
        match self.restore().await? {
            GateDecision::Allow(ctx) => Ok(ctx),
            GateDecision::RedirectToLogin => Err(ServiceError::NotLoggedIn),
        }
    }

    pub async fn login<A>(&self, api: &A, credentials: &Credentials) -> ServiceResult<SessionContext>
    where
        A: InventoryApi + ?Sized,
    {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return Err(ServiceError::validation("username and password are required"));
        }

        let profile = api.login(credentials).await.map_err(|err| match err {
            ApiError::Unauthorized => ServiceError::InvalidCredentials,
            other => ServiceError::Network(other),
        })?;

        self.persist(&profile).await?;
        self.store.set(LOGGED_IN_KEY, "true").await?;
        tracing::info!(username = %profile.username, "logged in");
        Ok(SessionContext::new(profile))
    }

    pub async fn logout(&self) -> ServiceResult<()> {
        self.store.remove(LOGGED_IN_KEY).await?;
        self.store.remove(PROFILE_KEY).await?;
        tracing::info!("logged out");
        Ok(())
    }

    /// Reload the profile from the backend and persist it.
    pub async fn fetch_profile<A>(&self, api: &A, ctx: &mut SessionContext) -> ServiceResult<()>
    where
        A: InventoryApi + ?Sized,
    {
        if ctx.username().is_empty() {
            return Err(ServiceError::validation("username is required to fetch user details"));
        }
        let fetched = api.user_details(ctx.username()).await?;
        ctx.profile.name = fetched.name;
        ctx.profile.username = fetched.username;
        ctx.profile.extra.extend(fetched.extra);
        self.persist(&ctx.profile).await
    }

    /// Change name, username and password. All three are required.
    pub async fn update_settings<A>(
        &self,
        api: &A,
        ctx: &mut SessionContext,
        update: SettingsUpdate,
    ) -> ServiceResult<()>
    where
        A: InventoryApi + ?Sized,
    {
        let mut missing = Vec::new();
        if update.name.trim().is_empty() {
            missing.push("name");
        }
        if update.username.trim().is_empty() {
            missing.push("username");
        }
        if update.password.is_empty() {
            missing.push("password");
        }
        if !missing.is_empty() {
            return Err(ServiceError::validation(format!(
                "required fields missing: {}",
                missing.join(", ")
            )));
        }

        let body = AccountUpdate {
            original_username: ctx.username().to_string(),
            name: update.name.trim().to_string(),
            username: update.username.trim().to_string(),
            password: update.password,
        };
        api.update_account(&body).await?;

        ctx.profile.name = body.name;
        ctx.profile.username = body.username;
        self.persist(&ctx.profile).await?;
        tracing::info!(username = %ctx.profile.username, "account settings updated");
        Ok(())
    }

    async fn persist(&self, profile: &UserProfile) -> ServiceResult<()> {
        let raw = serde_json::to_string(profile)
            .map_err(|err| ServiceError::validation(format!("profile not serializable: {err}")))?;
        self.store.set(PROFILE_KEY, &raw).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::{Endpoint, InMemoryApi};
    use crate::store::MemoryStore;

    fn meera() -> UserProfile {
        serde_json::from_value(serde_json::json!({
            "_id": "u-1",
            "name": "Meera",
            "username": "meera",
            "role": "owner"
        }))
        .unwrap()
    }

    fn api() -> InMemoryApi {
        InMemoryApi::new().with_user(meera(), "s3cret")
    }

    #[tokio::test]
    async fn gate_redirects_without_flag_or_profile() {
        let session = SessionManager::new(MemoryStore::new());
        assert_eq!(session.restore().await.unwrap(), GateDecision::RedirectToLogin);

        session.store().set(LOGGED_IN_KEY, "true").await.unwrap();
        assert_eq!(session.restore().await.unwrap(), GateDecision::RedirectToLogin);

        session.store().set(PROFILE_KEY, "{not json").await.unwrap();
        assert_eq!(session.restore().await.unwrap(), GateDecision::RedirectToLogin);

        session.store().set(LOGGED_IN_KEY, "1").await.unwrap();
        session.store().set(PROFILE_KEY, r#"{"name":"M","username":"m"}"#).await.unwrap();
        assert_eq!(session.restore().await.unwrap(), GateDecision::RedirectToLogin);
        assert!(matches!(session.require().await, Err(ServiceError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn login_persists_profile_with_extra_fields() {
        let api = api();
        let session = SessionManager::new(MemoryStore::new());
        let ctx = session
            .login(&api, &Credentials::new("meera", "s3cret"))
            .await
            .unwrap();
        assert_eq!(ctx.author(), "Meera");

        match session.restore().await.unwrap() {
            GateDecision::Allow(restored) => {
                assert_eq!(restored, ctx);
                assert_eq!(restored.profile().extra["role"], "owner");
            }
            GateDecision::RedirectToLogin => panic!("expected an active session"),
        }

        session.logout().await.unwrap();
        assert_eq!(session.restore().await.unwrap(), GateDecision::RedirectToLogin);
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let api = api();
        let session = SessionManager::new(MemoryStore::new());
        let err = session
            .login(&api, &Credentials::new("meera", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredentials));
        assert_eq!(session.restore().await.unwrap(), GateDecision::RedirectToLogin);
    }

    #[tokio::test]
    async fn blank_login_makes_no_request() {
        let api = api();
        let session = SessionManager::new(MemoryStore::new());
        let err = session.login(&api, &Credentials::new(" ", "")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn settings_update_requires_all_fields_and_renames_user() {
        let api = api();
        let session = SessionManager::new(MemoryStore::new());
        let mut ctx = session
            .login(&api, &Credentials::new("meera", "s3cret"))
            .await
            .unwrap();

        let err = session
            .update_settings(
                &api,
                &mut ctx,
                SettingsUpdate {
                    name: "Meera K".into(),
                    username: "meerak".into(),
                    password: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(msg) if msg.contains("password")));
        assert_eq!(api.call_count(Endpoint::UpdateAccount).await, 0);

        session
            .update_settings(
                &api,
                &mut ctx,
                SettingsUpdate {
                    name: "Meera K".into(),
                    username: "meerak".into(),
                    password: "n3w".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(ctx.username(), "meerak");
        assert_eq!(ctx.profile().extra["role"], "owner");

        let relogged = session
            .login(&api, &Credentials::new("meerak", "n3w"))
            .await
            .unwrap();
        assert_eq!(relogged.author(), "Meera K");

        let mut ctx = relogged;
        session.fetch_profile(&api, &mut ctx).await.unwrap();
        assert_eq!(ctx.author(), "Meera K");
    }
}
