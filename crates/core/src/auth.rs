//! Authentication seam.
//!
//! The roster core only displays the current user and triggers logout;
//! session management and the login flow belong to the host application.

use padron_types::EmailAddress;

/// The signed-in user, as far as this core cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub email: EmailAddress,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("logout rejected: {0}")]
    LogoutFailed(String),
}

/// Current-user view plus logout, consumed by the form controller.
pub trait AuthService: Send + Sync {
    /// The currently signed-in user, if any.
    fn user(&self) -> Option<UserProfile>;

    /// Ends the session. Navigation afterwards is the caller's concern.
    fn logout(&self) -> impl std::future::Future<Output = Result<(), AuthError>> + Send;
}

/// Fixed-session `AuthService` for demos and tests: one user, signed in
/// until `logout`.
#[derive(Debug, Clone)]
pub struct StaticAuth {
    user: std::sync::Arc<std::sync::Mutex<Option<UserProfile>>>,
}

impl StaticAuth {
    pub fn signed_in(email: EmailAddress) -> Self {
        Self {
            user: std::sync::Arc::new(std::sync::Mutex::new(Some(UserProfile { email }))),
        }
    }
}

impl AuthService for StaticAuth {
    fn user(&self) -> Option<UserProfile> {
        self.user
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.user
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logout_clears_the_session() {
        let auth = StaticAuth::signed_in(EmailAddress::parse("ana@example.com").unwrap());
        assert!(auth.user().is_some());

        auth.logout().await.expect("logout should succeed");
        assert!(auth.user().is_none());
    }
}
