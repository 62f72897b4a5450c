use thiserror::Error;

use crate::identity::{IdentityError, IdentityProvider};
use crate::model::Session;
use crate::remote::RemoteStore;
use crate::sync::{LoadReport, SyncEngine};

#[derive(Debug, Error)]
pub enum GateError {
    #[error("sign in first")]
    NotAuthenticated,

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Two states: no session (collections empty, mutations disabled) or an
/// authenticated session with its gradebook loaded.
pub struct SessionGate<I: IdentityProvider, R: RemoteStore> {
    identity: I,
    session: Option<Session>,
    engine: SyncEngine<R>,
}

impl<I: IdentityProvider, R: RemoteStore> SessionGate<I, R> {
    pub fn new(identity: I, engine: SyncEngine<R>) -> Self {
        Self {
            identity,
            session: None,
            engine,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    #[cfg(test)]
    pub fn engine(&self) -> &SyncEngine<R> {
        &self.engine
    }

    pub fn set_seed_classes(&mut self, names: Vec<String>) {
        self.engine.set_seed_classes(names);
    }

    /// The session context and engine for an operation, or `NotAuthenticated`.
    pub fn authed(&mut self) -> Result<(&Session, &mut SyncEngine<R>), GateError> {
        match self.session.as_ref() {
            Some(s) => Ok((s, &mut self.engine)),
            None => Err(GateError::NotAuthenticated),
        }
    }

    pub fn sign_up(&mut self, email: &str, password: &str) -> Result<LoadReport, GateError> {
        let session = self.identity.sign_up(email, password)?;
        Ok(self.enter(session))
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<LoadReport, GateError> {
        let session = self.identity.sign_in_with_password(email, password)?;
        Ok(self.enter(session))
    }

    /// Resumes a previously issued session by its access token.
    pub fn restore(&mut self, access_token: &str) -> Result<LoadReport, GateError> {
        let session = self.identity.get_session(access_token)?;
        Ok(self.enter(session))
    }

    /// Always ends in the unauthenticated state with every collection
    /// cleared, even when revoking the token fails.
    pub fn sign_out(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = self.identity.sign_out(&session) {
                tracing::warn!(error = %e, "token revoke failed during sign-out");
            }
            tracing::info!(user_id = %session.user_id, "signed out");
        }
        self.engine.clear();
    }

    fn enter(&mut self, session: Session) -> LoadReport {
        if self
            .session
            .as_ref()
            .is_some_and(|s| s.user_id != session.user_id)
        {
            self.engine.clear();
        }
        tracing::info!(user_id = %session.user_id, "signed in");
        let report = self.engine.load(&session);
        self.session = Some(session);
        report
    }
}
