//! Email/password identity provider.

use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use crate::db;
use crate::model::Session;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid email address")]
    InvalidEmail,

    #[error("password must be at least 6 characters")]
    WeakPassword,

    #[error("user already registered")]
    EmailTaken,

    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("session not found or expired")]
    SessionNotFound,

    #[error("auth storage: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl IdentityError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "invalid_email",
            Self::WeakPassword => "weak_password",
            Self::EmailTaken => "email_taken",
            Self::InvalidCredentials => "invalid_credentials",
            Self::SessionNotFound => "session_not_found",
            Self::Storage(_) => "auth_storage",
        }
    }

    /// The text shown to the user.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

pub trait IdentityProvider {
    fn sign_up(&self, email: &str, password: &str) -> Result<Session, IdentityError>;
    fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, IdentityError>;
    fn sign_out(&self, session: &Session) -> Result<(), IdentityError>;
    fn get_session(&self, access_token: &str) -> Result<Session, IdentityError>;
}

pub struct SqliteIdentity {
    conn: Connection,
}

impl SqliteIdentity {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_db(workspace)?,
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_in_memory()?,
        })
    }

    fn issue_session(&self, user_id: &str, email: &str) -> Result<Session, IdentityError> {
        let token = Uuid::new_v4().simple().to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO auth_sessions(token, user_id, created_at) VALUES(?, ?, ?)",
            (&token, user_id, &created_at),
        )?;
        Ok(Session {
            user_id: user_id.to_string(),
            email: email.to_string(),
            access_token: token,
            created_at,
        })
    }
}

fn normalize_email(email: &str) -> Result<String, IdentityError> {
    let email = email.trim().to_ascii_lowercase();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(IdentityError::InvalidEmail);
    };
    if local.is_empty() || domain.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(IdentityError::InvalidEmail);
    }
    Ok(email)
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

impl IdentityProvider for SqliteIdentity {
    fn sign_up(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword);
        }
        let exists: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM users WHERE email = ?", [&email], |r| r.get(0))
            .optional()?;
        if exists.is_some() {
            return Err(IdentityError::EmailTaken);
        }

        let user_id = Uuid::new_v4().to_string();
        let salt = Uuid::new_v4().simple().to_string();
        self.conn.execute(
            "INSERT INTO users(id, email, password_salt, password_hash, created_at)
             VALUES(?, ?, ?, ?, ?)",
            (
                &user_id,
                &email,
                &salt,
                hash_password(&salt, password),
                chrono::Utc::now().to_rfc3339(),
            ),
        )?;
        self.issue_session(&user_id, &email)
    }

    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let email = normalize_email(email).map_err(|_| IdentityError::InvalidCredentials)?;
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT id, password_salt, password_hash FROM users WHERE email = ?",
                [&email],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;
        let Some((user_id, salt, stored)) = row else {
            return Err(IdentityError::InvalidCredentials);
        };
        if hash_password(&salt, password) != stored {
            return Err(IdentityError::InvalidCredentials);
        }
        self.issue_session(&user_id, &email)
    }

    fn sign_out(&self, session: &Session) -> Result<(), IdentityError> {
        self.conn.execute(
            "DELETE FROM auth_sessions WHERE token = ?",
            [&session.access_token],
        )?;
        Ok(())
    }

    fn get_session(&self, access_token: &str) -> Result<Session, IdentityError> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT s.user_id, u.email, s.created_at
                 FROM auth_sessions s
                 JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?",
                [access_token],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;
        let Some((user_id, email, created_at)) = row else {
            return Err(IdentityError::SessionNotFound);
        };
        Ok(Session {
            user_id,
            email,
            access_token: access_token.to_string(),
            created_at,
        })
    }
}
