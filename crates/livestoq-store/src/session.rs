//! Logged-in user and scan credits.
//!
//! The session is an explicit value persisted in `session.json`; callers
//! load it through [`SessionStore`] and pass it to whatever needs it.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::StoreError;

/// Credits granted to a user with no stored session.
pub const DEFAULT_STARTING_CREDITS: u32 = 25;

const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub credits: u32,
}

/// The account allowed to log in.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    /// The demo account.
    fn default() -> Self {
        Self {
            username: "Testing".to_string(),
            password: "Testing".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditPackage {
    pub id: &'static str,
    pub name: &'static str,
    pub credits: u32,
    pub price_idr: u64,
    pub best_value: bool,
}

impl CreditPackage {
    pub fn find(id: &str) -> Option<&'static CreditPackage> {
        CREDIT_PACKAGES.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    /// Rounded price of a single credit.
    pub fn price_per_credit_idr(&self) -> u64 {
        (self.price_idr as f64 / self.credits as f64).round() as u64
    }
}

pub const CREDIT_PACKAGES: [CreditPackage; 3] = [
    CreditPackage {
        id: "starter",
        name: "Starter",
        credits: 10,
        price_idr: 50_000,
        best_value: false,
    },
    CreditPackage {
        id: "standard",
        name: "Standard",
        credits: 25,
        price_idr: 100_000,
        best_value: true,
    },
    CreditPackage {
        id: "pro",
        name: "Pro",
        credits: 60,
        price_idr: 200_000,
        best_value: false,
    },
];

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Open the session file inside `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(SESSION_FILE),
        })
    }

    /// The stored session. A missing, unreadable, or malformed file means
    /// nobody is logged in.
    pub fn current(&self) -> Option<Session> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(error = %e, "could not read session file");
                return None;
            }
        };
        let value: Value = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "ignoring malformed session file");
                return None;
            }
        };
        normalize_session(&value)
    }

    /// Log in with `credentials`. A stored session for the same user keeps
    /// its credits; otherwise the user starts with
    /// [`DEFAULT_STARTING_CREDITS`].
    pub fn login(
        &self,
        username: &str,
        password: &str,
        credentials: &Credentials,
    ) -> Result<Session, StoreError> {
        if username != credentials.username || password != credentials.password {
            return Err(StoreError::InvalidCredentials);
        }

        let session = match self.current() {
            Some(existing) if existing.username == username => existing,
            _ => Session {
                username: username.to_string(),
                credits: DEFAULT_STARTING_CREDITS,
            },
        };
        self.persist(&session)?;
        info!(username = %session.username, credits = session.credits, "logged in");
        Ok(session)
    }

    pub fn logout(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Add (or with a negative delta, remove) credits. The balance never
    /// goes below zero.
    pub fn update_credits(&self, delta: i64) -> Result<Session, StoreError> {
        let mut session = self.current().ok_or(StoreError::NotLoggedIn)?;
        let next = (session.credits as i64).saturating_add(delta).clamp(0, u32::MAX as i64);
        session.credits = next as u32;
        self.persist(&session)?;
        debug!(delta, credits = session.credits, "credits updated");
        Ok(session)
    }

    /// Spend one credit on a scan.
    pub fn consume_credit(&self) -> Result<Session, StoreError> {
        let session = self.current().ok_or(StoreError::NotLoggedIn)?;
        if session.credits < 1 {
            return Err(StoreError::InsufficientCredits {
                available: session.credits,
            });
        }
        self.update_credits(-1)
    }

    /// Mock purchase of a credit package.
    pub fn buy(&self, package_id: &str) -> Result<(Session, &'static CreditPackage), StoreError> {
        let package = CreditPackage::find(package_id)
            .ok_or_else(|| StoreError::UnknownPackage(package_id.to_string()))?;
        let session = self.update_credits(package.credits as i64)?;
        info!(package = package.id, credits = session.credits, "credits purchased");
        Ok((session, package))
    }

    fn persist(&self, session: &Session) -> Result<(), StoreError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, session)?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

/// Accept any stored object with a string username; a missing or
/// non-numeric credit balance resets to the starting amount.
fn normalize_session(value: &Value) -> Option<Session> {
    let obj = value.as_object()?;
    let username = obj.get("username")?.as_str()?.to_string();
    let credits = obj
        .get("credits")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .map(|c| c.floor().clamp(0.0, u32::MAX as f64) as u32)
        .unwrap_or(DEFAULT_STARTING_CREDITS);
    Some(Session { username, credits })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn login_with_demo_credentials() {
        let (_dir, store) = store();
        let session = store.login("Testing", "Testing", &Credentials::default()).unwrap();
        assert_eq!(session.credits, DEFAULT_STARTING_CREDITS);
        assert_eq!(store.current(), Some(session));
    }

    #[test]
    fn wrong_password_refused() {
        let (_dir, store) = store();
        assert!(matches!(
            store.login("Testing", "nope", &Credentials::default()),
            Err(StoreError::InvalidCredentials)
        ));
        assert!(store.current().is_none());
    }

    #[test]
    fn login_restores_stored_credits() {
        let (_dir, store) = store();
        let creds = Credentials::default();
        store.login("Testing", "Testing", &creds).unwrap();
        store.update_credits(-20).unwrap();

        let again = store.login("Testing", "Testing", &creds).unwrap();
        assert_eq!(again.credits, 5);
    }

    #[test]
    fn logout_clears_session() {
        let (_dir, store) = store();
        store.login("Testing", "Testing", &Credentials::default()).unwrap();
        store.logout().unwrap();
        assert!(store.current().is_none());
        store.logout().unwrap();
    }

    #[test]
    fn credits_floor_at_zero() {
        let (_dir, store) = store();
        store.login("Testing", "Testing", &Credentials::default()).unwrap();
        let session = store.update_credits(-1000).unwrap();
        assert_eq!(session.credits, 0);
    }

    #[test]
    fn consume_requires_a_credit() {
        let (_dir, store) = store();
        assert!(matches!(store.consume_credit(), Err(StoreError::NotLoggedIn)));

        store.login("Testing", "Testing", &Credentials::default()).unwrap();
        store.update_credits(-24).unwrap();
        assert_eq!(store.consume_credit().unwrap().credits, 0);
        assert!(matches!(
            store.consume_credit(),
            Err(StoreError::InsufficientCredits { available: 0 })
        ));
    }

    #[test]
    fn buy_adds_package_credits() {
        let (_dir, store) = store();
        store.login("Testing", "Testing", &Credentials::default()).unwrap();
        let (session, package) = store.buy("Standard").unwrap();
        assert_eq!(package.credits, 25);
        assert_eq!(session.credits, 50);
        assert!(matches!(store.buy("platinum"), Err(StoreError::UnknownPackage(_))));
    }

    #[test]
    fn malformed_session_file_means_logged_out() {
        let (dir, store) = store();
        fs::write(dir.path().join(SESSION_FILE), b"{oops").unwrap();
        assert!(store.current().is_none());
    }

    #[test]
    fn non_numeric_credits_reset_to_default() {
        let (dir, store) = store();
        fs::write(
            dir.path().join(SESSION_FILE),
            br#"{"username": "Testing", "credits": "lots"}"#,
        )
        .unwrap();
        assert_eq!(store.current().unwrap().credits, DEFAULT_STARTING_CREDITS);
    }

    #[test]
    fn price_per_credit() {
        assert_eq!(CREDIT_PACKAGES[0].price_per_credit_idr(), 5_000);
        assert_eq!(CREDIT_PACKAGES[1].price_per_credit_idr(), 4_000);
        assert_eq!(CREDIT_PACKAGES[2].price_per_credit_idr(), 3_333);
    }
}
