//! Local persistence: one JSON file per scan assessment, plus the credit session.

mod error;
pub use error::StoreError;

pub mod scans;
pub mod session;

pub use scans::ScanStore;
pub use session::{CREDIT_PACKAGES, CreditPackage, Credentials, Session, SessionStore};
