//! Core of the vaultleaf personal file vault.
//!
//! The binary crate only wires these modules to a terminal; everything that
//! touches the private content root, the credential record, document text,
//! speech or audio lives here.

pub mod browser;
pub mod cancellation;
pub mod config;
pub mod credentials;
pub mod error;
pub mod exchange;
pub mod extract;
pub mod navigation;
pub mod ocr;
pub mod playback;
pub mod prefs;
pub mod speech;
pub mod store;
pub mod task;

pub use error::{ErrorClass, Result, VaultError};
