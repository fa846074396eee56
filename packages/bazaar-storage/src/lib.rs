//! In-memory collaborators: item store, full-text index, key-value cache store, and user
//! profile store.

pub mod fulltext;
pub mod items;
pub mod kv;
pub mod profiles;

mod error;

pub use error::Error;

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
	lock.read().unwrap_or_else(|err| err.into_inner())
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
	lock.write().unwrap_or_else(|err| err.into_inner())
}
