//! Persistent settings for the speaker - file store and debounced saving

mod store;
mod worker;

pub use store::{SettingsError, SettingsStore, CONFIG_VERSION};
pub use worker::{SaveWorker, SAVE_DEBOUNCE};
