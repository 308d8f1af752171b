//! Platform input translation.
//!
//! Pure per-platform code tables (`tables.rs`) plus the stateful `Context`
//! (`translator.rs`) that applies them and emits canonical [`Event`]s for
//! the `anvil_events::EventQueue`. Producing the raw platform byte stream
//! itself is a window backend's job and stays out of this crate.

pub mod key;
pub mod tables;
pub mod translator;

pub use key::{Button, Key, ModBits, Mods, BUTTON_COUNT, KEY_COUNT};
pub use tables::{button_code_to_button, evdev_to_key, keysym_to_key, mods_from_mask, vk_to_key};
pub use translator::{Context, Platform, RawEvent};
