//! Bounded single-writer multi-reader event queue plus a typed listener
//! registry.
//!
//! Couples the platform input layer to the script layer: the driver thread
//! pushes platform and ECS-lifecycle events onto the [`ring::EventQueue`]
//! every frame, and script-facing [`listeners::EventListeners`] drain it
//! once per frame.

pub mod event;
pub mod listeners;
pub mod ring;

pub use event::{ButtonPayload, Event, EventKind, IntTuplePayload, KeyPayload, MovePayload};
pub use listeners::{EventListeners, ListenerFn, ListenerHandle};
pub use ring::EventQueue;
