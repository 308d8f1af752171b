//! `Context`: per-platform raw event translation plus the key/button/mouse
//! state it accumulates.
//!
//! `Context` is the only stateful piece of the input layer; the table
//! functions in `tables.rs` stay pure so they can be unit-tested without a
//! `Context` at all.

use crate::key::{Button, Key, Mods, BUTTON_COUNT, KEY_COUNT};
use crate::tables::{button_code_to_button, evdev_to_key, keysym_to_key, mods_from_mask, vk_to_key};
use anvil_events::{Event, EventKind, IntTuplePayload};

/// Which platform's raw codes a [`RawEvent`] carries, selecting the table
/// `Context::handle_event` runs it through.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Platform {
    Win32,
    X11,
    Evdev,
}

/// A platform window backend's raw input event, reduced to the fields the
/// translation tables need. Producing this from an actual X11/Win32/evdev
/// byte stream is the window backend's job, out of scope here.
#[derive(Copy, Clone, Debug)]
pub enum RawEvent {
    Key {
        platform: Platform,
        code: u32,
        mods_mask: u32,
        down: bool,
    },
    Button {
        code: u32,
        mods_mask: u32,
        down: bool,
        x: i32,
        y: i32,
    },
    MouseMove {
        x: i32,
        y: i32,
    },
}

/// Accumulated input state plus the table dispatch that keeps it current.
pub struct Context {
    keys: [bool; KEY_COUNT],
    buttons: [bool; BUTTON_COUNT],
    mouse_x: i32,
    mouse_y: i32,
}

impl Context {
    pub fn new() -> Self {
        Self {
            keys: [false; KEY_COUNT],
            buttons: [false; BUTTON_COUNT],
            mouse_x: 0,
            mouse_y: 0,
        }
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.keys[key as usize]
    }

    pub fn is_button_down(&self, button: Button) -> bool {
        self.buttons[button as usize]
    }

    pub fn mouse_position(&self) -> (i32, i32) {
        (self.mouse_x, self.mouse_y)
    }

    /// Updates key/button/mouse state for `raw` and returns the canonical
    /// [`Event`] it becomes, ready to push onto an `EventQueue`. Unknown
    /// keys/buttons still update state and still emit an event — callers
    /// decide whether to act on `Key::Unknown`.
    pub fn handle_event(&mut self, raw: RawEvent) -> Event {
        match raw {
            RawEvent::Key { platform, code, mods_mask, down } => {
                let key = match platform {
                    Platform::Win32 => vk_to_key(code),
                    Platform::X11 => keysym_to_key(code),
                    Platform::Evdev => evdev_to_key(code),
                };
                self.keys[key as usize] = down;
                let mods = mods_from_mask(mods_mask);
                let kind = if down { EventKind::KeyDown } else { EventKind::KeyUp };
                let payload = IntTuplePayload(key as u32, mods.bits() as u32, down as u32, 0);
                unsafe { Event::new(kind, anvil_events::event::bytes_of(&payload)) }
            }
            RawEvent::Button { code, mods_mask, down, x, y } => {
                let button = button_code_to_button(code);
                self.buttons[button as usize] = down;
                self.mouse_x = x;
                self.mouse_y = y;
                let mods = mods_from_mask(mods_mask);
                let kind = if down { EventKind::ButtonDown } else { EventKind::ButtonUp };
                let payload = IntTuplePayload(button as u32, mods.bits() as u32, x as u32, y as u32);
                unsafe { Event::new(kind, anvil_events::event::bytes_of(&payload)) }
            }
            RawEvent::MouseMove { x, y } => {
                self.mouse_x = x;
                self.mouse_y = y;
                let payload = IntTuplePayload(x as u32, y as u32, 0, 0);
                unsafe { Event::new(EventKind::MouseMove, anvil_events::event::bytes_of(&payload)) }
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::ModBits;

    fn payload_of(event: &Event) -> IntTuplePayload {
        unsafe { anvil_events::event::payload_as(event) }
    }

    #[test]
    fn key_down_updates_state_and_emits_key_down() {
        let mut ctx = Context::new();
        let event = ctx.handle_event(RawEvent::Key {
            platform: Platform::Win32,
            code: 0x41, // 'A'
            mods_mask: 0b1, // shift
            down: true,
        });

        assert_eq!(event.kind(), Some(EventKind::KeyDown));
        assert!(ctx.is_key_down(Key::A));
        let payload = payload_of(&event);
        assert_eq!(payload.0, Key::A as u32);
        assert_eq!(payload.1, ModBits::Shift as u32);
        assert_eq!(payload.2, 1);
    }

    #[test]
    fn key_up_clears_state() {
        let mut ctx = Context::new();
        ctx.handle_event(RawEvent::Key { platform: Platform::X11, code: 0xFF1B, mods_mask: 0, down: true });
        assert!(ctx.is_key_down(Key::Escape));

        let event = ctx.handle_event(RawEvent::Key { platform: Platform::X11, code: 0xFF1B, mods_mask: 0, down: false });
        assert_eq!(event.kind(), Some(EventKind::KeyUp));
        assert!(!ctx.is_key_down(Key::Escape));
    }

    #[test]
    fn button_event_tracks_mouse_position() {
        let mut ctx = Context::new();
        let event = ctx.handle_event(RawEvent::Button { code: 1, mods_mask: 0, down: true, x: 10, y: 20 });
        assert_eq!(event.kind(), Some(EventKind::ButtonDown));
        assert!(ctx.is_button_down(Button::Left));
        assert_eq!(ctx.mouse_position(), (10, 20));
    }

    #[test]
    fn mouse_move_updates_position_and_emits_move() {
        let mut ctx = Context::new();
        let event = ctx.handle_event(RawEvent::MouseMove { x: 5, y: -3 });
        assert_eq!(event.kind(), Some(EventKind::MouseMove));
        assert_eq!(ctx.mouse_position(), (5, -3));
        let payload = payload_of(&event);
        assert_eq!(payload.0, 5u32);
        assert_eq!(payload.1, (-3i32) as u32);
    }
}
