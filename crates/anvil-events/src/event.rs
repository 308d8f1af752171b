//! Wire-level event record and its typed payload shapes.
//!
//! An `Event` is a fixed 27-byte-logical (28 with alignment padding) record:
//! a 2-byte kind id, a 1-byte payload size, and a 24-byte inline payload
//! that is a bitcopy of one of the shapes below. Fixed inline size avoids
//! allocation on the hot path that couples the platform input layer to the
//! ECS notifier and the script layer.

/// Canonical event kinds. `Quit` and the `UserStart` range are
/// window/script-level; the ECS lifecycle kinds are raised by `World`
/// itself.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u16)]
pub enum EventKind {
    KeyDown = 0,
    KeyUp = 1,
    ButtonDown = 2,
    ButtonUp = 3,
    MouseMove = 4,
    ComponentAdd = 5,
    ComponentSet = 6,
    ComponentRemove = 7,
    EntityModified = 8,
    Quit = 9,
    /// Script-defined event kinds start here and upward.
    UserStart = 0x100,
}

impl EventKind {
    pub fn from_u16(raw: u16) -> Option<EventKind> {
        match raw {
            0 => Some(EventKind::KeyDown),
            1 => Some(EventKind::KeyUp),
            2 => Some(EventKind::ButtonDown),
            3 => Some(EventKind::ButtonUp),
            4 => Some(EventKind::MouseMove),
            5 => Some(EventKind::ComponentAdd),
            6 => Some(EventKind::ComponentSet),
            7 => Some(EventKind::ComponentRemove),
            8 => Some(EventKind::EntityModified),
            9 => Some(EventKind::Quit),
            0x100 => Some(EventKind::UserStart),
            _ => None,
        }
    }
}

pub const PAYLOAD_BYTES: usize = 24;

/// Wire-level event record: `#[repr(C)]` keeps the field order (and thus
/// the layout) stable across targets.
#[derive(Copy, Clone)]
#[repr(C)]
pub struct Event {
    pub id: u16,
    pub size: u8,
    pub payload: [u8; PAYLOAD_BYTES],
}

impl Event {
    pub fn new(kind: EventKind, payload: &[u8]) -> Self {
        assert!(
            payload.len() <= PAYLOAD_BYTES,
            "event payload exceeds the 24-byte inline capacity"
        );
        let mut bytes = [0u8; PAYLOAD_BYTES];
        bytes[..payload.len()].copy_from_slice(payload);
        Self {
            id: kind as u16,
            size: payload.len() as u8,
            payload: bytes,
        }
    }

    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_u16(self.id)
    }

    pub fn payload_bytes(&self) -> &[u8] {
        &self.payload[..self.size as usize]
    }
}

/// Bitflags for `KeyPayload`/`ButtonPayload::mods`.
pub mod mods {
    pub const SHIFT: u8 = 1 << 0;
    pub const CTRL: u8 = 1 << 1;
    pub const ALT: u8 = 1 << 2;
    pub const SUPER: u8 = 1 << 3;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct KeyPayload {
    pub key: u16,
    pub mods: u8,
    /// 0 = up, 1 = down.
    pub state: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct ButtonPayload {
    pub button: u8,
    pub mods: u8,
    pub state: u8,
    pub x: i16,
    pub y: i16,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct MovePayload {
    pub x: i16,
    pub y: i16,
}

/// Cross-layer events (e.g. `component_add`/`set`/`remove`) use four
/// little-endian `u32`s instead of a dedicated struct.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct IntTuplePayload(pub u32, pub u32, pub u32, pub u32);

/// # Safety
/// Callers must ensure `T`'s in-memory layout matches the wire shape the
/// event's `kind` documents and that `size_of::<T>() <= PAYLOAD_BYTES`.
pub unsafe fn bytes_of<T: Copy>(value: &T) -> &[u8] {
    std::slice::from_raw_parts((value as *const T) as *const u8, std::mem::size_of::<T>())
}

/// # Safety
/// Callers must ensure the event's payload bytes were produced from a `T`
/// with the same layout.
pub unsafe fn payload_as<T: Copy>(event: &Event) -> T {
    assert_eq!(event.size as usize, std::mem::size_of::<T>());
    std::ptr::read(event.payload.as_ptr() as *const T)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_payload_round_trips_through_the_wire_record() {
        let payload = KeyPayload {
            key: 42,
            mods: mods::SHIFT | mods::CTRL,
            state: 1,
        };
        let event = unsafe { Event::new(EventKind::KeyDown, bytes_of(&payload)) };
        assert_eq!(event.kind(), Some(EventKind::KeyDown));
        let decoded: KeyPayload = unsafe { payload_as(&event) };
        assert_eq!(decoded, payload);
    }

    #[test]
    fn int_tuple_payload_for_cross_layer_events() {
        let payload = IntTuplePayload(1, 2, 3, 4);
        let event = unsafe { Event::new(EventKind::ComponentAdd, bytes_of(&payload)) };
        let decoded: IntTuplePayload = unsafe { payload_as(&event) };
        assert_eq!(decoded, payload);
    }
}
