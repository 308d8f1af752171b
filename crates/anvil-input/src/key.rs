//! Canonical key/button/modifier vocabulary the platform-specific tables in
//! `tables.rs` translate into.
//!
//! Mirrors the shape of `ze-platform::KeyCode`/`MouseButton`. This is the
//! script-boundary vocabulary, so it carries the full enumeration a host
//! binding exposes even where the `tables.rs` translation tables don't
//! populate every variant: no platform table currently maps the two sides
//! of shift/ctrl/alt/super to distinct codes, but the left/right variants
//! still need a numeric identity script code can reference.

use enumflags2::{bitflags, BitFlags};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
#[repr(u32)]
pub enum Key {
    Unknown = 0,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,
    Up,
    Down,
    Left,
    Right,
    LShift,
    RShift,
    LCtrl,
    RCtrl,
    LAlt,
    RAlt,
    LSuper,
    RSuper,
}

/// One past the highest discriminant; sizes `Context::keys`.
pub const KEY_COUNT: usize = Key::RSuper as usize + 1;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
#[repr(u32)]
pub enum Button {
    Unknown = 0,
    Left,
    Right,
    Middle,
}

pub const BUTTON_COUNT: usize = Button::Middle as usize + 1;

/// Modifier bitflags.
#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ModBits {
    Shift = 1 << 0,
    Ctrl = 1 << 1,
    Alt = 1 << 2,
    Super = 1 << 3,
}

pub type Mods = BitFlags<ModBits>;
