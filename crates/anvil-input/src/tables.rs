//! Pure-function platform-code → canonical-vocabulary tables.
//!
//! Each table is a plain `match`, the same shape `ze-windows-platform`'s
//! message pump uses for its own VK/X11 translation — no runtime state, so
//! these are free functions rather than methods on `Context`.

use crate::key::{Button, Key, ModBits, Mods};

/// Win32 virtual-key code → [`Key`].
pub fn vk_to_key(vk: u32) -> Key {
    match vk {
        0x1B => Key::Escape,
        0x0D => Key::Enter,
        0x20 => Key::Space,
        0x25 => Key::Left,
        0x26 => Key::Up,
        0x27 => Key::Right,
        0x28 => Key::Down,
        0x30 => Key::Num0,
        0x31 => Key::Num1,
        0x32 => Key::Num2,
        0x33 => Key::Num3,
        0x34 => Key::Num4,
        0x35 => Key::Num5,
        0x36 => Key::Num6,
        0x37 => Key::Num7,
        0x38 => Key::Num8,
        0x39 => Key::Num9,
        0x41 => Key::A,
        0x42 => Key::B,
        0x43 => Key::C,
        0x44 => Key::D,
        0x45 => Key::E,
        0x46 => Key::F,
        0x47 => Key::G,
        0x48 => Key::H,
        0x49 => Key::I,
        0x4A => Key::J,
        0x4B => Key::K,
        0x4C => Key::L,
        0x4D => Key::M,
        0x4E => Key::N,
        0x4F => Key::O,
        0x50 => Key::P,
        0x51 => Key::Q,
        0x52 => Key::R,
        0x53 => Key::S,
        0x54 => Key::T,
        0x55 => Key::U,
        0x56 => Key::V,
        0x57 => Key::W,
        0x58 => Key::X,
        0x59 => Key::Y,
        0x5A => Key::Z,
        _ => Key::Unknown,
    }
}

/// X11 keysym → [`Key`]. Accepts both upper- and lower-case Latin keysyms
/// (`0x0041..=0x005A`, `0x0061..=0x007A`) since X11 reports the shifted and
/// unshifted keysym separately.
pub fn keysym_to_key(sym: u32) -> Key {
    match sym {
        0xFF1B => Key::Escape,
        0xFF0D => Key::Enter,
        0xFF51 => Key::Left,
        0xFF52 => Key::Up,
        0xFF53 => Key::Right,
        0xFF54 => Key::Down,
        0x0020 => Key::Space,
        0x0030 => Key::Num0,
        0x0031 => Key::Num1,
        0x0032 => Key::Num2,
        0x0033 => Key::Num3,
        0x0034 => Key::Num4,
        0x0035 => Key::Num5,
        0x0036 => Key::Num6,
        0x0037 => Key::Num7,
        0x0038 => Key::Num8,
        0x0039 => Key::Num9,
        0x0041 | 0x0061 => Key::A,
        0x0042 | 0x0062 => Key::B,
        0x0043 | 0x0063 => Key::C,
        0x0044 | 0x0064 => Key::D,
        0x0045 | 0x0065 => Key::E,
        0x0046 | 0x0066 => Key::F,
        0x0047 | 0x0067 => Key::G,
        0x0048 | 0x0068 => Key::H,
        0x0049 | 0x0069 => Key::I,
        0x004A | 0x006A => Key::J,
        0x004B | 0x006B => Key::K,
        0x004C | 0x006C => Key::L,
        0x004D | 0x006D => Key::M,
        0x004E | 0x006E => Key::N,
        0x004F | 0x006F => Key::O,
        0x0050 | 0x0070 => Key::P,
        0x0051 | 0x0071 => Key::Q,
        0x0052 | 0x0072 => Key::R,
        0x0053 | 0x0073 => Key::S,
        0x0054 | 0x0074 => Key::T,
        0x0055 | 0x0075 => Key::U,
        0x0056 | 0x0076 => Key::V,
        0x0057 | 0x0077 => Key::W,
        0x0058 | 0x0078 => Key::X,
        0x0059 | 0x0079 => Key::Y,
        0x005A | 0x007A => Key::Z,
        _ => Key::Unknown,
    }
}

/// Linux evdev key code (`linux/input-event-codes.h`) → [`Key`].
pub fn evdev_to_key(code: u32) -> Key {
    match code {
        1 => Key::Escape,
        28 => Key::Enter,
        57 => Key::Space,
        103 => Key::Up,
        105 => Key::Left,
        106 => Key::Right,
        108 => Key::Down,
        2 => Key::Num1,
        3 => Key::Num2,
        4 => Key::Num3,
        5 => Key::Num4,
        6 => Key::Num5,
        7 => Key::Num6,
        8 => Key::Num7,
        9 => Key::Num8,
        10 => Key::Num9,
        11 => Key::Num0,
        30 => Key::A,
        48 => Key::B,
        46 => Key::C,
        32 => Key::D,
        18 => Key::E,
        33 => Key::F,
        34 => Key::G,
        35 => Key::H,
        23 => Key::I,
        36 => Key::J,
        37 => Key::K,
        38 => Key::L,
        50 => Key::M,
        49 => Key::N,
        24 => Key::O,
        25 => Key::P,
        16 => Key::Q,
        19 => Key::R,
        31 => Key::S,
        20 => Key::T,
        22 => Key::U,
        47 => Key::V,
        17 => Key::W,
        45 => Key::X,
        21 => Key::Y,
        44 => Key::Z,
        _ => Key::Unknown,
    }
}

/// X11 modifier mask → [`Mods`].
pub fn mods_from_mask(mask: u32) -> Mods {
    let mut mods = Mods::empty();
    if mask & (1 << 0) != 0 {
        mods |= ModBits::Shift;
    }
    if mask & (1 << 2) != 0 {
        mods |= ModBits::Ctrl;
    }
    if mask & (1 << 3) != 0 {
        mods |= ModBits::Alt;
    }
    if mask & (1 << 6) != 0 {
        mods |= ModBits::Super;
    }
    mods
}

/// X11 button code → [`Button`].
pub fn button_code_to_button(code: u32) -> Button {
    match code {
        1 => Button::Left,
        3 => Button::Right,
        _ => Button::Middle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vk_table_covers_the_documented_alphabet() {
        assert_eq!(vk_to_key(0x1B), Key::Escape);
        assert_eq!(vk_to_key(0x0D), Key::Enter);
        assert_eq!(vk_to_key(0x20), Key::Space);
        assert_eq!(vk_to_key(0x26), Key::Up);
        assert_eq!(vk_to_key(0x41), Key::A);
        assert_eq!(vk_to_key(0x39), Key::Num9);
        assert_eq!(vk_to_key(0xFFFF), Key::Unknown);
    }

    #[test]
    fn keysym_table_accepts_upper_and_lower_case() {
        assert_eq!(keysym_to_key(0xFF1B), Key::Escape);
        assert_eq!(keysym_to_key(0x0041), Key::A);
        assert_eq!(keysym_to_key(0x0061), Key::A);
        assert_eq!(keysym_to_key(0xFF51), Key::Left);
        assert_eq!(keysym_to_key(0), Key::Unknown);
    }

    #[test]
    fn evdev_table_covers_the_documented_alphabet() {
        assert_eq!(evdev_to_key(1), Key::Escape);
        assert_eq!(evdev_to_key(57), Key::Space);
        assert_eq!(evdev_to_key(30), Key::A);
        assert_eq!(evdev_to_key(11), Key::Num0);
        assert_eq!(evdev_to_key(999), Key::Unknown);
    }

    #[test]
    fn mods_from_mask_decodes_each_bit_independently() {
        assert_eq!(mods_from_mask(0b1), ModBits::Shift);
        assert_eq!(mods_from_mask(0b0100), ModBits::Ctrl);
        assert_eq!(mods_from_mask(0b1000), ModBits::Alt);
        assert_eq!(mods_from_mask(0b0100_0000), ModBits::Super);
        assert_eq!(
            mods_from_mask(0b0100_1101),
            ModBits::Shift | ModBits::Ctrl | ModBits::Alt | ModBits::Super
        );
    }

    #[test]
    fn button_code_maps_left_and_right_explicitly() {
        assert_eq!(button_code_to_button(1), Button::Left);
        assert_eq!(button_code_to_button(3), Button::Right);
        assert_eq!(button_code_to_button(2), Button::Middle);
    }
}
