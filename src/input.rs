use std::collections::HashSet;

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
    Function(u8),
}

impl KeyCode {
    /// Parses the key names accepted in key binding settings.
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            if ch.is_ascii_alphabetic() {
                return Some(Self::Character(ch.to_ascii_uppercase()));
            }
            if ch.is_ascii_digit() {
                return Some(Self::Digit(ch as u8 - b'0'));
            }
            return match ch {
                '.' => Some(Self::Named(NamedKey::Period)),
                ',' => Some(Self::Named(NamedKey::Comma)),
                _ => None,
            };
        }
        if let Some(function) = name.strip_prefix('F').or_else(|| name.strip_prefix('f')) {
            if let Ok(index) = function.parse::<u8>() {
                if (1..=25).contains(&index) {
                    return Some(Self::Function(index));
                }
            }
        }
        None
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Space" => Space,
        "Enter" | "Return" => Enter,
        "Tab" => Tab,
        "Left" => Left,
        "Right" => Right,
        "Up" => Up,
        "Down" => Down,
        "Escape" | "Esc" => Escape,
        "Backspace" => Backspace,
        "Period" => Period,
        "Comma" => Comma,
        "LeftShift" | "LShift" => LeftShift,
        "RightShift" | "RShift" => RightShift,
        "LeftCtrl" | "LControl" => LeftCtrl,
        "RightCtrl" | "RControl" => RightCtrl,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

/// Friendly names for the non-character keys the renderer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Space,
    Enter,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Backspace,
    Period,
    Comma,
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
}

/// Keyboard queries consumed by the scene update.
pub trait InputProvider {
    /// True for as long as the key is held down.
    fn is_key_held(&self, key: KeyCode) -> bool;

    /// True only during the frame in which the key went down.
    fn was_key_pressed(&self, key: KeyCode) -> bool;
}

/// Keyboard snapshot fed by the window event loop (or by scripted presses
/// in headless runs).
#[derive(Debug, Default, Clone)]
pub struct InputState {
    held: HashSet<KeyCode>,
    pressed: HashSet<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&mut self, key: KeyCode) {
        if self.held.insert(key) {
            self.pressed.insert(key);
        }
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.held.remove(&key);
    }

    /// Registers a press-and-release that happened within one frame.
    pub fn tap(&mut self, key: KeyCode) {
        self.pressed.insert(key);
    }

    /// Forgets this frame's key-down edges. Call once after the update.
    pub fn end_frame(&mut self) {
        self.pressed.clear();
    }
}

impl InputProvider for InputState {
    fn is_key_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    fn was_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_character_keys() {
        assert_eq!(
            KeyCode::from_name("Space"),
            Some(KeyCode::Named(NamedKey::Space))
        );
        assert_eq!(KeyCode::from_name("a"), Some(KeyCode::Character('A')));
        assert_eq!(KeyCode::from_name("4"), Some(KeyCode::Digit(4)));
        assert_eq!(
            KeyCode::from_name("."),
            Some(KeyCode::Named(NamedKey::Period))
        );
        assert_eq!(KeyCode::from_name("F12"), Some(KeyCode::Function(12)));
        assert_eq!(KeyCode::from_name("F30"), None);
        assert_eq!(KeyCode::from_name("Banana"), None);
    }

    #[test]
    fn pressed_is_edge_triggered() {
        let mut state = InputState::new();
        let key = KeyCode::Digit(4);
        state.set_key_down(key);
        assert!(state.is_key_held(key));
        assert!(state.was_key_pressed(key));

        state.end_frame();
        state.set_key_down(key); // auto-repeat while held
        assert!(state.is_key_held(key));
        assert!(!state.was_key_pressed(key));

        state.set_key_up(key);
        assert!(!state.is_key_held(key));
    }

    #[test]
    fn tap_presses_without_holding() {
        let mut state = InputState::new();
        state.tap(KeyCode::Digit(2));
        assert!(state.was_key_pressed(KeyCode::Digit(2)));
        assert!(!state.is_key_held(KeyCode::Digit(2)));
    }
}
