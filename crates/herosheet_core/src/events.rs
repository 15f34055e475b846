//! Input vocabulary shared between hosts and the overlay engine

/// Keyboard keys the engine reacts to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Escape,
    Tab,
    /// Any other key, identified by the host's raw code
    Other(u32),
}

/// Modifier keys held during an input event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// No modifiers held
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Only shift held
    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    /// Check if any modifier is held
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// Mouse button identifier (matches platform)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

impl MouseButton {
    /// Primary activation button
    pub fn is_primary(&self) -> bool {
        matches!(self, MouseButton::Left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_any() {
        assert!(!Modifiers::NONE.any());
        assert!(Modifiers::shift().any());
        assert!(Modifiers {
            meta: true,
            ..Default::default()
        }
        .any());
    }

    #[test]
    fn test_primary_button() {
        assert!(MouseButton::Left.is_primary());
        assert!(!MouseButton::Middle.is_primary());
    }
}
