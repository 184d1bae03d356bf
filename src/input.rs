//! Keyboard modifier tracking.
//!
//! The drawing canvas needs to know whether the pan/zoom modifier is held
//! while pointer and wheel events arrive. Rather than reading window-global
//! key state, an [`InputController`] is attached to the canvas for as long as
//! the canvas is live and is injected into the capture state machine.

use serde::{Deserialize, Serialize};

/// Keys the canvas cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Control,
    Shift,
    Alt,
    Meta,
    Space,
    Escape,
    Backspace,
    Enter,
    /// Any printable character, lowercased.
    Char(char),
}

impl Key {
    /// Whether this key can act as the pan/zoom modifier.
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            Key::Control | Key::Shift | Key::Alt | Key::Meta | Key::Space
        )
    }
}

/// Owner of the modifier-key state for one canvas.
///
/// Events are only tracked between [`attach`](Self::attach) and
/// [`detach`](Self::detach); detaching forgets any held key so a release
/// that happens while detached cannot leave the modifier stuck.
#[derive(Debug, Clone)]
pub struct InputController {
    modifier: Key,
    attached: bool,
    modifier_held: bool,
}

impl InputController {
    pub fn new(modifier: Key) -> Self {
        Self {
            modifier,
            attached: false,
            modifier_held: false,
        }
    }

    /// Start receiving key events.
    pub fn attach(&mut self) {
        if !self.attached {
            log::debug!("Input controller attached (modifier {:?})", self.modifier);
        }
        self.attached = true;
    }

    /// Stop receiving key events and clear held state.
    pub fn detach(&mut self) {
        if self.attached {
            log::debug!("Input controller detached");
        }
        self.attached = false;
        self.modifier_held = false;
    }

    pub fn modifier(&self) -> Key {
        self.modifier
    }

    /// Record a key press. Returns true if the modifier became held.
    pub fn key_down(&mut self, key: Key) -> bool {
        if !self.attached || key != self.modifier || self.modifier_held {
            return false;
        }
        self.modifier_held = true;
        true
    }

    /// Record a key release. Returns true if the modifier was released.
    pub fn key_up(&mut self, key: Key) -> bool {
        if !self.attached || key != self.modifier || !self.modifier_held {
            return false;
        }
        self.modifier_held = false;
        true
    }

    /// Window lost focus: releases never arrive, so drop held state.
    pub fn blur(&mut self) -> bool {
        std::mem::replace(&mut self.modifier_held, false)
    }

    pub fn modifier_held(&self) -> bool {
        self.attached && self.modifier_held
    }
}

impl Default for InputController {
    fn default() -> Self {
        Self::new(Key::Control)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignores_keys_while_detached() {
        let mut input = InputController::new(Key::Control);
        assert!(!input.key_down(Key::Control));
        assert!(!input.modifier_held());

        input.attach();
        assert!(input.key_down(Key::Control));
        assert!(input.modifier_held());
    }

    #[test]
    fn test_detach_clears_held_modifier() {
        let mut input = InputController::new(Key::Space);
        input.attach();
        input.key_down(Key::Space);
        input.detach();
        input.attach();
        assert!(!input.modifier_held());
    }

    #[test]
    fn test_other_keys_do_not_toggle_modifier() {
        let mut input = InputController::new(Key::Control);
        input.attach();
        assert!(!input.key_down(Key::Shift));
        assert!(!input.modifier_held());
        input.key_down(Key::Control);
        assert!(!input.key_up(Key::Shift));
        assert!(input.modifier_held());
        assert!(input.key_up(Key::Control));
    }

    #[test]
    fn test_blur_releases_modifier() {
        let mut input = InputController::default();
        input.attach();
        input.key_down(Key::Control);
        assert!(input.blur());
        assert!(!input.modifier_held());
    }
}
