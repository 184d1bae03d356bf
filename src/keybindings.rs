//! Customizable keybindings for prompt tools and labels.

use serde::{Deserialize, Serialize};

use crate::input::Key;
use crate::prompt::{Label, Tool};

/// Keybinding configuration for the drawing canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBindings {
    /// Hotkey for the Pan tool
    pub tool_pan: Key,
    /// Hotkey for the Point tool
    pub tool_point: Key,
    /// Hotkey for the Box tool
    pub tool_box: Key,
    /// Hotkey for the Circle tool
    pub tool_circle: Key,
    /// Hotkey for the Polygon tool
    pub tool_polygon: Key,
    /// Hotkey selecting the foreground label
    pub label_foreground: Key,
    /// Hotkey selecting the background label
    pub label_background: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            tool_pan: Key::Char('h'),
            tool_point: Key::Char('p'),
            tool_box: Key::Char('b'),
            tool_circle: Key::Char('c'),
            tool_polygon: Key::Char('g'),
            label_foreground: Key::Char('f'),
            label_background: Key::Char('x'),
        }
    }
}

impl KeyBindings {
    /// Get the tool that corresponds to a key press, if any.
    pub fn tool_for_key(&self, key: Key) -> Option<Tool> {
        Tool::all()
            .iter()
            .copied()
            .find(|tool| self.key_for_tool(*tool) == key)
    }

    /// Get the label that corresponds to a key press, if any.
    pub fn label_for_key(&self, key: Key) -> Option<Label> {
        if key == self.label_foreground {
            Some(Label::FOREGROUND)
        } else if key == self.label_background {
            Some(Label::BACKGROUND)
        } else {
            None
        }
    }

    /// Get the hotkey for a specific tool.
    pub fn key_for_tool(&self, tool: Tool) -> Key {
        match tool {
            Tool::Pan => self.tool_pan,
            Tool::Point => self.tool_point,
            Tool::Box => self.tool_box,
            Tool::Circle => self.tool_circle,
            Tool::Polygon => self.tool_polygon,
        }
    }

    /// Set the hotkey for a tool.
    pub fn set_tool_key(&mut self, tool: Tool, key: Key) {
        match tool {
            Tool::Pan => self.tool_pan = key,
            Tool::Point => self.tool_point = key,
            Tool::Box => self.tool_box = key,
            Tool::Circle => self.tool_circle = key,
            Tool::Polygon => self.tool_polygon = key,
        }
    }
}
