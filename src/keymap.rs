//! Key-name translation for keyboard events.
//!
//! The view reports keys as `[modifier+]k<Key>` using browser key names,
//! e.g. `ctrl+kArrowLeft` or `shift+kA`. Renderers that understand that form
//! get the payload untouched; older ones need it rewritten into plain names
//! (`ctrl+left`, `A`). The strategy is picked once per canvas from the
//! renderer's reported capabilities.

use serde_json::Value;

use crate::backend::RenderCapabilities;
use crate::frame::Data;

/// Inbound kinds whose payload carries a `key` field.
pub const KEY_EVENTS: [&str; 2] = ["key_press", "key_release"];

pub trait KeyTranslator {
    fn translate(&self, raw: &str) -> String;
}

/// The renderer decodes browser key names itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughKeys;

impl KeyTranslator for PassthroughKeys {
    fn translate(&self, raw: &str) -> String {
        raw.to_string()
    }
}

/// Rewrites browser key names into plain renderer key names.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserKeyNames;

impl KeyTranslator for BrowserKeyNames {
    fn translate(&self, raw: &str) -> String {
        let Some(marker) = raw.find('k') else {
            return raw.to_string();
        };
        let (prefix, rest) = raw.split_at(marker);
        let value = &rest[1..];

        let prefix = if prefix.contains("shift+") && value.chars().count() == 1 {
            prefix.replace("shift+", "")
        } else {
            prefix.to_string()
        };
        let value = special_key(value).unwrap_or(value);
        format!("{prefix}{value}")
    }
}

fn special_key(name: &str) -> Option<&'static str> {
    let mapped = match name {
        "AltGraph" | "Alt" => "alt",
        "CapsLock" => "caps_lock",
        "Control" => "control",
        "Meta" => "meta",
        "NumLock" => "num_lock",
        "ScrollLock" => "scroll_lock",
        "Shift" => "shift",
        "Super" => "super",
        "Enter" => "enter",
        "Tab" => "tab",
        "ArrowDown" => "down",
        "ArrowLeft" => "left",
        "ArrowRight" => "right",
        "ArrowUp" => "up",
        "End" => "end",
        "Home" => "home",
        "PageDown" => "pagedown",
        "PageUp" => "pageup",
        "Backspace" => "backspace",
        "Delete" => "delete",
        "Insert" => "insert",
        "Escape" => "escape",
        "Pause" => "pause",
        "Select" => "select",
        "Dead" => "dead",
        "F1" => "f1",
        "F2" => "f2",
        "F3" => "f3",
        "F4" => "f4",
        "F5" => "f5",
        "F6" => "f6",
        "F7" => "f7",
        "F8" => "f8",
        "F9" => "f9",
        "F10" => "f10",
        "F11" => "f11",
        "F12" => "f12",
        _ => return None,
    };
    Some(mapped)
}

/// Pick the translator for a renderer.
#[must_use]
pub fn select_translator(capabilities: &RenderCapabilities) -> Box<dyn KeyTranslator> {
    if capabilities.decodes_browser_keys {
        Box::new(PassthroughKeys)
    } else {
        Box::new(BrowserKeyNames)
    }
}

/// Rewrite the `key` field of a key event payload in place. Payloads without
/// a string `key` are left alone.
pub fn translate_payload(translator: &dyn KeyTranslator, payload: &mut Data) {
    if let Some(Value::String(raw)) = payload.get_mut("key") {
        *raw = translator.translate(raw);
    }
}

#[cfg(test)]
#[path = "keymap_test.rs"]
mod tests;
