//! Keystroke forwarding into the page's search box.
//!
//! The on-screen keyboard itself lives outside this crate; it hands us one key
//! at a time and we turn it into a small text-insertion script. Key text is
//! serialized as a JSON string literal so no key can break out of the script.

/// Element that receives forwarded keys.
pub const DEFAULT_SEARCH_SELECTOR: &str = "input#search";

/// Key that deletes the last character.
pub const BACKSPACE_KEY: &str = "<";

/// One forwarded key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCommand {
    Backspace,
    Insert(String),
}

impl KeyCommand {
    pub fn from_key(key: &str) -> Self {
        if key == BACKSPACE_KEY {
            KeyCommand::Backspace
        } else {
            KeyCommand::Insert(key.to_string())
        }
    }

    /// Script applying this key to the element matched by `selector`.
    pub fn to_script(&self, selector: &str) -> String {
        let selector = js_string(selector);
        match self {
            KeyCommand::Backspace => format!(
                "(function(){{var s=document.querySelector({selector});if(s){{s.value=s.value.slice(0,-1);}}}})();"
            ),
            KeyCommand::Insert(text) => {
                let text = js_string(text);
                format!(
                    "(function(){{var s=document.querySelector({selector});if(s){{s.value+={text};}}}})();"
                )
            }
        }
    }
}

fn js_string(value: &str) -> String {
    // A &str always serializes.
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Live keyboard session, owned by the navigation controller while open.
#[derive(Debug, Clone)]
pub struct KeyboardBridge {
    selector: String,
    keys_sent: u64,
}

impl KeyboardBridge {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            keys_sent: 0,
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn keys_sent(&self) -> u64 {
        self.keys_sent
    }

    /// Script for the next on-screen key; counts the key as sent.
    pub fn script_for(&mut self, key: &str) -> String {
        self.script_for_command(&KeyCommand::from_key(key))
    }

    /// Script for an already decoded key press; counts the key as sent.
    pub fn script_for_command(&mut self, command: &KeyCommand) -> String {
        self.keys_sent += 1;
        command.to_script(&self.selector)
    }
}

impl Default for KeyboardBridge {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_SELECTOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backspace_key() {
        assert_eq!(KeyCommand::from_key("<"), KeyCommand::Backspace);
        let script = KeyCommand::Backspace.to_script(DEFAULT_SEARCH_SELECTOR);
        assert_eq!(
            script,
            r#"(function(){var s=document.querySelector("input#search");if(s){s.value=s.value.slice(0,-1);}})();"#
        );
    }

    #[test]
    fn test_plain_keys_insert() {
        for key in ["a", "Z", "_", " ", "7"] {
            assert_eq!(KeyCommand::from_key(key), KeyCommand::Insert(key.to_string()));
        }
        let script = KeyCommand::from_key("_").to_script(DEFAULT_SEARCH_SELECTOR);
        assert!(script.ends_with(r#"if(s){s.value+="_";}})();"#));
    }

    #[test]
    fn test_quote_key_is_escaped() {
        let script = KeyCommand::from_key("\"").to_script(DEFAULT_SEARCH_SELECTOR);
        assert!(script.contains(r#"s.value+="\"";"#));
        let script = KeyCommand::from_key("\\").to_script(DEFAULT_SEARCH_SELECTOR);
        assert!(script.contains(r#"s.value+="\\";"#));
    }

    #[test]
    fn test_bridge_counts_keys() {
        let mut bridge = KeyboardBridge::default();
        bridge.script_for("a");
        bridge.script_for("<");
        bridge.script_for_command(&KeyCommand::Insert("<".into()));
        assert_eq!(bridge.keys_sent(), 3);
        assert_eq!(bridge.selector(), "input#search");
    }
}
