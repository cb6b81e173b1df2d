//! Message model and the fixed display strings of the widget.

use serde::{Deserialize, Serialize};

/// Greeting rendered once when a widget is mounted.
pub const WELCOME_TEXT: &str = "Hello! Welcome to Intellius Chat Service.";

/// Build the scripted bot reply for a submitted message.
#[must_use]
pub fn echo_text(submitted: &str) -> String {
    format!("Hello! You said \"{submitted}\".")
}

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person typing into the widget.
    User,
    /// The scripted responder.
    Bot,
}

impl Sender {
    /// Display label shown in front of the message text.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Bot => "Bot",
        }
    }

    /// CSS class qualifying the entry container.
    #[must_use]
    pub fn css_class(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

/// A single chat message. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_template() {
        assert_eq!(echo_text("hi"), "Hello! You said \"hi\".");
        assert_eq!(echo_text("a \"quoted\" word"), "Hello! You said \"a \"quoted\" word\".");
    }

    #[test]
    fn test_sender_serialization() {
        let json = serde_json::to_string(&Message::bot(WELCOME_TEXT)).unwrap();
        assert!(json.contains("\"sender\":\"bot\""));

        let parsed: Message = serde_json::from_str(r#"{"sender":"user","text":"hey"}"#).unwrap();
        assert_eq!(parsed, Message::user("hey"));
    }

    #[test]
    fn test_labels() {
        assert_eq!(Sender::User.label(), "User");
        assert_eq!(Sender::Bot.label(), "Bot");
        assert_eq!(Sender::Bot.css_class(), "bot");
    }
}
