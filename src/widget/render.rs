//! Entry markup.
//!
//! Every transcript entry is a container carrying a sender-qualifying class
//! and a label + text pair:
//!
//! ```html
//! <div class="message bot"><div class="message-content"><strong>Bot:</strong> Hi</div></div>
//! ```

use super::message::Message;

/// How message text is interpolated into entry markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkupPolicy {
    /// HTML-escape the text before interpolation.
    #[default]
    Escaped,
    /// Interpolate the text verbatim. Markup typed by the user is rendered as markup.
    Raw,
}

impl MarkupPolicy {
    #[must_use]
    pub fn from_escape_flag(escape: bool) -> Self {
        if escape { Self::Escaped } else { Self::Raw }
    }
}

/// Render one transcript entry.
#[must_use]
pub fn entry_markup(message: &Message, policy: MarkupPolicy) -> String {
    let text = match policy {
        MarkupPolicy::Escaped => html_escape::encode_text(&message.text),
        MarkupPolicy::Raw => message.text.as_str().into(),
    };

    format!(
        r#"<div class="message {class}"><div class="message-content"><strong>{label}:</strong> {text}</div></div>"#,
        class = message.sender.css_class(),
        label = message.sender.label(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_structure() {
        let html = entry_markup(&Message::user("hi"), MarkupPolicy::Escaped);
        assert_eq!(
            html,
            r#"<div class="message user"><div class="message-content"><strong>User:</strong> hi</div></div>"#
        );
    }

    #[test]
    fn test_escaped_policy() {
        let html = entry_markup(&Message::user("<b>x</b> & y"), MarkupPolicy::Escaped);
        assert!(html.contains("&lt;b&gt;x&lt;/b&gt; &amp; y"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_raw_policy_keeps_markup() {
        let html = entry_markup(&Message::bot("<b>x</b>"), MarkupPolicy::Raw);
        assert!(html.contains("<strong>Bot:</strong> <b>x</b>"));
    }

    #[test]
    fn test_policy_from_flag() {
        assert_eq!(MarkupPolicy::from_escape_flag(true), MarkupPolicy::Escaped);
        assert_eq!(MarkupPolicy::from_escape_flag(false), MarkupPolicy::Raw);
    }
}
