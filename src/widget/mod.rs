//! The chat widget.
//!
//! A widget binds to three elements of a [`Document`] (the `messages`
//! container, the `messageForm` form and the `messageInput` text input),
//! greets the user once, appends each non-empty submission to the transcript
//! and answers it with a scripted echo after a fixed delay.
//!
//! # Example
//!
//! ```rust
//! use intellius_chat::widget::{ChatWidget, Document, Submission, WidgetSettings};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let widget = ChatWidget::mount("demo", Document::chat_page(), WidgetSettings::default()).unwrap();
//! assert_eq!(widget.transcript().len(), 1);
//!
//! let outcome = widget.submit_draft("hi");
//! assert!(matches!(outcome, Submission::Accepted { .. }));
//! assert_eq!(widget.input_value(), "");
//! # }
//! ```

mod chat;
mod document;
mod echo;
mod message;
mod render;

pub use chat::{ChatWidget, DEFAULT_ECHO_DELAY, Submission, WidgetSettings, WidgetState};
pub use document::{
    Container, ContainerHandle, Document, Entry, FormHandle, InputHandle, MESSAGE_FORM_ID,
    MESSAGE_INPUT_ID, MESSAGES_ID, SubmitEvent, TextInput,
};
pub use echo::EchoScheduler;
pub use message::{Message, Sender, WELCOME_TEXT, echo_text};
pub use render::{MarkupPolicy, entry_markup};
