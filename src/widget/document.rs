//! In-memory document backing a widget.
//!
//! The document holds the elements the widget binds to. Elements are only
//! ever added, so a handle obtained from a document stays valid for the
//! document's lifetime.

use super::message::Message;
use super::render::{MarkupPolicy, entry_markup};

/// Identifier of the transcript container.
pub const MESSAGES_ID: &str = "messages";
/// Identifier of the submission form.
pub const MESSAGE_FORM_ID: &str = "messageForm";
/// Identifier of the draft text input.
pub const MESSAGE_INPUT_ID: &str = "messageInput";

/// One rendered unit in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub message: Message,
    pub html: String,
}

impl Entry {
    pub fn render(message: Message, policy: MarkupPolicy) -> Self {
        let html = entry_markup(&message, policy);
        Self { message, html }
    }
}

/// Scrollable, append-only list of entries.
#[derive(Debug, Default)]
pub struct Container {
    entries: Vec<Entry>,
    scroll_top: usize,
}

impl Container {
    /// Append an entry as the last child and scroll to the bottom.
    pub fn append(&mut self, entry: Entry) {
        self.entries.push(entry);
        self.scroll_top = self.scroll_height();
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Total scrollable height, measured in entries.
    pub fn scroll_height(&self) -> usize {
        self.entries.len()
    }

    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    /// Scroll to an arbitrary position, clamped to the scroll height.
    pub fn scroll_to(&mut self, top: usize) {
        self.scroll_top = top.min(self.scroll_height());
    }

    /// Whether the newest entry is in view.
    pub fn is_scrolled_to_bottom(&self) -> bool {
        self.scroll_top == self.scroll_height()
    }

    /// Concatenated markup of all entries.
    pub fn inner_html(&self) -> String {
        self.entries.iter().map(|e| e.html.as_str()).collect()
    }
}

/// Single-line text input.
#[derive(Debug, Default)]
pub struct TextInput {
    value: String,
}

impl TextInput {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }
}

/// The form's submit action.
///
/// Mirrors a browser submit event: the handler decides whether the default
/// navigation is suppressed.
#[derive(Debug, Default)]
pub struct SubmitEvent {
    default_prevented: bool,
}

impl SubmitEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Handle to a container element in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHandle(usize);

/// Handle to a form element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormHandle(usize);

/// Handle to a text input element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputHandle(usize);

/// Element tree addressable by identifier.
#[derive(Debug, Default)]
pub struct Document {
    containers: Vec<(String, Container)>,
    forms: Vec<String>,
    inputs: Vec<(String, TextInput)>,
}

impl Document {
    /// An empty document with no elements.
    pub fn new() -> Self {
        Self::default()
    }

    /// The hosting page: a `messages` container, a `messageForm` form and a
    /// `messageInput` text input.
    pub fn chat_page() -> Self {
        let mut doc = Self::new();
        doc.add_container(MESSAGES_ID);
        doc.add_form(MESSAGE_FORM_ID);
        doc.add_input(MESSAGE_INPUT_ID);
        doc
    }

    pub fn add_container(&mut self, id: impl Into<String>) -> ContainerHandle {
        self.containers.push((id.into(), Container::default()));
        ContainerHandle(self.containers.len() - 1)
    }

    pub fn add_form(&mut self, id: impl Into<String>) -> FormHandle {
        self.forms.push(id.into());
        FormHandle(self.forms.len() - 1)
    }

    pub fn add_input(&mut self, id: impl Into<String>) -> InputHandle {
        self.inputs.push((id.into(), TextInput::default()));
        InputHandle(self.inputs.len() - 1)
    }

    pub fn container_by_id(&self, id: &str) -> Option<ContainerHandle> {
        self.containers
            .iter()
            .position(|(el_id, _)| el_id == id)
            .map(ContainerHandle)
    }

    pub fn form_by_id(&self, id: &str) -> Option<FormHandle> {
        self.forms.iter().position(|el_id| el_id == id).map(FormHandle)
    }

    pub fn input_by_id(&self, id: &str) -> Option<InputHandle> {
        self.inputs
            .iter()
            .position(|(el_id, _)| el_id == id)
            .map(InputHandle)
    }

    pub fn container(&self, handle: ContainerHandle) -> &Container {
        &self.containers[handle.0].1
    }

    pub fn container_mut(&mut self, handle: ContainerHandle) -> &mut Container {
        &mut self.containers[handle.0].1
    }

    pub fn input(&self, handle: InputHandle) -> &TextInput {
        &self.inputs[handle.0].1
    }

    pub fn input_mut(&mut self, handle: InputHandle) -> &mut TextInput {
        &mut self.inputs[handle.0].1
    }

    pub fn form_id(&self, handle: FormHandle) -> &str {
        &self.forms[handle.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_page_elements() {
        let doc = Document::chat_page();
        assert!(doc.container_by_id(MESSAGES_ID).is_some());
        assert!(doc.input_by_id(MESSAGE_INPUT_ID).is_some());

        let form = doc.form_by_id(MESSAGE_FORM_ID).unwrap();
        assert_eq!(doc.form_id(form), "messageForm");

        // Lookups are typed: the form id is not a container.
        assert!(doc.container_by_id(MESSAGE_FORM_ID).is_none());
    }

    #[test]
    fn test_append_scrolls_to_bottom() {
        let mut container = Container::default();
        assert!(container.is_scrolled_to_bottom());

        container.append(Entry::render(Message::bot("one"), MarkupPolicy::Escaped));
        container.scroll_to(0);
        assert!(!container.is_scrolled_to_bottom());

        container.append(Entry::render(Message::user("two"), MarkupPolicy::Escaped));
        assert_eq!(container.scroll_top(), 2);
        assert!(container.is_scrolled_to_bottom());
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut container = Container::default();
        container.append(Entry::render(Message::bot("one"), MarkupPolicy::Escaped));
        container.scroll_to(50);
        assert_eq!(container.scroll_top(), 1);
    }

    #[test]
    fn test_input_value() {
        let mut doc = Document::chat_page();
        let input = doc.input_by_id(MESSAGE_INPUT_ID).unwrap();

        doc.input_mut(input).set_value("  draft ");
        assert_eq!(doc.input(input).value(), "  draft ");

        doc.input_mut(input).clear();
        assert_eq!(doc.input(input).value(), "");
    }

    #[test]
    fn test_submit_event() {
        let mut event = SubmitEvent::new();
        assert!(!event.default_prevented());
        event.prevent_default();
        assert!(event.default_prevented());
    }
}
