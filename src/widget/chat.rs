//! The chat widget component.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::document::{
    ContainerHandle, Document, Entry, FormHandle, InputHandle, MESSAGE_FORM_ID, MESSAGE_INPUT_ID,
    MESSAGES_ID, SubmitEvent,
};
use super::echo::EchoScheduler;
use super::message::{Message, Sender, WELCOME_TEXT, echo_text};
use super::render::MarkupPolicy;
use crate::error::WidgetError;

/// Default delay before a bot echo is appended.
pub const DEFAULT_ECHO_DELAY: Duration = Duration::from_millis(1000);

const LIVE_CHANNEL_CAPACITY: usize = 64;

/// Per-widget behavior knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetSettings {
    pub echo_delay: Duration,
    pub markup: MarkupPolicy,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            echo_delay: DEFAULT_ECHO_DELAY,
            markup: MarkupPolicy::default(),
        }
    }
}

/// Whether any echo is still waiting for its delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    Idle,
    PendingEcho { outstanding: usize },
}

/// Outcome of handling one form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The user entry was appended and an echo scheduled.
    Accepted { entry: Entry },
    /// The input trimmed to nothing; the widget is untouched.
    Ignored,
}

/// Document plus the transcript handle, shared with the echo worker.
#[derive(Debug)]
struct Transcript {
    document: Mutex<Document>,
    messages: ContainerHandle,
    markup: MarkupPolicy,
    live: broadcast::Sender<Entry>,
}

impl Transcript {
    fn document(&self) -> MutexGuard<'_, Document> {
        // Appends are single pushes; a poisoned lock still holds a usable document.
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append_to(&self, doc: &mut Document, message: Message) -> Entry {
        let entry = Entry::render(message, self.markup);
        doc.container_mut(self.messages).append(entry.clone());
        // No subscribers is the common case.
        let _ = self.live.send(entry.clone());
        entry
    }

    fn append(&self, message: Message) -> Entry {
        let mut doc = self.document();
        self.append_to(&mut doc, message)
    }
}

/// A mounted chat widget.
///
/// Holds the three handles acquired at mount time. Cloning is cheap and
/// yields another handle to the same widget.
#[derive(Debug, Clone)]
pub struct ChatWidget {
    inner: Arc<ChatWidgetInner>,
}

#[derive(Debug)]
struct ChatWidgetInner {
    id: String,
    transcript: Arc<Transcript>,
    form: FormHandle,
    input: InputHandle,
    echoes: EchoScheduler,
    settings: WidgetSettings,
}

impl ChatWidget {
    /// Bind to `document` and render the greeting.
    ///
    /// Must be called from within a Tokio runtime: the echo worker is
    /// spawned here.
    pub fn mount(
        id: impl Into<String>,
        document: Document,
        settings: WidgetSettings,
    ) -> Result<Self, WidgetError> {
        let id = id.into();
        let messages = document
            .container_by_id(MESSAGES_ID)
            .ok_or_else(|| missing(MESSAGES_ID))?;
        let form = document
            .form_by_id(MESSAGE_FORM_ID)
            .ok_or_else(|| missing(MESSAGE_FORM_ID))?;
        let input = document
            .input_by_id(MESSAGE_INPUT_ID)
            .ok_or_else(|| missing(MESSAGE_INPUT_ID))?;

        let (live, _) = broadcast::channel(LIVE_CHANNEL_CAPACITY);
        let transcript = Arc::new(Transcript {
            document: Mutex::new(document),
            messages,
            markup: settings.markup,
            live,
        });

        let echo_transcript = Arc::clone(&transcript);
        let echo_widget_id = id.clone();
        let echoes = EchoScheduler::spawn(settings.echo_delay, move |submitted| {
            echo_transcript.append(Message::bot(echo_text(&submitted)));
            debug!(
                name: "widget.echo.delivered",
                widget_id = %echo_widget_id,
                "Echo delivered"
            );
        });

        let widget = Self {
            inner: Arc::new(ChatWidgetInner {
                id,
                transcript,
                form,
                input,
                echoes,
                settings,
            }),
        };
        widget.append_message(Sender::Bot, WELCOME_TEXT);

        info!(
            name: "widget.mounted",
            widget_id = %widget.id(),
            echo_delay_ms = %settings.echo_delay.as_millis(),
            markup = ?settings.markup,
            "Chat widget mounted"
        );

        Ok(widget)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn settings(&self) -> WidgetSettings {
        self.inner.settings
    }

    /// Handle the form's submit action.
    ///
    /// Always suppresses the default navigation. A value that trims to
    /// nothing is ignored and the input keeps its content.
    pub fn submit(&self, event: &mut SubmitEvent) -> Submission {
        event.prevent_default();

        let transcript = &self.inner.transcript;
        let mut doc = transcript.document();
        let text = doc.input(self.inner.input).value().trim().to_owned();
        if text.is_empty() {
            debug!(name: "widget.submission.ignored", widget_id = %self.id(), "Empty submission ignored");
            return Submission::Ignored;
        }

        let entry = transcript.append_to(&mut doc, Message::user(text.clone()));
        doc.input_mut(self.inner.input).clear();
        // Scheduled under the lock so echo order matches transcript order.
        self.inner.echoes.schedule(text);
        drop(doc);

        info!(
            name: "widget.submission.accepted",
            widget_id = %self.id(),
            pending_echoes = self.inner.echoes.outstanding(),
            "Submission accepted"
        );

        Submission::Accepted { entry }
    }

    /// Write `value` into the input, then submit.
    pub fn submit_draft(&self, value: &str) -> Submission {
        self.set_draft(value);
        self.submit(&mut SubmitEvent::new())
    }

    /// Replace the input's current value.
    pub fn set_draft(&self, value: &str) {
        self.inner
            .transcript
            .document()
            .input_mut(self.inner.input)
            .set_value(value);
    }

    /// Append an entry for `sender` with the literal `text`.
    pub fn append_message(&self, sender: Sender, text: impl Into<String>) -> Entry {
        self.inner.transcript.append(Message::new(sender, text))
    }

    #[must_use]
    pub fn state(&self) -> WidgetState {
        match self.inner.echoes.outstanding() {
            0 => WidgetState::Idle,
            outstanding => WidgetState::PendingEcho { outstanding },
        }
    }

    /// Receive every entry appended from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Entry> {
        self.inner.transcript.live.subscribe()
    }

    /// Number of live subscribers, e.g. open event streams.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.transcript.live.receiver_count()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.with_document(|doc| doc.container(self.inner.transcript.messages).entries().to_vec())
    }

    #[must_use]
    pub fn transcript(&self) -> Vec<Message> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    /// Markup of the whole transcript, in order.
    #[must_use]
    pub fn messages_html(&self) -> String {
        self.with_document(|doc| doc.container(self.inner.transcript.messages).inner_html())
    }

    #[must_use]
    pub fn input_value(&self) -> String {
        self.with_document(|doc| doc.input(self.inner.input).value().to_owned())
    }

    #[must_use]
    pub fn form_id(&self) -> String {
        self.with_document(|doc| doc.form_id(self.inner.form).to_owned())
    }

    /// Whether the newest entry is scrolled into view.
    #[must_use]
    pub fn is_scrolled_to_bottom(&self) -> bool {
        self.with_document(|doc| {
            doc.container(self.inner.transcript.messages)
                .is_scrolled_to_bottom()
        })
    }

    /// Run `f` with read access to the document.
    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        let doc = self.inner.transcript.document();
        f(&*doc)
    }
}

fn missing(id: &str) -> WidgetError {
    WidgetError::MissingElement { id: id.to_string() }
}
