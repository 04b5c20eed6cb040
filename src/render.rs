use pulldown_cmark::{Event, Options, Parser, html};

use crate::models::Message;

/// Shown for an assistant entry that carries neither a reply nor an error.
pub const FALLBACK_ERROR: &str = "An error occurred";

/// How a single conversation entry is displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageView {
    /// Right-aligned literal block.
    User { text: String },
    /// Assistant reply; `markdown` is the source, `html` the rendered form.
    Reply { markdown: String, html: String },
    Failure { text: String },
    /// The turn in flight, with whatever partial reply has arrived so far.
    Processing { partial: Option<String>, html: Option<String> },
}

impl MessageView {
    pub fn is_processing(&self) -> bool {
        matches!(self, MessageView::Processing { .. })
    }
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        if message.is_processing {
            return MessageView::Processing {
                html: message.response.as_deref().map(render_markdown_html),
                partial: message.response.clone(),
            };
        }
        if let Some(text) = &message.content {
            return MessageView::User { text: text.clone() };
        }
        match &message.response {
            Some(markdown) => MessageView::Reply {
                html: render_markdown_html(markdown),
                markdown: markdown.clone(),
            },
            None => MessageView::Failure {
                text: message.error.clone().unwrap_or_else(|| FALLBACK_ERROR.to_string()),
            },
        }
    }
}

/// Turns successive conversation snapshots into terminal lines, printing each
/// finalized entry once and each streaming update of the turn in flight.
#[derive(Debug, Default)]
pub struct Transcript {
    printed: usize,
    shown_partial: Option<Option<String>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines describing what changed since the previous snapshot.
    pub fn update(&mut self, messages: &[Message]) -> Vec<String> {
        let mut lines = Vec::new();

        let finalized: Vec<&Message> = messages.iter().filter(|m| !m.is_processing).collect();
        for message in finalized.iter().skip(self.printed) {
            lines.push(terminal_line(&MessageView::from(*message)));
        }
        self.printed = self.printed.max(finalized.len());

        match messages.iter().find(|m| m.is_processing) {
            Some(placeholder) => {
                if self.shown_partial.as_ref() != Some(&placeholder.response) {
                    lines.push(terminal_line(&MessageView::from(placeholder)));
                    self.shown_partial = Some(placeholder.response.clone());
                }
            }
            None => self.shown_partial = None,
        }

        lines
    }
}

fn terminal_line(view: &MessageView) -> String {
    match view {
        MessageView::User { text } => format!("> {text}"),
        MessageView::Reply { markdown, .. } => markdown.clone(),
        MessageView::Failure { text } => format!("! {text}"),
        MessageView::Processing { partial, .. } => {
            format!("... {}", partial.as_deref().unwrap_or("Thinking..."))
        }
    }
}

/// Renders assistant markdown to HTML.
pub fn render_markdown_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    // Raw HTML from model output is never passed through.
    let parser = Parser::new_ext(markdown, options).filter_map(|event| match event {
        Event::Html(_) | Event::InlineHtml(_) => None,
        other => Some(other),
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}
