use pulldown_cmark::{html, Event, Options, Parser};

use crate::model::{local_label, Message, Sender};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CitationMarker {
    pub number: usize,
    pub block_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageView {
    pub sender: Sender,
    pub body_html: String,
    pub time_label: String,
    pub citations: Vec<CitationMarker>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CitationAction {
    HighlightSource(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CitationBinding {
    pub marker: usize,
    pub action: CitationAction,
}

pub fn render(message: &Message) -> MessageView {
    let (body_html, citations) = match message.sender {
        Sender::User => (escape_text(&message.text), Vec::new()),
        Sender::System => (
            markdown_to_html(&message.text),
            message
                .source_refs
                .iter()
                .enumerate()
                .map(|(idx, block_id)| CitationMarker {
                    number: idx + 1,
                    block_id: block_id.clone(),
                })
                .collect(),
        ),
    };
    MessageView {
        sender: message.sender,
        body_html,
        time_label: local_label(&message.timestamp),
        citations,
    }
}

pub fn bindings(view: &MessageView) -> Vec<CitationBinding> {
    view.citations
        .iter()
        .map(|marker| CitationBinding {
            marker: marker.number,
            action: CitationAction::HighlightSource(marker.block_id.clone()),
        })
        .collect()
}

fn markdown_to_html(text: &str) -> String {
    let parser = Parser::new_ext(text, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH)
        .map(|event| match event {
            // Answers are model output; never pass raw markup through.
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        });
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    html::push_html(&mut out, parser);
    out
}

fn escape_text(text: &str) -> String {
    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;");
    escaped.replace('\n', "<br>")
}
