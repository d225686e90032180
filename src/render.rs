//! HTML fragments for the chat transcript and the select/datalist controls.

use html_compile::compile::build_component;
use html_compile::types::{Attribute, Child, Component};
use regex::Regex;

use crate::state::{ChatMessage, DATABASE_PLACEHOLDER, DatabaseSelect, Role};

const USER_AVATAR_SVG: &str = r#"<svg width="20" height="20" viewBox="0 0 24 24" fill="none" xmlns="http://www.w3.org/2000/svg"><path d="M20 21V19C20 17.9391 19.5786 16.9217 18.8284 16.1716C18.0783 15.4214 17.0609 15 16 15H8C6.93913 15 5.92172 15.4214 5.17157 16.1716C4.42143 16.9217 4 17.9391 4 19V21" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/><path d="M12 11C14.2091 11 16 9.20914 16 7C16 4.79086 14.2091 3 12 3C9.79086 3 8 4.79086 8 7C8 9.20914 9.79086 11 12 11Z" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/></svg>"#;
const AI_AVATAR_SVG: &str = r#"<svg width="20" height="20" viewBox="0 0 24 24" fill="none" xmlns="http://www.w3.org/2000/svg"><path d="M12 2C6.48 2 2 6.48 2 12C2 17.52 6.48 22 12 22C17.52 22 22 17.52 22 12C22 6.48 17.52 2 12 2ZM12 4V6M12 18V20M6 12H4M20 12H18M15.54 15.54L14.12 14.12M9.88 9.88L8.46 8.46M15.54 8.46L14.12 9.88M9.88 14.12L8.46 15.54" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/></svg>"#;

#[derive(Debug, Clone)]
struct UiElement {
    tag: &'static str,
    attrs: Vec<(&'static str, String)>,
    content: UiContent,
}

/// Text content is emitted verbatim; callers escape.
#[derive(Debug, Clone)]
enum UiContent {
    Empty,
    Text(String),
    Children(Vec<UiElement>),
}

impl UiElement {
    fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            content: UiContent::Empty,
        }
    }

    fn with_attr(mut self, label: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((label, value.into()));
        self
    }

    fn maybe_attr(
        mut self,
        condition: bool,
        label: &'static str,
        value: impl Into<String>,
    ) -> Self {
        if condition {
            self.attrs.push((label, value.into()));
        }
        self
    }

    fn with_text(mut self, text: impl Into<String>) -> Self {
        self.content = UiContent::Text(text.into());
        self
    }

    fn with_children(mut self, children: Vec<UiElement>) -> Self {
        self.content = UiContent::Children(children);
        self
    }

    fn render(&self) -> String {
        build_component(&self.to_component())
    }

    fn to_component<'a>(&'a self) -> Component<'a> {
        let meta = if self.attrs.is_empty() {
            None
        } else {
            Some(
                self.attrs
                    .iter()
                    .map(|(label, value)| Attribute {
                        label,
                        value: value.as_str(),
                    })
                    .collect(),
            )
        };

        let child = match &self.content {
            UiContent::Empty => Child::NoChild,
            UiContent::Text(value) => Child::Text(value.as_str()),
            UiContent::Children(nodes) => Child::ComponentVec(
                nodes
                    .iter()
                    .map(|node| Box::new(node.to_component()))
                    .collect(),
            ),
        };

        Component {
            tag: self.tag,
            meta,
            child,
        }
    }
}

fn el(tag: &'static str) -> UiElement {
    UiElement::new(tag)
}

fn text_el(tag: &'static str, text: impl Into<String>) -> UiElement {
    UiElement::new(tag).with_text(text)
}

fn option(value: &str, label: &str, selected: bool) -> UiElement {
    el("option")
        .with_attr("value", escape_html(value))
        .maybe_attr(selected, "selected", "selected")
        .with_text(escape_html(label))
}

/// Minimal markdown-ish formatting for chat content: angle brackets are
/// escaped, ```` ``` ```` fences become `<pre><code>` blocks and newlines
/// become `<br>`. Not a sanitizer.
pub fn format_message_content(content: &str) -> String {
    let escaped = content.replace('<', "&lt;").replace('>', "&gt;");

    let fenced = match Regex::new(r"(?s)```(.*?)```") {
        Ok(fence) => fence
            .replace_all(&escaped, "<pre><code>$1</code></pre>")
            .into_owned(),
        Err(_) => escaped,
    };

    fenced.replace('\n', "<br>")
}

fn avatar_svg(role: Role) -> &'static str {
    match role {
        Role::User => USER_AVATAR_SVG,
        Role::Ai => AI_AVATAR_SVG,
    }
}

fn message_element(message: &ChatMessage) -> UiElement {
    el("div")
        .with_attr("class", format!("message {}", message.role.as_str()))
        .with_attr("data-message-id", message.id.to_string())
        .with_children(vec![
            text_el("div", avatar_svg(message.role)).with_attr("class", "avatar"),
            el("div")
                .with_attr("class", "message-content")
                .with_children(vec![text_el(
                    "p",
                    format_message_content(&message.content),
                )]),
        ])
}

/// One transcript bubble, tagged with `data-message-id` for reconciliation.
pub fn render_message(message: &ChatMessage) -> String {
    message_element(message).render()
}

/// Inner HTML for the database `<select>`: a disabled placeholder followed by
/// the usable databases, in order.
pub fn render_database_options(select: &DatabaseSelect) -> String {
    let placeholder = option("", DATABASE_PLACEHOLDER, select.selected.is_none())
        .with_attr("disabled", "disabled")
        .render();

    let mut html = placeholder;
    for name in &select.options {
        let selected = select.selected.as_deref() == Some(name.as_str());
        html.push_str(&option(name, name, selected).render());
    }
    html
}

/// Inner HTML for the model `<datalist>`.
pub fn render_model_options(models: &[String]) -> String {
    models
        .iter()
        .map(|model| option(model, model, false).render())
        .collect()
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
