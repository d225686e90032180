use std::cell::RefCell;

use sqlagent_ui::controller::View;
use sqlagent_ui::render::{render_database_options, render_message, render_model_options};
use sqlagent_ui::state::{FieldValue, MessageId, UiState};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlInputElement, HtmlSelectElement};

pub fn web_document() -> Option<Document> {
    web_sys::window().and_then(|window| window.document())
}

pub fn element_by_id(id: &str) -> Option<Element> {
    web_document().and_then(|doc| doc.get_element_by_id(id))
}

fn set_text(id: &str, value: impl AsRef<str>) {
    let Some(node) = element_by_id(id) else {
        return;
    };
    let next = value.as_ref();
    if node.text_content().as_deref() == Some(next) {
        return;
    }
    node.set_text_content(Some(next));
}

fn set_class(id: &str, class_name: &str) {
    let Some(node) = element_by_id(id) else {
        return;
    };
    node.set_class_name(class_name);
}

fn toggle_class(id: &str, class_name: &str, on: bool) {
    let Some(node) = element_by_id(id) else {
        return;
    };
    let classes = node.class_list();
    if on {
        let _ = classes.add_1(class_name);
    } else {
        let _ = classes.remove_1(class_name);
    }
}

fn set_display(id: &str, display: &str) {
    let Some(node) = element_by_id(id).and_then(|node| node.dyn_into::<HtmlElement>().ok()) else {
        return;
    };
    let _ = node.style().set_property("display", display);
}

fn set_placeholder(id: &str, placeholder: &str) {
    let Some(input) = element_by_id(id).and_then(|node| node.dyn_into::<HtmlInputElement>().ok())
    else {
        return;
    };
    if input.placeholder() != placeholder {
        input.set_placeholder(placeholder);
    }
}

/// Value of an `<input>` or `<select>`, empty when the control is missing.
pub fn control_value(id: &str) -> String {
    let Some(node) = element_by_id(id) else {
        return String::new();
    };
    if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
        return input.value();
    }
    if let Some(select) = node.dyn_ref::<HtmlSelectElement>() {
        return select.value();
    }
    String::new()
}

fn set_control_value(node: &Element, value: &str) {
    if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
        input.set_value(value);
    } else if let Some(select) = node.dyn_ref::<HtmlSelectElement>() {
        select.set_value(value);
    }
}

fn signature_changed(node: &Element, signature: &str) -> bool {
    let current = node.get_attribute("data-render-sig").unwrap_or_default();
    if current == signature {
        return false;
    }
    let _ = node.set_attribute("data-render-sig", signature);
    true
}

/// Writes a controller-owned value into its control. Untouched fields
/// (revision 0) keep whatever the page or the user put there.
fn sync_field(id: &str, field: &FieldValue) {
    if field.revision() == 0 {
        return;
    }
    let Some(node) = element_by_id(id) else {
        return;
    };
    if signature_changed(&node, &field.revision().to_string()) {
        set_control_value(&node, field.value());
    }
}

fn sync_inner_html(id: &str, signature: &str, html: impl FnOnce() -> String) {
    let Some(node) = element_by_id(id) else {
        return;
    };
    if signature_changed(&node, signature) {
        node.set_inner_html(&html());
    }
}

#[derive(Default)]
pub struct DomView {
    rendered_messages: RefCell<Vec<MessageId>>,
}

impl DomView {
    fn render_layout(&self, state: &UiState) {
        toggle_class("sidebar", "collapsed", state.sidebar_collapsed);
        set_display(
            "open-sidebar",
            if state.sidebar_collapsed { "block" } else { "none" },
        );
        set_display("db-modal", if state.db.modal_open { "flex" } else { "none" });
    }

    fn render_connection(&self, state: &UiState) {
        let status = state.db.status;
        set_class("status-dot", status.css_class());
        set_text("status-text", status.label());
        set_display(
            "db-select-group",
            if status.is_connected() { "block" } else { "none" },
        );

        let select = &state.db.select;
        let signature = format!("{:?}|{:?}", select.options, select.selected);
        sync_inner_html("db-name", &signature, || render_database_options(select));

        let form = &state.db.form;
        sync_field("db-host", &form.host);
        sync_field("db-port", &form.port);
        sync_field("db-user", &form.user);
        sync_field("db-pass", &form.password);
        sync_field("db-default", &form.database);
    }

    fn render_llm(&self, state: &UiState) {
        let llm = &state.llm;
        sync_field("llm-provider", &llm.provider);
        sync_field("llm-api-key", &llm.api_key);
        set_display(
            "api-key-group",
            if llm.api_key_visible { "block" } else { "none" },
        );
        if !llm.api_key_placeholder.is_empty() {
            set_placeholder("llm-api-key", &llm.api_key_placeholder);
        }

        sync_inner_html("llm-models-list", &llm.models.join("\n"), || {
            render_model_options(&llm.models)
        });
        set_placeholder("llm-model", &llm.model_placeholder);
        sync_field("llm-model", &llm.model);
    }

    fn render_chat(&self, state: &UiState) {
        let Some(history) = element_by_id("chat-history") else {
            return;
        };
        let Some(doc) = web_document() else {
            return;
        };

        let mut rendered = self.rendered_messages.borrow_mut();
        rendered.retain(|id| {
            let live = state.chat.messages.iter().any(|message| message.id == *id);
            if !live {
                if let Ok(Some(node)) =
                    doc.query_selector(&format!("[data-message-id=\"{id}\"]"))
                {
                    node.remove();
                }
            }
            live
        });

        let mut appended = false;
        for message in &state.chat.messages {
            if rendered.contains(&message.id) {
                continue;
            }
            let _ = history.insert_adjacent_html("beforeend", &render_message(message));
            rendered.push(message.id);
            appended = true;
        }
        if appended {
            history.set_scroll_top(history.scroll_height());
        }

        if state.chat.input_clears > 0 {
            if let Some(input) = element_by_id("user-input") {
                if signature_changed(&input, &state.chat.input_clears.to_string()) {
                    set_control_value(&input, "");
                }
            }
        }
    }
}

impl View for DomView {
    fn render(&self, state: &UiState) {
        self.render_layout(state);
        self.render_connection(state);
        self.render_llm(state);
        self.render_chat(state);
    }

    fn alert(&self, message: &str) {
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(message);
        }
    }
}
