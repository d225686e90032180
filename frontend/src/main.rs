mod logging;
mod transport;
mod view;

use std::rc::Rc;

use leptos::*;
use sqlagent_ui::api::ApiClient;
use sqlagent_ui::config::ClientConfig;
use sqlagent_ui::controller::Controller;
use sqlagent_ui::models::LlmSettings;
use sqlagent_ui::state::DbConfigForm;
use tracing::{info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, HtmlElement};

use crate::transport::FetchTransport;
use crate::view::{DomView, control_value, element_by_id, web_document};

type AppController = Controller<FetchTransport, DomView>;

#[component]
fn App() -> impl IntoView {
    view! {
        <div
            id="leptos-runtime-marker"
            data-runtime="sqlagent-ui-frontend"
            style="display:none;"
        ></div>
    }
}

fn on<F>(id: &str, event: &str, handler: F)
where
    F: FnMut(web_sys::Event) + 'static,
{
    let Some(target) = element_by_id(id) else {
        warn!(id, event, "element missing, listener not attached");
        return;
    };
    let callback = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
    let _ = target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref());
    callback.forget();
}

fn read_db_form() -> DbConfigForm {
    DbConfigForm {
        host: control_value("db-host"),
        port: control_value("db-port"),
        user: control_value("db-user"),
        password: control_value("db-pass"),
        database: control_value("db-default"),
    }
}

fn read_llm_settings() -> LlmSettings {
    LlmSettings {
        provider: control_value("llm-provider"),
        model: control_value("llm-model"),
        api_key: control_value("llm-api-key"),
    }
}

fn init_layout_handlers(controller: &Rc<AppController>) {
    let ctl = Rc::clone(controller);
    on("toggle-sidebar", "click", move |_| ctl.collapse_sidebar());

    let ctl = Rc::clone(controller);
    on("open-sidebar", "click", move |_| ctl.expand_sidebar());

    let ctl = Rc::clone(controller);
    on("btn-configure-db", "click", move |_| ctl.open_db_modal());

    let ctl = Rc::clone(controller);
    on("close-modal", "click", move |_| ctl.close_db_modal());

    // Clicks inside the dialog bubble up to the backdrop; only the backdrop closes it.
    let ctl = Rc::clone(controller);
    on("db-modal", "click", move |event: web_sys::Event| {
        let on_backdrop = event
            .target()
            .and_then(|target| target.dyn_into::<Element>().ok())
            .is_some_and(|target| target.id() == "db-modal");
        if on_backdrop {
            ctl.close_db_modal();
        }
    });
}

fn init_database_handlers(controller: &Rc<AppController>) {
    let ctl = Rc::clone(controller);
    on("db-config-form", "submit", move |event: web_sys::Event| {
        event.prevent_default();
        let form = read_db_form();
        let ctl = Rc::clone(&ctl);
        spawn_local(async move {
            ctl.save_db_config(&form).await;
        });
    });

    let ctl = Rc::clone(controller);
    on("db-name", "change", move |_| {
        let database = control_value("db-name");
        let ctl = Rc::clone(&ctl);
        spawn_local(async move {
            ctl.switch_database(&database).await;
        });
    });

    let ctl = Rc::clone(controller);
    on("refresh-dbs", "click", move |event: web_sys::Event| {
        event.prevent_default();
        let ctl = Rc::clone(&ctl);
        spawn_local(async move {
            ctl.refresh_databases().await;
        });
    });
}

fn init_llm_handlers(controller: &Rc<AppController>) {
    let ctl = Rc::clone(controller);
    on("llm-provider", "change", move |_| {
        let provider = control_value("llm-provider");
        let ctl = Rc::clone(&ctl);
        spawn_local(async move {
            ctl.change_provider(&provider).await;
        });
    });

    let ctl = Rc::clone(controller);
    on("llm-config-form", "submit", move |event: web_sys::Event| {
        event.prevent_default();
        let settings = read_llm_settings();
        let ctl = Rc::clone(&ctl);
        spawn_local(async move {
            ctl.save_llm_config(settings).await;
        });
    });
}

fn init_chat_handlers(controller: &Rc<AppController>) {
    let ctl = Rc::clone(controller);
    on("chat-form", "submit", move |event: web_sys::Event| {
        event.prevent_default();
        let input = control_value("user-input");
        let settings = read_llm_settings();
        let ctl = Rc::clone(&ctl);
        spawn_local(async move {
            ctl.send_chat(&input, settings).await;
        });
    });
}

fn main() {
    console_error_panic_hook::set_once();
    logging::init();

    if let Some(root) = web_document()
        .and_then(|doc| doc.get_element_by_id("leptos-runtime-root"))
        .and_then(|node| node.dyn_into::<HtmlElement>().ok())
    {
        mount_to(root, || view! { <App /> });
    } else {
        mount_to_body(|| view! { <App /> });
    }

    let controller = Rc::new(Controller::new(
        ApiClient::new(FetchTransport, ClientConfig::same_origin()),
        DomView::default(),
    ));
    init_layout_handlers(&controller);
    init_database_handlers(&controller);
    init_llm_handlers(&controller);
    init_chat_handlers(&controller);

    info!("sqlagent-ui frontend started");
    spawn_local(async move {
        controller.load().await;
    });
}
