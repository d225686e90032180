//! Line-oriented front end for terminals.

use std::cell::RefCell;
use std::future::Future;
use std::io::{self, Write};
use std::pin::pin;

use futures::future::{self, Either};
use futures::{Stream, StreamExt};
use tracing::info;

use crate::api::Transport;
use crate::controller::{Controller, View};
use crate::state::{DbConfigForm, MessageId, UiState};

pub const HELP: &str = "\
commands:
  <text>                                   send a chat message
  /databases                               refresh the database list
  /use <database>                          switch the active database
  /db <host> <port> <user> <password> [db] save connection settings (password - for none)
  /provider <name>                         switch LLM provider
  /model <name>                            set the model for chat and /save-llm
  /key <api key>                           set the API key for chat and /save-llm
  /save-llm                                store provider, model and key on the backend
  /models                                  list models for the current provider
  /help                                    show this help
  /quit                                    exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chat(String),
    Databases,
    Use(String),
    SaveDb(DbConfigForm),
    Provider(String),
    Model(String),
    Key(String),
    SaveLlm,
    Models,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::Chat(trimmed.to_string());
        };

        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match (name, args.as_slice()) {
            ("databases", []) => Self::Databases,
            ("use", [database]) => Self::Use(database.to_string()),
            ("db", [host, port, user, password, database @ ..]) if database.len() <= 1 => {
                Self::SaveDb(DbConfigForm {
                    host: host.to_string(),
                    port: port.to_string(),
                    user: user.to_string(),
                    password: if *password == "-" {
                        String::new()
                    } else {
                        password.to_string()
                    },
                    database: database.first().map(|d| d.to_string()).unwrap_or_default(),
                })
            }
            ("provider", [provider]) => Self::Provider(provider.to_string()),
            ("model", [model]) => Self::Model(model.to_string()),
            ("key", [key]) => Self::Key(key.to_string()),
            ("save-llm", []) => Self::SaveLlm,
            ("models", []) => Self::Models,
            ("help", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            _ => Self::Invalid(format!("unrecognized command: /{rest} (try /help)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Runs one command. Model, key and provider changes go through the
/// controller so chat and `/save-llm` send what the state holds.
pub async fn dispatch<T: Transport, W: Write>(
    controller: &Controller<T, ConsoleView<W>>,
    command: Command,
) -> Flow {
    match command {
        Command::Chat(message) => {
            controller
                .send_chat(&message, controller.llm_settings())
                .await;
        }
        Command::Databases => controller.refresh_databases().await,
        Command::Use(database) => {
            controller.switch_database(&database).await;
        }
        Command::SaveDb(form) => {
            controller.save_db_config(&form).await;
        }
        Command::Provider(provider) => {
            controller.change_provider(&provider).await;
            // The previous provider's model means nothing to this one.
            let first = controller
                .with_state(|state| state.llm.models.first().cloned().unwrap_or_default());
            controller.set_model(&first);
        }
        Command::Model(model) => controller.set_model(&model),
        Command::Key(key) => {
            if !controller.set_api_key(&key) {
                let provider = controller.llm_settings().provider;
                controller
                    .view()
                    .print(&format!("provider {provider} takes no API key"));
            }
        }
        Command::SaveLlm => {
            controller.save_llm_config(controller.llm_settings()).await;
        }
        Command::Models => {
            let provider = controller.llm_settings().provider;
            controller.refresh_models(&provider).await;
        }
        Command::Help => controller.view().print(HELP),
        Command::Quit => return Flow::Quit,
        Command::Empty => {}
        Command::Invalid(reason) => controller.view().print(&reason),
    }
    Flow::Continue
}

/// Reads commands until the input ends, `/quit`, or `shutdown` resolves.
/// `shutdown` is raced against every command too, so a request stuck on the
/// backend is dropped rather than waited out.
pub async fn run<T, W, L, S>(
    controller: &Controller<T, ConsoleView<W>>,
    mut lines: L,
    shutdown: S,
) -> io::Result<()>
where
    T: Transport,
    W: Write,
    L: Stream<Item = io::Result<String>> + Unpin,
    S: Future<Output = ()>,
{
    let mut shutdown = pin!(shutdown);
    loop {
        let line = match future::select(lines.next(), shutdown.as_mut()).await {
            Either::Left((Some(line), _)) => line?,
            Either::Left((None, _)) | Either::Right(_) => break,
        };

        let command = pin!(dispatch(controller, Command::parse(&line)));
        match future::select(command, shutdown.as_mut()).await {
            Either::Left((Flow::Continue, _)) => {}
            Either::Left((Flow::Quit, _)) => break,
            Either::Right(_) => {
                info!("shutdown requested, abandoning in-flight command");
                break;
            }
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Printed {
    last_message: MessageId,
    status: Option<String>,
    databases: Option<String>,
    models: Option<String>,
}

/// Prints what changed since the previous render.
pub struct ConsoleView<W: Write> {
    out: RefCell<W>,
    printed: RefCell<Printed>,
}

impl ConsoleView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
            printed: RefCell::new(Printed::default()),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    pub fn print(&self, text: &str) {
        let mut out = self.out.borrow_mut();
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }
}

impl<W: Write> View for ConsoleView<W> {
    fn render(&self, state: &UiState) {
        let mut printed = self.printed.borrow_mut();
        let mut lines = Vec::new();

        let status = state.db.status.label().to_string();
        if printed.status.as_ref() != Some(&status) {
            lines.push(format!("[database] {status}"));
            printed.status = Some(status);
        }

        let databases = state
            .db
            .select
            .options
            .iter()
            .map(|name| {
                if state.db.select.selected.as_deref() == Some(name.as_str()) {
                    format!("*{name}")
                } else {
                    name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        if state.db.status.is_connected() && printed.databases.as_ref() != Some(&databases) {
            lines.push(format!("[databases] {databases}"));
            printed.databases = Some(databases);
        }

        let models = if state.llm.models.is_empty() {
            state.llm.model_placeholder.clone()
        } else {
            state.llm.models.join(", ")
        };
        if printed.models.as_ref() != Some(&models) {
            lines.push(format!("[models:{}] {models}", state.llm.provider.value()));
            printed.models = Some(models);
        }

        for message in &state.chat.messages {
            if message.id <= printed.last_message {
                continue;
            }
            lines.push(format!("{}> {}", message.role.as_str(), message.content));
            printed.last_message = message.id;
        }
        drop(printed);

        for line in lines {
            self.print(&line);
        }
    }

    fn alert(&self, message: &str) {
        self.print(&format!("! {message}"));
    }
}
