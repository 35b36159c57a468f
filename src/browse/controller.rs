//! Drives a [View] from user commands: debounces typing, issues fetches, applies results.

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    browse::{
        debounce::Debouncer,
        render::Notice,
        state::{transition, BrowseState, Effect, Event, FetchRequest, Transition},
    },
    config::Config,
    link::DeepLinker,
    traits::{BooksApi, Desktop, View},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Query text as typed, searched once typing pauses.
    Input(String),
    /// Search right away.
    Search(String),
    SentinelVisible,
    Retry,
    Clear,
    Open(usize),
    Copy(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    pub pending_search: bool,
    pub loading:        bool,
    /// A link is being opened or copied.
    pub handing_off:    bool,
    /// Number of commands processed so far.
    pub handled:        u64,
}

impl Status {
    pub fn settled(&self) -> bool {
        !self.pending_search && !self.loading && !self.handing_off
    }
}

#[derive(Debug, Error)]
#[error("The browse controller has stopped")]
pub struct ControllerClosed;

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub page_size: u32,
    pub debounce:  Duration,
    pub linker:    DeepLinker,
}

impl ControllerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            debounce:  Duration::from_millis(config.debounce_ms),
            linker:    DeepLinker::from_config(config),
        }
    }
}

enum Internal {
    Debounced { generation: u64, query: String },
    Event(Event),
    HandedOff(Notice),
}

pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<Command>,
    status:   watch::Receiver<Status>,
    sent:     u64,
    task:     JoinHandle<()>,
}

impl ControllerHandle {
    pub fn send(&mut self, command: Command) -> Result<(), ControllerClosed> {
        self.commands.send(command).map_err(|_| ControllerClosed)?;
        self.sent += 1;
        Ok(())
    }

    pub fn status(&self) -> Status {
        *self.status.borrow()
    }

    /// Wait until every sent command has been handled and nothing it started is still
    /// running.
    pub async fn settled(&mut self) -> Result<(), ControllerClosed> {
        loop {
            let status = *self.status.borrow_and_update();
            if status.handled >= self.sent && status.settled() {
                return Ok(());
            }
            self.status.changed().await.map_err(|_| ControllerClosed)?;
        }
    }

    /// Stop accepting commands and wait for the loop to finish.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(e) = self.task.await {
            warn!("Browse controller ended abnormally: {e}");
        }
    }
}

pub struct Controller<V> {
    api:        Arc<dyn BooksApi>,
    desktop:    Arc<dyn Desktop>,
    view:       V,
    options:    ControllerOptions,
    state:      BrowseState,
    debouncer:  Debouncer,
    generation: u64,
    pending:    bool,
    handled:    u64,
    hand_offs:  usize,
    internal:   mpsc::UnboundedSender<Internal>,
    status:     watch::Sender<Status>,
}

impl<V> Controller<V>
where
    V: View + 'static,
{
    pub fn spawn(
        options: ControllerOptions,
        api: Arc<dyn BooksApi>,
        desktop: Arc<dyn Desktop>,
        view: V,
    ) -> ControllerHandle {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (internal, internal_rx) = mpsc::unbounded_channel();
        let (status, status_rx) = watch::channel(Status::default());
        let controller = Controller {
            api,
            desktop,
            view,
            state: BrowseState::new(options.page_size),
            options,
            debouncer: Debouncer::new(),
            generation: 0,
            pending: false,
            handled: 0,
            hand_offs: 0,
            internal,
            status,
        };
        let task = tokio::spawn(controller.run(command_rx, internal_rx));
        ControllerHandle {
            commands,
            status: status_rx,
            sent: 0,
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        self.handle_command(command);
                        self.handled += 1;
                    }
                    None => break,
                },
                Some(message) = internal.recv() => self.handle_internal(message),
            }
            self.publish_status();
        }
        self.debouncer.cancel();
        debug!("Browse controller stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Input(query) => {
                self.generation += 1;
                self.pending = true;
                let generation = self.generation;
                let internal = self.internal.clone();
                self.debouncer.schedule(self.options.debounce, move || {
                    let _ = internal.send(Internal::Debounced { generation, query });
                });
            }
            Command::Search(query) => {
                self.cancel_pending();
                self.apply(Event::Search(query));
            }
            Command::Clear => {
                self.cancel_pending();
                self.apply(Event::Search(String::new()));
            }
            Command::SentinelVisible => self.apply(Event::SentinelVisible),
            Command::Retry => self.apply(Event::Retry),
            Command::Open(index) => self.hand_off(index, false),
            Command::Copy(index) => self.hand_off(index, true),
        }
    }

    fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::Debounced { generation, query } => {
                if generation != self.generation {
                    return;
                }
                self.pending = false;
                self.apply(Event::Search(query));
            }
            Internal::Event(event) => self.apply(event),
            Internal::HandedOff(notice) => {
                self.hand_offs -= 1;
                self.view.notify(&notice);
            }
        }
    }

    fn cancel_pending(&mut self) {
        self.debouncer.cancel();
        self.generation += 1;
        self.pending = false;
    }

    fn apply(&mut self, event: Event) {
        let Transition { state, effects } = transition(&self.state, event);
        self.state = state;
        for effect in effects {
            match effect {
                Effect::Render(op) => self.view.render(&op),
                Effect::Fetch(request) => self.fetch(request),
            }
        }
    }

    fn fetch(&self, request: FetchRequest) {
        debug!(
            "Fetching #{} {:?} limit {} offset {}",
            request.seq, request.query, request.limit, request.offset
        );
        let api = self.api.clone();
        let internal = self.internal.clone();
        tokio::spawn(async move {
            let event = match api.fetch(&request.query, request.limit, request.offset).await {
                Ok(page) => Event::Loaded {
                    seq:   request.seq,
                    rows:  page.data,
                    limit: page.limit,
                },
                Err(e) => {
                    warn!("Fetch #{} failed: {e}", request.seq);
                    Event::Failed {
                        seq:     request.seq,
                        message: e.to_string(),
                    }
                }
            };
            let _ = internal.send(Internal::Event(event));
        });
    }

    fn hand_off(&mut self, index: usize, copy: bool) {
        let book = match self.state.books.get(index) {
            Some(book) => book,
            None => {
                self.view.notify(&Notice::NoSuchCard(index + 1));
                return;
            }
        };
        let url = match self.options.linker.link(&book.id) {
            Ok(url) => url.to_string(),
            Err(e) => {
                self.view.notify(&Notice::InvalidLink(e.to_string()));
                return;
            }
        };
        self.hand_offs += 1;
        let desktop = self.desktop.clone();
        let internal = self.internal.clone();
        // Desktop tools block until they exit.
        tokio::task::spawn_blocking(move || {
            let notice = if copy {
                match desktop.copy(&url) {
                    Ok(()) => Notice::LinkCopied,
                    Err(e) => {
                        warn!("Copying {url} failed: {e}");
                        Notice::CopyFailed
                    }
                }
            } else {
                match desktop.open(&url) {
                    Ok(()) => Notice::Opened(url),
                    Err(e) => {
                        warn!("Opening {url} failed: {e}");
                        Notice::OpenFailed
                    }
                }
            };
            let _ = internal.send(Internal::HandedOff(notice));
        });
    }

    fn publish_status(&self) {
        let status = Status {
            pending_search: self.pending,
            loading:        self.state.is_loading(),
            handing_off:    self.hand_offs > 0,
            handled:        self.handled,
        };
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}
