//! The list's state machine, kept free of IO so every transition can be tested directly.
//!
//! `idle -> loading -> (idle | failed)`. Each fetch gets a fresh sequence number and only
//! the answer to the latest one is accepted, so a response to an abandoned query never
//! lands in the list.

use crate::types::book::Book;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading { seq: u64, append: bool },
    Failed { message: String, append: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseState {
    pub query:     String,
    pub page_size: u32,
    pub offset:    u32,
    pub books:     Vec<Book>,
    pub exhausted: bool,
    pub phase:     Phase,
    /// Sequence number of the most recently issued fetch.
    pub seq:       u64,
    pub searched:  bool,
}

impl BrowseState {
    pub fn new(page_size: u32) -> Self {
        Self {
            query:     String::new(),
            page_size: page_size.max(1),
            offset:    0,
            books:     vec![],
            exhausted: false,
            phase:     Phase::Idle,
            seq:       0,
            searched:  false,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// New query text, starts over from the first page.
    Search(String),
    /// The end of the list came into view.
    SentinelVisible,
    Retry,
    /// `limit` is the page size the proxy actually applied, when it says so.
    Loaded { seq: u64, rows: Vec<Book>, limit: Option<u32> },
    Failed { seq: u64, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub seq:    u64,
    pub query:  String,
    pub limit:  u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
    /// Drop the current list and the end marker, show progress.
    Loading,
    /// The whole list, after a fresh search.
    Replace(Vec<Book>),
    /// Only the cards that were just fetched.
    Append(Vec<Book>),
    NoResults,
    EndOfResults,
    Count(usize),
    /// Persistent until the next fetch, offers a retry.
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Fetch(FetchRequest),
    Render(RenderOp),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state:   BrowseState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(state: &BrowseState) -> Self {
        Self {
            state:   state.clone(),
            effects: vec![],
        }
    }
}

fn start_fresh(state: &BrowseState, query: &str) -> Transition {
    let mut next = state.clone();
    next.query = query.trim().to_string();
    next.offset = 0;
    next.books.clear();
    next.exhausted = false;
    next.searched = true;
    next.seq += 1;
    next.phase = Phase::Loading {
        seq:    next.seq,
        append: false,
    };
    let fetch = FetchRequest {
        seq:    next.seq,
        query:  next.query.clone(),
        limit:  next.page_size,
        offset: 0,
    };
    Transition {
        state:   next,
        effects: vec![Effect::Render(RenderOp::Loading), Effect::Fetch(fetch)],
    }
}

fn start_append(state: &BrowseState) -> Transition {
    let mut next = state.clone();
    next.seq += 1;
    next.phase = Phase::Loading {
        seq:    next.seq,
        append: true,
    };
    let fetch = FetchRequest {
        seq:    next.seq,
        query:  next.query.clone(),
        limit:  next.page_size,
        offset: next.offset,
    };
    Transition {
        state:   next,
        effects: vec![Effect::Fetch(fetch)],
    }
}

fn in_flight(state: &BrowseState) -> Option<(u64, bool)> {
    match state.phase {
        Phase::Loading { seq, append } => Some((seq, append)),
        _ => None,
    }
}

pub fn transition(state: &BrowseState, event: Event) -> Transition {
    match event {
        Event::Search(query) => start_fresh(state, &query),
        Event::SentinelVisible => {
            if !state.searched || state.exhausted || state.phase != Phase::Idle {
                return Transition::unchanged(state);
            }
            start_append(state)
        }
        Event::Retry => match &state.phase {
            Phase::Failed { append: true, .. } => start_append(state),
            Phase::Failed { append: false, .. } => start_fresh(state, &state.query),
            _ => Transition::unchanged(state),
        },
        Event::Loaded { seq, rows, limit } => {
            let append = match in_flight(state) {
                Some((current, append)) if current == seq => append,
                _ => return Transition::unchanged(state),
            };
            let mut next = state.clone();
            next.phase = Phase::Idle;
            // A capped page is full at the proxy's limit, not ours.
            let limit = limit.map_or(next.page_size, |l| l.clamp(1, next.page_size));
            if rows.len() < limit as usize {
                next.exhausted = true;
            } else {
                next.offset += limit;
            }
            next.books.extend(rows.iter().cloned());

            let mut effects = vec![];
            if !append {
                if next.books.is_empty() {
                    effects.push(Effect::Render(RenderOp::NoResults));
                } else {
                    effects.push(Effect::Render(RenderOp::Replace(next.books.clone())));
                }
            } else if !rows.is_empty() {
                effects.push(Effect::Render(RenderOp::Append(rows)));
            }
            effects.push(Effect::Render(RenderOp::Count(next.books.len())));
            if next.exhausted && !next.books.is_empty() {
                effects.push(Effect::Render(RenderOp::EndOfResults));
            }
            Transition {
                state: next,
                effects,
            }
        }
        Event::Failed { seq, message } => {
            let append = match in_flight(state) {
                Some((current, append)) if current == seq => append,
                _ => return Transition::unchanged(state),
            };
            let mut next = state.clone();
            next.phase = Phase::Failed {
                message: message.clone(),
                append,
            };
            Transition {
                state:   next,
                effects: vec![Effect::Render(RenderOp::Error(message))],
            }
        }
    }
}
