use std::{
    io,
    sync::{mpsc, Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use bookdrop::{
    browse::{
        render::Notice, state::RenderOp, ClientError, Command, Controller, ControllerHandle,
        ControllerOptions,
    },
    link::DeepLinker,
    traits::{BooksApi, Desktop, View},
    types::{book::Book, page::BooksPage},
};
use pretty_assertions::assert_eq;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Seen {
    Render(RenderOp),
    Notice(Notice),
}

#[derive(Clone, Default)]
struct RecordingView(Arc<Mutex<Vec<Seen>>>);

impl RecordingView {
    fn take(&self) -> Vec<Seen> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl View for RecordingView {
    fn render(&mut self, op: &RenderOp) {
        self.0.lock().unwrap().push(Seen::Render(op.clone()));
    }

    fn notify(&mut self, notice: &Notice) {
        self.0.lock().unwrap().push(Seen::Notice(notice.clone()));
    }
}

/// In-memory catalog. Titles are matched case-insensitively like the real backend does,
/// and `max_limit` caps pages the way the proxy does.
#[derive(Default)]
struct FakeApi {
    books:     Vec<Book>,
    calls:     Mutex<Vec<(String, u32, u32)>>,
    failures:  Mutex<usize>,
    slow:      Option<(String, Duration)>,
    max_limit: Option<u32>,
}

impl FakeApi {
    fn calls(&self) -> Vec<(String, u32, u32)> {
        self.calls.lock().unwrap().clone()
    }

    fn fail_next(&self, n: usize) {
        *self.failures.lock().unwrap() = n;
    }
}

#[async_trait]
impl BooksApi for FakeApi {
    async fn fetch(&self, query: &str, limit: u32, offset: u32) -> Result<BooksPage<Book>, ClientError> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), limit, offset));
        if let Some((slow, delay)) = &self.slow {
            if slow == query {
                tokio::time::sleep(*delay).await;
            }
        }
        {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(ClientError::Proxy {
                    status:  503,
                    message: "Service Unavailable".into(),
                });
            }
        }
        let limit = self.max_limit.map_or(limit, |max| limit.min(max));
        let query = query.to_lowercase();
        let data = self
            .books
            .iter()
            .filter(|b| b.title().to_lowercase().contains(&query))
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(BooksPage {
            data,
            limit: Some(limit),
            offset: Some(offset),
            total: None,
        })
    }
}

#[derive(Default)]
struct FakeDesktop {
    opened:      Mutex<Vec<String>>,
    copied:      Mutex<Vec<String>>,
    broken_copy: bool,
    /// Copying blocks until something is sent here.
    gate:        Mutex<Option<mpsc::Receiver<()>>>,
}

impl Desktop for FakeDesktop {
    fn open(&self, url: &str) -> io::Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn copy(&self, text: &str) -> io::Result<()> {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            let _ = gate.recv();
        }
        if self.broken_copy {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no clipboard"));
        }
        self.copied.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn book(id: &str, title: &str) -> Book {
    Book {
        id: id.into(),
        file_name: Some(title.to_string()),
        mime_type: Some("application/pdf".into()),
        file_size: Some(1024),
        ..Book::default()
    }
}

fn catalog() -> Vec<Book> {
    vec![
        book("a1", "Dune.pdf"),
        book("a2", "Dune Messiah.pdf"),
        book("a3", "Children of Dune.pdf"),
        book("b1", "Neuromancer.pdf"),
        book("b2", "Hyperion.pdf"),
    ]
}

fn options(page_size: u32) -> ControllerOptions {
    ControllerOptions {
        page_size,
        debounce: Duration::from_millis(400),
        linker: DeepLinker::new("https://t.me", "filebot", "filep_"),
    }
}

struct Harness {
    api:     Arc<FakeApi>,
    desktop: Arc<FakeDesktop>,
    view:    RecordingView,
    handle:  ControllerHandle,
}

impl Harness {
    fn start(api: FakeApi, desktop: FakeDesktop, page_size: u32) -> Self {
        let api = Arc::new(api);
        let desktop = Arc::new(desktop);
        let view = RecordingView::default();
        let handle = Controller::spawn(options(page_size), api.clone(), desktop.clone(), view.clone());
        Self {
            api,
            desktop,
            view,
            handle,
        }
    }

    fn with_catalog(page_size: u32) -> Self {
        Self::start(
            FakeApi {
                books: catalog(),
                ..FakeApi::default()
            },
            FakeDesktop::default(),
            page_size,
        )
    }

    async fn run(&mut self, command: Command) {
        self.handle.send(command).unwrap();
        self.handle.settled().await.unwrap();
    }
}

fn ids(books: &[Book]) -> Vec<String> {
    books.iter().map(|b| b.id.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn typing_is_debounced_into_one_search() {
    let mut h = Harness::with_catalog(50);
    let start = Instant::now();
    for typed in ["d", "du", "dun", "dune"] {
        h.handle.send(Command::Input(typed.into())).unwrap();
    }
    h.handle.settled().await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(400));
    assert_eq!(h.api.calls(), vec![("dune".to_string(), 50, 0)]);
    match &h.view.take()[..] {
        [Seen::Render(RenderOp::Loading), Seen::Render(RenderOp::Replace(books)), Seen::Render(RenderOp::Count(3)), Seen::Render(RenderOp::EndOfResults)] =>
        {
            assert_eq!(ids(books), vec!["a1", "a2", "a3"])
        }
        other => panic!("unexpected renders {other:?}"),
    }
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn explicit_search_cancels_pending_input() {
    let mut h = Harness::with_catalog(50);
    h.handle.send(Command::Input("neuro".into())).unwrap();
    h.run(Command::Search("hyper".into())).await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(h.api.calls(), vec![("hyper".to_string(), 50, 0)]);
    assert!(h.handle.status().settled());
}

#[tokio::test(start_paused = true)]
async fn pages_until_a_short_page() {
    let mut h = Harness::with_catalog(2);

    // Nothing was searched yet.
    h.run(Command::SentinelVisible).await;
    assert!(h.api.calls().is_empty());

    h.run(Command::Search(String::new())).await;
    h.run(Command::SentinelVisible).await;
    h.run(Command::SentinelVisible).await;
    // Exhausted, no further requests.
    h.run(Command::SentinelVisible).await;

    assert_eq!(
        h.api.calls(),
        vec![
            (String::new(), 2, 0),
            (String::new(), 2, 2),
            (String::new(), 2, 4),
        ]
    );
    let seen = h.view.take();
    assert_eq!(
        seen,
        vec![
            Seen::Render(RenderOp::Loading),
            Seen::Render(RenderOp::Replace(catalog()[0..2].to_vec())),
            Seen::Render(RenderOp::Count(2)),
            Seen::Render(RenderOp::Append(catalog()[2..4].to_vec())),
            Seen::Render(RenderOp::Count(4)),
            Seen::Render(RenderOp::Append(catalog()[4..5].to_vec())),
            Seen::Render(RenderOp::Count(5)),
            Seen::Render(RenderOp::EndOfResults),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn capped_pages_keep_paging() {
    let mut h = Harness::start(
        FakeApi {
            books: catalog(),
            max_limit: Some(2),
            ..FakeApi::default()
        },
        FakeDesktop::default(),
        5,
    );
    h.run(Command::Search(String::new())).await;
    h.run(Command::SentinelVisible).await;
    h.run(Command::SentinelVisible).await;
    h.run(Command::SentinelVisible).await;

    assert_eq!(
        h.api.calls(),
        vec![
            (String::new(), 5, 0),
            (String::new(), 5, 2),
            (String::new(), 5, 4),
        ]
    );
    let seen = h.view.take();
    assert_eq!(seen.last(), Some(&Seen::Render(RenderOp::EndOfResults)));
    assert!(seen.contains(&Seen::Render(RenderOp::Count(5))));
    assert_eq!(
        seen.iter()
            .filter(|s| **s == Seen::Render(RenderOp::EndOfResults))
            .count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn no_results() {
    let mut h = Harness::with_catalog(50);
    h.run(Command::Search("zzz".into())).await;
    assert_eq!(
        h.view.take(),
        vec![
            Seen::Render(RenderOp::Loading),
            Seen::Render(RenderOp::NoResults),
            Seen::Render(RenderOp::Count(0)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_search_is_retried() {
    let mut h = Harness::with_catalog(50);
    h.api.fail_next(1);
    h.run(Command::Search("dune".into())).await;
    assert_eq!(
        h.view.take(),
        vec![
            Seen::Render(RenderOp::Loading),
            Seen::Render(RenderOp::Error(
                "Service Unavailable (status 503)".into()
            )),
        ]
    );

    // Paging is blocked while the error is shown.
    h.run(Command::SentinelVisible).await;
    h.run(Command::Retry).await;

    assert_eq!(
        h.api.calls(),
        vec![("dune".to_string(), 50, 0), ("dune".to_string(), 50, 0)]
    );
    let seen = h.view.take();
    assert_eq!(seen[0], Seen::Render(RenderOp::Loading));
    assert_eq!(seen[1], Seen::Render(RenderOp::Replace(catalog()[0..3].to_vec())));
}

#[tokio::test(start_paused = true)]
async fn failed_page_is_retried_at_the_same_offset() {
    let mut h = Harness::with_catalog(2);
    h.run(Command::Search(String::new())).await;
    h.api.fail_next(1);
    h.run(Command::SentinelVisible).await;
    h.run(Command::Retry).await;

    assert_eq!(
        h.api.calls(),
        vec![
            (String::new(), 2, 0),
            (String::new(), 2, 2),
            (String::new(), 2, 2),
        ]
    );
    let seen = h.view.take();
    assert_eq!(
        &seen[3..],
        &[
            Seen::Render(RenderOp::Error("Service Unavailable (status 503)".into())),
            Seen::Render(RenderOp::Append(catalog()[2..4].to_vec())),
            Seen::Render(RenderOp::Count(4)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn stale_responses_are_dropped() {
    let mut h = Harness::start(
        FakeApi {
            books: catalog(),
            slow: Some(("neuro".into(), Duration::from_secs(5))),
            ..FakeApi::default()
        },
        FakeDesktop::default(),
        50,
    );
    h.handle.send(Command::Search("neuro".into())).unwrap();
    h.run(Command::Search("dune".into())).await;
    // Let the slow answer arrive.
    tokio::time::sleep(Duration::from_secs(10)).await;
    h.handle.settled().await.unwrap();

    let replaced = h
        .view
        .take()
        .into_iter()
        .filter_map(|seen| match seen {
            Seen::Render(RenderOp::Replace(books)) => Some(ids(&books)),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(replaced, vec![vec!["a1", "a2", "a3"]]);
}

#[tokio::test(start_paused = true)]
async fn clear_lists_everything_again() {
    let mut h = Harness::with_catalog(50);
    h.run(Command::Search("dune".into())).await;
    h.run(Command::Clear).await;
    assert_eq!(
        h.api.calls(),
        vec![("dune".to_string(), 50, 0), (String::new(), 50, 0)]
    );
}

#[tokio::test(start_paused = true)]
async fn links_are_copied_and_opened() {
    let mut h = Harness::with_catalog(50);
    h.run(Command::Search("dune".into())).await;
    h.view.take();

    h.run(Command::Copy(0)).await;
    h.run(Command::Open(2)).await;
    h.run(Command::Copy(7)).await;

    assert_eq!(
        *h.desktop.copied.lock().unwrap(),
        vec!["https://t.me/filebot?start=filep_a1"]
    );
    assert_eq!(
        *h.desktop.opened.lock().unwrap(),
        vec!["https://t.me/filebot?start=filep_a3"]
    );
    assert_eq!(
        h.view.take(),
        vec![
            Seen::Notice(Notice::LinkCopied),
            Seen::Notice(Notice::Opened("https://t.me/filebot?start=filep_a3".into())),
            Seen::Notice(Notice::NoSuchCard(8)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn copy_failure_is_reported() {
    let mut h = Harness::start(
        FakeApi {
            books: catalog(),
            ..FakeApi::default()
        },
        FakeDesktop {
            broken_copy: true,
            ..FakeDesktop::default()
        },
        50,
    );
    h.run(Command::Search("dune".into())).await;
    h.view.take();
    h.run(Command::Copy(1)).await;
    assert_eq!(h.view.take(), vec![Seen::Notice(Notice::CopyFailed)]);
}

#[tokio::test(start_paused = true)]
async fn slow_clipboard_does_not_stall_searches() {
    let (release, gate) = mpsc::channel();
    let mut h = Harness::start(
        FakeApi {
            books: catalog(),
            ..FakeApi::default()
        },
        FakeDesktop {
            gate: Mutex::new(Some(gate)),
            ..FakeDesktop::default()
        },
        50,
    );
    h.run(Command::Search("dune".into())).await;
    h.view.take();

    h.handle.send(Command::Copy(0)).unwrap();
    h.handle.send(Command::Search("hyper".into())).unwrap();
    while h.api.calls().len() < 2 {
        tokio::task::yield_now().await;
    }
    assert!(h.handle.status().handing_off);

    release.send(()).unwrap();
    h.handle.settled().await.unwrap();
    assert!(!h.handle.status().handing_off);
    assert_eq!(
        *h.desktop.copied.lock().unwrap(),
        vec!["https://t.me/filebot?start=filep_a1"]
    );
    assert!(h.view.take().contains(&Seen::Notice(Notice::LinkCopied)));
}
