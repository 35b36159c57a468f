use bookdrop::{
    browse::{render::Card, render::Notice, state::RenderOp},
    config::{Config, Theme},
    link::DeepLinker,
    traits::View,
    types::book::Book,
};

/// Prints the list to stdout. Numbers keep counting across appended pages.
pub struct TerminalView {
    theme:  Theme,
    linker: DeepLinker,
    shown:  usize,
}

impl TerminalView {
    pub fn new(config: &Config) -> Self {
        Self {
            theme:  config.theme.clone(),
            linker: DeepLinker::from_config(config),
            shown:  0,
        }
    }

    pub fn print_books(&mut self, books: &[Book]) {
        for book in books {
            self.shown += 1;
            println!("{}", Card::new(book, &self.linker).to_terminal(self.shown, &self.theme));
        }
    }

    pub fn skip(&mut self, n: usize) {
        self.shown += n;
    }
}

/// One-line status shown for `op`, if it has one.
fn status_line(op: &RenderOp) -> Option<String> {
    match op {
        RenderOp::Loading => Some("Loading…".into()),
        RenderOp::NoResults => Some(NO_RESULTS.into()),
        RenderOp::EndOfResults => Some("End of results".into()),
        RenderOp::Count(n) => Some(format!("{n} results")),
        _ => None,
    }
}

pub const NO_RESULTS: &str = "📭 No books found";

impl View for TerminalView {
    fn render(&mut self, op: &RenderOp) {
        match op {
            RenderOp::Replace(books) => {
                self.shown = 0;
                self.print_books(books);
            }
            RenderOp::Append(books) => self.print_books(books),
            RenderOp::Error(message) => {
                println!("{}", self.theme.output_error.format_str(message));
                println!(
                    "{}",
                    self.theme.output_status.format_str("Type :retry to try again.")
                );
            }
            op => {
                if matches!(op, RenderOp::Loading) {
                    self.shown = 0;
                }
                if let Some(line) = status_line(op) {
                    println!("{}", self.theme.output_status.format_str(line));
                }
            }
        }
    }

    fn notify(&mut self, notice: &Notice) {
        let output = match notice {
            Notice::LinkCopied | Notice::Opened(_) => &self.theme.output_notice,
            _ => &self.theme.output_error,
        };
        println!("{}", output.format_str(notice));
    }
}
