use std::fmt::Display;

use crate::{config::Theme, link::DeepLinker, types::book::Book};

/// Short-lived messages shown next to the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    LinkCopied,
    CopyFailed,
    Opened(String),
    OpenFailed,
    NoSuchCard(usize),
    InvalidLink(String),
}

impl Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::LinkCopied => write!(f, "Link copied!"),
            Notice::CopyFailed => write!(f, "Failed to copy link."),
            Notice::Opened(url) => write!(f, "Opened {url}"),
            Notice::OpenFailed => write!(f, "Failed to open link."),
            Notice::NoSuchCard(n) => write!(f, "There is no card {n}."),
            Notice::InvalidLink(e) => write!(f, "Couldn't build a link: {e}"),
        }
    }
}

/// Human readable size, `0 KB` for missing or empty files.
pub fn format_size(bytes: Option<u64>) -> String {
    const KB: f64 = 1024.0;
    let bytes = match bytes {
        None | Some(0) => return "0 KB".into(),
        Some(b) => b,
    };
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.2} KB", b / KB)
    } else if b < KB * KB * KB {
        format!("{:.2} MB", b / KB / KB)
    } else {
        format!("{:.2} GB", b / KB / KB / KB)
    }
}

pub fn file_icon(mime_type: Option<&str>) -> &'static str {
    let mime = match mime_type {
        Some(m) => m.to_lowercase(),
        None => return "📄",
    };
    if mime.contains("pdf") {
        "📕"
    } else if mime.contains("epub") {
        "📱"
    } else {
        "📄"
    }
}

/// `application/pdf` -> `PDF`.
pub fn format_label(mime_type: Option<&str>) -> Option<String> {
    let (_, subtype) = mime_type?.split_once('/')?;
    if subtype.is_empty() {
        return None;
    }
    Some(subtype.to_uppercase())
}

/// Strips control characters so catalog text can't drive the terminal.
fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Display model of one book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub icon:    &'static str,
    pub title:   String,
    pub size:    String,
    pub format:  Option<String>,
    pub caption: Option<String>,
    pub link:    Option<String>,
}

impl Card {
    pub fn new(book: &Book, linker: &DeepLinker) -> Self {
        Self {
            icon:    file_icon(book.mime_type.as_deref()),
            title:   sanitize(book.title()),
            size:    format_size(book.file_size),
            format:  format_label(book.mime_type.as_deref()),
            caption: book
                .caption
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .map(sanitize),
            link:    if linker.has_bot() {
                linker.link(&book.id).ok().map(String::from)
            } else {
                None
            },
        }
    }

    /// Multi-line terminal rendering, `number` is what the user types to pick the card.
    pub fn to_terminal(&self, number: usize, theme: &Theme) -> String {
        let mut lines = vec![format!(
            "{} {} {}",
            theme.output_index.format_str(number),
            self.icon,
            theme.output_title.format_str(&self.title)
        )];
        let mut meta = vec![theme.output_size.format_str(&self.size)];
        if let Some(format) = &self.format {
            meta.push(theme.output_format.format_str(format));
        }
        lines.push(format!("    {}", meta.join("  ")));
        if let Some(caption) = &self.caption {
            for line in caption.lines() {
                lines.push(format!("    {}", theme.output_caption.format_str(line)));
            }
        }
        if let Some(link) = &self.link {
            lines.push(format!("    {}", theme.output_link.format_str(link)));
        }
        lines.join("\n")
    }
}
