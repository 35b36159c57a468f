use async_trait::async_trait;

use crate::{
    browse::{client::ClientError, render::Notice, state::RenderOp},
    types::{book::Book, page::BooksPage},
};

/// Source of pages of books, normally the proxy. The page echoes the limit it was served
/// with, which may be lower than the one asked for.
#[async_trait]
pub trait BooksApi: Send + Sync {
    async fn fetch(&self, query: &str, limit: u32, offset: u32) -> Result<BooksPage<Book>, ClientError>;
}

/// Whatever shows the list to the user.
pub trait View: Send {
    fn render(&mut self, op: &RenderOp);
    fn notify(&mut self, notice: &Notice);
}

/// Hands a link over to the rest of the desktop.
pub trait Desktop: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
    fn copy(&self, text: &str) -> std::io::Result<()>;
}
