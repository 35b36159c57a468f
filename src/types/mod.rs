pub mod book;
pub mod page;
