pub mod discover;
pub mod error;
pub mod market;
pub mod news;
