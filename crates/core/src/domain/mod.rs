pub mod fundamentals;
pub mod news;
pub mod price;
pub mod recommendation;
pub mod report;
