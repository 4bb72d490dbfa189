pub mod crawler;
pub mod session;
pub mod web;

pub use crawler::{LoadMode, PageLoader, RenderedPage};
pub use web::{WebDriverLoader, WebScraper};
