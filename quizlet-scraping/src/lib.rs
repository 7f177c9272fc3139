pub mod auth;
pub mod card;
pub mod config;
pub mod driver;
pub mod error;
pub mod image;
pub mod scrape;
pub mod session;
pub mod terms;
