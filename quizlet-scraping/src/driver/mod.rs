//! The small slice of browser automation the scraper relies on.
//!
//! The pipeline only ever talks to these traits, so the same code drives a real
//! Chrome instance ([`chrome`]) or an in-memory page in tests.

use std::{fmt::Display, time::Duration};

use serde::{Deserialize, Serialize};

pub mod chrome;
#[cfg(test)]
pub(crate) mod mock;

/// A selector together with the dialect it is written in.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    #[serde(rename = "xpath")]
    XPath(String),
    Css(String),
    /// One or more whitespace-separated class names, all of which must be present.
    Class(String),
}

impl Locator {
    pub fn xpath(s: impl Into<String>) -> Self {
        Self::XPath(s.into())
    }
    pub fn css(s: impl Into<String>) -> Self {
        Self::Css(s.into())
    }
    pub fn class(s: impl Into<String>) -> Self {
        Self::Class(s.into())
    }

    /// The compound CSS selector equivalent to a [`Locator::Class`] value.
    pub fn class_selector(classes: &str) -> String {
        classes
            .split_whitespace()
            .map(|class| format!(".{class}"))
            .collect()
    }
}

impl Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::XPath(s) => write!(f, "xpath `{s}`"),
            Self::Css(s) => write!(f, "css `{s}`"),
            Self::Class(s) => write!(f, "class `{s}`"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("No element matched {0}")]
    NotFound(Locator),
    #[error("Browser automation failed: {0:#}")]
    Protocol(#[from] anyhow::Error),
}

/// Starts browser sessions.
pub trait Launcher {
    type Session: Session;

    fn launch(&self) -> Result<Self::Session, DriverError>;
}

/// One live browser context showing a single page at a time.
pub trait Session {
    type Node<'a>: Node
    where
        Self: 'a;

    fn navigate(&mut self, url: &str) -> Result<(), DriverError>;
    fn current_url(&self) -> String;
    fn user_agent(&self) -> Result<String, DriverError>;
    /// Polls the document until `locator` matches something, or fails with
    /// [`DriverError::NotFound`] once `timeout` has passed.
    fn wait_for(&self, locator: &Locator, timeout: Duration)
        -> Result<Self::Node<'_>, DriverError>;
    /// Releases the browser context. The session must not be used afterwards.
    fn close(&mut self) -> Result<(), DriverError>;
}

/// An element on the page. Lookups are relative to this element.
pub trait Node: Sized {
    fn find(&self, locator: &Locator) -> Result<Self, DriverError>;
    fn find_all(&self, locator: &Locator) -> Result<Vec<Self>, DriverError>;
    fn text(&self) -> Result<String, DriverError>;
    fn attribute(&self, name: &str) -> Result<Option<String>, DriverError>;
    fn hover(&self) -> Result<(), DriverError>;
    fn click(&self) -> Result<(), DriverError>;
    fn type_text(&self, text: &str) -> Result<(), DriverError>;

    fn find_optional(&self, locator: &Locator) -> Result<Option<Self>, DriverError> {
        Ok(self.find_all(locator)?.into_iter().next())
    }
}
