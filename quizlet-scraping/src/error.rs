use std::{io, time::Duration};

use reqwest::StatusCode;

use crate::driver::{DriverError, Locator};

/// The pipeline step that was running when something went wrong.
#[derive(Clone, Copy, PartialEq, Eq, Debug, derive_more::Display)]
pub enum Stage {
    #[display("launching the browser")]
    LaunchingBrowser,
    #[display("logging in")]
    Authenticating,
    #[display("locating terms")]
    LocatingTerms,
    #[display("extracting card #{_0}")]
    ExtractingCard(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Failed to start the browser session")]
    SessionInit(#[source] DriverError),
    #[error("No element matched {locator} while {stage}")]
    ElementNotFound { stage: Stage, locator: Locator },
    #[error("Login was not confirmed within {timeout:?}: URL {last_url:?} never matched {pattern:?}")]
    AuthenticationTimeout {
        pattern: String,
        timeout: Duration,
        last_url: String,
    },
    #[error("Failed to download the image of card #{index}")]
    ImageDownload {
        index: usize,
        #[source]
        source: ImageDownloadError,
    },
    #[error("The image of card #{index} has neither `src` nor `data-src`")]
    MissingImageSource { index: usize },
    #[error("The browser failed while {stage}")]
    Driver {
        stage: Stage,
        #[source]
        source: DriverError,
    },
    #[error("Invalid URL {url:?}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl ScrapeError {
    /// Attaches `stage` to a browser error, keeping "not found" distinguishable.
    pub fn at(stage: Stage) -> impl FnOnce(DriverError) -> Self {
        move |e| match e {
            DriverError::NotFound(locator) => Self::ElementNotFound { stage, locator },
            source => Self::Driver { stage, source },
        }
    }

    pub fn is_element_not_found(&self) -> bool {
        matches!(self, Self::ElementNotFound { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageDownloadError {
    #[error("Server returned {status} for {url}")]
    Status { url: String, status: StatusCode },
    #[error("Could not build the HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("Request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Could not save the image to a temporary file")]
    Io(#[from] io::Error),
}
