//! Site description: where to log in, which selectors find what, and how long to wait.
//!
//! Every field defaults to the Quizlet markup this crate was last checked against,
//! so a config file only needs to mention what has drifted.

use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, DurationMilliSeconds, DurationSeconds};
use url::Url;

use crate::driver::Locator;

/// Markup revision the default selectors were written for.
pub const DEFAULT_SELECTOR_VERSION: &str = "quizlet-2019-set-page";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub selector_version: SelectorVersion,
    pub login: LoginConfig,
    pub set_page: SetPageSelectors,
    pub timeouts: Timeouts,
    pub missing_element: MissingElementPolicy,
}

#[derive(Clone, Debug, Deserialize, derive_more::Display)]
pub struct SelectorVersion(String);
impl Default for SelectorVersion {
    fn default() -> Self {
        Self(DEFAULT_SELECTOR_VERSION.to_owned())
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    pub home_url: Url,
    pub open_form: Locator,
    pub username: Locator,
    pub password: Locator,
    pub submit: Locator,
    /// Matched against the browser's URL after submitting; a match means we are logged in.
    #[serde_as(as = "DisplayFromStr")]
    pub success_url: Regex,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            home_url: Url::parse("https://quizlet.com/").expect("valid literal URL"),
            open_form: Locator::xpath("//button[contains(@class, 'SiteHeader-signIn')]"),
            username: Locator::xpath("//input[@id='username']"),
            password: Locator::xpath("//input[@id='password']"),
            submit: Locator::xpath("//button[@type='submit']"),
            success_url: Regex::new(r"^https://quizlet\.com/(latest|[^/]+/sets)")
                .expect("valid literal regex"),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SetPageSelectors {
    /// Hovered before waiting for the terms; the list renders lazily otherwise.
    pub details: Locator,
    pub terms_list: Locator,
    pub term: Locator,
    pub content: Locator,
    pub small_side: Locator,
    pub large_side: Locator,
    pub front_text: Locator,
    pub back_text: Locator,
    pub back_image: Locator,
}

impl Default for SetPageSelectors {
    fn default() -> Self {
        Self {
            details: Locator::css("#setPageSetDetails"),
            terms_list: Locator::xpath("//section[@class='SetPageTerms-termsList']"),
            term: Locator::class("SetPageTerms-term"),
            content: Locator::xpath(r#".//div[@class="SetPageTerm-content"]"#),
            small_side: Locator::xpath(
                r#"./div[@class="SetPageTerm-side SetPageTerm-smallSide"]"#,
            ),
            large_side: Locator::xpath(
                r#"./div[@class="SetPageTerm-side SetPageTerm-largeSide"]"#,
            ),
            front_text: Locator::xpath("./div/a/span"),
            back_text: Locator::xpath(".//a[@class='SetPageTerm-definitionText']/span"),
            back_image: Locator::xpath(".//img"),
        }
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    #[serde_as(as = "DurationSeconds<u64>")]
    pub element: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub login: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            element: Duration::from_secs(10),
            login: Duration::from_secs(10),
            poll_interval: Duration::from_millis(200),
        }
    }
}

/// What to do with a card whose expected sub-element is missing.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingElementPolicy {
    /// Fail the whole scrape.
    #[default]
    Abort,
    /// Drop the card and keep going.
    Skip,
}
