use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::anyhow;
use headless_chrome::{
    browser::tab::NoElementFound, util::Timeout, Browser, Element, LaunchOptions, Tab,
};
use log::{debug, info};
use serde_json::{json, Value};

use super::{DriverError, Launcher, Locator, Node, Session};

/// How the Chrome process is started.
#[derive(Clone, Debug)]
pub struct ChromeOptions {
    pub headless: bool,
    pub window_size: Option<(u32, u32)>,
    pub remote_debugging_port: Option<u16>,
    /// Uses the downloaded/auto-detected Chrome binary when absent.
    pub browser_path: Option<PathBuf>,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: Some((1920, 1080)),
            remote_debugging_port: None,
            browser_path: None,
        }
    }
}

pub struct ChromeLauncher {
    options: ChromeOptions,
}

impl ChromeLauncher {
    pub fn new(options: ChromeOptions) -> Self {
        Self { options }
    }
}

impl Launcher for ChromeLauncher {
    type Session = ChromeSession;

    fn launch(&self) -> Result<ChromeSession, DriverError> {
        let options = LaunchOptions::default_builder()
            .headless(self.options.headless)
            .window_size(self.options.window_size)
            .port(self.options.remote_debugging_port)
            .path(self.options.browser_path.clone())
            .build()
            .map_err(|e| anyhow!("Invalid launch options: {e}"))?;
        info!("Starting Chrome (headless: {})", self.options.headless);
        let browser = Browser::new(options)?;
        let tab = browser.new_tab()?;
        Ok(ChromeSession { tab, browser })
    }
}

// `tab` is declared first so that it is dropped before the browser process.
pub struct ChromeSession {
    tab: Arc<Tab>,
    browser: Browser,
}

impl Session for ChromeSession {
    type Node<'a> = ChromeNode<'a>;

    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        debug!("Navigating to {url}");
        self.tab.navigate_to(url)?.wait_until_navigated()?;
        Ok(())
    }

    fn current_url(&self) -> String {
        self.tab.get_url()
    }

    fn user_agent(&self) -> Result<String, DriverError> {
        Ok(self.browser.get_version()?.user_agent)
    }

    fn wait_for(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ChromeNode<'_>, DriverError> {
        let found = match Query::from(locator) {
            Query::XPath(xpath) => self
                .tab
                .wait_for_xpath_with_custom_timeout(&xpath, timeout),
            Query::Css(css) => self
                .tab
                .wait_for_element_with_custom_timeout(&css, timeout),
        };
        found.map(ChromeNode).map_err(|e| classify(e, locator))
    }

    fn close(&mut self) -> Result<(), DriverError> {
        debug!("Closing the tab");
        self.tab.close(false)?;
        Ok(())
    }
}

pub struct ChromeNode<'a>(Element<'a>);

/// Marks the element descendants an XPath matches, relative to `this`.
/// Returns the number marked, or the error message if the expression is invalid.
const MARK_XPATH_MATCHES: &str = r#"function (xpath, attribute, token) {
    let found;
    try {
        found = document.evaluate(xpath, this, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
    } catch (e) {
        return String(e);
    }
    let marked = 0;
    for (let i = 0; i < found.snapshotLength; i++) {
        const node = found.snapshotItem(i);
        if (node.nodeType === Node.ELEMENT_NODE && node !== this && this.contains(node)) {
            node.setAttribute(attribute, token);
            marked++;
        }
    }
    return marked;
}"#;

const UNMARK: &str = r#"function (attribute, token) {
    for (const node of this.querySelectorAll(`[${attribute}="${token}"]`)) {
        node.removeAttribute(attribute);
    }
}"#;

const MATCH_ATTRIBUTE: &str = "data-quizlet-scraping-match";

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(0);

impl<'a> ChromeNode<'a> {
    // `DOM.performSearch` ignores the context node, so the expression is
    // evaluated in the page and the matches are collected with a scoped CSS query.
    fn find_all_by_xpath(&self, xpath: &str) -> Result<Vec<ChromeNode<'a>>, DriverError> {
        let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed).to_string();
        let marked = self
            .0
            .call_js_fn(
                MARK_XPATH_MATCHES,
                vec![json!(xpath), json!(MATCH_ATTRIBUTE), json!(token)],
                false,
            )?
            .value;
        match marked {
            Some(Value::Number(n)) if n.as_u64() == Some(0) => return Ok(vec![]),
            Some(Value::Number(_)) => {}
            Some(Value::String(message)) => {
                return Err(anyhow!("Could not evaluate XPath {xpath:?}: {message}").into())
            }
            other => return Err(anyhow!("Unexpected XPath result {other:?}").into()),
        }

        let found = self
            .0
            .find_elements(&format!(r#"[{MATCH_ATTRIBUTE}="{token}"]"#));
        if let Err(e) = self
            .0
            .call_js_fn(UNMARK, vec![json!(MATCH_ATTRIBUTE), json!(token)], false)
        {
            debug!("Could not clear XPath marks: {e}");
        }
        Ok(found?.into_iter().map(ChromeNode).collect())
    }
}

impl Node for ChromeNode<'_> {
    fn find(&self, locator: &Locator) -> Result<Self, DriverError> {
        match Query::from(locator) {
            Query::XPath(xpath) => self
                .find_all_by_xpath(&xpath)?
                .into_iter()
                .next()
                .ok_or_else(|| DriverError::NotFound(locator.clone())),
            Query::Css(css) => self
                .0
                .find_element(&css)
                .map(ChromeNode)
                .map_err(|e| classify(e, locator)),
        }
    }

    fn find_all(&self, locator: &Locator) -> Result<Vec<Self>, DriverError> {
        match Query::from(locator) {
            Query::XPath(xpath) => self.find_all_by_xpath(&xpath),
            Query::Css(css) => match self.0.find_elements(&css) {
                Ok(elements) => Ok(elements.into_iter().map(ChromeNode).collect()),
                Err(e) if is_not_found(&e) => Ok(vec![]),
                Err(e) => Err(e.into()),
            },
        }
    }

    fn text(&self) -> Result<String, DriverError> {
        Ok(self.0.get_inner_text()?)
    }

    fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        Ok(self.0.get_attribute_value(name)?)
    }

    fn hover(&self) -> Result<(), DriverError> {
        self.0.move_mouse_over()?;
        Ok(())
    }

    fn click(&self) -> Result<(), DriverError> {
        self.0.click()?;
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<(), DriverError> {
        self.0.type_into(text)?;
        Ok(())
    }
}

/// The two selector dialects Chrome understands natively.
enum Query {
    XPath(String),
    Css(String),
}

impl From<&Locator> for Query {
    fn from(locator: &Locator) -> Self {
        match locator {
            Locator::XPath(xpath) => Self::XPath(xpath.clone()),
            Locator::Css(css) => Self::Css(css.clone()),
            Locator::Class(classes) => Self::Css(Locator::class_selector(classes)),
        }
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<NoElementFound>().is_some() || e.downcast_ref::<Timeout>().is_some()
}

fn classify(e: anyhow::Error, locator: &Locator) -> DriverError {
    if is_not_found(&e) {
        DriverError::NotFound(locator.clone())
    } else {
        DriverError::Protocol(e)
    }
}
