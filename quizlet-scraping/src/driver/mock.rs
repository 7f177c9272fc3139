//! In-memory pages for exercising the pipeline without a browser.
//!
//! Each element keeps its children keyed by the exact [`Locator`] used to reach
//! them. Session-level waits search the whole tree; node-level lookups only
//! look at direct children.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
    time::Duration,
};

use anyhow::anyhow;

use super::{DriverError, Launcher, Locator, Node, Session};

#[derive(Clone, Debug, Default)]
pub struct MockElement {
    text: String,
    attributes: Vec<(String, String)>,
    children: Vec<(Locator, MockElement)>,
    navigates_to: Option<String>,
}

impl MockElement {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            ..Self::default()
        }
    }
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_owned(), value.to_owned()));
        self
    }
    pub fn child(mut self, locator: Locator, child: MockElement) -> Self {
        self.children.push((locator, child));
        self
    }
    /// Clicking this element moves the session to `url`.
    pub fn navigates_to(mut self, url: &str) -> Self {
        self.navigates_to = Some(url.to_owned());
        self
    }

    fn search(&self, locator: &Locator) -> Option<&MockElement> {
        self.children.iter().find_map(|(key, child)| {
            if key == locator {
                Some(child)
            } else {
                child.search(locator)
            }
        })
    }
}

/// What the pipeline did to the browser.
#[derive(Debug, Default)]
pub struct MockLog {
    pub launches: Cell<usize>,
    pub closes: Cell<usize>,
    pub visited: RefCell<Vec<String>>,
    pub hovered: RefCell<Vec<String>>,
    pub clicked: RefCell<Vec<String>>,
    pub typed: RefCell<Vec<String>>,
}

pub struct MockBrowser {
    pages: Rc<HashMap<String, MockElement>>,
    pub log: Rc<MockLog>,
    pub fail_launch: bool,
}

pub const MOCK_USER_AGENT: &str = "MockBrowser/1.0";

impl MockBrowser {
    pub fn new(pages: impl IntoIterator<Item = (&'static str, MockElement)>) -> Self {
        Self {
            pages: Rc::new(
                pages
                    .into_iter()
                    .map(|(url, root)| (url.to_owned(), root))
                    .collect(),
            ),
            log: Rc::default(),
            fail_launch: false,
        }
    }
}

impl Launcher for MockBrowser {
    type Session = MockSession;

    fn launch(&self) -> Result<MockSession, DriverError> {
        if self.fail_launch {
            return Err(anyhow!("Could not find a browser binary").into());
        }
        self.log.launches.set(self.log.launches.get() + 1);
        Ok(MockSession {
            pages: Rc::clone(&self.pages),
            log: Rc::clone(&self.log),
            url: RefCell::new("about:blank".to_owned()),
        })
    }
}

pub struct MockSession {
    pages: Rc<HashMap<String, MockElement>>,
    log: Rc<MockLog>,
    url: RefCell<String>,
}

impl Session for MockSession {
    type Node<'a> = MockNode<'a>;

    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.log.visited.borrow_mut().push(url.to_owned());
        *self.url.borrow_mut() = url.to_owned();
        Ok(())
    }

    fn current_url(&self) -> String {
        self.url.borrow().clone()
    }

    fn user_agent(&self) -> Result<String, DriverError> {
        Ok(MOCK_USER_AGENT.to_owned())
    }

    fn wait_for(&self, locator: &Locator, _timeout: Duration) -> Result<MockNode<'_>, DriverError> {
        let url = self.url.borrow().clone();
        self.pages
            .get(&url)
            .and_then(|root| root.search(locator))
            .map(|element| MockNode {
                element,
                session: self,
            })
            .ok_or_else(|| DriverError::NotFound(locator.clone()))
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.log.closes.set(self.log.closes.get() + 1);
        Ok(())
    }
}

pub struct MockNode<'a> {
    element: &'a MockElement,
    session: &'a MockSession,
}

impl MockNode<'_> {
    fn label(&self) -> String {
        self.element.text.clone()
    }
}

impl Node for MockNode<'_> {
    fn find(&self, locator: &Locator) -> Result<Self, DriverError> {
        self.find_optional(locator)?
            .ok_or_else(|| DriverError::NotFound(locator.clone()))
    }

    fn find_all(&self, locator: &Locator) -> Result<Vec<Self>, DriverError> {
        Ok(self
            .element
            .children
            .iter()
            .filter(|(key, _)| key == locator)
            .map(|(_, element)| MockNode {
                element,
                session: self.session,
            })
            .collect())
    }

    fn text(&self) -> Result<String, DriverError> {
        Ok(self.element.text.clone())
    }

    fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        Ok(self
            .element
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone()))
    }

    fn hover(&self) -> Result<(), DriverError> {
        self.session.log.hovered.borrow_mut().push(self.label());
        Ok(())
    }

    fn click(&self) -> Result<(), DriverError> {
        self.session.log.clicked.borrow_mut().push(self.label());
        if let Some(url) = &self.element.navigates_to {
            *self.session.url.borrow_mut() = url.clone();
        }
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<(), DriverError> {
        self.session.log.typed.borrow_mut().push(text.to_owned());
        Ok(())
    }
}
