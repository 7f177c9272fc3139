use log::{debug, info, warn};
use url::Url;

use crate::{
    config::{SetPageSelectors, Timeouts},
    driver::{Node, Session},
    error::{ScrapeError, Stage},
};

/// Loads the set page and returns its term elements in document order.
pub fn locate_terms<'s, S: Session>(
    session: &'s mut S,
    selectors: &SetPageSelectors,
    timeouts: &Timeouts,
    set_url: &str,
) -> Result<Vec<S::Node<'s>>, ScrapeError> {
    let at = || ScrapeError::at(Stage::LocatingTerms);

    if !is_same_page(&session.current_url(), set_url) {
        session.navigate(set_url).map_err(at())?;
    }
    let session = &*session;

    session
        .wait_for(&selectors.details, timeouts.element)
        .and_then(|details| details.hover())
        .map_err(at())?;
    debug!("Hovered over the set details; waiting for the terms list");

    let list = session
        .wait_for(&selectors.terms_list, timeouts.element)
        .map_err(at())?;
    let terms = list.find_all(&selectors.term).map_err(at())?;
    if terms.is_empty() {
        warn!("The terms list at {set_url} is empty");
    } else {
        info!("Found {} terms", terms.len());
    }
    Ok(terms)
}

/// Compares parsed URLs, ignoring the fragment and a trailing slash.
fn is_same_page(current: &str, target: &str) -> bool {
    let key = |url: &str| {
        let mut url = Url::parse(url).ok()?;
        url.set_fragment(None);
        Some(url.as_str().trim_end_matches('/').to_owned())
    };
    matches!((key(current), key(target)), (Some(a), Some(b)) if a == b)
}
