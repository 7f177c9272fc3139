use log::{info, warn};
use quizlet_scraping_utils::credentials::Credentials;
use url::Url;

use crate::{
    auth::authenticate,
    card::{extract_card, Flashcard, ImageSource},
    config::{MissingElementPolicy, SiteConfig},
    driver::{Launcher, Session},
    error::{ScrapeError, Stage},
    image::ImageFetcher,
    session::open_session,
    terms::locate_terms,
};

pub struct ScrapeRequest<'a> {
    pub set_url: &'a str,
    /// Logs in before opening the set when present.
    pub credentials: Option<&'a Credentials>,
}

/// Scrapes every card of a set, in page order.
///
/// The browser session lives exactly as long as this call and is closed on
/// every path out of it. Nothing partial is returned: the first error ends
/// the scrape, except for missing card elements under
/// [`MissingElementPolicy::Skip`].
pub fn scrape<L: Launcher, F: ImageFetcher>(
    launcher: &L,
    fetcher: &F,
    config: &SiteConfig,
    request: &ScrapeRequest,
) -> Result<Vec<Flashcard>, ScrapeError> {
    info!(
        "Scraping {} with selectors {}",
        request.set_url, config.selector_version
    );
    let page_url = Url::parse(request.set_url).map_err(|source| ScrapeError::InvalidUrl {
        url: request.set_url.to_owned(),
        source,
    })?;

    // Without a login the set page can be opened right away.
    let initial_url = request.credentials.is_none().then_some(request.set_url);
    let mut session = open_session(launcher, initial_url)?;
    if let Some(credentials) = request.credentials {
        authenticate(&mut *session, &config.login, &config.timeouts, credentials)?;
    }
    let cards = extract_cards(&mut *session, fetcher, config, request.set_url, &page_url)?;

    if let Err(e) = session.close() {
        warn!("Failed to close the browser session: {e}");
    }
    info!("Scraped {} cards", cards.len());
    Ok(cards)
}

fn extract_cards<S: Session, F: ImageFetcher>(
    session: &mut S,
    fetcher: &F,
    config: &SiteConfig,
    set_url: &str,
    page_url: &Url,
) -> Result<Vec<Flashcard>, ScrapeError> {
    let user_agent = session
        .user_agent()
        .map_err(ScrapeError::at(Stage::LocatingTerms))?;
    let terms = locate_terms(session, &config.set_page, &config.timeouts, set_url)?;
    let images = ImageSource {
        fetcher,
        user_agent: &user_agent,
        page_url,
    };

    let mut cards = Vec::with_capacity(terms.len());
    for (index, term) in terms.iter().enumerate() {
        match extract_card(index, term, &config.set_page, &images) {
            Ok(card) => cards.push(card),
            Err(e)
                if e.is_element_not_found()
                    && config.missing_element == MissingElementPolicy::Skip =>
            {
                warn!("Skipping card #{index}: {e}");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(cards)
}
