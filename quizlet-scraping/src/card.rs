use std::path::PathBuf;

use getset::Getters;
use log::debug;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    config::SetPageSelectors,
    driver::{DriverError, Locator, Node},
    error::{ScrapeError, Stage},
    image::ImageFetcher,
};

/// One term of a set. `back_image_path` points to a downloaded file owned by the caller.
#[derive(Clone, PartialEq, Eq, Debug, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct Flashcard {
    front: String,
    back: String,
    back_image_path: Option<PathBuf>,
}

impl Flashcard {
    pub fn new(front: String, back: String, back_image_path: Option<PathBuf>) -> Self {
        Self {
            front,
            back,
            back_image_path,
        }
    }
}

/// Everything needed to fetch a back-side image the way the browser would.
pub struct ImageSource<'a, F> {
    pub fetcher: &'a F,
    pub user_agent: &'a str,
    /// Relative `src` attributes are resolved against this.
    pub page_url: &'a Url,
}

/// Reads the card at position `index` out of its term element.
pub fn extract_card<N: Node, F: ImageFetcher>(
    index: usize,
    term: &N,
    selectors: &SetPageSelectors,
    images: &ImageSource<F>,
) -> Result<Flashcard, ScrapeError> {
    let at = || ScrapeError::at(Stage::ExtractingCard(index));

    let content = term.find(&selectors.content).map_err(at())?;
    let small_side = content.find(&selectors.small_side).map_err(at())?;
    let large_side = content.find(&selectors.large_side).map_err(at())?;

    let front = read_text(&small_side, &selectors.front_text).map_err(at())?;
    let back = read_text(&large_side, &selectors.back_text).map_err(at())?;

    let back_image_path = match large_side
        .find_optional(&selectors.back_image)
        .map_err(at())?
    {
        Some(image) => {
            let src = image_url(&image, images.page_url, index)?;
            debug!("Card #{index} has an image at {src}");
            let path = images
                .fetcher
                .download(src.as_str(), images.user_agent)
                .map_err(|source| ScrapeError::ImageDownload { index, source })?;
            Some(path)
        }
        None => None,
    };

    Ok(Flashcard {
        front,
        back,
        back_image_path,
    })
}

fn read_text<N: Node>(side: &N, text: &Locator) -> Result<String, DriverError> {
    Ok(side.find(text)?.text()?.trim().to_owned())
}

/// Lazily loaded images keep the real address in `data-src`.
fn image_url<N: Node>(image: &N, page_url: &Url, index: usize) -> Result<Url, ScrapeError> {
    let attribute = |name: &str| {
        image
            .attribute(name)
            .map_err(ScrapeError::at(Stage::ExtractingCard(index)))
    };
    let src = match attribute("src")?.filter(|s| !s.is_empty()) {
        Some(src) => src,
        None => attribute("data-src")?
            .filter(|s| !s.is_empty())
            .ok_or(ScrapeError::MissingImageSource { index })?,
    };
    page_url
        .join(&src)
        .map_err(|source| ScrapeError::InvalidUrl { url: src, source })
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, path::PathBuf};

    use url::Url;

    use crate::{
        config::SetPageSelectors,
        driver::{
            mock::{MockBrowser, MockElement},
            Launcher, Locator, Session,
        },
        error::{ImageDownloadError, ScrapeError, Stage},
        image::ImageFetcher,
    };

    use super::{extract_card, Flashcard, ImageSource};

    #[derive(Default)]
    struct RecordingFetcher {
        requests: RefCell<Vec<(String, String)>>,
    }

    impl ImageFetcher for RecordingFetcher {
        fn download(&self, url: &str, user_agent: &str) -> Result<PathBuf, ImageDownloadError> {
            self.requests
                .borrow_mut()
                .push((url.to_owned(), user_agent.to_owned()));
            Ok(PathBuf::from("/tmp/flashcard-0.png"))
        }
    }

    fn term(
        selectors: &SetPageSelectors,
        front: &str,
        back: &str,
        image: Option<MockElement>,
    ) -> MockElement {
        let mut large_side = MockElement::new().child(
            selectors.back_text.clone(),
            MockElement::text(back),
        );
        if let Some(image) = image {
            large_side = large_side.child(selectors.back_image.clone(), image);
        }
        MockElement::new().child(
            selectors.content.clone(),
            MockElement::new()
                .child(
                    selectors.small_side.clone(),
                    MockElement::new().child(selectors.front_text.clone(), MockElement::text(front)),
                )
                .child(selectors.large_side.clone(), large_side),
        )
    }

    fn run(term_element: MockElement) -> (Result<Flashcard, ScrapeError>, RecordingFetcher) {
        let term_locator = Locator::css("div.term");
        let page = MockElement::new().child(term_locator.clone(), term_element);
        let browser = MockBrowser::new([("https://quizlet.com/1/set/", page)]);
        let mut session = browser.launch().unwrap();
        session.navigate("https://quizlet.com/1/set/").unwrap();
        let term = session
            .wait_for(&term_locator, std::time::Duration::ZERO)
            .unwrap();
        let fetcher = RecordingFetcher::default();
        let page_url = Url::parse("https://quizlet.com/1/set/").unwrap();
        let images = ImageSource {
            fetcher: &fetcher,
            user_agent: "UA",
            page_url: &page_url,
        };
        let card = extract_card(7, &term, &SetPageSelectors::default(), &images);
        (card, fetcher)
    }

    #[test]
    fn text_only_card() {
        let selectors = SetPageSelectors::default();
        let (card, fetcher) = run(term(
            &selectors,
            " Photosynthesis ",
            "Process converting light to energy\n",
            None,
        ));
        let card = card.unwrap();
        assert_eq!(card.front(), "Photosynthesis");
        assert_eq!(card.back(), "Process converting light to energy");
        assert_eq!(card.back_image_path(), &None);
        assert!(fetcher.requests.borrow().is_empty());
    }

    #[test]
    fn relative_image_is_resolved_and_fetched() {
        let selectors = SetPageSelectors::default();
        let image = MockElement::new().attr("src", "/i/mitosis.png");
        let (card, fetcher) = run(term(&selectors, "Mitosis", "Cell division", Some(image)));
        assert_eq!(
            card.unwrap().back_image_path().as_deref(),
            Some(std::path::Path::new("/tmp/flashcard-0.png"))
        );
        assert_eq!(
            *fetcher.requests.borrow(),
            [(
                "https://quizlet.com/i/mitosis.png".to_owned(),
                "UA".to_owned()
            )]
        );
    }

    #[test]
    fn lazy_image_uses_data_src() {
        let selectors = SetPageSelectors::default();
        let image = MockElement::new()
            .attr("src", "")
            .attr("data-src", "https://o.quizlet.com/x.jpg");
        let (_, fetcher) = run(term(&selectors, "a", "b", Some(image)));
        assert_eq!(fetcher.requests.borrow()[0].0, "https://o.quizlet.com/x.jpg");
    }

    #[test]
    fn image_without_address_is_not_fetched() {
        let selectors = SetPageSelectors::default();
        let image = MockElement::new().attr("data-src", "");
        let (card, fetcher) = run(term(&selectors, "a", "b", Some(image)));
        assert!(matches!(
            card.unwrap_err(),
            ScrapeError::MissingImageSource { index: 7 }
        ));
        assert!(fetcher.requests.borrow().is_empty());
    }

    #[test]
    fn missing_small_side_fails_the_card() {
        let selectors = SetPageSelectors::default();
        let element = MockElement::new().child(
            selectors.content.clone(),
            MockElement::new().child(selectors.large_side.clone(), MockElement::new()),
        );
        let (card, _) = run(element);
        match card.unwrap_err() {
            ScrapeError::ElementNotFound { stage, locator } => {
                assert_eq!(stage, Stage::ExtractingCard(7));
                assert_eq!(locator, selectors.small_side);
            }
            e => panic!("Unexpected error: {e:?}"),
        }
    }
}
