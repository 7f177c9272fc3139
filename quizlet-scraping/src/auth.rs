use std::{
    thread::sleep,
    time::{Duration, Instant},
};

use log::{debug, info};
use quizlet_scraping_utils::credentials::Credentials;

use crate::{
    config::{LoginConfig, Timeouts},
    driver::{Locator, Node, Session},
    error::{ScrapeError, Stage},
};

/// Logs in through the site's own form and waits until the browser lands on
/// a page matching `login.success_url`.
pub fn authenticate<S: Session>(
    session: &mut S,
    login: &LoginConfig,
    timeouts: &Timeouts,
    credentials: &Credentials,
) -> Result<(), ScrapeError> {
    let at = || ScrapeError::at(Stage::Authenticating);

    info!("Logging in as {}", credentials.username);
    session.navigate(login.home_url.as_str()).map_err(at())?;
    session
        .wait_for(&login.open_form, timeouts.element)
        .and_then(|button| button.click())
        .map_err(at())?;

    fill_field(session, &login.username, timeouts.element, credentials.username.as_ref())?;
    fill_field(session, &login.password, timeouts.element, credentials.password.as_ref())?;
    session
        .wait_for(&login.submit, timeouts.element)
        .and_then(|button| button.click())
        .map_err(at())?;

    let url = wait_for_url(session, |url| login.success_url.is_match(url), timeouts).map_err(
        |last_url| ScrapeError::AuthenticationTimeout {
            pattern: login.success_url.to_string(),
            timeout: timeouts.login,
            last_url,
        },
    )?;
    info!("Successfully logged in.");
    debug!("Landed on {url}");
    Ok(())
}

fn fill_field<S: Session>(
    session: &S,
    field: &Locator,
    timeout: Duration,
    value: &str,
) -> Result<(), ScrapeError> {
    session
        .wait_for(field, timeout)
        .and_then(|input| input.type_text(value))
        .map_err(ScrapeError::at(Stage::Authenticating))
}

/// Polls the current URL until `accept` holds. On timeout, returns the last URL seen.
fn wait_for_url<S: Session>(
    session: &S,
    accept: impl Fn(&str) -> bool,
    timeouts: &Timeouts,
) -> Result<String, String> {
    let deadline = Instant::now() + timeouts.login;
    loop {
        let url = session.current_url();
        if accept(&url) {
            return Ok(url);
        }
        if Instant::now() >= deadline {
            return Err(url);
        }
        sleep(timeouts.poll_interval);
    }
}
