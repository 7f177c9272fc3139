use std::ops::{Deref, DerefMut};

use log::{debug, warn};

use crate::{
    driver::{DriverError, Launcher, Session},
    error::{ScrapeError, Stage},
};

/// Owns a browser session and closes it exactly once, on drop at the latest.
pub struct SessionGuard<S: Session> {
    session: Option<S>,
}

impl<S: Session> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Closes now, reporting any failure instead of only logging it.
    pub fn close(mut self) -> Result<(), DriverError> {
        match self.session.take() {
            Some(mut session) => session.close(),
            None => Ok(()),
        }
    }
}

impl<S: Session> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.session.as_ref().expect("session is present until closed")
    }
}

impl<S: Session> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        self.session.as_mut().expect("session is present until closed")
    }
}

impl<S: Session> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            debug!("Closing the browser session");
            if let Err(e) = session.close() {
                warn!("Failed to close the browser session: {e}");
            }
        }
    }
}

/// Launches a session and, if given, loads `target_url` in it.
pub fn open_session<L: Launcher>(
    launcher: &L,
    target_url: Option<&str>,
) -> Result<SessionGuard<L::Session>, ScrapeError> {
    let mut session = SessionGuard::new(launcher.launch().map_err(ScrapeError::SessionInit)?);
    if let Some(url) = target_url {
        session
            .navigate(url)
            .map_err(ScrapeError::at(Stage::LaunchingBrowser))?;
    }
    Ok(session)
}
