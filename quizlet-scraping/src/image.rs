use std::{
    io::Write,
    path::{Path, PathBuf},
};

use log::debug;
use reqwest::{blocking::Client, header};
use url::Url;

use crate::error::ImageDownloadError;

/// Fetches a card image and stores it somewhere the caller can read it.
pub trait ImageFetcher {
    fn download(&self, url: &str, user_agent: &str) -> Result<PathBuf, ImageDownloadError>;
}

/// Downloads over HTTP into fresh temporary files. The files are kept;
/// removing them is up to the caller.
pub struct HttpImageDownloader {
    client: Client,
    dir: Option<PathBuf>,
}

impl HttpImageDownloader {
    /// `dir` defaults to the system's temporary directory.
    pub fn new(dir: Option<PathBuf>) -> Result<Self, ImageDownloadError> {
        let client = Client::builder()
            .build()
            .map_err(ImageDownloadError::Client)?;
        Ok(Self { client, dir })
    }
}

impl ImageFetcher for HttpImageDownloader {
    fn download(&self, url: &str, user_agent: &str) -> Result<PathBuf, ImageDownloadError> {
        let request_error = |source| ImageDownloadError::Request {
            url: url.to_owned(),
            source,
        };
        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, user_agent)
            .send()
            .map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageDownloadError::Status {
                url: url.to_owned(),
                status,
            });
        }
        let bytes = response.bytes().map_err(request_error)?;

        let extension = extension_of(url);
        let mut builder = tempfile::Builder::new();
        builder.prefix("flashcard-");
        if let Some(extension) = &extension {
            builder.suffix(extension);
        }
        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(&bytes)?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        debug!("Saved {} bytes from {url} to {path:?}", bytes.len());
        Ok(path)
    }
}

/// `".png"` for `https://host/a/b.png?w=100`, if the path has an extension at all.
fn extension_of(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let extension = Path::new(url.path()).extension()?.to_str()?;
    (!extension.is_empty() && extension.len() <= 5).then(|| format!(".{extension}"))
}
