use std::{
    io::{BufWriter, Write},
    path::PathBuf,
};

use anyhow::Context;
use fs_err::File;
use serde::{de::DeserializeOwned, Serialize};

/// Reads the file at `path` and hands its text to `parse`; failures name the path and target type.
fn read_with<T>(
    path: PathBuf,
    format: &str,
    parse: impl FnOnce(&str) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    fs_err::read_to_string(&path)
        .map_err(anyhow::Error::new)
        .and_then(|text| parse(&text))
        .with_context(|| {
            format!(
                "Could not load {path:?} as {format} for {}",
                std::any::type_name::<T>()
            )
        })
}

pub fn read_json<P: Into<PathBuf>, T: DeserializeOwned>(path: P) -> anyhow::Result<T> {
    read_with(path.into(), "JSON", |text| Ok(serde_json::from_str(text)?))
}

/// Writes `value` as indented JSON, since the output is meant to be read by people too.
pub fn write_json<P: Into<PathBuf>, T: Serialize>(path: P, value: &T) -> anyhow::Result<()> {
    let path = path.into();
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("While writing JSON to {path:?}"))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn read_toml<P: Into<PathBuf>, T: DeserializeOwned>(path: P) -> anyhow::Result<T> {
    read_with(path.into(), "TOML", |text| Ok(toml::from_str(text)?))
}

/// Like [`read_toml`], but an absent path means the default value.
pub fn read_toml_or_default<P: Into<PathBuf>, T: Default + DeserializeOwned>(
    path: Option<P>,
) -> anyhow::Result<T> {
    match path {
        Some(path) => read_toml(path),
        None => Ok(T::default()),
    }
}
