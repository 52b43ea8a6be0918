//! JSONL helpers: strict listing reader/writer and tolerant raw reader.
//!
//! - [`read_listings`] → strict parsing into [`Listing`], failing with the line number.
//! - [`read_all_jsonl`] → tolerant parsing into raw [`serde_json::Value`] rows.
//! - [`write_listings`] → one listing per line.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{errors::SearchError, record::Listing};

/// Prefixes site-relative links (`/pl/oferta/...`) with `base`.
pub fn canonicalize_link(link: &str, base: &str) -> String {
    let link = link.trim();
    if link.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), link)
    } else {
        link.to_string()
    }
}

/// Reads a listing snapshot strictly.
///
/// - Ignores empty lines.
/// - Canonicalizes relative links against `link_base`.
///
/// # Errors
/// - [`SearchError::Io`] if the file cannot be read.
/// - [`SearchError::Parse`] if any line fails strict deserialization.
pub fn read_listings(path: impl AsRef<Path>, link_base: &str) -> Result<Vec<Listing>, SearchError> {
    info!("Reading listing snapshot: {:?}", path.as_ref());

    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut l: Listing = serde_json::from_str(&line).map_err(|e| SearchError::Parse {
            line: i + 1,
            reason: e.to_string(),
        })?;
        l.link = canonicalize_link(&l.link, link_base);
        out.push(l);
    }

    debug!("Loaded {} listings", out.len());
    Ok(out)
}

/// Reads arbitrary JSONL into values, skipping (and logging) malformed lines.
///
/// # Errors
/// [`SearchError::Io`] if the file cannot be read.
pub fn read_all_jsonl(path: impl AsRef<Path>) -> Result<Vec<Value>, SearchError> {
    info!("Reading raw JSONL: {:?}", path.as_ref());

    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(v) => out.push(v),
            Err(e) => warn!(line = i + 1, error = %e, "skipping malformed JSONL row"),
        }
    }

    debug!("Loaded {} raw rows", out.len());
    Ok(out)
}

/// Writes listings as JSONL, replacing `path`.
pub fn write_listings(path: impl AsRef<Path>, listings: &[Listing]) -> Result<(), SearchError> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut w = BufWriter::new(File::create(path.as_ref())?);
    for l in listings {
        serde_json::to_writer(&mut w, l)?;
        w.write_all(b"\n")?;
    }
    w.flush()?;
    info!(count = listings.len(), path = ?path.as_ref(), "snapshot written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_links_get_the_base() {
        assert_eq!(
            canonicalize_link("/pl/oferta/abc", "https://www.otodom.pl/"),
            "https://www.otodom.pl/pl/oferta/abc"
        );
        assert_eq!(
            canonicalize_link("https://x.pl/a", "https://www.otodom.pl"),
            "https://x.pl/a"
        );
    }
}
