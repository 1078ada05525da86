//! Source image acquisition and caching.
//!
//! A source reference is either a local path (no scheme, or `file:`) or a
//! remote URL. Before any slicing happens the reference is resolved to a
//! usable local file:
//!
//! - With no cache directory, the copy lands in a fresh temporary directory
//!   that [`ImageSource::release`] deletes afterwards.
//! - With a cache directory, the copy lands inside it and is left in place
//!   forever — a later run that finds the file already there skips the
//!   fetch entirely. Remote sources are filed under
//!   `<host>/<url-path>/<filename>` so same-named files from different
//!   hosts never overwrite each other.
//! - A local source that already lives inside the cache directory is used
//!   as-is; re-copying it would just duplicate it at a nested path.
//!
//! The cache is never pruned by this crate. The existence checks here and
//! in the slicer are read-then-act with no locking, so concurrent runs
//! sharing a cache may fetch the same file twice — accepted limitation.
//!
//! Downloads go through the [`Downloader`] seam so tests can count and fake
//! fetches; the production [`HttpDownloader`] is a thin `ureq` agent with
//! an optional transfer timeout.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("download of {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },
    #[error("source image not found: {0}")]
    Missing(PathBuf),
    #[error("source reference ({0}) has no usable filename")]
    InvalidReference(String),
}

/// Strategy object for fetching a remote source to a local file.
pub trait Downloader {
    /// Stream the body of `url` into a new file at `dest`.
    fn fetch(&self, url: &Url, dest: &Path) -> Result<(), AcquireError>;
}

/// Production downloader: blocking HTTP GET through `ureq`.
pub struct HttpDownloader {
    agent: ureq::Agent,
}

impl HttpDownloader {
    /// `timeout` bounds the whole transfer; `None` blocks indefinitely.
    pub fn new(timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
        }
    }
}

impl Downloader for HttpDownloader {
    fn fetch(&self, url: &Url, dest: &Path) -> Result<(), AcquireError> {
        let response = self
            .agent
            .request_url("GET", url)
            .call()
            .map_err(|e| AcquireError::Download {
                url: url.to_string(),
                source: Box::new(e),
            })?;
        let mut reader = response.into_reader();
        let mut file = File::create(dest)?;
        io::copy(&mut reader, &mut file)?;
        Ok(())
    }
}

/// A resolved, locally-accessible copy of a source image.
///
/// Created by [`acquire`] before slicing begins; read-only while slices are
/// generated; torn down by [`release`](ImageSource::release) once all
/// slicing for the image is done. `release` consumes the source, so cleanup
/// cannot run twice, and the owned [`TempDir`] drops as a backstop if the
/// caller never releases.
#[derive(Debug)]
pub struct ImageSource {
    reference: String,
    local_path: PathBuf,
    // Present only when the parent directory is ephemeral and ours to delete.
    temp_dir: Option<TempDir>,
}

impl ImageSource {
    /// The original path or URL as given by the caller.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Filesystem path to the usable local copy.
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// True when the local copy lives in a temporary directory that
    /// `release` will delete; false for cache-resident or original files.
    pub fn is_ephemeral(&self) -> bool {
        self.temp_dir.is_some()
    }

    /// Delete the containing temporary directory, if this source owns one.
    /// Cache-resident and original files are always left alone.
    pub fn release(self) -> io::Result<()> {
        match self.temp_dir {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }
}

enum Resolved {
    Local(PathBuf),
    Remote(Url),
}

/// Classify a reference: `file:` URLs and anything that does not parse as
/// an absolute URL are local paths; every other scheme is remote.
fn resolve(reference: &str) -> Result<Resolved, AcquireError> {
    match Url::parse(reference) {
        Ok(url) if url.scheme() == "file" => {
            let path = url
                .to_file_path()
                .map_err(|()| AcquireError::InvalidReference(reference.to_string()))?;
            Ok(Resolved::Local(path))
        }
        Ok(url) => Ok(Resolved::Remote(url)),
        Err(_) => Ok(Resolved::Local(PathBuf::from(reference))),
    }
}

/// Collision-avoiding subpath for a remote source: host, then the URL path
/// with the filename dropped. Keeps `a.com/img/bg.png` and `b.com/bg.png`
/// apart in a shared cache.
fn remote_subpath(url: &Url) -> PathBuf {
    let mut sub = PathBuf::from(url.host_str().unwrap_or(""));
    let dir = Path::new(url.path()).parent().unwrap_or(Path::new(""));
    sub.push(dir.strip_prefix("/").unwrap_or(dir));
    sub
}

fn basename(resolved: &Resolved, reference: &str) -> Result<PathBuf, AcquireError> {
    let name = match resolved {
        Resolved::Local(path) => path.file_name(),
        Resolved::Remote(url) => Path::new(url.path()).file_name(),
    };
    name.map(PathBuf::from)
        .ok_or_else(|| AcquireError::InvalidReference(reference.to_string()))
}

/// Resolve `reference` into a local file, downloading or copying as needed.
///
/// With a cache directory the local copy is durable and reused by later
/// runs; without one it lives in a fresh temporary directory owned by the
/// returned [`ImageSource`]. The caller must eventually call
/// [`ImageSource::release`], even when slicing fails.
pub fn acquire(
    reference: &str,
    cache_dir: Option<&Path>,
    downloader: &dyn Downloader,
) -> Result<ImageSource, AcquireError> {
    let resolved = resolve(reference)?;

    // A local source already inside the cache directory is already cached;
    // recopying it would nest a duplicate under <cache>/<basename>.
    // Compared on absolute paths, symlinks not chased.
    if let (Some(cache), Resolved::Local(path)) = (cache_dir, &resolved) {
        let abs_source = std::path::absolute(path)?;
        let abs_cache = std::path::absolute(cache)?;
        if abs_source.starts_with(&abs_cache) {
            if !abs_source.is_file() {
                return Err(AcquireError::Missing(path.clone()));
            }
            return Ok(ImageSource {
                reference: reference.to_string(),
                local_path: path.clone(),
                temp_dir: None,
            });
        }
    }

    let (work_dir, temp_dir) = match cache_dir {
        Some(dir) => (dir.to_path_buf(), None),
        None => {
            let temp = TempDir::new()?;
            (temp.path().to_path_buf(), Some(temp))
        }
    };

    let subpath = match &resolved {
        Resolved::Local(_) => PathBuf::new(),
        Resolved::Remote(url) => remote_subpath(url),
    };
    let local_path = work_dir.join(subpath).join(basename(&resolved, reference)?);

    if let Some(parent) = local_path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Cache hit: a previous run already fetched this exact path.
    if !local_path.exists() {
        match &resolved {
            Resolved::Local(path) => {
                fs::copy(path, &local_path)?;
            }
            Resolved::Remote(url) => downloader.fetch(url, &local_path)?,
        }
    }

    Ok(ImageSource {
        reference: reference.to_string(),
        local_path,
        temp_dir,
    })
}
