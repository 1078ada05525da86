//! Shared test utilities for the wallslice test suite.
//!
//! Fixtures are synthesized rather than checked in: tests need images at
//! exact pixel sizes (just large enough, one pixel too narrow, ...), so a
//! tiny real PNG is written on demand through the `image` crate.

use std::path::Path;

use crate::dimensions::Dimensions;
use crate::source::{AcquireError, Downloader};
use url::Url;

/// Write a real, decodable PNG of the given size.
pub fn write_png(path: &Path, width: u32, height: u32) {
    image::RgbaImage::new(width, height)
        .save(path)
        .expect("writing png fixture");
}

/// Shorthand for tests that build lots of sizes.
pub fn dims(width: u32, height: u32) -> Dimensions {
    Dimensions { width, height }
}

struct NoDownloads;

impl Downloader for NoDownloads {
    fn fetch(&self, url: &Url, _dest: &Path) -> Result<(), AcquireError> {
        panic!("unexpected download of {url}");
    }
}

/// A downloader for tests where no network fetch should ever happen.
pub fn failing_downloader() -> impl Downloader {
    NoDownloads
}
