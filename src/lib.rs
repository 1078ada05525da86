//! # wallslice
//!
//! Generate a fixed catalog of cropped and scaled wallpaper variants of an
//! image, one per crop anchor ("gravity"), at any requested screen size.
//! Sources can be local files or URLs; remote sources are optionally cached
//! on disk so repeated runs never download twice.
//!
//! # Architecture: Plan, Acquire, Delegate
//!
//! wallslice never touches pixels itself. It decides *what* to produce —
//! which gravities, which filenames, scaled or not — and delegates the
//! actual raster work to ImageMagick's `convert`, one subprocess per slice:
//!
//! ```text
//! 1. Acquire   path/URL  →  local file     (temp dir or persistent cache)
//! 2. Plan      aspect ratios → gravity set + deterministic output paths
//! 3. Delegate  one `convert` run per missing output
//! ```
//!
//! Output paths are a pure function of (source, gravity, scaled), so a
//! re-run finds every file already present and does nothing — idempotence
//! is the crate's core guarantee, and what makes it safe to point at a
//! wallpaper directory from a cron job.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`dimensions`] | `WxH` argument parsing into a validated size |
//! | [`gravity`] | the closed nine-direction crop-anchor vocabulary |
//! | [`slicer`] | gravity-set planning, output naming, per-slice execution, batching |
//! | [`source`] | path/URL resolution, download, cache reuse, temp-dir lifecycle |
//! | [`tool`] | the `convert` subprocess seam ([`tool::ImageTool`]) |
//! | [`multi_error`] | failure aggregation across independent images and gravities |
//!
//! # Design Decisions
//!
//! ## Scaled Slices Follow the Long Axis
//!
//! Besides the nine plain crops, a few variants are pre-scaled to cover the
//! target before cropping. Producing all nine scaled would yield many
//! near-duplicates — once scaled to cover, only the image's longer axis has
//! leftover pixels — so the scaled set collapses to west/center/east for
//! wide sources, north/center/south for tall ones, and center alone when
//! the aspect ratios already match.
//!
//! ## Soft Failures
//!
//! A source that is smaller than the requested size is an expected outcome
//! when batch-feeding a wallpaper collection, not a defect. Such failures
//! are carried as a structured error kind; a run whose failures are
//! exclusively soft prints them to stderr and still exits zero.
//!
//! ## Sequential by Design
//!
//! Images and gravities are processed one at a time, in the order given.
//! The skip-if-exists and cache-hit checks are plain read-then-act with no
//! locking, so concurrent runs against a shared cache or destination may
//! duplicate work; that trade keeps the filesystem the only state.

pub mod dimensions;
pub mod gravity;
pub mod multi_error;
pub mod slicer;
pub mod source;
pub mod tool;

#[cfg(test)]
pub(crate) mod test_helpers;
