//! Slice generation: gravity selection, output naming, tool invocation.
//!
//! For one source image at one requested size the full catalog is:
//!
//! - an **unscaled pass** over all nine gravities — the image is padded or
//!   cropped (`-extent`) to the exact target size, anchored at each gravity;
//! - a **scaled pass** over a small aspect-ratio-appropriate subset — the
//!   image is first scaled to cover the target (`-scale WxH^`), then
//!   extent-cropped. Only the gravities along the image's longer axis get a
//!   scaled slice; the rest would be near-duplicates of center.
//!
//! Output paths are a pure function of `(source, gravity, scaled)`, so
//! re-running with identical arguments finds every file already on disk and
//! invokes the tool zero times. Each produced-or-skipped path is echoed to
//! stderr as a progress signal.
//!
//! Failures are collected per gravity and merged per image (see
//! [`MultiError`]); one broken slice never stops the rest. Partially
//! written outputs are left on disk for inspection.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::dimensions::Dimensions;
use crate::gravity::Gravity;
use crate::multi_error::MultiError;
use crate::source::{self, AcquireError, Downloader, ImageSource};
use crate::tool::{ImageTool, ToolError};

#[derive(Error, Debug)]
pub enum SliceError {
    #[error("could not read image {path}: {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image ({0}) is not wide enough to produce quality output")]
    TooNarrow(String),
    #[error("image ({0}) is not tall enough to produce quality output")]
    TooShort(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl SliceError {
    /// Soft failures are expected domain outcomes (the source simply cannot
    /// fill the requested size) and alone never fail a run.
    pub fn is_soft(&self) -> bool {
        matches!(self, SliceError::TooNarrow(_) | SliceError::TooShort(_))
    }
}

/// Which gravities get a scaled pre-pass, as a pure function of the two
/// aspect ratios.
///
/// After scale-to-cover, only the image's longer axis has pixels left to
/// slide the crop window along: a source wider than the target gets
/// west/center/east, a taller one gets north/center/south, and an
/// equal-aspect source collapses to center alone. Compared within machine
/// epsilon so ratios like 1024x768 vs 640x480 count as equal.
pub fn scaled_gravities(image: Dimensions, desired: Dimensions) -> &'static [Gravity] {
    let image_aspect = image.aspect();
    let desired_aspect = desired.aspect();

    if (image_aspect - desired_aspect).abs() < f64::EPSILON {
        &[Gravity::Center]
    } else if image_aspect > desired_aspect {
        &[Gravity::West, Gravity::Center, Gravity::East]
    } else {
        &[Gravity::North, Gravity::Center, Gravity::South]
    }
}

/// Deterministic output path for one slice:
/// `<dest_dir>/<stem>[_scaled]_<gravity><ext>`.
pub fn output_filename(
    dest_dir: &Path,
    gravity: Gravity,
    scaled: bool,
    source_path: &Path,
) -> PathBuf {
    let stem = source_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let separator = if scaled { "_scaled_" } else { "_" };

    let mut name = format!("{stem}{separator}{}", gravity.file_suffix());
    if let Some(ext) = source_path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    dest_dir.join(name)
}

fn convert_args(
    source_path: &Path,
    gravity: Gravity,
    scaled: bool,
    size: Dimensions,
    output_path: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        source_path.into(),
        "-gravity".into(),
        gravity.as_str().into(),
    ];
    if scaled {
        // `^` makes the geometry a cover: fill the box, keep aspect.
        args.push("-scale".into());
        args.push(format!("{size}^").into());
    }
    args.push("-extent".into());
    args.push(size.to_string().into());
    args.push(output_path.into());
    args
}

/// Run one pass (scaled or unscaled) over a set of gravities, skipping
/// outputs that already exist. Failures accumulate; the pass always visits
/// every gravity.
fn run_gravities(
    source_path: &Path,
    scaled: bool,
    gravities: &[Gravity],
    size: Dimensions,
    dest_dir: &Path,
    tool: &dyn ImageTool,
) -> MultiError {
    let mut failures = MultiError::new();
    for &gravity in gravities {
        let output_path = output_filename(dest_dir, gravity, scaled, source_path);
        eprintln!("{}", output_path.display());

        if output_path.exists() {
            continue;
        }

        let args = convert_args(source_path, gravity, scaled, size, &output_path);
        if let Err(err) = tool.run(&args) {
            failures.push(err.into());
        }
    }
    failures
}

fn probe(path: &Path) -> Result<Dimensions, SliceError> {
    let (width, height) = image::image_dimensions(path).map_err(|source| SliceError::Probe {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Dimensions { width, height })
}

fn single(error: SliceError) -> MultiError {
    MultiError::from_errors([Some(error)])
}

/// Generate the full slice catalog (scaled subset + all nine unscaled
/// gravities) for one acquired image.
///
/// Validates before touching the destination: the image must decode and be
/// at least as large as the requested size in both axes. Undersized images
/// fail soft, naming the file. The per-size destination directory is
/// created only after validation passes.
pub fn extract_from_image(
    desired: Dimensions,
    destination: &Path,
    source: &ImageSource,
    tool: &dyn ImageTool,
) -> Result<(), MultiError> {
    let local = source.local_path();
    let image_size = probe(local).map_err(single)?;

    let name = local
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if image_size.width < desired.width {
        return Err(single(SliceError::TooNarrow(name)));
    }
    if image_size.height < desired.height {
        return Err(single(SliceError::TooShort(name)));
    }

    let dest_dir = std::path::absolute(destination.join(desired.to_string()))
        .map_err(|e| single(e.into()))?;
    fs::create_dir_all(&dest_dir).map_err(|e| single(e.into()))?;

    let mut failures = run_gravities(
        local,
        true,
        scaled_gravities(image_size, desired),
        desired,
        &dest_dir,
        tool,
    );
    failures.merge(run_gravities(
        local,
        false,
        &Gravity::ALL,
        desired,
        &dest_dir,
        tool,
    ));
    failures.into_result()
}

/// Generate exactly one named slice of one acquired image.
pub fn pick_from_image(
    desired: Dimensions,
    destination: &Path,
    source: &ImageSource,
    scaled: bool,
    gravity: Gravity,
    tool: &dyn ImageTool,
) -> Result<(), MultiError> {
    let dest_dir = destination.join(desired.to_string());
    fs::create_dir_all(&dest_dir).map_err(|e| single(e.into()))?;
    run_gravities(source.local_path(), scaled, &[gravity], desired, &dest_dir, tool).into_result()
}

/// Acquire, slice, and release each reference in order.
///
/// A slicing failure is recorded and the next image is still attempted; an
/// acquisition failure aborts the whole batch, since no useful partial work
/// can happen without a local copy. Every acquired source is released, even
/// when its slicing failed.
fn batch<F>(
    references: &[String],
    cache_dir: Option<&Path>,
    downloader: &dyn Downloader,
    mut slice: F,
) -> Result<MultiError, AcquireError>
where
    F: FnMut(&ImageSource) -> Result<(), MultiError>,
{
    let mut failures = MultiError::new();
    for reference in references {
        let source = source::acquire(reference, cache_dir, downloader)?;
        let result = slice(&source);
        let released = source.release();

        if let Err(errs) = result {
            failures.merge(errs);
        }
        if let Err(err) = released {
            failures.push(err.into());
        }
    }
    Ok(failures)
}

/// The `extract` operation over a whole batch of image references.
pub fn extract_batch(
    desired: Dimensions,
    destination: &Path,
    references: &[String],
    cache_dir: Option<&Path>,
    tool: &dyn ImageTool,
    downloader: &dyn Downloader,
) -> Result<MultiError, AcquireError> {
    batch(references, cache_dir, downloader, |source| {
        extract_from_image(desired, destination, source, tool)
    })
}

/// The `pick` operation over a whole batch of image references.
pub fn pick_batch(
    desired: Dimensions,
    destination: &Path,
    gravity: Gravity,
    scaled: bool,
    references: &[String],
    cache_dir: Option<&Path>,
    tool: &dyn ImageTool,
    downloader: &dyn Downloader,
) -> Result<MultiError, AcquireError> {
    batch(references, cache_dir, downloader, |source| {
        pick_from_image(desired, destination, source, scaled, gravity, tool)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{dims, failing_downloader, write_png};
    use crate::tool::tests::MockTool;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn list_outputs(dest_dir: &Path) -> BTreeSet<String> {
        fs::read_dir(dest_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    // ---------------------------------------------------------------------
    // Gravity-set selection
    // ---------------------------------------------------------------------

    #[test]
    fn equal_aspect_scales_center_only() {
        assert_eq!(
            scaled_gravities(dims(128, 128), dims(128, 128)),
            &[Gravity::Center]
        );
    }

    #[test]
    fn equal_aspect_at_different_scale_still_center_only() {
        assert_eq!(
            scaled_gravities(dims(1024, 768), dims(640, 480)),
            &[Gravity::Center]
        );
    }

    #[test]
    fn wider_source_scales_along_horizontal() {
        assert_eq!(
            scaled_gravities(dims(2560, 1080), dims(1080, 1080)),
            &[Gravity::West, Gravity::Center, Gravity::East]
        );
    }

    #[test]
    fn taller_source_scales_along_vertical() {
        assert_eq!(
            scaled_gravities(dims(1080, 2560), dims(1080, 1080)),
            &[Gravity::North, Gravity::Center, Gravity::South]
        );
    }

    // ---------------------------------------------------------------------
    // Output naming
    // ---------------------------------------------------------------------

    #[test]
    fn unscaled_filename_embeds_gravity() {
        let path = output_filename(
            Path::new("/out/128x128"),
            Gravity::North,
            false,
            Path::new("/tmp/photo.jpg"),
        );
        assert_eq!(path, Path::new("/out/128x128/photo_north.jpg"));
    }

    #[test]
    fn scaled_filename_gets_scaled_marker() {
        let path = output_filename(
            Path::new("/out/128x128"),
            Gravity::SouthWest,
            true,
            Path::new("/tmp/photo.jpg"),
        );
        assert_eq!(path, Path::new("/out/128x128/photo_scaled_southwest.jpg"));
    }

    #[test]
    fn extensionless_source_stays_extensionless() {
        let path = output_filename(Path::new("/out"), Gravity::Center, false, Path::new("photo"));
        assert_eq!(path, Path::new("/out/photo_center"));
    }

    // ---------------------------------------------------------------------
    // Tool argument construction
    // ---------------------------------------------------------------------

    #[test]
    fn unscaled_args_are_gravity_then_extent() {
        let args = convert_args(
            Path::new("src.png"),
            Gravity::NorthEast,
            false,
            dims(128, 128),
            Path::new("out.png"),
        );
        let expected: Vec<OsString> = vec![
            "src.png".into(),
            "-gravity".into(),
            "NorthEast".into(),
            "-extent".into(),
            "128x128".into(),
            "out.png".into(),
        ];
        assert_eq!(args, expected);
    }

    #[test]
    fn scaled_args_insert_cover_scale_before_extent() {
        let args = convert_args(
            Path::new("src.png"),
            Gravity::Center,
            true,
            dims(1920, 1080),
            Path::new("out.png"),
        );
        let expected: Vec<OsString> = vec![
            "src.png".into(),
            "-gravity".into(),
            "Center".into(),
            "-scale".into(),
            "1920x1080^".into(),
            "-extent".into(),
            "1920x1080".into(),
            "out.png".into(),
        ];
        assert_eq!(args, expected);
    }

    // ---------------------------------------------------------------------
    // extract_from_image
    // ---------------------------------------------------------------------

    /// Acquire a local image in place (no cache, no copy) for slicing tests.
    fn acquire_local(path: &Path) -> ImageSource {
        source::acquire(path.to_str().unwrap(), None, &failing_downloader()).unwrap()
    }

    #[test]
    fn square_source_square_target_produces_ten_slices() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("square.png");
        write_png(&src, 128, 128);
        let dest = tmp.path().join("out");

        let tool = MockTool::new();
        let acquired = acquire_local(&src);
        extract_from_image(dims(128, 128), &dest, &acquired, &tool).unwrap();

        assert_eq!(tool.invocation_count(), 10);
        let outputs = list_outputs(&dest.join("128x128"));
        let expected: BTreeSet<String> = [
            "square_scaled_center.png",
            "square_north.png",
            "square_northeast.png",
            "square_east.png",
            "square_southeast.png",
            "square_south.png",
            "square_southwest.png",
            "square_west.png",
            "square_northwest.png",
            "square_center.png",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(outputs, expected);
        acquired.release().unwrap();
    }

    #[test]
    fn wide_source_produces_three_scaled_slices() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("wide.png");
        write_png(&src, 256, 128);
        let dest = tmp.path().join("out");

        let tool = MockTool::new();
        let acquired = acquire_local(&src);
        extract_from_image(dims(128, 128), &dest, &acquired, &tool).unwrap();

        assert_eq!(tool.invocation_count(), 12);
        let outputs = list_outputs(&dest.join("128x128"));
        assert!(outputs.contains("wide_scaled_west.png"));
        assert!(outputs.contains("wide_scaled_center.png"));
        assert!(outputs.contains("wide_scaled_east.png"));
        assert!(!outputs.contains("wide_scaled_north.png"));
        acquired.release().unwrap();
    }

    #[test]
    fn second_run_skips_everything() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("square.png");
        write_png(&src, 128, 128);
        let dest = tmp.path().join("out");
        let acquired = acquire_local(&src);

        let first = MockTool::new();
        extract_from_image(dims(128, 128), &dest, &acquired, &first).unwrap();
        let after_first = list_outputs(&dest.join("128x128"));

        let second = MockTool::new();
        extract_from_image(dims(128, 128), &dest, &acquired, &second).unwrap();

        assert_eq!(second.invocation_count(), 0);
        assert_eq!(list_outputs(&dest.join("128x128")), after_first);
        acquired.release().unwrap();
    }

    #[test]
    fn narrow_source_fails_soft_without_creating_destination() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("narrow.png");
        write_png(&src, 64, 128);
        let dest = tmp.path().join("out");

        let tool = MockTool::new();
        let acquired = acquire_local(&src);
        let err = extract_from_image(dims(128, 128), &dest, &acquired, &tool).unwrap_err();

        assert!(err.is_all_soft());
        assert_eq!(
            err.to_string(),
            "image (narrow.png) is not wide enough to produce quality output"
        );
        assert_eq!(tool.invocation_count(), 0);
        assert!(!dest.exists());
        acquired.release().unwrap();
    }

    #[test]
    fn short_source_fails_soft() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("short.png");
        write_png(&src, 128, 64);
        let dest = tmp.path().join("out");

        let acquired = acquire_local(&src);
        let err =
            extract_from_image(dims(128, 128), &dest, &acquired, &MockTool::new()).unwrap_err();
        assert!(err.is_all_soft());
        assert!(err.to_string().contains("not tall enough"));
        acquired.release().unwrap();
    }

    #[test]
    fn undecodable_source_fails_hard() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("garbage.png");
        fs::write(&src, b"not an image at all").unwrap();
        let dest = tmp.path().join("out");

        let acquired = acquire_local(&src);
        let err =
            extract_from_image(dims(128, 128), &dest, &acquired, &MockTool::new()).unwrap_err();
        assert!(err.exists());
        assert!(!err.is_all_soft());
        acquired.release().unwrap();
    }

    #[test]
    fn tool_failure_does_not_stop_remaining_gravities() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("square.png");
        write_png(&src, 128, 128);
        let dest = tmp.path().join("out");

        let tool = MockTool::failing_on("square.png");
        let acquired = acquire_local(&src);
        let err = extract_from_image(dims(128, 128), &dest, &acquired, &tool).unwrap_err();

        // All ten pairs were still attempted and all ten failures collected.
        assert_eq!(tool.invocation_count(), 10);
        assert_eq!(err.to_string().lines().count(), 10);
        assert!(!err.is_all_soft());
        acquired.release().unwrap();
    }

    // ---------------------------------------------------------------------
    // pick_from_image
    // ---------------------------------------------------------------------

    #[test]
    fn pick_runs_exactly_one_gravity() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("square.png");
        write_png(&src, 128, 128);
        let dest = tmp.path().join("out");

        let tool = MockTool::new();
        let acquired = acquire_local(&src);
        pick_from_image(dims(64, 64), &dest, &acquired, true, Gravity::SouthEast, &tool).unwrap();

        assert_eq!(tool.invocation_count(), 1);
        assert!(dest.join("64x64/square_scaled_southeast.png").exists());
        acquired.release().unwrap();
    }

    // ---------------------------------------------------------------------
    // Batching
    // ---------------------------------------------------------------------

    #[test]
    fn failing_image_does_not_block_the_next_one() {
        let tmp = TempDir::new().unwrap();
        let small = tmp.path().join("small.png");
        write_png(&small, 16, 16);
        let big = tmp.path().join("big.png");
        write_png(&big, 256, 256);
        let dest = tmp.path().join("out");

        let tool = MockTool::new();
        let references = vec![
            small.to_string_lossy().into_owned(),
            big.to_string_lossy().into_owned(),
        ];
        let failures = extract_batch(
            dims(128, 128),
            &dest,
            &references,
            None,
            &tool,
            &failing_downloader(),
        )
        .unwrap();

        assert!(failures.exists());
        assert!(failures.is_all_soft());
        // The second image was still fully sliced.
        assert_eq!(tool.invocation_count(), 10);
        assert!(dest.join("128x128/big_center.png").exists());
    }

    #[test]
    fn acquisition_failure_aborts_the_batch() {
        let tmp = TempDir::new().unwrap();
        let big = tmp.path().join("big.png");
        write_png(&big, 256, 256);
        let dest = tmp.path().join("out");

        let references = vec![
            tmp.path().join("ghost.png").to_string_lossy().into_owned(),
            big.to_string_lossy().into_owned(),
        ];
        let result = extract_batch(
            dims(128, 128),
            &dest,
            &references,
            None,
            &MockTool::new(),
            &failing_downloader(),
        );

        assert!(result.is_err());
        assert!(!dest.exists());
    }

    #[test]
    fn pick_batch_slices_every_reference() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.png");
        write_png(&a, 128, 128);
        let b = tmp.path().join("b.png");
        write_png(&b, 128, 128);
        let dest = tmp.path().join("out");

        let tool = MockTool::new();
        let references = vec![
            a.to_string_lossy().into_owned(),
            b.to_string_lossy().into_owned(),
        ];
        let failures = pick_batch(
            dims(64, 64),
            &dest,
            Gravity::North,
            false,
            &references,
            None,
            &tool,
            &failing_downloader(),
        )
        .unwrap();

        assert!(!failures.exists());
        assert_eq!(tool.invocation_count(), 2);
        assert!(dest.join("64x64/a_north.png").exists());
        assert!(dest.join("64x64/b_north.png").exists());
    }
}
