//! Conversion jobs.
//!
//! Runs the full image-to-map pipeline for a batch of map images. Each image
//! is its own job: a failing job is recorded in the summary and the rest of
//! the batch carries on.
//!
//! Three tileset modes are supported:
//!
//! * per-image (default): every map gets its own `<stem>-tileset.png`
//! * external: every map is resolved against one supplied tileset image
//! * common: all maps share one tileset, written once after the batch

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::diagnostic::{Diagnostic, Diagnostics, TILESET_ORDER};
use crate::document::{write_document, DataEncoding, MapDocument};
use crate::error::{Result, TmxError};
use crate::image_io::{load_pixels, write_atlas};
use crate::output::{display_path, plural, Printer};
use crate::pixels::PixelBuffer;
use crate::tilemap::{MissPolicy, TileGrid, TilemapBuilder};
use crate::tileset::{TilesetBuilder, DEFAULT_TILE_SIZE};

/// File name of the shared atlas in common-tileset mode.
pub const COMMON_TILESET: &str = "common-tileset.png";

/// Diagnostic code for an atlas that had no tiles to write.
pub const EMPTY_ATLAS: &str = "tmx::empty-atlas";

/// Settings for a conversion batch.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub tile_width: u32,
    pub tile_height: u32,
    pub encoding: DataEncoding,
    /// Where to write outputs; defaults to each image's own directory.
    pub output_dir: Option<PathBuf>,
    /// Resolve against this tileset image instead of building one.
    pub external_tileset: Option<PathBuf>,
    pub common_tileset: bool,
    pub power_of_two: bool,
    pub policy: MissPolicy,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            encoding: DataEncoding::Gzip,
            output_dir: None,
            external_tileset: None,
            common_tileset: false,
            power_of_two: true,
            policy: MissPolicy::Lenient,
        }
    }
}

impl ConvertOptions {
    fn new_tileset(&self) -> TilesetBuilder {
        TilesetBuilder::new(self.tile_width, self.tile_height).with_power_of_two(self.power_of_two)
    }

    fn output_dir_for(&self, image: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => image
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

/// Outcome of one map image.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub input: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tileset: Option<PathBuf>,
    /// Grid size in tiles (columns, rows).
    pub grid: (u32, u32),
    /// Tiles in the catalog the map was resolved against.
    pub tiles: usize,
    /// Cells left as ID 0 because no tile matched.
    pub unresolved: usize,
    pub diagnostics: Diagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobReport {
    fn new(input: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            map: None,
            tileset: None,
            grid: (0, 0),
            tiles: 0,
            unresolved: 0,
            diagnostics: Diagnostics::new(),
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub jobs: Vec<JobReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_tileset: Option<PathBuf>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.jobs.iter().filter(|j| !j.succeeded()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.jobs.len() - self.failed()
    }
}

/// Convert every image in `images`.
///
/// Only problems that affect the whole batch (an uncreatable output
/// directory, a failed common atlas write) are returned as errors. Per-image
/// failures, including an unreadable external tileset, are recorded in the
/// summary.
pub fn convert_batch(
    images: &[PathBuf],
    options: &ConvertOptions,
    printer: &Printer,
) -> Result<BatchSummary> {
    if let Some(dir) = &options.output_dir {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| TmxError::Io {
                path: dir.clone(),
                message: format!("Failed to create output directory: {}", e),
            })?;
        }
    }

    printer.verbose(
        "Tile size",
        &format!("{}x{}", options.tile_width, options.tile_height),
    );

    if let Some(path) = &options.external_tileset {
        return convert_with_external(images, path, options, printer);
    }
    if options.common_tileset {
        let atlas_dir = options
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        return convert_with_common(images, options, &atlas_dir, printer);
    }

    let jobs = images
        .iter()
        .map(|image| {
            let mut report = JobReport::new(image);
            if let Err(e) = convert_single(image, options, printer, &mut report) {
                fail(printer, &mut report, e);
            }
            report
        })
        .collect();

    Ok(BatchSummary {
        jobs,
        common_tileset: None,
    })
}

/// Per-image mode: build a tileset from the map itself.
fn convert_single(
    image_path: &Path,
    options: &ConvertOptions,
    printer: &Printer,
    report: &mut JobReport,
) -> Result<()> {
    let image = load(image_path, printer)?;
    let out_dir = options.output_dir_for(image_path);
    let stem = file_stem(image_path);

    let mut tileset = options.new_tileset();
    tileset.append(&image);
    report.diagnostics.merge(tileset.take_diagnostics());
    report.tiles = tileset.catalog().len();

    let atlas_path = out_dir.join(format!("{}-tileset.png", stem));
    if write_atlas_if_any(&tileset, &atlas_path, printer, &mut report.diagnostics)? {
        report.tileset = Some(atlas_path.clone());
    }

    // The grid scanned while appending is already the answer for this image.
    let scanned = tileset.take_scanned_grid();
    let mut tilemap = TilemapBuilder::new(&tileset, &image).with_policy(options.policy);
    if let Some(scanned) = scanned {
        tilemap = tilemap.with_precomputed(scanned);
    }
    tilemap.resolve()?;
    report.diagnostics.merge(tilemap.take_diagnostics());
    let grid = tilemap.into_grid().ok_or_else(not_resolved)?;

    let map_path = out_dir.join(format!("{}.tmx", stem));
    let doc = MapDocument {
        grid: &grid,
        tile_width: tileset.tile_width(),
        tile_height: tileset.tile_height(),
        tileset_path: reference_path(&map_path, &atlas_path),
        atlas_width: tileset.out_width(),
        atlas_height: tileset.out_height(),
    };
    finish_map(&doc, &map_path, options.encoding, printer, report)
}

/// External mode: resolve every map against one supplied tileset image.
fn convert_with_external(
    images: &[PathBuf],
    tileset_path: &Path,
    options: &ConvertOptions,
    printer: &Printer,
) -> Result<BatchSummary> {
    let tileset_image = match load(tileset_path, printer) {
        Ok(image) => image,
        Err(e) => return Ok(fail_all(images, &e, printer)),
    };
    let mut tileset = options.new_tileset();
    tileset.append(&tileset_image);
    let mut tileset_diagnostics = tileset.take_diagnostics();
    if let Some(slots) = tileset.take_scanned_grid() {
        if let Some(d) = check_slot_order(&slots) {
            tileset_diagnostics.push(d);
        }
    }

    printer.info(
        "Tileset",
        &format!(
            "{} with {}",
            display_path(tileset_path),
            plural(tileset.catalog().len(), "tile", "tiles")
        ),
    );

    let jobs = images
        .iter()
        .map(|image_path| {
            let mut report = JobReport::new(image_path);
            report.diagnostics.merge(tileset_diagnostics.clone());
            report.tileset = Some(tileset_path.to_path_buf());
            report.tiles = tileset.catalog().len();

            let result = load(image_path, printer).and_then(|image| {
                let grid = resolve(&tileset, &image, options.policy, &mut report)?;
                let map_path = options
                    .output_dir_for(image_path)
                    .join(format!("{}.tmx", file_stem(image_path)));
                let doc = MapDocument {
                    grid: &grid,
                    tile_width: tileset.tile_width(),
                    tile_height: tileset.tile_height(),
                    tileset_path: reference_path(&map_path, tileset_path),
                    atlas_width: tileset_image.width(),
                    atlas_height: tileset_image.height(),
                };
                finish_map(&doc, &map_path, options.encoding, printer, &mut report)
            });

            if let Err(e) = result {
                fail(printer, &mut report, e);
            }
            report
        })
        .collect();

    Ok(BatchSummary {
        jobs,
        common_tileset: None,
    })
}

/// Common mode: one tileset accumulated over every map.
///
/// Each map is appended and then resolved before the next is appended.
/// Documents are written once the shared atlas is final so they all carry
/// its real dimensions. The atlas goes to `atlas_dir`.
fn convert_with_common(
    images: &[PathBuf],
    options: &ConvertOptions,
    atlas_dir: &Path,
    printer: &Printer,
) -> Result<BatchSummary> {
    let mut tileset = options.new_tileset();
    let mut jobs = Vec::with_capacity(images.len());
    let mut grids: Vec<Option<TileGrid>> = Vec::with_capacity(images.len());

    for image_path in images {
        let mut report = JobReport::new(image_path);
        let result = load(image_path, printer).and_then(|image| {
            tileset.append(&image);
            tileset.take_scanned_grid();
            report.diagnostics.merge(tileset.take_diagnostics());
            resolve(&tileset, &image, options.policy, &mut report)
        });

        match result {
            Ok(grid) => grids.push(Some(grid)),
            Err(e) => {
                fail(printer, &mut report, e);
                grids.push(None);
            }
        }
        jobs.push(report);
    }

    let atlas_path = atlas_dir.join(COMMON_TILESET);

    let mut atlas_diagnostics = Diagnostics::new();
    let written = if tileset.is_ready() {
        write_atlas_if_any(&tileset, &atlas_path, printer, &mut atlas_diagnostics)?
    } else {
        false
    };

    for (report, grid) in jobs.iter_mut().zip(grids) {
        let Some(grid) = grid else {
            continue;
        };
        report.tiles = tileset.catalog().len();
        report.diagnostics.merge(atlas_diagnostics.clone());
        if written {
            report.tileset = Some(atlas_path.clone());
        }

        let map_path = options
            .output_dir_for(&report.input)
            .join(format!("{}.tmx", file_stem(&report.input)));
        let doc = MapDocument {
            grid: &grid,
            tile_width: tileset.tile_width(),
            tile_height: tileset.tile_height(),
            tileset_path: reference_path(&map_path, &atlas_path),
            atlas_width: tileset.out_width(),
            atlas_height: tileset.out_height(),
        };
        if let Err(e) = finish_map(&doc, &map_path, options.encoding, printer, report) {
            fail(printer, report, e);
        }
    }

    Ok(BatchSummary {
        jobs,
        common_tileset: written.then_some(atlas_path),
    })
}

fn load(path: &Path, printer: &Printer) -> Result<PixelBuffer> {
    printer.status("Loading", &display_path(path));
    let image = load_pixels(path)?;
    printer.verbose(
        "Decoded",
        &format!("{}x{} image", image.width(), image.height()),
    );
    Ok(image)
}

fn resolve(
    tileset: &TilesetBuilder,
    image: &PixelBuffer,
    policy: MissPolicy,
    report: &mut JobReport,
) -> Result<TileGrid> {
    let mut tilemap = TilemapBuilder::new(tileset, image).with_policy(policy);
    tilemap.resolve()?;
    report.diagnostics.merge(tilemap.take_diagnostics());
    tilemap.into_grid().ok_or_else(not_resolved)
}

/// Write the atlas unless the catalog is empty. Returns whether it was written.
fn write_atlas_if_any(
    tileset: &TilesetBuilder,
    path: &Path,
    printer: &Printer,
    diagnostics: &mut Diagnostics,
) -> Result<bool> {
    if tileset.catalog().is_empty() {
        diagnostics.push(
            Diagnostic::warning(EMPTY_ATLAS, "No whole tiles found; tileset image not written")
                .with_help("Check that the image is at least one tile wide and tall"),
        );
        return Ok(false);
    }

    let atlas = tileset.render_atlas()?;
    write_atlas(&atlas, path)?;
    printer.status(
        "Writing",
        &format!(
            "{}x{} tileset with {} to {}",
            tileset.out_width(),
            tileset.out_height(),
            plural(tileset.catalog().len(), "tile", "tiles"),
            display_path(path)
        ),
    );
    Ok(true)
}

fn finish_map(
    doc: &MapDocument<'_>,
    map_path: &Path,
    encoding: DataEncoding,
    printer: &Printer,
    report: &mut JobReport,
) -> Result<()> {
    report.grid = (doc.grid.width(), doc.grid.height());
    report.unresolved = doc.grid.unresolved();

    let xml = doc.encode(encoding)?;
    write_document(&xml, map_path)?;
    report.map = Some(map_path.to_path_buf());

    printer.status(
        "Writing",
        &format!(
            "{}x{} tilemap ({}) to {}",
            doc.grid.width(),
            doc.grid.height(),
            encoding,
            display_path(map_path)
        ),
    );
    Ok(())
}

fn fail(printer: &Printer, report: &mut JobReport, error: TmxError) {
    printer.error(
        "Failed",
        &format!("{}: {}", display_path(&report.input), error),
    );
    report.error = Some(error.to_string());
}

/// Record the same batch-wide failure on every job.
fn fail_all(images: &[PathBuf], error: &TmxError, printer: &Printer) -> BatchSummary {
    printer.error("Failed", &error.to_string());
    let jobs = images
        .iter()
        .map(|image| {
            let mut report = JobReport::new(image);
            report.error = Some(error.to_string());
            report
        })
        .collect();

    BatchSummary {
        jobs,
        common_tileset: None,
    }
}

/// Warn when a supplied tileset repeats a tile ahead of a later unique one.
///
/// Tiled draws ID `n` from slot `n - 1`, which only holds when the first
/// slots hold the unique tiles in first-seen order.
fn check_slot_order(slots: &TileGrid) -> Option<Diagnostic> {
    let unique = slots.ids().iter().copied().max().unwrap_or(0) as usize;
    let slot = slots
        .ids()
        .iter()
        .take(unique)
        .enumerate()
        .position(|(i, &id)| id as usize != i + 1)?;

    Some(
        Diagnostic::warning(
            TILESET_ORDER,
            format!(
                "Tileset slot {} repeats an earlier tile; maps will draw the wrong tiles past it",
                slot
            ),
        )
        .with_help("Place each distinct tile once, before any repeats or blank padding"),
    )
}

fn not_resolved() -> TmxError {
    TmxError::NotReady {
        message: "tilemap produced no grid".to_string(),
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("map")
        .to_string()
}

/// How a map document at `map_path` should refer to `atlas_path`.
///
/// Tiled resolves image sources against the map's own directory, so the
/// path is made relative to it and written with `/` separators.
fn reference_path(map_path: &Path, atlas_path: &Path) -> String {
    let map_dir = map_path.parent().unwrap_or_else(|| Path::new(""));
    match (absolute(map_dir), absolute(atlas_path)) {
        (Ok(from), Ok(to)) => {
            relative_path(&from, &to).unwrap_or_else(|| to.display().to_string())
        }
        _ => atlas_path.display().to_string(),
    }
}

/// `path` joined onto the working directory, with `.` and `..` folded away.
fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// `to` relative to the directory `from`. None when they share no root.
fn relative_path(from: &Path, to: &Path) -> Option<String> {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    if from.first() != to.first() {
        return None;
    }

    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let parts: Vec<String> = std::iter::repeat("..".to_string())
        .take(from.len() - common)
        .chain(
            to[common..]
                .iter()
                .map(|c| c.as_os_str().to_string_lossy().into_owned()),
        )
        .collect();
    Some(parts.join("/"))
}
