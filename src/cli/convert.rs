//! Convert command implementation.
//!
//! Turns map images into Tiled maps plus deduplicated tileset images.

use std::path::PathBuf;

use clap::Args;

use crate::config::Config;
use crate::convert::{convert_batch, BatchSummary, ConvertOptions};
use crate::diagnostic::{Severity, TILE_NOT_FOUND, UNKNOWN_ENCODING};
use crate::discovery::discover_images;
use crate::document::DataEncoding;
use crate::error::{Result, TmxError};
use crate::output::{display_path, plural, Printer};
use crate::tilemap::MissPolicy;
use crate::tileset::DEFAULT_TILE_SIZE;

/// Format used when neither the command line nor the config names one.
const DEFAULT_FORMAT: &str = "gzip";

/// Convert map images to .tmx tilemaps
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// [TILE_WIDTH] [TILE_HEIGHT] followed by map images or directories.
    /// A single size means square tiles. With --size every value is an input.
    #[arg(required = true, value_name = "[TILE_WIDTH] [TILE_HEIGHT] INPUTS")]
    pub args: Vec<String>,

    /// Tile size as WxH (e.g. 16x16), instead of leading size arguments
    #[arg(long)]
    pub size: Option<String>,

    /// Tile data format: base64, gzip, zlib or csv
    #[arg(long, short)]
    pub format: Option<String>,

    /// Output directory for maps and tilesets (default: next to each image)
    #[arg(long = "output-dir", short)]
    pub output: Option<PathBuf>,

    /// Tileset image to use instead of building one from each map
    #[arg(long, short = 's')]
    pub tileset: Option<PathBuf>,

    /// Build a single tileset shared by every converted map
    #[arg(long = "common-tileset", short)]
    pub common_tileset: bool,

    /// Do not round the tileset size up to a power of two
    #[arg(long)]
    pub no_pot: bool,

    /// Fail a map when one of its tiles is missing from the tileset
    #[arg(long)]
    pub strict: bool,

    /// Print a JSON summary to stdout
    #[arg(long)]
    pub json: bool,

    /// Config file (default: ./img2tmx.yaml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Leading numeric arguments are tile dimensions; the rest are inputs.
fn split_positionals(args: &[String]) -> (Option<u32>, Option<u32>, Vec<PathBuf>) {
    let mut sizes = Vec::new();
    let mut rest = args.iter().peekable();

    while sizes.len() < 2 {
        match rest.peek().and_then(|a| a.parse::<u32>().ok()) {
            Some(n) => {
                sizes.push(n);
                rest.next();
            }
            None => break,
        }
    }

    let inputs = rest.map(PathBuf::from).collect();
    (sizes.first().copied(), sizes.get(1).copied(), inputs)
}

/// Parse a "WxH" tile size, or a single number for square tiles.
fn parse_dimensions(s: &str) -> Result<(u32, u32)> {
    let parts: Vec<&str> = s.splitn(2, |c| c == 'x' || c == 'X').collect();
    let parse = |part: &str| {
        part.trim().parse::<u32>().map_err(|_| TmxError::Config {
            message: format!("Invalid tile size '{}'", s),
            help: Some("Use the format WxH, for example: 16x16, 8x16".to_string()),
        })
    };

    let w = parse(parts[0])?;
    let h = match parts.get(1) {
        Some(part) => parse(part)?,
        None => w,
    };
    Ok((w, h))
}

/// Merge command-line flags over config values over built-in defaults.
fn resolve_options(
    args: &ConvertArgs,
    config: &Config,
    printer: &Printer,
) -> Result<(ConvertOptions, Vec<PathBuf>)> {
    let (width, height, inputs) = match &args.size {
        Some(size) => {
            let (w, h) = parse_dimensions(size)?;
            let inputs = args.args.iter().map(PathBuf::from).collect();
            (Some(w), Some(h), inputs)
        }
        None => split_positionals(&args.args),
    };

    let tile_width = width.or(config.tile_width).unwrap_or(DEFAULT_TILE_SIZE);
    let tile_height = height
        .or(width)
        .or(config.tile_height)
        .unwrap_or(tile_width);

    if tile_width == 0 || tile_height == 0 {
        return Err(TmxError::Config {
            message: format!("Tile size must be non-zero, got {}x{}", tile_width, tile_height),
            help: Some("Both tile width and height must be at least 1".to_string()),
        });
    }

    if inputs.is_empty() {
        return Err(TmxError::Config {
            message: "No map images given".to_string(),
            help: Some("Usage: img2tmx convert [TILE_WIDTH] [TILE_HEIGHT] <IMAGES>...".to_string()),
        });
    }

    if args.tileset.is_some() && args.common_tileset {
        printer.warning("Warning", "--tileset given; ignoring --common-tileset");
    }

    let format = args
        .format
        .as_deref()
        .or(config.format.as_deref())
        .unwrap_or(DEFAULT_FORMAT);
    let encoding = match format.parse::<DataEncoding>() {
        Ok(encoding) => encoding,
        Err(_) => {
            printer.warning(
                "Warning",
                &format!("[{}] unknown format '{}', using base64", UNKNOWN_ENCODING, format),
            );
            DataEncoding::from_name_or_default(format)
        }
    };

    let strict = args.strict || config.strict.unwrap_or(false);
    let options = ConvertOptions {
        tile_width,
        tile_height,
        encoding,
        output_dir: args.output.clone().or_else(|| config.output.clone()),
        external_tileset: args.tileset.clone(),
        common_tileset: args.common_tileset || config.common_tileset.unwrap_or(false),
        power_of_two: !args.no_pot && config.power_of_two.unwrap_or(true),
        policy: if strict {
            MissPolicy::Strict
        } else {
            MissPolicy::Lenient
        },
    };

    Ok((options, inputs))
}

pub fn run(args: ConvertArgs, printer: &Printer) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config = Config::discover(args.config.as_deref(), &cwd)?;
    let (options, inputs) = resolve_options(&args, &config, printer)?;

    let images = discover_images(&inputs, &config)?;
    if images.is_empty() {
        return Err(TmxError::Config {
            message: "No .png images found in the given inputs".to_string(),
            help: None,
        });
    }

    let summary = convert_batch(&images, &options, printer)?;
    report(&summary, printer);

    if args.json {
        let json = serde_json::to_string_pretty(&summary).map_err(|e| TmxError::Config {
            message: format!("Failed to serialize summary: {}", e),
            help: None,
        })?;
        println!("{}", json);
    }

    let failed = summary.failed();
    if failed > 0 {
        return Err(TmxError::BatchFailed {
            failed,
            total: summary.jobs.len(),
        });
    }
    Ok(())
}

/// Print per-job diagnostics and the closing summary line.
fn report(summary: &BatchSummary, printer: &Printer) {
    for job in &summary.jobs {
        let display = display_path(&job.input);
        for d in job.diagnostics.iter() {
            let line = format!("{}: {}", display, d);
            match d.severity {
                Severity::Error => printer.error("Error", &line),
                Severity::Warning => printer.warning("Warning", &line),
            }
            if let Some(help) = &d.help {
                printer.verbose("Help", help);
            }
        }

        let missing = job.diagnostics.count_code(TILE_NOT_FOUND);
        if missing > 0 {
            printer.warning(
                "Unresolved",
                &format!(
                    "{} in {} left empty",
                    plural(missing, "cell", "cells"),
                    display
                ),
            );
        }
    }

    if let Some(path) = &summary.common_tileset {
        printer.info("Tileset", &format!("common tileset at {}", display_path(path)));
    }

    let total = summary.jobs.len();
    let failed = summary.failed();
    if failed > 0 {
        printer.error(
            "Finished",
            &format!("{} ({} failed)", plural(total, "map", "maps"), failed),
        );
    } else {
        printer.success("Finished", &plural(total, "map", "maps"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn convert_args(args: &[&str]) -> ConvertArgs {
        ConvertArgs {
            args: strings(args),
            size: None,
            format: None,
            output: None,
            tileset: None,
            common_tileset: false,
            no_pot: false,
            strict: false,
            json: false,
            config: None,
        }
    }

    fn quiet() -> Printer {
        Printer::new().with_quiet(true)
    }

    #[test]
    fn test_split_square_size() {
        let (w, h, inputs) = split_positionals(&strings(&["16", "map.png"]));
        assert_eq!((w, h), (Some(16), None));
        assert_eq!(inputs, vec![PathBuf::from("map.png")]);
    }

    #[test]
    fn test_split_width_and_height() {
        let (w, h, inputs) = split_positionals(&strings(&["16", "32", "a.png", "b.png"]));
        assert_eq!((w, h), (Some(16), Some(32)));
        assert_eq!(inputs.len(), 2);
    }

    #[test]
    fn test_split_no_size() {
        let (w, h, inputs) = split_positionals(&strings(&["maps/"]));
        assert_eq!((w, h), (None, None));
        assert_eq!(inputs, vec![PathBuf::from("maps/")]);
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("16x16").unwrap(), (16, 16));
        assert_eq!(parse_dimensions("8X16").unwrap(), (8, 16));
        assert_eq!(parse_dimensions("24").unwrap(), (24, 24));
        assert!(parse_dimensions("axb").is_err());
        assert!(parse_dimensions("16x").is_err());
    }

    #[test]
    fn test_size_flag_makes_numbers_inputs() {
        let mut args = convert_args(&["2024", "maps/"]);
        args.size = Some("8x16".to_string());
        let (options, inputs) = resolve_options(&args, &Config::default(), &quiet()).unwrap();
        assert_eq!((options.tile_width, options.tile_height), (8, 16));
        assert_eq!(inputs, vec![PathBuf::from("2024"), PathBuf::from("maps/")]);
    }

    #[test]
    fn test_zero_size_flag_rejected() {
        let mut args = convert_args(&["a.png"]);
        args.size = Some("0x16".to_string());
        let result = resolve_options(&args, &Config::default(), &quiet());
        assert!(matches!(result, Err(TmxError::Config { .. })));
    }

    #[test]
    fn test_resolve_defaults() {
        let (options, _) =
            resolve_options(&convert_args(&["a.png"]), &Config::default(), &quiet()).unwrap();
        assert_eq!((options.tile_width, options.tile_height), (16, 16));
        assert_eq!(options.encoding, DataEncoding::Gzip);
        assert!(options.power_of_two);
        assert_eq!(options.policy, MissPolicy::Lenient);
    }

    #[test]
    fn test_square_size_from_single_arg() {
        let args = convert_args(&["8", "a.png"]);
        let (options, _) = resolve_options(&args, &Config::default(), &quiet()).unwrap();
        assert_eq!((options.tile_width, options.tile_height), (8, 8));
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config {
            tile_width: Some(32),
            tile_height: Some(16),
            format: Some("zlib".to_string()),
            strict: Some(true),
            power_of_two: Some(false),
            ..Default::default()
        };

        let (from_config, _) =
            resolve_options(&convert_args(&["a.png"]), &config, &quiet()).unwrap();
        assert_eq!((from_config.tile_width, from_config.tile_height), (32, 16));
        assert_eq!(from_config.encoding, DataEncoding::Zlib);
        assert_eq!(from_config.policy, MissPolicy::Strict);
        assert!(!from_config.power_of_two);

        let mut args = convert_args(&["8", "a.png"]);
        args.format = Some("csv".to_string());
        let (from_flags, _) = resolve_options(&args, &config, &quiet()).unwrap();
        assert_eq!((from_flags.tile_width, from_flags.tile_height), (8, 8));
        assert_eq!(from_flags.encoding, DataEncoding::Csv);
    }

    #[test]
    fn test_unknown_format_falls_back_to_base64() {
        let mut args = convert_args(&["a.png"]);
        args.format = Some("lz4".to_string());
        let (options, _) = resolve_options(&args, &Config::default(), &quiet()).unwrap();
        assert_eq!(options.encoding, DataEncoding::Base64);
    }

    #[test]
    fn test_zero_tile_size_rejected() {
        let result = resolve_options(&convert_args(&["0", "a.png"]), &Config::default(), &quiet());
        assert!(matches!(result, Err(TmxError::Config { .. })));
    }

    #[test]
    fn test_missing_inputs_rejected() {
        let result = resolve_options(&convert_args(&["16", "16"]), &Config::default(), &quiet());
        assert!(matches!(result, Err(TmxError::Config { .. })));
    }
}
