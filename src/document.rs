//! Tiled map document encoder.
//!
//! Serializes a `TileGrid` into a single-layer orthogonal TMX document. The
//! layer data is either base64 (optionally gzip or zlib compressed) over the
//! 4-byte little-endian index buffer, or CSV.

use std::fmt::{self, Write as _};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TmxError};
use crate::tilemap::TileGrid;

/// Layer data encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataEncoding {
    /// Uncompressed base64.
    #[default]
    Base64,
    /// gzip, then base64.
    Gzip,
    /// zlib (deflate), then base64.
    Zlib,
    /// Comma-separated decimal IDs.
    Csv,
}

impl DataEncoding {
    pub const ALL: [DataEncoding; 4] = [
        DataEncoding::Base64,
        DataEncoding::Gzip,
        DataEncoding::Zlib,
        DataEncoding::Csv,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DataEncoding::Base64 => "base64",
            DataEncoding::Gzip => "gzip",
            DataEncoding::Zlib => "zlib",
            DataEncoding::Csv => "csv",
        }
    }

    /// Value of the `encoding` attribute on `<data>`.
    pub fn encoding_attr(self) -> &'static str {
        match self {
            DataEncoding::Csv => "csv",
            _ => "base64",
        }
    }

    /// Value of the `compression` attribute on `<data>`, if any.
    pub fn compression_attr(self) -> Option<&'static str> {
        match self {
            DataEncoding::Gzip => Some("gzip"),
            DataEncoding::Zlib => Some("zlib"),
            _ => None,
        }
    }

    /// Parse an encoding name, falling back to uncompressed base64 for
    /// anything unrecognized.
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl fmt::Display for DataEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataEncoding {
    type Err = TmxError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        DataEncoding::ALL
            .into_iter()
            .find(|e| e.name() == lower)
            .ok_or_else(|| TmxError::Config {
                message: format!("Unknown data encoding '{}'", s),
                help: Some("Use one of: base64, gzip, zlib, csv".to_string()),
            })
    }
}

/// Everything needed to write one map document.
#[derive(Debug, Clone)]
pub struct MapDocument<'a> {
    pub grid: &'a TileGrid,
    pub tile_width: u32,
    pub tile_height: u32,
    /// Atlas image path as referenced from the document.
    pub tileset_path: String,
    pub atlas_width: u32,
    pub atlas_height: u32,
}

impl MapDocument<'_> {
    /// Render the full XML text.
    pub fn encode(&self, encoding: DataEncoding) -> Result<String> {
        let payload = encode_payload(self.grid, encoding)?;
        let name = escape_attr(&self.tileset_path);
        let (gw, gh) = (self.grid.width(), self.grid.height());
        let (tw, th) = (self.tile_width, self.tile_height);

        let compression = encoding
            .compression_attr()
            .map(|c| format!(" compression=\"{}\"", c))
            .unwrap_or_default();

        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            xml,
            "<map version=\"1.0\" orientation=\"orthogonal\" width=\"{gw}\" height=\"{gh}\" tilewidth=\"{tw}\" tileheight=\"{th}\">"
        );
        let _ = writeln!(
            xml,
            "   <tileset firstgid=\"1\" name=\"{name}\" tilewidth=\"{tw}\" tileheight=\"{th}\">"
        );
        let _ = writeln!(
            xml,
            "       <image source=\"{name}\" width=\"{}\" height=\"{}\"/>",
            self.atlas_width, self.atlas_height
        );
        xml.push_str("   </tileset>\n");
        let _ = writeln!(xml, "   <layer name=\"{name}\" width=\"{gw}\" height=\"{gh}\">");
        let _ = writeln!(
            xml,
            "       <data encoding=\"{}\"{}>",
            encoding.encoding_attr(),
            compression
        );
        let _ = writeln!(xml, "           {payload}");
        xml.push_str("       </data>\n");
        xml.push_str("   </layer>\n");
        xml.push_str("</map>\n");

        Ok(xml)
    }
}

/// Encode the grid's index buffer as `<data>` element text.
pub fn encode_payload(grid: &TileGrid, encoding: DataEncoding) -> Result<String> {
    match encoding {
        DataEncoding::Csv => Ok(encode_csv(grid)),
        DataEncoding::Base64 => Ok(STANDARD.encode(grid.to_le_bytes())),
        DataEncoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            let bytes = compress(&mut encoder, &grid.to_le_bytes(), encoding)
                .and_then(|_| encoder.finish().map_err(|e| compression_error(encoding, e)))?;
            Ok(STANDARD.encode(bytes))
        }
        DataEncoding::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            let bytes = compress(&mut encoder, &grid.to_le_bytes(), encoding)
                .and_then(|_| encoder.finish().map_err(|e| compression_error(encoding, e)))?;
            Ok(STANDARD.encode(bytes))
        }
    }
}

/// Decode `<data>` element text back into a grid of the given size.
pub fn decode_payload(
    payload: &str,
    encoding: DataEncoding,
    width: u32,
    height: u32,
) -> Result<TileGrid> {
    if encoding == DataEncoding::Csv {
        return decode_csv(payload, width, height);
    }

    let packed = STANDARD
        .decode(payload.trim())
        .map_err(|e| TmxError::InvalidBuffer {
            message: format!("invalid base64 tile data: {}", e),
        })?;

    let bytes = match encoding {
        DataEncoding::Gzip => inflate(GzDecoder::new(packed.as_slice()))?,
        DataEncoding::Zlib => inflate(ZlibDecoder::new(packed.as_slice()))?,
        _ => packed,
    };

    TileGrid::from_le_bytes(width, height, &bytes)
}

/// Write document text to disk.
pub fn write_document(xml: &str, path: &Path) -> Result<()> {
    fs::write(path, xml).map_err(|e| TmxError::Write {
        path: path.to_path_buf(),
        message: format!("Failed to write map document: {}", e),
    })
}

fn encode_csv(grid: &TileGrid) -> String {
    grid.rows()
        .map(|row| {
            row.iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join(",\n")
}

fn decode_csv(payload: &str, width: u32, height: u32) -> Result<TileGrid> {
    let ids = payload
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>().map_err(|_| TmxError::InvalidBuffer {
                message: format!("invalid CSV tile ID '{}'", s),
            })
        })
        .collect::<Result<Vec<u32>>>()?;

    let expected = width as usize * height as usize;
    if ids.len() != expected {
        return Err(TmxError::InvalidBuffer {
            message: format!("expected {} CSV tile IDs, got {}", expected, ids.len()),
        });
    }
    Ok(TileGrid::new(width, height, ids))
}

fn compress<W: Write>(encoder: &mut W, bytes: &[u8], encoding: DataEncoding) -> Result<()> {
    encoder
        .write_all(bytes)
        .map_err(|e| compression_error(encoding, e))
}

fn compression_error(encoding: DataEncoding, e: std::io::Error) -> TmxError {
    TmxError::Compression {
        encoding: encoding.name().to_string(),
        message: e.to_string(),
    }
}

fn inflate<R: Read>(mut decoder: R) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| TmxError::InvalidBuffer {
            message: format!("corrupt compressed tile data: {}", e),
        })?;
    Ok(out)
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
