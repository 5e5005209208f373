use miette::Diagnostic;
use thiserror::Error;

/// Main error type for tmx operations
#[derive(Error, Diagnostic, Debug)]
pub enum TmxError {
    #[error("IO error: {0}")]
    #[diagnostic(code(tmx::io))]
    IoError(#[from] std::io::Error),

    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(tmx::io))]
    Io {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Failed to decode {path}: {message}")]
    #[diagnostic(
        code(tmx::decode),
        help("Only formats supported by the image codec (PNG) can be converted")
    )]
    Decode {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Failed to write {path}: {message}")]
    #[diagnostic(code(tmx::write))]
    Write {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Tile at cell ({x}, {y}) not found in tileset ({count} unresolved cells)")]
    #[diagnostic(
        code(tmx::tile_not_found),
        help("The tileset image does not contain every tile used by the map image")
    )]
    TileNotFound { x: u32, y: u32, count: usize },

    #[error("Failed to {encoding}-compress tile data: {message}")]
    #[diagnostic(code(tmx::compression))]
    Compression { encoding: String, message: String },

    #[error("Invalid pixel buffer: {message}")]
    #[diagnostic(code(tmx::buffer))]
    InvalidBuffer { message: String },

    #[error("Not ready: {message}")]
    #[diagnostic(code(tmx::not_ready))]
    NotReady { message: String },

    #[error("{failed} of {total} conversions failed")]
    #[diagnostic(code(tmx::batch))]
    BatchFailed { failed: usize, total: usize },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(tmx::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },
}

pub type Result<T> = std::result::Result<T, TmxError>;
