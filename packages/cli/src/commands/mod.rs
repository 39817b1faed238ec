pub mod check;
pub mod fmt;
pub mod replay;

pub use check::{check, CheckArgs};
pub use fmt::{fmt, FmtArgs};
pub use replay::{replay, ReplayArgs};

use anyhow::{anyhow, Result};
use gridkit_parser::{format_error, parse, GridDocument};
use std::fs;
use std::path::Path;

/// File extension of structural grid documents
pub const GRID_EXTENSION: &str = "grid";

/// Read and parse a grid document, rendering parse failures with their
/// source location
pub fn load_document(path: &Path) -> Result<(String, GridDocument)> {
    let source = fs::read_to_string(path)
        .map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))?;
    let document = parse(&source).map_err(|e| {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");
        anyhow!("\n{}", format_error(&source, file_name, &e))
    })?;
    Ok((source, document))
}
