use super::load_document;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use gridkit_parser::Serializer;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct FmtArgs {
    /// Grid file to format
    pub file: PathBuf,

    /// Rewrite the file in place instead of printing
    #[arg(short, long)]
    pub write: bool,

    /// Indentation width in spaces
    #[arg(long, default_value_t = 2)]
    pub indent: usize,
}

/// Canonical text of a document source (ids assigned)
pub fn format_source(path: &std::path::Path, indent: usize) -> Result<String> {
    let (_, doc) = load_document(path)?;
    Ok(Serializer::with_indent(&" ".repeat(indent)).serialize(&doc))
}

pub fn fmt(args: FmtArgs) -> Result<()> {
    let formatted = format_source(&args.file, args.indent)?;
    if args.write {
        fs::write(&args.file, &formatted)?;
        println!("{} {}", "✓".green(), args.file.display());
    } else {
        print!("{}", formatted);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.grid");
        fs::write(
            &path,
            r#"<mainGrid name="G"><content><row><cell component="A" title='x'/></row></content></mainGrid>"#,
        )
        .unwrap();

        let once = format_source(&path, 2).unwrap();
        fs::write(&path, &once).unwrap();
        let twice = format_source(&path, 2).unwrap();
        assert_eq!(once, twice);
        assert!(once.contains("component=\"A\""));
    }

    #[test]
    fn test_format_reports_malformed_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.grid");
        fs::write(&path, "<mainGrid name=\"G\"><content>").unwrap();
        assert!(format_source(&path, 2).is_err());
    }
}
