use super::{load_document, GRID_EXTENSION};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use gridkit_parser::GridDocument;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Grid file, or directory to search for .grid files
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

/// Node counts of a document
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub grids: usize,
    pub rows: usize,
    pub modules: usize,
    pub placeholders: usize,
}

impl Summary {
    pub fn of(doc: &GridDocument) -> Self {
        let mut summary = Summary::default();
        for node in doc.root.descendants() {
            if node.is_grid() {
                summary.grids += 1;
            } else if node.is_row() {
                summary.rows += 1;
            } else if node.is_module_cell() {
                summary.modules += 1;
            } else if node.is_placeholder_cell() {
                summary.placeholders += 1;
            }
        }
        summary
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} grids, {} rows, {} modules, {} placeholders",
            self.grids, self.rows, self.modules, self.placeholders
        )
    }
}

pub fn check(args: CheckArgs) -> Result<()> {
    let files = find_grid_files(&args.path)?;
    if files.is_empty() {
        println!("{}", "⚠️  No .grid files found".yellow());
        return Ok(());
    }

    let mut error_count = 0;
    for file in &files {
        match load_document(file) {
            Ok((_, doc)) => {
                println!(
                    "  {} {} ({}): {}",
                    "✓".green(),
                    file.display(),
                    doc.name.bold(),
                    Summary::of(&doc)
                );
            }
            Err(e) => {
                error_count += 1;
                eprintln!("  {} {} {}", "✗".red(), file.display(), e);
            }
        }
    }

    println!();
    if error_count == 0 {
        println!("{} Checked {} files", "✅".green(), files.len());
        Ok(())
    } else {
        Err(anyhow!("{} of {} files are malformed", error_count, files.len()))
    }
}

pub fn find_grid_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.exists() {
        return Err(anyhow!("Path does not exist: {}", path.display()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some(GRID_EXTENSION))
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridkit_parser::parse;

    #[test]
    fn test_summary_counts() {
        let doc = parse(
            r#"<mainGrid name="G"><content>
                 <row><cell component="A"/><cell type="placeholder"/></row>
                 <resizer/>
                 <row><cell type="grid"><grid><content><row><cell component="B"/></row></content></grid></cell></row>
               </content></mainGrid>"#,
        )
        .unwrap();
        assert_eq!(
            Summary::of(&doc),
            Summary {
                grids: 2,
                rows: 3,
                modules: 2,
                placeholders: 1
            }
        );
    }

    #[test]
    fn test_find_grid_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.grid"), "").unwrap();
        std::fs::write(dir.path().join("a.grid"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = find_grid_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.grid", "b.grid"]);

        assert!(find_grid_files(&dir.path().join("missing")).is_err());
    }
}
