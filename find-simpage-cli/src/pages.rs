//! Helpers shared by the binaries to read capture directories.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use find_simpage::dump::PageDump;
use regex::Regex;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the logger on stderr, where `-v` raises the level and `RUST_LOG` is honored otherwise.
pub fn init_logging(verbose: usize) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Lists the dump files in `dir` whose names match `filter`, ordered by their numeric ids.
pub fn list_dumps(dir: &Path, filter: &Regex) -> Result<Vec<(u64, PathBuf)>> {
    let mut dumps = vec![];
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let name = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if filter.is_match(name) {
            dumps.push((leading_number(name), path));
        }
    }
    dumps.sort();
    Ok(dumps)
}

/// Reads a dump file.
pub fn read_dump(id: u64, path: &Path) -> Result<PageDump> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    PageDump::parse(id, &text).with_context(|| format!("malformed dump {}", path.display()))
}

/// Parses the leading digits of `name`, or zero without any.
fn leading_number(name: &str) -> u64 {
    let end = name
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(name.len());
    name[..end].parse().unwrap_or(0)
}
