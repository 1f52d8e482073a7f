mod pages;

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use agglomerative::Linkage;
use anyhow::{Context, Result};
use clap::Parser;
use find_simpage::domtree::DomNode;
use find_simpage::dump::PageDump;
use find_simpage::report::{self, PageInfo, PageReport, VectorColumn};
use find_simpage::{EmbedMethod, HtmlEmbedder, ShapeReporter};
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use sparsevec::{Dissimilarity, SparseVector};

#[derive(Parser, Debug)]
#[clap(
    name = "find-simpage-hclust",
    about = "A program to cluster captured pages into a dendrogram of their shapes."
)]
struct Args {
    /// Directory of page dumps, each of which is a file named after its numeric id.
    dump_dir: PathBuf,

    /// Embedding method of HTML documents.
    /// "bot" counts tag names.
    /// "full_bot" counts the structural paths of leaf-most elements.
    #[clap(short = 'e', long, default_value = "full_bot")]
    embed: EmbedMethod,

    /// Linkage rule of hierarchical clustering, "single" or "average".
    #[clap(short = 'm', long, default_value = "single")]
    method: Linkage,

    /// Dissimilarity measure, "cosine", "jaccard", "cosine_jaccard", or "cosine_inf".
    #[clap(short = 's', long, default_value = "jaccard")]
    sim: Dissimilarity,

    /// Regular expression selecting dump files by name.
    #[clap(short = 'f', long, default_value = r"^[0-9]+\.txt")]
    filter: Regex,

    /// CSV path for dumping the normalized vectors.
    #[clap(long)]
    veccsv: Option<PathBuf>,

    /// CSV path for dumping the original (unnormalized) vectors.
    #[clap(long)]
    orig_veccsv: Option<PathBuf>,

    /// JSON path for the dendrogram. If None, it is printed to stdout.
    #[clap(long)]
    tree_json: Option<PathBuf>,

    /// JSON path for the deduplicated entries.
    #[clap(long)]
    nodes_json: Option<PathBuf>,

    /// JSON path for the pages with their element trees.
    #[clap(long)]
    pages_json: Option<PathBuf>,

    /// Disables parallel construction.
    #[clap(short = 'p', long)]
    disable_parallel: bool,

    /// Verbosity level (-v, -vv, -vvv).
    #[clap(short = 'v', long, parse(from_occurrences))]
    verbose: usize,
}

struct Capture {
    dump: PageDump,
    vec: SparseVector,
    domtree: Option<DomNode>,
}

fn capture(embedder: &HtmlEmbedder, id: u64, path: &Path) -> Result<Capture> {
    let dump = pages::read_dump(id, path)?;
    let (vec, domtree) = DomNode::extract(embedder, &dump.body);
    Ok(Capture { dump, vec, domtree })
}

fn main() -> Result<()> {
    let args = Args::parse();
    pages::init_logging(args.verbose);

    let reporter = ShapeReporter::new(args.embed, args.method, args.sim).shows_progress(true);
    let embedder = reporter.embedder();

    let dumps = pages::list_dumps(&args.dump_dir, &args.filter)?;
    tracing::info!(dumps = dumps.len(), "Embedding pages...");
    let start = Instant::now();
    let captures: Vec<Capture> = if args.disable_parallel {
        dumps
            .iter()
            .map(|(id, path)| capture(&embedder, *id, path))
            .collect::<Result<_>>()?
    } else {
        dumps
            .par_iter()
            .map(|(id, path)| capture(&embedder, *id, path))
            .collect::<Result<_>>()?
    };
    tracing::info!("Embedded in {} sec", start.elapsed().as_secs_f64());

    let mut tagset = BTreeSet::new();
    let mut pages = vec![];
    let mut page_reports = vec![];
    for Capture { dump, vec, domtree } in captures {
        tagset.extend(vec.keys().map(str::to_string));
        if vec.sum() == 0. || !dump.is_ok() {
            tracing::debug!(id = dump.id, code = %dump.code, "skipped");
            continue;
        }
        let href = match dump.decode_href() {
            Ok(href) => href,
            Err(e) => {
                tracing::warn!(id = dump.id, "skipped: {e}");
                continue;
            }
        };
        let info = PageInfo {
            id: dump.id,
            path: href.path,
            query: href.query,
        };
        if args.pages_json.is_some() {
            page_reports.push(PageReport {
                id: info.id,
                path: info.path.clone(),
                query: info.query.clone(),
                res_code: dump.code,
                domtree,
                rawres: dump.body,
            });
        }
        pages.push((info, vec));
    }

    let entries = report::undup(pages);
    tracing::info!(entries = entries.len(), "Deduplicated pages");

    if let Some(path) = &args.veccsv {
        let csv = report::vector_csv(&tagset, &entries, VectorColumn::Normalized);
        fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))?;
    }
    if let Some(path) = &args.orig_veccsv {
        let csv = report::vector_csv(&tagset, &entries, VectorColumn::Histogram);
        fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))?;
    }

    let start = Instant::now();
    let tree = if args.disable_parallel {
        reporter.report(&entries)?
    } else {
        reporter.report_in_parallel(&entries)?
    };
    tracing::info!("Clustered in {} sec", start.elapsed().as_secs_f64());

    match &args.tree_json {
        Some(path) => write_json(path, &tree)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer(&mut stdout, &tree)?;
            writeln!(stdout)?;
        }
    }
    if let Some(path) = &args.nodes_json {
        write_json(path, &entries)?;
    }
    if let Some(path) = &args.pages_json {
        write_json(path, &page_reports)?;
    }

    Ok(())
}

fn write_json<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
