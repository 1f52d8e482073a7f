mod pages;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use find_simpage::online::Example;
use find_simpage::{ClusteringSession, EmbedMethod, HtmlEmbedder};
use regex::Regex;
use sparsevec::Dissimilarity;

#[derive(Parser, Debug)]
#[clap(
    name = "find-simpage-online",
    about = "A program to replay captured pages through the online clusterer."
)]
struct Args {
    /// Directory of page dumps, each of which is a file named after its numeric id.
    dump_dir: PathBuf,

    /// Embedding method of HTML documents, "bot" or "full_bot".
    #[clap(short = 'e', long, default_value = "full_bot")]
    embed: EmbedMethod,

    /// Dissimilarity measure, "cosine", "jaccard", "cosine_jaccard", or "cosine_inf".
    #[clap(short = 's', long, default_value = "jaccard")]
    sim: Dissimilarity,

    /// Largest dissimilarity for a page to join an existing cluster.
    #[clap(short = 'r', long)]
    size: f64,

    /// Regular expression selecting dump files by name.
    #[clap(short = 'f', long, default_value = r"^[0-9]+\.txt")]
    filter: Regex,

    /// Verbosity level (-v, -vv, -vvv).
    #[clap(short = 'v', long, parse(from_occurrences))]
    verbose: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    pages::init_logging(args.verbose);

    let embedder = HtmlEmbedder::new(args.embed);
    let mut session = ClusteringSession::new(args.embed, args.sim, args.size);

    for (id, path) in pages::list_dumps(&args.dump_dir, &args.filter)? {
        let dump = pages::read_dump(id, &path)?;
        if !dump.is_ok() {
            tracing::debug!(id, code = %dump.code, "skipped");
            continue;
        }
        let href = match dump.decode_href() {
            Ok(href) => href,
            Err(e) => {
                tracing::warn!(id, "skipped: {e}");
                continue;
            }
        };
        let vec = embedder.embed(&dump.body);
        if vec.is_empty() {
            tracing::debug!(id, "skipped an empty page");
            continue;
        }
        let example = Example {
            body: dump.body,
            path: href.path,
            query: href.query,
        };
        let cluster = session.add_embedded(vec, example);
        tracing::info!(id, cluster, "classified");
    }

    tracing::info!(
        pages = session.history().len(),
        clusters = session.clusters().len(),
        "Done"
    );

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, &session.export())?;
    writeln!(stdout)?;

    Ok(())
}
