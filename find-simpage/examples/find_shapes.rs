use find_simpage::report::{undup, PageInfo};
use find_simpage::ShapeReporter;

fn main() {
    let pages = vec![
        ("/item?id=1", "<html><body><h1>Book</h1><p>Curry</p></body></html>"),
        ("/item?id=2", "<html><body><h1>Tea</h1><p>Books</p></body></html>"),
        ("/login", r#"<html><body><form action="/login"><input name="user"></form></body></html>"#),
        ("/search?q=x", r#"<html><body><form action="/search"><input name="q"></form></body></html>"#),
    ];

    // Creates a reporter embedding full paths of leaf elements,
    // merging clusters with the average linkage in the Cosine distance.
    let reporter = ShapeReporter::from_names("full_bot", "average", "cosine").unwrap();
    let embedder = reporter.embedder();

    // Embeds the pages and groups the identical shapes.
    let entries = undup(pages.iter().enumerate().map(|(id, (href, html))| {
        let href = find_simpage::href::decode(href).unwrap();
        let info = PageInfo {
            id: id as u64,
            path: href.path,
            query: href.query,
        };
        (info, embedder.embed(html))
    }));
    // The two item pages share a shape.
    assert_eq!(entries.len(), 3);

    // Builds the dendrogram of the shapes.
    let report = reporter.report(&entries).unwrap();
    let root = report.root.unwrap();
    assert_eq!(root.leaves().len(), 3);
    println!("{root:?}");
}
