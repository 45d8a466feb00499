//! Folio CLI
//!
//! Paginates a document described as JSON nodes and prints the paginated
//! HTML.
//!
//! - `folio book.json` - paginate every `.page` section, HTML to stdout
//! - `folio -o out.html --config print.json book.json`

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use folio_common::timing::format_duration;
use folio_common::warning::clear_warnings;
use folio_dom::{DomTree, NodeId, to_html};
use folio_paginate::{
    BlockFlow, DocumentSummary, Host, InlineStyles, PaginateOptions, SimulatedResources,
    TargetSummary, compute_targets, paginate_all,
};
use owo_colors::OwoColorize;

/// Folio - paginate flowing HTML content into fixed-aspect-ratio pages
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Paginate a document, printing HTML to stdout
    folio book.json

    # Options from a file, with a flag override
    folio --config print.json --aspect-ratio 0.7071 book.json

    # Inline document
    folio --json '{"tag":"div","attrs":{"class":"page"},"children":[{"text":"Hi"}]}'

    # Mark leftover space and show fitter decisions
    RUST_LOG=folio_paginate=debug folio --verbose book.json
"#)]
struct Cli {
    /// Path to a JSON document
    #[arg(value_name = "FILE")]
    path: Option<PathBuf>,

    /// Read the JSON document from this string instead of a file
    #[arg(long, value_name = "JSON")]
    json: Option<String>,

    /// Pagination options as JSON; flags below override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the paginated HTML here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Width of the page container in pixels (default: 816, US Letter at 96dpi)
    #[arg(long, default_value = "816")]
    width: f32,

    /// Characters per line of wrapped text
    #[arg(long, default_value = "60")]
    chars_per_line: usize,

    /// Page width divided by page height
    #[arg(long)]
    aspect_ratio: Option<f32>,

    /// Selector of the sections to paginate
    #[arg(long, value_name = "SELECTOR")]
    section: Option<String>,

    /// Stop each section after this many pages
    #[arg(long)]
    max_pages: Option<usize>,

    /// Do not repeat open headings at the top of continued pages
    #[arg(long)]
    no_running_headers: bool,

    /// Insert placeholders showing the space left on each page
    #[arg(short, long)]
    verbose: bool,

    /// Print the effective options as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    clear_warnings();

    let options = load_options(&cli)?;
    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }

    let mut tree = load_tree(&cli)?;
    log::info!("loaded {} nodes", tree.len());

    let styles = InlineStyles::new();
    let layout = BlockFlow::new(cli.width).with_chars_per_line(cli.chars_per_line);
    let mut resources = SimulatedResources::new();
    let host = Host::new(&styles, &layout, &mut resources);

    let summary = paginate_all(&mut tree, NodeId::ROOT, &options, host)?;
    let targets = compute_targets(&mut tree, NodeId::ROOT)?;

    let html = to_html(&tree, NodeId::ROOT);
    match &cli.output {
        Some(path) => {
            fs::write(path, &html).with_context(|| format!("writing {}", path.display()))?;
        }
        None => println!("{html}"),
    }

    print_summary(&tree, &summary, &targets, cli.output.as_deref());
    Ok(())
}

/// Options from `--config`, then the flag overrides.
fn load_options(cli: &Cli) -> anyhow::Result<PaginateOptions> {
    let mut options = match &cli.config {
        Some(path) => {
            let source = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&source).with_context(|| format!("parsing options in {}", path.display()))?
        }
        None => PaginateOptions::default(),
    };

    if let Some(aspect_ratio) = cli.aspect_ratio {
        options.aspect_ratio = aspect_ratio;
    }
    if let Some(section) = &cli.section {
        options.section_selector.clone_from(section);
    }
    if let Some(max_pages) = cli.max_pages {
        options.max_pages = max_pages;
    }
    if cli.no_running_headers {
        options.running_headers = false;
    }
    if cli.verbose {
        options.verbose = true;
    }
    options.validate()?;
    Ok(options)
}

/// Load the document from `--json` or the file argument
fn load_tree(cli: &Cli) -> anyhow::Result<DomTree> {
    if let Some(ref json) = cli.json {
        Ok(DomTree::from_json(json)?)
    } else if let Some(ref path) = cli.path {
        let source = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        DomTree::from_json(&source).with_context(|| format!("loading {}", path.display()))
    } else {
        anyhow::bail!("a document is required: pass a file path or --json")
    }
}

fn print_summary(tree: &DomTree, summary: &DocumentSummary, targets: &TargetSummary, output: Option<&Path>) {
    eprintln!(
        "{} {} section(s) into {} page(s) in {}",
        "Paginated".green().bold(),
        summary.sections.len(),
        summary.pages,
        format_duration(summary.elapsed)
    );
    for (index, section) in summary.sections.iter().enumerate() {
        let label = tree
            .attr(section.section, "id")
            .map_or_else(|| format!("node {}", section.section.0), |id| format!("#{id}"));
        let last = section.first_page + section.pages.saturating_sub(1);
        eprintln!(
            "{}",
            format!(
                "  section {} ({label}): pages {}-{last}, {}",
                index + 1,
                section.first_page,
                format_duration(section.elapsed)
            )
            .dimmed()
        );
    }
    if targets.links > 0 {
        eprintln!(
            "{}",
            format!("  {} of {} link(s) resolved to a page", targets.resolved, targets.links).dimmed()
        );
    }

    let diagnostics: Vec<_> = summary.diagnostics().collect();
    if !diagnostics.is_empty() {
        eprintln!("\n{}", "=== Diagnostics ===".yellow().bold());
        for diagnostic in diagnostics {
            eprintln!("  {} {diagnostic}", "!".yellow());
        }
    }
    if let Some(path) = output {
        eprintln!("Output written to: {}", path.display());
    }
}
