//! OrthoNet CLI for `.onet.json` documents.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use orthonet_check::{check_graph, has_errors, Violation};
use orthonet_io::SchematicDocument;

#[derive(Parser)]
#[command(name = "orthonet")]
#[command(about = "Orthogonal wire graph tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print graph size and the net list
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Run integrity checks
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Normalize before checking
        #[arg(long)]
        normalize: bool,
    },

    /// Normalize every wire and write the result
    Normalize {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Where to write; defaults to overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for CI
    Json,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Info { file } => handle_info(&file),
        Commands::Check {
            file,
            format,
            normalize,
        } => handle_check(&file, format, normalize),
        Commands::Normalize { file, output } => {
            let target = output.unwrap_or_else(|| file.clone());
            handle_normalize(&file, &target)
        }
    };

    process::exit(exit_code);
}

fn handle_info(file: &Path) -> i32 {
    let doc = match SchematicDocument::load(file) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    let engine = match doc.open_engine() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let state = engine.state();
    println!("{}", doc.meta.name);
    println!(
        "  {} vertices, {} edges, {} owners placed",
        state.vertex_count(),
        state.edge_count(),
        doc.placements.len()
    );
    for net in engine.nets_summary() {
        println!(
            "  {:<16} {:>5} vertices {:>5} edges  {}",
            net.name, net.vertex_count, net.edge_count, net.net
        );
    }
    0
}

fn handle_check(file: &Path, format: OutputFormat, normalize: bool) -> i32 {
    let doc = match SchematicDocument::load(file) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    let mut engine = match doc.open_engine() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    if normalize {
        if let Err(e) = engine.normalize_all() {
            eprintln!("Error: {e}");
            return 1;
        }
    }

    let violations = check_graph(engine.state(), &engine.config().geometry);
    match format {
        OutputFormat::Human => output_human(&violations),
        OutputFormat::Json => match serde_json::to_string_pretty(&violations) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                return 1;
            }
        },
    }
    if has_errors(&violations) {
        1
    } else {
        0
    }
}

fn output_human(violations: &[Violation]) {
    if violations.is_empty() {
        println!("No violations.");
        return;
    }
    for v in violations {
        println!("[{:?}] {:?}: {}", v.severity, v.violation_type, v.message);
    }
    println!("{} violations", violations.len());
}

fn handle_normalize(file: &Path, target: &Path) -> i32 {
    let mut doc = match SchematicDocument::load(file) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    let mut engine = match doc.open_engine() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    let changes = match engine.normalize_all() {
        Ok(changes) => changes,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    doc.capture(&engine);
    if let Err(e) = doc.save(target) {
        eprintln!("Error: {e}");
        return 1;
    }
    println!(
        "Removed {} vertices, {} edges; wrote {}",
        changes.deleted_vertices.len(),
        changes.deleted_edges.len(),
        target.display()
    );
    0
}
