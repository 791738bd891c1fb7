//! ASL compiler core CLI
//!
//! Thin demonstration driver: no lexing, no file-watching, no shell
//! completions. Those belong to the external toolchain this crate's `aslc`
//! binary is a stand-in for (§4.10).

use std::fs;
use std::path::PathBuf;
use std::process;

use aslc::ast::Program;
use aslc::CompilerConfig;
use clap::{Parser as ClapParser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "aslc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "ASL compiler core - check a JSON AST fixture", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the three semantic passes over a JSON-encoded AST and print the
    /// instruction listing, or the diagnostics if checking failed
    Check {
        /// Path to a JSON file deserializing to `aslc::ast::Program`
        ast: PathBuf,

        /// Path to a TOML `CompilerConfig` (defaults used if omitted)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { ast, config } => run_check(&ast, config.as_deref()),
    }
}

fn run_check(ast_path: &std::path::Path, config_path: Option<&std::path::Path>) {
    let ast_json = match fs::read_to_string(ast_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {}", ast_path.display(), e);
            process::exit(1);
        }
    };
    let program: Program = match serde_json::from_str(&ast_json) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error parsing {}: {}", ast_path.display(), e);
            process::exit(1);
        }
    };

    let config = match config_path {
        Some(path) => {
            let text = match fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Error reading {}: {}", path.display(), e);
                    process::exit(1);
                }
            };
            match CompilerConfig::from_toml(&text) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error parsing {}: {}", path.display(), e);
                    process::exit(1);
                }
            }
        }
        None => CompilerConfig::default(),
    };

    match aslc::compile(&program, &config) {
        Ok(listing) => println!("{listing}"),
        Err(diagnostics) => {
            for diagnostic in &diagnostics {
                eprintln!("{diagnostic}");
            }
            process::exit(1);
        }
    }
}
