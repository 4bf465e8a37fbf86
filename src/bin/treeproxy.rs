//! treeproxy CLI: inspect adapters over JSON resource trees.
//!
//! Usage:
//!   treeproxy inspect --tree tree.json --interfaces decl.yaml --interface Page --path /content/page
//!   treeproxy validate --interfaces decl.yaml

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;
use treeproxy::adapter::classify;
use treeproxy::{AdapterFactory, EngineConfig, InterfaceRegistry, MemoryTree, ResourceTree};

#[derive(Parser)]
#[command(
    name = "treeproxy",
    version,
    about = "Typed declarative adapters over resource trees"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an adapter and print its string form and identity hash
    Inspect {
        /// JSON file holding the resource tree
        #[arg(long)]
        tree: PathBuf,
        /// YAML interface declarations
        #[arg(long)]
        interfaces: PathBuf,
        /// Interface to adapt to
        #[arg(long)]
        interface: String,
        /// Absolute path of the backing resource
        #[arg(long)]
        path: String,
        /// Engine configuration (YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Load declarations and report how each method is classified
    Validate {
        /// YAML interface declarations
        #[arg(long)]
        interfaces: PathBuf,
        /// Engine configuration (YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, String> {
    match path {
        Some(path) => EngineConfig::from_path(path).map_err(|e| format!("Failed to load config: {}", e)),
        None => Ok(EngineConfig::default()),
    }
}

fn load_interfaces(path: &Path) -> Result<InterfaceRegistry, String> {
    InterfaceRegistry::from_path(path).map_err(|e| format!("Failed to load interfaces: {}", e))
}

fn cmd_inspect(
    tree: &Path,
    interfaces: &Path,
    interface: &str,
    path: &str,
    config: Option<&Path>,
) -> Result<(), String> {
    let config = load_config(config)?;
    let registry = load_interfaces(interfaces)?;
    let tree: Arc<dyn ResourceTree> = Arc::new(
        MemoryTree::from_path(tree).map_err(|e| format!("Failed to load tree: {}", e))?,
    );

    let factory = AdapterFactory::new(Arc::new(registry)).with_config(config);
    let adapter = factory
        .get_adapter_at(tree, path, interface)
        .map_err(|e| e.to_string())?;

    println!("{}", adapter);
    println!();
    println!("Identity hash: {}", adapter.identity_hash());
    Ok(())
}

fn cmd_validate(interfaces: &Path, config: Option<&Path>) -> Result<(), String> {
    let config = load_config(config)?;
    let registry = load_interfaces(interfaces)?;
    if registry.is_empty() {
        println!("No interfaces declared.");
        return Ok(());
    }

    let mut unadaptable = 0;
    for name in registry.names() {
        let Some(iface) = registry.get(name) else {
            continue;
        };
        let exposed: Vec<&str> = iface.exposed().iter().map(String::as_str).collect();
        println!("{}  [{}]", name, exposed.join(", "));

        let mut adaptable = false;
        for method in iface.methods() {
            let category = classify(method, &config);
            adaptable |= category.is_accessor();
            println!(
                "  {:<28} {:<24} {}",
                format!("{}/{}", method.name, method.arity()),
                category,
                method.declared_in
            );
        }
        if !adaptable {
            println!("  (not adaptable: no property, reference or child-collection accessor)");
            unadaptable += 1;
        }
    }

    if unadaptable > 0 {
        return Err(format!("{} interface(s) cannot be adapted", unadaptable));
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Inspect {
            tree,
            interfaces,
            interface,
            path,
            config,
        } => cmd_inspect(&tree, &interfaces, &interface, &path, config.as_deref()),
        Commands::Validate { interfaces, config } => cmd_validate(&interfaces, config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
