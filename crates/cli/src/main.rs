use clap::{Parser, Subcommand};
use anyhow::{Context, Result};

use herdbook_core::animal::Gender;
use herdbook_core::directory::{AnimalDirectory, AnimalQuery, Herd};
use herdbook_core::pedigree::{layout, LineageAnomaly, PedigreeTree, PedigreeTreeBuilder};
use herdbook_core::HerdbookConfig;

#[derive(Parser)]
#[command(name = "herdbook")]
#[command(version)]
#[command(about = "Pedigree trees and herd search for animal husbandry records")]
struct Cli {
    /// Path to a JSON config file (tree, layout and cache settings)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the ancestor tree of one animal
    Tree {
        /// Path to herd CSV (columns: id, code, name, gender, father, mother, ...)
        #[arg(short, long)]
        animals: String,

        /// Id of the root animal
        #[arg(long)]
        animal: String,

        /// Number of ancestor generations (defaults to the config value, 4)
        #[arg(short, long)]
        level: Option<u32>,

        /// Output format: "text" (default) or "json"
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Print screen coordinates for every slot of an ancestor tree as JSON
    Layout {
        /// Path to herd CSV
        #[arg(short, long)]
        animals: String,

        /// Id of the root animal
        #[arg(long)]
        animal: String,

        /// Number of ancestor generations
        #[arg(short, long)]
        level: Option<u32>,
    },

    /// Search animals by name or code
    Search {
        /// Path to herd CSV
        #[arg(short, long)]
        animals: String,

        /// Case-insensitive text matched against name and code
        #[arg(short, long)]
        search: Option<String>,

        /// Restrict to "MALE" or "FEMALE"
        #[arg(long)]
        gender: Option<String>,

        /// 1-based page number
        #[arg(long, default_value = "1")]
        page: usize,

        /// Page size
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => HerdbookConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from '{}'", path))?,
        None => HerdbookConfig::default(),
    };

    match cli.command {
        Commands::Tree {
            animals,
            animal,
            level,
            format,
        } => cmd_tree(&config, &animals, &animal, level, &format),
        Commands::Layout {
            animals,
            animal,
            level,
        } => cmd_layout(&config, &animals, &animal, level),
        Commands::Search {
            animals,
            search,
            gender,
            page,
            limit,
        } => cmd_search(&animals, search, gender.as_deref(), page, limit),
    }
}

fn load_herd(path: &str) -> Result<Herd> {
    let herd = Herd::from_csv(path)
        .with_context(|| format!("Failed to load animals from '{}'", path))?;
    eprintln!("Loaded {} animals from '{}'", herd.len(), path);
    Ok(herd)
}

fn build(config: &HerdbookConfig, herd: &Herd, animal: &str, level: Option<u32>) -> Result<PedigreeTree> {
    let options = match level {
        Some(l) => config.tree.with_level(l),
        None => config.tree.clone(),
    };
    let builder = PedigreeTreeBuilder::from_options(&options)
        .context("Invalid pedigree depth")?;
    let tree = builder
        .fetch_and_build(herd, animal)
        .with_context(|| format!("Failed to build pedigree tree for '{}'", animal))?;

    if tree.is_empty() {
        eprintln!("Warning: animal '{}' not found; tree is empty", animal);
    }
    Ok(tree)
}

fn cmd_tree(
    config: &HerdbookConfig,
    animals_path: &str,
    animal: &str,
    level: Option<u32>,
    output_format: &str,
) -> Result<()> {
    let herd = load_herd(animals_path)?;
    let tree = build(config, &herd, animal, level)?;

    match output_format.to_lowercase().as_str() {
        "json" => print_json(&tree)?,
        "text" => print_text(&tree),
        other => anyhow::bail!("Unknown format '{}'. Use 'text' (default) or 'json'.", other),
    }
    Ok(())
}

fn print_text(tree: &PedigreeTree) {
    println!(
        "Pedigree of '{}' ({} generations, {} of {} slots known)",
        tree.root_id(),
        tree.max_level(),
        tree.populated().count(),
        tree.len()
    );

    for node in tree.populated() {
        let indent = "  ".repeat(node.level as usize);
        let role = match node.position {
            1 => "",
            p if p % 2 == 0 => "sire ",
            _ => "dam  ",
        };
        let name = node.animal.display_name();
        let dead = if node.animal.is_alive { "" } else { " (dead)" };
        println!(
            "{}{}[{}] {} {}{}",
            indent, role, node.position, node.animal.code, name, dead
        );
    }

    let loops = tree.inbreeding_loops();
    if !loops.is_empty() {
        println!("\nAnimals at more than one position:");
        for (id, positions) in &loops {
            println!("  {}: {:?}", id, positions);
        }
    }

    if !tree.anomalies().is_empty() {
        println!("\nLineage anomalies:");
        for anomaly in tree.anomalies() {
            match anomaly {
                LineageAnomaly::DuplicateRecord { id, count } => {
                    println!("  {} records share id '{}'", count, id)
                }
                LineageAnomaly::MissingParent { position, parent_id } => {
                    println!("  position {}: parent '{}' not in herd", position, parent_id)
                }
                LineageAnomaly::SelfAncestor { position, id } => {
                    println!("  position {}: '{}' is its own ancestor", position, id)
                }
            }
        }
    }
}

fn print_json(tree: &PedigreeTree) -> Result<()> {
    let value = serde_json::json!({
        "docs": tree.nodes(),
        "anomalies": tree.anomalies(),
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn cmd_layout(config: &HerdbookConfig, animals_path: &str, animal: &str, level: Option<u32>) -> Result<()> {
    let herd = load_herd(animals_path)?;
    let tree = build(config, &herd, animal, level)?;
    let tree_layout = layout(&tree, &config.layout);
    eprintln!(
        "Layout {:.0} x {:.0} with {} edges",
        tree_layout.width,
        tree_layout.height,
        tree_layout.edges.len()
    );
    println!("{}", serde_json::to_string_pretty(&tree_layout)?);
    Ok(())
}

fn cmd_search(
    animals_path: &str,
    search: Option<String>,
    gender: Option<&str>,
    page: usize,
    limit: usize,
) -> Result<()> {
    let herd = load_herd(animals_path)?;

    let gender_eq = match gender.map(Gender::parse) {
        Some(Gender::Unknown) => {
            anyhow::bail!("Unknown gender '{}'. Use 'MALE' or 'FEMALE'.", gender.unwrap_or_default())
        }
        other => other,
    };
    let query = AnimalQuery {
        id_eq: None,
        search,
        gender_eq,
        page,
        limit,
    };

    let result = herd.list(&query).context("Animal search failed")?;
    for doc in &result.docs {
        println!(
            "{:<12} {:<24} {:<7} {}",
            doc.code,
            doc.name,
            doc.gender.code().unwrap_or("-"),
            if doc.is_alive { "alive" } else { "dead" }
        );
    }
    if result.has_next_page {
        eprintln!("More results on page {}", result.page + 1);
    }
    Ok(())
}
