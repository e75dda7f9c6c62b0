use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tracing::debug;

use prompt_library::catalog::influences::NewInfluence;
use prompt_library::catalog::prompts::{PromptFilter, SearchField};
use prompt_library::commands;
use prompt_library::store::InfluenceStatus;
use prompt_library::config::RuntimeConfig;
use prompt_library::{Config, GenerationSettings, InfluenceStore, PromptStore};

#[derive(Parser)]
#[command(name = "prompt-library")]
#[command(about = "Curate a music prompt library and breed new prompts from the best ones")]
struct Cli {
    /// Prompt library CSV (overrides config)
    #[arg(long, global = true)]
    prompts: Option<PathBuf>,
    /// Influence library CSV (overrides config)
    #[arg(long, global = true)]
    influences: Option<PathBuf>,
    /// Seed the random generator for reproducible output
    #[arg(long, global = true)]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate new prompts for a time block
    Generate {
        /// Time block to breed from (fuzzy matched)
        #[arg(long)]
        time_block: String,
        /// Number of prompts (defaults to config)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        count: Option<u32>,
        /// Print the generation plan as JSON without writing anything
        #[arg(long)]
        plan_only: bool,
    },
    /// List time blocks with prompt and parent counts
    Blocks,
    /// Show parent candidates for a time block
    Parents {
        /// Time block (fuzzy matched)
        time_block: String,
    },
    /// Show one prompt
    Show {
        /// Prompt ID
        id: String,
        /// Include mood, prompt texts and notes
        #[arg(long, short)]
        verbose: bool,
    },
    /// Find prompts by attribute
    Find {
        #[arg(long)]
        time_block: Option<String>,
        #[arg(long)]
        bpm: Option<u32>,
        /// Only prompts already generated
        #[arg(long, conflicts_with = "not_generated")]
        generated: bool,
        /// Only prompts not yet generated
        #[arg(long)]
        not_generated: bool,
        /// Only rated prompts
        #[arg(long, conflicts_with = "unrated")]
        rated: bool,
        /// Only unrated prompts
        #[arg(long)]
        unrated: bool,
        /// Only prompts rated with a star
        #[arg(long)]
        excellent: bool,
    },
    /// Full-text search over prompts
    Search {
        /// Text to look for (case-insensitive)
        text: String,
        /// Limit to a field; repeatable
        #[arg(long = "field")]
        fields: Vec<SearchField>,
    },
    /// Rate a prompt
    Rate {
        /// Prompt ID
        id: String,
        /// Free-text rating, e.g. "Excellent ⭐"
        rating: String,
    },
    /// Mark prompts as generated
    MarkGenerated {
        /// Prompt IDs
        #[arg(required_unless_present = "all")]
        ids: Vec<String>,
        /// Mark every prompt
        #[arg(long, conflicts_with = "ids")]
        all: bool,
    },
    /// Prompt library statistics
    Stats,
    /// Influence library operations
    Influence {
        #[command(subcommand)]
        influence_command: InfluenceCommands,
    },
}

#[derive(Subcommand)]
enum InfluenceCommands {
    /// List influences grouped by category
    List {
        #[arg(long)]
        category: Option<String>,
        /// Unexplored, Tested, Proven or Avoid
        #[arg(long)]
        status: Option<InfluenceStatus>,
    },
    /// Search name, elements to use and adaptation notes
    Search { text: String },
    /// Show one influence
    Show { id: String },
    /// Add a new influence
    Add {
        #[arg(long)]
        category: String,
        #[arg(long)]
        name: String,
        /// Elements to use
        #[arg(long = "use", default_value = "")]
        elements_to_use: String,
        /// Elements to avoid
        #[arg(long = "avoid", default_value = "")]
        elements_to_avoid: String,
        /// Adaptation notes
        #[arg(long = "notes", default_value = "")]
        adaptation_notes: String,
    },
    /// Record prompts that used an influence
    MarkUsed {
        /// Influence ID
        id: String,
        /// Prompt IDs
        #[arg(required = true)]
        prompt_ids: Vec<String>,
    },
    /// Set an influence's status
    SetStatus {
        id: String,
        /// Unexplored, Tested, Proven or Avoid
        status: InfluenceStatus,
    },
    /// Suggest random unexplored influences
    Suggest {
        #[arg(long, default_value_t = 5)]
        count: usize,
        #[arg(long)]
        category: Option<String>,
    },
    /// Preview rating-weighted mutation candidates
    Weighted {
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Influence library statistics
    Stats,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Subscriber first so config warnings are visible. Logs go to stderr so
    // --plan-only JSON on stdout stays clean.
    Config::load_env_file();
    tracing_subscriber::fmt()
        .with_env_filter(RuntimeConfig::load_from_env().log_level.as_str())
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load()?;
    if let Some(path) = cli.prompts {
        config.paths.prompts_csv = path;
    }
    if let Some(path) = cli.influences {
        config.paths.influences_csv = path;
    }

    debug!(
        "Using prompts={} influences={}",
        config.paths.prompts_csv.display(),
        config.paths.influences_csv.display()
    );

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let settings = GenerationSettings::from(&config);
    let open_prompts = || PromptStore::open(&config.paths.prompts_csv);
    let open_influences = || InfluenceStore::open(&config.paths.influences_csv);

    match cli.command {
        Commands::Generate {
            time_block,
            count,
            plan_only,
        } => {
            let count = count
                .map(|c| c as usize)
                .unwrap_or(config.generation.default_count);
            let mut prompts = open_prompts()?;
            let mut influences = open_influences()?;
            commands::generate(
                &mut prompts,
                &mut influences,
                &settings,
                &time_block,
                count,
                plan_only,
                &mut rng,
            )?;
        }
        Commands::Blocks => {
            commands::list_blocks(&open_prompts()?, &settings.parent_tiers)?;
        }
        Commands::Parents { time_block } => {
            commands::show_parents(&open_prompts()?, &time_block, &settings.parent_tiers)?;
        }
        Commands::Show { id, verbose } => {
            commands::show_prompt(&open_prompts()?, &id, verbose)?;
        }
        Commands::Find {
            time_block,
            bpm,
            generated,
            not_generated,
            rated,
            unrated,
            excellent,
        } => {
            let filter = PromptFilter {
                time_block,
                bpm,
                generated: flag_pair(generated, not_generated),
                rated: flag_pair(rated, unrated),
                excellent,
            };
            commands::find_prompts(&open_prompts()?, &filter)?;
        }
        Commands::Search { text, fields } => {
            commands::search_prompts(&open_prompts()?, &text, &fields)?;
        }
        Commands::Rate { id, rating } => {
            commands::rate_prompt(&mut open_prompts()?, &id, &rating)?;
        }
        Commands::MarkGenerated { ids, all } => {
            commands::mark_generated(&mut open_prompts()?, &ids, all)?;
        }
        Commands::Stats => {
            commands::prompt_stats(&open_prompts()?)?;
        }
        Commands::Influence { influence_command } => match influence_command {
            InfluenceCommands::List { category, status } => {
                commands::influence_list(&open_influences()?, category.as_deref(), status)?;
            }
            InfluenceCommands::Search { text } => {
                commands::influence_search(&open_influences()?, &text)?;
            }
            InfluenceCommands::Show { id } => {
                commands::influence_show(&open_influences()?, &id)?;
            }
            InfluenceCommands::Add {
                category,
                name,
                elements_to_use,
                elements_to_avoid,
                adaptation_notes,
            } => {
                let new = NewInfluence {
                    category,
                    name,
                    elements_to_use,
                    elements_to_avoid,
                    adaptation_notes,
                };
                commands::influence_add(&mut open_influences()?, new)?;
            }
            InfluenceCommands::MarkUsed { id, prompt_ids } => {
                commands::influence_mark_used(&mut open_influences()?, &id, &prompt_ids)?;
            }
            InfluenceCommands::SetStatus { id, status } => {
                commands::influence_set_status(&mut open_influences()?, &id, status)?;
            }
            InfluenceCommands::Suggest { count, category } => {
                commands::influence_suggest(
                    &open_influences()?,
                    count,
                    category.as_deref(),
                    &mut rng,
                )?;
            }
            InfluenceCommands::Weighted { count } => {
                commands::influence_weighted(
                    &open_prompts()?,
                    &open_influences()?,
                    &settings,
                    count,
                    &mut rng,
                )?;
            }
            InfluenceCommands::Stats => {
                commands::influence_stats(&open_influences()?)?;
            }
        },
    }

    Ok(())
}

/// `--x` / `--not-x` flags to an optional filter value.
fn flag_pair(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}
