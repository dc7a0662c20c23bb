use clap::{Parser, Subcommand};
use postindex::config::{self, SiteConfig};
use postindex::index::{ContentIndex, IndexOptions};
use postindex::{logging, output, scan};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "postindex")]
#[command(about = "Content index and URL resolver for a markdown blog")]
#[command(long_about = "\
Content index and URL resolver for a markdown blog

Posts are discovered in two content roots, validated, given canonical slugs,
merged into one date-sorted index, and linked by chronology and series.

Site structure:

  site/
  ├── config.toml                      # Site config (optional)
  ├── content/                         # Dynamic posts, one directory each
  │   └── software/
  │       ├── metadata.json            # Sub-blog title and description
  │       └── 2023/
  │           └── 1_node_golang_wasm/  # `1_` is replaced by the month of `date`
  │               ├── index.mdx        # → blog/software/2023/2/node_golang_wasm
  │               └── hero.png
  └── static-content/                  # Static posts, rendered to HTML
      └── mypost.md                    # → blog/<year>/<month>/mypost

Every document opens with a YAML header; `title`, `date` and `published` are
required. Production builds drop drafts and posts marked `test: true`.

Run 'postindex gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Site root holding config.toml and the content roots
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Output directory for the index manifest
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Build for production (also POSTINDEX_ENV=production)
    #[arg(long, global = true)]
    production: bool,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the index and write index.json to the output directory
    Index {
        /// Keep post bodies in the manifest
        #[arg(long)]
        include_content: bool,
    },
    /// Print every slug to pre-render
    Paths {
        /// Print every static document's slug, drafts and test posts included
        #[arg(long)]
        all_static: bool,
    },
    /// Validate all content without writing anything
    Check,
    /// Show one post with its navigation context
    Show {
        /// Slug, with or without the URL prefix
        slug: String,
        /// Print the full record as JSON
        #[arg(long)]
        json: bool,
    },
    /// List tags with post counts
    Tags,
    /// List series and their members
    Series,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    match &cli.command {
        Command::GenConfig => print!("{}", config::stock_config_toml()),
        command => run(&cli, command)?,
    }
    Ok(())
}

fn run(cli: &Cli, command: &Command) -> Result<(), Box<dyn std::error::Error>> {
    let site_config = config::load_config(&cli.root)?;
    let env_value = std::env::var(config::ENV_VAR).ok();
    let production = config::resolve_production(cli.production, env_value.as_deref(), &site_config);

    match command {
        Command::Index { include_content } => {
            let include_content = *include_content;
            let index = build_index(&cli.root, &site_config, production, include_content)?;
            std::fs::create_dir_all(&cli.output)?;
            let manifest_path = cli.output.join("index.json");
            let json = serde_json::to_string_pretty(&index.manifest())?;
            std::fs::write(&manifest_path, json)?;
            output::print_index_output(&index);
            println!("==> Wrote {}", manifest_path.display());
        }
        Command::Paths { all_static } => {
            if *all_static {
                let slugs = scan::all_static_slugs(&cli.root, &site_config)?;
                output::print_paths(slugs.iter().map(String::as_str));
            } else {
                let index = build_index(&cli.root, &site_config, production, false)?;
                output::print_paths(index.static_paths());
            }
        }
        Command::Check => {
            println!("==> Checking {}", cli.root.display());
            let index = build_index(&cli.root, &site_config, production, false)?;
            output::print_check_output(&index);
            println!("==> Content is valid");
        }
        Command::Show { slug, json } => {
            let index = build_index(&cli.root, &site_config, production, false)?;
            if let Some(view) = index.fetch_dynamic(slug)? {
                if *json {
                    println!("{}", serde_json::to_string_pretty(&view)?);
                } else {
                    output::print_lines(output::format_dynamic_post(&view));
                }
            } else if let Some(view) = index.fetch_static(slug)? {
                if *json {
                    println!("{}", serde_json::to_string_pretty(&view)?);
                } else {
                    output::print_lines(output::format_static_post(&view));
                }
            } else {
                return Err(format!("post not found: {slug}").into());
            }
        }
        Command::Tags => {
            let index = build_index(&cli.root, &site_config, production, false)?;
            output::print_tags_output(&index);
        }
        Command::Series => {
            let index = build_index(&cli.root, &site_config, production, false)?;
            output::print_series_output(&index);
        }
        Command::GenConfig => print!("{}", config::stock_config_toml()),
    }

    Ok(())
}

fn build_index(
    root: &Path,
    site_config: &SiteConfig,
    production: bool,
    include_content: bool,
) -> Result<ContentIndex, postindex::index::IndexError> {
    ContentIndex::build(
        root,
        site_config,
        IndexOptions {
            production,
            include_content,
        },
    )
}
