//! CLI interface for skill-issue

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::analyzer::{self, AnalysisOptions, CodeMapper, SessionScope, TranscriptArchive};
use crate::config::{self, Config};
use crate::knowledge::{GraphCatalog, GraphSource, JsonStateFile, KnowledgeEngine};
use crate::profile::{Challenge, Difficulty, ProfileStore};
use crate::report;

type Engine = KnowledgeEngine<GraphCatalog, JsonStateFile>;

#[derive(Parser)]
#[command(name = "skill-issue")]
#[command(about = "Gamified learning tracker with a per-concept knowledge graph", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "SKILL_ISSUE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the profile and initialise knowledge domains
    Init {
        /// Player name (default: $USER)
        #[arg(long)]
        name: Option<String>,
        /// Domains to initialise, comma separated
        #[arg(long, value_delimiter = ',')]
        domains: Vec<String>,
        /// Replace an existing profile
        #[arg(long)]
        force: bool,
    },
    /// Record a challenge result
    Score {
        /// Challenge id
        #[arg(long)]
        id: u64,
        /// Score from 0 (missed) to 3 (nailed it)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=3))]
        score: u8,
        /// Topic the challenge was about
        #[arg(long)]
        topic: String,
        /// Apprentice, Practitioner, Expert or Master
        #[arg(long, default_value = "Apprentice")]
        difficulty: Difficulty,
        /// A hint was used
        #[arg(long)]
        hint: bool,
        /// Also update this knowledge domain
        #[arg(long, requires = "node")]
        domain: Option<String>,
        /// Concept node to update in --domain
        #[arg(long, requires = "domain")]
        node: Option<String>,
    },
    /// Show profile statistics
    Stats,
    /// Inspect and update knowledge graphs
    Graph {
        #[command(subcommand)]
        command: GraphCommands,
    },
    /// Seed mastery from past conversation transcripts
    Analyze {
        /// Project directory whose sessions to scan (default: current directory)
        #[arg(long, conflicts_with = "all")]
        project: Option<PathBuf>,
        /// Scan the sessions of every project
        #[arg(long)]
        all: bool,
        /// Domains to score, comma separated (default: all available)
        #[arg(long, value_delimiter = ',')]
        domains: Vec<String>,
        /// Most recent sessions to scan
        #[arg(long)]
        max_sessions: Option<usize>,
        /// Report without changing the knowledge state
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the active configuration
    Config {
        /// Overwrite the config file with defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Subcommand)]
enum GraphCommands {
    /// Mastery bars for every node of a domain
    Show {
        #[arg(long)]
        domain: String,
    },
    /// Highest-priority nodes to study next
    Weak {
        #[arg(long)]
        domain: String,
        /// How many nodes to list
        #[arg(long, default_value = "5")]
        top: usize,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Record a challenge score against one node
    Update {
        #[arg(long)]
        domain: String,
        #[arg(long)]
        node: String,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=3))]
        score: u8,
    },
    /// Start tracking every node of a domain
    Init {
        #[arg(long)]
        domain: String,
    },
    /// Nodes a code snippet exercises, most matches first
    Map {
        #[arg(long)]
        domain: String,
        /// File holding the snippet (default: stdin)
        file: Option<PathBuf>,
    },
    /// Decay mastery of concepts not practised recently
    Decay,
    /// List available domains
    Domains,
}

/// Resolved locations and stores for one invocation
struct App {
    config: Config,
    config_path: PathBuf,
}

impl App {
    fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path,
            None => config::config_path()?,
        };
        let config = Config::load_from(&config_path)?;
        debug!("Loaded config from {}", config_path.display());
        Ok(Self { config, config_path })
    }

    fn engine(&self) -> Result<Engine> {
        let graphs = GraphCatalog::with_dir(self.config.graphs_dir()?);
        let store = JsonStateFile::new(self.config.state_path()?);
        Ok(KnowledgeEngine::new(graphs, store).with_decay(self.config.decay))
    }

    fn profiles(&self) -> Result<ProfileStore> {
        Ok(ProfileStore::new(self.config.profile_path()?))
    }
}

/// Fail with the list of known domains when `domain` has no graph
fn require_domain(engine: &Engine, domain: &str) -> Result<()> {
    if engine.graphs().has_domain(domain) {
        return Ok(());
    }
    let available = engine.domains();
    if available.is_empty() {
        bail!(
            "Domain '{}' not found. No graphs in {}",
            domain,
            engine.graphs().dir().display()
        );
    }
    bail!("Domain '{}' not found. Available: {}", domain, available.join(", "));
}

fn default_username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "human".to_string())
}

fn project_root(project: Option<PathBuf>) -> Result<PathBuf> {
    let path = match project {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    Ok(std::fs::canonicalize(&path).unwrap_or(path))
}

/// Run the CLI
pub fn run() -> Result<()> {
    execute(Cli::parse())
}

fn execute(cli: Cli) -> Result<()> {
    let app = App::load(cli.config)?;

    match cli.command {
        None => {
            let profiles = app.profiles()?;
            if profiles.exists() {
                let profile = profiles.load()?;
                println!("{}", report::profile_stats(&profile));
            } else {
                println!("Welcome to skill-issue");
                println!("Get started: skill-issue init");
            }
        }
        Some(Commands::Init { name, domains, force }) => {
            let username = name.unwrap_or_else(default_username);
            let profile = app.profiles()?.init(&username, force)?;
            println!("✓ Initialized skill-issue at {}", app.config.data_dir()?.display());
            println!("  Player: {}", profile.username);

            let engine = app.engine()?;
            for domain in &domains {
                require_domain(&engine, domain)?;
                let init = engine
                    .init_domain(domain)
                    .with_context(|| format!("Failed to initialise domain '{}'", domain))?;
                println!("  Domain: {} ({} nodes)", domain, init.total);
            }
        }
        Some(Commands::Score { id, score, topic, difficulty, hint, domain, node }) => {
            let challenge = Challenge { id, score, topic, difficulty, hint_used: hint };
            let outcome = app.profiles()?.record_challenge(&challenge)?;
            println!("{}", report::challenge_summary(score, &challenge.topic, &outcome));

            if let (Some(domain), Some(node)) = (domain, node) {
                let record = app.engine()?.update(&domain, &node, score)?;
                println!(
                    "Knowledge: {}/{} mastery {:.2} ({})",
                    domain,
                    node,
                    record.mastery(),
                    record.status()
                );
            }
        }
        Some(Commands::Stats) => {
            let profile = app.profiles()?.load()?;
            println!("{}", report::profile_stats(&profile));
        }
        Some(Commands::Graph { command }) => graph(&app, command)?,
        Some(Commands::Analyze { project, all, domains, max_sessions, dry_run }) => {
            let scope = if all { SessionScope::All } else { SessionScope::Project(project_root(project)?) };
            let options = AnalysisOptions {
                scope,
                domains: if domains.is_empty() { None } else { Some(domains) },
                max_sessions: max_sessions.unwrap_or(app.config.analysis.max_sessions),
                dry_run,
            };
            let archive = TranscriptArchive::with_dir(app.config.projects_dir()?);
            debug!("Scanning sessions under {}", archive.root().display());
            let outcome = analyzer::run_analysis(&app.engine()?, &archive, &options)
                .context("Bootstrap analysis failed")?;
            println!("{}", report::analysis_report(&outcome));
        }
        Some(Commands::Config { reset }) => show_config(&app, reset)?,
    }

    Ok(())
}

fn graph(app: &App, command: GraphCommands) -> Result<()> {
    let engine = app.engine()?;

    match command {
        GraphCommands::Show { domain } => {
            require_domain(&engine, &domain)?;
            let graph = engine.load_graph(&domain)?;
            let listing = engine.all_nodes(&domain)?;
            let ranked = engine.ranked(&domain)?;
            println!("{}", report::graph_view(&graph, &listing, &ranked));
        }
        GraphCommands::Weak { domain, top, json } => {
            require_domain(&engine, &domain)?;
            let ranked = engine.top_n(&domain, top)?;
            if json {
                let value = report::weak_json(&ranked);
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", report::weak_list(&domain, &ranked));
            }
        }
        GraphCommands::Update { domain, node, score } => {
            require_domain(&engine, &domain)?;
            let record = engine.update(&domain, &node, score)?;
            println!("Updated {}:", node);
            println!("  Mastery:  {:.2}", record.mastery());
            println!("  Status:   {}", record.status());
            println!("  Attempts: {}", record.attempts());
        }
        GraphCommands::Init { domain } => {
            require_domain(&engine, &domain)?;
            let init = engine.init_domain(&domain)?;
            println!("Initialized knowledge state for '{}'", domain);
            println!("  Nodes: {} ({} new)", init.total, init.created);
            println!("  State saved to: {}", engine.store().path().display());
        }
        GraphCommands::Map { domain, file } => {
            require_domain(&engine, &domain)?;
            let code = match &file {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?,
            };
            let mapper = CodeMapper::new(&engine.load_graph(&domain)?);
            println!("{}", report::code_map(&domain, &mapper.map(&code)));
        }
        GraphCommands::Decay => {
            let changed = engine.apply_decay()?;
            println!("Applied decay to {} record(s)", changed);
        }
        GraphCommands::Domains => {
            let domains = engine.domains();
            if domains.is_empty() {
                println!("No knowledge graphs found in {}", engine.graphs().dir().display());
                return Ok(());
            }
            println!("Available domains:");
            for domain in domains {
                match engine.load_graph(&domain) {
                    Ok(graph) if graph.description().is_empty() => {
                        println!("  {} ({} nodes)", domain, graph.len())
                    }
                    Ok(graph) => {
                        println!("  {} ({} nodes): {}", domain, graph.len(), graph.description())
                    }
                    Err(e) => println!("  {} (unreadable: {})", domain, e),
                }
            }
        }
    }

    Ok(())
}

fn show_config(app: &App, reset: bool) -> Result<()> {
    if reset {
        write_default_config(&app.config_path)?;
        println!("Reset {}", app.config_path.display());
        return Ok(());
    }
    println!("Config file: {}", app.config_path.display());
    println!("Data dir:    {}", app.config.data_dir()?.display());
    println!("Graphs dir:  {}", app.config.graphs_dir()?.display());
    println!("Projects:    {}", app.config.projects_dir()?.display());
    println!();
    print!("{}", toml::to_string_pretty(&app.config).context("Failed to serialize config")?);
    Ok(())
}

fn write_default_config(path: &Path) -> Result<()> {
    std::fs::write(path, config::default_config_toml())
        .with_context(|| format!("Failed to write config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("skill-issue").chain(args.iter().copied()))
    }

    #[test]
    fn test_score_range_is_validated() {
        assert!(parse(&["score", "--id", "1", "--score", "3", "--topic", "rust"]).is_ok());
        assert!(parse(&["score", "--id", "1", "--score", "4", "--topic", "rust"]).is_err());
        assert!(parse(&["graph", "update", "--domain", "ml", "--node", "x", "--score", "9"]).is_err());
    }

    #[test]
    fn test_score_domain_requires_node() {
        let args = ["score", "--id", "1", "--score", "2", "--topic", "t", "--domain", "ml"];
        assert!(parse(&args).is_err());
    }

    #[test]
    fn test_difficulty_parses_case_insensitively() {
        let cli = parse(&["score", "--id", "2", "--score", "1", "--topic", "t", "--difficulty", "expert"])
            .unwrap();
        match cli.command {
            Some(Commands::Score { difficulty, .. }) => assert_eq!(difficulty, Difficulty::Expert),
            _ => panic!("expected score"),
        }
    }

    #[test]
    fn test_analyze_flags() {
        assert!(parse(&["analyze", "--all", "--project", "/tmp"]).is_err());
        let cli = parse(&["analyze", "--domains", "ml,web", "--dry-run", "--config", "/tmp/c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        match cli.command {
            Some(Commands::Analyze { domains, dry_run, all, .. }) => {
                assert_eq!(domains, vec!["ml", "web"]);
                assert!(dry_run);
                assert!(!all);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_unknown_domain_lists_available() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ml.json"), r#"{"nodes": []}"#).unwrap();
        let engine = KnowledgeEngine::new(
            GraphCatalog::with_dir(dir.path()),
            JsonStateFile::new(dir.path().join("state.json")),
        );
        assert!(require_domain(&engine, "ml").is_ok());
        let err = require_domain(&engine, "web").unwrap_err().to_string();
        assert_eq!(err, "Domain 'web' not found. Available: ml");
    }

    #[test]
    fn test_full_flow_against_temp_config() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let graphs = dir.path().join("graphs");
        std::fs::create_dir_all(&graphs).unwrap();
        std::fs::write(
            graphs.join("ml.json"),
            r#"{"nodes": [{"id": "attention", "name": "Attention", "importance_weight": 0.8}]}"#,
        )
        .unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            format!(
                "[paths]\ndata_dir = {:?}\ngraphs_dir = {:?}\nprojects_dir = {:?}\n",
                data,
                graphs,
                dir.path().join("projects")
            ),
        )
        .unwrap();
        let config = config_path.to_string_lossy().into_owned();

        let run = |args: &[&str]| {
            let mut full = vec!["--config", config.as_str()];
            full.extend_from_slice(args);
            execute(parse(&full).unwrap())
        };

        run(&["init", "--name", "ada", "--domains", "ml"]).unwrap();
        assert!(run(&["init", "--name", "bob"]).is_err());
        run(&["score", "--id", "1", "--score", "3", "--topic", "ml", "--domain", "ml", "--node", "attention"])
            .unwrap();
        run(&["graph", "weak", "--domain", "ml", "--json"]).unwrap();
        run(&["analyze", "--all"]).unwrap();
        assert!(run(&["graph", "show", "--domain", "nope"]).is_err());

        let snippet = dir.path().join("model.py");
        std::fs::write(&snippet, "scores = attention(q, k, v)").unwrap();
        run(&["graph", "map", "--domain", "ml", snippet.to_str().unwrap()]).unwrap();
        assert!(run(&["graph", "map", "--domain", "ml", "/no/such/file.py"]).is_err());

        let state = std::fs::read_to_string(data.join("knowledge_state.json")).unwrap();
        assert!(state.contains("\"attention\""));
        let profile = ProfileStore::new(data.join("profile.json")).load().unwrap();
        assert_eq!(profile.username, "ada");
        assert_eq!(profile.next_challenge_id, 2);
    }
}
