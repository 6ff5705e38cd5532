//! Command line front end for a simplegraph database.
//!
//! JSON arguments may be given inline or as `-` to read them from stdin. Results go to
//! stdout, one item per line; logs go to stderr.

use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use simplegraph::{
    AttributeBag, DiagramFormat, Direction, ExportOptions, GraphConfig, GraphLocation, MatchMode,
    SimpleGraph, render,
};

#[derive(Parser)]
#[command(name = "simplegraph")]
#[command(about = "Property graph of JSON documents stored in SQLite")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    location: LocationArgs,

    /// Config file prefix (default: simplegraph).
    #[arg(short, long, default_value = "simplegraph", global = true)]
    config: String,

    /// Leave foreign key enforcement off for this run.
    #[arg(long, global = true)]
    no_foreign_keys: bool,
}

#[derive(Args)]
struct LocationArgs {
    /// Database file.
    #[arg(long, global = true, conflicts_with = "dir")]
    db: Option<PathBuf>,

    /// Directory holding the database file; used with --file.
    #[arg(long, global = true, requires = "file")]
    dir: Option<PathBuf>,

    /// Database file name inside --dir.
    #[arg(long, global = true, requires = "dir")]
    file: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database file and schema if missing.
    Init,
    /// Insert a node.
    Add {
        /// Node body as a JSON object.
        body: String,
        #[arg(long)]
        id: Option<String>,
    },
    /// Insert a node or merge attributes into an existing one.
    Upsert { id: String, body: String },
    /// Remove nodes and every edge touching them.
    Remove {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Add a directed edge.
    Connect {
        source: String,
        target: String,
        /// Edge properties as a JSON object.
        properties: Option<String>,
    },
    /// Remove every edge from source to target.
    Disconnect { source: String, target: String },
    /// Print one node body.
    Find { id: String },
    /// Print the bodies matching every attribute of a JSON predicate.
    Search {
        predicate: String,
        #[arg(long, value_enum, default_value_t = SearchMode::Exact)]
        mode: SearchMode,
    },
    /// List neighbor identifiers.
    Neighbors {
        id: String,
        #[arg(long, default_value = "both")]
        direction: Direction,
    },
    /// Breadth-first walk from a node.
    Traverse {
        start: String,
        #[arg(long)]
        target: Option<String>,
        #[arg(long, default_value = "both")]
        direction: Direction,
        /// Print node bodies and edge properties along the walk.
        #[arg(long)]
        bodies: bool,
    },
    /// Fewest-edges path between two nodes.
    Path {
        start: String,
        end: String,
        #[arg(long, default_value = "both")]
        direction: Direction,
    },
    /// Render nodes and the edges between them as a diagram.
    Export {
        /// Nodes to include; ignored with --from.
        ids: Vec<String>,
        /// Export the walk from this node instead of a fixed id list.
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        target: Option<String>,
        #[arg(long, default_value = "both")]
        direction: Direction,
        #[arg(long, value_enum, default_value_t = Format::Dot)]
        format: Format,
        /// Node attribute to leave out of labels; repeatable.
        #[arg(long = "exclude-key")]
        exclude_keys: Vec<String>,
        /// Label edges with property values only.
        #[arg(long)]
        hide_edge_key: bool,
    },
    /// Report orphan edges and malformed bodies; fails when any are found.
    Check,
    /// Print node and edge counts.
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum SearchMode {
    Exact,
    StartsWith,
    Contains,
}

impl From<SearchMode> for MatchMode {
    fn from(mode: SearchMode) -> Self {
        match mode {
            SearchMode::Exact => MatchMode::Exact,
            SearchMode::StartsWith => MatchMode::StartsWith,
            SearchMode::Contains => MatchMode::Contains,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Dot,
    Mermaid,
}

impl From<Format> for DiagramFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Dot => DiagramFormat::Dot,
            Format::Mermaid => DiagramFormat::Mermaid,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut graph_config = load_graph_config(&cli.config);
    if cli.no_foreign_keys {
        graph_config.enforce_foreign_keys = false;
    }
    let location = resolve_location(&cli.location)?;

    let graph = match cli.command {
        Command::Init => {
            let graph = SimpleGraph::initialize(location, graph_config)?;
            println!("initialized {}", graph.path().display());
            return Ok(());
        }
        _ => SimpleGraph::open(location, graph_config),
    };

    match cli.command {
        Command::Init => {}
        Command::Add { ref body, ref id } => {
            let body = read_json_arg(body)?;
            graph.add_node_json(&body, id.as_deref())?;
        }
        Command::Upsert { ref id, ref body } => {
            let partial = parse_object(&read_json_arg(body)?)?;
            graph.upsert_node(id, partial)?;
        }
        Command::Remove { ref ids } => {
            let removed = graph.remove_nodes(ids.as_slice())?;
            println!("{removed}");
        }
        Command::Connect {
            ref source,
            ref target,
            ref properties,
        } => {
            let properties = properties
                .as_deref()
                .map(|text| read_json_arg(text).and_then(|text| parse_object(&text)))
                .transpose()?;
            graph.connect_nodes(source, target, properties)?;
        }
        Command::Disconnect {
            ref source,
            ref target,
        } => {
            let removed = graph.disconnect_nodes(source, target)?;
            println!("{removed}");
        }
        Command::Find { ref id } => {
            let body = graph
                .find_node(id)?
                .ok_or_else(|| anyhow!("node {id} not found"))?;
            println!("{}", serde_json::to_string(&body)?);
        }
        Command::Search {
            ref predicate,
            mode,
        } => {
            let predicate = parse_object(&read_json_arg(predicate)?)?;
            for body in graph.find_nodes(&predicate, mode.into())? {
                println!("{}", serde_json::to_string(&body)?);
            }
        }
        Command::Neighbors { ref id, direction } => {
            for neighbor in graph.neighbors(id, direction)? {
                println!("{neighbor}");
            }
        }
        Command::Traverse {
            ref start,
            ref target,
            direction,
            bodies,
        } => {
            if bodies {
                for row in graph.traverse_with_bodies(start, target.as_deref(), direction)? {
                    println!(
                        "{}\t{}\t{}",
                        row.id,
                        row.kind,
                        serde_json::to_string(&row.payload)?
                    );
                }
            } else {
                for id in graph.traverse(start, target.as_deref(), direction)? {
                    println!("{id}");
                }
            }
        }
        Command::Path {
            ref start,
            ref end,
            direction,
        } => match graph.shortest_path(start, end, direction)? {
            Some(path) => println!("{}", path.join(" -> ")),
            None => bail!("no path from {start} to {end}"),
        },
        Command::Export {
            ref ids,
            ref from,
            ref target,
            direction,
            format,
            ref exclude_keys,
            hide_edge_key,
        } => {
            let selection = match from {
                Some(start) => graph.walk_selection(start, target.as_deref(), direction)?,
                None if ids.is_empty() => bail!("give node ids or --from"),
                None => graph.selection(ids.as_slice())?,
            };
            let options = ExportOptions {
                exclude_node_keys: exclude_keys.clone(),
                hide_edge_key,
                format: format.into(),
            };
            print!("{}", render(&selection, &options));
        }
        Command::Check => {
            let report = graph.check_integrity()?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::Status => {
            println!(
                "nodes={} edges={}",
                graph.node_count()?,
                graph.edge_count()?
            );
        }
    }

    Ok(())
}

fn resolve_location(args: &LocationArgs) -> anyhow::Result<GraphLocation> {
    match (&args.db, &args.dir, &args.file) {
        (Some(db), _, _) => Ok(GraphLocation::file(db)),
        (None, Some(dir), Some(file)) => Ok(GraphLocation::dir(dir, file.as_str())),
        _ => bail!("either --db or --dir with --file is required"),
    }
}

fn read_json_arg(arg: &str) -> anyhow::Result<String> {
    if arg == "-" {
        std::io::read_to_string(std::io::stdin()).context("reading JSON from stdin")
    } else {
        Ok(arg.to_string())
    }
}

fn parse_object(text: &str) -> anyhow::Result<AttributeBag> {
    match serde_json::from_str(text).context("parsing JSON argument")? {
        serde_json::Value::Object(map) => Ok(map),
        other => bail!("expected a JSON object, got {other}"),
    }
}

fn load_graph_config(file_prefix: &str) -> GraphConfig {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("SIMPLEGRAPH")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .and_then(|c| c.try_deserialize::<GraphConfig>());

    match cfg {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "falling back to default graph config");
            GraphConfig::default()
        }
    }
}
