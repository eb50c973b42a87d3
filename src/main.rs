use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use nestland::export::{graph_to_dot, process_summary_markdown, DotConfig};
use nestland::filters::{
    available_categories, available_lanes, available_roles, filter_processes_by_category, filter_steps,
    steps_by_role, visible_comments, StepFilter,
};
use nestland::loader::{GraphLoader, LoadOutcome, LoadedGraph};
use nestland::notify::{notifier_from_config, submit_comment};
use nestland::serve::{start_server, ApiState};
use nestland::sync::sync_databases;
use nestland::{
    Config, Database, NewProcess, NewStep, ProcessChanges, ProcessStore, Selection, StepChanges,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "nestland")]
#[command(author, version, about = "Nestland Command Center - business process graphs with lanes, roles and comments")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create .nestland/ with a database and default config
    Init,

    /// Manage processes
    Process {
        #[command(subcommand)]
        action: ProcessAction,
    },

    /// Manage steps of a process
    Step {
        #[command(subcommand)]
        action: StepAction,
    },

    /// Connect two steps of a process
    Link {
        slug: String,
        from: String,
        to: String,
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Remove a transition
    Unlink { id: String },

    /// List transitions of a process
    Transitions { slug: String },

    /// Comments on a process or its steps
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },

    /// Build and print the process graph
    Graph {
        slug: String,
        /// Step to highlight
        #[arg(long)]
        selected: Option<String>,
        #[arg(short, long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },

    /// Steps grouped by role
    Roles { slug: String },

    /// Lanes in column order
    Lanes { slug: String },

    /// Distinct process categories
    Categories,

    /// Start the dashboard API
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Copy processes, steps and transitions between databases
    Sync {
        #[arg(long)]
        from: Option<PathBuf>,
        #[arg(long)]
        to: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate shell completions
    Completion { shell: clap_complete::Shell },
}

#[derive(Subcommand, Debug)]
enum ProcessAction {
    Add {
        name: String,
        #[arg(long)]
        slug: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
    },
    List {
        #[arg(short, long)]
        category: Option<String>,
    },
    Show { slug: String },
    Update {
        slug: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
    },
    Delete { slug: String },
}

#[derive(Subcommand, Debug)]
enum StepAction {
    Add {
        slug: String,
        title: String,
        #[arg(short, long)]
        role: Option<String>,
        #[arg(short, long)]
        lane: Option<String>,
        #[arg(short, long)]
        order: Option<i32>,
        #[arg(short, long)]
        description: Option<String>,
    },
    List {
        slug: String,
        #[arg(short, long)]
        role: Option<String>,
        #[arg(short, long)]
        lane: Option<String>,
    },
    Update {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        role: Option<String>,
        #[arg(short, long)]
        lane: Option<String>,
        #[arg(short, long)]
        order: Option<i32>,
        #[arg(short, long)]
        description: Option<String>,
    },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum CommentAction {
    Add {
        slug: String,
        body: String,
        #[arg(short, long)]
        step: Option<String>,
    },
    List {
        slug: String,
        #[arg(short, long)]
        step: Option<String>,
    },
    Resolve { id: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum GraphFormat {
    Text,
    Json,
    Dot,
    Markdown,
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("NESTLAND_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if env_flag("NESTLAND_LOG_JSON") {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() {
    let cli = Cli::parse();
    let default_level = match cli.command {
        Command::Serve { .. } => "info",
        _ => "warn",
    };
    init_tracing(default_level);

    if let Err(e) = run(cli.command) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> CliResult {
    match command {
        Command::Init => {
            let cwd = std::env::current_dir()?;
            nestland::init::init_project(&cwd)?;
            Ok(())
        }
        Command::Process { action } => run_process(action),
        Command::Step { action } => run_step(action),
        Command::Link { slug, from, to, label } => {
            let db = Database::open()?;
            let t = db.create_transition(&slug, &from, &to, label.as_deref())?;
            println!("{} transition {} ({} -> {})", "Linked".green(), t.id, t.from_step_id, t.to_step_id);
            Ok(())
        }
        Command::Unlink { id } => {
            let db = Database::open()?;
            db.delete_transition(&id)?;
            println!("{} transition {}", "Removed".green(), id);
            Ok(())
        }
        Command::Transitions { slug } => {
            let db = Database::open()?;
            let snapshot = db.snapshot(&slug)?;
            if snapshot.transitions.is_empty() {
                println!("No transitions in '{}'.", slug);
            }
            let title = |id: &str| {
                snapshot
                    .steps
                    .iter()
                    .find(|s| s.id == id)
                    .map(|s| s.title.clone())
                    .unwrap_or_else(|| id.to_string())
            };
            for t in &snapshot.transitions {
                print!("{}  {} -> {}", t.id.dimmed(), title(&t.from_step_id), title(&t.to_step_id));
                if let Some(label) = &t.label {
                    print!("  [{}]", label);
                }
                println!();
            }
            Ok(())
        }
        Command::Comment { action } => run_comment(action),
        Command::Graph { slug, selected, format } => run_graph(&slug, selected.as_deref(), format),
        Command::Roles { slug } => {
            let db = Database::open()?;
            let process = db.require_process(&slug)?;
            for group in steps_by_role(&db.steps_for(&process.id)?) {
                println!("{} ({})", group.name.bold(), group.steps.len());
                for step in group.steps {
                    println!("  {}  {}", step.id.dimmed(), step.title);
                }
            }
            Ok(())
        }
        Command::Lanes { slug } => {
            let db = Database::open()?;
            let loaded = load_graph(&db, &slug, None)?;
            for (index, lane) in loaded.graph.lanes.iter().enumerate() {
                let count = loaded.graph.nodes.iter().filter(|n| n.lane_index == index).count();
                println!("{:>2}  {} ({} steps)", index, lane, count);
            }
            Ok(())
        }
        Command::Categories => {
            let db = Database::open()?;
            for category in available_categories(&db.list_processes()?) {
                println!("{}", category);
            }
            Ok(())
        }
        Command::Serve { port } => {
            let config = Config::load();
            let port = port.unwrap_or(config.serve.port);
            let host = config.serve.host.clone();
            let db = Database::open()?;
            let notifier = notifier_from_config(&config.notify);
            if config.admin.token.is_none() {
                tracing::warn!("no admin token configured, comment resolution over HTTP is disabled");
            }
            start_server(ApiState::new(db, config, notifier), &host, port)?;
            Ok(())
        }
        Command::Sync { from, to, dry_run } => {
            let config = Config::load();
            let from = from
                .or(config.sync.source)
                .ok_or("No source database: pass --from or set [sync] source")?;
            let to = to.or(config.sync.target).unwrap_or_else(Database::db_path);
            if !from.exists() {
                return Err(format!("Source database {} does not exist", from.display()).into());
            }

            let source = Database::open_at(&from)?;
            let target = Database::open_at(&to)?;
            let report = sync_databases(&source, &target, dry_run)?;

            println!("{} {} -> {}", "Sync".cyan().bold(), from.display(), to.display());
            print!("{}", report);
            Ok(())
        }
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "nestland", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn run_process(action: ProcessAction) -> CliResult {
    let db = Database::open()?;
    match action {
        ProcessAction::Add { name, slug, description, category } => {
            let process = db.create_process(&NewProcess {
                name: &name,
                slug: slug.as_deref(),
                description: description.as_deref(),
                category: category.as_deref(),
            })?;
            println!("{} process {} ({})", "Created".green(), process.slug, process.name);
        }
        ProcessAction::List { category } => {
            let selection = Selection::new().with_category(category.as_deref());
            let processes = filter_processes_by_category(&db.list_processes()?, selection.category());
            if processes.is_empty() {
                println!("No processes found.");
            }
            for p in processes {
                println!(
                    "{:<28} {:<32} {}",
                    p.slug.bold(),
                    p.name,
                    p.category.as_deref().unwrap_or("-").dimmed()
                );
            }
        }
        ProcessAction::Show { slug } => {
            let snapshot = db.snapshot(&slug)?;
            let p = &snapshot.process;
            println!("{} {}", p.name.bold(), format!("({})", p.slug).dimmed());
            if let Some(category) = &p.category {
                println!("Category: {}", category);
            }
            if let Some(description) = &p.description {
                println!("{}", description);
            }
            println!("Roles: {}", available_roles(&snapshot.steps).join(", "));
            println!("Lanes: {}", available_lanes(&snapshot.steps).join(", "));
            println!(
                "{} steps, {} transitions, {} open comments",
                snapshot.steps.len(),
                snapshot.transitions.len(),
                snapshot.comments.iter().filter(|c| c.is_open()).count()
            );
        }
        ProcessAction::Update { slug, name, description, category } => {
            let process = db.update_process(
                &slug,
                &ProcessChanges {
                    name: name.as_deref(),
                    description: description.as_deref(),
                    category: category.as_deref(),
                },
            )?;
            println!("{} process {}", "Updated".green(), process.slug);
        }
        ProcessAction::Delete { slug } => {
            db.delete_process(&slug)?;
            println!("{} process {}", "Deleted".green(), slug);
        }
    }
    Ok(())
}

fn run_step(action: StepAction) -> CliResult {
    let db = Database::open()?;
    match action {
        StepAction::Add { slug, title, role, lane, order, description } => {
            let step = db.create_step(
                &slug,
                &NewStep {
                    title: &title,
                    role: role.as_deref(),
                    lane: lane.as_deref(),
                    order_index: order,
                    description: description.as_deref(),
                },
            )?;
            println!("{} step {} ({})", "Created".green(), step.id, step.title);
        }
        StepAction::List { slug, role, lane } => {
            let process = db.require_process(&slug)?;
            let steps = filter_steps(
                &db.steps_for(&process.id)?,
                StepFilter {
                    role: role.as_deref(),
                    lane: lane.as_deref(),
                },
            );
            if steps.is_empty() {
                println!("No steps found.");
            }
            for s in steps {
                println!(
                    "{}  {:>3}  {:<32} {} / {}",
                    s.id.dimmed(),
                    s.order_index.unwrap_or(0),
                    s.title,
                    s.lane.as_deref().unwrap_or(nestland::style::UNASSIGNED),
                    s.role.as_deref().unwrap_or(nestland::style::UNASSIGNED)
                );
            }
        }
        StepAction::Update { id, title, role, lane, order, description } => {
            let step = db.update_step(
                &id,
                &StepChanges {
                    title: title.as_deref(),
                    role: role.as_deref(),
                    lane: lane.as_deref(),
                    order_index: order,
                    description: description.as_deref(),
                },
            )?;
            println!("{} step {} ({})", "Updated".green(), step.id, step.title);
        }
        StepAction::Delete { id } => {
            db.delete_step(&id)?;
            println!("{} step {}", "Deleted".green(), id);
        }
    }
    Ok(())
}

fn run_comment(action: CommentAction) -> CliResult {
    let db = Database::open()?;
    match action {
        CommentAction::Add { slug, body, step } => {
            // local CLI users act as the admin identity
            let config = Config::load();
            let notifier = notifier_from_config(&config.notify);
            let comment = submit_comment(
                &db,
                notifier.as_ref(),
                &slug,
                step.as_deref(),
                &body,
                Some(config.admin.email.as_str()),
            )?;
            println!("{} comment {}", "Added".green(), comment.id);
        }
        CommentAction::List { slug, step } => {
            let process = db.require_process(&slug)?;
            let comments = visible_comments(&db.comments_for(&process.slug)?, step.as_deref());
            if comments.is_empty() {
                println!("No comments.");
            }
            for c in comments {
                let status = if c.is_open() {
                    c.status.yellow()
                } else {
                    c.status.dimmed()
                };
                println!(
                    "{}  [{}]  {}  {}",
                    c.id.dimmed(),
                    status,
                    c.author.as_deref().unwrap_or("anonymous"),
                    c.body
                );
            }
        }
        CommentAction::Resolve { id } => {
            if db.resolve_comment(&id)? {
                println!("{} comment {}", "Resolved".green(), id);
            } else {
                println!("{} comment {} was already resolved", "Skipping".yellow(), id);
            }
        }
    }
    Ok(())
}

fn load_graph(db: &Database, slug: &str, selected: Option<&str>) -> Result<LoadedGraph, Box<dyn std::error::Error>> {
    match GraphLoader::new().load(db, slug, selected)? {
        LoadOutcome::Ready(loaded) => Ok(*loaded),
        LoadOutcome::Superseded => Err("graph load was superseded".into()),
    }
}

fn run_graph(slug: &str, selected: Option<&str>, format: GraphFormat) -> CliResult {
    let db = Database::open()?;
    let loaded = load_graph(&db, slug, selected)?;

    match format {
        GraphFormat::Json => println!("{}", serde_json::to_string_pretty(&loaded)?),
        GraphFormat::Dot => {
            let config = DotConfig {
                title: Some(loaded.process.name.clone()),
                ..Default::default()
            };
            print!("{}", graph_to_dot(&loaded.graph, &config));
        }
        GraphFormat::Markdown => {
            let snapshot = db.snapshot(slug)?;
            print!("{}", process_summary_markdown(&snapshot, &loaded.graph));
        }
        GraphFormat::Text => {
            println!(
                "{} {} nodes, {} edges, {} lanes",
                loaded.process.name.bold(),
                loaded.graph.nodes.len(),
                loaded.graph.edges.len(),
                loaded.graph.lanes.len()
            );
            if loaded.graph.is_empty() {
                println!("  No steps yet. Add one with: nestland step add {} <title>", slug);
            }
            for node in &loaded.graph.nodes {
                let overlay = match node.overlay {
                    Some(nestland::style::Overlay::OpenComment) => format!(" open comments: {}", node.open_comments).red(),
                    Some(nestland::style::Overlay::Selected) => " selected".blue(),
                    None => "".normal(),
                };
                println!(
                    "  {:<32} {:<14} {:<12} ({:>5}, {:>5}){}",
                    node.label, node.lane, node.role, node.position.x, node.position.y, overlay
                );
            }
            for edge in &loaded.graph.edges {
                let label = edge.label.as_deref().map(|l| format!(" [{}]", l)).unwrap_or_default();
                println!("  {} -> {}{}", edge.source, edge.target, label);
            }
            for issue in &loaded.issues {
                eprintln!("{} {}", "Warning:".yellow(), issue);
            }
        }
    }
    Ok(())
}
