//! apidash - API documentation explorer and request runner
//!
//! Thin command-line driver over [`apidash::Dashboard`].

use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use apidash::constants::{APP_NAME, LOG_FILE_NAME};
use apidash::display::Printer;
use apidash::export::{export_filename, ExportFormat};
use apidash::models::{parse_pair, AuthType, Header, HttpMethod, NewEnvironment, RequestSpec, StatusClass};
use apidash::{parse_curl, Config, Dashboard, Execution, HistoryFilter, RequestOverrides};

#[derive(Debug, Parser)]
#[command(name = "apidash", version, about = "Explore API documentation and exercise its endpoints")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage uploaded documentation
    #[command(subcommand)]
    Docs(DocsCommand),
    /// Manage environments
    #[command(subcommand)]
    Env(EnvCommand),
    /// Execute an endpoint of a stored documentation
    Run(RunArgs),
    /// Send an ad hoc request
    Send(SendArgs),
    /// Inspect and export request history
    #[command(subcommand)]
    History(HistoryCommand),
}

#[derive(Debug, Subcommand)]
enum DocsCommand {
    /// Upload a JSON documentation file
    Import {
        file: PathBuf,
        /// Defaults to the file name without extension
        #[arg(long)]
        name: Option<String>,
    },
    List,
    /// Print the navigation tree, or one endpoint in detail
    Show {
        doc: String,
        /// Show one endpoint: METHOD PATH
        #[arg(long, num_args = 2, value_names = ["METHOD", "PATH"])]
        endpoint: Option<Vec<String>>,
    },
    Search {
        doc: String,
        query: String,
    },
    Delete {
        doc: String,
    },
    Export {
        doc: String,
        #[command(flatten)]
        output: ExportArgs,
    },
}

#[derive(Debug, Subcommand)]
enum EnvCommand {
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// key=value, repeatable
        #[arg(long = "var", short = 'v')]
        vars: Vec<String>,
        #[arg(long)]
        activate: bool,
    },
    List,
    /// Defaults to the active environment
    Show {
        env: Option<String>,
        /// Print secret-looking values
        #[arg(long)]
        reveal: bool,
    },
    Activate {
        env: String,
    },
    /// Leave no environment active
    Deactivate,
    /// Set variables: key=value ...
    Set {
        env: String,
        #[arg(required = true)]
        assignments: Vec<String>,
    },
    Unset {
        env: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Import a native, Postman or flat JSON environment file
    Import {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        activate: bool,
    },
    /// Defaults to the active environment
    Export {
        env: Option<String>,
        #[command(flatten)]
        output: ExportArgs,
    },
    Delete {
        env: String,
    },
}

#[derive(Debug, Subcommand)]
enum HistoryCommand {
    List(HistoryArgs),
    Show {
        id: i64,
    },
    Export {
        #[command(flatten)]
        filter: HistoryArgs,
        #[command(flatten)]
        output: ExportArgs,
    },
    Clear {
        /// Only entries older than this many days
        #[arg(long)]
        older_than_days: Option<i64>,
    },
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// json, postman, markdown or report
    #[arg(long, short = 'f', default_value = "json")]
    format: ExportFormat,
    /// File or directory to write; stdout when absent
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct HistoryArgs {
    #[arg(long)]
    method: Option<String>,
    /// Substring of the URL
    #[arg(long)]
    endpoint: Option<String>,
    /// 2xx, 4xx, failed, ...
    #[arg(long)]
    status: Option<StatusClass>,
    /// Environment name or id
    #[arg(long)]
    env: Option<String>,
    #[arg(long)]
    failed: bool,
    /// Zero takes the configured default, negative means no limit
    #[arg(long, default_value_t = 0)]
    limit: i64,
}

#[derive(Debug, Args)]
struct RequestArgs {
    /// Header, "Name: value", repeatable
    #[arg(long = "header", short = 'H')]
    headers: Vec<String>,
    /// Query parameter, key=value, repeatable
    #[arg(long = "query", short = 'q')]
    query: Vec<String>,
    /// Body text; JSON is sent as JSON, @path reads a file
    #[arg(long, short = 'd')]
    body: Option<String>,
    /// Bearer token
    #[arg(long, conflicts_with = "basic")]
    bearer: Option<String>,
    /// user:password
    #[arg(long)]
    basic: Option<String>,
    /// Print the equivalent cURL command
    #[arg(long)]
    curl: bool,
    /// Resolve and print, but do not send
    #[arg(long)]
    dry_run: bool,
    /// Print response headers
    #[arg(long, short = 'i')]
    include: bool,
}

#[derive(Debug, Args)]
struct RunArgs {
    doc: String,
    method: String,
    path: String,
    #[command(flatten)]
    request: RequestArgs,
}

#[derive(Debug, Args)]
struct SendArgs {
    /// Method and URL, or a single cURL command with --from-curl
    #[arg(required_unless_present = "from_curl")]
    method: Option<HttpMethod>,
    #[arg(required_unless_present = "from_curl")]
    url: Option<String>,
    #[arg(long, conflicts_with_all = ["method", "url"])]
    from_curl: Option<String>,
    #[command(flatten)]
    request: RequestArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::load();

    // Initialize logging to file
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("cannot create {}", config.log_dir.display()))?;
    let file_appender = tracing_appender::rolling::never(&config.log_dir, LOG_FILE_NAME);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("apidash=info")),
        )
        .init();
    tracing::info!(version = apidash::constants::APP_VERSION, "{} starting", APP_NAME);

    let printer = Printer::new(!cli.no_color && std::io::stdout().is_terminal());
    let dashboard = Dashboard::open(config).await?;

    let outcome = match cli.command {
        Command::Docs(cmd) => docs(&dashboard, printer, cmd).await,
        Command::Env(cmd) => env(&dashboard, printer, cmd).await,
        Command::Run(args) => run(&dashboard, printer, args).await,
        Command::Send(args) => send(&dashboard, printer, args).await,
        Command::History(cmd) => history(&dashboard, printer, cmd).await,
    };

    dashboard.close().await;
    outcome
}

async fn docs(dashboard: &Dashboard, printer: Printer, cmd: DocsCommand) -> anyhow::Result<()> {
    match cmd {
        DocsCommand::Import { file, name } => {
            let up = dashboard
                .import_documentation_file(&file, name.as_deref())
                .await
                .with_context(|| format!("cannot import {}", file.display()))?;
            let stats = up.parsed.stats();
            println!(
                "Stored '{}' (id {}): {} endpoints in {} categories ({})",
                up.documentation.name,
                up.documentation.id,
                stats.endpoints,
                stats.categories,
                up.parsed.shape.as_str()
            );
            eprint!("{}", printer.warnings(&up.parsed.warnings));
        }
        DocsCommand::List => {
            let docs = dashboard.list_documentation().await?;
            if docs.is_empty() {
                println!("No documentation uploaded.");
            }
            for doc in docs {
                println!(
                    "{:>4}  {}  {}  {}",
                    doc.id,
                    doc.last_modified.format("%Y-%m-%d %H:%M"),
                    doc.name,
                    doc.source_identifier.as_deref().unwrap_or("")
                );
            }
        }
        DocsCommand::Show { doc, endpoint } => {
            let id = dashboard.find_documentation(&doc).await?.id;
            let open = dashboard.open_documentation(id).await?;
            match endpoint.as_deref() {
                Some([method, path]) => {
                    let Some(found) = open.parsed.find(method, path) else {
                        bail!("no endpoint {} {} in '{}'", method, path, open.documentation.name);
                    };
                    print!("{}", printer.endpoint_detail(found));
                }
                _ => {
                    if let Some(title) = &open.parsed.title {
                        println!("{} {}", title, open.parsed.version.as_deref().unwrap_or(""));
                    }
                    print!("{}", printer.tree(&open.parsed.tree));
                    eprint!("{}", printer.warnings(&open.parsed.warnings));
                }
            }
        }
        DocsCommand::Search { doc, query } => {
            let id = dashboard.find_documentation(&doc).await?.id;
            let found = dashboard.search_documentation(id, &query).await?;
            if found.is_empty() {
                println!("No endpoints match '{}'.", query);
            }
            for endpoint in &found {
                println!("{}  [{}]", printer.endpoint(endpoint), endpoint.category);
            }
        }
        DocsCommand::Delete { doc } => {
            let found = dashboard.find_documentation(&doc).await?;
            dashboard.delete_documentation(found.id).await?;
            println!("Deleted '{}'.", found.name);
        }
        DocsCommand::Export { doc, output } => {
            let found = dashboard.find_documentation(&doc).await?;
            let text = dashboard.export_documentation(found.id, output.format).await?;
            write_export(&output, "collection", &found.name, &text)?;
        }
    }
    Ok(())
}

async fn env(dashboard: &Dashboard, printer: Printer, cmd: EnvCommand) -> anyhow::Result<()> {
    match cmd {
        EnvCommand::Create {
            name,
            description,
            vars,
            activate,
        } => {
            let variables = vars
                .iter()
                .map(|v| parse_pair(v))
                .collect::<Result<BTreeMap<_, _>, _>>()?;
            let env = dashboard
                .create_environment(NewEnvironment {
                    name,
                    description,
                    variables,
                    is_active: activate,
                })
                .await?;
            println!("{}", printer.environment_row(&env));
        }
        EnvCommand::List => {
            let envs = dashboard.list_environments().await?;
            if envs.is_empty() {
                println!("No environments.");
            }
            for env in &envs {
                println!("{}", printer.environment_row(env));
            }
        }
        EnvCommand::Show { env, reveal } => {
            let found = match env {
                Some(reference) => Some(dashboard.environment(&reference).await?),
                None => dashboard.active_environment().await?,
            };
            match found {
                Some(env) => print!("{}", printer.environment_detail(&env, reveal)),
                None => println!("No environment is active."),
            }
        }
        EnvCommand::Activate { env } => {
            let env = dashboard.activate_environment(&env).await?;
            println!("Active environment: {}", env.name);
        }
        EnvCommand::Deactivate => {
            dashboard.deactivate_environments().await?;
            println!("No environment is active.");
        }
        EnvCommand::Set { env, assignments } => {
            let env = dashboard.set_variables(&env, &assignments).await?;
            print!("{}", printer.environment_detail(&env, false));
        }
        EnvCommand::Unset { env, keys } => {
            let env = dashboard.unset_variables(&env, &keys).await?;
            print!("{}", printer.environment_detail(&env, false));
        }
        EnvCommand::Import { file, name, activate } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("cannot read {}", file.display()))?;
            let env = dashboard
                .import_environment(&text, name.as_deref(), activate)
                .await?;
            println!(
                "Imported '{}' with {} variables.",
                env.name,
                env.variables.len()
            );
        }
        EnvCommand::Export { env, output } => {
            let text = dashboard
                .export_environment(env.as_deref(), output.format)
                .await?;
            let label = env.as_deref().unwrap_or("active");
            write_export(&output, "environment", label, &text)?;
        }
        EnvCommand::Delete { env } => {
            let env = dashboard.delete_environment(&env).await?;
            println!("Deleted '{}'.", env.name);
        }
    }
    Ok(())
}

async fn run(dashboard: &Dashboard, printer: Printer, args: RunArgs) -> anyhow::Result<()> {
    let doc = dashboard.find_documentation(&args.doc).await?;
    let mut request = dashboard
        .endpoint_request(doc.id, &args.method, &args.path)
        .await?;
    let (overrides, flags) = overrides(args.request)?;
    overrides.apply(&mut request);
    dispatch(dashboard, printer, &request, flags).await
}

async fn send(dashboard: &Dashboard, printer: Printer, args: SendArgs) -> anyhow::Result<()> {
    let mut request = match (args.from_curl, args.method, args.url) {
        (Some(command), _, _) => parse_curl(&command)?,
        (None, Some(method), Some(url)) => RequestSpec::new(method, url),
        _ => bail!("either METHOD URL or --from-curl is required"),
    };
    let (overrides, flags) = overrides(args.request)?;
    overrides.apply(&mut request);
    dispatch(dashboard, printer, &request, flags).await
}

#[derive(Debug, Clone, Copy)]
struct OutputFlags {
    curl: bool,
    dry_run: bool,
    include: bool,
}

fn overrides(args: RequestArgs) -> anyhow::Result<(RequestOverrides, OutputFlags)> {
    let headers = args
        .headers
        .iter()
        .map(|h| Header::parse(h))
        .collect::<Result<Vec<_>, _>>()?;
    let query = args
        .query
        .iter()
        .map(|q| parse_pair(q))
        .collect::<Result<Vec<_>, _>>()?;
    let body = args.body.as_deref().map(read_body).transpose()?;
    let auth = match (args.bearer, args.basic) {
        (Some(token), _) => Some(AuthType::Bearer(token)),
        (None, Some(pair)) => {
            let (username, password) = pair.split_once(':').unwrap_or((pair.as_str(), ""));
            Some(AuthType::Basic {
                username: username.to_string(),
                password: password.to_string(),
            })
        }
        (None, None) => None,
    };

    let flags = OutputFlags {
        curl: args.curl,
        dry_run: args.dry_run,
        include: args.include,
    };
    Ok((
        RequestOverrides {
            headers,
            query,
            body,
            auth,
        },
        flags,
    ))
}

/// JSON text becomes a structured body, anything else is sent verbatim
fn read_body(arg: &str) -> anyhow::Result<Value> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path))?,
        None => arg.to_string(),
    };
    Ok(serde_json::from_str::<Value>(&text)
        .ok()
        .filter(|v| v.is_object() || v.is_array())
        .unwrap_or(Value::String(text)))
}

async fn dispatch(
    dashboard: &Dashboard,
    printer: Printer,
    request: &RequestSpec,
    flags: OutputFlags,
) -> anyhow::Result<()> {
    if flags.dry_run {
        let preview = dashboard.preview(request).await?;
        println!("{}", preview.curl);
        warn_unresolved(&preview.unresolved);
        return Ok(());
    }

    let Execution {
        result,
        history_id,
        curl,
        unresolved,
        ..
    } = dashboard.execute(request).await?;
    warn_unresolved(&unresolved);
    if flags.curl {
        println!("{}\n", curl);
    }
    print!("{}", printer.result(&result, flags.include));
    eprintln!("(history #{})", history_id);
    Ok(())
}

fn warn_unresolved(tokens: &[String]) {
    if !tokens.is_empty() {
        eprintln!("warning: unresolved variables: {}", tokens.join(", "));
    }
}

async fn history(dashboard: &Dashboard, printer: Printer, cmd: HistoryCommand) -> anyhow::Result<()> {
    match cmd {
        HistoryCommand::List(args) => {
            let filter = history_filter(dashboard, args).await?;
            let entries = dashboard.list_history(&filter).await?;
            if entries.is_empty() {
                println!("No history.");
            }
            for entry in &entries {
                println!("{}", printer.history_row(entry));
            }
        }
        HistoryCommand::Show { id } => {
            let entry = dashboard.history_entry(id).await?;
            print!("{}", printer.history_detail(&entry));
        }
        HistoryCommand::Export { filter, output } => {
            let filter = history_filter(dashboard, filter).await?;
            let text = dashboard.export_history(&filter, output.format).await?;
            write_export(&output, "history", "requests", &text)?;
        }
        HistoryCommand::Clear { older_than_days } => {
            let cutoff = older_than_days.map(cutoff_before).transpose()?;
            let removed = dashboard.clear_history(cutoff).await?;
            println!("Removed {} entries.", removed);
        }
    }
    Ok(())
}

/// Cutoff for `history clear --older-than-days`; errors instead of overflowing
fn cutoff_before(days: i64) -> anyhow::Result<DateTime<Utc>> {
    if days < 0 {
        bail!("--older-than-days must not be negative");
    }
    TimeDelta::try_days(days)
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .with_context(|| format!("--older-than-days {} is out of range", days))
}

async fn history_filter(dashboard: &Dashboard, args: HistoryArgs) -> anyhow::Result<HistoryFilter> {
    let environment_id = match args.env {
        Some(reference) => Some(dashboard.environment(&reference).await?.id),
        None => None,
    };
    Ok(HistoryFilter {
        method: args.method,
        endpoint_contains: args.endpoint,
        status_class: args.status,
        environment_id,
        failed_only: args.failed,
        limit: args.limit,
    })
}

/// Writes to stdout, a file, or a timestamped file inside a directory
fn write_export(args: &ExportArgs, kind: &str, name: &str, text: &str) -> anyhow::Result<()> {
    let Some(output) = &args.output else {
        println!("{}", text);
        return Ok(());
    };
    let path = if output.is_dir() {
        output.join(export_filename(kind, name, args.format, Utc::now()))
    } else {
        output.clone()
    };
    write_file(&path, text)?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}

fn write_file(path: &Path, text: &str) -> anyhow::Result<()> {
    std::fs::write(path, text).with_context(|| format!("cannot write {}", path.display()))
}
