use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cloudgraph::api::{format_api_error, ApiClient, Provider};
use cloudgraph::aws::auth::BearerSigner;
use cloudgraph::aws::client::AwsClient;
use cloudgraph::collector::{collector_for, collectors, CollectionPass};
use cloudgraph::config::Config;
use cloudgraph::k8s::client::KubeClient;
use cloudgraph::resource::cloudtrail::arn_region;
use cloudgraph::resource::{get_resource, ResourceNode};
use cloudgraph::VERSION;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Collect cloud resources into a typed resource graph
#[derive(Parser, Debug)]
#[command(name = "cloudgraph", version = VERSION, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Run in read-only mode (block all write operations)
    #[arg(long, global = true)]
    readonly: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a collection pass and print the graph
    Collect {
        /// AWS region to collect (repeatable)
        #[arg(short, long = "region")]
        regions: Vec<String>,

        /// Resource kind to collect (repeatable, default all)
        #[arg(short, long = "kind")]
        kinds: Vec<String>,

        /// Worker pool size
        #[arg(short, long)]
        workers: Option<usize>,

        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Write the graph to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include the raw API JSON of every node
        #[arg(long)]
        raw: bool,
    },

    /// List the API operations each collector may call
    Apis {
        /// Only this resource kind
        #[arg(short, long)]
        kind: Option<String>,

        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Add or overwrite a tag (label) on a resource
    Tag {
        #[command(flatten)]
        target: Target,
        key: String,
        value: String,
    },

    /// Remove a tag (label) from a resource
    Untag {
        #[command(flatten)]
        target: Target,
        key: String,
    },

    /// Delete a resource
    Delete {
        #[command(flatten)]
        target: Target,
    },

    /// Show or update the stored configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

/// The resource a mutator acts on
#[derive(clap::Args, Debug)]
struct Target {
    /// Resource kind, e.g. aws_cloud_trail
    #[arg(short, long)]
    kind: String,

    /// Trail ARN, or namespace/name for deployments
    #[arg(short, long)]
    id: String,

    /// AWS region the resource lives in (default: the ARN's region)
    #[arg(short, long)]
    region: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Store the default AWS regions
    SetRegions { regions: Vec<String> },
    /// Store the worker pool size
    SetWorkers { workers: usize },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("cloudgraph started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("cloudgraph").join("cloudgraph.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".cloudgraph").join("cloudgraph.log");
    }
    PathBuf::from("cloudgraph.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);
    let mut config = Config::load();

    let result = match args.command {
        Command::Collect {
            regions,
            kinds,
            workers,
            format,
            output,
            raw,
        } => collect(&config, &regions, &kinds, workers, format, output, raw).await,
        Command::Apis { kind, format } => list_apis(kind.as_deref(), format),
        Command::Tag { target, key, value } => {
            mutate(&config, args.readonly, &target, Mutation::Tag(&key, &value)).await
        }
        Command::Untag { target, key } => {
            mutate(&config, args.readonly, &target, Mutation::Untag(&key)).await
        }
        Command::Delete { target } => mutate(&config, args.readonly, &target, Mutation::Delete).await,
        Command::Config { action } => configure(&mut config, action),
    };

    if let Err(err) = &result {
        tracing::error!("{:#}", err);
        eprintln!("Error: {}", format_api_error(err));
        std::process::exit(1);
    }

    Ok(())
}

fn aws_clients(config: &Config, regions: &[String]) -> Result<Vec<Arc<dyn ApiClient>>> {
    let signer = BearerSigner::from_config(config.aws_token.as_deref());
    let mut clients: Vec<Arc<dyn ApiClient>> = Vec::new();
    for region in config.effective_regions(regions) {
        let client = AwsClient::new(&region, config.aws_endpoint.as_deref(), signer.clone())
            .with_context(|| format!("Failed to create AWS client for {}", region))?;
        clients.push(Arc::new(client));
    }
    Ok(clients)
}

fn kube_client(config: &Config) -> Result<Option<Arc<dyn ApiClient>>> {
    let Some(kubernetes) = config.effective_kubernetes() else {
        return Ok(None);
    };

    let cluster = kubernetes.effective_cluster_name();
    let mut client = KubeClient::new(&kubernetes.server, kubernetes.effective_token()?, &cluster)
        .with_context(|| format!("Failed to create Kubernetes client for {}", cluster))?;
    if let Some(pem) = kubernetes.ca_pem()? {
        client = client
            .with_root_certificate(&pem)
            .with_context(|| format!("Invalid CA certificate for {}", cluster))?;
    }
    Ok(Some(Arc::new(client)))
}

async fn collect(
    config: &Config,
    regions: &[String],
    kinds: &[String],
    workers: Option<usize>,
    format: OutputFormat,
    output: Option<PathBuf>,
    raw: bool,
) -> Result<()> {
    let pass = CollectionPass::new(kinds)?;
    let wants = |provider: Provider| pass.collectors().iter().any(|c| c.provider() == provider);

    let mut clients = Vec::new();
    if wants(Provider::Aws) {
        clients.extend(aws_clients(config, regions)?);
    }
    if wants(Provider::Kubernetes) {
        match kube_client(config)? {
            Some(client) => clients.push(client),
            None if kinds.is_empty() => {
                tracing::info!("No Kubernetes cluster configured, skipping Kubernetes kinds");
            }
            None => anyhow::bail!("Kubernetes kinds requested but no cluster is configured"),
        }
    }

    let mut snapshot = pass.run(clients, config.effective_workers(workers)).await;
    if !raw {
        for node in &mut snapshot.nodes {
            node.raw = serde_json::Value::Null;
        }
    }
    if !snapshot.failures.is_empty() {
        eprintln!(
            "Collected with {} failure(s); see the failures section of the output",
            snapshot.failures.len()
        );
    }

    emit(&snapshot, format, output)
}

fn emit<T: Serialize>(value: &T, format: OutputFormat, output: Option<PathBuf>) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };

    match output {
        Some(path) => std::fs::write(&path, rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => writeln!(std::io::stdout(), "{}", rendered)?,
    }
    Ok(())
}

#[derive(Serialize)]
struct DeclaredApis {
    kind: &'static str,
    display_name: String,
    provider: String,
    collect: Vec<String>,
    mutate: Vec<String>,
}

fn list_apis(kind: Option<&str>, format: OutputFormat) -> Result<()> {
    let selected = match kind {
        Some(kind) => vec![collector_for(kind).with_context(|| format!("Unknown resource kind '{}'", kind))?],
        None => collectors().to_vec(),
    };

    let apis: Vec<DeclaredApis> = selected
        .into_iter()
        .map(|c| DeclaredApis {
            kind: c.kind(),
            display_name: get_resource(c.kind())
                .map(|def| def.display_name.clone())
                .unwrap_or_default(),
            provider: c.provider().to_string(),
            collect: c.collect_apis().iter().map(ToString::to_string).collect(),
            mutate: c.mutator_apis().iter().map(ToString::to_string).collect(),
        })
        .collect();

    emit(&apis, format, None)
}

enum Mutation<'a> {
    Tag(&'a str, &'a str),
    Untag(&'a str),
    Delete,
}

async fn mutate(config: &Config, readonly: bool, target: &Target, mutation: Mutation<'_>) -> Result<()> {
    if readonly {
        anyhow::bail!("Write operations are blocked in read-only mode");
    }

    let resource = ResourceNode::from_reference(&target.kind, &target.id)?;
    let client: Arc<dyn ApiClient> = match collector_for(&target.kind).map(|c| c.provider()) {
        Some(Provider::Kubernetes) => kube_client(config)?
            .context("No Kubernetes cluster is configured")?,
        _ => {
            let region = target
                .region
                .clone()
                .or_else(|| arn_region(&target.id).map(str::to_string));
            let regions: Vec<String> = region.into_iter().collect();
            aws_clients(config, &regions)?
                .into_iter()
                .next()
                .context("No AWS region configured")?
        }
    };

    tracing::info!("{} {} {} in {}", mutation.verb(), target.kind, target.id, client.scope());
    let done = match mutation {
        Mutation::Tag(key, value) => resource.update_resource_tag(client.as_ref(), key, value).await?,
        Mutation::Untag(key) => resource.delete_resource_tag(client.as_ref(), key).await?,
        Mutation::Delete => resource.delete_resource(client.as_ref()).await?,
    };

    if done {
        println!("{} {}: done", target.kind, target.id);
    } else {
        println!("{} {}: not supported for this kind", target.kind, target.id);
    }
    Ok(())
}

impl Mutation<'_> {
    fn verb(&self) -> &'static str {
        match self {
            Mutation::Tag(..) => "Tagging",
            Mutation::Untag(..) => "Untagging",
            Mutation::Delete => "Deleting",
        }
    }
}

fn configure(config: &mut Config, action: Option<ConfigAction>) -> Result<()> {
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            if let Some(path) = Config::config_path() {
                eprintln!("# {}", path.display());
            }
            emit(&*config, OutputFormat::Json, None)
        }
        ConfigAction::SetRegions { regions } => config.set_regions(regions),
        ConfigAction::SetWorkers { workers } => {
            config.workers = Some(workers);
            config.save()
        }
    }
}
