//! mcp-rule CLI - MCP server and command-line access to the Rule.io API.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rule_api::RuleClientFactory;
use rule_core::{
    ClientFactory, Config, CreateCustomFieldInput, CreateSubscriberInput, CustomField, Error,
    ListFilter, RuleProvider, Subscriber, Tag, UpdateSubscriberInput, DEFAULT_LIMIT, DEFAULT_PAGE,
};
use rule_mcp::{ContextProvider, McpServer, ToolHandler};
use rule_storage::{
    api_key_entry, resolve_api_key, CredentialStore, KeySource, KeychainStore, API_KEY_ENV,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mcp-rule")]
#[command(author, version, about = "Rule.io email marketing over MCP", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Rule.io API key (falls back to RULE_API_KEY, then the keychain)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// API base URL override
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Print raw JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server on stdin/stdout (default)
    Serve,

    /// Manage subscribers
    Subscribers {
        #[command(subcommand)]
        command: SubscriberCommands,
    },

    /// Manage tags
    Tags {
        #[command(subcommand)]
        command: TagCommands,
    },

    /// Inspect campaigns
    Campaigns {
        #[command(subcommand)]
        command: CampaignCommands,
    },

    /// Manage custom fields
    Fields {
        #[command(subcommand)]
        command: FieldCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Manage the stored API key
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(clap::Args)]
struct PageArgs {
    /// Page number
    #[arg(long, default_value_t = DEFAULT_PAGE, value_parser = clap::value_parser!(u32).range(1..))]
    page: u32,

    /// Page size
    #[arg(long, default_value_t = DEFAULT_LIMIT, value_parser = clap::value_parser!(u32).range(1..))]
    limit: u32,
}

impl PageArgs {
    fn filter(&self) -> ListFilter {
        ListFilter {
            page: self.page,
            limit: self.limit,
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum SubscriberCommands {
    /// List subscribers
    List {
        #[command(flatten)]
        paging: PageArgs,

        /// Extra filter passed to the API (repeatable)
        #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,
    },

    /// Get a subscriber by id or email
    Get { id: String },

    /// Create a subscriber
    Create {
        #[arg(long)]
        email: String,

        /// Tag to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Custom field value (repeatable, JSON values accepted)
        #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Update a subscriber
    Update {
        id: String,

        #[arg(long)]
        email: Option<String>,

        /// Replace tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Custom field value (repeatable, JSON values accepted)
        #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Delete a subscriber
    Delete { id: String },
}

#[derive(Subcommand)]
enum TagCommands {
    /// List tags
    List {
        #[command(flatten)]
        paging: PageArgs,
    },
    /// Create a tag
    Create { name: String },
}

#[derive(Subcommand)]
enum CampaignCommands {
    /// List campaigns
    List {
        #[command(flatten)]
        paging: PageArgs,
    },
}

#[derive(Subcommand)]
enum FieldCommands {
    /// List custom field definitions
    List {
        #[command(flatten)]
        paging: PageArgs,
    },
    /// Create a custom field definition
    Create {
        name: String,

        /// Field type (e.g. text, number, date)
        #[arg(long = "type")]
        field_type: String,

        /// Default value (JSON accepted)
        #[arg(long = "default")]
        default_value: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Get a configuration value (e.g. rule.base_url)
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// Print the configuration file path
    Path,
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Store the API key in the OS keychain
    Set { api_key: String },
    /// Remove the API key from the OS keychain
    Clear,
    /// Show where the API key is resolved from
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    match cli.command {
        None | Some(Commands::Serve) => serve(&cli).await,
        Some(Commands::Subscribers { ref command }) => subscribers(&cli, command).await,
        Some(Commands::Tags { ref command }) => tags(&cli, command).await,
        Some(Commands::Campaigns {
            command: CampaignCommands::List { ref paging },
        }) => {
            let client = connect(&cli)?;
            let campaigns = client.get_campaigns(paging.filter()).await?;
            if cli.json {
                return print_json(&campaigns);
            }
            if campaigns.is_empty() {
                println!("No campaigns found");
            }
            for c in &campaigns {
                println!(
                    "{}\t{}\t{}",
                    c.id,
                    c.name,
                    c.status.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
        Some(Commands::Fields { ref command }) => fields(&cli, command).await,
        Some(Commands::Config { ref command }) => config(&cli, command),
        Some(Commands::Auth { ref command }) => auth(&cli, command),
    }
}

/// Logs go to stderr; stdout carries MCP traffic and command output.
fn init_logging(cli: &Cli) {
    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (None | Some(Commands::Serve), false) => "info",
        _ => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> anyhow::Result<Config> {
    Config::load().context("Failed to load configuration")
}

/// Client factory honouring `--base-url` and the config file.
fn factory(cli: &Cli) -> anyhow::Result<RuleClientFactory> {
    let config = load_config()?;
    let mut factory = RuleClientFactory::new().with_timeout(config.timeout());
    if let Some(url) = cli.base_url.as_deref().or(config.base_url()) {
        factory = factory.with_base_url(url);
    }
    Ok(factory)
}

fn api_key(cli: &Cli) -> Option<(String, KeySource)> {
    let env_value = std::env::var(API_KEY_ENV).ok();
    resolve_api_key(
        cli.api_key.as_deref(),
        env_value.as_deref(),
        &KeychainStore::new(),
    )
}

fn connect(cli: &Cli) -> anyhow::Result<Arc<dyn RuleProvider>> {
    let (key, source) = api_key(cli).ok_or_else(|| {
        Error::Unauthorized(format!(
            "No API key configured. Pass --api-key, set {}, or run `mcp-rule auth set <key>`",
            API_KEY_ENV
        ))
    })?;
    tracing::debug!(source = %source, "Using API key");
    Ok(factory(cli)?.connect(&key)?)
}

async fn serve(cli: &Cli) -> anyhow::Result<()> {
    let default_key = match api_key(cli) {
        Some((key, source)) => {
            tracing::info!(source = %source, "Using default API key");
            Some(key)
        }
        None => {
            tracing::info!("No default API key; every request must carry its own");
            None
        }
    };

    let provider = ContextProvider::new(Arc::new(factory(cli)?));
    let handler = ToolHandler::new(provider).with_default_api_key(default_key);
    McpServer::new(handler).run().await?;
    Ok(())
}

async fn subscribers(cli: &Cli, command: &SubscriberCommands) -> anyhow::Result<()> {
    let client = connect(cli)?;

    match command {
        SubscriberCommands::List { paging, filters } => {
            let mut filter = paging.filter();
            filter.filters.extend(filters.iter().cloned());
            let subscribers = client.get_subscribers(filter).await?;
            if cli.json {
                return print_json(&subscribers);
            }
            if subscribers.is_empty() {
                println!("No subscribers found");
            }
            for s in &subscribers {
                println!("{}\t{}\t{}", s.id, s.email, s.tags.join(","));
            }
        }
        SubscriberCommands::Get { id } => {
            let subscriber = client.get_subscriber(id).await?;
            print_subscriber(cli, &subscriber)?;
        }
        SubscriberCommands::Create {
            email,
            tags,
            fields,
        } => {
            let input = CreateSubscriberInput {
                email: email.clone(),
                tags: tags.clone(),
                fields: field_values(fields),
            };
            let subscriber = client.create_subscriber(input).await?;
            print_subscriber(cli, &subscriber)?;
        }
        SubscriberCommands::Update {
            id,
            email,
            tags,
            fields,
        } => {
            let input = UpdateSubscriberInput {
                email: email.clone(),
                tags: (!tags.is_empty()).then(|| tags.clone()),
                fields: (!fields.is_empty()).then(|| field_values(fields)),
            };
            let subscriber = client.update_subscriber(id, input).await?;
            print_subscriber(cli, &subscriber)?;
        }
        SubscriberCommands::Delete { id } => {
            client.delete_subscriber(id).await?;
            if cli.json {
                return print_json(&serde_json::json!({ "success": true }));
            }
            println!("Deleted subscriber {}", id);
        }
    }
    Ok(())
}

async fn tags(cli: &Cli, command: &TagCommands) -> anyhow::Result<()> {
    let client = connect(cli)?;

    match command {
        TagCommands::List { paging } => {
            let tags = client.get_tags(paging.filter()).await?;
            if cli.json {
                return print_json(&tags);
            }
            if tags.is_empty() {
                println!("No tags found");
            }
            for tag in &tags {
                print_tag(tag);
            }
        }
        TagCommands::Create { name } => {
            let tag = client.create_tag(name).await?;
            if cli.json {
                return print_json(&tag);
            }
            print_tag(&tag);
        }
    }
    Ok(())
}

async fn fields(cli: &Cli, command: &FieldCommands) -> anyhow::Result<()> {
    let client = connect(cli)?;

    match command {
        FieldCommands::List { paging } => {
            let fields = client.get_custom_fields(paging.filter()).await?;
            if cli.json {
                return print_json(&fields);
            }
            if fields.is_empty() {
                println!("No custom fields found");
            }
            for field in &fields {
                print_field(field);
            }
        }
        FieldCommands::Create {
            name,
            field_type,
            default_value,
        } => {
            let input = CreateCustomFieldInput {
                name: name.clone(),
                field_type: field_type.clone(),
                default_value: default_value.as_deref().map(json_or_string),
            };
            let field = client.create_custom_field(input).await?;
            if cli.json {
                return print_json(&field);
            }
            print_field(&field);
        }
    }
    Ok(())
}

fn config(cli: &Cli, command: &ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = load_config()?;
            if cli.json {
                return print_json(&config);
            }
            println!("# {}", Config::config_path()?.display());
            for key in ["rule.base_url", "rule.timeout_secs"] {
                let value = config.get(key)?;
                println!("{} = {}", key, value.as_deref().unwrap_or("(not set)"));
            }
        }
        ConfigCommands::Get { key } => match load_config()?.get(key)? {
            Some(value) => println!("{}", value),
            None => println!("(not set)"),
        },
        ConfigCommands::Set { key, value } => {
            let mut config = load_config()?;
            config.set(key, value)?;
            config.save()?;
            println!("Set {} = {}", key, value);
        }
        ConfigCommands::Path => println!("{}", Config::config_path()?.display()),
    }
    Ok(())
}

fn auth(cli: &Cli, command: &AuthCommands) -> anyhow::Result<()> {
    let store = KeychainStore::new();

    match command {
        AuthCommands::Set { api_key } => {
            if api_key.trim().is_empty() {
                anyhow::bail!("API key must not be empty");
            }
            store.store(&api_key_entry(), api_key.trim())?;
            println!("API key stored in keychain");
        }
        AuthCommands::Clear => {
            store.delete(&api_key_entry())?;
            println!("API key removed from keychain");
        }
        AuthCommands::Status => match api_key(cli) {
            Some((key, source)) => println!("API key {} (from {})", mask(&key), source),
            None => println!(
                "No API key configured (use --api-key, {} or `mcp-rule auth set`)",
                API_KEY_ENV
            ),
        },
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_subscriber(cli: &Cli, s: &Subscriber) -> anyhow::Result<()> {
    if cli.json {
        return print_json(s);
    }
    println!("id:     {}", s.id);
    println!("email:  {}", s.email);
    if let Some(status) = &s.status {
        println!("status: {}", status);
    }
    if !s.tags.is_empty() {
        println!("tags:   {}", s.tags.join(", "));
    }
    for (name, value) in &s.fields {
        println!("{}: {}", name, value);
    }
    Ok(())
}

fn print_tag(tag: &Tag) {
    println!("{}\t{}\t{} subscribers", tag.id, tag.name, tag.subscriber_count);
}

fn print_field(field: &CustomField) {
    println!("{}\t{}\t{}", field.id, field.name, field.field_type);
}

/// Show only the last four characters of a secret.
fn mask(key: &str) -> String {
    let tail: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{}", tail)
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Parse a value as JSON, falling back to a plain string.
fn json_or_string(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn field_values(pairs: &[(String, String)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.clone(), json_or_string(v)))
        .collect()
}
