use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use servicedeck_client::ApiClient;
use shared::types::{ProbeStatus, ServiceInput};

#[derive(Parser)]
#[command(name = "servicedeck", about = "Manage and check a servicedeck dashboard")]
struct Cli {
    /// Server root URL
    #[arg(long, env = "SERVICEDECK_URL", default_value = "http://localhost:3001")]
    url: String,

    #[arg(long, env = "SERVICEDECK_USERNAME", default_value = "admin")]
    username: String,

    #[arg(long, env = "SERVICEDECK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the daemon is reachable
    Health,
    /// Show whether the supplied credentials are accepted
    Status,
    /// List registered services
    List,
    /// Probe every service and print its status
    Statuses {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Register a new service
    Add(ServiceArgs),
    /// Replace an existing service
    Update {
        id: String,
        #[command(flatten)]
        service: ServiceArgs,
    },
    /// Delete a service
    Remove { id: String },
}

#[derive(Args)]
struct ServiceArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    url: String,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    icon: Option<String>,
}

impl From<ServiceArgs> for ServiceInput {
    fn from(args: ServiceArgs) -> Self {
        ServiceInput {
            name: Some(args.name),
            url: Some(args.url),
            category: args.category,
            icon: args.icon,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = ApiClient::new(&cli.url).context("Failed to build HTTP client")?;

    match cli.command {
        Command::Health => print_json(&client.health().await?),
        Command::Status => {
            login(&client, &cli.username, cli.password.as_deref()).await?;
            print_json(&client.auth_status().await?)
        }
        Command::List => print_json(&client.list_services().await?),
        Command::Statuses { json } => {
            let snapshots = client.service_statuses().await?;
            if json {
                return print_json(&snapshots);
            }
            for s in &snapshots {
                let state = match s.status {
                    ProbeStatus::Up => "UP".to_string(),
                    ProbeStatus::Down => match (&s.status_code, &s.error) {
                        (Some(code), _) => format!("DOWN ({})", code),
                        (None, Some(err)) => format!("DOWN ({})", err),
                        (None, None) => "DOWN".to_string(),
                    },
                };
                println!("{:<20} {:<24} {}", s.service.name, state, s.service.url);
            }
            Ok(())
        }
        Command::Add(service) => {
            login(&client, &cli.username, cli.password.as_deref()).await?;
            print_json(&client.create_service(&service.into()).await?)
        }
        Command::Update { id, service } => {
            login(&client, &cli.username, cli.password.as_deref()).await?;
            print_json(&client.update_service(&id, &service.into()).await?)
        }
        Command::Remove { id } => {
            login(&client, &cli.username, cli.password.as_deref()).await?;
            client.delete_service(&id).await?;
            println!("Deleted {}", id);
            Ok(())
        }
    }
}

async fn login(client: &ApiClient, username: &str, password: Option<&str>) -> Result<()> {
    let password = password.context("--password or SERVICEDECK_PASSWORD is required")?;
    client
        .login(username, password)
        .await
        .with_context(|| format!("Login as {} failed", username))?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
