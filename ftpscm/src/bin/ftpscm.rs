use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::instrument;

use common::credentials::{CredentialResolver, InMemoryCredentialStore};
use common::profile::{JsonProfileStore, ServerProfile};
use common::registry::ServerRegistry;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ftpscm",
    version,
    about = "Check out files from registered FTP servers into a build workspace",
    long_about = "`ftpscm` downloads a list of files from a directory on a registered FTP server into a local workspace.

EXAMPLE:
    # Register a server, then check out two files into ./workspace
    ftpscm servers add --name release --host 10.0.0.5 --port 21 --credentials-id release-ftp
    ftpscm --credentials creds.json checkout --server release --remote-path /pub --files \"a.txt,b.txt\" --clean ./workspace

The checkout fails as soon as one file cannot be downloaded; files downloaded before it are kept."
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    // Configuration
    /// Server registry file, created on first `servers add`
    #[arg(
        long,
        value_name = "FILE",
        default_value = "ftpscm-servers.json",
        global = true,
        help_heading = "Configuration"
    )]
    registry: std::path::PathBuf,

    /// Credentials file: {"credentials": [{"id", "username", "password"}]}
    ///
    /// Without it every server is logged into anonymously.
    #[arg(long, value_name = "FILE", global = true, help_heading = "Configuration")]
    credentials: Option<std::path::PathBuf>,

    // Network
    /// Time limit for opening control and data connections
    ///
    /// This option accepts a human readable duration, e.g. "200ms", "10s", "5min" etc.
    #[arg(
        long,
        default_value = "30s",
        value_name = "DURATION",
        value_parser = humantime::parse_duration,
        global = true,
        help_heading = "Network"
    )]
    connect_timeout: std::time::Duration,

    /// Time limit for each command and its reply
    #[arg(
        long,
        default_value = "60s",
        value_name = "DURATION",
        value_parser = humantime::parse_duration,
        global = true,
        help_heading = "Network"
    )]
    command_timeout: std::time::Duration,

    /// Time limit for each file transfer
    #[arg(
        long,
        default_value = "10min",
        value_name = "DURATION",
        value_parser = humantime::parse_duration,
        global = true,
        help_heading = "Network"
    )]
    transfer_timeout: std::time::Duration,

    // Progress & output
    /// Verbose level: -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    ///
    /// Checkout progress lines are always printed unless --quiet is set.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true, help_heading = "Progress & output")]
    verbose: u8,

    /// Print summary at the end of a checkout
    #[arg(long, global = true, help_heading = "Progress & output")]
    summary: bool,

    /// Quiet mode, don't report errors or progress
    #[arg(short = 'q', long = "quiet", global = true, help_heading = "Progress & output")]
    quiet: bool,

    // Advanced settings
    /// Number of worker threads, 0 means number of cores
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        global = true,
        help_heading = "Advanced settings"
    )]
    max_workers: usize,

    /// Number of blocking worker threads, 0 means Tokio runtime default (512)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        global = true,
        help_heading = "Advanced settings"
    )]
    max_blocking_threads: usize,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Download files from a registered server into WORKSPACE
    Checkout {
        /// Name of the registered server
        #[arg(long, value_name = "NAME")]
        server: String,

        /// Remote directory holding the files
        #[arg(long, value_name = "PATH")]
        remote_path: String,

        /// Comma separated file names, e.g. "a.txt,b.txt"
        #[arg(long, value_name = "LIST")]
        files: String,

        /// Delete everything in WORKSPACE before downloading
        #[arg(long)]
        clean: bool,

        /// Write an empty changelog to this file
        #[arg(long, value_name = "FILE")]
        changelog: Option<std::path::PathBuf>,

        /// Local directory the files are written to
        workspace: std::path::PathBuf,
    },

    /// Check that a server accepts a login
    TestConnection {
        /// IPv4 address of the server
        #[arg(long)]
        host: String,

        #[arg(long)]
        port: String,

        /// Credential id to log in with; anonymous when empty or unknown
        #[arg(long, value_name = "ID", default_value = "")]
        credentials_id: String,
    },

    /// Manage the server registry
    Servers {
        #[command(subcommand)]
        action: ServersCommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
enum ServersCommand {
    /// Print every registered server
    List,

    /// Register a server
    Add {
        #[arg(long)]
        name: String,

        /// IPv4 address of the server
        #[arg(long)]
        host: String,

        #[arg(long)]
        port: String,

        /// Credential id used to log in; anonymous when empty
        #[arg(long, value_name = "ID", default_value = "")]
        credentials_id: String,
    },
}

enum Report {
    Checkout(ftpscm::SyncSummary),
    Message(String),
    Servers(Arc<[ServerProfile]>),
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Report::Checkout(summary) => write!(f, "{summary}"),
            Report::Message(message) => write!(f, "{message}"),
            Report::Servers(profiles) if profiles.is_empty() => write!(f, "no servers registered"),
            Report::Servers(profiles) => {
                let lines: Vec<String> = profiles
                    .iter()
                    .map(|profile| format!("{} {}", profile.name, profile.address()))
                    .collect();
                write!(f, "{}", lines.join("\n"))
            }
        }
    }
}

fn credential_resolver(path: Option<&std::path::Path>) -> Result<CredentialResolver> {
    match path {
        Some(path) => {
            let store = InMemoryCredentialStore::from_json_file(path)?;
            Ok(CredentialResolver::new(Arc::new(store)))
        }
        None => Ok(CredentialResolver::empty()),
    }
}

#[instrument(skip(args))]
async fn async_main(args: Args) -> Result<Report> {
    let config = remote::ConnectConfig {
        connect_timeout: args.connect_timeout,
        command_timeout: args.command_timeout,
        transfer_timeout: args.transfer_timeout,
    };
    let credentials = credential_resolver(args.credentials.as_deref())?;
    let store = Arc::new(JsonProfileStore::new(&args.registry));
    let registry = Arc::new(
        ServerRegistry::load(store)
            .with_context(|| format!("failed loading server registry {:?}", args.registry))?,
    );
    match args.command {
        Command::Checkout {
            server,
            remote_path,
            files,
            clean,
            changelog,
            workspace,
        } => {
            let mut request = ftpscm::SyncRequest::new(server, remote_path, workspace)
                .files(ftpscm::parse_file_list(&files))
                .clean_workspace_first(clean);
            if let Some(changelog) = changelog {
                request = request.changelog(changelog);
            }
            let summary = ftpscm::Synchronizer::new(registry, credentials)
                .with_config(config)
                .synchronize(&request)
                .await?;
            Ok(Report::Checkout(summary))
        }
        Command::TestConnection {
            host,
            port,
            credentials_id,
        } => {
            let message =
                ftpscm::test_connection(&host, &port, &credentials_id, &credentials, &config)
                    .await?;
            Ok(Report::Message(message))
        }
        Command::Servers {
            action: ServersCommand::List,
        } => Ok(Report::Servers(registry.list())),
        Command::Servers {
            action:
                ServersCommand::Add {
                    name,
                    host,
                    port,
                    credentials_id,
                },
        } => {
            let profile = ServerProfile::new(name, host, port, credentials_id);
            let added = profile.to_string();
            registry.add(profile, &credentials)?;
            Ok(Report::Message(format!("added {added}")))
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let is_checkout = matches!(args.command, Command::Checkout { .. });
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        // everything but a checkout exists to print its result
        print_summary: args.summary || !is_checkout,
    };
    let runtime = common::RuntimeConfig {
        max_workers: args.max_workers,
        max_blocking_threads: args.max_blocking_threads,
    };
    let func = {
        let args = args.clone();
        || async_main(args)
    };
    let res = common::run(output, runtime, func);
    if res.is_none() {
        std::process::exit(1);
    }
    Ok(())
}
