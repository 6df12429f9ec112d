//! mailrelay command-line entry point.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mailrelay_graph::{BodyType, Importance, StaticToken};
use mailrelay_mailer::{AttachmentSpec, Mailer, MailerConfig, SendRequest};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailrelay", version, about = "Send and fetch mail as a shared mailbox")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Mailbox to act as; overrides the configuration file
    #[arg(long, global = true, env = "MAILRELAY_MAILBOX")]
    mailbox: Option<String>,

    /// Configuration file to load instead of the default one
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Bearer token for the mail API
    #[arg(long, global = true, env = "MAILRELAY_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Send a message
    Send(SendArgs),
    /// Fetch a message by id and print it as JSON
    Get {
        id: String,
        /// Also list the message's attachments
        #[arg(long)]
        attachments: bool,
    },
}

#[derive(Args)]
struct SendArgs {
    /// Recipients, separated by ';' or ','
    #[arg(long)]
    to: String,
    #[arg(long, default_value = "")]
    cc: String,
    #[arg(long, default_value = "")]
    bcc: String,
    #[arg(long, default_value = "")]
    reply_to: String,
    #[arg(short, long, default_value = "")]
    subject: String,
    #[arg(short, long, default_value = "")]
    body: String,
    /// Treat the body as HTML
    #[arg(long)]
    html: bool,
    #[arg(long, value_enum)]
    importance: Option<ImportanceArg>,
    /// Local file to attach (repeatable)
    #[arg(long = "attach", value_name = "PATH")]
    attach: Vec<PathBuf>,
    /// Remote file to download and attach (repeatable)
    #[arg(long = "attach-url", value_name = "URL")]
    attach_url: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ImportanceArg {
    Low,
    Normal,
    High,
}

impl From<ImportanceArg> for Importance {
    fn from(arg: ImportanceArg) -> Self {
        match arg {
            ImportanceArg::Low => Importance::Low,
            ImportanceArg::Normal => Importance::Normal,
            ImportanceArg::High => Importance::High,
        }
    }
}

impl SendArgs {
    fn into_request(self) -> SendRequest {
        let attachments = self
            .attach
            .into_iter()
            .map(AttachmentSpec::from_path)
            .chain(self.attach_url.into_iter().map(AttachmentSpec::from_url))
            .collect();

        SendRequest {
            to: self.to,
            cc: self.cc,
            bcc: self.bcc,
            reply_to: self.reply_to,
            subject: self.subject,
            body: self.body,
            body_type: if self.html {
                BodyType::Html
            } else {
                BodyType::Text
            },
            importance: self.importance.map(Importance::from),
            attachments,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the JSON output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_from(path)?,
        None => config::load()?,
    };
    if let Some(mailbox) = cli.mailbox {
        config.mailbox = mailbox;
    }
    anyhow::ensure!(
        !config.mailbox.trim().is_empty(),
        "no mailbox configured; pass --mailbox or set it in the configuration file"
    );
    let token = cli
        .token
        .ok_or_else(|| anyhow::anyhow!("no token; set MAILRELAY_TOKEN or pass --token"))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        mailbox = %config.mailbox,
        "starting mailrelay"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli.command, config, token))
}

async fn run(command: Command, config: MailerConfig, token: String) -> anyhow::Result<()> {
    let mailer = Mailer::graph(config, Arc::new(StaticToken::new(token)))?;

    let output = match command {
        Command::Send(args) => {
            let sent = mailer.send(args.into_request()).await?;
            serde_json::to_string_pretty(&sent)?
        }
        Command::Get { id, attachments } => {
            let message = mailer.get_message(&id, attachments).await?;
            serde_json::to_string_pretty(&message)?
        }
    };
    println!("{output}");
    Ok(())
}
