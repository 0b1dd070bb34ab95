use clap::{Parser, Subcommand};
use docflow_core::{
    config::Config,
    factory::AppRegistry,
    model::AskRequest,
    stream::OutboundUnit,
};
use futures_util::StreamExt;

#[derive(Parser)]
#[command(author, version, about = "docflow CLI smoke tool", long_about = None)]
struct Cli {
    /// Path to a JSON or TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question in blocking mode (prints the final result only)
    Ask {
        #[arg(long, help = "Upstream app name (workflow|chatflow|null)")]
        app: Option<String>,
        #[arg(short, long, help = "The question to send")]
        question: String,
        #[arg(short, long, default_value = "human-user")]
        user: String,
        #[arg(long, default_value = "", help = "Continuity token; empty starts a new conversation")]
        conversation_id: String,
    },
    /// Ask a question in live mode (prints chunks as they arrive, then the sentinel line)
    AskStream {
        #[arg(long, help = "Upstream app name (workflow|chatflow|null)")]
        app: Option<String>,
        #[arg(short, long, help = "The question to send")]
        question: String,
        #[arg(short, long, default_value = "human-user")]
        user: String,
        #[arg(long, default_value = "")]
        conversation_id: String,
    },
}

fn default_app(reg: &AppRegistry) -> String {
    if reg.get("chatflow").is_some() {
        "chatflow".into()
    } else if reg.get("workflow").is_some() {
        "workflow".into()
    } else {
        "null".into()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    let reg = AppRegistry::from_config(&cfg)?;

    match cli.command {
        Commands::Ask {
            app,
            question,
            user,
            conversation_id,
        } => {
            let app = app.unwrap_or_else(|| default_app(&reg));
            let provider = reg
                .get(&app)
                .ok_or_else(|| anyhow::anyhow!("app '{app}' is not configured"))?;
            let mut req = AskRequest::new(question, user);
            req.conversation_id = conversation_id;
            let payload = provider.ask(req).await?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Commands::AskStream {
            app,
            question,
            user,
            conversation_id,
        } => {
            let app = app.unwrap_or_else(|| default_app(&reg));
            let provider = reg
                .get(&app)
                .ok_or_else(|| anyhow::anyhow!("app '{app}' is not configured"))?;
            let mut req = AskRequest::new(question, user);
            req.conversation_id = conversation_id;

            let mut stream = provider.ask_stream(req).await?;
            use std::io::{self, Write};
            let mut saw_chunk = false;
            while let Some(unit) = stream.next().await {
                match unit {
                    OutboundUnit::Chunk(txt) => {
                        saw_chunk = true;
                        print!("{}", txt);
                        io::stdout().flush().ok();
                    }
                    terminal => {
                        if saw_chunk {
                            println!();
                        }
                        println!("{}", terminal.encode());
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
