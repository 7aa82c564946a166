use clap::{Parser, Subcommand};
use lyra_core::LyraConfig;
use lyra_gateway::GatewayServer;
use lyra_reasoning::Orchestrator;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lyra", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "lyra.toml", env = "LYRA_CONFIG")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP gateway
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Interactive prompt loop on stdin (default)
    Chat {
        /// Simulation step (overrides config)
        #[arg(long)]
        dt: Option<f64>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.log_json);

    info!("Loading config from {}...", args.config.display());
    let mut config = LyraConfig::load_or_default(&args.config);

    match args.command.unwrap_or(Command::Chat { dt: None }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            let (host, port) = (config.gateway.host.clone(), config.gateway.port);
            let core = Orchestrator::from_config(config)?;
            GatewayServer::new(core, &host, port).serve().await
        }
        Command::Chat { dt } => {
            if let Some(dt) = dt {
                config.simulation.dt = dt;
            }
            let core = Orchestrator::from_config(config)?;
            chat(core).await
        }
    }
}

async fn chat(mut core: Orchestrator) -> anyhow::Result<()> {
    println!("Lyra online. Type 'status' for module states, 'quit' to exit.");
    print!(">> ");
    io::stdout().flush()?;

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let trimmed = input.trim();

        match trimmed {
            "quit" | "exit" => break,
            "" => {}
            "status" => {
                println!("{}", serde_json::to_string_pretty(&core.module_status())?);
            }
            prompt => {
                let report = core.tick(prompt).await;
                println!("{}", report.styled_output);
                if report.alert {
                    println!("[critrix alert at t={:.2}]", report.t);
                }
            }
        }

        print!(">> ");
        io::stdout().flush()?;
    }

    println!("\nBye.");
    Ok(())
}
