use clap::{Parser, Subcommand};
use lib::exec::{authorize, Allowlist, Rejection};

#[derive(Parser)]
#[command(name = "conduit")]
#[command(about = "Conduit CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json.
    Init {
        /// Config file path (default: CONDUIT_CONFIG_PATH or ~/.conduit/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the web console. Allowlisted commands typed in the browser are run by re-executing this binary.
    Ui {
        /// Config file path (default: CONDUIT_CONFIG_PATH or ~/.conduit/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 7363)
        #[arg(long, short)]
        port: Option<u16>,

        /// Answer with canned sample output instead of running commands.
        #[arg(long)]
        demo: bool,
    },

    /// Show whether the console would accept a command, without running it.
    Check {
        /// Command as it would be typed in the console, e.g. `email list --limit 10`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// List the allowlisted command prefixes.
    Commands,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("conduit {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Ui { config, port, demo }) => {
            if let Err(e) = run_ui(config, port, demo).await {
                log::error!("console failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Check { command }) => {
            if !run_check(&command.join(" ")) {
                std::process::exit(1);
            }
        }
        Some(Commands::Commands) => {
            for prefix in Allowlist::builtin().sorted() {
                println!("{}", prefix);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_ui(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
    demo: bool,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.console.port = p;
    }
    if demo {
        config.demo = true;
    }
    log::info!(
        "starting console on {}:{} (config {})",
        config.console.bind,
        config.console.port,
        path.display()
    );
    lib::console::run_console(config).await
}

/// Print the decision for `command`; returns false when it would be rejected.
fn run_check(command: &str) -> bool {
    match authorize(command, &Allowlist::builtin()) {
        Ok(c) => {
            println!("allowed: {} (args: {:?})", c.base_command, c.tokens);
            true
        }
        Err(r @ Rejection::NotAllowed(_)) => {
            println!("not allowed: {}", r);
            false
        }
        Err(r) => {
            println!("rejected: {}", r);
            false
        }
    }
}
