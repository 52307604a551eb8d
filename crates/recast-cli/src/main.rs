mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_INPUT_ERROR, EXIT_RULES_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "recast",
    version,
    about = "Read Dockerfiles and describe the system they build"
)]
struct Cli {
    /// Classification tables to use instead of the built-in ones
    /// (also read from RECAST_RULES).
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse a single Dockerfile without following its base image.
    Parse {
        /// Path to the Dockerfile, or "-" for stdin.
        #[arg(default_value = "Dockerfile")]
        recipe: PathBuf,
    },
    /// Parse a Dockerfile and merge in the recipes of its base images.
    Resolve {
        /// Path to the Dockerfile, or "-" for stdin. Fetched from
        /// --image/--github when omitted.
        recipe: Option<PathBuf>,
        /// Image reference the recipe builds (used to locate its source).
        #[arg(long)]
        image: Option<String>,
        /// GitHub repository of the recipe (https://github.com/owner/repo).
        #[arg(long)]
        github: Option<String>,
        /// Branch to fetch before the configured fallbacks.
        #[arg(long)]
        branch: Option<String>,
        /// Maximum number of base images to fetch.
        #[arg(long, default_value_t = recast_chain::DEFAULT_MAX_DEPTH)]
        max_depth: usize,
        /// Recover the service command from this application's init script.
        #[arg(long)]
        service: Option<String>,
        /// Fetch timeout in seconds (overrides the fetch config file).
        #[arg(long)]
        remote_timeout: Option<u64>,
        /// Print progress events as JSON lines on stdout.
        #[arg(long, default_value_t = false)]
        json_events: bool,
    },
    /// Show where the recipe for an image would be fetched from.
    Source {
        /// Image reference.
        #[arg(long)]
        image: Option<String>,
        /// GitHub repository URL.
        #[arg(long)]
        github: Option<String>,
    },
    /// Report whether an image ends chain resolution.
    Terminal {
        /// Image reference.
        image: String,
    },
    /// Print the classification tables in effect, or check a rules file.
    Rules {
        /// Validate this rules file instead of printing the active tables.
        #[arg(long)]
        check: Option<PathBuf>,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("RECAST_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let rules_path = cli
        .rules
        .clone()
        .or_else(|| std::env::var_os("RECAST_RULES").map(PathBuf::from));
    if let Some(path) = rules_path {
        if let Err(msg) = commands::install_rules(&path) {
            eprintln!("error: {msg}");
            return ExitCode::from(EXIT_RULES_ERROR);
        }
    }

    let json_output = cli.json;

    let result = match cli.command {
        Commands::Parse { recipe } => commands::parse::run(&recipe, json_output),
        Commands::Resolve {
            recipe,
            image,
            github,
            branch,
            max_depth,
            service,
            remote_timeout,
            json_events,
        } => commands::resolve::run(
            &commands::resolve::ResolveArgs {
                recipe: recipe.as_deref(),
                image: image.as_deref(),
                github: github.as_deref(),
                branch: branch.as_deref(),
                max_depth,
                service: service.as_deref(),
                remote_timeout,
                json_events,
            },
            json_output,
        ),
        Commands::Source { image, github } => {
            commands::source::run(image.as_deref(), github.as_deref(), json_output)
        }
        Commands::Terminal { image } => commands::terminal::run(&image, json_output),
        Commands::Rules { check } => commands::rules::run(check.as_deref(), json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("rules error:") {
                EXIT_RULES_ERROR
            } else if msg.starts_with("failed to read recipe") {
                EXIT_INPUT_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
