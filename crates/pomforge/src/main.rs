// Copyright 2026 Pomforge Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use pomforge::cli;
use pomforge::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pomforge",
    about = "Pomforge: page-object locators, site crawls, script transpiling and link checks",
    version,
    after_help = "Run 'pomforge <command> --help' for details on each command.\nBASEURL and POMFORGE_* environment variables provide defaults."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a POM file for one page (URL or BASEURL)
    Locators {
        /// Page to analyze
        url: Option<String>,
    },
    /// Generate a POM file for one page, optionally highlighting the results
    Analyze {
        /// Page to analyze
        #[arg(short, long)]
        url: String,
        /// POM file to write (default: <output dir>/<slug>.ts)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Outline found elements in a visible browser
        #[arg(long)]
        highlight: bool,
    },
    /// Crawl a site and write one POM file per page
    Crawl {
        /// Start URL
        url: String,
        /// Fail instead of waiting for a manual login
        #[arg(long)]
        non_interactive: bool,
        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,
    },
    /// Log in with POMFORGE_LOGIN_* credentials and save the session
    Login {
        /// Login page (default: POMFORGE_LOGIN_URL, then BASEURL)
        url: Option<String>,
    },
    /// Compare a POM file with a live page
    Compare {
        #[arg(long)]
        url: String,
        #[arg(long)]
        pom: PathBuf,
        /// Load the saved session before navigating
        #[arg(long)]
        use_session: bool,
    },
    /// Outline every locator of a POM file on a live page
    Highlight {
        #[arg(long)]
        url: String,
        #[arg(long)]
        pom: PathBuf,
    },
    /// Report broken links and images
    LinkTest {
        /// Page or site to check (default: BASEURL)
        #[arg(long)]
        url: Option<String>,
        /// Crawl the whole site instead of one page
        #[arg(long)]
        full: bool,
        /// Abort on the first page that cannot be fetched
        #[arg(long)]
        fail_fast: bool,
    },
    /// Record a script with the Playwright recorder (needs npx)
    Record {
        /// Page to start recording on (default: BASEURL)
        url: Option<String>,
        /// Where the recorder writes the script
        #[arg(long, default_value = "gen.ts")]
        output: PathBuf,
    },
    /// Turn a recorded script into a feature, locators and step definitions
    Transpile {
        /// Recorded script
        #[arg(long, default_value = "gen.ts")]
        input: PathBuf,
        /// Directory receiving the generated files
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
        /// Chain interior steps with `And` instead of `When`
        #[arg(long)]
        and_steps: bool,
    },
    /// Serve the REST API
    Serve {
        #[arg(long, default_value_t = pomforge::rest::DEFAULT_PORT)]
        port: u16,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        "pomforge=debug"
    } else if cli.quiet {
        "pomforge=warn"
    } else {
        "pomforge=info"
    };
    let filter = match level.parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);
    cli::output::init(cli.json, cli.quiet);
    let settings = Settings::from_env();

    let result = match cli.command {
        Commands::Locators { url } => cli::analyze_cmd::run_locators(url, &settings).await,
        Commands::Analyze {
            url,
            output,
            highlight,
        } => cli::analyze_cmd::run(&url, output, highlight, &settings).await,
        Commands::Crawl {
            url,
            non_interactive,
            max_pages,
        } => cli::crawl_cmd::run(&url, non_interactive, max_pages, &settings).await,
        Commands::Login { url } => cli::login_cmd::run(url, &settings).await,
        Commands::Compare {
            url,
            pom,
            use_session,
        } => cli::compare_cmd::run_compare(&url, &pom, use_session, &settings).await,
        Commands::Highlight { url, pom } => {
            cli::compare_cmd::run_highlight(&url, &pom, &settings).await
        }
        Commands::LinkTest {
            url,
            full,
            fail_fast,
        } => cli::link_test_cmd::run(url, full, fail_fast, &settings).await,
        Commands::Record { url, output } => cli::record_cmd::run(url, &output, &settings).await,
        Commands::Transpile {
            input,
            output_dir,
            and_steps,
        } => cli::transpile_cmd::run(&input, &output_dir, and_steps),
        Commands::Serve { port } => cli::serve_cmd::run(port, settings).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "pomforge", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else if !cli::output::is_quiet() {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
