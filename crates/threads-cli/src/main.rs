//! CLI interface for threads - the Threads messaging API from the terminal.

use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, IsTerminal, Write as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use env_logger::fmt::WriteStyle;
use log::{LevelFilter, debug};
use threads_core::paths::write_default_config;
use threads_core::{AppConfig, AppPaths, Message, Reference, Thread, ThreadsClient, generate_schema};

const APP_NAME: &str = "threads";

/// Repository URL used as the schema `$id`.
const REPO_URL: &str = "https://github.com/byteowlz/threads";

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print().ok();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match try_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn try_main(cli: Cli) -> Result<()> {
    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging()?;
    debug!("resolved paths: {}", ctx.paths);

    let connect = || ctx.connect(cli.email.as_deref(), cli.password.as_deref());

    match cli.command.unwrap_or(Command::Threads) {
        Command::Threads => handle_threads(&ctx, &connect()?),
        Command::Reference { subcommand } => handle_reference(&ctx, &connect()?, subcommand),
        Command::Messages { thread_id } => handle_messages(&ctx, &connect()?, thread_id),
        Command::Post { thread_id, text } => handle_post(&ctx, &connect()?, thread_id, &text),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Completions { shell } => {
            handle_completions(shell);
            Ok(())
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "threads",
    author,
    version,
    about = "The Threads messaging API from the terminal",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    /// Account email.
    #[arg(env = "THREADS_EMAIL")]
    email: Option<String>,
    /// Account password.
    #[arg(env = "THREADS_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// What to do after logging in (default: list threads).
    #[command(subcommand)]
    command: Option<Command>,
}

/// Common CLI options shared across all subcommands.
#[derive(Debug, Clone, Args)]
pub struct CommonOpts {
    /// Override the config file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
    /// Reduce output to only errors.
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    pub quiet: bool,
    /// Increase logging verbosity (stackable).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,
    /// Enable trace logging.
    #[arg(long, global = true)]
    pub trace: bool,
    /// Output machine-readable JSON.
    #[arg(long, global = true)]
    pub json: bool,
    /// Disable ANSI colors in output.
    #[arg(long = "no-color", global = true, conflicts_with = "color")]
    pub no_color: bool,
    /// Control color output.
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    pub color: ColorOption,
    /// Do not change anything on disk.
    #[arg(long = "dry-run", global = true)]
    pub dry_run: bool,
    /// Assume "yes" for interactive prompts.
    #[arg(short = 'y', long = "yes", global = true)]
    pub assume_yes: bool,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorOption {
    /// Detect terminal capabilities automatically.
    Auto,
    /// Always emit ANSI color codes.
    Always,
    /// Never emit ANSI color codes.
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List your threads.
    Threads,
    /// Thread references (file attachments).
    Reference {
        #[command(subcommand)]
        subcommand: ReferenceSubcommand,
    },
    /// Show a thread's messages.
    Messages {
        /// Thread ID.
        thread_id: i64,
    },
    /// Post a message to a thread.
    Post {
        /// Thread ID.
        thread_id: i64,
        /// Message text.
        text: String,
    },
    /// Create config directories and default files.
    Init(InitCommand),
    /// Inspect and manage configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum ReferenceSubcommand {
    /// Show a reference's metadata.
    Show {
        /// Reference ID.
        id: i64,
    },
    /// Download the first version of a file reference.
    Get {
        /// Reference ID.
        id: i64,
        /// Write to this file instead of stdout.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Upload a file as a new reference on a thread.
    Upload {
        /// Thread ID.
        thread_id: i64,
        /// Reference name.
        name: String,
        /// File to upload.
        file: PathBuf,
    },
    /// Upload a new version of an existing reference.
    Version {
        /// Reference ID.
        reference_id: i64,
        /// Reference name.
        name: String,
        /// File to upload.
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, Args)]
struct InitCommand {
    /// Recreate configuration even if it already exists.
    #[arg(long = "force")]
    force: bool,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum ConfigCommand {
    /// Output the effective configuration.
    Show,
    /// Print the resolved config file path.
    Path,
    /// Print the JSON schema.
    Schema,
    /// Regenerate the default configuration file.
    Reset,
}

// ─── Runtime ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let paths = AppPaths::discover(common.config.as_deref())?;
        let config = AppConfig::load(&paths, common.dry_run)?;
        Ok(Self {
            common,
            paths,
            config,
        })
    }

    fn init_logging(&self) -> Result<()> {
        if self.common.quiet {
            log::set_max_level(LevelFilter::Off);
            return Ok(());
        }
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
        builder.filter_level(self.effective_log_level());

        let force_color = matches!(self.common.color, ColorOption::Always)
            || env::var_os("FORCE_COLOR").is_some();
        let disable_color = self.common.no_color
            || matches!(self.common.color, ColorOption::Never)
            || env::var_os("NO_COLOR").is_some()
            || (!force_color && !io::stderr().is_terminal());

        if disable_color {
            builder.write_style(WriteStyle::Never);
        } else if force_color {
            builder.write_style(WriteStyle::Always);
        } else {
            builder.write_style(WriteStyle::Auto);
        }

        if let Some(ref file) = self.config.logging.file {
            let target = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .with_context(|| format!("opening log file {file}"))?;
            builder.target(env_logger::Target::Pipe(Box::new(target)));
            builder.write_style(WriteStyle::Never);
        }

        builder.try_init().or_else(|err| {
            if self.common.verbose > 0 {
                eprintln!("logger already initialized: {err}");
            }
            Ok(())
        })
    }

    const fn effective_log_level(&self) -> LevelFilter {
        if self.common.trace {
            LevelFilter::Trace
        } else if self.common.debug {
            LevelFilter::Debug
        } else {
            match self.common.verbose {
                0 => self.config.logging.level.to_level_filter(),
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }

    /// Build a client and log in, failing fast on rejected credentials.
    fn connect(&self, email: Option<&str>, password: Option<&str>) -> Result<ThreadsClient> {
        let (Some(email), Some(password)) = (email, password) else {
            return Err(anyhow!(
                "email and password are required\n\n{}",
                Cli::command().render_usage()
            ));
        };

        let mut client = ThreadsClient::new(&self.config.api)?;
        if !client.login(email, password)? {
            return Err(anyhow!(
                "Failed to login. Check your credentials and try again."
            ));
        }
        Ok(client)
    }
}

// ─── Handlers ────────────────────────────────────────────────────────

fn handle_threads(ctx: &RuntimeContext, client: &ThreadsClient) -> Result<()> {
    let threads = client.list_threads()?;

    if ctx.common.json {
        return print_json(&threads);
    }

    if threads.is_empty() {
        println!("No threads.");
        return Ok(());
    }
    print_thread_list(&threads);
    Ok(())
}

fn handle_reference(
    ctx: &RuntimeContext,
    client: &ThreadsClient,
    cmd: ReferenceSubcommand,
) -> Result<()> {
    match cmd {
        ReferenceSubcommand::Show { id } => {
            let reference = client.get_reference_metadata(id)?;
            if ctx.common.json {
                return print_json(&reference);
            }
            print_reference(&reference);
            Ok(())
        }
        ReferenceSubcommand::Get { id, output } => {
            let bytes = client.get_reference(id)?;
            match output {
                Some(path) => write_download(ctx, &path, &bytes),
                None => {
                    let mut stdout = io::stdout().lock();
                    stdout.write_all(&bytes)?;
                    stdout.flush()?;
                    Ok(())
                }
            }
        }
        ReferenceSubcommand::Upload {
            thread_id,
            name,
            file,
        } => {
            ensure_file(&file)?;
            let reference = client.upload_new_reference(thread_id, &name, &file)?;
            if ctx.common.json {
                return print_json(&reference);
            }
            match reference.and_then(|r| r.id) {
                Some(id) => println!("Uploaded reference {id} to thread {thread_id}."),
                None => println!("Uploaded reference to thread {thread_id}."),
            }
            Ok(())
        }
        ReferenceSubcommand::Version {
            reference_id,
            name,
            file,
        } => {
            ensure_file(&file)?;
            let reference = client.upload_reference_version(reference_id, &name, &file)?;
            if ctx.common.json {
                return print_json(&reference);
            }
            match reference {
                Some(reference) if !reference.file_versions.is_empty() => println!(
                    "Uploaded version {} of reference {reference_id}.",
                    reference.file_versions.len()
                ),
                _ => println!("Uploaded new version of reference {reference_id}."),
            }
            Ok(())
        }
    }
}

fn handle_messages(ctx: &RuntimeContext, client: &ThreadsClient, thread_id: i64) -> Result<()> {
    let messages = client.get_messages(thread_id)?;

    if ctx.common.json {
        return print_json(&messages);
    }

    if messages.is_empty() {
        println!("No messages in thread {thread_id}.");
        return Ok(());
    }
    print_message_list(&messages);
    Ok(())
}

fn handle_post(
    ctx: &RuntimeContext,
    client: &ThreadsClient,
    thread_id: i64,
    text: &str,
) -> Result<()> {
    let messages = client.post_message(thread_id, text)?;

    if ctx.common.json {
        return print_json(&messages);
    }

    println!("Sent.");
    if !messages.iter().any(|m| m.plain_text() == text) {
        log::warn!("posted message not found in thread {thread_id} yet");
    }
    Ok(())
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    if ctx.paths.config_file.exists() && !(cmd.force || ctx.common.assume_yes) {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            ctx.paths.config_file.display()
        ));
    }
    if ctx.common.dry_run {
        log::info!(
            "dry-run: would write default config to {}",
            ctx.paths.config_file.display()
        );
        return Ok(());
    }
    write_default_config(&ctx.paths.config_file)
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            if ctx.common.json {
                print_json(&ctx.config)
            } else {
                println!("{:#?}", ctx.config);
                Ok(())
            }
        }
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
            Ok(())
        }
        ConfigCommand::Schema => {
            println!("{}", generate_schema(APP_NAME, REPO_URL)?);
            Ok(())
        }
        ConfigCommand::Reset => {
            if ctx.common.dry_run {
                log::info!(
                    "dry-run: would reset config at {}",
                    ctx.paths.config_file.display()
                );
                return Ok(());
            }
            write_default_config(&ctx.paths.config_file)
        }
    }
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("serializing output to JSON")?
    );
    Ok(())
}

fn ensure_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(anyhow!("file not found: {}", path.display()))
    }
}

fn write_download(ctx: &RuntimeContext, path: &Path, bytes: &[u8]) -> Result<()> {
    if ctx.common.dry_run {
        log::info!(
            "dry-run: would write {} bytes to {}",
            bytes.len(),
            path.display()
        );
        return Ok(());
    }
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    eprintln!("Wrote {} bytes to {}.", bytes.len(), path.display());
    Ok(())
}

// ─── Formatting helpers ──────────────────────────────────────────────

fn print_thread_list(threads: &[Thread]) {
    for t in threads {
        let name = t.name.as_deref().unwrap_or("(unnamed)");
        println!("  {:>6}  {name}", t.id);
    }
}

fn print_reference(reference: &Reference) {
    if let Some(id) = reference.id {
        println!("id:      {id}");
    }
    println!("name:    {}", reference.name.as_deref().unwrap_or("(unnamed)"));
    if let Some(thread) = reference.thread {
        println!("thread:  {thread}");
    }
    if let Some(kind) = reference.reference_type {
        println!("type:    {}", kind.as_str());
    }
    for (i, version) in reference.file_versions.iter().enumerate() {
        println!("v{:<7} {}", i + 1, version.file);
    }
}

fn print_message_list(messages: &[Message]) {
    for m in messages {
        let id = m.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        let text = m.plain_text();
        let mut lines = text.lines();
        println!("  {id:>6}  {}", lines.next().unwrap_or(""));
        for line in lines {
            println!("          {line}");
        }
    }
}
