//! `passvault` CLI: terminal front end for the encrypted credential vault.
//!
//! Passwords are sealed on this machine before they are sent to the vault
//! collection; the server only ever stores ciphertext.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use passvault_core::clipboard::{ClipboardEvent, ClipboardTimer, SystemClipboard};
use passvault_core::config::{DEFAULT_LOG_LEVEL, DEFAULT_SESSION_FILE, VaultConfig};
use passvault_core::crypto::CipherCodec;
use passvault_core::generator::{self, DEFAULT_LENGTH, GeneratorPolicy};
use passvault_core::session::{FileSession, Session, SessionProvider, StaticSession};
use passvault_core::{Password, VaultController, VaultRecord, VaultStore};
use passvault_remote::HttpCollection;
use tracing_subscriber::EnvFilter;

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const MASK: &str = "••••••••";

// ── CLI structure ────────────────────────────────────────────────────

/// passvault: client-side encrypted credential vault.
#[derive(Parser)]
#[command(
    name = "passvault",
    version,
    about = "passvault CLI: store, search and copy encrypted credentials",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         PASSVAULT_API_URL          API base address (the vault lives at <url>/vault)\n  \
         PASSVAULT_ENCRYPTION_KEY   Secret the record encryption key is derived from\n  \
         PASSVAULT_SESSION_FILE     Session file (default: {DEFAULT_SESSION_FILE})\n  \
         PASSVAULT_TOKEN            Bearer token, overrides the session file\n\n\
         {DIM}Examples:{RESET}\n  \
         passvault session set --token <jwt> --user-id <id>\n  \
         passvault add --title GitHub --username bob --generate --length 20\n  \
         passvault list --search git\n  \
         passvault copy <id>"
    ),
)]
struct Cli {
    /// API base address.
    #[arg(long, env = "PASSVAULT_API_URL", global = true)]
    api_url: Option<String>,

    /// Session file written by `session set` or the login flow.
    #[arg(
        long,
        env = "PASSVAULT_SESSION_FILE",
        default_value = DEFAULT_SESSION_FILE,
        global = true
    )]
    session_file: PathBuf,

    /// Bearer token; takes precedence over the session file.
    #[arg(long, env = "PASSVAULT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log filter, used when `RUST_LOG` is unset.
    #[arg(long, env = "PASSVAULT_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL, global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored credentials.
    List {
        /// Only show records whose title or username contains this text.
        #[arg(long, short)]
        search: Option<String>,
        /// Show passwords in clear text.
        #[arg(long)]
        reveal: bool,
    },
    /// Store a new credential.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        username: String,
        /// Password to store.
        #[arg(long, conflicts_with = "generate", required_unless_present = "generate")]
        password: Option<String>,
        /// Generate the password instead of supplying one.
        #[arg(long)]
        generate: bool,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Change fields of a stored credential.
    Edit {
        /// Record id, as shown by `list`.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long, conflicts_with = "generate")]
        password: Option<String>,
        /// Replace the password with a generated one.
        #[arg(long)]
        generate: bool,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Delete a stored credential.
    Delete {
        /// Record id, as shown by `list`.
        id: String,
    },
    /// Copy a password to the clipboard; it is cleared after 15 seconds.
    Copy {
        /// Record id, as shown by `list`.
        id: String,
    },
    /// Generate a password without storing it.
    Generate {
        #[command(flatten)]
        policy: PolicyArgs,
        /// Copy to the clipboard instead of printing.
        #[arg(long)]
        copy: bool,
    },
    /// Manage the stored session.
    Session {
        #[command(subcommand)]
        action: SessionCommands,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Save a token and user id to the session file.
    Set {
        #[arg(long)]
        token: String,
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Show whether a session is present.
    Show,
    /// Remove the session file.
    Clear,
}

/// Generator policy flags.
#[derive(Args)]
struct PolicyArgs {
    /// Password length (6-32).
    #[arg(long, default_value_t = DEFAULT_LENGTH)]
    length: usize,
    /// Leave out uppercase letters.
    #[arg(long)]
    no_uppercase: bool,
    /// Leave out digits.
    #[arg(long)]
    no_numbers: bool,
    /// Leave out symbols.
    #[arg(long)]
    no_symbols: bool,
}

impl PolicyArgs {
    fn to_policy(&self) -> Result<GeneratorPolicy> {
        let mut policy = GeneratorPolicy::new(self.length)?;
        policy.include_uppercase = !self.no_uppercase;
        policy.include_numbers = !self.no_numbers;
        policy.include_symbols = !self.no_symbols;
        Ok(policy)
    }
}

// ── Output helpers ───────────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    println!("{BOLD}{CYAN}{icon} {title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key:<20}{RESET} {WHITE}{value}{RESET}");
}

fn success(msg: &str) {
    println!("{GREEN}{BOLD}✓{RESET} {msg}");
}

fn warning(msg: &str) {
    println!("{YELLOW}{BOLD}⚠{RESET} {YELLOW}{msg}{RESET}");
}

fn print_record(record: &VaultRecord, reveal: bool) {
    let id = record.id.as_deref().unwrap_or("-");
    println!("  {BOLD}{}{RESET} {DIM}({id}){RESET}", record.title);
    kv_line("username", &record.username);
    let password = match &record.password {
        Password::Plaintext(_) if !reveal => MASK,
        other => other.display_text(),
    };
    kv_line("password", password);
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::List { search, reveal } => cmd_list(cli, search.as_deref(), *reveal).await,
        Commands::Add {
            title,
            username,
            password,
            generate,
            policy,
        } => {
            let password = if *generate { None } else { password.clone() };
            cmd_add(cli, title, username, password, policy).await
        }
        Commands::Edit {
            id,
            title,
            username,
            password,
            generate,
            policy,
        } => {
            let changes = EditChanges {
                title: title.clone(),
                username: username.clone(),
                password: password.clone(),
                policy: generate.then_some(policy),
            };
            cmd_edit(cli, id, changes).await
        }
        Commands::Delete { id } => cmd_delete(cli, id).await,
        Commands::Copy { id } => cmd_copy(cli, id).await,
        Commands::Generate { policy, copy } => cmd_generate(policy, *copy).await,
        Commands::Session { action } => cmd_session(cli, action),
    }
}

/// Build a controller from the environment and command-line overrides.
fn open_vault(cli: &Cli) -> Result<VaultController> {
    let config = VaultConfig::from_lookup(|name| match name {
        "PASSVAULT_API_URL" => cli.api_url.clone(),
        "PASSVAULT_SESSION_FILE" => Some(cli.session_file.display().to_string()),
        "PASSVAULT_LOG_LEVEL" => Some(cli.log_level.clone()),
        other => std::env::var(other).ok(),
    })
    .context("incomplete configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let codec = CipherCodec::from_secret(&config.encryption_key)
        .context("invalid PASSVAULT_ENCRYPTION_KEY")?;
    let remote = HttpCollection::new(config.collection_config())
        .context("invalid PASSVAULT_API_URL")?;
    let session: Arc<dyn SessionProvider> = match &cli.token {
        Some(token) => Arc::new(StaticSession::new(Session::new(token.clone(), None))),
        None => Arc::new(FileSession::new(config.session_file.clone())),
    };

    Ok(VaultController::new(
        VaultStore::new(Arc::new(remote), codec),
        session,
        Arc::new(SystemClipboard::new()),
    ))
}

/// Turn a controller operation skipped for lack of a session into an error.
fn ensure_signed_in(performed: bool) -> Result<()> {
    if !performed {
        bail!("not signed in; run `passvault session set --token <token>` or set PASSVAULT_TOKEN");
    }
    Ok(())
}

async fn load(cli: &Cli) -> Result<VaultController> {
    let mut controller = open_vault(cli)?;
    let performed = controller
        .refresh()
        .await
        .context("failed to load vault")?;
    ensure_signed_in(performed)?;
    Ok(controller)
}

// ── Vault commands ───────────────────────────────────────────────────

async fn cmd_list(cli: &Cli, search: Option<&str>, reveal: bool) -> Result<()> {
    let mut controller = load(cli).await?;
    if let Some(query) = search {
        controller.search(query);
    }
    let records = controller.visible().await;

    println!();
    header("🔐", "Vault");
    if records.is_empty() {
        println!("  {DIM}(no matching records){RESET}");
    }
    for record in &records {
        print_record(record, reveal);
    }
    println!();
    Ok(())
}

async fn cmd_add(
    cli: &Cli,
    title: &str,
    username: &str,
    password: Option<String>,
    policy: &PolicyArgs,
) -> Result<()> {
    let mut controller = open_vault(cli)?;
    let generated = password.is_none();
    {
        let form = controller.form_mut();
        form.title = title.to_owned();
        form.username = username.to_owned();
    }
    match password {
        Some(p) => controller.form_mut().password = p,
        None => {
            *controller.policy_mut() = policy.to_policy()?;
            controller.generate();
        }
    }
    let password = controller.form().password.clone();

    let performed = controller.submit().await.context("failed to save record")?;
    ensure_signed_in(performed)?;

    println!();
    success(&format!("Saved {BOLD}{title}{RESET}"));
    if generated {
        kv_line("password", &password);
    }
    println!();
    Ok(())
}

struct EditChanges<'a> {
    title: Option<String>,
    username: Option<String>,
    password: Option<String>,
    /// Present when a new password should be generated.
    policy: Option<&'a PolicyArgs>,
}

async fn cmd_edit(cli: &Cli, id: &str, changes: EditChanges<'_>) -> Result<()> {
    let mut controller = load(cli).await?;
    let record = controller.record(id).await?;
    controller.edit(&record);

    if let Some(title) = changes.title {
        controller.form_mut().title = title;
    }
    if let Some(username) = changes.username {
        controller.form_mut().username = username;
    }
    if let Some(password) = changes.password {
        controller.form_mut().password = password;
    }
    let generated = match changes.policy {
        Some(policy) => {
            *controller.policy_mut() = policy.to_policy()?;
            Some(controller.generate().to_owned())
        }
        None => None,
    };

    let title = controller.form().title.clone();
    let performed = controller.submit().await.with_context(|| {
        if record.password == Password::Undecryptable {
            "failed to update record; pass --password or --generate".to_owned()
        } else {
            "failed to update record".to_owned()
        }
    })?;
    ensure_signed_in(performed)?;

    println!();
    success(&format!("Updated {BOLD}{title}{RESET}"));
    if let Some(password) = generated {
        kv_line("password", &password);
    }
    println!();
    Ok(())
}

async fn cmd_delete(cli: &Cli, id: &str) -> Result<()> {
    let mut controller = open_vault(cli)?;
    let performed = controller
        .remove(id)
        .await
        .with_context(|| format!("failed to delete record '{id}'"))?;
    ensure_signed_in(performed)?;

    println!();
    success(&format!("Record {BOLD}{id}{RESET} deleted."));
    println!();
    Ok(())
}

async fn cmd_copy(cli: &Cli, id: &str) -> Result<()> {
    let mut controller = load(cli).await?;
    let record = controller.record(id).await?;

    if controller.copy_password(&record)? == ClipboardEvent::CopyFailed {
        bail!("{}", ClipboardEvent::CopyFailed);
    }
    println!();
    success(&format!("{} {DIM}(Ctrl-C clears now){RESET}", ClipboardEvent::Copied));

    let interrupted = tokio::select! {
        event = controller.next_clipboard_event() => {
            report_clear(event);
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        report_clear(controller.clear_clipboard_now());
    }
    println!();
    Ok(())
}

// ── Local commands ───────────────────────────────────────────────────

async fn cmd_generate(policy: &PolicyArgs, copy: bool) -> Result<()> {
    let password = generator::generate(&policy.to_policy()?);
    if !copy {
        println!("{password}");
        return Ok(());
    }

    let (timer, mut events) = ClipboardTimer::new(Arc::new(SystemClipboard::new()));
    if timer.copy(&password) == ClipboardEvent::CopyFailed {
        bail!("{}", ClipboardEvent::CopyFailed);
    }
    success(&format!("{} {DIM}(Ctrl-C clears now){RESET}", ClipboardEvent::Copied));

    // Skip the Copied event already reported above.
    let _ = events.recv().await;
    tokio::select! {
        event = events.recv() => report_clear(event),
        _ = tokio::signal::ctrl_c() => report_clear(timer.clear_now()),
    }
    Ok(())
}

fn report_clear(event: Option<ClipboardEvent>) {
    match event {
        Some(ClipboardEvent::Cleared) => success(&ClipboardEvent::Cleared.to_string()),
        Some(other) => warning(&other.to_string()),
        None => {}
    }
}

fn cmd_session(cli: &Cli, action: &SessionCommands) -> Result<()> {
    let store = FileSession::new(cli.session_file.clone());
    match action {
        SessionCommands::Set { token, user_id } => {
            if token.trim().is_empty() {
                bail!("token must not be empty");
            }
            store.store(&Session::new(token.clone(), user_id.clone()))?;
            println!();
            success(&format!(
                "Session saved to {BOLD}{}{RESET}",
                store.path().display()
            ));
            println!();
        }
        SessionCommands::Show => {
            println!();
            header("🔑", "Session");
            kv_line("file", &store.path().display().to_string());
            match store.session()? {
                Some(session) => {
                    kv_line("status", "signed in");
                    kv_line("user id", session.user_id.as_deref().unwrap_or("-"));
                    kv_line("token", &format!("{MASK} ({} chars)", session.token.len()));
                }
                None => kv_line("status", "not signed in"),
            }
            println!();
        }
        SessionCommands::Clear => {
            store.clear()?;
            println!();
            success("Session cleared.");
            println!();
        }
    }
    Ok(())
}
