//! Veritas CLI
//!
//! The `veritas` command runs dataset submissions through the marketplace
//! pipeline and inspects what the pipeline produces.
//!
//! ## Commands
//!
//! - `submit`: pin, validate and prove a dataset, then print its listing draft
//! - `validate`: score a single file
//! - `verify-proof`: structurally check a proof JSON file
//! - `session`: sign in, sign out, show the current account

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};

use veritas_core::fakes::MemoryPinningService;
use veritas_core::{
    format_file_size, truncate_hash, validate_dataset, verify_certificate, verify_proof_json,
    CompletedSubmission, DatasetFile, DatasetMetadata, FileSessionStore, ListingDraft,
    PinataClient, PinningConfig, PinningService, QualityJitter, RandomJitter, SessionConfig,
    SubmissionInput, ValidationTier, WalletSession, Workflow, WorkflowStage,
};

#[derive(Parser)]
#[command(name = "veritas")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Veritas dataset submission pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pin, validate and prove a dataset, then print its listing draft
    Submit(SubmitArgs),

    /// Score one file with the heuristic validator
    Validate {
        /// File to score
        file: PathBuf,

        /// Seed the quality jitter for a reproducible score
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Check the structure of a proof JSON file
    VerifyProof {
        /// Path to a proof as printed by `submit`
        proof: PathBuf,
    },

    /// Manage the wallet session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Args)]
struct SubmitArgs {
    /// Listing title
    #[arg(short, long)]
    title: String,

    /// Listing description
    #[arg(short, long)]
    description: Option<String>,

    /// Marketplace category (default: Computer Vision)
    #[arg(short, long)]
    category: Option<String>,

    /// Price in NEAR, e.g. 2.5 (default: 1)
    #[arg(short, long)]
    price: Option<String>,

    /// License identifier (default: MIT)
    #[arg(short, long)]
    license: Option<String>,

    /// Pin into an in-memory store instead of the pinning API
    #[arg(long)]
    offline: bool,

    /// Pinning API base URL
    #[arg(long, env = "PINATA_API_URL")]
    api_url: Option<String>,

    /// Per-request timeout for the pinning API, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Dataset files; the first one is the file that gets scored
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Sign in; without --account a throwaway testnet account is generated
    Login {
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Sign out and forget the stored account
    Logout,

    /// Show the signed-in account
    Whoami,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    veritas_core::init_tracing(cli.json, level);

    let session_config = SessionConfig::from_env();

    let output = match cli.command {
        Commands::Submit(args) => cmd_submit(args, &session_config).await?,
        Commands::Validate { file, seed } => cmd_validate(&file, seed).await?,
        Commands::VerifyProof { proof } => cmd_verify_proof(&proof).await?,
        Commands::Session { action } => match action {
            SessionAction::Login { account } => {
                cmd_session_login(&session_config, account.as_deref())?
            }
            SessionAction::Logout => cmd_session_logout(&session_config)?,
            SessionAction::Whoami => cmd_session_whoami(&session_config)?,
        },
    };

    print_json(&output)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_session(config: &SessionConfig) -> Result<WalletSession<FileSessionStore>> {
    let store = FileSessionStore::new(&config.session_file);
    WalletSession::load(store, config.clone()).with_context(|| {
        format!(
            "Failed to load session from {}",
            config.session_file.display()
        )
    })
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<DatasetFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = DatasetFile::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        info!(file = %file.name(), size = %format_file_size(file.size()), "Loaded dataset file");
        files.push(file);
    }
    Ok(files)
}

type PinningBackend = (Arc<dyn PinningService>, Option<Arc<PinataClient>>);

fn pinning_service(args: &SubmitArgs) -> Result<PinningBackend> {
    if args.offline {
        info!("Offline mode: pinning into memory");
        let service: Arc<dyn PinningService> = Arc::new(MemoryPinningService::new());
        return Ok((service, None));
    }

    let mut config = PinningConfig::from_env();
    if let Some(url) = &args.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(secs);
    }
    if config.jwt.is_none() {
        warn!("PINATA_JWT is not set; pinning requests will be unauthenticated");
    }

    let client = Arc::new(PinataClient::new(config).context("Failed to build pinning client")?);
    let service: Arc<dyn PinningService> = client.clone();
    Ok((service, Some(client)))
}

/// Run one submission and return the outcome plus its listing draft.
async fn cmd_submit(args: SubmitArgs, session_config: &SessionConfig) -> Result<Value> {
    let session = open_session(session_config)?;
    if !session.is_signed_in() {
        warn!("No wallet session; the listing draft will have no owner");
    }

    let files = read_files(&args.files).await?;
    let (pinning, gateway) = pinning_service(&args)?;

    let defaults = DatasetMetadata::default();
    let metadata = DatasetMetadata {
        title: args.title.clone(),
        description: args.description.clone().unwrap_or(defaults.description),
        category: args.category.clone().unwrap_or(defaults.category),
        price: args.price.clone().unwrap_or(defaults.price),
        license: args.license.clone().unwrap_or(defaults.license),
    };

    let mut workflow = Workflow::new(pinning);
    let mut progress = |stage: WorkflowStage, percent: u8| {
        info!(stage = %stage, percent, "Progress");
    };
    let outcome = workflow
        .run(SubmissionInput::new(files, metadata), &mut progress)
        .await;

    let done = match outcome {
        Ok(done) => done,
        Err(err) => {
            if let Some(pinned) = workflow.state().content_address() {
                warn!(cid = %pinned.cid, "Files remain pinned after the failure");
            }
            match err.failed_stage() {
                Some(stage) => bail!("Submission failed at {}: {}", stage, err),
                None => bail!("Submission failed: {}", err),
            }
        }
    };

    info!(
        cid = %truncate_hash(&done.content_address.cid, 8, 6),
        score = done.validation.score,
        tier = ValidationTier::from_score(done.validation.score).label(),
        proof = %truncate_hash(&done.proof.proof_hash, 10, 8),
        "Submission complete"
    );

    submission_report(&done, session.account_id(), gateway.as_deref())
}

fn submission_report(
    done: &CompletedSubmission,
    owner: Option<&str>,
    gateway: Option<&PinataClient>,
) -> Result<Value> {
    let listing = ListingDraft::from_outcome(done).context("Failed to build listing draft")?;
    Ok(json!({
        "submission": done,
        "listing": listing,
        "owner": owner,
        "gatewayUrl": gateway.map(|g| g.gateway_url(&done.content_address.cid, None)),
    }))
}

/// Score one file.
async fn cmd_validate(path: &Path, seed: Option<u64>) -> Result<Value> {
    let file = DatasetFile::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut jitter: Box<dyn QualityJitter> = match seed {
        Some(seed) => Box::new(RandomJitter::seeded(seed)),
        None => Box::new(RandomJitter::from_entropy()),
    };
    let result = validate_dataset(&file, jitter.as_mut())
        .with_context(|| format!("Failed to validate {}", path.display()))?;

    Ok(json!({
        "file": file.name(),
        "size": format_file_size(file.size()),
        "tier": ValidationTier::from_score(result.score).label(),
        "certificateWellFormed": verify_certificate(&result.certificate),
        "result": result,
    }))
}

/// Structurally check a proof file.
async fn cmd_verify_proof(path: &Path) -> Result<Value> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_slice(&raw)
        .with_context(|| format!("{} is not JSON", path.display()))?;

    // Accept either a bare proof or the full `submit` report.
    let proof = value
        .pointer("/submission/proof")
        .cloned()
        .unwrap_or(value);
    let verification = verify_proof_json(&proof);
    if !verification.valid {
        warn!(path = %path.display(), "Proof is malformed");
    }
    Ok(serde_json::to_value(verification)?)
}

fn cmd_session_login(config: &SessionConfig, account: Option<&str>) -> Result<Value> {
    let mut session = open_session(config)?;
    let account = match account {
        Some(account) => {
            session
                .sign_in(account)
                .with_context(|| format!("Failed to sign in as {}", account))?;
            account.to_string()
        }
        None => session
            .sign_in_mock(&mut rand::thread_rng())
            .context("Failed to sign in")?,
    };
    Ok(session_report(&session, Some(&account)))
}

fn cmd_session_logout(config: &SessionConfig) -> Result<Value> {
    let mut session = open_session(config)?;
    session.sign_out().context("Failed to sign out")?;
    Ok(session_report(&session, None))
}

fn cmd_session_whoami(config: &SessionConfig) -> Result<Value> {
    let session = open_session(config)?;
    Ok(session_report(&session, session.account_id()))
}

fn session_report(session: &WalletSession<FileSessionStore>, account: Option<&str>) -> Value {
    json!({
        "accountId": account,
        "signedIn": account.is_some(),
        "networkId": session.network_id(),
        "contractId": session.contract_id(),
    })
}
