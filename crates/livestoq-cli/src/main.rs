mod cli;
mod display;

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{AnalyzeArgs, CaptureArgs, Cli, Commands, FallbackPolicy};
use livestoq_ai::{Assistant, AssistantConfig, ChatMessage};
use livestoq_core::{
    Breed, CaptureSlot, CapturedImages, ScanAssessment, generate_mock_assessment,
};
use livestoq_ml::{
    AnalysisClient, AnalysisError, AnalysisRequest, ImageUpload, ScanOutcome, scan_with_fallback,
};
use livestoq_store::{Credentials, ScanStore, SessionStore, StoreError};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();
    debug!("livestoq v{}", env!("CARGO_PKG_VERSION"));

    let sessions = SessionStore::open(&cli.data_dir)
        .with_context(|| format!("failed to open data dir {}", cli.data_dir.display()))?;

    match &cli.command {
        Commands::Analyze(args) => analyze(&cli, args, &sessions).await,
        Commands::Mock(capture) => mock(&cli, capture, &sessions),
        Commands::Show { id, json } => show(&cli, id.as_deref(), *json),
        Commands::History => {
            display::print_history(&open_scans(&cli)?.list()?);
            Ok(())
        }
        Commands::Ask { question } => ask(&cli, &question.join(" ")).await,
        Commands::Login { username, password } => {
            let session = sessions
                .login(username, password, &Credentials::default())
                .context("login failed")?;
            println!("Logged in as {} ({} credits).", session.username, session.credits);
            Ok(())
        }
        Commands::Logout => {
            sessions.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Commands::Credits => {
            display::print_credits(sessions.current().as_ref());
            Ok(())
        }
        Commands::Buy { package } => {
            let (session, bought) = sessions.buy(package).context("purchase failed")?;
            println!(
                "Bought {} ({} credits). Balance: {} credits.",
                bought.name, bought.credits, session.credits
            );
            Ok(())
        }
    }
}

// ── Scans ──

async fn analyze(cli: &Cli, args: &AnalyzeArgs, sessions: &SessionStore) -> Result<()> {
    ensure_credit(sessions)?;
    let scans = open_scans(cli)?;

    let side = ImageUpload::from_path(&args.capture.side)
        .await
        .with_context(|| format!("failed to read {}", args.capture.side.display()))?;
    let mut request = AnalysisRequest::new(side).with_breed(Breed::from_hint(args.breed.as_deref()));
    if let Some(teeth) = &args.capture.teeth {
        let upload = ImageUpload::from_path(teeth)
            .await
            .with_context(|| format!("failed to read {}", teeth.display()))?;
        request = request.with_teeth(upload);
    }

    let mut client = AnalysisClient::new(&cli.ml_api_url);
    if let Some(secs) = args.timeout_secs {
        client = client.with_timeout(Duration::from_secs(secs));
    }

    let policy = args.fallback_policy();
    let mut rng = StdRng::from_entropy();
    let outcome = scan_with_fallback(
        &client,
        &request,
        captured_images(&args.capture),
        |cause| decide_fallback(policy, cause, confirm_mock),
        &mut rng,
    )
    .await
    .context("analysis failed")?;

    if let ScanOutcome::Mocked { cause, .. } = &outcome {
        eprintln!("Analysis unavailable ({cause}); showing a simulated assessment.");
    }
    finish_scan(&scans, sessions, &outcome.into_assessment())
}

fn mock(cli: &Cli, capture: &CaptureArgs, sessions: &SessionStore) -> Result<()> {
    ensure_credit(sessions)?;
    let scans = open_scans(cli)?;
    let assessment = generate_mock_assessment(captured_images(capture));
    finish_scan(&scans, sessions, &assessment)
}

fn show(cli: &Cli, id: Option<&str>, json: bool) -> Result<()> {
    let scans = open_scans(cli)?;
    let scan = match id {
        Some(id) => scans.get(id).with_context(|| format!("no scan {id}"))?,
        None => match scans.latest()? {
            Some(scan) => scan,
            None => bail!("no saved scans"),
        },
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&scan)?);
    } else {
        display::print_assessment_card(&scan);
    }
    Ok(())
}

/// Save, charge, and print a freshly produced assessment.
fn finish_scan(scans: &ScanStore, sessions: &SessionStore, scan: &ScanAssessment) -> Result<()> {
    let path = scans.save(scan).context("failed to save scan")?;
    info!(id = %scan.id, path = %path.display(), mock = scan.is_mock(), "scan saved");

    match sessions.consume_credit() {
        Ok(session) => debug!(credits = session.credits, "credit consumed"),
        Err(StoreError::NotLoggedIn) => {}
        Err(e) => warn!(error = %e, "could not charge credit"),
    }

    display::print_assessment_card(scan);
    Ok(())
}

/// Refuse to scan when a logged-in user has no credits left.
fn ensure_credit(sessions: &SessionStore) -> Result<()> {
    if let Some(session) = sessions.current()
        && session.credits == 0
    {
        bail!("no credits left; buy a package with `livestoq buy <package>`");
    }
    Ok(())
}

fn open_scans(cli: &Cli) -> Result<ScanStore> {
    let dir = cli.data_dir.join("scans");
    ScanStore::open(&dir).with_context(|| format!("failed to open scan store {}", dir.display()))
}

fn captured_images(capture: &CaptureArgs) -> CapturedImages {
    let mut images = CapturedImages::new();
    images.insert(CaptureSlot::Side, path_string(&capture.side));
    if let Some(teeth) = &capture.teeth {
        images.insert(CaptureSlot::Teeth, path_string(teeth));
    }
    images
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

/// Apply the fallback policy. Asking reads stdin, so it runs via
/// `block_in_place` to keep the runtime's worker free.
fn decide_fallback<P>(policy: FallbackPolicy, cause: &AnalysisError, prompt: P) -> bool
where
    P: FnOnce(&AnalysisError) -> bool,
{
    match policy {
        FallbackPolicy::Always => true,
        FallbackPolicy::Never => false,
        FallbackPolicy::Ask => tokio::task::block_in_place(|| prompt(cause)),
    }
}

fn confirm_mock(cause: &AnalysisError) -> bool {
    eprintln!("Analysis failed: {cause}");
    eprint!("Use a simulated assessment instead? [y/N] ");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// ── Assistant ──

async fn ask(cli: &Cli, question: &str) -> Result<()> {
    let config = AssistantConfig {
        base_url: cli.llm_base_url.clone(),
        model: cli.llm_model.clone(),
        ..Default::default()
    };
    let assistant = Assistant::new(cli.openai_api_key.clone(), config)?;
    let reply = assistant
        .ask(&[ChatMessage::user(question)])
        .await
        .context("assistant request failed")?;
    println!("{reply}");
    Ok(())
}
