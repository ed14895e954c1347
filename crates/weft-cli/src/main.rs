//! `weft` - command line front end for the coordination kernel.
//!
//! - `weft demo` runs the end-to-end coordination scenarios in-process
//! - `weft check-config <FILE>` validates a configuration file
//! - `weft guardrails <TEXT>` runs the destructive-pattern check
//! - `weft default-config` prints the built-in configuration as YAML

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use weft_core::config::TrustProfile;
use weft_core::domain::{Action, AgentId, AgentType, AuditFilter, Effect, TaskDraft, TrustLevel};
use weft_core::policy::Severity;
use weft_core::{KernelBuilder, KernelConfig, KernelError};

#[derive(Parser)]
#[command(name = "weft")]
#[command(version, about = "Coordination kernel for agents sharing one codebase", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "WEFT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(long, global = true, env = "WEFT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the lock / queue / pause / policy scenarios against an in-process kernel
    Demo,

    /// Validate a configuration file
    #[command(name = "check-config")]
    CheckConfig {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Check an action description against the guardrails
    Guardrails {
        description: String,

        /// Exit non-zero when a violation at or above this severity is found
        #[arg(long, value_name = "SEVERITY", value_parser = parse_severity)]
        fail_on: Option<Severity>,
    },

    /// Print the built-in default configuration
    #[command(name = "default-config")]
    DefaultConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Demo => demo(load_config(cli.config.as_deref())?).await,
        Commands::CheckConfig { file } => check_config(&file),
        Commands::Guardrails { description, fail_on } => {
            guardrails(load_config(cli.config.as_deref())?, &description, fail_on).await
        }
        Commands::DefaultConfig => {
            let yaml = KernelConfig::default().to_yaml_string()?;
            print!("{yaml}");
            Ok(())
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}

fn parse_severity(s: &str) -> Result<Severity, String> {
    match s.to_ascii_lowercase().as_str() {
        "low" => Ok(Severity::Low),
        "medium" => Ok(Severity::Medium),
        "high" => Ok(Severity::High),
        "critical" => Ok(Severity::Critical),
        other => Err(format!("unknown severity '{other}' (low, medium, high, critical)")),
    }
}

fn load_config(path: Option<&Path>) -> Result<KernelConfig> {
    match path {
        Some(path) => KernelConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config at {}", path.display())),
        None => Ok(KernelConfig::default()),
    }
}

fn check_config(file: &Path) -> Result<()> {
    let config = KernelConfig::from_yaml_file(file)
        .with_context(|| format!("Failed to load config at {}", file.display()))?;
    config.validate().context("Configuration is invalid")?;
    println!(
        "{}: ok (policy {}, {} rules, {} trust profiles, {} extra guardrails)",
        file.display(),
        config.policy.version,
        config.policy.rules.len(),
        config.trust.profiles.len(),
        config.guardrails.patterns.len()
    );
    Ok(())
}

async fn guardrails(config: KernelConfig, description: &str, fail_on: Option<Severity>) -> Result<()> {
    let kernel = KernelBuilder::new(config).build()?;
    let who = kernel.resolve(&AgentId::new("weft-cli"));
    let report = kernel.check_guardrails(&who, description).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if let Some(threshold) = fail_on
        && report.is_blocking(threshold)
    {
        bail!("guardrail violation at or above {threshold}");
    }
    Ok(())
}

/// Demo agents are added only when the config defines no profiles.
fn with_demo_agents(mut config: KernelConfig) -> KernelConfig {
    if config.trust.profiles.is_empty() {
        for (agent, agent_type, trust_level) in [
            ("agent-a", AgentType::Local, TrustLevel::Standard),
            ("agent-b", AgentType::Cloud, TrustLevel::Standard),
            ("lead", AgentType::Orchestrator, TrustLevel::Elevated),
        ] {
            config.trust.profiles.push(TrustProfile {
                agent_id: agent.into(),
                agent_type,
                trust_level,
                capabilities: Default::default(),
            });
        }
    }
    config
}

async fn demo(config: KernelConfig) -> Result<()> {
    let kernel = KernelBuilder::new(with_demo_agents(config)).build()?;
    let sweeper = kernel.spawn_sweeper();
    let a = kernel.resolve(&"agent-a".into());
    let b = kernel.resolve(&"agent-b".into());
    let lead = kernel.resolve(&"lead".into());
    let minute = Some(Duration::from_secs(60));

    info!("1. lock contention");
    let grant = kernel.acquire_lock(&a, "file.py", minute).await?;
    println!("agent-a holds file.py until {}", grant.expires_at());
    match kernel.acquire_lock(&b, "file.py", minute).await {
        Err(e @ KernelError::LockHeld { .. }) => println!("agent-b: {e}"),
        other => bail!("expected LockHeld for agent-b, got {other:?}"),
    }
    kernel.release_lock(&a, "file.py").await?;

    info!("2. dependency gating");
    let t1 = kernel.submit(&a, TaskDraft::new("edit", json!({"file": "a.rs"}))).await?.id;
    let t2 = kernel
        .submit(&a, TaskDraft::new("test", json!({"suite": "unit"})).depends_on(t1))
        .await?
        .id;
    let first = kernel.claim(&a).await?.context("T1 should be claimable")?;
    println!("claimed {} (T2 {} waits on it)", first.id, t2);
    if kernel.claim(&b).await?.is_some() {
        bail!("T2 was claimable before T1 completed");
    }

    info!("3. claimant check");
    match kernel.complete(&b, t1, json!("b's result")).await {
        Err(e @ KernelError::NotClaimant { .. }) => println!("agent-b: {e}"),
        other => bail!("expected NotClaimant, got {other:?}"),
    }
    kernel.complete(&a, t1, json!({"patched": true})).await?;
    let second = kernel.claim(&b).await?.context("T2 should be claimable")?;
    println!("agent-b claimed {} after T1 completed", second.id);

    info!("4. fail and reschedule");
    kernel.fail(&b, t2, "timeout").await?;
    let rescheduled = kernel.reschedule(&lead, t2).await?;
    println!("{} is {:?} again, claimed_by={:?}", t2, rescheduled.status, rescheduled.claimed_by);
    kernel.claim(&a).await?.context("rescheduled task should be claimable")?;
    kernel.complete(&a, t2, json!("green")).await?;

    info!("5. pause lock");
    kernel.pause_feature(&lead, "f1", minute).await?;
    let tagged = kernel
        .submit(&a, TaskDraft::new("edit", json!(null)).with_feature("f1"))
        .await?
        .id;
    println!("paused features: {:?}", kernel.paused_features().await?);
    if kernel.claim(&a).await?.is_some() {
        bail!("claimed a task of a paused feature");
    }
    kernel.release_lock(&lead, "feature:f1:pause").await?;
    let resumed = kernel.claim(&a).await?.context("task should be claimable after resume")?;
    println!("claimed {} after resume (expected {tagged})", resumed.id);

    info!("6. policy denial");
    let bot = kernel.resolve(&"unregistered-bot".into());
    let decision = kernel
        .authorize(&bot, &Action::from("delete_table"), "users")
        .await?;
    println!("{} {} on users: {:?} ({})", bot.agent_id, decision.action, decision.decision, decision.reason);
    let denied = kernel
        .audit_query(&AuditFilter::default().decision(Effect::Deny))
        .await?;
    println!("audit trail holds {} deny decision(s)", denied.len());

    let report = kernel.check_guardrails(&bot, "DROP TABLE users;").await;
    println!("guardrails on 'DROP TABLE users;': {:?}", report.pattern_names());

    println!("{}", serde_json::to_string_pretty(&kernel.status().await?)?);
    if let Some(sweeper) = sweeper {
        sweeper.shutdown_and_join().await;
    }
    Ok(())
}
