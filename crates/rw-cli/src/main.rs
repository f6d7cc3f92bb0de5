use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rw_config::{load_layered_yaml, load_monitor_config, MonitorConfig};
use rw_consensus::{parse_reading, ConsensusMode, ConsensusPolicy, PolicySpec};
use rw_engine::{attestation_for, evaluate_with_policy, EvaluationInputs};
use rw_schemas::{EnforcementSnapshot, RawReservePayload};
use rw_signature::{canonical_message, verify};
use rw_sources::Sources;
use rw_status::DerivedStatus;
use serde::de::DeserializeOwned;
use std::fs;

#[derive(Parser)]
#[command(name = "reservewatch")]
#[command(about = "ReserveWatch reserve monitor CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate layered config, print its hash + canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Check the signature of one reserve payload (JSON file)
    Verify {
        #[arg(long = "payload-file")]
        payload_file: String,

        /// Address the payload must be signed by. Omit => not required.
        #[arg(long)]
        expected_signer: Option<String>,

        /// Connector id used when the payload omits `source`
        #[arg(long)]
        source_id: Option<String>,
    },

    /// Evaluate recorded inputs (JSON file) offline
    Evaluate {
        #[arg(long = "inputs-file")]
        inputs_file: String,

        /// Layered config paths; the policy is taken from `consensus`
        #[arg(long = "config", conflicts_with = "mode")]
        config_paths: Vec<String>,

        /// Consensus mode with default thresholds (primary_only | require_match | conservative_min)
        #[arg(long)]
        mode: Option<String>,

        /// Evaluation instant (unix seconds). Defaults to now.
        #[arg(long)]
        now: Option<i64>,

        /// Exit non-zero unless the status is HEALTHY
        #[arg(long, default_value_t = false)]
        require_healthy: bool,
    },

    /// Collect from the configured sources once and evaluate
    PollOnce {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Exit non-zero unless the status is HEALTHY
        #[arg(long, default_value_t = false)]
        require_healthy: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = load_layered_yaml(&path_refs)?;
            MonitorConfig::from_loaded(&loaded)?.validate()?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Verify {
            payload_file,
            expected_signer,
            source_id,
        } => {
            let payload: RawReservePayload = read_json(&payload_file)?;
            let reading = parse_reading(&payload, source_id.as_deref().unwrap_or_default())
                .context("payload is not a valid reserve reading")?;
            let fields = reading.signed_fields();
            let v = verify(&fields, expected_signer.as_deref());

            let verdict = match v.valid {
                None => "not_required",
                Some(true) => "true",
                Some(false) => "false",
            };
            println!("valid={verdict}");
            println!(
                "recovered_signer={}",
                v.recovered_signer
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "none".to_string())
            );
            println!("message={}", canonical_message(&fields));

            if v.is_invalid() {
                bail!(
                    "SIGNATURE_INVALID: {}",
                    v.error.as_deref().unwrap_or("verification failed")
                );
            }
        }

        Commands::Evaluate {
            inputs_file,
            config_paths,
            mode,
            now,
            require_healthy,
        } => {
            let inputs: EvaluationInputs = read_json(&inputs_file)?;
            let policy = policy_from_args(&config_paths, mode.as_deref())?;
            let now = now.unwrap_or_else(|| chrono::Utc::now().timestamp());

            let derived = evaluate_with_policy(&inputs, &policy, now);
            report(&derived, &inputs.snapshot, require_healthy)?;
        }

        Commands::PollOnce {
            config_paths,
            require_healthy,
        } => {
            let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
            let validated = load_monitor_config(&path_refs)?;
            tracing::info!(config_hash = %validated.config_hash, "config loaded");

            let sources = Sources::from_config(&validated.config);
            let inputs = sources.collect().await;
            let now = chrono::Utc::now().timestamp();

            let derived = evaluate_with_policy(&inputs, &validated.policy, now);
            report(&derived, &inputs.snapshot, require_healthy)?;
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries only command output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

fn read_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid json in {path}"))
}

fn policy_from_args(config_paths: &[String], mode: Option<&str>) -> Result<ConsensusPolicy> {
    if !config_paths.is_empty() {
        let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
        return Ok(load_monitor_config(&path_refs)?.policy);
    }
    let mut spec = PolicySpec::new(ConsensusMode::RequireMatch);
    match mode {
        Some(m) => spec.mode = m.to_string(),
        None => bail!("either --config or --mode is required"),
    }
    spec.validate().context("CONFIG_INVALID_POLICY")
}

/// Print status, reasons, attestation and the full evaluation as JSON.
fn report(
    derived: &DerivedStatus,
    snapshot: &EnforcementSnapshot,
    require_healthy: bool,
) -> Result<()> {
    println!("status={}", derived.status);
    println!("reasons={}", derived.reason_strs().join(","));
    match attestation_for(derived, snapshot) {
        Ok(a) => println!("attestation={}", serde_json::to_string(&a)?),
        Err(blocked) => println!("attestation_blocked={blocked}"),
    }
    println!("{}", serde_json::to_string_pretty(derived)?);

    if require_healthy && !derived.is_healthy() {
        bail!("STATUS_NOT_HEALTHY: {}", derived.status);
    }
    Ok(())
}
