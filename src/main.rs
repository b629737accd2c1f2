use clap::{Parser, Subcommand};
use eyre::{bail, Result, WrapErr};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use presign_guard::{
    config::Config,
    narration::Narrator,
    report::AnalysisReport,
    reputation::ContractInfo,
    signatures::SignatureRegistry,
    templates::InMemoryTemplateStore,
    transaction::{TransactionRecord, TransactionRequest},
    Analyzer, RiskLevel,
};

#[derive(Parser)]
#[command(
    name = "presign-guard",
    about = "Pre-signature transaction analyzer: decodes calldata, scores risk, and explains what you are about to sign."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single transaction request
    Analyze {
        /// Recipient contract or account
        #[arg(long)]
        to: Option<String>,

        /// Hex calldata
        #[arg(long, default_value = "0x")]
        data: String,

        /// Value in wei (hex or decimal)
        #[arg(long)]
        value: Option<String>,

        /// Sender address
        #[arg(long)]
        from: Option<String>,

        /// Path to a request JSON file (alternative to --to/--data/--value)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output format: summary or json
        #[arg(long, default_value = "summary")]
        format: String,

        /// Save the report to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Exit 1 when overall risk is at or above this level
        #[arg(long)]
        fail_on: Option<RiskLevel>,
    },

    /// Analyze a JSON array of transaction requests
    Batch {
        /// Path to the requests JSON file
        #[arg(long)]
        input: PathBuf,

        /// Maximum requests accepted in one batch
        #[arg(long)]
        max_batch_size: Option<usize>,
    },

    /// Narrate a transaction record
    Narrate {
        /// Path to the transaction record JSON file
        #[arg(long)]
        input: PathBuf,

        /// Extra narration templates (JSON array), checked before the built-in set
        #[arg(long)]
        templates: Option<PathBuf>,
    },

    /// Show reputation info for a contract address
    Contract {
        #[arg(long)]
        address: String,
    },

    /// List known function signatures
    Signatures,
}

fn build_analyzer(cfg: &Config) -> Result<Analyzer> {
    Analyzer::from_config(cfg).wrap_err("Failed to initialize analyzer")
}

fn read_request(
    to: Option<String>,
    data: String,
    value: Option<String>,
    from: Option<String>,
    input: Option<PathBuf>,
) -> Result<TransactionRequest> {
    if let Some(path) = input {
        let content = fs::read_to_string(&path)
            .wrap_err_with(|| format!("Failed to read request: {}", path.display()))?;
        return serde_json::from_str(&content).wrap_err("Failed to parse request JSON");
    }
    let Some(to) = to else {
        bail!("either --to or --input is required");
    };
    let mut request = TransactionRequest::new(to, data);
    request.value = value;
    request.from = from;
    Ok(request)
}

#[allow(clippy::too_many_arguments)]
fn cmd_analyze(
    to: Option<String>,
    data: String,
    value: Option<String>,
    from: Option<String>,
    input: Option<PathBuf>,
    format: String,
    output: Option<PathBuf>,
    fail_on: Option<RiskLevel>,
) -> Result<i32> {
    let cfg = Config::load();
    let analyzer = build_analyzer(&cfg)?;
    let request = read_request(to, data, value, from, input)?;

    let report = analyzer.analyze(&request);

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_summary(&report),
    }

    if let Some(output_path) = output {
        fs::write(&output_path, serde_json::to_string_pretty(&report)?)?;
        eprintln!("Report saved to: {}", output_path.display());
    }

    let threshold = fail_on.unwrap_or_else(|| cfg.fail_on());
    if report.overall_risk() >= threshold {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn print_summary(report: &AnalysisReport) {
    let decoded = &report.decoded;
    let risk = &report.risk;

    println!("Pre-Signature Analysis");
    println!("======================");
    println!("To:             {}", report.transaction.to);
    println!("Value:          {:.4} ETH", report.transaction.value_eth);
    println!("Function:       {} ({})", decoded.function_name, decoded.protocol);
    println!(
        "Contract:       {} (reputation {}, {})",
        report.contract.name,
        report.contract.reputation,
        if report.contract.verified { "verified" } else { "unverified" }
    );
    println!();
    println!("{}", decoded.explanation);
    println!();
    println!("Risk:           {} (score {})", risk.overall_risk, risk.overall_score);
    println!("  value:    {}", risk.value_risk);
    println!("  function: {}", risk.function_risk);
    println!("  contract: {}", risk.contract_risk);
    println!("  gas:      {}", risk.gas_risk);

    if !decoded.warnings.is_empty() || report.contract_warning.is_some() {
        println!();
        println!("Warnings:");
        for warning in decoded.warnings.iter().chain(report.contract_warning.iter()) {
            println!("  - {}", warning);
        }
    }
    if !risk.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for rec in &risk.recommendations {
            println!("  - {}", rec);
        }
    }
    println!();
    println!("Narration:      {}", report.narration.text);
    println!("Report ID:      {}", report.report_id);
}

fn cmd_batch(input: PathBuf, max_batch_size: Option<usize>) -> Result<()> {
    let cfg = Config::load();
    let analyzer = build_analyzer(&cfg)?
        .with_max_batch_size(max_batch_size.unwrap_or_else(|| cfg.max_batch_size()));

    let content = fs::read_to_string(&input)
        .wrap_err_with(|| format!("Failed to read batch: {}", input.display()))?;
    let requests: Vec<TransactionRequest> =
        serde_json::from_str(&content).wrap_err("Failed to parse batch JSON")?;

    eprintln!("Analyzing {} transactions...", requests.len());
    let batch = analyzer.analyze_batch(&requests)?;
    println!("{}", serde_json::to_string_pretty(&batch)?);
    eprintln!("{}/{} analyzed", batch.analyzed, batch.total);
    Ok(())
}

fn cmd_narrate(input: PathBuf, templates: Option<PathBuf>) -> Result<()> {
    let content = fs::read_to_string(&input)
        .wrap_err_with(|| format!("Failed to read record: {}", input.display()))?;
    let record: TransactionRecord =
        serde_json::from_str(&content).wrap_err("Failed to parse transaction record JSON")?;

    let mut store = match templates {
        Some(path) => InMemoryTemplateStore::load(&path)
            .wrap_err_with(|| format!("Failed to load templates: {}", path.display()))?,
        None => InMemoryTemplateStore::default(),
    };
    store.extend(InMemoryTemplateStore::seeded());

    let result = Narrator::new(Arc::new(store)).narrate(&record);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_contract(address: String) -> Result<()> {
    let analyzer = build_analyzer(&Config::load())?;
    let info = analyzer.assessor().reputation().contract_info(&address);

    let known = info.is_some();
    let info = info.unwrap_or_else(|| ContractInfo::unknown(&address));
    let result = serde_json::json!({
        "known": known,
        "contract": info,
    });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_signatures() -> Result<()> {
    let registry = SignatureRegistry::builtin();

    println!("Known Function Signatures ({})", registry.len());
    println!("==========================");
    for d in registry.descriptors() {
        println!(
            "{:<12} {:<26} {:<10} {:<8} {:>7} gas  {}",
            d.selector,
            d.name,
            d.protocol,
            d.base_risk_tier.as_str(),
            d.gas_estimate,
            d.category.as_str()
        );
    }
    Ok(())
}

fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("presign_guard=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            to,
            data,
            value,
            from,
            input,
            format,
            output,
            fail_on,
        } => match cmd_analyze(to, data, value, from, input, format, output, fail_on) {
            Ok(code) => {
                if code != 0 {
                    std::process::exit(code);
                }
                Ok(())
            }
            Err(e) => Err(e),
        },
        Commands::Batch {
            input,
            max_batch_size,
        } => cmd_batch(input, max_batch_size),
        Commands::Narrate { input, templates } => cmd_narrate(input, templates),
        Commands::Contract { address } => cmd_contract(address),
        Commands::Signatures => cmd_signatures(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}
