// Campaign Import - CLI
// preview / import CSV files, and inspect what the store holds

use anyhow::{Context, Result};
use campaign_import::{
    derive, display_error_lines, parse_and_validate, summarize, CampaignRecord, CampaignStatus,
    Config, ImportError, Importer, ParseDiagnostics, SqliteStore, StoredCampaign,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "campaign-import", version, about = "Import marketing campaign spreadsheets")]
struct Cli {
    /// SQLite database file (overrides CAMPAIGN_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// How many validation errors to print (overrides CAMPAIGN_ERROR_DISPLAY_LIMIT)
    #[arg(long, global = true)]
    error_limit: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse and validate a file without importing it
    Preview { file: PathBuf },
    /// Import a file; nothing is stored if any row is invalid
    Import { file: PathBuf },
    /// List stored campaigns with derived metrics
    Campaigns {
        /// Earliest start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Latest start date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Add one campaign by hand
    Add(AddArgs),
    /// List past import attempts
    History,
    /// Portfolio totals across all campaigns
    Summary,
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long)]
    name: String,
    /// active, paused or completed
    #[arg(long, value_parser = parse_status)]
    status: CampaignStatus,
    #[arg(long)]
    start_date: NaiveDate,
    #[arg(long)]
    end_date: Option<NaiveDate>,
    #[arg(long, default_value_t = 0.0)]
    spend: f64,
    #[arg(long, default_value_t = 0)]
    leads: i64,
    #[arg(long, default_value_t = 0)]
    conversions: i64,
    #[arg(long, default_value_t = 0.0)]
    revenue: f64,
}

impl AddArgs {
    fn to_record(&self) -> CampaignRecord {
        CampaignRecord {
            name: self.name.trim().to_string(),
            status: self.status,
            start_date: self.start_date,
            end_date: self.end_date,
            spend: self.spend,
            leads_generated: self.leads,
            conversions: self.conversions,
            revenue: self.revenue,
        }
    }
}

fn parse_status(raw: &str) -> Result<CampaignStatus, String> {
    CampaignStatus::parse(raw).ok_or_else(|| format!("unknown status {:?}", raw))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(limit) = cli.error_limit {
        config.error_display_limit = limit;
    }

    match cli.command {
        Commands::Preview { file } => run_preview(&file, &config),
        Commands::Import { file } => run_import(&file, &config).await,
        Commands::Campaigns { from, to } => run_campaigns(&config, from, to),
        Commands::Add(args) => run_add(&args, &config),
        Commands::History => run_history(&config),
        Commands::Summary => run_summary(&config),
    }
}

fn read_file(path: &Path) -> Result<(Vec<u8>, String)> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok((bytes, file_name))
}

fn print_diagnostics(diagnostics: &ParseDiagnostics) {
    println!("   Delimiter: {}", diagnostics.delimiter.name());
    println!("   Data rows: {}", diagnostics.row_count);
    if diagnostics.blank_records_skipped > 0 {
        println!("   Blank lines skipped: {}", diagnostics.blank_records_skipped);
    }
    if !diagnostics.unrecognized_columns.is_empty() {
        println!(
            "   Unrecognized columns: {}",
            diagnostics.unrecognized_columns.join(", ")
        );
    }
    if !diagnostics.missing_fields.is_empty() {
        let missing: Vec<&str> = diagnostics.missing_fields.iter().map(|f| f.as_str()).collect();
        println!("   Missing columns: {}", missing.join(", "));
    }
    println!("   SHA-256: {}", diagnostics.content_sha256);
}

fn print_error_lines(lines: &[String]) {
    for line in lines {
        println!("   {}", line);
    }
}

fn run_preview(file: &Path, config: &Config) -> Result<ExitCode> {
    let (bytes, file_name) = read_file(file)?;

    println!("📂 Preview: {}", file_name);
    let preview = match parse_and_validate(&bytes) {
        Ok(preview) => preview,
        Err(e) => {
            eprintln!("❌ {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    print_diagnostics(&preview.diagnostics);

    if preview.is_valid() {
        println!("✓ {} rows ready to import", preview.rows.len());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("\n❌ {} validation error(s):", preview.errors.len());
        print_error_lines(&display_error_lines(
            &preview.errors,
            config.error_display_limit,
        ));
        Ok(ExitCode::FAILURE)
    }
}

async fn run_import(file: &Path, config: &Config) -> Result<ExitCode> {
    let (bytes, file_name) = read_file(file)?;
    let store = SqliteStore::open(&config.db_path)?;
    let importer = Importer::new(store);

    println!("📂 Importing: {}", file_name);
    match importer.import_file(&bytes, &file_name).await {
        Ok(summary) if summary.is_committed() => {
            print_diagnostics(&summary.diagnostics);
            println!("✅ Imported {} campaigns", summary.committed_count);
            Ok(ExitCode::SUCCESS)
        }
        Ok(summary) => {
            print_diagnostics(&summary.diagnostics);
            println!(
                "\n❌ Import blocked: {} validation error(s), nothing was imported",
                summary.errors.len()
            );
            print_error_lines(&summary.display_lines(config.error_display_limit));
            Ok(ExitCode::FAILURE)
        }
        Err(e @ ImportError::UnparseableFile(_)) | Err(e @ ImportError::StoreFailure(_)) => {
            eprintln!("❌ {}", e);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_campaign(campaign: &StoredCampaign) {
    let record = &campaign.record;
    let metrics = derive(record);
    println!(
        "{}  {:<30} {:<9} {}  spend {:>10.2}  leads {:>6}  conv {:>5}  revenue {:>10.2}  CPL {:>8.2}  ROI {:>7.1}%  CR {:>5.1}%",
        campaign.id,
        record.name,
        record.status.as_str(),
        record.start_date,
        record.spend,
        record.leads_generated,
        record.conversions,
        record.revenue,
        metrics.cost_per_lead,
        metrics.return_on_investment,
        metrics.conversion_rate,
    );
}

fn run_campaigns(
    config: &Config,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<ExitCode> {
    let store = SqliteStore::open(&config.db_path)?;
    let campaigns = match (from, to) {
        (None, None) => store.list_campaigns()?,
        (from, to) => store.list_campaigns_between(from, to)?,
    };

    println!("📊 {} campaigns", campaigns.len());
    for campaign in &campaigns {
        print_campaign(campaign);
    }

    Ok(ExitCode::SUCCESS)
}

fn run_add(args: &AddArgs, config: &Config) -> Result<ExitCode> {
    let record = args.to_record();

    if let Err(violations) = record.validate() {
        eprintln!("❌ Campaign not saved:");
        for violation in &violations {
            eprintln!("   {}", violation);
        }
        return Ok(ExitCode::FAILURE);
    }

    let store = SqliteStore::open(&config.db_path)?;
    let campaign = store.create_campaign(&record)?;
    println!("✅ Campaign saved");
    print_campaign(&campaign);

    Ok(ExitCode::SUCCESS)
}

fn run_history(config: &Config) -> Result<ExitCode> {
    let store = SqliteStore::open(&config.db_path)?;
    let history = store.list_import_history()?;

    println!("🗂️  {} import attempts", history.len());
    for entry in &history {
        let outcome = &entry.outcome;
        println!(
            "{}  {:<8} {:>6} records  {}{}",
            entry.uploaded_at.format("%Y-%m-%d %H:%M:%S"),
            outcome.status.as_str(),
            outcome.record_count,
            outcome.file_name,
            outcome
                .error_detail
                .as_deref()
                .map(|detail| format!("  ({})", detail))
                .unwrap_or_default(),
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn run_summary(config: &Config) -> Result<ExitCode> {
    let store = SqliteStore::open(&config.db_path)?;
    let campaigns = store.list_campaigns()?;
    let summary = summarize(campaigns.iter().map(|c| &c.record));

    println!("📈 Portfolio summary");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   Campaigns:        {}", summary.campaign_count);
    println!("   Total spend:      {:.2}", summary.total_spend);
    println!("   Total revenue:    {:.2}", summary.total_revenue);
    println!("   Total leads:      {}", summary.total_leads);
    println!("   Conversions:      {}", summary.total_conversions);
    println!("   Avg CPL:          {:.2}", summary.average_cost_per_lead);
    println!("   Total ROI:        {:.1}%", summary.total_return_on_investment);
    println!("   Conversion rate:  {:.1}%", summary.average_conversion_rate);

    Ok(ExitCode::SUCCESS)
}
