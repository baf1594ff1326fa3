use clap::Parser;
use log::{info, warn};
use sales_analytics::*;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sales-analytics")]
#[command(about = "Validate, analyse and enrich sales transactions into a text report", long_about = None)]
struct Cli {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    report: Option<PathBuf>,
    #[arg(long)]
    enriched_output: Option<PathBuf>,
    #[arg(long)]
    catalog_url: Option<String>,
    /// Write the full analysis as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    min_amount: Option<f64>,
    #[arg(long)]
    max_amount: Option<f64>,
    /// Skip the filter prompt; implied by any filter flag
    #[arg(long, default_value_t = false)]
    no_interactive: bool,
    /// Skip the catalog fetch; every record is reported as not enriched
    #[arg(long, default_value_t = false)]
    offline: bool,
}

impl Cli {
    fn load_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(input) = &self.input {
            config.input_path = input.clone();
        }
        if let Some(report) = &self.report {
            config.report_path = report.clone();
        }
        if let Some(enriched) = &self.enriched_output {
            config.enriched_path = enriched.clone();
        }
        if let Some(url) = &self.catalog_url {
            config.catalog_url = url.clone();
        }

        config.validate()?;
        Ok(config)
    }

    fn prompts_for_filters(&self) -> bool {
        !self.no_interactive && self.flag_criteria().is_empty()
    }

    fn flag_criteria(&self) -> FilterCriteria {
        FilterCriteria {
            region: self.region.clone(),
            min_amount: self.min_amount,
            max_amount: self.max_amount,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    println!("==============================");
    println!("      SALES ANALYTICS SYSTEM");
    println!("==============================");

    match run(&cli) {
        Ok(()) => {
            println!("==============================");
            println!("Pipeline executed successfully");
            println!("==============================");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR OCCURRED");
            eprintln!("Reason: {}", e);
            eprintln!("Pipeline terminated.");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;

    let lines = read_sales_data_or_empty(&config.input_path)?;
    info!("Read {} records from {}", lines.len(), config.input_path.display());

    let transactions = parse_transactions(&lines);
    info!("Parsed {} records", transactions.len());

    let criteria = if cli.prompts_for_filters() {
        let stdin = io::stdin();
        let mut prompt = FilterPrompt::new(stdin.lock(), io::stdout());
        prompt.show_options(&FilterOptions::from_transactions(&transactions))?;
        prompt.read_criteria()?
    } else {
        cli.flag_criteria()
    };

    let products = if cli.offline {
        warn!("Offline mode, skipping catalog fetch");
        Vec::new()
    } else {
        fetch_catalog(&config)?
    };
    let mapping = create_product_mapping(&products);
    info!("Product mapping created with {} entries", mapping.len());

    let analysis_options = AnalysisOptions {
        top_n: config.top_n,
        low_stock_threshold: config.low_stock_threshold,
    };
    let outcome = SalesAnalyticsProcessor::process_with_verification(
        &transactions,
        &criteria,
        &mapping,
        &analysis_options,
        config.reconciliation_tolerance,
    )?;

    if let Some(peak) = &outcome.analysis.peak_day {
        info!(
            "Peak sales day: {} ({} across {} transactions)",
            peak.date,
            format_amount(peak.revenue),
            peak.transaction_count
        );
    }

    save_enriched_data(&config.enriched_path, &outcome.enriched)?;

    if let Some(path) = &cli.summary_json {
        std::fs::write(path, serde_json::to_string_pretty(&outcome.analysis)?)?;
        info!("Analysis summary written to {}", path.display());
    }

    let report = outcome.report(&ReportOptions::from_config(&config));
    report.write_to(&config.report_path, chrono::Local::now().naive_local())?;

    Ok(())
}

fn fetch_catalog(config: &PipelineConfig) -> Result<Vec<CatalogProduct>> {
    let client = CatalogClient::from_config(config)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    info!("Fetching product data from {}", client.url());
    runtime.block_on(client.fetch_products_or_empty())
}
