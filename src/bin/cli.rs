use anyhow::Result;
use colored::*;
use formadv::{
    adv::{
        parsing::FilingProcessor,
        pdf::{extract_file, PdfTextExtractor},
        Ingestor,
    },
    analytics,
    core::config::{parse_firm_list, IngestConfig},
    storage::{FundStorage, PrivateFund, SqliteConfig, SqliteStorage},
    FilingText,
};
use chrono::NaiveDate;
use indicatif::MultiProgress;
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "formadv", about = "Form ADV private fund ingestion and analytics")]
struct Opt {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// Download the compiled feed and firm PDFs, extract private funds and store them
    Ingest {
        /// Feed date (YYYY-MM-DD)
        #[structopt(long)]
        working_date: Option<NaiveDate>,
        /// Comma separated firm CRD numbers
        #[structopt(long)]
        firms: Option<String>,
        /// Only download, do not parse or store
        #[structopt(long)]
        download_only: bool,
        /// Where to write the merged CSV
        #[structopt(long, parse(from_os_str))]
        export_csv: Option<PathBuf>,
    },
    /// Extract one filing PDF and print the result as JSON
    Parse {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        /// Firm CRD number; defaults to the file stem
        #[structopt(long)]
        firm_id: Option<i64>,
        /// Also write the extracted text to this file
        #[structopt(long, parse(from_os_str))]
        dump_text: Option<PathBuf>,
    },
    /// Create the fund table
    InitDb,
    /// List the stored funds of one firm
    Funds { firm_crd: i64 },
    /// Largest stored funds by gross asset value
    Top {
        #[structopt(default_value = "5")]
        n: u32,
    },
    /// Top funds, average fund value per firm, and the two joined
    Analyze {
        #[structopt(long, default_value = "5")]
        top: usize,
        /// Directory for CSV exports of the report tables
        #[structopt(long, parse(from_os_str))]
        export_dir: Option<PathBuf>,
    },
}

fn print_funds(funds: &[PrivateFund]) {
    for fund in funds {
        println!(
            "{:>10}  {:<20} {:>18}  {}",
            fund.firm_crd_nb.to_string().cyan(),
            fund.fund_id,
            fund.gross_asset_value.to_string().green(),
            fund.fund_name
        );
    }
}

async fn open_storage(config: &IngestConfig) -> Result<SqliteStorage> {
    let storage = SqliteStorage::connect(SqliteConfig::new(&config.database_url)).await?;
    storage.init().await?;
    Ok(storage)
}

fn parse_command(input: PathBuf, firm_id: Option<i64>, dump_text: Option<PathBuf>) -> Result<()> {
    let firm_id = match firm_id {
        Some(id) => id,
        None => input
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| anyhow::anyhow!("Cannot derive a firm id from {:?}; pass --firm-id", input))?,
    };

    let processor = FilingProcessor::default();
    let extraction = match extract_file(&PdfTextExtractor, &input) {
        Ok(raw) => {
            let text = FilingText::new(raw);
            if let Some(path) = dump_text {
                std::fs::write(&path, text.as_str())?;
                log::info!("Extracted text written to {}", path.display());
            }
            processor.process(firm_id, &text)
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error extracting text from PDF:".red(), e);
            formadv::FilingExtraction::empty(firm_id)
        }
    };

    println!("{}", serde_json::to_string_pretty(&extraction)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let opt = Opt::from_args();
    let mut config = IngestConfig::from_env()?;

    match opt.command {
        Command::Ingest {
            working_date,
            firms,
            download_only,
            export_csv,
        } => {
            if let Some(date) = working_date {
                config.working_date = date;
            }
            if let Some(firms) = firms {
                config.target_firms = parse_firm_list(&firms)?;
            }
            if download_only {
                config.process_data = false;
            }
            if export_csv.is_some() {
                config.export_csv = export_csv;
            }

            let storage = if config.process_data {
                Some(open_storage(&config).await?)
            } else {
                None
            };

            let ingestor = Ingestor::new(config)?.with_progress(Arc::new(MultiProgress::new()));
            let report = ingestor
                .run(storage.as_ref().map(|s| s as &dyn FundStorage))
                .await?;

            println!("{}", "Data ingestion completed".green().bold());
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Parse {
            input,
            firm_id,
            dump_text,
        } => parse_command(input, firm_id, dump_text)?,
        Command::InitDb => {
            open_storage(&config).await?;
            println!("Database ready at {}", config.database_url);
        }
        Command::Funds { firm_crd } => {
            let storage = open_storage(&config).await?;
            let funds = storage.funds_by_firm(firm_crd).await?;
            if funds.is_empty() {
                println!("{}", "Firm not found or has no funds.".yellow());
            } else {
                print_funds(&funds);
            }
        }
        Command::Top { n } => {
            let storage = open_storage(&config).await?;
            print_funds(&storage.top_funds(n).await?);
        }
        Command::Analyze { top, export_dir } => {
            let storage = open_storage(&config).await?;
            let values = analytics::clean(storage.fund_values().await?);

            println!("{}", format!("Top {} Private Funds by Gross Asset Value:", top).bold());
            let top_funds = analytics::top_funds(&values, top);
            for fund in &top_funds {
                println!("  {:<50} {:>18}", fund.fund_name, fund.gross_asset_value);
            }

            println!("\n{}", "Average Fund Value per Firm:".bold());
            let averages = analytics::average_per_firm(&values);
            for avg in &averages {
                println!("  {:>10} {:>20.2}", avg.firm_crd_nb, avg.avg_gross_asset_value);
            }

            println!("\n{}", "Top Funds with Firm Averages:".bold());
            let joined = analytics::top_with_firm_average(&values, top);
            for fund in &joined {
                let avg = fund
                    .avg_gross_asset_value
                    .map(|a| format!("{:.2}", a))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  {:<50} {:>18} {:>20}",
                    fund.fund_name, fund.gross_asset_value, avg
                );
            }

            if let Some(dir) = export_dir {
                std::fs::create_dir_all(&dir)?;
                analytics::write_report_csv(&dir.join("adv_filing.csv"), &values)?;
                analytics::write_report_csv(&dir.join("top_funds_analysis.csv"), &joined)?;
                println!("\nReport tables written to {}", dir.display().to_string().dimmed());
            }
        }
    }

    Ok(())
}
