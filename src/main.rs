mod batch;
mod classify;
mod decode;
mod generator;
mod iban;
mod intent;
mod logging;
mod models;
mod reference;
mod util;

use batch::{run_batch, BatchReport};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use generator::{generate_scans, GeneratorConfig};
use models::{PaymentIntent, QrKind, QrPayload, ScanRecord};
use rand::Rng;
use serde::Serialize;
use std::fs::create_dir_all;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "payscan")]
#[command(about = "IBAN validation and QR payment decoding toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Iban(IbanArgs),
    Decode(DecodeArgs),
    Batch(BatchArgs),
    Generate(GenerateArgs),
}

#[derive(Parser)]
struct IbanArgs {
    iban: String,
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Parser)]
struct DecodeArgs {
    #[arg(long)]
    payload: Option<String>,
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Parser)]
struct BatchArgs {
    #[arg(long, default_value = "data/scans.csv")]
    input: PathBuf,
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Parser)]
struct GenerateArgs {
    #[arg(long, default_value_t = 500)]
    count: usize,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 0.25)]
    swiss_ratio: f64,
    #[arg(long, default_value_t = 0.20)]
    epc_ratio: f64,
    #[arg(long, default_value_t = 0.15)]
    json_ratio: f64,
    #[arg(long, default_value_t = 0.20)]
    account_ratio: f64,
    #[arg(long, default_value_t = 0.10)]
    url_ratio: f64,
    #[arg(long, default_value_t = 0.10)]
    malformed_ratio: f64,
    #[arg(long, default_value = "data/scans.csv")]
    output: PathBuf,
}

#[derive(Serialize)]
struct IbanOutput {
    input: String,
    valid: bool,
    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    error: Option<iban::IbanError>,
    formatted: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<&'static str>,
}

#[derive(Serialize)]
struct DecodeOutput {
    kind: QrKind,
    valid: bool,
    payload: QrPayload,
    #[serde(skip_serializing_if = "PaymentIntent::is_empty")]
    intent: PaymentIntent,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    logging::init_logging("payscan")?;
    let cli = Cli::parse();
    match cli.command {
        Command::Iban(args) => run_iban(args),
        Command::Decode(args) => run_decode(args),
        Command::Batch(args) => run_batch_cmd(args),
        Command::Generate(args) => run_generate(args),
    }
}

fn run_iban(args: IbanArgs) -> Result<(), String> {
    let check = iban::validate(&args.iban);
    let formatted = iban::format(&args.iban);
    let country = iban::country_of(&args.iban);

    if args.json {
        let output = IbanOutput {
            input: args.iban,
            valid: check.valid,
            error: check.error,
            formatted,
            country,
        };
        let rendered = serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
        println!("{rendered}");
        return Ok(());
    }

    match check.error {
        None => emit_info_line(&format!("IBAN {}: valid", formatted)),
        Some(error) => emit_info_line(&format!("IBAN {}: invalid ({})", formatted, error.code())),
    }
    if let Some(country) = country {
        emit_info_line(&format!("Country: {country}"));
    }
    Ok(())
}

fn run_decode(args: DecodeArgs) -> Result<(), String> {
    let DecodeArgs {
        payload,
        input,
        json,
    } = args;
    let raw = match (payload, input) {
        (Some(_), Some(_)) => {
            return Err("--payload and --input are mutually exclusive".to_string())
        }
        (Some(payload), None) => payload,
        (None, Some(path)) => {
            let contents = std::fs::read_to_string(&path).map_err(|err| err.to_string())?;
            contents.trim_end_matches(['\r', '\n']).to_string()
        }
        (None, None) => {
            let mut contents = String::new();
            std::io::stdin()
                .read_to_string(&mut contents)
                .map_err(|err| err.to_string())?;
            contents.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    let record = decode::process(&raw);
    let valid = decode::validate(&record);
    let intent = intent::to_payment_intent(&record);

    if json {
        let output = DecodeOutput {
            kind: record.kind(),
            valid,
            payload: record.payload,
            intent,
        };
        let rendered = serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
        println!("{rendered}");
        return Ok(());
    }

    emit_info_line(&format!("Kind: {}", record.kind().as_str()));
    emit_info_line(&format!("Dialect: {}", record.payload.dialect()));
    emit_info_line(&format!("Valid: {}", valid));
    let fields = [
        ("Recipient", &intent.recipient),
        ("IBAN", &intent.iban),
        ("Amount", &intent.amount),
        ("Note", &intent.note),
        ("Street", &intent.street),
        ("House number", &intent.house_number),
        ("Postal code", &intent.postal_code),
        ("City", &intent.city),
        ("Country", &intent.country),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            emit_info_line(&format!("{}: {}", label, value));
        }
    }
    Ok(())
}

fn run_batch_cmd(args: BatchArgs) -> Result<(), String> {
    let batch_start = Instant::now();
    let report = run_batch(&args.input, args.output.as_deref())?;
    let batch_elapsed = batch_start.elapsed();

    log_batch_report(&report);
    if let Some(output) = args.output {
        emit_info_line(&format!("Decoded output: {}", output.display()));
    }
    emit_info_line(&format!("Batch time: {} ms", batch_elapsed.as_millis()));
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<(), String> {
    let now = chrono::Utc::now();
    let seed = args.seed.unwrap_or_else(random_seed);
    let config = GeneratorConfig {
        scans: args.count,
        swiss_ratio: args.swiss_ratio,
        epc_ratio: args.epc_ratio,
        json_ratio: args.json_ratio,
        account_ratio: args.account_ratio,
        url_ratio: args.url_ratio,
        malformed_ratio: args.malformed_ratio,
        year: now.year(),
        month: now.month(),
    };

    log::info!(
        "Generator options: swiss={} epc={} json={} account={} url={} malformed={}",
        config.swiss_ratio,
        config.epc_ratio,
        config.json_ratio,
        config.account_ratio,
        config.url_ratio,
        config.malformed_ratio
    );
    log::info!("Generating {} scans (seed {})", config.scans, seed);

    let gen_start = Instant::now();
    let records = generate_scans(&config, seed)?;
    let gen_elapsed = gen_start.elapsed();
    write_csv(&args.output, &records)?;

    emit_info_line(&format!(
        "Generated {} scans for {}-{:02}, seed {}, output {}",
        records.len(),
        config.year,
        config.month,
        seed,
        args.output.display()
    ));
    emit_info_line(&format!("Generation time: {} ms", gen_elapsed.as_millis()));
    Ok(())
}

fn log_batch_report(report: &BatchReport) {
    emit_info_line(&format!(
        "Batch: scans={} valid={} invalid={} read_errors={}",
        report.total_scans, report.valid_scans, report.invalid_scans, report.read_errors
    ));
    emit_info_line(&format!(
        "Kinds: payment={} account={} url={} text={} unknown={}",
        report.payment_scans,
        report.account_scans,
        report.url_scans,
        report.text_scans,
        report.unknown_scans
    ));
    emit_info_line(&format!(
        "Corpus mismatches: kind={} validity={}",
        report.kind_mismatches, report.validity_mismatches
    ));
}

fn random_seed() -> u64 {
    let mut rng = rand::rngs::OsRng;
    rng.gen()
}

fn write_csv(output: &Path, records: &[ScanRecord]) -> Result<(), String> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent).map_err(|err| err.to_string())?;
        }
    }
    let mut writer = csv::Writer::from_path(output).map_err(|err| err.to_string())?;
    for record in records {
        writer.serialize(record).map_err(|err| err.to_string())?;
    }
    writer.flush().map_err(|err| err.to_string())
}

fn emit_info_line(message: &str) {
    if log::log_enabled!(log::Level::Info) {
        log::info!("{}", message);
    } else {
        println!("{message}");
    }
}
