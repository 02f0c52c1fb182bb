use crate::iban;
use crate::models::{QrKind, ScanRecord};
use crate::reference::{iban_length, IBAN_LENGTHS};
use crate::util::{format_amount, random_digits, random_upper_letters};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub struct GeneratorConfig {
    pub scans: usize,
    pub swiss_ratio: f64,
    pub epc_ratio: f64,
    pub json_ratio: f64,
    pub account_ratio: f64,
    pub url_ratio: f64,
    pub malformed_ratio: f64,
    pub year: i32,
    pub month: u32,
}

#[derive(Clone, Copy)]
enum Dialect {
    Swiss,
    Epc,
    Json,
    Account,
    Url,
    Freeform,
}

const RECIPIENT_NAMES: &[&str] = &[
    "Max Muster",
    "Erika Mustermann",
    "Alpine Sports AG",
    "Cafe Sonnenblick",
    "Studio Nordlicht",
    "Velo Werkstatt Meier",
    "Buchhandlung Amsel",
    "Green Garden GmbH",
    "Atelier Blau",
    "Pilates Loft Zentrum",
];

const STREET_NAMES: &[&str] = &[
    "Bahnhofstrasse",
    "Marktgasse",
    "Seestrasse",
    "Hauptstrasse",
    "Industrieweg",
    "Lindenhof",
    "Rosenweg",
    "Kirchgasse",
];

const SWISS_CITIES: &[&str] = &[
    "Zürich", "Bern", "Basel", "Luzern", "Winterthur", "Lausanne", "St. Gallen", "Thun",
];

const SWISS_CURRENCIES: &[&str] = &["CHF", "EUR"];

const SWISS_IBAN_COUNTRIES: &[&str] = &["CH", "LI"];

// EPC pools stay clear of uppercase "CH" and "QRR" so a generated BCD
// payload can never trip the Swiss substring sniff instead.
const EPC_IBAN_COUNTRIES: &[&str] = &["DE", "FR", "NL", "BE", "AT", "ES", "IT", "PT"];

const BIC_BANKS: &[&str] = &[
    "BFSW", "DEUT", "NOLA", "INGB", "ABNA", "BNPA", "SOGE", "UNCR", "CAIX", "RABO",
];

const BIC_LOCATIONS: &[&str] = &["33", "2L", "BB", "MM", "XX", "21"];

const BIC_BRANCHES: &[&str] = &["", "XXX", "B01", "M55"];

const EPC_PURPOSES: &[&str] = &["", "GDDS", "SALA", "OTHR"];

const REMITTANCE_NOTES: &[&str] = &[
    "Rechnung 2025-118",
    "Mitgliedsbeitrag 2025",
    "Spende",
    "Danke fuer den Einkauf",
];

const JSON_IBAN_COUNTRIES: &[&str] = &["CH", "DE", "FR", "NL", "ES"];

const SHORT_NOTES: &[&str] = &[
    "Danke fuer das Mittagessen",
    "Treffen um 18 Uhr am Bahnhof",
    "Tisch fuer zwei reserviert",
    "Quittung liegt im Paket bei",
];

const LONG_NOTES: &[&str] = &[
    "Bitte ueberweisen Sie den offenen Betrag bis Ende Monat auf das bekannte Konto, vielen Dank fuer die gute Zusammenarbeit.",
    "Der Mitgliederausweis liegt an der Kasse bereit und kann ab kommender Woche jeweils zu den regulaeren Oeffnungszeiten abgeholt werden.",
];

pub fn generate_scans(config: &GeneratorConfig, seed: u64) -> Result<Vec<ScanRecord>, String> {
    validate_config(config)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (window_start, window_end) = month_bounds(config.year, config.month)?;

    let mut records = Vec::with_capacity(config.scans);
    for _ in 0..config.scans {
        let dialect = pick_dialect(&mut rng, config);
        let malformed = rng.gen_bool(config.malformed_ratio);
        let (raw, kind, valid) = build_scan(&mut rng, dialect, malformed);
        let scanned_at = random_datetime(&mut rng, window_start, window_end)
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        records.push(ScanRecord {
            scan_id: uuid::Uuid::new_v4().to_string(),
            scanned_at,
            raw,
            expected_kind: Some(kind.as_str().to_string()),
            expected_valid: Some(valid),
        });
    }

    Ok(records)
}

fn validate_config(config: &GeneratorConfig) -> Result<(), String> {
    if config.scans == 0 {
        return Err("scans must be greater than 0".to_string());
    }
    let ratios = [
        ("swiss_ratio", config.swiss_ratio),
        ("epc_ratio", config.epc_ratio),
        ("json_ratio", config.json_ratio),
        ("account_ratio", config.account_ratio),
        ("url_ratio", config.url_ratio),
        ("malformed_ratio", config.malformed_ratio),
    ];
    for (name, value) in ratios {
        if !(0.0..=1.0).contains(&value) {
            return Err(format!("{} must be 0..1", name));
        }
    }
    let dialect_sum = config.swiss_ratio
        + config.epc_ratio
        + config.json_ratio
        + config.account_ratio
        + config.url_ratio;
    if dialect_sum > 1.0 {
        return Err("dialect ratios must sum to at most 1".to_string());
    }
    if !(1..=12).contains(&config.month) {
        return Err("month must be 1..12".to_string());
    }
    Ok(())
}

fn pick_dialect<R: Rng + ?Sized>(rng: &mut R, config: &GeneratorConfig) -> Dialect {
    let roll = rng.gen::<f64>();
    let mut bound = config.swiss_ratio;
    if roll < bound {
        return Dialect::Swiss;
    }
    bound += config.epc_ratio;
    if roll < bound {
        return Dialect::Epc;
    }
    bound += config.json_ratio;
    if roll < bound {
        return Dialect::Json;
    }
    bound += config.account_ratio;
    if roll < bound {
        return Dialect::Account;
    }
    bound += config.url_ratio;
    if roll < bound {
        return Dialect::Url;
    }
    Dialect::Freeform
}

fn build_scan<R: Rng + ?Sized>(
    rng: &mut R,
    dialect: Dialect,
    malformed: bool,
) -> (String, QrKind, bool) {
    match dialect {
        Dialect::Swiss => build_swiss(rng, malformed),
        Dialect::Epc => build_epc(rng, malformed),
        Dialect::Json => build_json(rng, malformed),
        Dialect::Account => build_account(rng, malformed),
        Dialect::Url => build_url(rng, malformed),
        Dialect::Freeform => build_freeform(rng, malformed),
    }
}

fn build_swiss<R: Rng + ?Sized>(rng: &mut R, malformed: bool) -> (String, QrKind, bool) {
    if malformed {
        // Scan cut off before the IBAN line.
        return ("SPC\n0200\n1".to_string(), QrKind::Payment, false);
    }

    let country = SWISS_IBAN_COUNTRIES.choose(rng).unwrap_or(&"CH");
    let mut lines = vec![String::new(); 31];
    lines[0] = "SPC".to_string();
    lines[1] = "0200".to_string();
    lines[2] = "1".to_string();
    lines[3] = generate_iban(rng, country);
    lines[4] = "S".to_string();
    lines[5] = pick(rng, RECIPIENT_NAMES);
    lines[6] = pick(rng, STREET_NAMES);
    lines[7] = rng.gen_range(1..200).to_string();
    lines[8] = random_digits(rng, 4);
    lines[9] = pick(rng, SWISS_CITIES);
    lines[10] = country.to_string();
    lines[18] = format_amount(rng.gen_range(5.0..5000.0));
    lines[19] = pick(rng, SWISS_CURRENCIES);
    lines[27] = "QRR".to_string();
    lines[28] = random_digits(rng, 27);
    if rng.gen_bool(0.6) {
        lines[29] = format!("Auftrag {}", random_digits(rng, 4));
    }
    lines[30] = "EPD".to_string();

    (lines.join("\n"), QrKind::Payment, true)
}

fn build_epc<R: Rng + ?Sized>(rng: &mut R, malformed: bool) -> (String, QrKind, bool) {
    let bic = generate_bic(rng);
    let name = pick(rng, RECIPIENT_NAMES);

    if malformed {
        // Account and amount lines missing.
        let raw = ["BCD", "002", "1", "SCT", bic.as_str(), name.as_str()].join("\n");
        return (raw, QrKind::Payment, false);
    }

    let country = EPC_IBAN_COUNTRIES.choose(rng).unwrap_or(&"DE");
    let account = generate_iban(rng, country);
    let amount = format!("EUR{}", format_amount(rng.gen_range(1.0..2500.0)));
    let purpose = pick(rng, EPC_PURPOSES);
    let reference = if rng.gen_bool(0.3) {
        format!("RF{}", random_digits(rng, 16))
    } else {
        String::new()
    };
    let remittance = pick(rng, REMITTANCE_NOTES);

    let raw = [
        "BCD",
        "002",
        "1",
        "SCT",
        bic.as_str(),
        name.as_str(),
        account.as_str(),
        amount.as_str(),
        purpose.as_str(),
        reference.as_str(),
        remittance.as_str(),
    ]
    .join("\n");
    (raw, QrKind::Payment, true)
}

fn build_json<R: Rng + ?Sized>(rng: &mut R, malformed: bool) -> (String, QrKind, bool) {
    let country = JSON_IBAN_COUNTRIES.choose(rng).unwrap_or(&"DE");
    let amount_value = (rng.gen_range(1.0_f64..2500.0) * 100.0).round() / 100.0;
    let mut value = serde_json::json!({
        "recipient": pick(rng, RECIPIENT_NAMES),
        "iban": generate_iban(rng, country),
        "amount": amount_value,
    });
    if rng.gen_bool(0.5) {
        value["amount"] = serde_json::json!(format_amount(amount_value));
    }
    if rng.gen_bool(0.4) {
        value["reference"] = serde_json::json!(format!("INV-{}", random_digits(rng, 4)));
    }

    let raw = value.to_string();
    if malformed {
        // Quotes stripped, the way a broken template renders it.
        return (raw.replace('"', ""), QrKind::Payment, false);
    }
    (raw, QrKind::Payment, true)
}

fn build_account<R: Rng + ?Sized>(rng: &mut R, malformed: bool) -> (String, QrKind, bool) {
    let (country, _) = IBAN_LENGTHS.choose(rng).copied().unwrap_or(("DE", 22));
    let account = generate_iban(rng, country);

    if malformed {
        let truncated: String = account.chars().take(10).collect();
        return (truncated, QrKind::Account, false);
    }
    if rng.gen_bool(0.4) {
        return (iban::format(&account), QrKind::Account, true);
    }
    (account, QrKind::Account, true)
}

fn build_url<R: Rng + ?Sized>(rng: &mut R, malformed: bool) -> (String, QrKind, bool) {
    if malformed {
        return ("http://".to_string(), QrKind::Url, false);
    }

    let recipient = pick(rng, RECIPIENT_NAMES).replace(' ', "%20");
    let country = JSON_IBAN_COUNTRIES.choose(rng).unwrap_or(&"DE");
    let raw = format!(
        "https://pay.example.com/checkout?recipient={}&amount={}&iban={}&reference=INV-{}",
        recipient,
        format_amount(rng.gen_range(1.0..500.0)),
        generate_iban(rng, country),
        random_digits(rng, 4),
    );
    (raw, QrKind::Url, true)
}

fn build_freeform<R: Rng + ?Sized>(rng: &mut R, malformed: bool) -> (String, QrKind, bool) {
    if malformed {
        return ("   ".to_string(), QrKind::Unknown, false);
    }

    let content = if rng.gen_bool(0.3) {
        pick(rng, LONG_NOTES)
    } else {
        pick(rng, SHORT_NOTES)
    };
    let kind = if content.chars().count() > 100 {
        QrKind::Text
    } else {
        QrKind::Unknown
    };
    (content, kind, true)
}

// BBANs in these registries open with a four-letter bank slug.
const LETTER_BBAN_COUNTRIES: &[&str] = &["GB", "IE", "NL"];

fn generate_iban<R: Rng + ?Sized>(rng: &mut R, country: &str) -> String {
    let length = iban_length(country).unwrap_or(22);
    let bban = if LETTER_BBAN_COUNTRIES.contains(&country) {
        let bank = random_upper_letters(rng, 4);
        format!("{}{}", bank, random_digits(rng, length.saturating_sub(8)))
    } else {
        random_digits(rng, length.saturating_sub(4))
    };
    let check = iban::compute_check_digits(country, &bban).unwrap_or_else(|_| "00".to_string());
    format!("{}{}{}", country, check, bban)
}

fn generate_bic<R: Rng + ?Sized>(rng: &mut R) -> String {
    let bank = pick(rng, BIC_BANKS);
    let country = EPC_IBAN_COUNTRIES.choose(rng).unwrap_or(&"DE");
    let location = pick(rng, BIC_LOCATIONS);
    let branch = pick(rng, BIC_BRANCHES);
    format!("{}{}{}{}", bank, country, location, branch)
}

fn pick<R: Rng + ?Sized>(rng: &mut R, pool: &[&str]) -> String {
    pool.choose(rng).copied().unwrap_or_default().to_string()
}

fn month_bounds(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    let start = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| "invalid scan window start".to_string())?;
    let end = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| "invalid scan window end".to_string())?;

    Ok((start, end))
}

fn random_datetime<R: Rng + ?Sized>(
    rng: &mut R,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> DateTime<Utc> {
    let start_ts = start.timestamp();
    let end_ts = end.timestamp();
    let secs = rng.gen_range(start_ts..end_ts);
    let nanos = rng.gen_range(0..1_000_000_000);
    Utc.timestamp_opt(secs, nanos as u32)
        .single()
        .unwrap_or(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;

    fn test_config() -> GeneratorConfig {
        GeneratorConfig {
            scans: 200,
            swiss_ratio: 0.25,
            epc_ratio: 0.20,
            json_ratio: 0.15,
            account_ratio: 0.20,
            url_ratio: 0.10,
            malformed_ratio: 0.10,
            year: 2025,
            month: 6,
        }
    }

    #[test]
    fn config_validation() {
        let mut config = test_config();
        config.scans = 0;
        assert!(generate_scans(&config, 1).is_err());

        let mut config = test_config();
        config.malformed_ratio = 1.2;
        assert!(generate_scans(&config, 1).is_err());

        let mut config = test_config();
        config.swiss_ratio = 0.9;
        config.account_ratio = 0.9;
        assert!(generate_scans(&config, 1).is_err());

        let mut config = test_config();
        config.month = 13;
        assert!(generate_scans(&config, 1).is_err());
    }

    #[test]
    fn same_seed_reproduces_payloads() {
        let config = test_config();
        let a = generate_scans(&config, 11).unwrap();
        let b = generate_scans(&config, 11).unwrap();
        assert_eq!(a.len(), b.len());
        for (left, right) in a.iter().zip(b.iter()) {
            // scan_id is a fresh uuid each run; everything else is seeded.
            assert_eq!(left.raw, right.raw);
            assert_eq!(left.scanned_at, right.scanned_at);
            assert_eq!(left.expected_kind, right.expected_kind);
            assert_eq!(left.expected_valid, right.expected_valid);
        }
    }

    #[test]
    fn generated_corpus_matches_its_ground_truth() {
        let records = generate_scans(&test_config(), 5).unwrap();
        assert_eq!(records.len(), 200);
        for record in &records {
            let decoded = decode::process(&record.raw);
            assert_eq!(
                Some(decoded.kind().as_str().to_string()),
                record.expected_kind,
                "kind mismatch for payload: {:?}",
                record.raw
            );
            assert_eq!(
                Some(decode::validate(&decoded)),
                record.expected_valid,
                "validity mismatch for payload: {:?}",
                record.raw
            );
        }
    }

    #[test]
    fn generated_ibans_pass_validation() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for country in ["CH", "DE", "FR", "NL", "NO", "MT", "GB", "IE"] {
            let account = generate_iban(&mut rng, country);
            let check = iban::validate(&account);
            assert!(check.valid, "{} failed: {:?}", account, check.error);
            assert_eq!(account.len(), iban_length(country).unwrap());
        }
    }

    #[test]
    fn full_malformed_corpus_is_invalid() {
        let mut config = test_config();
        config.malformed_ratio = 1.0;
        let records = generate_scans(&config, 9).unwrap();
        for record in &records {
            assert_eq!(record.expected_valid, Some(false));
            let decoded = decode::process(&record.raw);
            assert!(!decode::validate(&decoded));
        }
    }

    #[test]
    fn scan_window_bounds() {
        let (start, end) = month_bounds(2025, 12).unwrap();
        assert_eq!(start.to_rfc3339_opts(SecondsFormat::Secs, true), "2025-12-01T00:00:00Z");
        assert_eq!(end.to_rfc3339_opts(SecondsFormat::Secs, true), "2026-01-01T00:00:00Z");
    }

    #[test]
    fn scanned_at_stays_inside_the_window() {
        let records = generate_scans(&test_config(), 21).unwrap();
        for record in &records {
            assert!(record.scanned_at.starts_with("2025-06-"), "{}", record.scanned_at);
        }
    }
}
