use crate::decode;
use crate::intent;
use crate::models::{QrKind, ScanRecord};

use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub total_scans: usize,
    pub valid_scans: usize,
    pub invalid_scans: usize,
    pub payment_scans: usize,
    pub account_scans: usize,
    pub url_scans: usize,
    pub text_scans: usize,
    pub unknown_scans: usize,
    pub kind_mismatches: usize,
    pub validity_mismatches: usize,
    pub read_errors: usize,
}

#[derive(Serialize)]
struct DecodedRow {
    scan_id: String,
    kind: &'static str,
    valid: bool,
    iban: String,
    recipient: String,
    amount: String,
    note: String,
}

pub fn run_batch(input: &Path, decoded_output: Option<&Path>) -> Result<BatchReport, String> {
    let mut reader = csv::Reader::from_path(input).map_err(|err| err.to_string())?;
    let mut writer = match decoded_output {
        Some(path) => Some(csv::Writer::from_path(path).map_err(|err| err.to_string())?),
        None => None,
    };

    let mut report = BatchReport::default();
    for result in reader.deserialize() {
        // Corpora come from the field; a broken row is logged, not fatal.
        let record: ScanRecord = match result {
            Ok(record) => record,
            Err(err) => {
                report.read_errors += 1;
                log::warn!("skipping unreadable scan row: {}", err);
                continue;
            }
        };

        let decoded = decode::process(&record.raw);
        let kind = decoded.kind();
        let valid = decode::validate(&decoded);

        report.total_scans += 1;
        if valid {
            report.valid_scans += 1;
        } else {
            report.invalid_scans += 1;
        }
        match kind {
            QrKind::Payment => report.payment_scans += 1,
            QrKind::Account => report.account_scans += 1,
            QrKind::Url => report.url_scans += 1,
            QrKind::Text => report.text_scans += 1,
            QrKind::Unknown => report.unknown_scans += 1,
        }

        if let Some(expected) = record.expected_kind.as_deref() {
            if !expected.is_empty() && expected != kind.as_str() {
                report.kind_mismatches += 1;
                log::warn!(
                    "scan {} classified as {}, corpus expected {}",
                    record.scan_id,
                    kind.as_str(),
                    expected
                );
            }
        }
        if let Some(expected) = record.expected_valid {
            if expected != valid {
                report.validity_mismatches += 1;
                log::warn!(
                    "scan {} validity {}, corpus expected {}",
                    record.scan_id,
                    valid,
                    expected
                );
            }
        }

        if let Some(writer) = writer.as_mut() {
            let intent = intent::to_payment_intent(&decoded);
            writer
                .serialize(DecodedRow {
                    scan_id: record.scan_id,
                    kind: kind.as_str(),
                    valid,
                    iban: intent.iban.unwrap_or_default(),
                    recipient: intent.recipient.unwrap_or_default(),
                    amount: intent.amount.unwrap_or_default(),
                    note: intent.note.unwrap_or_default(),
                })
                .map_err(|err| err.to_string())?;
        }
    }

    if let Some(writer) = writer.as_mut() {
        writer.flush().map_err(|err| err.to_string())?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{generate_scans, GeneratorConfig};
    use std::path::PathBuf;

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("payscan-{}-{}.csv", label, uuid::Uuid::new_v4()))
    }

    fn write_corpus(path: &Path, records: &[ScanRecord]) {
        let mut writer = csv::Writer::from_path(path).unwrap();
        for record in records {
            writer.serialize(record).unwrap();
        }
        writer.flush().unwrap();
    }

    fn corpus_config(scans: usize) -> GeneratorConfig {
        GeneratorConfig {
            scans,
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
    fn generated_corpus_runs_clean() {
        let records = generate_scans(&corpus_config(120), 17).unwrap();
        let input = temp_path("corpus");
        write_corpus(&input, &records);

        let report = run_batch(&input, None).unwrap();
        std::fs::remove_file(&input).ok();

        assert_eq!(report.total_scans, 120);
        assert_eq!(report.read_errors, 0);
        assert_eq!(report.kind_mismatches, 0);
        assert_eq!(report.validity_mismatches, 0);
        assert_eq!(report.valid_scans + report.invalid_scans, 120);
        assert_eq!(
            report.payment_scans
                + report.account_scans
                + report.url_scans
                + report.text_scans
                + report.unknown_scans,
            120
        );
    }

    #[test]
    fn decoded_output_carries_intent_fields() {
        let records = generate_scans(&corpus_config(40), 23).unwrap();
        let input = temp_path("decoded-in");
        let output = temp_path("decoded-out");
        write_corpus(&input, &records);

        let report = run_batch(&input, Some(&output)).unwrap();
        assert_eq!(report.total_scans, 40);

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["scan_id", "kind", "valid", "iban", "recipient", "amount", "note"]
        );
        let rows: Vec<csv::StringRecord> =
            reader.records().map(|row| row.unwrap()).collect();
        assert_eq!(rows.len(), 40);
        // Every valid payment or account row resolves to an IBAN.
        let with_iban = rows
            .iter()
            .filter(|row| !row.get(3).unwrap_or_default().is_empty())
            .count();
        assert!(with_iban > 0);

        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&output).ok();
    }

    #[test]
    fn rows_without_expectations_are_not_mismatches() {
        let input = temp_path("bare");
        let mut writer = csv::Writer::from_path(&input).unwrap();
        writer
            .write_record(["scan_id", "scanned_at", "raw", "expected_kind", "expected_valid"])
            .unwrap();
        writer
            .write_record(["s-1", "2025-06-01T10:00:00.000Z", "GB82WEST12345698765432", "", ""])
            .unwrap();
        writer
            .write_record(["s-2", "2025-06-01T10:05:00.000Z", "hello", "", ""])
            .unwrap();
        writer.flush().unwrap();
        drop(writer);

        let report = run_batch(&input, None).unwrap();
        std::fs::remove_file(&input).ok();

        assert_eq!(report.total_scans, 2);
        assert_eq!(report.account_scans, 1);
        assert_eq!(report.unknown_scans, 1);
        assert_eq!(report.kind_mismatches, 0);
        assert_eq!(report.validity_mismatches, 0);
    }

    #[test]
    fn unreadable_rows_are_counted_and_skipped() {
        let input = temp_path("broken");
        std::fs::write(
            &input,
            "scan_id,scanned_at,raw,expected_kind,expected_valid\n\
             s-1,2025-06-01T10:00:00.000Z,hello,unknown,true\n\
             s-2,2025-06-01T10:05:00.000Z,DE89370400440532013000,account,not-a-bool\n",
        )
        .unwrap();

        let report = run_batch(&input, None).unwrap();
        std::fs::remove_file(&input).ok();

        assert_eq!(report.total_scans, 1);
        assert_eq!(report.read_errors, 1);
        assert_eq!(report.unknown_scans, 1);
    }

    #[test]
    fn missing_input_is_an_error() {
        let path = temp_path("missing");
        assert!(run_batch(&path, None).is_err());
    }

    #[test]
    fn expectation_mismatches_are_counted() {
        let input = temp_path("mismatch");
        let mut writer = csv::Writer::from_path(&input).unwrap();
        writer
            .write_record(["scan_id", "scanned_at", "raw", "expected_kind", "expected_valid"])
            .unwrap();
        writer
            .write_record(["s-1", "2025-06-01T10:00:00.000Z", "hello", "url", "false"])
            .unwrap();
        writer.flush().unwrap();
        drop(writer);

        let report = run_batch(&input, None).unwrap();
        std::fs::remove_file(&input).ok();

        assert_eq!(report.total_scans, 1);
        assert_eq!(report.kind_mismatches, 1);
        assert_eq!(report.validity_mismatches, 1);
    }
}
