use std::collections::BTreeMap;

use serde_json::Value;
use url::Url;

use crate::classify;
use crate::iban;
use crate::models::{
    AccountDetails, EpcSepa, QrCodeRecord, QrKind, QrPayload, SwissQrBill, UrlDetails,
};

pub const UNRECOGNIZED_NOTE: &str = "Unrecognized payment format";
pub const INVALID_URL_NOTE: &str = "Invalid URL";

pub fn process(raw: &str) -> QrCodeRecord {
    let kind = classify::classify(raw);
    QrCodeRecord {
        raw: raw.to_string(),
        payload: parse(raw, kind),
    }
}

pub fn parse(raw: &str, kind: QrKind) -> QrPayload {
    match kind {
        QrKind::Payment => parse_payment(raw),
        QrKind::Account => QrPayload::Account(parse_account(raw)),
        QrKind::Url => QrPayload::Url(parse_url(raw)),
        QrKind::Text => QrPayload::Text {
            content: raw.to_string(),
        },
        QrKind::Unknown => QrPayload::Unknown {
            content: raw.to_string(),
        },
    }
}

fn parse_payment(raw: &str) -> QrPayload {
    if classify::is_swiss_qr_bill(raw) {
        return QrPayload::SwissQrBill(parse_swiss_qr_bill(raw));
    }
    if classify::is_epc(raw) {
        return QrPayload::EpcSepa(parse_epc(raw));
    }
    // Only an object can carry payment fields; a bare string or array
    // that happened to look like JSON is treated as unrecognized.
    match serde_json::from_str::<Value>(raw) {
        Ok(value) if value.is_object() => QrPayload::JsonPayment(value),
        _ => QrPayload::Unrecognized {
            content: raw.to_string(),
            note: UNRECOGNIZED_NOTE.to_string(),
        },
    }
}

// Line numbers follow the Swiss Implementation Guidelines v2 layout.
// A truncated scan yields empty fields, never an index error.
pub fn parse_swiss_qr_bill(raw: &str) -> SwissQrBill {
    let lines = split_lines(raw);
    SwissQrBill {
        version: line(&lines, 1),
        coding_type: line(&lines, 2),
        iban: line(&lines, 3),
        creditor_name: line(&lines, 5),
        creditor_street: line(&lines, 6),
        creditor_house_number: line(&lines, 7),
        creditor_postal_code: line(&lines, 8),
        creditor_city: line(&lines, 9),
        creditor_country: line(&lines, 10),
        amount: line(&lines, 18),
        currency: line(&lines, 19),
        reference: line(&lines, 28),
        additional_info: line(&lines, 29),
    }
}

// EPC069-12 quick response code, lines 0 through 10.
pub fn parse_epc(raw: &str) -> EpcSepa {
    let lines = split_lines(raw);
    EpcSepa {
        service_tag: line(&lines, 0),
        version: line(&lines, 1),
        encoding: line(&lines, 2),
        identification: line(&lines, 3),
        bic: line(&lines, 4),
        beneficiary_name: line(&lines, 5),
        beneficiary_account: line(&lines, 6),
        amount: line(&lines, 7),
        purpose: line(&lines, 8),
        reference: line(&lines, 9),
        remittance: line(&lines, 10),
    }
}

pub fn parse_account(raw: &str) -> AccountDetails {
    let iban = iban::normalize(raw);
    AccountDetails {
        country: slice(&iban, 0, 2),
        check_digits: slice(&iban, 2, 4),
        bank_code: slice(&iban, 4, 9),
        account_number: iban.chars().skip(9).collect(),
        iban,
    }
}

pub fn parse_url(raw: &str) -> UrlDetails {
    match Url::parse(raw) {
        Ok(url) => {
            let mut search_params = BTreeMap::new();
            for (key, value) in url.query_pairs() {
                // First occurrence wins for repeated keys.
                search_params.entry(key.into_owned()).or_insert(value.into_owned());
            }
            UrlDetails {
                url: url.as_str().to_string(),
                protocol: url.scheme().to_string(),
                hostname: url.host_str().unwrap_or_default().to_string(),
                pathname: url.path().to_string(),
                search_params,
                error: None,
            }
        }
        Err(_) => UrlDetails {
            url: raw.to_string(),
            error: Some(INVALID_URL_NOTE.to_string()),
            ..UrlDetails::default()
        },
    }
}

pub fn validate(record: &QrCodeRecord) -> bool {
    if record.raw.trim().is_empty() {
        return false;
    }
    match &record.payload {
        QrPayload::SwissQrBill(bill) => {
            !bill.iban.is_empty() || is_positive_amount(&bill.amount)
        }
        QrPayload::EpcSepa(epc) => {
            !epc.beneficiary_account.is_empty() || is_positive_amount(&epc.amount)
        }
        QrPayload::JsonPayment(value) => json_has_account(value) || json_positive_amount(value),
        QrPayload::Unrecognized { .. } => false,
        QrPayload::Account(details) => {
            let len = details.iban.chars().count();
            (iban::MIN_LENGTH..=iban::MAX_LENGTH).contains(&len)
        }
        QrPayload::Url(details) => {
            details.error.is_none() && !details.url.is_empty() && !details.hostname.is_empty()
        }
        QrPayload::Text { .. } | QrPayload::Unknown { .. } => true,
    }
}

pub(crate) fn is_positive_amount(text: &str) -> bool {
    match text.trim().parse::<f64>() {
        Ok(value) => value.is_finite() && value > 0.0,
        Err(_) => false,
    }
}

fn json_has_account(value: &Value) -> bool {
    ["iban", "beneficiaryAccount"].iter().any(|key| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(|text| !text.trim().is_empty())
            .unwrap_or(false)
    })
}

fn json_positive_amount(value: &Value) -> bool {
    match value.get("amount") {
        Some(Value::Number(number)) => number
            .as_f64()
            .map(|amount| amount.is_finite() && amount > 0.0)
            .unwrap_or(false),
        Some(Value::String(text)) => is_positive_amount(text),
        _ => false,
    }
}

fn split_lines(raw: &str) -> Vec<&str> {
    raw.split('\n').map(|l| l.trim_end_matches('\r')).collect()
}

fn line(lines: &[&str], index: usize) -> String {
    lines.get(index).map(|l| l.to_string()).unwrap_or_default()
}

fn slice(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end.saturating_sub(start)).collect()
}
