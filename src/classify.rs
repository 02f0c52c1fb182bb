use crate::models::QrKind;
use serde_json::Value;

const TEXT_THRESHOLD: usize = 100;

// Ordered heuristics, first match wins. Cheap prefix/substring tests over
// untrusted scanner output; a matched dialect is only confirmed by the
// structural parse in decode, which fails soft.
const RULES: &[(fn(&str) -> bool, QrKind)] = &[
    (is_url, QrKind::Url),
    (is_swiss_qr_bill, QrKind::Payment),
    (is_epc, QrKind::Payment),
    (is_account_shaped, QrKind::Account),
    (is_json_payment, QrKind::Payment),
];

pub fn classify(raw: &str) -> QrKind {
    for (predicate, kind) in RULES {
        if predicate(raw) {
            return *kind;
        }
    }
    if raw.chars().count() > TEXT_THRESHOLD {
        QrKind::Text
    } else {
        QrKind::Unknown
    }
}

fn is_url(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}

pub(crate) fn is_swiss_qr_bill(raw: &str) -> bool {
    raw.starts_with("SPC\n") || (raw.contains("CH") && raw.contains("QRR"))
}

pub(crate) fn is_epc(raw: &str) -> bool {
    raw.starts_with("BCD\n")
}

fn is_account_shaped(raw: &str) -> bool {
    let stripped = strip_whitespace(raw);
    let bytes = stripped.as_bytes();
    bytes.len() >= 5
        && has_iban_prefix(&stripped)
        && bytes[4..]
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

// Parseability gates only the loose "recipient" substring arm; the
// "{...amount" prefix form is confirmed later, during parsing.
fn is_json_payment(raw: &str) -> bool {
    (raw.starts_with('{') && raw.contains("amount"))
        || (raw.contains("recipient") && serde_json::from_str::<Value>(raw).is_ok())
}

pub(crate) fn strip_whitespace(raw: &str) -> String {
    raw.chars().filter(|ch| !ch.is_whitespace()).collect()
}

// Two uppercase letters then two digits: the coarse IBAN shape shared by
// the Account rule and the freeform intent fallback. No case folding, so
// a lowercase IBAN scan stays Unknown.
pub(crate) fn has_iban_prefix(stripped: &str) -> bool {
    let bytes = stripped.as_bytes();
    bytes.len() >= 4
        && bytes[0].is_ascii_uppercase()
        && bytes[1].is_ascii_uppercase()
        && bytes[2].is_ascii_digit()
        && bytes[3].is_ascii_digit()
}
