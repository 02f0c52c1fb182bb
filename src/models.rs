use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QrKind {
    Payment,
    Account,
    Url,
    Text,
    Unknown,
}

impl QrKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QrKind::Payment => "payment",
            QrKind::Account => "account",
            QrKind::Url => "url",
            QrKind::Text => "text",
            QrKind::Unknown => "unknown",
        }
    }
}

// One payload shape per detected dialect. Parsers default missing fields
// to empty strings; the intent mapping lifts non-empty values to options.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "dialect", rename_all = "camelCase")]
pub enum QrPayload {
    SwissQrBill(SwissQrBill),
    EpcSepa(EpcSepa),
    JsonPayment(Value),
    Unrecognized { content: String, note: String },
    Account(AccountDetails),
    Url(UrlDetails),
    Text { content: String },
    Unknown { content: String },
}

impl QrPayload {
    pub fn kind(&self) -> QrKind {
        match self {
            QrPayload::SwissQrBill(_)
            | QrPayload::EpcSepa(_)
            | QrPayload::JsonPayment(_)
            | QrPayload::Unrecognized { .. } => QrKind::Payment,
            QrPayload::Account(_) => QrKind::Account,
            QrPayload::Url(_) => QrKind::Url,
            QrPayload::Text { .. } => QrKind::Text,
            QrPayload::Unknown { .. } => QrKind::Unknown,
        }
    }

    // Same labels the serde tag uses.
    pub fn dialect(&self) -> &'static str {
        match self {
            QrPayload::SwissQrBill(_) => "swissQrBill",
            QrPayload::EpcSepa(_) => "epcSepa",
            QrPayload::JsonPayment(_) => "jsonPayment",
            QrPayload::Unrecognized { .. } => "unrecognized",
            QrPayload::Account(_) => "account",
            QrPayload::Url(_) => "url",
            QrPayload::Text { .. } => "text",
            QrPayload::Unknown { .. } => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QrCodeRecord {
    pub raw: String,
    pub payload: QrPayload,
}

impl QrCodeRecord {
    pub fn kind(&self) -> QrKind {
        self.payload.kind()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwissQrBill {
    pub version: String,
    pub coding_type: String,
    pub iban: String,
    pub creditor_name: String,
    pub creditor_street: String,
    pub creditor_house_number: String,
    pub creditor_postal_code: String,
    pub creditor_city: String,
    pub creditor_country: String,
    pub amount: String,
    pub currency: String,
    pub reference: String,
    pub additional_info: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpcSepa {
    pub service_tag: String,
    pub version: String,
    pub encoding: String,
    pub identification: String,
    pub bic: String,
    pub beneficiary_name: String,
    pub beneficiary_account: String,
    pub amount: String,
    pub purpose: String,
    pub reference: String,
    pub remittance: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetails {
    pub iban: String,
    pub country: String,
    pub check_digits: String,
    pub bank_code: String,
    pub account_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlDetails {
    pub url: String,
    pub protocol: String,
    pub hostname: String,
    pub pathname: String,
    pub search_params: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl PaymentIntent {
    pub fn is_empty(&self) -> bool {
        self.recipient.is_none()
            && self.amount.is_none()
            && self.note.is_none()
            && self.iban.is_none()
            && self.street.is_none()
            && self.house_number.is_none()
            && self.city.is_none()
            && self.postal_code.is_none()
            && self.country.is_none()
    }
}

// CSV row for generated scan corpora. The expected_* columns carry the
// generator's ground truth so a batch run can be checked against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub scan_id: String,
    pub scanned_at: String,
    pub raw: String,
    pub expected_kind: Option<String>,
    pub expected_valid: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_kind_mapping() {
        let payment_shapes = [
            QrPayload::SwissQrBill(SwissQrBill::default()),
            QrPayload::EpcSepa(EpcSepa::default()),
            QrPayload::JsonPayment(serde_json::json!({"amount": 1})),
            QrPayload::Unrecognized {
                content: "x".to_string(),
                note: "y".to_string(),
            },
        ];
        for payload in payment_shapes {
            assert_eq!(payload.kind(), QrKind::Payment);
        }
        assert_eq!(
            QrPayload::Account(AccountDetails::default()).kind(),
            QrKind::Account
        );
        assert_eq!(QrPayload::Url(UrlDetails::default()).kind(), QrKind::Url);
        assert_eq!(
            QrPayload::Text {
                content: String::new()
            }
            .kind(),
            QrKind::Text
        );
        assert_eq!(
            QrPayload::Unknown {
                content: String::new()
            }
            .kind(),
            QrKind::Unknown
        );
    }

    #[test]
    fn record_kind_follows_payload() {
        let record = QrCodeRecord {
            raw: "CH9300762011623852957".to_string(),
            payload: QrPayload::Account(AccountDetails::default()),
        };
        assert_eq!(record.kind(), QrKind::Account);
    }

    #[test]
    fn payload_serialization_carries_dialect_tag() {
        let value = serde_json::to_value(QrPayload::Text {
            content: "hello".to_string(),
        })
        .expect("serialize");
        assert_eq!(value["dialect"], "text");
        assert_eq!(value["content"], "hello");

        let swiss = serde_json::to_value(QrPayload::SwissQrBill(SwissQrBill {
            iban: "CH5800791123000889012".to_string(),
            ..SwissQrBill::default()
        }))
        .expect("serialize");
        assert_eq!(swiss["dialect"], "swissQrBill");
        assert_eq!(swiss["iban"], "CH5800791123000889012");
    }

    #[test]
    fn empty_intent_detection() {
        assert!(PaymentIntent::default().is_empty());
        let intent = PaymentIntent {
            iban: Some("CH9300762011623852957".to_string()),
            ..PaymentIntent::default()
        };
        assert!(!intent.is_empty());
    }
}
