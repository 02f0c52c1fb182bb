use serde_json::Value;

use crate::classify;
use crate::models::{
    EpcSepa, PaymentIntent, QrCodeRecord, QrPayload, SwissQrBill, UrlDetails,
};

// Single bridge between decoded payloads and the payment form. Any new
// dialect has to extend both the parser and this mapping.
pub fn to_payment_intent(record: &QrCodeRecord) -> PaymentIntent {
    match &record.payload {
        QrPayload::SwissQrBill(bill) => swiss_intent(bill),
        QrPayload::EpcSepa(epc) => epc_intent(epc),
        QrPayload::JsonPayment(value) => json_intent(value),
        QrPayload::Unrecognized { .. } => PaymentIntent::default(),
        QrPayload::Account(details) => PaymentIntent {
            iban: non_empty(&details.iban),
            ..PaymentIntent::default()
        },
        QrPayload::Url(details) => url_intent(details),
        QrPayload::Text { content } | QrPayload::Unknown { content } => freeform_intent(content),
    }
}

fn swiss_intent(bill: &SwissQrBill) -> PaymentIntent {
    PaymentIntent {
        recipient: non_empty(&bill.creditor_name),
        amount: non_empty(&bill.amount),
        note: non_empty(&bill.additional_info).or_else(|| non_empty(&bill.reference)),
        iban: non_empty(&bill.iban),
        street: non_empty(&bill.creditor_street),
        house_number: non_empty(&bill.creditor_house_number),
        city: non_empty(&bill.creditor_city),
        postal_code: non_empty(&bill.creditor_postal_code),
        country: non_empty(&bill.creditor_country),
    }
}

fn epc_intent(epc: &EpcSepa) -> PaymentIntent {
    PaymentIntent {
        recipient: non_empty(&epc.beneficiary_name),
        amount: non_empty(&epc.amount),
        note: non_empty(&epc.remittance).or_else(|| non_empty(&epc.reference)),
        iban: non_empty(&epc.beneficiary_account),
        ..PaymentIntent::default()
    }
}

fn json_intent(value: &Value) -> PaymentIntent {
    PaymentIntent {
        recipient: json_string(value, "recipient"),
        amount: json_amount(value),
        note: json_string(value, "reference").or_else(|| json_string(value, "message")),
        iban: json_string(value, "iban").or_else(|| json_string(value, "beneficiaryAccount")),
        ..PaymentIntent::default()
    }
}

fn url_intent(details: &UrlDetails) -> PaymentIntent {
    if details.search_params.is_empty() {
        return PaymentIntent::default();
    }
    let param = |key: &str| details.search_params.get(key).and_then(|v| non_empty(v));
    PaymentIntent {
        recipient: param("recipient"),
        amount: param("amount"),
        note: param("note").or_else(|| param("reference")),
        iban: param("iban").or_else(|| param("account")),
        ..PaymentIntent::default()
    }
}

fn freeform_intent(content: &str) -> PaymentIntent {
    let stripped = classify::strip_whitespace(content);
    if classify::has_iban_prefix(&stripped) {
        PaymentIntent {
            iban: Some(stripped),
            ..PaymentIntent::default()
        }
    } else {
        PaymentIntent::default()
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn json_string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).and_then(non_empty)
}

// JSON generators disagree on whether amount is a number or a string;
// the form wants a string either way.
fn json_amount(value: &Value) -> Option<String> {
    match value.get("amount") {
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::String(text)) => non_empty(text),
        _ => None,
    }
}
