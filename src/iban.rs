use crate::reference::{country_name, iban_length};
use serde::Serialize;
use std::fmt;

pub const MIN_LENGTH: usize = 15;
pub const MAX_LENGTH: usize = 34;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IbanError {
    #[serde(rename = "ibanTooShort")]
    TooShort,
    #[serde(rename = "ibanTooLong")]
    TooLong,
    #[serde(rename = "ibanInvalidCharacters")]
    InvalidCharacters,
    #[serde(rename = "ibanInvalidCountry")]
    InvalidCountry,
    #[serde(rename = "ibanInvalidLength")]
    InvalidLength,
    #[serde(rename = "ibanInvalid")]
    InvalidCheckDigits,
    #[serde(rename = "ibanInvalidChecksum")]
    InvalidChecksum,
}

impl IbanError {
    // Stable identifiers looked up in translation tables; never rename.
    pub fn code(&self) -> &'static str {
        match self {
            IbanError::TooShort => "ibanTooShort",
            IbanError::TooLong => "ibanTooLong",
            IbanError::InvalidCharacters => "ibanInvalidCharacters",
            IbanError::InvalidCountry => "ibanInvalidCountry",
            IbanError::InvalidLength => "ibanInvalidLength",
            IbanError::InvalidCheckDigits => "ibanInvalid",
            IbanError::InvalidChecksum => "ibanInvalidChecksum",
        }
    }
}

impl fmt::Display for IbanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IbanCheck {
    pub valid: bool,
    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    pub error: Option<IbanError>,
}

impl IbanCheck {
    fn ok() -> Self {
        IbanCheck {
            valid: true,
            error: None,
        }
    }

    fn fail(error: IbanError) -> Self {
        IbanCheck {
            valid: false,
            error: Some(error),
        }
    }
}

pub fn normalize(input: &str) -> String {
    input
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn validate(input: &str) -> IbanCheck {
    let iban = normalize(input);
    let length = iban.chars().count();
    if length < MIN_LENGTH {
        return IbanCheck::fail(IbanError::TooShort);
    }
    if length > MAX_LENGTH {
        return IbanCheck::fail(IbanError::TooLong);
    }
    if !iban
        .chars()
        .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit())
    {
        return IbanCheck::fail(IbanError::InvalidCharacters);
    }

    // ASCII-only from here on, so byte slicing is safe.
    let country = &iban[..2];
    if !country.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return IbanCheck::fail(IbanError::InvalidCountry);
    }
    let expected = match iban_length(country) {
        Some(len) => len,
        None => return IbanCheck::fail(IbanError::InvalidCountry),
    };
    if length != expected {
        return IbanCheck::fail(IbanError::InvalidLength);
    }
    if !iban[2..4].chars().all(|ch| ch.is_ascii_digit()) {
        return IbanCheck::fail(IbanError::InvalidCheckDigits);
    }

    let (head, tail) = iban.split_at(4);
    match mod97(tail.chars().chain(head.chars())) {
        Ok(1) => IbanCheck::ok(),
        _ => IbanCheck::fail(IbanError::InvalidChecksum),
    }
}

pub fn format(input: &str) -> String {
    let iban = normalize(input);
    let mut out = String::with_capacity(iban.len() + iban.len() / 4);
    for (idx, ch) in iban.chars().enumerate() {
        if idx > 0 && idx % 4 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

pub fn country_of(input: &str) -> Option<&'static str> {
    let iban = normalize(input);
    iban.get(..2).and_then(country_name)
}

pub fn compute_check_digits(country: &str, bban: &str) -> Result<String, String> {
    if country.len() != 2 || !country.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err("IBAN country code must be 2 letters".to_string());
    }
    let remainder = mod97(bban.chars().chain(country.chars()).chain("00".chars()))?;
    Ok(format!("{:02}", 98 - remainder))
}

// ISO 7064 mod-97: letters expand to two digits (A=10 .. Z=35) and the
// remainder is accumulated digit by digit, so the transcoded number never
// needs big-integer arithmetic.
fn mod97<I: Iterator<Item = char>>(chars: I) -> Result<u32, String> {
    let mut remainder: u32 = 0;
    for ch in chars {
        if let Some(digit) = ch.to_digit(10) {
            remainder = (remainder * 10 + digit) % 97;
        } else if ch.is_ascii_alphabetic() {
            let value = ch.to_ascii_uppercase() as u32 - 'A' as u32 + 10;
            remainder = (remainder * 10 + value / 10) % 97;
            remainder = (remainder * 10 + value % 10) % 97;
        } else {
            return Err(format!("invalid character in IBAN input: {ch}"));
        }
    }
    Ok(remainder)
}
