// 🧾 CNAB Line Parser
// Fixed-width line → validated TransactionRecord
//
// Layout (offsets in characters):
//
//   type  date      value       cpf          card          time    owner           store
//   0     1..9      9..19       19..30       30..42        42..48  48..62          62..
//   1     20190301  0000010000  12345678901  1234****5678  153000  BAR DO JOAO     LOJA DO O - MATRIZ

use crate::entities::{TransactionRecord, TransactionType};
use crate::error::ValidationError;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

// ============================================================================
// LAYOUT
// ============================================================================

/// One fixed-width column of a CNAB line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
}

impl Field {
    pub const fn new(name: &'static str, offset: usize, width: usize) -> Self {
        Field { name, offset, width }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.width
    }
}

pub const TYPE: Field = Field::new("type", 0, 1);
pub const DATE: Field = Field::new("date", 1, 8);
pub const VALUE: Field = Field::new("value", 9, 10);
pub const CPF: Field = Field::new("cpf", 19, 11);
pub const CARD: Field = Field::new("card", 30, 12);
pub const TIME: Field = Field::new("time", 42, 6);
pub const STORE_OWNER: Field = Field::new("storeOwner", 48, 14);

/// Store name starts here and runs to the end of the line
pub const STORE_NAME_OFFSET: usize = STORE_OWNER.end();

/// Characters a line needs before the store name begins
pub const FIXED_WIDTH: usize = STORE_NAME_OFFSET;

// ============================================================================
// PARSER TRAIT
// ============================================================================

/// LineParser - turns one line of text into a TransactionRecord
///
/// Implementations must be pure: the same line always yields the same
/// record or the same error. The importer is generic over this trait so
/// tests can drive it with scripted parsers.
pub trait LineParser: Send + Sync {
    fn parse_line(&self, line: &str) -> Result<TransactionRecord, ValidationError>;

    /// Parser version (for logs)
    fn version(&self) -> &str {
        "1.0.0"
    }
}

/// Parser for the standard CNAB layout above
#[derive(Debug, Clone, Copy, Default)]
pub struct CnabLineParser;

impl CnabLineParser {
    pub fn new() -> Self {
        CnabLineParser
    }
}

impl LineParser for CnabLineParser {
    fn parse_line(&self, line: &str) -> Result<TransactionRecord, ValidationError> {
        if line.trim().is_empty() {
            return Err(ValidationError::BlankLine);
        }

        let columns = Columns::split(line)?;

        let transaction_type = parse_type(columns.tx_type)?;
        let date = parse_date(columns.date)?;
        let time = parse_time(columns.time)?;
        // Naive timestamp: the source locale offset is not applied
        let occurred_at = date.and_time(time);
        let value = parse_value(columns.value, transaction_type)?;
        let cpf = parse_cpf(columns.cpf)?;
        let card = parse_card(columns.card)?;

        let store_owner = columns.store_owner.trim();
        if store_owner.is_empty() {
            return Err(ValidationError::EmptyStoreOwner);
        }

        let store_name = columns.store_name.trim();
        if store_name.is_empty() {
            return Err(ValidationError::EmptyStoreName);
        }

        Ok(TransactionRecord {
            transaction_type,
            occurred_at,
            value,
            cpf,
            card,
            store_owner: store_owner.to_string(),
            store_name: store_name.to_string(),
        })
    }
}

// ============================================================================
// COLUMN SPLITTING
// ============================================================================

/// Raw, unvalidated slices of one line
struct Columns<'a> {
    tx_type: &'a str,
    date: &'a str,
    value: &'a str,
    cpf: &'a str,
    card: &'a str,
    time: &'a str,
    store_owner: &'a str,
    store_name: &'a str,
}

impl<'a> Columns<'a> {
    fn split(line: &'a str) -> Result<Self, ValidationError> {
        // Byte index of every char boundary, so offsets count characters
        let boundaries: Vec<usize> = line
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(line.len()))
            .collect();

        let char_count = boundaries.len() - 1;
        if char_count < FIXED_WIDTH {
            return Err(ValidationError::LineTooShort {
                expected: FIXED_WIDTH,
                actual: char_count,
            });
        }

        Ok(Columns {
            tx_type: column(line, &boundaries, TYPE),
            date: column(line, &boundaries, DATE),
            value: column(line, &boundaries, VALUE),
            cpf: column(line, &boundaries, CPF),
            card: column(line, &boundaries, CARD),
            time: column(line, &boundaries, TIME),
            store_owner: column(line, &boundaries, STORE_OWNER),
            store_name: &line[boundaries[STORE_NAME_OFFSET]..],
        })
    }
}

fn column<'a>(line: &'a str, boundaries: &[usize], field: Field) -> &'a str {
    &line[boundaries[field.offset]..boundaries[field.end()]]
}

// ============================================================================
// FIELD RULES
// ============================================================================

// Columns::split hands every field over at exactly its column width, so the
// rules below only check content.

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a slice already known to be ASCII digits
fn digits_to_u64(s: &str) -> u64 {
    s.bytes().fold(0, |acc, b| acc * 10 + u64::from(b - b'0'))
}

fn digits_to_u32(s: &str) -> u32 {
    digits_to_u64(s) as u32
}

fn parse_type(raw: &str) -> Result<TransactionType, ValidationError> {
    if !all_digits(raw) {
        return Err(ValidationError::InvalidTypeFormat(raw.to_string()));
    }

    TransactionType::from_code(digits_to_u32(raw) as u8)
        .ok_or_else(|| ValidationError::InvalidTypeValue(raw.to_string()))
}

fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    if !all_digits(raw) {
        return Err(ValidationError::InvalidDateFormat(raw.to_string()));
    }

    let year = digits_to_u32(&raw[0..4]) as i32;
    let month = digits_to_u32(&raw[4..6]);
    let day = digits_to_u32(&raw[6..8]);

    if year == 0 {
        return Err(ValidationError::InvalidDateValue(raw.to_string()));
    }

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ValidationError::InvalidDateValue(raw.to_string()))
}

fn parse_time(raw: &str) -> Result<NaiveTime, ValidationError> {
    if !all_digits(raw) {
        return Err(ValidationError::InvalidTimeFormat(raw.to_string()));
    }

    let hour = digits_to_u32(&raw[0..2]);
    let minute = digits_to_u32(&raw[2..4]);
    let second = digits_to_u32(&raw[4..6]);

    NaiveTime::from_hms_opt(hour, minute, second)
        .ok_or_else(|| ValidationError::InvalidTimeValue(raw.to_string()))
}

/// Amount × 100 as 10 digits, signed by the type's nature
fn parse_value(raw: &str, transaction_type: TransactionType) -> Result<Decimal, ValidationError> {
    if !all_digits(raw) {
        return Err(ValidationError::InvalidValueFormat(raw.to_string()));
    }

    // At most 10 digits, well inside i64
    let cents = digits_to_u64(raw) as i64;

    Ok(Decimal::new(cents * i64::from(transaction_type.sign()), 2))
}

fn parse_cpf(raw: &str) -> Result<String, ValidationError> {
    if !all_digits(raw) {
        return Err(ValidationError::InvalidCpf(raw.to_string()));
    }

    Ok(raw.to_string())
}

fn parse_card(raw: &str) -> Result<String, ValidationError> {
    let card = raw.trim();
    if card.is_empty() {
        return Err(ValidationError::EmptyCard);
    }

    Ok(card.to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    /// Build a line from field values, padding each to its width
    fn build_line(
        tx_type: &str,
        date: &str,
        value: &str,
        cpf: &str,
        card: &str,
        time: &str,
        owner: &str,
        store: &str,
    ) -> String {
        format!(
            "{:<1.1}{:0>8.8}{:0>10.10}{:0>11.11}{:<12.12}{:0>6.6}{:<14.14}{:<19}",
            tx_type, date, value, cpf, card, time, owner, store
        )
    }

    fn valid_line_with(tx_type: &str) -> String {
        build_line(
            tx_type,
            "20190301",
            "0000010000",
            "12345678901",
            "1234****5678",
            "153000",
            "BAR DO JOAO",
            "LOJA DO O - MATRIZ",
        )
    }

    fn parse(line: &str) -> Result<TransactionRecord, ValidationError> {
        CnabLineParser::new().parse_line(line)
    }

    #[test]
    fn test_parse_reference_line() {
        let line = "1201903010000010000123456789011234****5678153000BAR DO JOAO   LOJA DO O - MATRIZ ";
        let record = parse(line).unwrap();

        let expected_at =
            NaiveDateTime::parse_from_str("2019-03-01 15:30:00", "%Y-%m-%d %H:%M:%S").unwrap();

        assert_eq!(record.transaction_type, TransactionType::Debit);
        assert_eq!(record.occurred_at, expected_at);
        assert_eq!(record.value, Decimal::new(10000, 2));
        assert_eq!(record.cpf, "12345678901");
        assert_eq!(record.card, "1234****5678");
        assert_eq!(record.store_owner, "BAR DO JOAO");
        assert_eq!(record.store_name, "LOJA DO O - MATRIZ");
    }

    #[test]
    fn test_build_line_matches_layout() {
        let line = valid_line_with("1");
        assert_eq!(line.chars().count(), FIXED_WIDTH + 19);
        assert_eq!(
            line,
            "1201903010000010000123456789011234****5678153000BAR DO JOAO   LOJA DO O - MATRIZ "
        );
    }

    #[test]
    fn test_sign_follows_type_nature() {
        for tx_type in TransactionType::ALL {
            let record = parse(&valid_line_with(&tx_type.code().to_string())).unwrap();
            let expected = Decimal::new(10000 * i64::from(tx_type.sign()), 2);

            assert_eq!(record.transaction_type, tx_type);
            assert_eq!(record.value, expected, "wrong sign for {}", tx_type);
        }

        assert_eq!(parse(&valid_line_with("2")).unwrap().value, Decimal::new(-10000, 2));
    }

    #[test]
    fn test_value_keeps_two_decimals() {
        let line = build_line(
            "3", "20190301", "0000000142", "12345678901", "1234****5678", "000000", "OWNER", "STORE",
        );
        let record = parse(&line).unwrap();

        assert_eq!(record.value, Decimal::new(-142, 2));
        assert_eq!(record.value.to_string(), "-1.42");
    }

    #[test]
    fn test_zero_value_is_not_negative() {
        let line = build_line(
            "9", "20190301", "0000000000", "12345678901", "1234****5678", "000000", "OWNER", "STORE",
        );
        assert_eq!(parse(&line).unwrap().value.to_string(), "0.00");
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let line = valid_line_with("6");
        assert_eq!(parse(&line).unwrap(), parse(&line).unwrap());
    }

    #[test]
    fn test_blank_line_rejected() {
        assert_eq!(parse(""), Err(ValidationError::BlankLine));
        assert_eq!(parse("   \t"), Err(ValidationError::BlankLine));
    }

    #[test]
    fn test_short_line_rejected() {
        let err = parse("1201903010000010000").unwrap_err();
        assert_eq!(
            err,
            ValidationError::LineTooShort {
                expected: FIXED_WIDTH,
                actual: 19
            }
        );
    }

    #[test]
    fn test_type_errors() {
        let err = parse(&valid_line_with("X")).unwrap_err();
        assert!(err.to_string().contains("Invalid transaction type format"));

        let err = parse(&valid_line_with("0")).unwrap_err();
        assert!(err.to_string().contains("Invalid transaction type value"));
        assert_eq!(err.field(), "type");
    }

    #[test]
    fn test_date_errors_are_distinct() {
        let line = build_line(
            "1", "2019A301", "0000010000", "12345678901", "1234****5678", "153000", "OWNER", "STORE",
        );
        assert_eq!(parse(&line), Err(ValidationError::InvalidDateFormat("2019A301".into())));

        let line = build_line(
            "1", "20190230", "0000010000", "12345678901", "1234****5678", "153000", "OWNER", "STORE",
        );
        assert_eq!(parse(&line), Err(ValidationError::InvalidDateValue("20190230".into())));

        let line = build_line(
            "1", "00000101", "0000010000", "12345678901", "1234****5678", "153000", "OWNER", "STORE",
        );
        assert_eq!(parse(&line), Err(ValidationError::InvalidDateValue("00000101".into())));
    }

    #[test]
    fn test_time_errors_are_distinct() {
        let line = build_line(
            "1", "20190301", "0000010000", "12345678901", "1234****5678", "15:300", "OWNER", "STORE",
        );
        let err = parse(&line).unwrap_err();
        assert!(err.to_string().contains("Invalid time format"));

        for bad in ["240000", "236000", "235960"] {
            let line = build_line(
                "1", "20190301", "0000010000", "12345678901", "1234****5678", bad, "OWNER", "STORE",
            );
            assert_eq!(parse(&line), Err(ValidationError::InvalidTimeValue(bad.into())));
        }
    }

    #[test]
    fn test_value_with_non_digits_rejected() {
        let line = build_line(
            "1", "20190301", "00000A0000", "12345678901", "1234****5678", "153000", "OWNER", "STORE",
        );
        let err = parse(&line).unwrap_err();

        assert_eq!(err.field(), "value");
        assert!(err.to_string().contains("Invalid transaction value format"));
    }

    #[test]
    fn test_cpf_keeps_leading_zeros() {
        let line = build_line(
            "1", "20190301", "0000010000", "00045678901", "1234****5678", "153000", "OWNER", "STORE",
        );
        assert_eq!(parse(&line).unwrap().cpf, "00045678901");

        let line = build_line(
            "1", "20190301", "0000010000", "123.456.789", "1234****5678", "153000", "OWNER", "STORE",
        );
        assert!(parse(&line).unwrap_err().to_string().contains("Invalid CPF format"));
    }

    #[test]
    fn test_card_trimmed_and_required() {
        let line = build_line(
            "1", "20190301", "0000010000", "12345678901", "  12**56  ", "153000", "OWNER", "STORE",
        );
        assert_eq!(parse(&line).unwrap().card, "12**56");

        let line = build_line(
            "1", "20190301", "0000010000", "12345678901", "", "153000", "OWNER", "STORE",
        );
        assert_eq!(parse(&line), Err(ValidationError::EmptyCard));
    }

    #[test]
    fn test_store_owner_and_name_required() {
        let line = build_line(
            "1", "20190301", "0000010000", "12345678901", "1234****5678", "153000", "", "STORE",
        );
        assert_eq!(parse(&line), Err(ValidationError::EmptyStoreOwner));

        let line = build_line(
            "1", "20190301", "0000010000", "12345678901", "1234****5678", "153000", "OWNER", "",
        );
        assert_eq!(parse(&line), Err(ValidationError::EmptyStoreName));
    }

    #[test]
    fn test_store_name_is_rest_of_line() {
        let mut line = valid_line_with("4");
        line.truncate(FIXED_WIDTH);
        line.push_str("MERCADO DA AVENIDA - UNIDADE CENTRO   ");

        let record = parse(&line).unwrap();
        assert_eq!(record.store_name, "MERCADO DA AVENIDA - UNIDADE CENTRO");
    }

    #[test]
    fn test_largest_value_fits() {
        let line = build_line(
            "2", "20190301", "9999999999", "12345678901", "1234****5678", "000000", "OWNER", "STORE",
        );
        assert_eq!(parse(&line).unwrap().value.to_string(), "-99999999.99");
    }

    #[test]
    fn test_non_ascii_digits_rejected_by_content() {
        // One char wide, but not an ASCII digit
        let err = parse(&valid_line_with("Ä")).unwrap_err();
        assert_eq!(err, ValidationError::InvalidTypeFormat("Ä".to_string()));

        let line = build_line(
            "1", "20190301", "0000010000", "1234567890٣", "1234****5678", "153000", "OWNER", "STORE",
        );
        assert_eq!(parse(&line).unwrap_err().field(), "cpf");
    }

    #[test]
    fn test_card_accepts_any_twelve_characters() {
        let line = build_line(
            "1", "20190301", "0000010000", "12345678901", "ÇÃÕ*****1234", "153000", "OWNER", "STORE",
        );
        assert_eq!(parse(&line).unwrap().card, "ÇÃÕ*****1234");
    }

    #[test]
    fn test_offsets_count_characters() {
        let line = build_line(
            "1", "20190301", "0000010000", "12345678901", "1234****5678", "153000", "JOSÉ DA SILVA", "LOJA DO Ó",
        );
        let record = parse(&line).unwrap();

        assert_eq!(record.store_owner, "JOSÉ DA SILVA");
        assert_eq!(record.store_name, "LOJA DO Ó");
        assert_eq!(record.occurred_at.format("%H%M%S").to_string(), "153000");
    }
}
