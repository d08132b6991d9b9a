use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{FilingText, PrivateFundRecord};

pub const FUND_NAME_MARKER: &str = "1.(a)Name of the private fund:";
pub const FUND_ID_PREFIX: &str = "805-";

/// Largest value the fund table can hold (SQLite INTEGER is a signed 64-bit).
pub const MAX_ASSET_VALUE: u64 = i64::MAX as u64;

static SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)SECTION 7\.B\.\(1\) Private Fund Reporting(.*?)SECTION 7\.B\.\(2\) Private Fund Reporting",
    )
    .expect("private fund section pattern")
});

static BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?s)^(.*?)\(b\)Private fund identification number:.*?(805-\d+)",
        r".*?11\.Current gross asset value of the private fund:\$ *(\d[\d,]*)",
    ))
    .expect("private fund block pattern")
});

static FUND_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^805-\d+$").expect("fund id pattern"));

/// Text strictly between the 7.B.(1) and 7.B.(2) anchors, or `""` when
/// either anchor is missing.
pub fn private_fund_section(text: &FilingText) -> &str {
    SECTION_RE
        .captures(text.as_str())
        .and_then(|caps| caps.get(1))
        .map_or("", |m| m.as_str())
}

pub fn is_valid_fund_id(fund_id: &str) -> bool {
    FUND_ID_RE.is_match(fund_id)
}

/// Parses a reported dollar amount such as `"$ 1,234,567"`. Amounts above
/// [`MAX_ASSET_VALUE`] are rejected like any other unreadable value.
pub fn parse_asset_value(raw: &str) -> Option<u64> {
    let digits: String = raw
        .trim()
        .trim_start_matches('$')
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits
        .parse::<u64>()
        .ok()
        .filter(|value| *value <= MAX_ASSET_VALUE)
}

fn clean_fund_name(raw: &str) -> String {
    raw.trim().replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Splits the section at every fund-name marker. Each block runs up to the
/// next marker, so one block's fields can never be matched inside another.
fn fund_blocks(section: &str) -> Vec<&str> {
    let starts: Vec<usize> = section
        .match_indices(FUND_NAME_MARKER)
        .map(|(pos, _)| pos + FUND_NAME_MARKER.len())
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts
                .get(i + 1)
                .map_or(section.len(), |next| next - FUND_NAME_MARKER.len());
            &section[start..end]
        })
        .collect()
}

fn parse_block(block: &str) -> Option<PrivateFundRecord> {
    let caps = BLOCK_RE.captures(block)?;
    let name = clean_fund_name(&caps[1]);
    let fund_id = caps[2].trim().to_string();

    if !is_valid_fund_id(&fund_id) {
        log::debug!("Skipping private fund block with malformed id {:?}", fund_id);
        return None;
    }

    let Some(gross_asset_value) = parse_asset_value(&caps[3]) else {
        log::debug!(
            "Skipping private fund {:?}: unreadable gross asset value {:?}",
            name,
            &caps[3]
        );
        return None;
    };

    Some(PrivateFundRecord {
        name,
        fund_id,
        gross_asset_value,
    })
}

/// Every private fund block in document order, not yet deduplicated.
pub fn extract_raw_funds(text: &FilingText) -> Vec<PrivateFundRecord> {
    let section = private_fund_section(text);
    if section.is_empty() {
        return Vec::new();
    }

    fund_blocks(section)
        .into_iter()
        .filter_map(parse_block)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(name: &str, id: &str, value: &str) -> String {
        format!(
            "1.(a)Name of the private fund:{name}\n(b)Private fund identification number:\n(include the \"805-\" prefix also)\n{id}\n2.Under the laws of what state\n11.Current gross asset value of the private fund:${value}\n"
        )
    }

    fn filing(blocks: &[String]) -> FilingText {
        FilingText::new(format!(
            "Part 1A\nSECTION 7.B.(1) Private Fund Reporting\n{}SECTION 7.B.(2) Private Fund Reporting\n",
            blocks.concat()
        ))
    }

    #[test]
    fn test_section_requires_both_anchors() {
        let text = FilingText::new(format!(
            "SECTION 7.B.(1) Private Fund Reporting\n{}",
            block("Acme Fund", "805-111", " 100")
        ));
        assert_eq!(private_fund_section(&text), "");
        assert!(extract_raw_funds(&text).is_empty());
    }

    #[test]
    fn test_extracts_blocks_in_document_order() {
        let text = filing(&[
            block("Acme Fund", "805-111", " 100"),
            block("Beta\nFund", "805-222", "50"),
            block("Acme Fund", "805-111", " 250"),
        ]);

        let funds = extract_raw_funds(&text);
        let triples: Vec<_> = funds
            .iter()
            .map(|f| (f.name.as_str(), f.fund_id.as_str(), f.gross_asset_value))
            .collect();
        assert_eq!(
            triples,
            vec![
                ("Acme Fund", "805-111", 100),
                ("Beta Fund", "805-222", 50),
                ("Acme Fund", "805-111", 250),
            ]
        );
    }

    #[test]
    fn test_wrong_prefix_does_not_borrow_next_block_id() {
        let text = filing(&[
            block("Gamma Fund", "123-456", " 75"),
            block("Delta Fund", "805-333", " 10"),
        ]);

        let funds = extract_raw_funds(&text);
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].name, "Delta Fund");
        assert_eq!(funds[0].fund_id, "805-333");
    }

    #[test]
    fn test_overflowing_value_skips_block() {
        let text = filing(&[
            block("Huge Fund", "805-1", "99,999,999,999,999,999,999,999"),
            block("Small Fund", "805-2", "1"),
            block("Unstorable Fund", "805-3", "9,223,372,036,854,775,808"),
            block("Largest Fund", "805-4", "9,223,372,036,854,775,807"),
        ]);
        let funds = extract_raw_funds(&text);
        let names: Vec<_> = funds.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Small Fund", "Largest Fund"]);
        assert_eq!(funds[1].gross_asset_value, MAX_ASSET_VALUE);
    }

    #[test]
    fn test_parse_asset_value() {
        assert_eq!(parse_asset_value("$ 1,234,567"), Some(1_234_567));
        assert_eq!(parse_asset_value("0"), Some(0));
        assert_eq!(parse_asset_value("12a"), None);
        assert_eq!(parse_asset_value("$"), None);
        assert_eq!(parse_asset_value("$ 10,000,000,000,000,000,000"), None);
    }

    #[test]
    fn test_fund_id_shape() {
        assert!(is_valid_fund_id("805-13387801972"));
        assert!(!is_valid_fund_id("123-456"));
        assert!(!is_valid_fund_id("805-"));
        assert!(!is_valid_fund_id("805-12x"));
    }
}
