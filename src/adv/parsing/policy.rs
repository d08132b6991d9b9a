use std::collections::HashMap;

use super::types::PrivateFundRecord;

/// Chooses the signatory among all `Printed Name:` candidates, in document order.
pub type SignatoryPolicy = fn(&[String]) -> Option<String>;

/// Resolves two reported values for the same fund: `(kept, incoming) -> kept'`.
pub type ValuePolicy = fn(u64, u64) -> u64;

/// Amendments are listed chronologically, so the latest signature is authoritative.
pub fn last_signatory(candidates: &[String]) -> Option<String> {
    candidates.last().cloned()
}

pub fn first_signatory(candidates: &[String]) -> Option<String> {
    candidates.first().cloned()
}

pub fn max_value(kept: u64, incoming: u64) -> u64 {
    kept.max(incoming)
}

pub fn latest_value(_kept: u64, incoming: u64) -> u64 {
    incoming
}

#[derive(Clone, Copy)]
pub struct ExtractionPolicy {
    pub signatory: SignatoryPolicy,
    pub fund_value: ValuePolicy,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            signatory: last_signatory,
            fund_value: max_value,
        }
    }
}

impl std::fmt::Debug for ExtractionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionPolicy").finish_non_exhaustive()
    }
}

/// Collapses records sharing `(name, fund_id)` into one, keeping the
/// first-seen order of keys.
pub fn dedup_funds(raw: Vec<PrivateFundRecord>, resolve: ValuePolicy) -> Vec<PrivateFundRecord> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut canonical: Vec<PrivateFundRecord> = Vec::with_capacity(raw.len());

    for record in raw {
        let key = (record.name.clone(), record.fund_id.clone());
        match index.get(&key) {
            Some(&pos) => {
                let kept = &mut canonical[pos];
                kept.gross_asset_value = resolve(kept.gross_asset_value, record.gross_asset_value);
            }
            None => {
                index.insert(key, canonical.len());
                canonical.push(record);
            }
        }
    }

    canonical
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fund(name: &str, id: &str, value: u64) -> PrivateFundRecord {
        PrivateFundRecord {
            name: name.to_string(),
            fund_id: id.to_string(),
            gross_asset_value: value,
        }
    }

    #[test]
    fn test_dedup_keeps_max_per_key() {
        let raw = vec![
            fund("Acme Fund", "805-111", 100),
            fund("Beta Fund", "805-222", 50),
            fund("Acme Fund", "805-111", 250),
        ];

        let deduped = dedup_funds(raw, max_value);
        assert_eq!(
            deduped,
            vec![fund("Acme Fund", "805-111", 250), fund("Beta Fund", "805-222", 50)]
        );
    }

    #[test]
    fn test_dedup_max_is_order_independent() {
        let raw = vec![
            fund("Acme Fund", "805-111", 250),
            fund("Acme Fund", "805-111", 100),
        ];
        assert_eq!(dedup_funds(raw, max_value)[0].gross_asset_value, 250);
    }

    #[test]
    fn test_same_name_different_id_is_not_merged() {
        let raw = vec![
            fund("Acme Fund", "805-111", 100),
            fund("Acme Fund", "805-999", 10),
        ];
        assert_eq!(dedup_funds(raw, max_value).len(), 2);
    }

    #[test]
    fn test_alternative_value_policy() {
        let raw = vec![
            fund("Acme Fund", "805-111", 250),
            fund("Acme Fund", "805-111", 100),
        ];
        assert_eq!(dedup_funds(raw, latest_value)[0].gross_asset_value, 100);
    }

    #[test]
    fn test_signatory_policies() {
        let names = vec!["Jane Roe".to_string(), "John Doe".to_string()];
        assert_eq!(last_signatory(&names).as_deref(), Some("John Doe"));
        assert_eq!(first_signatory(&names).as_deref(), Some("Jane Roe"));
        assert_eq!(last_signatory(&[]), None);
    }
}
