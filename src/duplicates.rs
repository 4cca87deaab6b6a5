use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::models::{Currency, Invoice};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup<'a> {
    /// Folio key shared by every member.
    pub key: String,
    pub members: Vec<(Currency, &'a Invoice)>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DuplicateReport<'a> {
    /// Groups in order of first appearance of their folio key.
    pub groups: Vec<DuplicateGroup<'a>>,
    /// Every invoice id that belongs to some group, for per-row highlighting.
    pub flagged_ids: BTreeSet<String>,
}

impl<'a> DuplicateReport<'a> {
    pub fn is_flagged(&self, id: &str) -> bool {
        self.flagged_ids.contains(id)
    }

    pub fn group(&self, key: &str) -> Option<&DuplicateGroup<'a>> {
        self.groups.iter().find(|g| g.key == key)
    }

    /// Number of invoices involved across all groups.
    pub fn invoice_count(&self) -> usize {
        self.groups.iter().map(|g| g.members.len()).sum()
    }
}

/// Group invoices from every currency by folio key and keep the keys that
/// appear more than once. Empty keys never count as duplicates.
pub fn find_duplicates<'a, I>(invoices: I) -> DuplicateReport<'a>
where
    I: IntoIterator<Item = (Currency, &'a Invoice)>,
{
    let mut order: Vec<DuplicateGroup<'a>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (currency, invoice) in invoices {
        let key = invoice.folio_key();
        if key.is_empty() {
            continue;
        }
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            order.push(DuplicateGroup {
                key,
                members: Vec::new(),
            });
            order.len() - 1
        });
        order[slot].members.push((currency, invoice));
    }

    let groups: Vec<DuplicateGroup<'a>> = order.into_iter().filter(|g| g.members.len() > 1).collect();
    let flagged_ids = groups
        .iter()
        .flat_map(|g| g.members.iter().map(|(_, inv)| inv.id.clone()))
        .collect();

    debug!(groups = groups.len(), "duplicate folio scan");
    DuplicateReport { groups, flagged_ids }
}

// ---------------------------------------------------------------------------
// Import pre-check
// ---------------------------------------------------------------------------

/// Keys already present in the store, used to reject incoming rows that
/// would duplicate an existing invoice (or an earlier row of the same batch).
///
/// A candidate matches on its fiscal uuid when that has at least 9
/// characters, or on its folio key qualified by supplier name. Both compare
/// case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct DuplicateIndex {
    keys: HashSet<String>,
}

impl DuplicateIndex {
    pub fn from_invoices<'a, I>(invoices: I) -> Self
    where
        I: IntoIterator<Item = &'a Invoice>,
    {
        let mut index = Self::default();
        for inv in invoices {
            index.insert(&inv.uuid, &inv.folio_key(), &inv.proveedor);
        }
        index
    }

    fn uuid_key(uuid: &str) -> Option<String> {
        let uuid = uuid.trim();
        (uuid.chars().count() > 8).then(|| format!("uuid:{}", uuid.to_lowercase()))
    }

    fn folio_key(folio_key: &str, proveedor: &str) -> Option<String> {
        let folio_key = folio_key.trim();
        (!folio_key.is_empty()).then(|| format!("sfp:{}:{}", folio_key, proveedor.trim()).to_lowercase())
    }

    pub fn contains(&self, uuid: &str, folio_key: &str, proveedor: &str) -> bool {
        Self::uuid_key(uuid).is_some_and(|k| self.keys.contains(&k))
            || Self::folio_key(folio_key, proveedor).is_some_and(|k| self.keys.contains(&k))
    }

    pub fn insert(&mut self, uuid: &str, folio_key: &str, proveedor: &str) {
        if let Some(k) = Self::uuid_key(uuid) {
            self.keys.insert(k);
        }
        if let Some(k) = Self::folio_key(folio_key, proveedor) {
            self.keys.insert(k);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::invoice;
    use crate::store::InvoiceStore;

    fn with_folio(id: &str, serie: &str, folio: &str, total: f64) -> Invoice {
        let mut inv = invoice(id, "EDUARDO VELAZQUEZ", total);
        inv.serie = serie.to_string();
        inv.folio = folio.to_string();
        inv
    }

    #[test]
    fn test_same_folio_is_one_group() {
        let mut a = with_folio("i1", "A", "3200", 7424.0);
        a.vencimiento = Some("2026-02-06".to_string());
        let mut b = with_folio("i2", "A", "3200", 100.0);
        b.vencimiento = Some("2026-02-10".to_string());
        let report = find_duplicates([(Currency::MXN, &a), (Currency::MXN, &b)]);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].key, "A3200");
        assert!(report.is_flagged("i1"));
        assert!(report.is_flagged("i2"));
        assert_eq!(report.invoice_count(), 2);
    }

    #[test]
    fn test_detects_across_currencies() {
        let mut store = InvoiceStore::new();
        store.insert(Currency::MXN, with_folio("i1", "B", "100", 1.0)).unwrap();
        store.insert(Currency::USD, with_folio("i2", "B", "100", 1.0)).unwrap();
        store.insert(Currency::EUR, with_folio("i3", "B", "101", 1.0)).unwrap();
        let report = find_duplicates(store.iter());
        let group = report.group("B100").unwrap();
        assert_eq!(
            group.members.iter().map(|(c, _)| *c).collect::<Vec<_>>(),
            vec![Currency::MXN, Currency::USD]
        );
        assert!(!report.is_flagged("i3"));
    }

    #[test]
    fn test_empty_and_unique_keys_never_flagged() {
        let a = with_folio("i1", "", "", 1.0);
        let b = with_folio("i2", " ", " ", 1.0);
        let c = with_folio("i3", "A", "1", 1.0);
        let report = find_duplicates([(Currency::MXN, &a), (Currency::MXN, &b), (Currency::MXN, &c)]);
        assert!(report.groups.is_empty());
        assert!(report.flagged_ids.is_empty());
    }

    #[test]
    fn test_trimmed_key_matches() {
        let a = with_folio("i1", "A", "3200 ", 1.0);
        let b = with_folio("i2", " A", "3200", 1.0);
        let report = find_duplicates([(Currency::MXN, &a), (Currency::EUR, &b)]);
        assert_eq!(report.groups[0].key, "A3200");
    }

    #[test]
    fn test_group_order_and_idempotence() {
        let invs = vec![
            with_folio("i1", "Z", "9", 1.0),
            with_folio("i2", "A", "1", 1.0),
            with_folio("i3", "A", "1", 1.0),
            with_folio("i4", "Z", "9", 1.0),
        ];
        let input: Vec<(Currency, &Invoice)> = invs.iter().map(|i| (Currency::MXN, i)).collect();
        let first = find_duplicates(input.clone());
        let keys: Vec<&str> = first.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["Z9", "A1"]);
        assert_eq!(first, find_duplicates(input));
    }

    #[test]
    fn test_index_matches_uuid_or_folio_and_supplier() {
        let mut existing = with_folio("i1", "A", "3200", 1.0);
        existing.uuid = "4733F910-3C0F-4667-A5FF-B7FF523CC28A".to_string();
        let index = DuplicateIndex::from_invoices([&existing]);

        assert!(index.contains("4733f910-3c0f-4667-a5ff-b7ff523cc28a", "", ""));
        assert!(index.contains("", "a3200", "eduardo velazquez"));
        assert!(!index.contains("", "A3200", "OTRO PROVEEDOR"));
        assert!(!index.contains("short", "", ""));
    }

    #[test]
    fn test_index_short_uuid_ignored() {
        let mut index = DuplicateIndex::default();
        index.insert("12345678", "", "X");
        assert!(!index.contains("12345678", "", "X"));
        index.insert("123456789", "", "X");
        assert!(index.contains("123456789", "", "Y"));
    }
}
