use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Currency, Invoice, Status, Supplier};
use crate::store::InvoiceStore;

/// Pending balance of one currency split by due state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DueSplit {
    pub vigente: f64,
    pub vencido: f64,
}

/// Headline figures for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Sum of `total - monto_pagado` over every non-paid invoice, per currency.
    pub pending: Vec<(Currency, f64)>,
    pub overdue_count: usize,
    pub invoice_count: usize,
    pub active_suppliers: usize,
    /// Pending balance by classification across currencies, largest first.
    pub by_classification: Vec<(String, f64)>,
    pub due_split: Vec<(Currency, DueSplit)>,
}

impl Summary {
    pub fn pending_for(&self, currency: Currency) -> f64 {
        lookup(&self.pending, currency).unwrap_or(0.0)
    }

    pub fn split_for(&self, currency: Currency) -> DueSplit {
        lookup(&self.due_split, currency).unwrap_or_default()
    }
}

fn lookup<T: Copy>(list: &[(Currency, T)], currency: Currency) -> Option<T> {
    list.iter().find(|(c, _)| *c == currency).map(|(_, v)| *v)
}

fn unpaid(invoice: &Invoice) -> bool {
    invoice.estatus != Status::Pagado
}

pub fn summarize(store: &InvoiceStore, suppliers: &[Supplier], today: NaiveDate) -> Summary {
    let pending = Currency::ALL
        .into_iter()
        .map(|cur| {
            let sum = store
                .bucket(cur)
                .iter()
                .filter(|i| unpaid(i))
                .map(Invoice::outstanding)
                .sum();
            (cur, sum)
        })
        .collect();

    let overdue_count = store.iter().filter(|(_, i)| i.is_overdue(today)).count();

    let mut class_totals: HashMap<&str, f64> = HashMap::new();
    for (_, inv) in store.iter().filter(|(_, i)| unpaid(i)) {
        let label = if inv.clasificacion.trim().is_empty() {
            "Sin clasificar"
        } else {
            inv.clasificacion.as_str()
        };
        *class_totals.entry(label).or_insert(0.0) += inv.outstanding();
    }
    let mut by_classification: Vec<(String, f64)> = class_totals
        .into_iter()
        .filter(|(_, v)| *v > 0.0)
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    by_classification.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let due_split = Currency::ALL
        .into_iter()
        .map(|cur| {
            let mut split = DueSplit::default();
            for inv in store.bucket(cur).iter().filter(|i| unpaid(i)) {
                let balance = inv.outstanding();
                if balance <= 0.0 {
                    continue;
                }
                if inv.is_overdue(today) {
                    split.vencido += balance;
                } else {
                    split.vigente += balance;
                }
            }
            (cur, split)
        })
        .collect();

    Summary {
        pending,
        overdue_count,
        invoice_count: store.len(),
        active_suppliers: suppliers.iter().filter(|s| s.activo).count(),
        by_classification,
        due_split,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::invoice;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
    }

    fn sample() -> InvoiceStore {
        let mut store = InvoiceStore::new();
        let mut a = invoice("i1", "EDUARDO VELAZQUEZ", 7424.0);
        a.vencimiento = Some("2026-02-06".to_string());
        let mut b = invoice("i2", "EDUARDO VELAZQUEZ", 13920.0);
        b.vencimiento = Some("2026-03-01".to_string());
        b.clasificacion = "Circuitos".to_string();
        b.monto_pagado = 3920.0;
        let mut c = invoice("i3", "TECH SUPPLIES SA", 500.0);
        c.estatus = Status::Pagado;
        c.monto_pagado = 500.0;
        c.vencimiento = Some("2026-01-01".to_string());
        let mut d = invoice("i4", "TECH SUPPLIES SA", 200.0);
        d.vencimiento = Some("2026-01-20".to_string());
        store.insert(Currency::MXN, a).unwrap();
        store.insert(Currency::MXN, b).unwrap();
        store.insert(Currency::MXN, c).unwrap();
        store.insert(Currency::USD, d).unwrap();
        store
    }

    #[test]
    fn test_pending_and_counts() {
        let suppliers = vec![
            Supplier::default(),
            Supplier {
                activo: false,
                ..Default::default()
            },
        ];
        let s = summarize(&sample(), &suppliers, today());
        assert_eq!(s.pending_for(Currency::MXN), 7424.0 + 10000.0);
        assert_eq!(s.pending_for(Currency::USD), 200.0);
        assert_eq!(s.pending_for(Currency::EUR), 0.0);
        assert_eq!(s.overdue_count, 2);
        assert_eq!(s.invoice_count, 4);
        assert_eq!(s.active_suppliers, 1);
    }

    #[test]
    fn test_classification_ranking() {
        let s = summarize(&sample(), &[], today());
        assert_eq!(
            s.by_classification,
            vec![
                ("Circuitos".to_string(), 10000.0),
                ("Gastos Fijos".to_string(), 7624.0),
            ]
        );
    }

    #[test]
    fn test_due_split() {
        let s = summarize(&sample(), &[], today());
        let mxn = s.split_for(Currency::MXN);
        assert_eq!(mxn.vencido, 7424.0);
        assert_eq!(mxn.vigente, 10000.0);
        assert_eq!(s.split_for(Currency::USD).vencido, 200.0);
    }
}
