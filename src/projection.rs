//! Provider × payment-date matrix of outstanding balances.
//!
//! An invoice is placed on its effective payment date (scheduled date, or the
//! due date when nothing is scheduled). Row, column and grand totals are
//! computed from the cells on every read.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{amount, parse_iso_date, Currency, Invoice};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectionQuery {
    /// Inclusive lower bound on the effective payment date.
    #[serde(default)]
    pub from: Option<String>,
    /// Inclusive upper bound on the effective payment date.
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedInvoice<'a> {
    pub currency: Currency,
    pub invoice: &'a Invoice,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProjectionCell<'a> {
    pub total: f64,
    /// Indexed MXN, USD, EUR.
    pub by_currency: [f64; 3],
    pub invoices: Vec<ProjectedInvoice<'a>>,
}

impl ProjectionCell<'_> {
    pub fn currency_total(&self, currency: Currency) -> f64 {
        self.by_currency[currency.index()]
    }

    /// More than one currency contributes a positive amount.
    pub fn is_mixed(&self) -> bool {
        self.by_currency.iter().filter(|v| **v > 0.0).count() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionMatrix<'a> {
    /// Alphabetical.
    pub providers: Vec<String>,
    /// Ascending ISO dates.
    pub dates: Vec<String>,
    pub cells: BTreeMap<(String, String), ProjectionCell<'a>>,
}

impl<'a> ProjectionMatrix<'a> {
    pub fn cell(&self, provider: &str, date: &str) -> Option<&ProjectionCell<'a>> {
        self.cells.get(&(provider.to_string(), date.to_string()))
    }

    pub fn row_total(&self, provider: &str) -> f64 {
        self.cells
            .iter()
            .filter(|((p, _), _)| p == provider)
            .map(|(_, c)| c.total)
            .sum()
    }

    pub fn column_total(&self, date: &str) -> f64 {
        self.cells
            .iter()
            .filter(|((_, d), _)| d == date)
            .map(|(_, c)| c.total)
            .sum()
    }

    pub fn column_currency_total(&self, date: &str, currency: Currency) -> f64 {
        self.cells
            .iter()
            .filter(|((_, d), _)| d == date)
            .map(|(_, c)| c.currency_total(currency))
            .sum()
    }

    pub fn grand_total(&self) -> f64 {
        self.cells.values().map(|c| c.total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

fn active(val: &Option<String>) -> Option<&str> {
    val.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Narrow free-text match over supplier, folio key, total, concept and
/// classification.
fn matches_search(invoice: &Invoice, query: &str) -> bool {
    let q = query.to_lowercase();
    invoice.proveedor.to_lowercase().contains(&q)
        || format!("{}{}", invoice.serie, invoice.folio).to_lowercase().contains(&q)
        || amount(invoice.total).to_string().contains(&q)
        || invoice.concepto.to_lowercase().contains(&q)
        || invoice.clasificacion.to_lowercase().contains(&q)
}

/// Every calendar day from `from` to `to` inclusive. `None` when either bound
/// is not a valid date.
fn days_between(from: &str, to: &str) -> Option<Vec<String>> {
    let start = parse_iso_date(from)?;
    let end = parse_iso_date(to)?;
    Some(
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect(),
    )
}

pub fn build_projection_matrix<'a, I>(invoices: I, query: &ProjectionQuery) -> ProjectionMatrix<'a>
where
    I: IntoIterator<Item = (Currency, &'a Invoice)>,
{
    let from = active(&query.from);
    let to = active(&query.to);
    let search = active(&query.search);

    let mut cells: BTreeMap<(String, String), ProjectionCell<'a>> = BTreeMap::new();
    let mut providers: BTreeSet<String> = BTreeSet::new();
    let mut seen_dates: BTreeSet<String> = BTreeSet::new();

    for (currency, invoice) in invoices {
        if !invoice.is_pending() {
            continue;
        }
        let Some(pay_date) = invoice.effective_payment_date() else {
            continue;
        };
        if from.is_some_and(|f| pay_date < f) || to.is_some_and(|t| pay_date > t) {
            continue;
        }
        if search.is_some_and(|q| !matches_search(invoice, q)) {
            continue;
        }

        let balance = invoice.outstanding();
        providers.insert(invoice.proveedor.clone());
        seen_dates.insert(pay_date.to_string());
        let cell = cells
            .entry((invoice.proveedor.clone(), pay_date.to_string()))
            .or_default();
        cell.total += balance;
        cell.by_currency[currency.index()] += balance;
        cell.invoices.push(ProjectedInvoice {
            currency,
            invoice,
            balance,
        });
    }

    let dates = match (from, to) {
        (Some(f), Some(t)) => days_between(f, t).unwrap_or_else(|| seen_dates.into_iter().collect()),
        _ => seen_dates.into_iter().collect(),
    };

    debug!(
        providers = providers.len(),
        dates = dates.len(),
        cells = cells.len(),
        "projection matrix built"
    );

    ProjectionMatrix {
        providers: providers.into_iter().collect(),
        dates,
        cells,
    }
}
