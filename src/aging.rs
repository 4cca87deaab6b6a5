use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::models::{parse_iso_date, Currency, Invoice};

/// Day-count ranges for unpaid invoices. `days` is days until the due date;
/// negative means overdue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AgingBucket {
    Corriente7,
    Corriente15,
    Corriente30,
    CorrienteMas30,
    Vencido7,
    Vencido15,
    Vencido30,
    Vencido60,
    VencidoMas60,
}

impl AgingBucket {
    pub const ALL: [AgingBucket; 9] = [
        AgingBucket::Corriente7,
        AgingBucket::Corriente15,
        AgingBucket::Corriente30,
        AgingBucket::CorrienteMas30,
        AgingBucket::Vencido7,
        AgingBucket::Vencido15,
        AgingBucket::Vencido30,
        AgingBucket::Vencido60,
        AgingBucket::VencidoMas60,
    ];

    pub fn for_days(days: i64) -> Self {
        match days {
            0..=7 => Self::Corriente7,
            8..=15 => Self::Corriente15,
            16..=30 => Self::Corriente30,
            d if d > 30 => Self::CorrienteMas30,
            -7..=-1 => Self::Vencido7,
            -15..=-8 => Self::Vencido15,
            -30..=-16 => Self::Vencido30,
            -60..=-31 => Self::Vencido60,
            _ => Self::VencidoMas60,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Corriente7 => "Corriente 0-7 Días",
            Self::Corriente15 => "Corriente 8-15 Días",
            Self::Corriente30 => "Corriente 16-30 Días",
            Self::CorrienteMas30 => "Corriente +30 Días",
            Self::Vencido7 => "Vencido 1-7 Días",
            Self::Vencido15 => "Vencido 8-15 Días",
            Self::Vencido30 => "Vencido 16-30 Días",
            Self::Vencido60 => "Vencido 31-60 Días",
            Self::VencidoMas60 => "Vencido +60 Días",
        }
    }

    pub fn is_overdue(&self) -> bool {
        matches!(
            self,
            Self::Vencido7 | Self::Vencido15 | Self::Vencido30 | Self::Vencido60 | Self::VencidoMas60
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgedInvoice<'a> {
    pub currency: Currency,
    pub invoice: &'a Invoice,
    pub days_until_due: i64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketSummary<'a> {
    pub bucket: AgingBucket,
    pub invoices: Vec<AgedInvoice<'a>>,
}

impl BucketSummary<'_> {
    pub fn count(&self) -> usize {
        self.invoices.len()
    }

    pub fn balance(&self) -> f64 {
        self.invoices.iter().map(|a| a.balance).sum()
    }
}

/// The nine buckets in display order, current first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgingSheet<'a> {
    pub buckets: Vec<BucketSummary<'a>>,
}

impl<'a> AgingSheet<'a> {
    fn empty() -> Self {
        Self {
            buckets: AgingBucket::ALL
                .iter()
                .map(|b| BucketSummary {
                    bucket: *b,
                    invoices: Vec::new(),
                })
                .collect(),
        }
    }

    fn push(&mut self, aged: AgedInvoice<'a>) {
        let bucket = AgingBucket::for_days(aged.days_until_due);
        if let Some(slot) = self.buckets.iter_mut().find(|b| b.bucket == bucket) {
            slot.invoices.push(aged);
        }
    }

    pub fn bucket(&self, bucket: AgingBucket) -> Option<&BucketSummary<'a>> {
        self.buckets.iter().find(|b| b.bucket == bucket)
    }

    pub fn count(&self) -> usize {
        self.buckets.iter().map(BucketSummary::count).sum()
    }

    pub fn current_balance(&self) -> f64 {
        self.buckets
            .iter()
            .filter(|b| !b.bucket.is_overdue())
            .map(BucketSummary::balance)
            .sum()
    }

    pub fn overdue_balance(&self) -> f64 {
        self.buckets
            .iter()
            .filter(|b| b.bucket.is_overdue())
            .map(BucketSummary::balance)
            .sum()
    }

    pub fn total_balance(&self) -> f64 {
        self.buckets.iter().map(BucketSummary::balance).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgingReport<'a> {
    pub aggregate: AgingSheet<'a>,
    /// Always three entries: MXN, USD, EUR.
    pub by_currency: Vec<(Currency, AgingSheet<'a>)>,
    /// Pending invoices without a usable due date, left out of every bucket.
    pub unclassified: Vec<(Currency, &'a Invoice)>,
}

impl<'a> AgingReport<'a> {
    pub fn currency(&self, currency: Currency) -> &AgingSheet<'a> {
        &self.by_currency[currency.index()].1
    }
}

/// Bucket every pending invoice by days until its due date.
///
/// Paid invoices and invoices with no positive balance are skipped. An
/// invoice without a parseable due date cannot be classified and is reported
/// in `unclassified` instead.
pub fn classify_aging<'a, I>(invoices: I, today: NaiveDate) -> AgingReport<'a>
where
    I: IntoIterator<Item = (Currency, &'a Invoice)>,
{
    let mut aggregate = AgingSheet::empty();
    let mut by_currency: Vec<(Currency, AgingSheet<'a>)> =
        Currency::ALL.iter().map(|c| (*c, AgingSheet::empty())).collect();
    let mut unclassified = Vec::new();

    for (currency, invoice) in invoices {
        if !invoice.is_pending() {
            continue;
        }
        let Some(due) = invoice.due_date().and_then(parse_iso_date) else {
            unclassified.push((currency, invoice));
            continue;
        };
        let aged = AgedInvoice {
            currency,
            invoice,
            days_until_due: (due - today).num_days(),
            balance: invoice.outstanding(),
        };
        by_currency[currency.index()].1.push(aged.clone());
        aggregate.push(aged);
    }

    debug!(
        classified = aggregate.count(),
        unclassified = unclassified.len(),
        "aging classified"
    );

    AgingReport {
        aggregate,
        by_currency,
        unclassified,
    }
}
