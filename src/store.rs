use rand::Rng;
use tracing::debug;

use crate::error::{CxpError, Result};
use crate::models::{add_days, amount, find_supplier, round2, Currency, Invoice, InvoiceType, Status, Supplier};

// ---------------------------------------------------------------------------
// Invoice store
// ---------------------------------------------------------------------------

/// In-memory invoice collection partitioned by currency. Ids are unique per
/// bucket; moving between buckets is a remove followed by an insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceStore {
    buckets: [Vec<Invoice>; 3],
}

impl InvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(&self, currency: Currency) -> &[Invoice] {
        &self.buckets[currency.index()]
    }

    /// Every invoice with its currency, MXN first, then USD, then EUR.
    pub fn iter(&self) -> impl Iterator<Item = (Currency, &Invoice)> + '_ {
        Currency::ALL
            .into_iter()
            .flat_map(move |cur| self.bucket(cur).iter().map(move |inv| (cur, inv)))
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, currency: Currency, id: &str) -> Option<&Invoice> {
        self.bucket(currency).iter().find(|i| i.id == id)
    }

    /// First invoice with this id, searching MXN, USD, EUR in order.
    pub fn find(&self, id: &str) -> Option<(Currency, &Invoice)> {
        self.iter().find(|(_, inv)| inv.id == id)
    }

    pub fn insert(&mut self, currency: Currency, invoice: Invoice) -> Result<()> {
        if self.get(currency, &invoice.id).is_some() {
            return Err(CxpError::DuplicateId {
                currency,
                id: invoice.id,
            });
        }
        self.buckets[currency.index()].push(invoice);
        Ok(())
    }

    pub fn upsert(&mut self, currency: Currency, invoice: Invoice) {
        let bucket = &mut self.buckets[currency.index()];
        match bucket.iter_mut().find(|i| i.id == invoice.id) {
            Some(existing) => *existing = invoice,
            None => bucket.push(invoice),
        }
    }

    pub fn remove(&mut self, currency: Currency, id: &str) -> Option<Invoice> {
        let bucket = &mut self.buckets[currency.index()];
        let pos = bucket.iter().position(|i| i.id == id)?;
        Some(bucket.remove(pos))
    }

    /// Move an invoice to another currency bucket. Leaves the store untouched
    /// when the id is missing or already taken in the target bucket.
    pub fn move_to(&mut self, id: &str, from: Currency, to: Currency) -> Result<()> {
        if from == to {
            return self
                .get(from, id)
                .map(|_| ())
                .ok_or_else(|| CxpError::UnknownInvoice(id.to_string()));
        }
        if self.get(from, id).is_none() {
            return Err(CxpError::UnknownInvoice(id.to_string()));
        }
        if self.get(to, id).is_some() {
            return Err(CxpError::DuplicateId {
                currency: to,
                id: id.to_string(),
            });
        }
        let invoice = self
            .remove(from, id)
            .ok_or_else(|| CxpError::UnknownInvoice(id.to_string()))?;
        debug!(id, %from, %to, "moving invoice between currencies");
        self.insert(to, invoice)
    }

    pub fn apply_edit(&mut self, currency: Currency, id: &str, edit: &InvoiceEdit) -> Result<&Invoice> {
        let inv = self.buckets[currency.index()]
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| CxpError::UnknownInvoice(id.to_string()))?;
        edit.apply(inv);
        Ok(&*inv)
    }

    /// Apply a bulk edit to the given ids in one bucket. Returns the ids that
    /// were found and changed.
    pub fn apply_bulk(&mut self, currency: Currency, ids: &[String], edit: &BulkEdit) -> Vec<String> {
        if edit.is_empty() {
            return Vec::new();
        }
        let mut touched = Vec::new();
        for inv in self.buckets[currency.index()].iter_mut() {
            if !ids.contains(&inv.id) {
                continue;
            }
            edit.apply(inv);
            touched.push(inv.id.clone());
        }
        debug!(count = touched.len(), %currency, "bulk edit applied");
        touched
    }
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

/// Inline single-field edits from the Cartera view.
#[derive(Debug, Clone, PartialEq)]
pub enum InvoiceEdit {
    Clasificacion(String),
    Concepto(String),
    /// Empty string clears the scheduled date.
    FechaProgramacion(String),
    Estatus(Status),
    MontoPagado(f64),
    ToggleVoBo,
    ToggleAutorizado,
}

impl InvoiceEdit {
    fn apply(&self, inv: &mut Invoice) {
        match self {
            Self::Clasificacion(c) => inv.clasificacion = c.clone(),
            Self::Concepto(c) => inv.concepto = c.clone(),
            Self::FechaProgramacion(d) => {
                let d = d.trim();
                inv.fecha_programacion = if d.is_empty() { None } else { Some(d.to_string()) };
            }
            Self::Estatus(s) => {
                inv.estatus = *s;
                if *s == Status::Pagado {
                    inv.monto_pagado = amount(inv.total);
                }
            }
            Self::MontoPagado(m) => {
                inv.monto_pagado = amount(*m).max(0.0);
                inv.apply_payment_rule();
            }
            Self::ToggleVoBo => inv.vo_bo = !inv.vo_bo,
            Self::ToggleAutorizado => inv.autorizado_direccion = !inv.autorizado_direccion,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkEdit {
    pub clasificacion: Option<String>,
    pub fecha_programacion: Option<String>,
    pub estatus: Option<Status>,
}

impl BulkEdit {
    pub fn is_empty(&self) -> bool {
        self.clasificacion.is_none() && self.fecha_programacion.is_none() && self.estatus.is_none()
    }

    fn apply(&self, inv: &mut Invoice) {
        if let Some(c) = &self.clasificacion {
            inv.clasificacion = c.clone();
        }
        if let Some(d) = &self.fecha_programacion {
            inv.fecha_programacion = Some(d.clone());
        }
        if let Some(s) = self.estatus {
            inv.estatus = s;
            if s == Status::Pagado {
                inv.monto_pagado = amount(inv.total);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Drafting
// ---------------------------------------------------------------------------

/// Form input for a new or edited invoice, before the derived fields are filled.
#[derive(Debug, Clone, Default)]
pub struct InvoiceDraft {
    pub id: Option<String>,
    pub tipo: InvoiceType,
    pub fecha: String,
    pub serie: String,
    pub folio: String,
    pub uuid: String,
    pub proveedor: String,
    pub clasificacion: String,
    pub subtotal: f64,
    /// `None` means "compute from the IVA rate".
    pub iva: Option<f64>,
    pub ret_isr: f64,
    pub ret_iva: f64,
    pub monto_pagado: f64,
    pub concepto: String,
    pub dias_credito: Option<i64>,
    /// Explicit due date; otherwise `fecha + dias_credito`.
    pub vencimiento: Option<String>,
    pub estatus: Option<Status>,
    pub fecha_programacion: Option<String>,
    pub dias_ficticios: i64,
    pub referencia: String,
    pub notas: String,
}

/// Defaults applied while drafting, usually taken from settings.
#[derive(Debug, Clone, Copy)]
pub struct DraftDefaults {
    pub iva_rate: f64,
    pub credit_days: i64,
}

impl Default for DraftDefaults {
    fn default() -> Self {
        Self {
            iva_rate: 0.16,
            credit_days: 30,
        }
    }
}

impl InvoiceDraft {
    pub fn finalize(self, suppliers: &[Supplier], defaults: DraftDefaults) -> Invoice {
        let subtotal = amount(self.subtotal);
        let iva = match self.iva {
            Some(v) => amount(v),
            None => round2(subtotal * defaults.iva_rate),
        };
        let ret_isr = amount(self.ret_isr);
        let ret_iva = amount(self.ret_iva);
        let total = round2(subtotal + iva - ret_isr - ret_iva);
        let dias_credito = self
            .dias_credito
            .filter(|d| *d > 0)
            .or_else(|| find_supplier(suppliers, &self.proveedor).map(|s| s.dias_credito))
            .unwrap_or(defaults.credit_days);
        let vencimiento = self
            .vencimiento
            .filter(|v| !v.trim().is_empty())
            .or_else(|| add_days(&self.fecha, dias_credito));

        let mut invoice = Invoice {
            id: self.id.unwrap_or_else(new_id),
            tipo: self.tipo,
            fecha: self.fecha,
            serie: self.serie,
            folio: self.folio,
            uuid: self.uuid,
            proveedor: self.proveedor,
            clasificacion: self.clasificacion,
            subtotal,
            iva,
            ret_isr,
            ret_iva,
            total,
            monto_pagado: amount(self.monto_pagado).max(0.0),
            concepto: self.concepto,
            dias_credito,
            vencimiento,
            estatus: self.estatus.unwrap_or_default(),
            fecha_programacion: self.fecha_programacion.filter(|d| !d.trim().is_empty()),
            dias_ficticios: self.dias_ficticios.max(0),
            referencia: self.referencia,
            notas: self.notas,
            vo_bo: false,
            autorizado_direccion: false,
        };
        invoice.apply_payment_rule();
        invoice
    }
}

/// Short random id: 8 lowercase base-36 characters.
pub fn new_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

// ---------------------------------------------------------------------------
// Classifications
// ---------------------------------------------------------------------------

pub const DEFAULT_CLASSIFICATIONS: &[&str] = &[
    "Reprotección",
    "Circuitos",
    "Gastos Fijos",
    "Materiales",
    "Servicios",
    "Honorarios",
    "Importaciones",
    "Otros",
];

/// Ordered, open set of classification labels. Invoices reference labels by
/// string only: renaming or removing a label leaves invoices untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Classifications {
    labels: Vec<String>,
}

impl Default for Classifications {
    fn default() -> Self {
        Self::new(DEFAULT_CLASSIFICATIONS.iter().map(|s| s.to_string()))
    }
}

impl Classifications {
    pub fn new(labels: impl IntoIterator<Item = String>) -> Self {
        let mut set = Self { labels: Vec::new() };
        for label in labels {
            set.add(&label);
        }
        set
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Returns false when the label is blank or already present.
    pub fn add(&mut self, label: &str) -> bool {
        let label = label.trim();
        if label.is_empty() || self.contains(label) {
            return false;
        }
        self.labels.push(label.to_string());
        true
    }

    pub fn remove(&mut self, label: &str) -> Result<()> {
        let pos = self
            .labels
            .iter()
            .position(|l| l == label)
            .ok_or_else(|| CxpError::UnknownClassification(label.to_string()))?;
        self.labels.remove(pos);
        Ok(())
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let to = to.trim();
        if to.is_empty() {
            return Err(CxpError::Other("classification name cannot be empty".to_string()));
        }
        if from != to && self.contains(to) {
            return Err(CxpError::Other(format!("classification already exists: {to}")));
        }
        let slot = self
            .labels
            .iter_mut()
            .find(|l| l.as_str() == from)
            .ok_or_else(|| CxpError::UnknownClassification(from.to_string()))?;
        *slot = to.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::invoice;

    fn sample_store() -> InvoiceStore {
        let mut store = InvoiceStore::new();
        store.insert(Currency::MXN, invoice("i1", "EDUARDO VELAZQUEZ", 7424.0)).unwrap();
        store.insert(Currency::MXN, invoice("i2", "EDUARDO VELAZQUEZ", 13920.0)).unwrap();
        store.insert(Currency::USD, invoice("i3", "TECH SUPPLIES SA", 5000.0)).unwrap();
        store
    }

    #[test]
    fn test_iter_orders_by_currency() {
        let store = sample_store();
        let order: Vec<(Currency, &str)> = store.iter().map(|(c, i)| (c, i.id.as_str())).collect();
        assert_eq!(
            order,
            vec![(Currency::MXN, "i1"), (Currency::MXN, "i2"), (Currency::USD, "i3")]
        );
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_insert_rejects_duplicate_id_within_bucket() {
        let mut store = sample_store();
        let err = store.insert(Currency::MXN, invoice("i1", "X", 1.0)).unwrap_err();
        assert!(matches!(err, CxpError::DuplicateId { .. }));
        // Same id in another bucket is allowed
        store.insert(Currency::EUR, invoice("i1", "X", 1.0)).unwrap();
    }

    #[test]
    fn test_move_to_is_remove_then_insert() {
        let mut store = sample_store();
        store.move_to("i2", Currency::MXN, Currency::EUR).unwrap();
        assert!(store.get(Currency::MXN, "i2").is_none());
        assert_eq!(store.get(Currency::EUR, "i2").unwrap().total, 13920.0);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_move_to_conflict_leaves_store_untouched() {
        let mut store = sample_store();
        store.insert(Currency::USD, invoice("i1", "X", 1.0)).unwrap();
        let before = store.clone();
        assert!(store.move_to("i1", Currency::MXN, Currency::USD).is_err());
        assert_eq!(store, before);
        assert!(matches!(
            store.move_to("nope", Currency::MXN, Currency::USD),
            Err(CxpError::UnknownInvoice(_))
        ));
    }

    #[test]
    fn test_inline_edits() {
        let mut store = sample_store();
        store
            .apply_edit(Currency::MXN, "i1", &InvoiceEdit::FechaProgramacion("2026-03-01".into()))
            .unwrap();
        assert_eq!(store.get(Currency::MXN, "i1").unwrap().scheduled_date(), Some("2026-03-01"));
        store
            .apply_edit(Currency::MXN, "i1", &InvoiceEdit::FechaProgramacion(String::new()))
            .unwrap();
        assert_eq!(store.get(Currency::MXN, "i1").unwrap().scheduled_date(), None);

        let inv = store.apply_edit(Currency::MXN, "i1", &InvoiceEdit::MontoPagado(1000.0)).unwrap();
        assert_eq!(inv.estatus, Status::Parcial);
        let inv = store.apply_edit(Currency::MXN, "i1", &InvoiceEdit::MontoPagado(7424.0)).unwrap();
        assert_eq!(inv.estatus, Status::Pagado);

        let inv = store.apply_edit(Currency::MXN, "i1", &InvoiceEdit::ToggleVoBo).unwrap();
        assert!(inv.vo_bo);
        let inv = store.apply_edit(Currency::MXN, "i1", &InvoiceEdit::ToggleVoBo).unwrap();
        assert!(!inv.vo_bo);

        assert!(store.apply_edit(Currency::USD, "i1", &InvoiceEdit::ToggleVoBo).is_err());
    }

    #[test]
    fn test_inline_pagado_sets_paid_amount() {
        let mut store = sample_store();
        let inv = store
            .apply_edit(Currency::MXN, "i1", &InvoiceEdit::Estatus(Status::Pagado))
            .unwrap();
        assert_eq!(inv.estatus, Status::Pagado);
        assert_eq!(inv.monto_pagado, 7424.0);
        assert_eq!(inv.outstanding(), 0.0);

        let inv = store
            .apply_edit(Currency::MXN, "i2", &InvoiceEdit::Estatus(Status::Vencido))
            .unwrap();
        assert_eq!(inv.monto_pagado, 0.0);
    }

    #[test]
    fn test_draft_survives_huge_credit_days() {
        let draft = InvoiceDraft {
            fecha: "2026-01-07".to_string(),
            proveedor: "X".to_string(),
            subtotal: 100.0,
            dias_credito: Some(i64::MAX),
            ..Default::default()
        };
        let inv = draft.finalize(&[], DraftDefaults::default());
        assert_eq!(inv.vencimiento, None);
    }

    #[test]
    fn test_bulk_pagado_sets_paid_amount() {
        let mut store = sample_store();
        let edit = BulkEdit {
            estatus: Some(Status::Pagado),
            clasificacion: Some("Servicios".to_string()),
            ..Default::default()
        };
        let touched = store.apply_bulk(Currency::MXN, &["i1".to_string(), "i3".to_string()], &edit);
        assert_eq!(touched, vec!["i1".to_string()]);
        let inv = store.get(Currency::MXN, "i1").unwrap();
        assert_eq!(inv.monto_pagado, 7424.0);
        assert_eq!(inv.clasificacion, "Servicios");
        assert_eq!(store.get(Currency::MXN, "i2").unwrap().estatus, Status::Pendiente);
        assert!(store.apply_bulk(Currency::MXN, &["i2".to_string()], &BulkEdit::default()).is_empty());
    }

    #[test]
    fn test_draft_computes_derived_fields() {
        let draft = InvoiceDraft {
            fecha: "2026-01-07".to_string(),
            proveedor: "EDUARDO VELAZQUEZ".to_string(),
            subtotal: 6400.0,
            ..Default::default()
        };
        let inv = draft.finalize(&[], DraftDefaults::default());
        assert_eq!(inv.iva, 1024.0);
        assert_eq!(inv.total, 7424.0);
        assert_eq!(inv.dias_credito, 30);
        assert_eq!(inv.vencimiento.as_deref(), Some("2026-02-06"));
        assert_eq!(inv.estatus, Status::Pendiente);
        assert_eq!(inv.id.len(), 8);
    }

    #[test]
    fn test_draft_uses_supplier_terms_and_withholdings() {
        let sups = vec![Supplier {
            nombre: "TECH SUPPLIES SA".to_string(),
            dias_credito: 60,
            ..Default::default()
        }];
        let draft = InvoiceDraft {
            id: Some("x1".to_string()),
            fecha: "2026-01-20".to_string(),
            proveedor: "TECH SUPPLIES SA".to_string(),
            subtotal: 1000.0,
            iva: Some(160.0),
            ret_isr: 100.0,
            ret_iva: 106.67,
            monto_pagado: 953.33,
            ..Default::default()
        };
        let inv = draft.finalize(&sups, DraftDefaults::default());
        assert_eq!(inv.id, "x1");
        assert_eq!(inv.total, 953.33);
        assert_eq!(inv.vencimiento.as_deref(), Some("2026-03-21"));
        assert_eq!(inv.estatus, Status::Pagado);
    }

    #[test]
    fn test_draft_explicit_due_date_wins() {
        let draft = InvoiceDraft {
            fecha: "2026-01-07".to_string(),
            subtotal: 100.0,
            vencimiento: Some("2026-01-10".to_string()),
            ..Default::default()
        };
        let inv = draft.finalize(&[], DraftDefaults::default());
        assert_eq!(inv.vencimiento.as_deref(), Some("2026-01-10"));
    }

    #[test]
    fn test_classifications_no_cascade() {
        let mut classes = Classifications::default();
        assert_eq!(classes.labels().len(), 8);
        assert!(!classes.add("Otros"));
        assert!(classes.add("Fletes"));
        classes.rename("Fletes", "Logística").unwrap();
        assert!(classes.contains("Logística"));
        assert!(classes.rename("Logística", "Otros").is_err());
        classes.remove("Logística").unwrap();
        assert!(classes.remove("Logística").is_err());

        // Invoices keep orphaned labels
        let mut store = sample_store();
        store
            .apply_edit(Currency::MXN, "i1", &InvoiceEdit::Clasificacion("Borrada".into()))
            .unwrap();
        assert_eq!(store.get(Currency::MXN, "i1").unwrap().clasificacion, "Borrada");
    }
}
