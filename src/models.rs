use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CxpError;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The three fixed currency buckets. An invoice lives in exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
    MXN,
    USD,
    EUR,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::MXN, Currency::USD, Currency::EUR];

    pub fn code(&self) -> &'static str {
        match self {
            Self::MXN => "MXN",
            Self::USD => "USD",
            Self::EUR => "EUR",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::EUR => "€",
            _ => "$",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::MXN => 0,
            Self::USD => 1,
            Self::EUR => 2,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::MXN
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = CxpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MXN" => Ok(Self::MXN),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            _ => Err(CxpError::UnknownCurrency(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InvoiceType {
    #[default]
    Factura,
    NotaCredito,
    Anticipo,
}

impl InvoiceType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Factura => "Factura",
            Self::NotaCredito => "NotaCredito",
            Self::Anticipo => "Anticipo",
        }
    }
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InvoiceType {
    type Err = CxpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .trim()
            .to_lowercase()
            .replace('é', "e")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        match norm.as_str() {
            "factura" => Ok(Self::Factura),
            "notacredito" | "notadecredito" => Ok(Self::NotaCredito),
            "anticipo" => Ok(Self::Anticipo),
            _ => Err(CxpError::UnknownInvoiceType(s.to_string())),
        }
    }
}

/// Stored invoice status. Settable by hand, but payment edits re-derive
/// `Pagado`/`Parcial` (see [`Invoice::apply_payment_rule`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Pendiente,
    Pagado,
    Vencido,
    Parcial,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Pendiente, Status::Pagado, Status::Vencido, Status::Parcial];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pendiente => "Pendiente",
            Self::Pagado => "Pagado",
            Self::Vencido => "Vencido",
            Self::Parcial => "Parcial",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = CxpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|st| st.label().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| CxpError::UnknownStatus(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Invoice
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Invoice {
    pub id: String,
    pub tipo: InvoiceType,
    pub fecha: String,
    pub serie: String,
    pub folio: String,
    pub uuid: String,
    pub proveedor: String,
    pub clasificacion: String,
    #[serde(deserialize_with = "lenient_amount")]
    pub subtotal: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub iva: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub ret_isr: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub ret_iva: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub total: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub monto_pagado: f64,
    pub concepto: String,
    #[serde(deserialize_with = "lenient_days")]
    pub dias_credito: i64,
    #[serde(deserialize_with = "empty_as_none")]
    pub vencimiento: Option<String>,
    pub estatus: Status,
    #[serde(deserialize_with = "empty_as_none")]
    pub fecha_programacion: Option<String>,
    #[serde(deserialize_with = "lenient_days")]
    pub dias_ficticios: i64,
    pub referencia: String,
    pub notas: String,
    pub vo_bo: bool,
    pub autorizado_direccion: bool,
}

impl Invoice {
    /// `serie` + `folio`, trimmed. Empty means "no folio".
    pub fn folio_key(&self) -> String {
        format!("{}{}", self.serie, self.folio).trim().to_string()
    }

    /// `total - monto_pagado`, never NaN. May be negative for overpaid invoices.
    pub fn outstanding(&self) -> f64 {
        amount(self.total) - amount(self.monto_pagado)
    }

    /// Unpaid and with a positive balance: the working set of aging and projection.
    pub fn is_pending(&self) -> bool {
        self.estatus != Status::Pagado && self.outstanding() > 0.0
    }

    pub fn due_date(&self) -> Option<&str> {
        non_empty(&self.vencimiento)
    }

    pub fn scheduled_date(&self) -> Option<&str> {
        non_empty(&self.fecha_programacion)
    }

    /// Scheduled payment date, falling back to the due date.
    pub fn effective_payment_date(&self) -> Option<&str> {
        self.scheduled_date().or_else(|| self.due_date())
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        let today = today.format("%Y-%m-%d").to_string();
        match self.due_date() {
            Some(due) => self.estatus != Status::Pagado && due < today.as_str(),
            None => false,
        }
    }

    /// Auto-status from the paid amount: fully paid → `Pagado`, partially → `Parcial`.
    /// Any other combination keeps the current status.
    pub fn apply_payment_rule(&mut self) {
        let total = amount(self.total);
        let paid = amount(self.monto_pagado);
        if paid >= total && total > 0.0 {
            self.estatus = Status::Pagado;
        } else if paid > 0.0 && paid < total {
            self.estatus = Status::Parcial;
        }
    }

    /// Lowercased JSON rendering of every field, used for free-text search.
    pub fn search_blob(&self) -> String {
        serde_json::to_string(self).unwrap_or_default().to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// Supplier
// ---------------------------------------------------------------------------

/// Referenced from invoices by `nombre` only; renaming does not cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Supplier {
    pub id: String,
    pub nombre: String,
    pub rfc: String,
    pub moneda: Currency,
    pub dias_credito: i64,
    pub contacto: String,
    pub telefono: String,
    pub email: String,
    pub banco: String,
    pub clabe: String,
    pub clasificacion: String,
    pub activo: bool,
}

impl Default for Supplier {
    fn default() -> Self {
        Self {
            id: String::new(),
            nombre: String::new(),
            rfc: String::new(),
            moneda: Currency::MXN,
            dias_credito: 30,
            contacto: String::new(),
            telefono: String::new(),
            email: String::new(),
            banco: String::new(),
            clabe: String::new(),
            clasificacion: "Otros".to_string(),
            activo: true,
        }
    }
}

pub fn find_supplier<'a>(suppliers: &'a [Supplier], nombre: &str) -> Option<&'a Supplier> {
    suppliers.iter().find(|s| s.nombre == nombre)
}

pub fn find_supplier_ignore_case<'a>(suppliers: &'a [Supplier], nombre: &str) -> Option<&'a Supplier> {
    let upper = nombre.to_uppercase();
    suppliers.iter().find(|s| s.nombre.to_uppercase() == upper)
}

// ---------------------------------------------------------------------------
// Numeric and date helpers
// ---------------------------------------------------------------------------

/// Maps NaN and infinities to zero.
pub fn amount(val: f64) -> f64 {
    if val.is_finite() {
        val
    } else {
        0.0
    }
}

/// Parse a money string, stripping `$`, `€`, thousands separators, quotes and
/// whitespace. Anything unparseable is zero.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | ',' | '"') && !c.is_whitespace())
        .collect();
    if let Some(inner) = cleaned.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return -amount(inner.parse().unwrap_or(0.0));
    }
    amount(cleaned.parse().unwrap_or(0.0))
}

pub fn round2(val: f64) -> f64 {
    (amount(val) * 100.0).round() / 100.0
}

pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub fn add_days(date: &str, days: i64) -> Option<String> {
    let d = parse_iso_date(date)?;
    let shifted = d.checked_add_signed(chrono::Duration::try_days(days)?)?;
    Some(shifted.format("%Y-%m-%d").to_string())
}

fn non_empty(val: &Option<String>) -> Option<&str> {
    val.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Num(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawNumber {
    fn value(self) -> f64 {
        match self {
            Self::Num(n) => amount(n),
            Self::Text(s) => parse_amount(&s),
            Self::Other(_) => 0.0,
        }
    }
}

fn lenient_amount<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(RawNumber::deserialize(d)?.value())
}

fn lenient_days<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(RawNumber::deserialize(d)?.value().trunc() as i64)
}

fn empty_as_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn invoice(id: &str, proveedor: &str, total: f64) -> Invoice {
        Invoice {
            id: id.to_string(),
            fecha: "2026-01-07".to_string(),
            proveedor: proveedor.to_string(),
            clasificacion: "Gastos Fijos".to_string(),
            subtotal: total,
            total,
            dias_credito: 30,
            ..Default::default()
        }
    }

    #[test]
    fn test_folio_key_is_trimmed_concatenation() {
        let mut inv = invoice("i1", "X", 10.0);
        inv.serie = " A".to_string();
        inv.folio = "3200 ".to_string();
        assert_eq!(inv.folio_key(), "A3200");
        inv.serie.clear();
        inv.folio = "   ".to_string();
        assert_eq!(inv.folio_key(), "");
    }

    #[test]
    fn test_outstanding_never_nan() {
        let mut inv = invoice("i1", "X", f64::NAN);
        inv.monto_pagado = 5.0;
        assert_eq!(inv.outstanding(), -5.0);
        inv.total = 100.0;
        inv.monto_pagado = f64::INFINITY;
        assert_eq!(inv.outstanding(), 100.0);
    }

    #[test]
    fn test_effective_payment_date_prefers_schedule() {
        let mut inv = invoice("i1", "X", 10.0);
        inv.vencimiento = Some("2026-03-01".to_string());
        assert_eq!(inv.effective_payment_date(), Some("2026-03-01"));
        inv.fecha_programacion = Some("2026-02-20".to_string());
        assert_eq!(inv.effective_payment_date(), Some("2026-02-20"));
        inv.fecha_programacion = Some("  ".to_string());
        assert_eq!(inv.effective_payment_date(), Some("2026-03-01"));
        inv.vencimiento = None;
        assert_eq!(inv.effective_payment_date(), None);
    }

    #[test]
    fn test_payment_rule() {
        let mut inv = invoice("i1", "X", 100.0);
        inv.monto_pagado = 40.0;
        inv.apply_payment_rule();
        assert_eq!(inv.estatus, Status::Parcial);
        inv.monto_pagado = 100.0;
        inv.apply_payment_rule();
        assert_eq!(inv.estatus, Status::Pagado);

        let mut zero = invoice("i2", "X", 0.0);
        zero.estatus = Status::Vencido;
        zero.apply_payment_rule();
        assert_eq!(zero.estatus, Status::Vencido);
    }

    #[test]
    fn test_is_overdue() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let mut inv = invoice("i1", "X", 10.0);
        assert!(!inv.is_overdue(today));
        inv.vencimiento = Some("2026-02-09".to_string());
        assert!(inv.is_overdue(today));
        inv.vencimiento = Some("2026-02-10".to_string());
        assert!(!inv.is_overdue(today));
        inv.vencimiento = Some("2026-01-01".to_string());
        inv.estatus = Status::Pagado;
        assert!(!inv.is_overdue(today));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,234.56"), 1234.56);
        assert_eq!(parse_amount("€ 50"), 50.0);
        assert_eq!(parse_amount("(20.00)"), -20.0);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount("NaN"), 0.0);
        assert_eq!(parse_amount(""), 0.0);
    }

    #[test]
    fn test_round2_and_add_days() {
        assert_eq!(round2(6400.0 + 1024.0), 7424.0);
        assert_eq!(round2(0.1 + 0.2), 0.3);
        assert_eq!(add_days("2026-01-07", 30).as_deref(), Some("2026-02-06"));
        assert_eq!(add_days("2026-01-07", 0).as_deref(), Some("2026-01-07"));
        assert_eq!(add_days("", 30), None);
        assert_eq!(add_days("2026-01-07", i64::MAX), None);
        assert_eq!(add_days("2026-01-07", i64::MIN), None);
        assert_eq!(add_days("2026-01-07", 1e300 as i64), None);
    }

    #[test]
    fn test_lenient_deserialization() {
        let json = r#"{
            "id": "i1", "fecha": "2026-01-07", "proveedor": "X",
            "subtotal": "6,400.00", "iva": null, "total": "oops",
            "montoPagado": 12.5, "diasCredito": "30",
            "vencimiento": "", "fechaProgramacion": "2026-02-01",
            "estatus": "Parcial"
        }"#;
        let inv: Invoice = serde_json::from_str(json).unwrap();
        assert_eq!(inv.subtotal, 6400.0);
        assert_eq!(inv.iva, 0.0);
        assert_eq!(inv.total, 0.0);
        assert_eq!(inv.monto_pagado, 12.5);
        assert_eq!(inv.dias_credito, 30);
        assert_eq!(inv.vencimiento, None);
        assert_eq!(inv.scheduled_date(), Some("2026-02-01"));
        assert_eq!(inv.estatus, Status::Parcial);
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::USD);
        assert!("GBP".parse::<Currency>().is_err());
        assert_eq!("pagado".parse::<Status>().unwrap(), Status::Pagado);
        assert!("Cancelado".parse::<Status>().is_err());
        assert_eq!("Nota de Crédito".parse::<InvoiceType>().unwrap(), InvoiceType::NotaCredito);
    }

    #[test]
    fn test_search_blob_covers_all_fields() {
        let mut inv = invoice("i1", "Eduardo Velazquez", 7424.0);
        inv.notas = "Pagar con Transferencia".to_string();
        let blob = inv.search_blob();
        assert!(blob.contains("eduardo velazquez"));
        assert!(blob.contains("pagar con transferencia"));
        assert!(blob.contains("7424"));
    }

    #[test]
    fn test_supplier_lookup() {
        let sups = vec![Supplier {
            nombre: "TECH SUPPLIES SA".to_string(),
            ..Default::default()
        }];
        assert!(find_supplier(&sups, "TECH SUPPLIES SA").is_some());
        assert!(find_supplier(&sups, "tech supplies sa").is_none());
        assert!(find_supplier_ignore_case(&sups, "tech supplies sa").is_some());
    }
}
