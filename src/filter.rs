//! The boolean predicate shared by the Cartera and Dashboard views.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::models::{Invoice, Status};

/// Active filters are ANDed. Empty strings count as "not set".
///
/// Deserialization rejects unknown keys, so a misspelled filter is an error
/// rather than a silently ignored constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FilterSpec {
    #[serde(default)]
    pub proveedor: Option<String>,
    #[serde(default)]
    pub clasificacion: Option<String>,
    #[serde(default, deserialize_with = "blank_status")]
    pub estatus: Option<Status>,
    /// Inclusive lower bound on `fecha`.
    #[serde(default)]
    pub fecha_from: Option<String>,
    /// Inclusive upper bound on `fecha`.
    #[serde(default)]
    pub fecha_to: Option<String>,
    /// Inclusive lower bound on the scheduled payment date.
    #[serde(default)]
    pub pago_from: Option<String>,
    /// Inclusive upper bound on the scheduled payment date.
    #[serde(default)]
    pub pago_to: Option<String>,
    #[serde(default)]
    pub search_text: Option<String>,
}

impl FilterSpec {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn is_empty(&self) -> bool {
        active(&self.proveedor).is_none()
            && active(&self.clasificacion).is_none()
            && self.estatus.is_none()
            && active(&self.fecha_from).is_none()
            && active(&self.fecha_to).is_none()
            && active(&self.pago_from).is_none()
            && active(&self.pago_to).is_none()
            && active(&self.search_text).is_none()
    }
}

/// `""` (or whitespace) is "any status"; other unknown labels are errors.
fn blank_status<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<Status>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(label) => label.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn active(val: &Option<String>) -> Option<&str> {
    val.as_deref().filter(|s| !s.trim().is_empty())
}

pub fn matches_filter(invoice: &Invoice, filter: &FilterSpec) -> bool {
    if let Some(p) = active(&filter.proveedor) {
        if invoice.proveedor != p {
            return false;
        }
    }
    if let Some(c) = active(&filter.clasificacion) {
        if invoice.clasificacion != c {
            return false;
        }
    }
    if let Some(s) = filter.estatus {
        if invoice.estatus != s {
            return false;
        }
    }
    if let Some(from) = active(&filter.fecha_from) {
        if invoice.fecha.as_str() < from {
            return false;
        }
    }
    if let Some(to) = active(&filter.fecha_to) {
        if invoice.fecha.as_str() > to {
            return false;
        }
    }

    // A payment-date bound only matches explicitly scheduled invoices; there is
    // no fallback to the due date here.
    let pago_from = active(&filter.pago_from);
    let pago_to = active(&filter.pago_to);
    if pago_from.is_some() || pago_to.is_some() {
        let Some(scheduled) = invoice.scheduled_date() else {
            return false;
        };
        if pago_from.is_some_and(|from| scheduled < from) {
            return false;
        }
        if pago_to.is_some_and(|to| scheduled > to) {
            return false;
        }
    }

    if let Some(q) = active(&filter.search_text) {
        if !invoice.search_blob().contains(&q.to_lowercase()) {
            return false;
        }
    }
    true
}

pub fn filter_invoices<'a, I>(invoices: I, filter: &FilterSpec) -> Vec<&'a Invoice>
where
    I: IntoIterator<Item = &'a Invoice>,
{
    invoices
        .into_iter()
        .filter(|inv| matches_filter(inv, filter))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::invoice;

    fn sample() -> Vec<Invoice> {
        let mut a = invoice("i1", "EDUARDO VELAZQUEZ", 7424.0);
        a.fecha = "2026-01-07".to_string();
        a.fecha_programacion = Some("2026-02-10".to_string());
        let mut b = invoice("i2", "EDUARDO VELAZQUEZ", 13920.0);
        b.fecha = "2026-01-15".to_string();
        b.clasificacion = "Circuitos".to_string();
        b.estatus = Status::Vencido;
        let mut c = invoice("i3", "TECH SUPPLIES SA", 5000.0);
        c.fecha = "2026-01-20".to_string();
        c.concepto = "Tarjetas de red".to_string();
        c.fecha_programacion = Some("2026-03-01".to_string());
        vec![a, b, c]
    }

    fn ids(list: &[&Invoice]) -> Vec<String> {
        list.iter().map(|i| i.id.clone()).collect()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let invs = sample();
        let spec = FilterSpec {
            proveedor: Some(String::new()),
            ..Default::default()
        };
        assert!(spec.is_empty());
        assert_eq!(filter_invoices(&invs, &spec).len(), 3);
    }

    #[test]
    fn test_scalar_filters_are_exact_and_anded() {
        let invs = sample();
        let spec = FilterSpec {
            proveedor: Some("EDUARDO VELAZQUEZ".to_string()),
            estatus: Some(Status::Vencido),
            ..Default::default()
        };
        assert_eq!(ids(&filter_invoices(&invs, &spec)), vec!["i2"]);

        let partial = FilterSpec {
            proveedor: Some("EDUARDO".to_string()),
            ..Default::default()
        };
        assert!(filter_invoices(&invs, &partial).is_empty());
    }

    #[test]
    fn test_fecha_bounds_are_inclusive() {
        let invs = sample();
        let spec = FilterSpec {
            fecha_from: Some("2026-01-15".to_string()),
            fecha_to: Some("2026-01-20".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter_invoices(&invs, &spec)), vec!["i2", "i3"]);
    }

    #[test]
    fn test_pago_bound_excludes_unscheduled() {
        let invs = sample();
        let spec = FilterSpec {
            pago_from: Some("2026-01-01".to_string()),
            ..Default::default()
        };
        // i2 has a due date but no scheduled date
        assert_eq!(ids(&filter_invoices(&invs, &spec)), vec!["i1", "i3"]);

        let upper = FilterSpec {
            pago_to: Some("2026-02-28".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter_invoices(&invs, &upper)), vec!["i1"]);
    }

    #[test]
    fn test_search_is_case_insensitive_over_whole_record() {
        let invs = sample();
        let spec = FilterSpec {
            search_text: Some("TARJETAS".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter_invoices(&invs, &spec)), vec!["i3"]);

        let by_amount = FilterSpec {
            search_text: Some("13920".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter_invoices(&invs, &by_amount)), vec!["i2"]);
    }

    #[test]
    fn test_from_json_rejects_unknown_keys() {
        let spec = FilterSpec::from_json(r#"{"proveedor": "X", "pagoTo": "2026-01-31"}"#).unwrap();
        assert_eq!(spec.pago_to.as_deref(), Some("2026-01-31"));
        assert!(FilterSpec::from_json(r#"{"provider": "X"}"#).is_err());
        assert!(FilterSpec::from_json(r#"{"estatus": "Cancelado"}"#).is_err());
    }

    #[test]
    fn test_blank_filter_object_matches_everything() {
        let spec = FilterSpec::from_json(
            r#"{"proveedor": "", "clasificacion": "", "estatus": "", "fechaFrom": "",
                "fechaTo": "", "pagoFrom": "", "pagoTo": "", "searchText": ""}"#,
        )
        .unwrap();
        assert!(spec.is_empty());
        assert_eq!(spec.estatus, None);
        let invs = sample();
        assert_eq!(filter_invoices(&invs, &spec).len(), invs.len());

        let spec = FilterSpec::from_json(r#"{"estatus": "Pagado"}"#).unwrap();
        assert_eq!(spec.estatus, Some(Status::Pagado));
        assert!(FilterSpec::from_json(r#"{"estatus": null}"#).unwrap().is_empty());
    }
}
