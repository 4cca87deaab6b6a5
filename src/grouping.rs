use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CxpError, Result};
use crate::models::{amount, Invoice};

/// Group label used when an invoice has no value for the grouping field.
pub const EMPTY_GROUP: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupField {
    Proveedor,
    Clasificacion,
    Estatus,
    /// `YYYY-MM` of the issue date.
    Mes,
}

impl GroupField {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Proveedor => "proveedor",
            Self::Clasificacion => "clasificacion",
            Self::Estatus => "estatus",
            Self::Mes => "mes",
        }
    }

    pub fn key_of(&self, invoice: &Invoice) -> String {
        let raw = match self {
            Self::Proveedor => invoice.proveedor.trim(),
            Self::Clasificacion => invoice.clasificacion.trim(),
            Self::Estatus => invoice.estatus.label(),
            Self::Mes => month_prefix(invoice.fecha.trim()),
        };
        if raw.is_empty() {
            EMPTY_GROUP.to_string()
        } else {
            raw.to_string()
        }
    }
}

/// First seven characters (`YYYY-MM`), or the whole value when shorter.
fn month_prefix(fecha: &str) -> &str {
    match fecha.char_indices().nth(7) {
        Some((end, _)) => &fecha[..end],
        None => fecha,
    }
}

impl fmt::Display for GroupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GroupField {
    type Err = CxpError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "proveedor" => Ok(Self::Proveedor),
            "clasificacion" | "clasificación" => Ok(Self::Clasificacion),
            "estatus" => Ok(Self::Estatus),
            "mes" => Ok(Self::Mes),
            _ => Err(CxpError::UnknownGroupField(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subgroup<'a> {
    pub key: String,
    pub invoices: Vec<&'a Invoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GroupBody<'a> {
    Invoices(Vec<&'a Invoice>),
    Subgroups(Vec<Subgroup<'a>>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group<'a> {
    pub key: String,
    pub body: GroupBody<'a>,
}

impl<'a> Group<'a> {
    /// Members in insertion order, flattening subgroups.
    pub fn invoices(&self) -> Vec<&'a Invoice> {
        match &self.body {
            GroupBody::Invoices(list) => list.clone(),
            GroupBody::Subgroups(subs) => subs.iter().flat_map(|s| s.invoices.iter().copied()).collect(),
        }
    }

    pub fn count(&self) -> usize {
        match &self.body {
            GroupBody::Invoices(list) => list.len(),
            GroupBody::Subgroups(subs) => subs.iter().map(|s| s.invoices.len()).sum(),
        }
    }

    pub fn total(&self) -> f64 {
        sum_total(&self.invoices())
    }

    pub fn balance(&self) -> f64 {
        sum_balance(&self.invoices())
    }
}

impl Subgroup<'_> {
    pub fn count(&self) -> usize {
        self.invoices.len()
    }

    pub fn total(&self) -> f64 {
        sum_total(&self.invoices)
    }

    pub fn balance(&self) -> f64 {
        sum_balance(&self.invoices)
    }
}

fn sum_total(invoices: &[&Invoice]) -> f64 {
    invoices.iter().map(|i| amount(i.total)).sum()
}

fn sum_balance(invoices: &[&Invoice]) -> f64 {
    invoices.iter().map(|i| i.outstanding()).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTree<'a> {
    pub primary: GroupField,
    pub secondary: Option<GroupField>,
    /// Groups in order of first occurrence of their key.
    pub groups: Vec<Group<'a>>,
}

impl<'a> GroupTree<'a> {
    pub fn group(&self, key: &str) -> Option<&Group<'a>> {
        self.groups.iter().find(|g| g.key == key)
    }
}

/// Partition `invoices` by `primary`, and within each group by `secondary`
/// when given. Nothing is dropped: empty keys map to [`EMPTY_GROUP`].
pub fn group_invoices<'a, I>(invoices: I, primary: GroupField, secondary: Option<GroupField>) -> Result<GroupTree<'a>>
where
    I: IntoIterator<Item = &'a Invoice>,
{
    if secondary == Some(primary) {
        return Err(CxpError::InvalidGrouping(format!(
            "secondary key must differ from primary ({primary})"
        )));
    }

    let mut groups: Vec<Group<'a>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut sub_index: Vec<HashMap<String, usize>> = Vec::new();

    for invoice in invoices {
        let k1 = primary.key_of(invoice);
        let g = *index.entry(k1.clone()).or_insert_with(|| {
            groups.push(Group {
                key: k1,
                body: match secondary {
                    Some(_) => GroupBody::Subgroups(Vec::new()),
                    None => GroupBody::Invoices(Vec::new()),
                },
            });
            sub_index.push(HashMap::new());
            groups.len() - 1
        });

        match (secondary, &mut groups[g].body) {
            (None, GroupBody::Invoices(list)) => list.push(invoice),
            (Some(field), GroupBody::Subgroups(subs)) => {
                let k2 = field.key_of(invoice);
                let s = *sub_index[g].entry(k2.clone()).or_insert_with(|| {
                    subs.push(Subgroup {
                        key: k2,
                        invoices: Vec::new(),
                    });
                    subs.len() - 1
                });
                subs[s].invoices.push(invoice);
            }
            // The body shape is fixed by `secondary` when the group is created.
            (None, GroupBody::Subgroups(_)) | (Some(_), GroupBody::Invoices(_)) => {}
        }
    }

    Ok(GroupTree {
        primary,
        secondary,
        groups,
    })
}
