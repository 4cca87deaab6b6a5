use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};

use crate::db::{list_suppliers, load_store, upsert_invoices, upsert_suppliers};
use crate::duplicates::DuplicateIndex;
use crate::error::{CxpError, Result};
use crate::models::{add_days, find_supplier_ignore_case, parse_amount, round2, Currency, Invoice, Supplier};
use crate::settings::Settings;
use crate::store::{new_id, InvoiceStore};

pub const UNKNOWN_SUPPLIER: &str = "SIN PROVEEDOR";

// ---------------------------------------------------------------------------
// Sheet cells
// ---------------------------------------------------------------------------

/// One spreadsheet cell, reduced to what the importer cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetCell {
    Empty,
    Text(String),
    Number(f64),
}

impl SheetCell {
    fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            Self::Number(n) => *n == 0.0,
        }
    }

    /// Whole numbers render without a fractional part, so a numeric folio
    /// `3200` reads back as "3200".
    pub fn text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
        }
    }

    pub fn number(&self) -> f64 {
        match self {
            Self::Empty => 0.0,
            Self::Text(s) => parse_amount(s),
            Self::Number(n) => crate::models::amount(*n),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn excel_serial_to_date(serial: f64) -> Option<String> {
    if !serial.is_finite() {
        return None;
    }
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = base.checked_add_signed(chrono::Duration::try_days(serial.round() as i64)?)?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn dmy_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2})[/\-](\d{1,2})[/\-](\d{2,4})").ok())
        .as_ref()
}

fn iso_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").ok()).as_ref()
}

/// Normalise a sheet date to `YYYY-MM-DD`. Day-first for slashed dates; two
/// digit years are 20xx. Unrecognised text passes through unchanged.
pub fn parse_sheet_date(cell: &SheetCell) -> String {
    match cell {
        SheetCell::Empty => String::new(),
        SheetCell::Number(n) if *n == 0.0 => String::new(),
        SheetCell::Number(n) => excel_serial_to_date(*n).unwrap_or_default(),
        SheetCell::Text(raw) => {
            let raw = raw.trim();
            if let Some(c) = iso_pattern().and_then(|re| re.captures(raw)) {
                return format!("{}-{}-{}", &c[1], &c[2], &c[3]);
            }
            if let Some(c) = dmy_pattern().and_then(|re| re.captures(raw)) {
                let year = if c[3].len() == 2 {
                    format!("20{}", &c[3])
                } else {
                    c[3].to_string()
                };
                return format!("{year}-{:0>2}-{:0>2}", &c[2], &c[1]);
            }
            raw.to_string()
        }
    }
}

/// Column positions resolved once from the header row.
struct Columns {
    headers: Vec<String>,
}

impl Columns {
    fn new(header_row: &[SheetCell]) -> Self {
        Self {
            headers: header_row.iter().map(|c| c.text().trim().to_uppercase()).collect(),
        }
    }

    /// First cell whose header contains one of `keys` (tried in order) and
    /// none of `exclude`.
    fn get<'r>(&self, row: &'r [SheetCell], keys: &[&str], exclude: &[&str]) -> Option<&'r SheetCell> {
        for key in keys {
            let idx = self
                .headers
                .iter()
                .position(|h| h.contains(key) && !exclude.iter().any(|ex| h.contains(ex)));
            if let Some(cell) = idx.and_then(|i| row.get(i)) {
                return Some(cell);
            }
        }
        None
    }

    fn text(&self, row: &[SheetCell], keys: &[&str]) -> String {
        self.get(row, keys, &[]).map(SheetCell::text).unwrap_or_default()
    }

    fn number(&self, row: &[SheetCell], keys: &[&str], exclude: &[&str]) -> f64 {
        self.get(row, keys, exclude).map(SheetCell::number).unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

fn read_csv_rows(file_path: &Path) -> Result<Vec<Vec<SheetCell>>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|v| {
                    let v = v.trim();
                    if v.is_empty() {
                        SheetCell::Empty
                    } else {
                        SheetCell::Text(v.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(rows)
}

#[cfg(feature = "xlsx")]
fn read_workbook_rows(file_path: &Path) -> Result<Vec<Vec<SheetCell>>> {
    use calamine::{Data, Reader};

    let mut workbook = calamine::open_workbook_auto(file_path)
        .map_err(|e| CxpError::Import(format!("Failed to open workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CxpError::Import("Workbook has no sheets".to_string()))?
        .map_err(|e| CxpError::Import(format!("Failed to read first sheet: {e}")))?;

    Ok(range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty | Data::Error(_) => SheetCell::Empty,
                    Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => SheetCell::Text(s.clone()),
                    Data::Float(f) => SheetCell::Number(*f),
                    Data::Int(i) => SheetCell::Number(*i as f64),
                    Data::Bool(b) => SheetCell::Text(b.to_string()),
                    Data::DateTime(dt) => SheetCell::Number(dt.as_f64()),
                })
                .collect()
        })
        .collect())
}

#[cfg(not(feature = "xlsx"))]
fn read_workbook_rows(file_path: &Path) -> Result<Vec<Vec<SheetCell>>> {
    Err(CxpError::Import(format!(
        "{} is a workbook; rebuild with the `xlsx` feature or export it as CSV",
        file_path.display()
    )))
}

/// Rows of the first sheet, whatever the file type.
pub fn read_rows(file_path: &Path) -> Result<Vec<Vec<SheetCell>>> {
    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "csv" | "txt" => read_csv_rows(file_path),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook_rows(file_path),
        _ => Err(CxpError::Import(format!("Unsupported file type: {}", file_path.display()))),
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// A row skipped because it matches an existing invoice or an earlier row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub serie: String,
    pub folio: String,
    pub proveedor: String,
    pub total: f64,
    pub fecha: String,
}

/// What an import would write, computed without touching the database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportPlan {
    pub invoices: Vec<(Currency, Invoice)>,
    pub new_suppliers: Vec<Supplier>,
    pub duplicates: Vec<SkippedRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    pub suppliers_created: usize,
    pub duplicates: Vec<SkippedRow>,
}

pub fn plan_import(
    rows: &[Vec<SheetCell>],
    store: &InvoiceStore,
    suppliers: &[Supplier],
    settings: &Settings,
) -> ImportPlan {
    let mut plan = ImportPlan::default();
    if rows.is_empty() {
        return plan;
    }

    let header_idx = rows
        .iter()
        .position(|r| r.iter().any(|c| c.text().to_uppercase().contains("UUID")))
        .unwrap_or(0);
    let cols = Columns::new(&rows[header_idx]);

    let mut index = DuplicateIndex::from_invoices(store.iter().map(|(_, inv)| inv));

    for row in rows[header_idx + 1..].iter().filter(|r| r.iter().any(|c| !c.is_blank())) {
        let fecha = cols.get(row, &["FECHA"], &[]).map(parse_sheet_date).unwrap_or_default();
        let proveedor = cols.text(row, &["PROVEEDOR", "RAZON SOCIAL", "NOMBRE", "EMISOR"]).trim().to_string();
        let subtotal = cols.number(row, &["SUBTOTAL"], &[]);
        let iva = cols.number(row, &["IVA"], &["RETIVA", "RET IVA", "RET. IVA"]);
        let raw_total = cols.number(row, &["TOTAL"], &["SUBTOTAL", "SUB TOTAL", "SUB-TOTAL"]);
        let iva_fallback = if iva != 0.0 { iva } else { subtotal * settings.iva_rate };
        let total = if raw_total > 0.0 { raw_total } else { subtotal + iva_fallback };
        let iva = if iva > 0.0 { iva } else { round2(subtotal * settings.iva_rate) };
        let serie = cols.text(row, &["SERIE"]);
        let folio = cols.text(row, &["FOLIO"]);
        let uuid = cols.text(row, &["UUID"]).trim().to_string();

        let folio_key = format!("{serie}{folio}");
        if index.contains(&uuid, &folio_key, &proveedor) {
            debug!(%serie, %folio, %proveedor, "skipping duplicate row");
            plan.duplicates.push(SkippedRow {
                serie,
                folio,
                proveedor,
                total,
                fecha,
            });
            continue;
        }
        index.insert(&uuid, &folio_key, &proveedor);

        let known = find_supplier_ignore_case(suppliers, &proveedor)
            .or_else(|| find_supplier_ignore_case(&plan.new_suppliers, &proveedor))
            .cloned();
        let supplier = match known {
            Some(s) => Some(s),
            None if !proveedor.is_empty() => {
                let created = Supplier {
                    id: new_id(),
                    nombre: proveedor.clone(),
                    ..Default::default()
                };
                plan.new_suppliers.push(created.clone());
                Some(created)
            }
            None => None,
        };

        let currency = supplier.as_ref().map(|s| s.moneda).unwrap_or_default();
        let dias_credito = supplier
            .as_ref()
            .map(|s| s.dias_credito)
            .filter(|d| *d > 0)
            .unwrap_or(settings.default_credit_days);
        let clasificacion = supplier
            .as_ref()
            .map(|s| s.clasificacion.clone())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "Otros".to_string());

        let invoice = Invoice {
            id: new_id(),
            tipo: cols.text(row, &["TIPO"]).parse().unwrap_or_default(),
            vencimiento: add_days(&fecha, dias_credito),
            fecha,
            serie,
            folio,
            uuid,
            proveedor: if proveedor.is_empty() {
                UNKNOWN_SUPPLIER.to_string()
            } else {
                proveedor
            },
            clasificacion,
            subtotal,
            iva,
            total,
            dias_credito,
            ..Default::default()
        };
        plan.invoices.push((currency, invoice));
    }

    plan
}

/// Import the first sheet of `file_path` into the database.
pub fn import_file(conn: &mut Connection, file_path: &Path, settings: &Settings) -> Result<ImportResult> {
    let rows = read_rows(file_path)?;
    let store = load_store(conn)?;
    let suppliers = list_suppliers(conn)?;
    let plan = plan_import(&rows, &store, &suppliers, settings);

    if !plan.new_suppliers.is_empty() {
        upsert_suppliers(conn, &plan.new_suppliers)?;
    }
    let imported = upsert_invoices(conn, plan.invoices.iter().map(|(c, inv)| (*c, inv)))?;

    info!(
        file = %file_path.display(),
        imported,
        suppliers = plan.new_suppliers.len(),
        duplicates = plan.duplicates.len(),
        "import finished"
    );
    Ok(ImportResult {
        imported,
        suppliers_created: plan.new_suppliers.len(),
        duplicates: plan.duplicates,
    })
}
