use colored::Colorize;
use comfy_table::{Cell, Table};
use tracing::info;

use cxp::db::{delete_invoice, list_suppliers, load_store, relocate_invoice, upsert_invoice};
use cxp::duplicates::{find_duplicates, DuplicateReport};
use cxp::error::Result;
use cxp::filter::{filter_invoices, FilterSpec};
use cxp::fmt::{money_in, short_date};
use cxp::grouping::{group_invoices, GroupBody, GroupField};
use cxp::models::{find_supplier, Currency, Invoice, InvoiceType, Status};
use cxp::store::{BulkEdit, InvoiceDraft, InvoiceEdit};

use super::{check_date, locate, open_db, parse_currency, AddArgs};

pub(crate) fn status_cell(status: Status) -> Cell {
    let label = status.label();
    Cell::new(match status {
        Status::Pagado => label.green().to_string(),
        Status::Vencido => label.red().to_string(),
        Status::Parcial => label.yellow().to_string(),
        Status::Pendiente => label.to_string(),
    })
}

fn invoice_row(inv: &Invoice, currency: Currency, dups: &DuplicateReport) -> Vec<Cell> {
    let folio = inv.folio_key();
    let folio = if dups.is_flagged(&inv.id) {
        format!("{folio} !").red().bold().to_string()
    } else {
        folio
    };
    vec![
        Cell::new(&inv.id),
        Cell::new(short_date(Some(inv.fecha.as_str()))),
        Cell::new(folio),
        Cell::new(&inv.proveedor),
        Cell::new(&inv.clasificacion),
        Cell::new(money_in(inv.total, currency)),
        Cell::new(money_in(inv.monto_pagado, currency)),
        Cell::new(money_in(inv.outstanding(), currency)),
        Cell::new(short_date(inv.due_date())),
        Cell::new(short_date(inv.scheduled_date())),
        status_cell(inv.estatus),
        Cell::new(if inv.vo_bo { "✓" } else { "" }),
    ]
}

fn header_row(label: String, count: usize, total: f64, balance: f64, currency: Currency) -> Vec<Cell> {
    vec![
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(label.bold()),
        Cell::new(format!("{count} facturas")),
        Cell::new(money_in(total, currency).bold()),
        Cell::new(""),
        Cell::new(money_in(balance, currency).bold()),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
    ]
}

pub struct ListArgs {
    pub currency: Option<String>,
    pub filter: Option<String>,
    pub proveedor: Option<String>,
    pub clasificacion: Option<String>,
    pub estatus: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub pago_from: Option<String>,
    pub pago_to: Option<String>,
    pub search: Option<String>,
    pub group_by: Option<String>,
    pub then_by: Option<String>,
}

impl ListArgs {
    /// JSON filter first, then any explicit flag on top of it.
    fn filter_spec(self) -> Result<FilterSpec> {
        let mut spec = match &self.filter {
            Some(raw) => FilterSpec::from_json(raw)?,
            None => FilterSpec::default(),
        };
        if self.proveedor.is_some() {
            spec.proveedor = self.proveedor;
        }
        if self.clasificacion.is_some() {
            spec.clasificacion = self.clasificacion;
        }
        if let Some(s) = self.estatus {
            spec.estatus = Some(s.parse()?);
        }
        if let Some(d) = check_date(self.from)? {
            spec.fecha_from = Some(d);
        }
        if let Some(d) = check_date(self.to)? {
            spec.fecha_to = Some(d);
        }
        if let Some(d) = check_date(self.pago_from)? {
            spec.pago_from = Some(d);
        }
        if let Some(d) = check_date(self.pago_to)? {
            spec.pago_to = Some(d);
        }
        if self.search.is_some() {
            spec.search_text = self.search;
        }
        Ok(spec)
    }
}

pub fn list(args: ListArgs) -> Result<()> {
    let (settings, conn) = open_db()?;
    let store = load_store(&conn)?;
    let currency = parse_currency(args.currency.as_deref(), settings.default_currency)?;
    let primary = args.group_by.as_deref().map(str::parse::<GroupField>).transpose()?;
    let secondary = args.then_by.as_deref().map(str::parse::<GroupField>).transpose()?;
    let spec = args.filter_spec()?;

    let dups = find_duplicates(store.iter());
    let visible = filter_invoices(store.bucket(currency), &spec);

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Fecha", "Folio", "Proveedor", "Clasificación", "Total", "Pagado", "Saldo", "Vence", "Programado",
        "Estatus", "VoBo",
    ]);

    match primary {
        None => {
            for inv in &visible {
                table.add_row(invoice_row(inv, currency, &dups));
            }
        }
        Some(field) => {
            let tree = group_invoices(visible.iter().copied(), field, secondary)?;
            for group in &tree.groups {
                table.add_row(header_row(
                    group.key.to_uppercase(),
                    group.count(),
                    group.total(),
                    group.balance(),
                    currency,
                ));
                match &group.body {
                    GroupBody::Invoices(list) => {
                        for inv in list {
                            table.add_row(invoice_row(inv, currency, &dups));
                        }
                    }
                    GroupBody::Subgroups(subs) => {
                        for sub in subs {
                            table.add_row(header_row(
                                format!("  {}", sub.key),
                                sub.count(),
                                sub.total(),
                                sub.balance(),
                                currency,
                            ));
                            for inv in &sub.invoices {
                                table.add_row(invoice_row(inv, currency, &dups));
                            }
                        }
                    }
                }
            }
        }
    }

    let total: f64 = visible.iter().map(|i| cxp::models::amount(i.total)).sum();
    let balance: f64 = visible.iter().map(|i| i.outstanding()).sum();
    println!("Cartera {currency}\n{table}");
    println!(
        "{} facturas, total {}, saldo {}",
        visible.len(),
        money_in(total, currency),
        money_in(balance, currency).bold()
    );
    if !dups.groups.is_empty() {
        println!(
            "{}",
            format!("{} folios duplicados (ver `cxp duplicates`)", dups.groups.len()).red()
        );
    }
    Ok(())
}

pub fn add(args: AddArgs) -> Result<()> {
    let (settings, conn) = open_db()?;
    let suppliers = list_suppliers(&conn)?;
    let supplier = find_supplier(&suppliers, &args.proveedor);
    let currency = parse_currency(
        args.currency.as_deref(),
        supplier.map(|s| s.moneda).unwrap_or(settings.default_currency),
    )?;
    let fecha = check_date(Some(args.fecha.clone()))?.unwrap_or_default();
    let clasificacion = args
        .clasificacion
        .or_else(|| supplier.map(|s| s.clasificacion.clone()))
        .unwrap_or_default();

    let draft = InvoiceDraft {
        id: None,
        tipo: args.tipo.as_deref().map(str::parse::<InvoiceType>).transpose()?.unwrap_or_default(),
        fecha,
        serie: args.serie,
        folio: args.folio,
        uuid: args.uuid,
        proveedor: args.proveedor,
        clasificacion,
        subtotal: args.subtotal,
        iva: args.iva,
        ret_isr: args.ret_isr,
        ret_iva: args.ret_iva,
        monto_pagado: args.pagado,
        concepto: args.concepto,
        dias_credito: args.dias_credito,
        vencimiento: check_date(args.vencimiento)?,
        estatus: args.estatus.as_deref().map(str::parse::<Status>).transpose()?,
        fecha_programacion: check_date(args.programacion)?,
        dias_ficticios: args.dias_ficticios,
        referencia: args.referencia,
        notas: args.notas,
    };
    let invoice = draft.finalize(&suppliers, settings.draft_defaults());

    let mut store = load_store(&conn)?;
    store.insert(currency, invoice.clone())?;
    upsert_invoice(&conn, currency, &invoice)?;
    info!(id = %invoice.id, %currency, "invoice added");

    println!(
        "Added invoice {} ({} {}, total {}, vence {})",
        invoice.id,
        invoice.proveedor,
        invoice.folio_key(),
        money_in(invoice.total, currency),
        short_date(invoice.due_date())
    );
    Ok(())
}

pub struct SetArgs {
    pub id: String,
    pub currency: Option<String>,
    pub clasificacion: Option<String>,
    pub concepto: Option<String>,
    pub programacion: Option<String>,
    pub estatus: Option<String>,
    pub pagado: Option<f64>,
}

pub fn set(args: SetArgs) -> Result<()> {
    let mut edits = Vec::new();
    if let Some(c) = args.clasificacion {
        edits.push(InvoiceEdit::Clasificacion(c));
    }
    if let Some(c) = args.concepto {
        edits.push(InvoiceEdit::Concepto(c));
    }
    if let Some(d) = args.programacion {
        let d = check_date(Some(d))?.unwrap_or_default();
        edits.push(InvoiceEdit::FechaProgramacion(d));
    }
    if let Some(s) = args.estatus {
        edits.push(InvoiceEdit::Estatus(s.parse()?));
    }
    if let Some(m) = args.pagado {
        edits.push(InvoiceEdit::MontoPagado(m));
    }
    if edits.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }
    apply_edits(&args.id, args.currency.as_deref(), &edits)
}

fn apply_edits(id: &str, currency: Option<&str>, edits: &[InvoiceEdit]) -> Result<()> {
    let (_, conn) = open_db()?;
    let mut store = load_store(&conn)?;
    let currency = locate(&store, id, currency)?;
    for edit in edits {
        store.apply_edit(currency, id, edit)?;
    }
    if let Some(inv) = store.get(currency, id) {
        upsert_invoice(&conn, currency, inv)?;
        println!(
            "Updated {} ({}): saldo {}, estatus {}",
            inv.id,
            inv.proveedor,
            money_in(inv.outstanding(), currency),
            inv.estatus
        );
    }
    Ok(())
}

pub fn pay(id: &str, currency: Option<&str>, amount: Option<f64>) -> Result<()> {
    let amount = match amount {
        Some(a) => a,
        None => {
            let (_, conn) = open_db()?;
            let store = load_store(&conn)?;
            let cur = locate(&store, id, currency)?;
            store.get(cur, id).map(|i| i.total).unwrap_or_default()
        }
    };
    apply_edits(id, currency, &[InvoiceEdit::MontoPagado(amount)])
}

pub fn vobo(id: &str, currency: Option<&str>, direccion: bool) -> Result<()> {
    let edit = if direccion {
        InvoiceEdit::ToggleAutorizado
    } else {
        InvoiceEdit::ToggleVoBo
    };
    apply_edits(id, currency, &[edit])
}

pub fn move_to(id: &str, from: Option<&str>, to: &str) -> Result<()> {
    let (_, mut conn) = open_db()?;
    let mut store = load_store(&conn)?;
    let from = locate(&store, id, from)?;
    let to: Currency = to.parse()?;
    store.move_to(id, from, to)?;
    if let Some(inv) = store.get(to, id) {
        relocate_invoice(&mut conn, from, to, inv)?;
    }
    println!("Moved {id} from {from} to {to}");
    Ok(())
}

pub fn delete(id: &str, currency: Option<&str>) -> Result<()> {
    let (_, conn) = open_db()?;
    let mut store = load_store(&conn)?;
    let currency = locate(&store, id, currency)?;
    store.remove(currency, id);
    delete_invoice(&conn, currency, id)?;
    info!(id, %currency, "invoice deleted");
    println!("Deleted {id} ({currency})");
    Ok(())
}

pub fn bulk(
    currency: Option<&str>,
    ids: &[String],
    clasificacion: Option<String>,
    programacion: Option<String>,
    estatus: Option<String>,
) -> Result<()> {
    let (settings, mut conn) = open_db()?;
    let mut store = load_store(&conn)?;
    let currency = parse_currency(currency, settings.default_currency)?;
    let edit = BulkEdit {
        clasificacion,
        fecha_programacion: check_date(programacion)?,
        estatus: estatus.as_deref().map(str::parse::<Status>).transpose()?,
    };
    let touched = store.apply_bulk(currency, ids, &edit);
    let changed: Vec<&Invoice> = touched.iter().filter_map(|id| store.get(currency, id)).collect();
    cxp::db::upsert_invoices(&mut conn, changed.iter().map(|inv| (currency, *inv)))?;

    println!("Updated {} of {} invoices in {currency}", touched.len(), ids.len());
    let missing: Vec<&String> = ids.iter().filter(|id| !touched.contains(*id)).collect();
    if !missing.is_empty() && !edit.is_empty() {
        println!(
            "{}",
            format!(
                "Not found in {currency}: {}",
                missing.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
            )
            .yellow()
        );
    }
    Ok(())
}
