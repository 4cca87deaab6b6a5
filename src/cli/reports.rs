use colored::Colorize;
use comfy_table::{Cell, Table};

use cxp::aging::{classify_aging, AgingSheet};
use cxp::db::{delete_invoice, list_suppliers, load_store};
use cxp::duplicates::find_duplicates;
use cxp::error::Result;
use cxp::fmt::{day_label, money, money_in, short_date};
use cxp::models::Currency;
use cxp::projection::{build_projection_matrix, ProjectionQuery};
use cxp::summary::summarize;

use super::{check_date, open_db, today};
use crate::cli::invoices::status_cell;

pub fn duplicates(delete: &[String]) -> Result<()> {
    let (_, conn) = open_db()?;
    let mut store = load_store(&conn)?;

    for id in delete {
        match store.find(id).map(|(cur, _)| cur) {
            Some(cur) => {
                store.remove(cur, id);
                delete_invoice(&conn, cur, id)?;
                println!("Deleted {id} ({cur})");
            }
            None => println!("{}", format!("Not found: {id}").yellow()),
        }
    }

    let report = find_duplicates(store.iter());
    if report.groups.is_empty() {
        println!("{}", "No duplicate folios.".green());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Folio", "ID", "Moneda", "Proveedor", "Fecha", "Total", "Estatus"]);
    for group in &report.groups {
        for (i, (cur, inv)) in group.members.iter().enumerate() {
            let key = if i == 0 { group.key.red().bold().to_string() } else { String::new() };
            table.add_row(vec![
                Cell::new(key),
                Cell::new(&inv.id),
                Cell::new(cur.code()),
                Cell::new(&inv.proveedor),
                Cell::new(short_date(Some(inv.fecha.as_str()))),
                Cell::new(money_in(inv.total, *cur)),
                status_cell(inv.estatus),
            ]);
        }
    }
    println!("Duplicate folios\n{table}");
    println!(
        "{} groups, {} invoices involved",
        report.groups.len(),
        report.invoice_count()
    );
    Ok(())
}

fn print_sheet(title: &str, sheet: &AgingSheet, currency: Option<Currency>) {
    let fmt = |v: f64| match currency {
        Some(c) => money_in(v, c),
        None => money(v),
    };
    let mut table = Table::new();
    table.set_header(vec!["Bucket", "Count", "Saldo"]);
    for summary in &sheet.buckets {
        let label = if summary.bucket.is_overdue() {
            summary.bucket.label().red().to_string()
        } else {
            summary.bucket.label().green().to_string()
        };
        table.add_row(vec![
            Cell::new(label),
            Cell::new(summary.count()),
            Cell::new(fmt(summary.balance())),
        ]);
    }
    table.add_row(vec![
        Cell::new("Corriente".bold()),
        Cell::new(""),
        Cell::new(fmt(sheet.current_balance())),
    ]);
    table.add_row(vec![
        Cell::new("Vencido".bold()),
        Cell::new(""),
        Cell::new(fmt(sheet.overdue_balance())),
    ]);
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(sheet.count()),
        Cell::new(fmt(sheet.total_balance()).bold()),
    ]);
    println!("{title}\n{table}");
}

pub fn aging(currency: Option<&str>, today_arg: Option<String>) -> Result<()> {
    let (_, conn) = open_db()?;
    let store = load_store(&conn)?;
    let today = today(today_arg)?;
    let report = classify_aging(store.iter(), today);

    match currency {
        Some(raw) => {
            let cur: Currency = raw.parse()?;
            print_sheet(&format!("Antigüedad de saldos {cur}"), report.currency(cur), Some(cur));
        }
        None => {
            for (cur, sheet) in &report.by_currency {
                if sheet.count() > 0 {
                    print_sheet(&format!("Antigüedad de saldos {cur}"), sheet, Some(*cur));
                }
            }
            print_sheet("Antigüedad de saldos (todas las monedas)", &report.aggregate, None);
        }
    }

    if !report.unclassified.is_empty() {
        println!(
            "{}",
            format!("{} pending invoices have no due date:", report.unclassified.len()).yellow()
        );
        for (cur, inv) in &report.unclassified {
            println!("  {} {} {} {}", inv.id, cur, inv.proveedor, money_in(inv.outstanding(), *cur));
        }
    }
    Ok(())
}

pub fn projection(from: Option<String>, to: Option<String>, search: Option<String>) -> Result<()> {
    let (_, conn) = open_db()?;
    let store = load_store(&conn)?;
    let query = ProjectionQuery {
        from: check_date(from)?,
        to: check_date(to)?,
        search,
    };
    let matrix = build_projection_matrix(store.iter(), &query);
    if matrix.is_empty() {
        println!("Nothing to project.");
        return Ok(());
    }

    let mut header = vec![Cell::new("Proveedor")];
    header.extend(matrix.dates.iter().map(|d| Cell::new(day_label(d))));
    header.push(Cell::new("Total"));

    let mut table = Table::new();
    table.set_header(header);
    for provider in &matrix.providers {
        let mut row = vec![Cell::new(provider)];
        for date in &matrix.dates {
            let text = match matrix.cell(provider, date) {
                Some(cell) if cell.is_mixed() => Currency::ALL
                    .iter()
                    .filter(|c| cell.currency_total(**c) > 0.0)
                    .map(|c| format!("{} {}", money_in(cell.currency_total(*c), *c), c))
                    .collect::<Vec<_>>()
                    .join("\n")
                    .yellow()
                    .to_string(),
                Some(cell) => money(cell.total),
                None => String::new(),
            };
            row.push(Cell::new(text));
        }
        row.push(Cell::new(money(matrix.row_total(provider)).bold()));
        table.add_row(row);
    }

    let mut footer = vec![Cell::new("Total".bold())];
    footer.extend(
        matrix
            .dates
            .iter()
            .map(|d| Cell::new(money(matrix.column_total(d)).bold())),
    );
    footer.push(Cell::new(money(matrix.grand_total()).bold()));
    table.add_row(footer);

    println!("Proyección de pagos\n{table}");
    println!("{}", "Mixed-currency cells are shown per currency.".dimmed());
    Ok(())
}

pub fn summary(today_arg: Option<String>) -> Result<()> {
    let (_, conn) = open_db()?;
    let store = load_store(&conn)?;
    let suppliers = list_suppliers(&conn)?;
    let s = summarize(&store, &suppliers, today(today_arg)?);

    let mut table = Table::new();
    table.set_header(vec!["Moneda", "Por pagar", "Vigente", "Vencido"]);
    for cur in Currency::ALL {
        let split = s.split_for(cur);
        table.add_row(vec![
            Cell::new(cur.code()),
            Cell::new(money_in(s.pending_for(cur), cur).bold()),
            Cell::new(money_in(split.vigente, cur).green()),
            Cell::new(money_in(split.vencido, cur).red()),
        ]);
    }
    println!("Resumen\n{table}");
    println!(
        "Facturas: {}  Vencidas: {}  Proveedores activos: {}",
        s.invoice_count,
        if s.overdue_count > 0 {
            s.overdue_count.to_string().red().to_string()
        } else {
            s.overdue_count.to_string()
        },
        s.active_suppliers
    );

    if !s.by_classification.is_empty() {
        let mut by_class = Table::new();
        by_class.set_header(vec!["Clasificación", "Saldo"]);
        for (label, balance) in &s.by_classification {
            by_class.add_row(vec![Cell::new(label), Cell::new(money(*balance))]);
        }
        println!("Saldo por clasificación\n{by_class}");
    }
    Ok(())
}
