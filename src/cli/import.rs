use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use cxp::error::Result;
use cxp::fmt::{money, short_date};
use cxp::importer::import_file;

use super::open_db;

pub fn run(file: &str) -> Result<()> {
    let file_path = PathBuf::from(file);
    let (settings, mut conn) = open_db()?;

    let result = import_file(&mut conn, &file_path, &settings)?;

    println!(
        "{} imported, {} new suppliers, {} skipped (duplicates)",
        result.imported,
        result.suppliers_created,
        result.duplicates.len()
    );

    if !result.duplicates.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Serie", "Folio", "Proveedor", "Fecha", "Total"]);
        for row in &result.duplicates {
            table.add_row(vec![
                Cell::new(&row.serie),
                Cell::new(&row.folio),
                Cell::new(&row.proveedor),
                Cell::new(short_date(Some(row.fecha.as_str()))),
                Cell::new(money(row.total)),
            ]);
        }
        println!("{}\n{table}", "Skipped as duplicates".yellow());
    }
    Ok(())
}
