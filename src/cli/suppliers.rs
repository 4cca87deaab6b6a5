use colored::Colorize;
use comfy_table::{Cell, Table};

use cxp::db::{list_suppliers, upsert_supplier};
use cxp::error::Result;
use cxp::models::{find_supplier_ignore_case, Supplier};
use cxp::store::new_id;

use super::{open_db, parse_currency};

pub struct SupplierArgs {
    pub nombre: String,
    pub rfc: String,
    pub moneda: Option<String>,
    pub dias_credito: Option<i64>,
    pub clasificacion: Option<String>,
    pub contacto: String,
    pub telefono: String,
    pub email: String,
    pub banco: String,
    pub clabe: String,
    pub inactivo: bool,
}

pub fn add(args: SupplierArgs) -> Result<()> {
    let (settings, conn) = open_db()?;
    let existing = list_suppliers(&conn)?;
    let nombre = args.nombre.trim().to_string();
    let previous = find_supplier_ignore_case(&existing, &nombre);

    let defaults = Supplier::default();
    let supplier = Supplier {
        id: previous.map(|s| s.id.clone()).unwrap_or_else(new_id),
        nombre: nombre.clone(),
        rfc: args.rfc,
        moneda: parse_currency(args.moneda.as_deref(), settings.default_currency)?,
        dias_credito: args.dias_credito.unwrap_or(settings.default_credit_days),
        contacto: args.contacto,
        telefono: args.telefono,
        email: args.email,
        banco: args.banco,
        clabe: args.clabe,
        clasificacion: args.clasificacion.unwrap_or(defaults.clasificacion),
        activo: !args.inactivo,
    };
    upsert_supplier(&conn, &supplier)?;

    let verb = if previous.is_some() { "Updated" } else { "Added" };
    println!("{verb} supplier: {nombre}");
    Ok(())
}

pub fn list() -> Result<()> {
    let (_, conn) = open_db()?;
    let suppliers = list_suppliers(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["Nombre", "RFC", "Moneda", "Días", "Clasificación", "Contacto", "Activo"]);
    for s in &suppliers {
        table.add_row(vec![
            Cell::new(&s.nombre),
            Cell::new(&s.rfc),
            Cell::new(s.moneda.code()),
            Cell::new(s.dias_credito),
            Cell::new(&s.clasificacion),
            Cell::new(&s.contacto),
            Cell::new(if s.activo { "sí".green() } else { "no".red() }),
        ]);
    }
    println!("Proveedores\n{table}");
    Ok(())
}
