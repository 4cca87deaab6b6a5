use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, Row};
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{parse_amount, Currency, Invoice, InvoiceType, Status, Supplier};
use crate::store::{Classifications, InvoiceStore, DEFAULT_CLASSIFICATIONS};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS invoices (
    moneda TEXT NOT NULL,
    id TEXT NOT NULL,
    tipo TEXT NOT NULL DEFAULT 'Factura',
    fecha TEXT NOT NULL DEFAULT '',
    serie TEXT NOT NULL DEFAULT '',
    folio TEXT NOT NULL DEFAULT '',
    uuid TEXT NOT NULL DEFAULT '',
    proveedor TEXT NOT NULL DEFAULT '',
    clasificacion TEXT NOT NULL DEFAULT '',
    subtotal REAL DEFAULT 0,
    iva REAL DEFAULT 0,
    ret_isr REAL DEFAULT 0,
    ret_iva REAL DEFAULT 0,
    total REAL DEFAULT 0,
    monto_pagado REAL DEFAULT 0,
    concepto TEXT NOT NULL DEFAULT '',
    dias_credito INTEGER DEFAULT 0,
    vencimiento TEXT,
    estatus TEXT NOT NULL DEFAULT 'Pendiente',
    fecha_programacion TEXT,
    dias_ficticios INTEGER DEFAULT 0,
    referencia TEXT NOT NULL DEFAULT '',
    notas TEXT NOT NULL DEFAULT '',
    vo_bo INTEGER DEFAULT 0,
    autorizado_direccion INTEGER DEFAULT 0,
    updated_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (moneda, id)
);

CREATE INDEX IF NOT EXISTS idx_invoices_fecha ON invoices (fecha);

CREATE TABLE IF NOT EXISTS suppliers (
    id TEXT PRIMARY KEY,
    nombre TEXT NOT NULL,
    rfc TEXT NOT NULL DEFAULT '',
    moneda TEXT NOT NULL DEFAULT 'MXN',
    dias_credito INTEGER DEFAULT 30,
    contacto TEXT NOT NULL DEFAULT '',
    telefono TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    banco TEXT NOT NULL DEFAULT '',
    clabe TEXT NOT NULL DEFAULT '',
    clasificacion TEXT NOT NULL DEFAULT 'Otros',
    activo INTEGER DEFAULT 1
);

CREATE TABLE IF NOT EXISTS clasificaciones (
    id INTEGER PRIMARY KEY,
    nombre TEXT NOT NULL UNIQUE,
    orden INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

/// Create tables and seed the default classifications once. Seeding is
/// recorded in `metadata`, so deleting every classification later does not
/// bring the defaults back.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let seeded = conn
        .prepare("SELECT 1 FROM metadata WHERE key = 'classifications_seeded'")?
        .exists([])?;
    if !seeded {
        for (i, name) in DEFAULT_CLASSIFICATIONS.iter().enumerate() {
            conn.execute(
                "INSERT OR IGNORE INTO clasificaciones (nombre, orden) VALUES (?1, ?2)",
                rusqlite::params![name, i as i64],
            )?;
        }
        conn.execute(
            "INSERT INTO metadata (key, value) VALUES ('classifications_seeded', '1')",
            [],
        )?;
        debug!("seeded default classifications");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Column coercion
// ---------------------------------------------------------------------------

/// Numeric column that may hold text written by older tools. Garbage is zero.
fn amount_at(row: &Row, idx: usize) -> rusqlite::Result<f64> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null | ValueRef::Blob(_) => 0.0,
        ValueRef::Integer(i) => i as f64,
        ValueRef::Real(r) => crate::models::amount(r),
        ValueRef::Text(t) => parse_amount(&String::from_utf8_lossy(t)),
    })
}

fn days_at(row: &Row, idx: usize) -> rusqlite::Result<i64> {
    Ok(amount_at(row, idx)?.trunc() as i64)
}

fn text_at(row: &Row, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

fn date_at(row: &Row, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn flag_at(row: &Row, idx: usize) -> rusqlite::Result<bool> {
    Ok(amount_at(row, idx)? != 0.0)
}

fn currency_of(raw: &str) -> Currency {
    raw.parse().unwrap_or_else(|_| {
        warn!(moneda = raw, "unknown currency in database, using MXN");
        Currency::MXN
    })
}

fn opt_date(val: &Option<String>) -> Option<&str> {
    val.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Invoices
// ---------------------------------------------------------------------------

const INVOICE_COLUMNS: &str = "moneda, id, tipo, fecha, serie, folio, uuid, proveedor, clasificacion, \
    subtotal, iva, ret_isr, ret_iva, total, monto_pagado, concepto, dias_credito, vencimiento, \
    estatus, fecha_programacion, dias_ficticios, referencia, notas, vo_bo, autorizado_direccion";

fn invoice_from_row(row: &Row) -> rusqlite::Result<(String, Invoice)> {
    let moneda = text_at(row, 0)?;
    let tipo_raw = text_at(row, 2)?;
    let estatus_raw = text_at(row, 18)?;
    let invoice = Invoice {
        id: text_at(row, 1)?,
        tipo: tipo_raw.parse::<InvoiceType>().unwrap_or_default(),
        fecha: text_at(row, 3)?,
        serie: text_at(row, 4)?,
        folio: text_at(row, 5)?,
        uuid: text_at(row, 6)?,
        proveedor: text_at(row, 7)?,
        clasificacion: text_at(row, 8)?,
        subtotal: amount_at(row, 9)?,
        iva: amount_at(row, 10)?,
        ret_isr: amount_at(row, 11)?,
        ret_iva: amount_at(row, 12)?,
        total: amount_at(row, 13)?,
        monto_pagado: amount_at(row, 14)?,
        concepto: text_at(row, 15)?,
        dias_credito: days_at(row, 16)?,
        vencimiento: date_at(row, 17)?,
        estatus: estatus_raw.parse::<Status>().unwrap_or_default(),
        fecha_programacion: date_at(row, 19)?,
        dias_ficticios: days_at(row, 20)?,
        referencia: text_at(row, 21)?,
        notas: text_at(row, 22)?,
        vo_bo: flag_at(row, 23)?,
        autorizado_direccion: flag_at(row, 24)?,
    };
    Ok((moneda, invoice))
}

/// Every invoice, newest `fecha` first within each currency bucket.
pub fn load_store(conn: &Connection) -> Result<InvoiceStore> {
    let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY fecha DESC, rowid DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], invoice_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    // Rows with a valid moneda load before stray ones.
    let (known, stray): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .partition(|(moneda, _)| moneda.parse::<Currency>().is_ok());

    let mut store = InvoiceStore::new();
    for (moneda, invoice) in known.into_iter().chain(stray) {
        let currency = currency_of(&moneda);
        if store.get(currency, &invoice.id).is_some() {
            warn!(
                id = %invoice.id,
                moneda = %moneda,
                "invoice id already loaded in {currency}, skipping row"
            );
            continue;
        }
        store.upsert(currency, invoice);
    }
    debug!(count = store.len(), "loaded invoices");
    Ok(store)
}

pub fn upsert_invoice(conn: &Connection, currency: Currency, inv: &Invoice) -> Result<()> {
    let sql = format!(
        "INSERT INTO invoices ({INVOICE_COLUMNS}) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25) \
         ON CONFLICT (moneda, id) DO UPDATE SET \
            tipo = excluded.tipo, fecha = excluded.fecha, serie = excluded.serie, folio = excluded.folio, \
            uuid = excluded.uuid, proveedor = excluded.proveedor, clasificacion = excluded.clasificacion, \
            subtotal = excluded.subtotal, iva = excluded.iva, ret_isr = excluded.ret_isr, \
            ret_iva = excluded.ret_iva, total = excluded.total, monto_pagado = excluded.monto_pagado, \
            concepto = excluded.concepto, dias_credito = excluded.dias_credito, \
            vencimiento = excluded.vencimiento, estatus = excluded.estatus, \
            fecha_programacion = excluded.fecha_programacion, dias_ficticios = excluded.dias_ficticios, \
            referencia = excluded.referencia, notas = excluded.notas, vo_bo = excluded.vo_bo, \
            autorizado_direccion = excluded.autorizado_direccion, updated_at = datetime('now')"
    );
    conn.prepare_cached(&sql)?.execute(rusqlite::params![
        currency.code(),
        inv.id,
        inv.tipo.label(),
        inv.fecha,
        inv.serie,
        inv.folio,
        inv.uuid,
        inv.proveedor,
        inv.clasificacion,
        inv.subtotal,
        inv.iva,
        inv.ret_isr,
        inv.ret_iva,
        inv.total,
        inv.monto_pagado,
        inv.concepto,
        inv.dias_credito,
        opt_date(&inv.vencimiento),
        inv.estatus.label(),
        opt_date(&inv.fecha_programacion),
        inv.dias_ficticios,
        inv.referencia,
        inv.notas,
        inv.vo_bo,
        inv.autorizado_direccion,
    ])?;
    Ok(())
}

/// Upsert a batch in a single transaction. Returns the number written.
pub fn upsert_invoices<'a, I>(conn: &mut Connection, invoices: I) -> Result<usize>
where
    I: IntoIterator<Item = (Currency, &'a Invoice)>,
{
    let tx = conn.transaction()?;
    let mut count = 0;
    for (currency, inv) in invoices {
        upsert_invoice(&tx, currency, inv)?;
        count += 1;
    }
    tx.commit()?;
    debug!(count, "upserted invoices");
    Ok(count)
}

/// Returns whether a row was removed.
pub fn delete_invoice(conn: &Connection, currency: Currency, id: &str) -> Result<bool> {
    let n = conn.execute(
        "DELETE FROM invoices WHERE moneda = ?1 AND id = ?2",
        rusqlite::params![currency.code(), id],
    )?;
    Ok(n > 0)
}

/// Persist a currency move: drop the old row and write the new one atomically.
pub fn relocate_invoice(conn: &mut Connection, from: Currency, to: Currency, inv: &Invoice) -> Result<()> {
    let tx = conn.transaction()?;
    delete_invoice(&tx, from, &inv.id)?;
    upsert_invoice(&tx, to, inv)?;
    tx.commit()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Suppliers
// ---------------------------------------------------------------------------

pub fn list_suppliers(conn: &Connection) -> Result<Vec<Supplier>> {
    let mut stmt = conn.prepare(
        "SELECT id, nombre, rfc, moneda, dias_credito, contacto, telefono, email, banco, clabe, \
         clasificacion, activo FROM suppliers ORDER BY nombre",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Supplier {
                id: text_at(row, 0)?,
                nombre: text_at(row, 1)?,
                rfc: text_at(row, 2)?,
                moneda: currency_of(&text_at(row, 3)?),
                dias_credito: days_at(row, 4)?,
                contacto: text_at(row, 5)?,
                telefono: text_at(row, 6)?,
                email: text_at(row, 7)?,
                banco: text_at(row, 8)?,
                clabe: text_at(row, 9)?,
                clasificacion: text_at(row, 10)?,
                activo: flag_at(row, 11)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn upsert_supplier(conn: &Connection, s: &Supplier) -> Result<()> {
    conn.prepare_cached(
        "INSERT INTO suppliers (id, nombre, rfc, moneda, dias_credito, contacto, telefono, email, banco, \
         clabe, clasificacion, activo) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
         ON CONFLICT (id) DO UPDATE SET nombre = excluded.nombre, rfc = excluded.rfc, \
            moneda = excluded.moneda, dias_credito = excluded.dias_credito, contacto = excluded.contacto, \
            telefono = excluded.telefono, email = excluded.email, banco = excluded.banco, \
            clabe = excluded.clabe, clasificacion = excluded.clasificacion, activo = excluded.activo",
    )?
    .execute(rusqlite::params![
        s.id,
        s.nombre,
        s.rfc,
        s.moneda.code(),
        s.dias_credito,
        s.contacto,
        s.telefono,
        s.email,
        s.banco,
        s.clabe,
        s.clasificacion,
        s.activo,
    ])?;
    Ok(())
}

pub fn upsert_suppliers(conn: &mut Connection, suppliers: &[Supplier]) -> Result<()> {
    let tx = conn.transaction()?;
    for s in suppliers {
        upsert_supplier(&tx, s)?;
    }
    tx.commit()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Classifications
// ---------------------------------------------------------------------------

/// Labels in saved order.
pub fn load_classifications(conn: &Connection) -> Result<Classifications> {
    let mut stmt = conn.prepare("SELECT nombre FROM clasificaciones ORDER BY orden, id")?;
    let labels = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Classifications::new(labels))
}

/// Replace the stored set with `classes`.
pub fn save_classifications(conn: &mut Connection, classes: &Classifications) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM clasificaciones", [])?;
    for (i, label) in classes.labels().iter().enumerate() {
        tx.execute(
            "INSERT INTO clasificaciones (nombre, orden) VALUES (?1, ?2)",
            rusqlite::params![label, i as i64],
        )?;
    }
    tx.commit()?;
    Ok(())
}
