pub mod classes;
pub mod import;
pub mod init;
pub mod invoices;
pub mod reports;
pub mod suppliers;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use cxp::db::{get_connection, init_db};
use cxp::error::{CxpError, Result};
use cxp::models::{parse_iso_date, Currency};
use cxp::settings::{load_settings, Settings};
use cxp::store::InvoiceStore;

/// Open the configured database, creating tables on first use.
pub(crate) fn open_db() -> Result<(Settings, Connection)> {
    let settings = load_settings();
    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;
    Ok((settings, conn))
}

pub(crate) fn parse_currency(raw: Option<&str>, fallback: Currency) -> Result<Currency> {
    raw.map(str::parse::<Currency>).transpose().map(|c| c.unwrap_or(fallback))
}

/// Validate a YYYY-MM-DD argument, passing it through unchanged.
pub(crate) fn check_date(raw: Option<String>) -> Result<Option<String>> {
    match raw {
        Some(d) if d.trim().is_empty() => Ok(None),
        Some(d) => parse_iso_date(&d)
            .map(|_| Some(d.trim().to_string()))
            .ok_or(CxpError::InvalidDate(d)),
        None => Ok(None),
    }
}

pub(crate) fn today(raw: Option<String>) -> Result<NaiveDate> {
    match raw {
        Some(d) => parse_iso_date(&d).ok_or(CxpError::InvalidDate(d)),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

/// Currency bucket of an invoice: the one given, or the first bucket that
/// holds the id.
pub(crate) fn locate(store: &InvoiceStore, id: &str, currency: Option<&str>) -> Result<Currency> {
    match currency {
        Some(raw) => {
            let cur: Currency = raw.parse()?;
            store
                .get(cur, id)
                .map(|_| cur)
                .ok_or_else(|| CxpError::UnknownInvoice(id.to_string()))
        }
        None => store
            .find(id)
            .map(|(cur, _)| cur)
            .ok_or_else(|| CxpError::UnknownInvoice(id.to_string())),
    }
}

#[derive(Parser)]
#[command(name = "cxp", about = "Cuentas por pagar: supplier invoices, aging and payment projection.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for cxp data (default: ~/Documents/cxp)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage invoices (the Cartera view).
    Invoices {
        #[command(subcommand)]
        command: InvoicesCommands,
    },
    /// List invoices sharing a folio across all currencies.
    Duplicates {
        /// Invoice ids to delete after review
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        delete: Vec<String>,
    },
    /// Aging buckets of pending balances.
    Aging {
        /// Show a single currency instead of every currency plus the aggregate
        #[arg(long)]
        currency: Option<String>,
        /// Reference date (default: today)
        #[arg(long)]
        today: Option<String>,
    },
    /// Provider x payment-date projection of outstanding balances.
    Projection {
        /// First payment date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Last payment date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Match supplier, folio, total, concept or classification
        #[arg(long)]
        search: Option<String>,
    },
    /// Dashboard figures.
    Summary {
        /// Reference date (default: today)
        #[arg(long)]
        today: Option<String>,
    },
    /// Manage suppliers.
    Suppliers {
        #[command(subcommand)]
        command: SuppliersCommands,
    },
    /// Manage classification labels.
    Classes {
        #[command(subcommand)]
        command: ClassesCommands,
    },
    /// Import invoices from a CSV/XLSX file.
    Import {
        /// Path to CSV or XLSX file to import
        file: String,
    },
}

#[derive(Subcommand)]
pub enum InvoicesCommands {
    /// List one currency, filtered and optionally grouped.
    List {
        #[arg(long)]
        currency: Option<String>,
        /// Filter as JSON, e.g. '{"proveedor":"X","pagoTo":"2026-03-31"}'
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        proveedor: Option<String>,
        #[arg(long)]
        clasificacion: Option<String>,
        #[arg(long)]
        estatus: Option<String>,
        /// Issue date lower bound
        #[arg(long)]
        from: Option<String>,
        /// Issue date upper bound
        #[arg(long)]
        to: Option<String>,
        /// Scheduled payment date lower bound
        #[arg(long = "pago-from")]
        pago_from: Option<String>,
        /// Scheduled payment date upper bound
        #[arg(long = "pago-to")]
        pago_to: Option<String>,
        #[arg(long)]
        search: Option<String>,
        /// proveedor, clasificacion, estatus or mes
        #[arg(long = "group-by")]
        group_by: Option<String>,
        /// Second grouping level
        #[arg(long = "then-by", requires = "group_by")]
        then_by: Option<String>,
    },
    /// Register an invoice.
    Add(AddArgs),
    /// Edit fields of an invoice.
    Set {
        id: String,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        clasificacion: Option<String>,
        #[arg(long)]
        concepto: Option<String>,
        /// Scheduled payment date; empty string clears it
        #[arg(long)]
        programacion: Option<String>,
        #[arg(long)]
        estatus: Option<String>,
        /// Amount paid so far
        #[arg(long)]
        pagado: Option<f64>,
    },
    /// Record a payment (default: pay in full).
    Pay {
        id: String,
        #[arg(long)]
        currency: Option<String>,
        /// Total amount paid so far
        #[arg(long)]
        amount: Option<f64>,
    },
    /// Toggle the sign-off flag.
    Vobo {
        id: String,
        #[arg(long)]
        currency: Option<String>,
        /// Toggle management authorization instead
        #[arg(long)]
        direccion: bool,
    },
    /// Move an invoice to another currency.
    Move {
        id: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: String,
    },
    /// Delete an invoice permanently.
    Delete {
        id: String,
        #[arg(long)]
        currency: Option<String>,
    },
    /// Apply the same change to several invoices of one currency.
    Bulk {
        #[arg(long)]
        currency: Option<String>,
        #[arg(long, value_delimiter = ',', num_args = 1.., required = true)]
        ids: Vec<String>,
        #[arg(long)]
        clasificacion: Option<String>,
        #[arg(long)]
        programacion: Option<String>,
        #[arg(long)]
        estatus: Option<String>,
    },
}

#[derive(clap::Args)]
pub struct AddArgs {
    #[arg(long)]
    pub proveedor: String,
    /// Issue date (YYYY-MM-DD)
    #[arg(long)]
    pub fecha: String,
    #[arg(long)]
    pub subtotal: f64,
    /// Default: subtotal times the configured IVA rate
    #[arg(long)]
    pub iva: Option<f64>,
    #[arg(long = "ret-isr", default_value_t = 0.0)]
    pub ret_isr: f64,
    #[arg(long = "ret-iva", default_value_t = 0.0)]
    pub ret_iva: f64,
    #[arg(long, default_value = "")]
    pub serie: String,
    #[arg(long, default_value = "")]
    pub folio: String,
    #[arg(long, default_value = "")]
    pub uuid: String,
    #[arg(long)]
    pub tipo: Option<String>,
    /// Default: the supplier's currency, then the configured default
    #[arg(long)]
    pub currency: Option<String>,
    /// Default: the supplier's classification
    #[arg(long)]
    pub clasificacion: Option<String>,
    #[arg(long, default_value = "")]
    pub concepto: String,
    #[arg(long = "dias-credito")]
    pub dias_credito: Option<i64>,
    /// Explicit due date; default is fecha + credit days
    #[arg(long)]
    pub vencimiento: Option<String>,
    #[arg(long)]
    pub programacion: Option<String>,
    #[arg(long)]
    pub estatus: Option<String>,
    #[arg(long, default_value_t = 0.0)]
    pub pagado: f64,
    #[arg(long = "dias-ficticios", default_value_t = 0)]
    pub dias_ficticios: i64,
    #[arg(long, default_value = "")]
    pub referencia: String,
    #[arg(long, default_value = "")]
    pub notas: String,
}

#[derive(Subcommand)]
pub enum SuppliersCommands {
    /// Add or update a supplier (matched by name).
    Add {
        nombre: String,
        #[arg(long, default_value = "")]
        rfc: String,
        #[arg(long)]
        moneda: Option<String>,
        #[arg(long = "dias-credito")]
        dias_credito: Option<i64>,
        #[arg(long)]
        clasificacion: Option<String>,
        #[arg(long, default_value = "")]
        contacto: String,
        #[arg(long, default_value = "")]
        telefono: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        banco: String,
        #[arg(long, default_value = "")]
        clabe: String,
        /// Mark the supplier inactive
        #[arg(long)]
        inactivo: bool,
    },
    /// List all suppliers.
    List,
}

#[derive(Subcommand)]
pub enum ClassesCommands {
    /// List classification labels.
    List,
    /// Add a label.
    Add { name: String },
    /// Remove a label. Invoices keep their current value.
    Remove { name: String },
    /// Rename a label. Invoices keep their current value.
    Rename { from: String, to: String },
}
