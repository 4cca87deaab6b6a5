use thiserror::Error;

use crate::models::Currency;

#[derive(Error, Debug)]
pub enum CxpError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown invoice: {0}")]
    UnknownInvoice(String),

    #[error("Invoice {id} already exists in {currency}")]
    DuplicateId { currency: Currency, id: String },

    #[error("Unknown currency: {0} (expected MXN, USD or EUR)")]
    UnknownCurrency(String),

    #[error("Unknown status: {0} (expected Pendiente, Pagado, Vencido or Parcial)")]
    UnknownStatus(String),

    #[error("Unknown invoice type: {0}")]
    UnknownInvoiceType(String),

    #[error("Unknown group field: {0} (expected proveedor, clasificacion, estatus or mes)")]
    UnknownGroupField(String),

    #[error("Invalid grouping: {0}")]
    InvalidGrouping(String),

    #[error("Invalid date: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Unknown classification: {0}")]
    UnknownClassification(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CxpError>;
