//! Accounts-payable engine: invoice store, filtering, grouping, aging,
//! duplicate detection and payment projection, plus the SQLite and
//! spreadsheet collaborators the `cxp` binary drives.

pub mod aging;
pub mod db;
pub mod duplicates;
pub mod error;
pub mod filter;
pub mod fmt;
pub mod grouping;
pub mod importer;
pub mod logging;
pub mod models;
pub mod projection;
pub mod settings;
pub mod store;
pub mod summary;

pub use aging::{classify_aging, AgingBucket, AgingReport};
pub use duplicates::{find_duplicates, DuplicateIndex, DuplicateReport};
pub use error::{CxpError, Result};
pub use filter::{filter_invoices, matches_filter, FilterSpec};
pub use grouping::{group_invoices, GroupField, GroupTree};
pub use models::{Currency, Invoice, InvoiceType, Status, Supplier};
pub use projection::{build_projection_matrix, ProjectionMatrix, ProjectionQuery};
pub use store::{BulkEdit, Classifications, InvoiceDraft, InvoiceEdit, InvoiceStore};
pub use summary::{summarize, Summary};
