//! Workbook ingestion
//!
//! Reads `.xlsx`/`.xls` files into the shared `WorkbookData` shape.

pub mod reader;

pub use reader::*;
