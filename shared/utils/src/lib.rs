pub mod config;
pub mod error;
pub mod logging;
pub mod validation;
pub mod workbook;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use validation::*;
pub use workbook::*;
