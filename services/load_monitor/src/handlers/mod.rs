//! Load Monitor Node Handlers
//!
//! ```text
//! heartbeat ──query──► reader ──read──► parser ──print──► printer
//!                                                         (stdout)
//! any node ──log──► logger (stdout)
//! ```
//!
//! Each handler accepts exactly one message kind. Anything else stops the
//! node with an unexpected-message error.

mod logger;
mod parser;
mod printer;
mod reader;

pub use logger::LoggerHandler;
pub use parser::ParserHandler;
pub use printer::{format_loads, PrinterHandler};
pub use reader::ReaderHandler;

use std::io::Write;

/// Line-oriented output shared by the logger and printer
pub type Output = Box<dyn Write + Send>;
