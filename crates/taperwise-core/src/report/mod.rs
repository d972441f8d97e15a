//! Report content assembly and file export.

mod export;
mod formatter;

pub use export::*;
pub use formatter::*;
