//! Domain models for the taperwise engine.

mod case;
mod drug;
mod record;
mod result;

pub use case::*;
pub use drug::*;
pub use record::*;
pub use result::*;
