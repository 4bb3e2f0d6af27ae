//! Data types shared by the layout front end, the mapper and the exporter.

mod format;
mod layout;
mod value;

pub use format::*;
pub use layout::*;
pub use value::*;
