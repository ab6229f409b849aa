//! File parsers and output printers. Thin collaborators around the `sim`
//! core; none of this is consulted by the kernel itself.

pub mod auxiliary_file;
pub mod environment_file;
pub mod output;
