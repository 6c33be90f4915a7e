//! Styled, column-aligned output of the branch tree.

pub mod colors;
pub mod table;

pub use colors::Painter;
pub use table::{Table, TableOptions};
