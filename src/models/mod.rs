pub mod extraction;
pub mod option;

pub use extraction::{ExtractionResult, RationaleEntry};
pub use option::{letter_for_index, Dialect, OptionElement};
