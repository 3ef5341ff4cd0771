mod expander;

pub use expander::{normalize_lexically, PathError, PathExpander};
