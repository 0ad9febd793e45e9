//! Label dictionary - converting between motion ids and human-readable labels

pub mod dictionary;

pub use dictionary::{DEFAULT_LAYER, LabelDictionary, LabelEntry};
