//! Flutter bridge crate for the TextExt client core.

pub mod api;
