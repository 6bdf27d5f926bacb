pub mod annotate;
pub mod list;
