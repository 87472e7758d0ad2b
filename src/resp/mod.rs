pub mod document;
pub mod problem;
