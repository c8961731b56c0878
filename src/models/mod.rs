pub mod common;
pub mod entities;
pub mod errors;
pub mod filters;
