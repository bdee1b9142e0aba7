//! Adapters layer: Concrete implementations of ports.
//!
//! - `artifact`: signed JSON model export, loaded through `ModelLoader`
//! - `sanitize`: clinical-value and secret filtering for logs

pub mod artifact;
pub mod sanitize;
