//! Immigration case-file (expediente) management: status workflow, template-driven requirement
//! checklists and the HTTP surface around them.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
