pub mod artifact;
pub mod report;
