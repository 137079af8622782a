pub mod entity;
pub mod stats;
pub mod validation;
