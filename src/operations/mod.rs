pub mod boolean;
pub mod query;
pub mod shaping;
