pub mod lifecycle;
pub mod permissions;
pub mod stats;
