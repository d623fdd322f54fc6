pub mod analysis;
pub mod ping;
