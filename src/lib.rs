pub mod api;
pub mod comm;
pub mod common;
pub mod data;
pub mod policy;

#[cfg(test)]
pub(crate) mod testing;
