pub mod access;
pub mod import;
pub mod loader;
pub mod reconcile;
pub mod review;
