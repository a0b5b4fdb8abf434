//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod product_repo;
pub mod setting_repo;
pub mod super_admin_repo;

pub use product_repo::ProductRepo;
pub use setting_repo::SettingRepo;
pub use super_admin_repo::SuperAdminRepo;
