//! Row models and DTOs.

pub mod product;
pub mod setting;
pub mod super_admin;
