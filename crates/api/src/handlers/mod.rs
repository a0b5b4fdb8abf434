pub mod auth;
pub mod moderation;
pub mod presence;
pub mod products;
pub mod settings;
pub mod super_admins;
