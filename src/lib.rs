pub mod admin_log;
pub mod config;
pub mod translator;
pub mod zai;
