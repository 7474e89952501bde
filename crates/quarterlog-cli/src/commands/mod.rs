pub mod alert;
pub mod config;
pub mod folders;
pub mod session;
