pub mod lock;
pub mod mapping;
