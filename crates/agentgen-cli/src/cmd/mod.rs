pub mod roles;
pub mod sync;
