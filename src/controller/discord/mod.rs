pub mod handler;
pub mod interaction;
pub mod register;
