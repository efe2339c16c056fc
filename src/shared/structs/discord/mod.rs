pub mod command;
pub mod interaction;
