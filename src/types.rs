pub mod push;
pub mod webhook;
