pub mod config;
pub mod fling;
pub mod replay;
pub mod script;
