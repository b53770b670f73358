//! Gesture ingestion: wheel notches and touch samples in, scroller calls out.

mod adapter;
mod contact;
pub mod history;

pub use adapter::GestureAdapter;
pub use contact::Contact;
