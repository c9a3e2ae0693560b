pub mod diff;
pub mod notify;
pub mod parser;
