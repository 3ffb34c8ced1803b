#![allow(dead_code)]

pub mod helpers;
pub mod test_app;

pub use helpers::*;
pub use test_app::TestApp;
