#![allow(dead_code)]

mod archive;
mod server;

pub use archive::*;
pub use server::*;
