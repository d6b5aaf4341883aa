#![allow(dead_code)]

pub mod dsforge_env;
pub mod imagesets;
