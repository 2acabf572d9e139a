//! Main module for soulprint library functionality

pub mod ast;
pub mod formats;
pub mod integrity;
pub mod lexing;
pub mod loader;
pub mod options;
pub mod parsing;
pub mod registry;
pub mod testing;
pub mod transforms;
pub mod validation;
