pub mod builder;
pub mod cfg;
pub mod codegen;
pub mod config;
pub mod ident;
pub mod ir;
pub mod pipeline;

pub use config::{CodegenConfig, CompilerConfig, FrontendConfig, ReentrantShow};
pub use ir::Program;
pub use pipeline::{compile, compile_batch, compile_json, Compiled};
