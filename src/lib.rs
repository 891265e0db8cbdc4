// ABOUTME: Library module wiring the engine together and exposing the host-facing API

pub mod ast;
pub mod cache;
pub mod error;
mod eval;
pub mod host;
pub mod interp;
mod lexer;
pub mod parser;
pub mod reflect;
pub mod scope;
pub mod stdlib;
pub mod value;

pub use error::Error;
pub use host::{HostFn, ParamKind, Reflect, TypeHandle, TypeSpec};
pub use interp::{Config, Interpreter};
pub use stdlib::StringBuilder;
pub use value::Value;
