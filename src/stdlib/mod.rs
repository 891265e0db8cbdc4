//! # Standard-library surface
//!
//! Names published into the root scope at interpreter construction:
//!
//! - **[core]**: `len`, `print`, `has`
//! - **[strings]**: the `strings` namespace — `Builder` plus the
//!   join/split/trim/replace/contains/prefix/suffix/case/index family
//! - **[fmt]**: the `fmt` namespace — `Println`, `Printf`, `Sprintf`
//!
//! `make` is not listed here: it is a special form handled by the evaluator
//! because its argument may be a type rather than a value.

use std::sync::Arc;

use crate::reflect::ReflectCache;
use crate::scope::Scope;

pub(crate) mod core;
pub(crate) mod fmt;
pub(crate) mod strings;

pub use strings::StringBuilder;

/// Publish the whole surface into `scope`
pub(crate) fn install(scope: &Arc<Scope>, reflect: &Arc<ReflectCache>) {
    core::install(scope, reflect);
    strings::install(scope);
    fmt::install(scope);
}
