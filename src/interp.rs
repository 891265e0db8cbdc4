// ABOUTME: The interpreter facade: root scope, global object, shared caches, and fork

use std::sync::{Arc, RwLock};

use crate::cache::AstCache;
use crate::error::Error;
use crate::eval::{self, Ctx, Flow};
use crate::host::{HostFn, ParamKind};
use crate::parser;
use crate::reflect::ReflectCache;
use crate::scope::Scope;
use crate::stdlib;
use crate::value::{self, Value};

/// Engine configuration.
///
/// `strict_names` upgrades unbound identifiers from a diagnostic-plus-null
/// to a hard error. It defaults to off: scripts are routinely run against
/// host pre-bindings that may not be set, and those scripts must keep
/// working.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub strict_names: bool,
}

/// One script engine instance. Evaluation runs on the caller's thread, one
/// script at a time; forked instances are independent and share the parse
/// and reflection caches.
pub struct Interpreter {
    root: Arc<Scope>,
    global: RwLock<Value>,
    asts: Arc<AstCache>,
    reflect: Arc<ReflectCache>,
    config: Config,
    forked: bool,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let root = Scope::root();
        let reflect = Arc::new(ReflectCache::new());
        stdlib::install(&root, &reflect);
        Interpreter {
            root,
            global: RwLock::new(Value::Null),
            asts: Arc::new(AstCache::new()),
            reflect,
            config,
            forked: false,
        }
    }

    /// Publish a value under a top-level name. On a forked instance this
    /// binds into the fork's own root frame; the origin never sees it.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.root.declare(name, value.into());
    }

    /// Publish a host callable under a top-level name
    pub fn set_fn(
        &self,
        name: &str,
        params: &[ParamKind],
        f: impl Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    ) {
        self.set(name, HostFn::new(name, params, f));
    }

    /// Set the object reachable as `G` and used as the identifier-miss
    /// fallback. Pass [`Value::from_shared`] when script assignments such as
    /// `G.X = 3` must be visible to the host.
    pub fn set_global(&self, value: impl Into<Value>) {
        *value::write(&self.global) = value.into();
    }

    pub fn get_global(&self) -> Value {
        value::read(&self.global).clone()
    }

    pub fn is_fork(&self) -> bool {
        self.forked
    }

    /// A cheap clone for parallel use: reads the origin's root bindings
    /// through a barrier frame, writes only to its own side of the barrier,
    /// shares both caches, and starts from the origin's current global
    /// object.
    pub fn fork(&self) -> Interpreter {
        Interpreter {
            root: Scope::fork_root(&self.root),
            global: RwLock::new(self.get_global()),
            asts: Arc::clone(&self.asts),
            reflect: Arc::clone(&self.reflect),
            config: self.config.clone(),
            forked: true,
        }
    }

    /// Parse (or retrieve from cache) and evaluate `source`, returning the
    /// value of its final statement or explicit `return`.
    pub fn interpret(&self, source: &str) -> Result<Value, Error> {
        let program = self.asts.get_or_parse(source, || parser::parse(source))?;
        let ctx = Ctx {
            global: &self.global,
            reflect: &self.reflect,
            strict_names: self.config.strict_names,
        };
        let scope = Scope::child(&self.root);
        match eval::eval_block_in(&ctx, &program, &scope)? {
            Flow::Value(v) => Ok(v),
            Flow::Return(v) => Ok(v.unwrap_or(Value::Null)),
            Flow::Break | Flow::Continue => Err(Error::UnsupportedNode(
                "break or continue outside of a loop".to_string(),
            )),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_returns_last_value() {
        let interp = Interpreter::new();
        assert_eq!(interp.interpret("x := 41; x + 1").unwrap(), Value::Int(42));
    }

    #[test]
    fn test_set_binds_into_root() {
        let interp = Interpreter::new();
        interp.set("n", 5i64);
        assert_eq!(interp.interpret("n * 2").unwrap(), Value::Int(10));
    }

    #[test]
    fn test_fork_reads_origin_but_writes_isolated() {
        let origin = Interpreter::new();
        origin.set("shared", 1i64);
        let fork = origin.fork();
        assert!(fork.is_fork());
        assert_eq!(fork.interpret("shared").unwrap(), Value::Int(1));
        fork.set("mine", 2i64);
        assert_eq!(fork.interpret("mine").unwrap(), Value::Int(2));
        // the origin resolves leniently to null, proving isolation
        assert_eq!(origin.interpret("mine").unwrap(), Value::Null);
        // assignment in the fork shadows instead of mutating the origin
        fork.interpret("shared = 5").unwrap();
        assert_eq!(fork.interpret("shared").unwrap(), Value::Int(5));
        assert_eq!(origin.interpret("shared").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_strict_names() {
        let interp = Interpreter::with_config(Config { strict_names: true });
        assert!(matches!(
            interp.interpret("missing"),
            Err(Error::UndefinedName(_))
        ));
    }

    #[test]
    fn test_parse_error_surfaces() {
        let interp = Interpreter::new();
        assert!(matches!(interp.interpret("1 +"), Err(Error::Parse(_))));
    }
}
