//! Functions callable from snippets, grouped into namespaces, and the type
//! factories behind `new(type)`.

use crate::script::eval::RuntimeError;
use crate::session::Session;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

/// Everything a native function may touch while it runs.
pub struct CallContext<'a> {
    pub session: &'a mut Session,
    pub factories: &'a TypeFactories,
}

/// Signature of a function callable from snippets.
pub type NativeFn = fn(&mut CallContext<'_>, &[Value]) -> Result<Value, RuntimeError>;

/// A named function and the namespace that must be enabled to call it.
#[derive(Clone)]
pub struct Function {
    pub name: &'static str,
    pub namespace: &'static str,
    pub min_args: usize,
    /// `None` for variadic functions.
    pub max_args: Option<usize>,
    pub call: NativeFn,
}

impl Function {
    const fn new(
        namespace: &'static str,
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        call: NativeFn,
    ) -> Self {
        Self {
            name,
            namespace,
            min_args,
            max_args,
            call,
        }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.is_none_or(|max| count <= max)
    }

    /// Human readable arity, e.g. `1`, `1-2` or `at least 1`.
    pub fn arity(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{}-{}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }
}

/// Default-value constructors keyed by type name.
///
/// Populated explicitly at startup; `new("number")` looks up `number` here.
#[derive(Clone, Default)]
pub struct TypeFactories {
    factories: BTreeMap<String, fn() -> Value>,
}

impl TypeFactories {
    /// Factories for every [`Value`] type.
    pub fn standard() -> Self {
        let mut factories = Self::default();
        factories.register("null", || Value::Null);
        factories.register("bool", || Value::Bool(false));
        factories.register("number", || Value::Number(0.0));
        factories.register("text", || Value::Text(String::new()));
        factories
    }

    pub fn register(&mut self, type_name: impl Into<String>, factory: fn() -> Value) {
        self.factories.insert(type_name.into(), factory);
    }

    pub fn create(&self, type_name: &str) -> Option<Value> {
        self.factories.get(type_name).map(|factory| factory())
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

/// The set of functions known to the snippet engine.
#[derive(Clone, Default)]
pub struct Library {
    functions: HashMap<&'static str, Function>,
    factories: TypeFactories,
}

impl Library {
    /// The `core`, `math` and `text` namespaces plus the standard type factories.
    pub fn standard() -> Self {
        let mut library = Self {
            functions: HashMap::new(),
            factories: TypeFactories::standard(),
        };
        for function in CORE.iter().chain(MATH).chain(TEXT) {
            library.register(function.clone());
        }
        library
    }

    /// Add or replace a function.
    pub fn register(&mut self, function: Function) {
        self.functions.insert(function.name, function);
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn factories(&self) -> &TypeFactories {
        &self.factories
    }

    /// Sorted, de-duplicated namespace names.
    pub fn namespaces(&self) -> Vec<&'static str> {
        let mut namespaces: Vec<_> = self.functions.values().map(|f| f.namespace).collect();
        namespaces.sort_unstable();
        namespaces.dedup();
        namespaces
    }

    /// Function names of `namespace`, sorted.
    pub fn functions_in(&self, namespace: &str) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .functions
            .values()
            .filter(|f| f.namespace == namespace)
            .map(|f| f.name)
            .collect();
        names.sort_unstable();
        names
    }
}

fn number(function: &str, value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(RuntimeError::function(
            function,
            format!("expected number, got {}", other.type_name()),
        )),
    }
}

fn text<'v>(function: &str, value: &'v Value) -> Result<&'v str, RuntimeError> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(RuntimeError::function(
            function,
            format!("expected text, got {}", other.type_name()),
        )),
    }
}

const CORE: &[Function] = &[
    Function::new("core", "log", 1, Some(1), |ctx, args| {
        ctx.session.output.push_result(args[0].to_string());
        Ok(Value::Null)
    }),
    Function::new("core", "typeof", 1, Some(1), |_, args| {
        Ok(Value::from(args[0].type_name()))
    }),
    Function::new("core", "str", 1, Some(1), |_, args| {
        Ok(Value::Text(args[0].to_string()))
    }),
    Function::new("core", "num", 1, Some(1), |_, args| match &args[0] {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::Bool(b) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| RuntimeError::function("num", format!("cannot convert {:?} to number", s))),
        Value::Null => Err(RuntimeError::function("num", "cannot convert null to number")),
    }),
    Function::new("core", "new", 1, Some(1), |ctx, args| {
        let type_name = text("new", &args[0])?;
        ctx.factories.create(type_name).ok_or_else(|| {
            let known: Vec<_> = ctx.factories.type_names().collect();
            RuntimeError::function(
                "new",
                format!("unknown type `{}` (known: {})", type_name, known.join(", ")),
            )
        })
    }),
];

const MATH: &[Function] = &[
    Function::new("math", "abs", 1, Some(1), |_, args| {
        Ok(Value::Number(number("abs", &args[0])?.abs()))
    }),
    Function::new("math", "floor", 1, Some(1), |_, args| {
        Ok(Value::Number(number("floor", &args[0])?.floor()))
    }),
    Function::new("math", "ceil", 1, Some(1), |_, args| {
        Ok(Value::Number(number("ceil", &args[0])?.ceil()))
    }),
    Function::new("math", "round", 1, Some(1), |_, args| {
        Ok(Value::Number(number("round", &args[0])?.round()))
    }),
    Function::new("math", "sqrt", 1, Some(1), |_, args| {
        let n = number("sqrt", &args[0])?;
        if n < 0.0 {
            return Err(RuntimeError::function("sqrt", "negative argument"));
        }
        Ok(Value::Number(n.sqrt()))
    }),
    Function::new("math", "pow", 2, Some(2), |_, args| {
        let base = number("pow", &args[0])?;
        let exp = number("pow", &args[1])?;
        Ok(Value::Number(base.powf(exp)))
    }),
    Function::new("math", "min", 1, None, |_, args| {
        let mut best = f64::INFINITY;
        for arg in args {
            best = best.min(number("min", arg)?);
        }
        Ok(Value::Number(best))
    }),
    Function::new("math", "max", 1, None, |_, args| {
        let mut best = f64::NEG_INFINITY;
        for arg in args {
            best = best.max(number("max", arg)?);
        }
        Ok(Value::Number(best))
    }),
];

const TEXT: &[Function] = &[
    Function::new("text", "len", 1, Some(1), |_, args| {
        Ok(Value::Number(text("len", &args[0])?.chars().count() as f64))
    }),
    Function::new("text", "upper", 1, Some(1), |_, args| {
        Ok(Value::Text(text("upper", &args[0])?.to_uppercase()))
    }),
    Function::new("text", "lower", 1, Some(1), |_, args| {
        Ok(Value::Text(text("lower", &args[0])?.to_lowercase()))
    }),
    Function::new("text", "trim", 1, Some(1), |_, args| {
        Ok(Value::Text(text("trim", &args[0])?.trim().to_string()))
    }),
    Function::new("text", "contains", 2, Some(2), |_, args| {
        let haystack = text("contains", &args[0])?;
        let needle = text("contains", &args[1])?;
        Ok(Value::Bool(haystack.contains(needle)))
    }),
    Function::new("text", "replace", 3, Some(3), |_, args| {
        let s = text("replace", &args[0])?;
        let from = text("replace", &args[1])?;
        let to = text("replace", &args[2])?;
        if from.is_empty() {
            return Err(RuntimeError::function("replace", "pattern must not be empty"));
        }
        Ok(Value::Text(s.replace(from, to)))
    }),
    Function::new("text", "concat", 1, None, |_, args| {
        Ok(Value::Text(args.iter().map(Value::to_string).collect()))
    }),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn call(library: &Library, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let mut session = Session::default();
        let function = library.function(name).unwrap();
        let mut ctx = CallContext {
            session: &mut session,
            factories: library.factories(),
        };
        (function.call)(&mut ctx, args)
    }

    #[test]
    fn test_standard_namespaces() {
        let library = Library::standard();
        assert_eq!(library.namespaces(), vec!["core", "math", "text"]);
        assert!(library.functions_in("math").contains(&"sqrt"));
        assert_eq!(library.function("sqrt").unwrap().namespace, "math");
    }

    #[test]
    fn test_arity() {
        let library = Library::standard();
        let pow = library.function("pow").unwrap();
        assert!(pow.accepts(2));
        assert!(!pow.accepts(1));
        assert_eq!(pow.arity(), "2");

        let max = library.function("max").unwrap();
        assert!(max.accepts(5));
        assert!(!max.accepts(0));
        assert_eq!(max.arity(), "at least 1");
    }

    #[test]
    fn test_math_functions() {
        let library = Library::standard();
        assert_eq!(
            call(&library, "max", &[Value::from(3), Value::from(9), Value::from(-1)]),
            Ok(Value::from(9))
        );
        assert_eq!(call(&library, "pow", &[Value::from(2), Value::from(10)]), Ok(Value::from(1024)));
        assert!(call(&library, "sqrt", &[Value::from(-4)]).is_err());
        assert!(call(&library, "abs", &[Value::from("x")]).is_err());
    }

    #[test]
    fn test_text_functions() {
        let library = Library::standard();
        assert_eq!(call(&library, "upper", &[Value::from("abc")]), Ok(Value::from("ABC")));
        assert_eq!(call(&library, "len", &[Value::from("héllo")]), Ok(Value::from(5)));
        assert_eq!(
            call(&library, "concat", &[Value::from("hp="), Value::from(10)]),
            Ok(Value::from("hp=10"))
        );
        assert_eq!(
            call(&library, "replace", &[Value::from("a-b-c"), Value::from("-"), Value::from("+")]),
            Ok(Value::from("a+b+c"))
        );
    }

    #[test]
    fn test_new_uses_type_factories() {
        let library = Library::standard();
        assert_eq!(call(&library, "new", &[Value::from("number")]), Ok(Value::from(0)));
        assert_eq!(call(&library, "new", &[Value::from("text")]), Ok(Value::from("")));
        assert!(call(&library, "new", &[Value::from("vector3")]).is_err());
    }

    #[test]
    fn test_log_appends_result_line() {
        let library = Library::standard();
        let mut session = Session::default();
        let mut ctx = CallContext {
            session: &mut session,
            factories: library.factories(),
        };
        let log = library.function("log").unwrap();
        assert_eq!((log.call)(&mut ctx, &[Value::from("hi")]), Ok(Value::Null));
        assert_eq!(session.output.snapshot()[0].text, "hi");
    }

    #[test]
    fn test_num_conversions() {
        let library = Library::standard();
        assert_eq!(call(&library, "num", &[Value::from(" 4.5 ")]), Ok(Value::from(4.5)));
        assert_eq!(call(&library, "num", &[Value::from(true)]), Ok(Value::from(1)));
        assert!(call(&library, "num", &[Value::from("four")]).is_err());
    }
}
