//! Unified environment for compiling expressions.
//!
//! The `Env` owns the declarations, object types and native functions an
//! expression may use, plus the options for each pipeline stage. It hands
//! them out by reference to the parser, checker and compiler.

use gavel_parser::{parse_with_options, ParseOptions, ParseResult, SpannedExpr};

use crate::checker::{check_with_policy, CheckResult};
use crate::compiler::{CompileError, Compiler};
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::eval::{EvalOptions, FunctionRegistry, Program};
use crate::stdlib::standard_library;
use crate::types::{
    Declarations, FunctionDecl, NumericLiteralPolicy, ObjectType, OverloadDecl, Type, TypeRegistry,
};

/// Environment for compiling expressions into [`Program`]s.
///
/// # Example
///
/// ```
/// use gavel::{Env, MapActivation, Type, Value};
///
/// let env = Env::with_standard_library()
///     .with_variable("name", Type::String)
///     .with_variable("group", Type::String);
///
/// let program = env.compile(r#"name.startsWith("/groups/" + group)"#).unwrap();
/// let activation = MapActivation::new()
///     .with("name", "/groups/admin/alice")
///     .with("group", "admin");
/// assert_eq!(program.evaluate(&activation), Ok(Value::Bool(true)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Env {
    declarations: Declarations,
    types: TypeRegistry,
    functions: FunctionRegistry,
    numeric_literals: NumericLiteralPolicy,
    parse_options: ParseOptions,
    eval_options: EvalOptions,
}

impl Env {
    /// Create a new empty environment.
    ///
    /// This environment has no functions or variables defined.
    /// Use `with_standard_library()` for the built-in functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new environment with the standard library declared and
    /// registered.
    pub fn with_standard_library() -> Self {
        let mut env = Self::new();
        for decl in standard_library() {
            env.declare_function(decl);
        }
        env
    }

    /// Add a variable to the environment (builder pattern).
    pub fn with_variable(mut self, name: impl Into<String>, var_type: Type) -> Self {
        self.declare_variable(name, var_type);
        self
    }

    /// Add a variable to the environment (mutable).
    pub fn declare_variable(&mut self, name: impl Into<String>, var_type: Type) {
        self.declarations.add_variable(name, var_type);
    }

    /// Add a function declaration (builder pattern).
    ///
    /// Overloads carrying an implementation are registered for evaluation
    /// as well.
    pub fn with_function(mut self, decl: FunctionDecl) -> Self {
        self.declare_function(decl);
        self
    }

    /// Add a function declaration (mutable).
    ///
    /// If a function with the same name already exists, overloads are merged.
    pub fn declare_function(&mut self, decl: FunctionDecl) {
        self.functions.register_decl(&decl);
        self.declarations.add_function(decl);
    }

    /// Declare and register one native overload of `name`.
    ///
    /// ```
    /// use gavel::{Env, EmptyActivation, OverloadDecl, Type, Value};
    ///
    /// let env = Env::new().with_native(
    ///     "hello",
    ///     OverloadDecl::function("hello_string", vec![Type::String], Type::String)
    ///         .with_impl(|args| match args {
    ///             [Value::String(name)] => Ok(Value::from(format!("Hello, {name}!"))),
    ///             _ => Err("expected a string".into()),
    ///         }),
    /// );
    /// let program = env.compile(r#"hello("world")"#).unwrap();
    /// assert_eq!(program.evaluate(&EmptyActivation), Ok(Value::from("Hello, world!")));
    /// ```
    pub fn with_native(self, name: impl Into<String>, overload: OverloadDecl) -> Self {
        self.with_function(FunctionDecl::new(name).with_overload(overload))
    }

    /// Register an object type with its fields.
    ///
    /// Variables of this type are declared with [`Type::object`].
    pub fn with_object_type<S, I>(mut self, name: &str, fields: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Type)>,
    {
        let object = fields
            .into_iter()
            .fold(ObjectType::new(name), |object, (field, ty)| {
                object.with_field(field, ty)
            });
        self.types.register(object);
        self
    }

    /// How unsuffixed integer literals are typed.
    pub fn with_numeric_literals(mut self, policy: NumericLiteralPolicy) -> Self {
        self.numeric_literals = policy;
        self
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    /// Limits stored in every program this environment compiles.
    pub fn with_eval_options(mut self, options: EvalOptions) -> Self {
        self.eval_options = options;
        self
    }

    pub fn declarations(&self) -> &Declarations {
        &self.declarations
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Parse an expression.
    ///
    /// The returned `ParseResult` may contain both a partial tree and errors.
    pub fn parse(&self, source: &str) -> ParseResult {
        parse_with_options(source, self.parse_options)
    }

    /// Type-check a parsed expression.
    pub fn check(&self, ast: &SpannedExpr) -> CheckResult {
        check_with_policy(ast, &self.declarations, &self.types, self.numeric_literals)
    }

    /// Compile a parsed (and optionally checked) expression.
    pub fn program(
        &self,
        ast: &SpannedExpr,
        checked: Option<&CheckResult>,
    ) -> Result<Program, CompileError> {
        self.compiler().compile(ast, checked)
    }

    /// Parse, type-check and compile `source`.
    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    pub fn compile(&self, source: &str) -> Result<Program, Diagnostics> {
        let ast = self.parse_or_report(source)?;
        let checked = self.check(&ast);
        if !checked.is_ok() {
            tracing::debug!(errors = checked.errors.len(), "type check failed");
            return Err(checked.errors.into_iter().map(Diagnostic::Check).collect());
        }
        self.program(&ast, Some(&checked)).map_err(report_compile)
    }

    /// Parse and compile `source` without type checking.
    ///
    /// Operators dispatch on runtime values and calls keep every overload
    /// with matching style and arity.
    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    pub fn compile_unchecked(&self, source: &str) -> Result<Program, Diagnostics> {
        let ast = self.parse_or_report(source)?;
        self.program(&ast, None).map_err(report_compile)
    }

    fn compiler(&self) -> Compiler<'_> {
        Compiler::new(&self.declarations, &self.functions).with_eval_options(self.eval_options)
    }

    fn parse_or_report(&self, source: &str) -> Result<SpannedExpr, Diagnostics> {
        self.parse(source).into_result().map_err(|errors| {
            tracing::debug!(errors = errors.len(), "parse failed");
            errors.into_iter().map(Diagnostic::Parse).collect()
        })
    }
}

fn report_compile(err: CompileError) -> Diagnostics {
    tracing::debug!(error = %err, "compile failed");
    Diagnostics::from(vec![Diagnostic::Compile(err)])
}

/// Compile `source` against borrowed declarations, object types and
/// functions with default options.
///
/// ```
/// use gavel::{compile, Declarations, EmptyActivation, FunctionRegistry, TypeRegistry, Value};
///
/// let program = compile(
///     "1 + 2",
///     &Declarations::new(),
///     &TypeRegistry::new(),
///     &FunctionRegistry::new(),
/// )
/// .unwrap();
/// assert_eq!(program.evaluate(&EmptyActivation), Ok(Value::Int(3)));
/// ```
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn compile(
    source: &str,
    declarations: &Declarations,
    types: &TypeRegistry,
    functions: &FunctionRegistry,
) -> Result<Program, Diagnostics> {
    let ast = parse_with_options(source, ParseOptions::default())
        .into_result()
        .map_err(|errors| errors.into_iter().map(Diagnostic::Parse).collect::<Diagnostics>())?;
    let checked = check_with_policy(&ast, declarations, types, NumericLiteralPolicy::default());
    if !checked.is_ok() {
        return Err(checked.errors.into_iter().map(Diagnostic::Check).collect());
    }
    Compiler::new(declarations, functions)
        .compile(&ast, Some(&checked))
        .map_err(report_compile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticKind;
    use crate::eval::{EmptyActivation, EvalErrorKind, MapActivation, Value};
    use crate::CheckErrorKind;

    #[test]
    fn test_new_env() {
        let env = Env::new();
        assert_eq!(env.declarations().variables().count(), 0);
        assert!(env.functions().is_empty());
    }

    #[test]
    fn test_with_standard_library() {
        let env = Env::with_standard_library();
        assert!(env.declarations().function("size").is_some());
        assert!(env.functions().contains("startsWith"));
        assert!(env.functions().contains("matches"));
    }

    #[test]
    fn test_with_variable() {
        let env = Env::new().with_variable("x", Type::Int);
        assert_eq!(env.declarations().variable("x"), Some(&Type::Int));
    }

    #[test]
    fn test_parse_uses_options() {
        let env = Env::new().with_parse_options(ParseOptions {
            max_nesting_depth: 3,
            ..ParseOptions::default()
        });
        assert!(env.parse(&format!("{}1{}", "(".repeat(10), ")".repeat(10))).is_err());
        assert!(env.parse("(1)").is_ok());
    }

    #[test]
    fn test_check_undefined_variable() {
        let env = Env::with_standard_library();
        let ast = env.parse("x + 1").ast.expect("ast");
        let checked = env.check(&ast);
        assert!(!checked.is_ok());
        assert!(checked.errors.iter().any(|e| matches!(
            &e.kind,
            CheckErrorKind::UnknownIdentifier { name } if name == "x"
        )));
    }

    #[test]
    fn test_compile_reports_parse_errors() {
        let err = Env::new().compile("1 +").unwrap_err();
        assert!(err.has_kind(DiagnosticKind::Syntax));
    }

    #[test]
    fn test_compile_unchecked_accepts_dynamic_mix() {
        let env = Env::new().with_variable("x", Type::Dyn);
        let program = env.compile_unchecked("x + 1").expect("compiles");
        let activation = MapActivation::new().with("x", 1.5);
        let err = program.evaluate(&activation).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::ArgumentTypeMismatch);
        let activation = MapActivation::new().with("x", 2);
        assert_eq!(program.evaluate(&activation), Ok(Value::Int(3)));
    }

    #[test]
    fn test_object_type_fields_are_checked() {
        let env = Env::new()
            .with_object_type("Point", [("x", Type::Int), ("y", Type::Int)])
            .with_variable("p", Type::object("Point"));
        assert!(env.compile("p.x + p.y").is_ok());
        let err = env.compile("p.z").unwrap_err();
        assert!(err.has_kind(DiagnosticKind::Type));
    }

    #[test]
    fn test_eval_options_reach_program() {
        let options = EvalOptions {
            max_steps: Some(2),
            ..EvalOptions::default()
        };
        let env = Env::new()
            .with_variable("x", Type::Int)
            .with_eval_options(options);
        let program = env.compile("x + x + x").expect("compiles");
        assert_eq!(program.options(), &options);
        let err = program
            .evaluate(&MapActivation::new().with("x", 1))
            .unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::BudgetExceeded);
    }

    #[test]
    fn test_declared_without_impl_fails_to_compile() {
        let env = Env::new().with_function(FunctionDecl::new("f").with_overload(
            OverloadDecl::function("f_int", vec![Type::Int], Type::Int),
        ));
        let err = env.compile("f(1)").unwrap_err();
        assert!(err.has_kind(DiagnosticKind::Compile));
        let program = env.compile("1").expect("compiles");
        assert_eq!(program.evaluate(&EmptyActivation), Ok(Value::Int(1)));
    }
}
