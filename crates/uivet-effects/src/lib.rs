//! uivet effect system
//!
//! A modular static checker proving that operations tagged with the UI
//! effect are only invoked from contexts permitted to perform UI work.
//!
//! The system is built from:
//!
//! - a three-point effect lattice (`Safe`, `Poly`, `Ui`) with the
//!   ordering the call-site check uses ([`lattice`])
//! - memoized resolution of every declaration's effect from explicit
//!   tags, overridden declarations, and enclosing-type defaults
//!   ([`resolve`])
//! - a calling-context stack tracking what the traversal is inside of
//!   ([`context`])
//! - one-way promotion of polymorphic function literals to the UI effect
//!   ([`infer`])
//! - static-type queries answered by a [`TypeOracle`] ([`oracle`])
//! - the traversal tying it together and producing a [`CheckReport`]
//!   ([`checker`])
//!
//! # Example
//!
//! ```rust
//! use uivet_ast::{EffectTag, ProgramBuilder, Stmt};
//! use uivet_effects::check_program;
//!
//! let mut builder = ProgramBuilder::new();
//! let app = builder.add_class("App");
//! let paint = builder.add_method(app, "paint");
//! builder.tag_method(paint, EffectTag::Ui);
//! let compute = builder.add_method(app, "compute");
//! let call = builder.call(paint, vec![]);
//! builder.set_body(compute, vec![Stmt::Expr(call)]);
//! let program = builder.finish();
//!
//! let report = check_program(&program).unwrap();
//! assert!(report.has_errors());
//! ```

pub mod checker;
pub mod context;
pub mod infer;
pub mod lattice;
pub mod oracle;
pub mod resolve;
pub mod violation;

pub use checker::{check_program, CheckReport, EffectChecker};
pub use context::{ContextFrame, ContextStack};
pub use infer::LambdaInference;
pub use lattice::{Effect, EffectRange};
pub use oracle::{CallSignature, ProgramOracle, TypeOracle};
pub use resolve::DeclEffects;
pub use violation::{CheckError, EffectViolation};
