//! Static-type queries the checker needs from its host.
//!
//! The checker itself only walks declarations and expressions; whenever it
//! needs to know "what type does this expression flow into", it asks a
//! [`TypeOracle`]. [`ProgramOracle`] answers those queries for the arena
//! program model by running one prepass that records the declared target
//! type of every expression in a flow position.

use rustc_hash::FxHashMap;
use uivet_ast::{Block, ExprId, ExprKind, MethodId, Program, Stmt, TypeUse, UseQualifier};

use crate::lattice::Effect;

/// The resolved target of a call expression: the callee and the declared
/// types of its formal parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSignature {
    pub callee: MethodId,
    pub params: Vec<TypeUse>,
}

/// Answers the static-type questions the traversal cannot answer from a
/// single node.
pub trait TypeOracle {
    /// The declared type an expression is assigned, passed, or returned
    /// into, when it sits in such a position.
    fn assignment_target(&self, program: &Program, node: ExprId) -> Option<TypeUse>;

    /// The combined static type of the branches of a conditional.
    fn branch_lub(&self, program: &Program, types: &[TypeUse]) -> TypeUse;

    /// The signature of the method a call resolves to.
    fn call_target(&self, program: &Program, call: ExprId) -> Option<CallSignature>;
}

/// [`TypeOracle`] for the arena program model.
#[derive(Debug, Default)]
pub struct ProgramOracle {
    targets: FxHashMap<ExprId, TypeUse>,
}

impl ProgramOracle {
    /// Builds the oracle by walking every method body and initializer
    /// once, recording the declared target type of each expression in a
    /// flow position.
    pub fn new(program: &Program) -> Self {
        let mut oracle = Self::default();
        for (_, class) in program.classes() {
            for &init in &class.initializers {
                oracle.collect_expr(program, init, None);
            }
        }
        for (_, method) in program.methods() {
            if let Some(body) = &method.body {
                oracle.collect_block(program, body, method.return_type);
            }
        }
        oracle
    }

    fn collect_block(&mut self, program: &Program, block: &Block, return_target: Option<TypeUse>) {
        for stmt in &block.stmts {
            match stmt {
                Stmt::Expr(expr) => self.collect_expr(program, *expr, return_target),
                Stmt::Let { ty, init, .. } => {
                    if let Some(init) = *init {
                        self.record_target(program, init, *ty);
                        self.collect_expr(program, init, return_target);
                    }
                }
                Stmt::Return { value, .. } => {
                    if let Some(value) = *value {
                        if let Some(target) = return_target {
                            self.record_target(program, value, target);
                        }
                        self.collect_expr(program, value, return_target);
                    }
                }
            }
        }
    }

    fn collect_expr(&mut self, program: &Program, expr: ExprId, return_target: Option<TypeUse>) {
        match &program.expr(expr).kind {
            ExprKind::Call { callee, args, .. } => {
                let params = program.method(*callee).params.clone();
                for (index, &arg) in args.iter().enumerate() {
                    if let Some(param) = params.get(index) {
                        self.record_target(program, arg, param.ty);
                    }
                    self.collect_expr(program, arg, return_target);
                }
            }
            ExprKind::Closure { iface, body } => {
                // Returns inside the literal flow into its own signature,
                // not the enclosing method's.
                let closure_return = program.method(*iface).return_type;
                self.collect_block(program, body, closure_return);
            }
            ExprKind::Assign { target, value } => {
                self.record_target(program, *value, *target);
                self.collect_expr(program, *value, return_target);
            }
            ExprKind::Cond {
                then_branch,
                else_branch,
            } => {
                self.collect_expr(program, *then_branch, return_target);
                self.collect_expr(program, *else_branch, return_target);
            }
            ExprKind::New { .. } | ExprKind::Name(_) => {}
        }
    }

    /// Records the target type of an expression. A conditional passes its
    /// target through to both branches, so a literal inside either branch
    /// sees the same target as the conditional itself.
    fn record_target(&mut self, program: &Program, expr: ExprId, target: TypeUse) {
        self.targets.insert(expr, target);
        if let ExprKind::Cond {
            then_branch,
            else_branch,
        } = &program.expr(expr).kind
        {
            self.record_target(program, *then_branch, target);
            self.record_target(program, *else_branch, target);
        }
    }
}

impl TypeOracle for ProgramOracle {
    fn assignment_target(&self, _program: &Program, node: ExprId) -> Option<TypeUse> {
        self.targets.get(&node).copied()
    }

    fn branch_lub(&self, _program: &Program, types: &[TypeUse]) -> TypeUse {
        let Some((first, rest)) = types.split_first() else {
            return TypeUse::untagged();
        };

        let mut effect = Effect::from_qualifier(first.qualifier);
        let mut class = first.class;
        let mut span = first.span;
        for ty in rest {
            effect = Effect::lub(effect, Effect::from_qualifier(ty.qualifier));
            if class != ty.class {
                class = None;
            }
            span = span.merge(ty.span);
        }

        let qualifier = match effect {
            Effect::Safe => UseQualifier::Safe,
            Effect::Poly => UseQualifier::Poly,
            Effect::Ui => UseQualifier::Ui,
        };
        TypeUse {
            class,
            qualifier,
            span,
        }
    }

    fn call_target(&self, program: &Program, call: ExprId) -> Option<CallSignature> {
        match &program.expr(call).kind {
            ExprKind::Call { callee, .. } => Some(CallSignature {
                callee: *callee,
                params: program.method(*callee).params.iter().map(|p| p.ty).collect(),
            }),
            _ => None,
        }
    }
}
