//! The effect checker traversal.
//!
//! A single pass over the declaration tree that validates every
//! annotation, resolves the effect of every declaration, and checks every
//! call site against the effect its enclosing context permits. Function
//! literals with polymorphic signatures are inferred along the way: they
//! start polymorphic and are promoted to the UI effect when their body
//! performs a UI call or when they flow into a UI-qualified target.
//!
//! Findings accumulate in insertion order and never stop the traversal.
//! Only a structural defect in the traversal itself (a context stack
//! imbalance) aborts the run.

use uivet_ast::{
    Block, ClassId, EffectTag, ExprId, ExprKind, MethodId, Program, Span, Stmt, TypeUse,
    UseQualifier,
};
use uivet_diagnostics::Diagnostic;

use crate::context::{ContextFrame, ContextStack};
use crate::infer::LambdaInference;
use crate::lattice::Effect;
use crate::oracle::{ProgramOracle, TypeOracle};
use crate::resolve::DeclEffects;
use crate::violation::{CheckError, EffectViolation};

/// The outcome of a checking run.
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Every finding, in discovery order.
    pub violations: Vec<EffectViolation>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.is_error())
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.violations.iter().map(|v| v.to_diagnostic()).collect()
    }
}

/// Checks a whole program with the default oracle.
pub fn check_program(program: &Program) -> Result<CheckReport, CheckError> {
    let oracle = ProgramOracle::new(program);
    EffectChecker::new(program, oracle).check()
}

/// The checker traversal state.
pub struct EffectChecker<'p, O: TypeOracle> {
    program: &'p Program,
    oracle: O,
    effects: DeclEffects,
    lambdas: LambdaInference,
    stack: ContextStack,
    violations: Vec<EffectViolation>,
    trace: bool,
}

impl<'p, O: TypeOracle> EffectChecker<'p, O> {
    pub fn new(program: &'p Program, oracle: O) -> Self {
        Self {
            program,
            oracle,
            effects: DeclEffects::new(),
            lambdas: LambdaInference::new(),
            stack: ContextStack::new(),
            violations: Vec::new(),
            trace: false,
        }
    }

    /// Enables tracing of resolution and promotion decisions to stderr.
    pub fn with_trace(mut self) -> Self {
        self.trace = true;
        self
    }

    /// Runs the checker over every top-level class.
    pub fn check(mut self) -> Result<CheckReport, CheckError> {
        for &class in &self.program.top_level {
            self.check_class(class)?;
        }
        debug_assert!(self.stack.is_empty(), "unbalanced context stack");
        Ok(CheckReport {
            violations: self.violations,
        })
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn check_class(&mut self, class: ClassId) -> Result<(), CheckError> {
        let decl = self.program.class(class);
        if self.trace {
            eprintln!("[uivet] checking class {} ({})", decl.name, class);
        }
        // The whole class body sits under an initializer frame, so field
        // and static initializers run in a UI-permitted context.
        self.with_frame(ContextFrame::Initializer, |this| {
            let decl = this.program.class(class);
            for &init in &decl.initializers {
                this.check_expr(init)?;
            }
            for &method in &decl.methods {
                this.check_method(method)?;
            }
            for &nested in &decl.nested {
                this.check_class(nested)?;
            }
            Ok(())
        })
    }

    fn check_method(&mut self, method: MethodId) -> Result<(), CheckError> {
        self.validate_declaration(method);

        let decl = self.program.method(method);
        for param in &decl.params {
            self.check_type_use(param.ty);
        }
        if let Some(ret) = decl.return_type {
            self.check_type_use(ret);
        }

        let Some(body) = &decl.body else {
            return Ok(());
        };
        let effect = self.effects.declared_effect(self.program, method);
        if self.trace {
            eprintln!("[uivet] entering {} ({}) as {}", decl.name, method, effect);
        }
        self.with_frame(ContextFrame::Method { method, effect }, |this| {
            this.check_block(body)
        })
    }

    /// Validates the annotations on a declaration: tag conflicts, invalid
    /// polymorphism, redundancy, and override narrowing.
    fn validate_declaration(&mut self, method: MethodId) {
        let decl = self.program.method(method);
        let enclosing = self.program.enclosing_class(method);

        if decl.tags.len() > 1 {
            let span = decl
                .tags
                .iter()
                .map(|t| t.span)
                .reduce(Span::merge)
                .unwrap_or(decl.span);
            self.report(EffectViolation::ConflictingEffectAnnotations { method, span });
            return;
        }

        let Some(tag) = decl.explicit_tag() else {
            return;
        };
        let span = decl.tags[0].span;
        match tag {
            EffectTag::Poly if !enclosing.effect_poly => {
                self.report(EffectViolation::InvalidPolymorphismUse { method, span });
            }
            EffectTag::Ui if enclosing.is_ui() => {
                self.report(EffectViolation::RedundantEffectAnnotation { method, span });
            }
            _ => {}
        }

        // An explicitly tagged override must not exceed any overridden
        // declaration's effect. Untagged overrides inherit instead.
        let effect = self.effects.declared_effect(self.program, method);
        for &ancestor in &decl.overrides {
            let required = self.effects.declared_effect(self.program, ancestor);
            if !Effect::le(effect, required) {
                self.report(EffectViolation::InvalidOverrideEffect {
                    method,
                    found: effect,
                    required,
                    span,
                });
            }
        }
    }

    /// A UI-qualified use of a type is only valid when the declaration is
    /// itself UI-tagged or polymorphic over effect qualifiers.
    fn check_type_use(&mut self, ty: TypeUse) {
        if ty.qualifier != UseQualifier::Ui {
            return;
        }
        let Some(class) = ty.class else {
            return;
        };
        let decl = self.program.class(class);
        if decl.effect_poly || decl.is_ui() {
            return;
        }
        self.report(EffectViolation::InvalidTypeUse {
            class,
            span: ty.span,
        });
    }

    // ========================================================================
    // Statements and expressions
    // ========================================================================

    fn check_block(&mut self, block: &Block) -> Result<(), CheckError> {
        for stmt in &block.stmts {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), CheckError> {
        match stmt {
            Stmt::Expr(expr) => self.check_expr(*expr),
            Stmt::Let { ty, init, .. } => {
                self.check_type_use(*ty);
                if let Some(init) = *init {
                    self.promote_into_target(init, *ty);
                    self.check_expr(init)?;
                    self.check_literal_flow(init, *ty);
                }
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let Some(value) = *value else {
                    return Ok(());
                };
                let target = self.oracle.assignment_target(self.program, value);
                if let Some(target) = target {
                    self.promote_into_target(value, target);
                }
                self.check_expr(value)?;
                if let Some(target) = target {
                    self.check_literal_flow(value, target);
                }
                Ok(())
            }
        }
    }

    fn check_expr(&mut self, expr: ExprId) -> Result<(), CheckError> {
        match &self.program.expr(expr).kind {
            ExprKind::Name(_) => Ok(()),
            ExprKind::New { class, qualifier } => {
                let span = self.program.expr(expr).span;
                self.check_type_use(TypeUse::of_class(*class, *qualifier).with_span(span));
                Ok(())
            }
            ExprKind::Cond {
                then_branch,
                else_branch,
            } => {
                self.check_expr(*then_branch)?;
                self.check_expr(*else_branch)
            }
            ExprKind::Assign { target, value } => {
                self.check_type_use(*target);
                self.promote_into_target(*value, *target);
                self.check_expr(*value)?;
                self.check_literal_flow(*value, *target);
                Ok(())
            }
            ExprKind::Closure { iface, body } => {
                // Seed the inference record before entering the body so
                // calls inside it can promote the literal.
                let nominal = self.effects.declared_effect(self.program, *iface);
                self.lambdas.effect_of(expr, nominal);
                self.with_frame(ContextFrame::Literal { node: expr }, |this| {
                    this.check_block(body)
                })
            }
            ExprKind::Call { .. } => self.check_call(expr),
        }
    }

    // ========================================================================
    // Call sites
    // ========================================================================

    fn check_call(&mut self, expr: ExprId) -> Result<(), CheckError> {
        let ExprKind::Call {
            callee,
            receiver_tag,
            args,
        } = &self.program.expr(expr).kind
        else {
            return Ok(());
        };
        let (callee, receiver_tag) = (*callee, *receiver_tag);
        let span = self.program.expr(expr).span;

        // Literal arguments flowing into UI-qualified parameters are
        // promoted before anything else is checked, so the body check and
        // the final compatibility check both see the constrained effect.
        let param_types: Vec<Option<TypeUse>> = {
            let params = &self.program.method(callee).params;
            (0..args.len()).map(|i| params.get(i).map(|p| p.ty)).collect()
        };
        for (&arg, ty) in args.iter().zip(&param_types) {
            if let Some(ty) = ty {
                self.promote_into_target(arg, *ty);
            }
        }

        // The callee's effective effect, with polymorphism resolved by
        // the receiver's instantiation tag when one is known.
        let mut target = self.effects.declared_effect(self.program, callee);
        if target.is_poly() {
            if let Some(tag) = receiver_tag {
                target = Effect::from(tag);
            }
        }

        let mut caller = self.caller_effect()?;

        // A UI call inside a still-polymorphic literal promotes the
        // literal rather than reporting a violation.
        if target.is_ui() && caller.is_poly() {
            if let Some(ContextFrame::Literal { node }) = self.stack.top() {
                if self.constrain_literal(node) {
                    if self.trace {
                        eprintln!("[uivet] promoted literal {} to {}", node, Effect::Ui);
                    }
                    caller = self.caller_effect()?;
                }
            }
        }

        if !Effect::le(target, caller) {
            self.report(EffectViolation::CallEffectViolation {
                callee: target,
                caller,
                span,
            });
        }

        for &arg in args {
            self.check_expr(arg)?;
        }

        // Final compatibility pass over literal arguments, now that body
        // traversal may have promoted them.
        if let Some(sig) = self.oracle.call_target(self.program, expr) {
            for (index, &arg) in args.iter().enumerate() {
                let Some(param) = sig.params.get(index) else {
                    continue;
                };
                self.check_literal_flow(arg, *param);
            }
        }
        Ok(())
    }

    /// The effect the innermost context permits. An empty stack is the top
    /// level, which is treated as UI-permitted.
    fn caller_effect(&mut self) -> Result<Effect, CheckError> {
        match self.stack.top() {
            None | Some(ContextFrame::Initializer) => Ok(Effect::Ui),
            Some(ContextFrame::Method { effect, .. }) => Ok(effect),
            Some(ContextFrame::Literal { node }) => match &self.program.expr(node).kind {
                ExprKind::Closure { iface, .. } => {
                    let nominal = self.effects.declared_effect(self.program, *iface);
                    Ok(self.lambdas.effect_of(node, nominal))
                }
                _ => Err(CheckError::UndeterminedContext {
                    span: self.program.expr(node).span,
                }),
            },
        }
    }

    // ========================================================================
    // Literal promotion and flow compatibility
    // ========================================================================

    /// Promotes every function literal flowing into a UI-qualified target,
    /// looking through conditional branches.
    fn promote_into_target(&mut self, expr: ExprId, target: TypeUse) {
        if !target.is_ui() {
            return;
        }
        self.promote_literals(expr);
    }

    fn promote_literals(&mut self, expr: ExprId) {
        match &self.program.expr(expr).kind {
            ExprKind::Closure { .. } => {
                if self.constrain_literal(expr) && self.trace {
                    eprintln!("[uivet] promoted literal {} to {}", expr, Effect::Ui);
                }
            }
            ExprKind::Cond {
                then_branch,
                else_branch,
            } => {
                let (then_branch, else_branch) = (*then_branch, *else_branch);
                self.promote_literals(then_branch);
                self.promote_literals(else_branch);
            }
            _ => {}
        }
    }

    fn constrain_literal(&mut self, node: ExprId) -> bool {
        let ExprKind::Closure { iface, .. } = &self.program.expr(node).kind else {
            return false;
        };
        let nominal = self.effects.declared_effect(self.program, *iface);
        self.lambdas.constrain_to_ui(node, nominal)
    }

    /// The static type of an expression that is (or combines) function
    /// literals, after inference. Branch types of a conditional are
    /// combined by the oracle. `None` for anything else.
    fn literal_static_type(&mut self, expr: ExprId) -> Option<TypeUse> {
        match &self.program.expr(expr).kind {
            ExprKind::Closure { iface, .. } => {
                let iface = *iface;
                let nominal = self.effects.declared_effect(self.program, iface);
                let qualifier = match self.lambdas.effect_of(expr, nominal) {
                    Effect::Safe => UseQualifier::Safe,
                    Effect::Poly => UseQualifier::Poly,
                    Effect::Ui => UseQualifier::Ui,
                };
                let span = self.program.expr(expr).span;
                let class = self.program.method(iface).class;
                Some(TypeUse::of_class(class, qualifier).with_span(span))
            }
            ExprKind::Cond {
                then_branch,
                else_branch,
            } => {
                let (then_branch, else_branch) = (*then_branch, *else_branch);
                let then_ty = self.literal_static_type(then_branch);
                let else_ty = self.literal_static_type(else_branch);
                match (then_ty, else_ty) {
                    (Some(a), Some(b)) => Some(self.oracle.branch_lub(self.program, &[a, b])),
                    (Some(a), None) | (None, Some(a)) => Some(a),
                    (None, None) => None,
                }
            }
            _ => None,
        }
    }

    /// Checks a literal-bearing expression against the target it flows
    /// into. A polymorphic target instantiates to the literal's effect, so
    /// only a safe target can reject a UI-constrained literal.
    fn check_literal_flow(&mut self, expr: ExprId, target: TypeUse) {
        let Some(ty) = self.literal_static_type(expr) else {
            return;
        };
        let found = Effect::from_qualifier(ty.qualifier);
        let expected = Effect::from_qualifier(target.qualifier);
        if found.is_ui() && expected.is_safe() {
            self.report(EffectViolation::IncompatibleArgument {
                found,
                expected,
                span: self.program.expr(expr).span,
            });
        }
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    fn with_frame(
        &mut self,
        frame: ContextFrame,
        f: impl FnOnce(&mut Self) -> Result<(), CheckError>,
    ) -> Result<(), CheckError> {
        self.stack.push(frame);
        let result = f(self);
        self.stack.pop()?;
        result
    }

    fn report(&mut self, violation: EffectViolation) {
        if self.trace {
            eprintln!("[uivet] {}: {}", violation.code(), violation);
        }
        self.violations.push(violation);
    }
}
