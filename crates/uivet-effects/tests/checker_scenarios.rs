//! End-to-end checker scenarios over whole programs.

use pretty_assertions::assert_eq;
use uivet_ast::{
    EffectTag, ExprId, ExprKind, MethodId, Program, ProgramBuilder, Span, Stmt, TypeTag, TypeUse,
    UseQualifier,
};
use uivet_effects::{
    check_program, CallSignature, Effect, EffectChecker, EffectViolation, ProgramOracle,
    TypeOracle,
};

fn codes(violations: &[EffectViolation]) -> Vec<&'static str> {
    violations.iter().map(|v| v.code()).collect()
}

fn let_stmt(ty: TypeUse, init: ExprId) -> Stmt {
    Stmt::Let {
        name: "x".into(),
        ty,
        init: Some(init),
        span: Span::dummy(),
    }
}

/// A UI-tagged method to use as the forbidden callee in scenarios.
fn ui_method(b: &mut ProgramBuilder, class: uivet_ast::ClassId) -> MethodId {
    let m = b.add_method(class, "paint");
    b.tag_method(m, EffectTag::Ui);
    m
}

#[test]
fn safe_caller_cannot_invoke_ui_callee() {
    let mut b = ProgramBuilder::new();
    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let compute = b.add_method(app, "compute");
    let call = b.call(paint, vec![]);
    b.set_body(compute, vec![Stmt::Expr(call)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    assert_eq!(
        report.violations,
        vec![EffectViolation::CallEffectViolation {
            callee: Effect::Ui,
            caller: Effect::Safe,
            span: Span::dummy(),
        }]
    );
    assert!(report.has_errors());
}

#[test]
fn receiver_tag_instantiates_a_polymorphic_callee() {
    let mut b = ProgramBuilder::new();
    let listener = b.add_poly_class("Listener");
    let on_event = b.add_method(listener, "on_event");

    let app = b.add_class("App");
    let through_safe = b.add_method(app, "through_safe");
    let call = b.call_on(on_event, TypeTag::Safe, vec![]);
    b.set_body(through_safe, vec![Stmt::Expr(call)]);

    let through_ui = b.add_method(app, "through_ui");
    let call = b.call_on(on_event, TypeTag::Ui, vec![]);
    b.set_body(through_ui, vec![Stmt::Expr(call)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    // The safe instantiation is fine from a safe caller; the UI
    // instantiation is not.
    assert_eq!(codes(&report.violations), vec!["E5005"]);
}

#[test]
fn ui_call_promotes_a_polymorphic_literal_instead_of_reporting() {
    let mut b = ProgramBuilder::new();
    let runnable = b.add_poly_class("Runnable");
    let run = b.add_interface_method(runnable, "run");

    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let compute = b.add_method(app, "compute");
    let paint_call = b.call(paint, vec![]);
    let closure = b.closure(run, vec![Stmt::Expr(paint_call)]);
    b.set_body(compute, vec![Stmt::Expr(closure)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    assert!(report.is_clean(), "got {:?}", report.violations);
}

#[test]
fn promoted_literal_is_rejected_by_a_safe_parameter() {
    let mut b = ProgramBuilder::new();
    let runnable = b.add_poly_class("Runnable");
    let run = b.add_interface_method(runnable, "run");

    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let register = b.add_method(app, "register");
    b.add_param(register, "task", TypeUse::of_class(runnable, UseQualifier::Untagged));

    let compute = b.add_method(app, "compute");
    let paint_call = b.call(paint, vec![]);
    let closure = b.closure(run, vec![Stmt::Expr(paint_call)]);
    let call = b.call(register, vec![closure]);
    b.set_body(compute, vec![Stmt::Expr(call)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    assert_eq!(
        report.violations,
        vec![EffectViolation::IncompatibleArgument {
            found: Effect::Ui,
            expected: Effect::Safe,
            span: Span::dummy(),
        }]
    );
}

#[test]
fn literal_into_a_ui_parameter_is_promoted_and_accepted() {
    let mut b = ProgramBuilder::new();
    let runnable = b.add_poly_class("Runnable");
    let run = b.add_interface_method(runnable, "run");

    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let invoke_later = b.add_method(app, "invoke_later");
    b.add_param(invoke_later, "task", TypeUse::of_class(runnable, UseQualifier::Ui));

    let compute = b.add_method(app, "compute");
    let paint_call = b.call(paint, vec![]);
    let closure = b.closure(run, vec![Stmt::Expr(paint_call)]);
    let call = b.call(invoke_later, vec![closure]);
    b.set_body(compute, vec![Stmt::Expr(call)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    assert!(report.is_clean(), "got {:?}", report.violations);
}

#[test]
fn ui_qualified_local_promotes_its_initializer() {
    let mut b = ProgramBuilder::new();
    let runnable = b.add_poly_class("Runnable");
    let run = b.add_interface_method(runnable, "run");

    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let compute = b.add_method(app, "compute");
    let paint_call = b.call(paint, vec![]);
    let closure = b.closure(run, vec![Stmt::Expr(paint_call)]);
    let ty = TypeUse::of_class(runnable, UseQualifier::Ui);
    b.set_body(compute, vec![let_stmt(ty, closure)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    assert!(report.is_clean(), "got {:?}", report.violations);
}

#[test]
fn untagged_local_rejects_a_ui_constrained_literal() {
    let mut b = ProgramBuilder::new();
    let runnable = b.add_poly_class("Runnable");
    let run = b.add_interface_method(runnable, "run");

    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let compute = b.add_method(app, "compute");
    let paint_call = b.call(paint, vec![]);
    let closure = b.closure(run, vec![Stmt::Expr(paint_call)]);
    let ty = TypeUse::of_class(runnable, UseQualifier::Untagged);
    b.set_body(compute, vec![let_stmt(ty, closure)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    assert_eq!(codes(&report.violations), vec!["E5007"]);
}

#[test]
fn assignment_target_promotes_the_literal() {
    let mut b = ProgramBuilder::new();
    let runnable = b.add_poly_class("Runnable");
    let run = b.add_interface_method(runnable, "run");

    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let compute = b.add_method(app, "compute");

    let paint_call = b.call(paint, vec![]);
    let closure = b.closure(run, vec![Stmt::Expr(paint_call)]);
    let into_ui = b.add_expr(ExprKind::Assign {
        target: TypeUse::of_class(runnable, UseQualifier::Ui),
        value: closure,
    });

    let paint_call = b.call(paint, vec![]);
    let closure = b.closure(run, vec![Stmt::Expr(paint_call)]);
    let into_plain = b.add_expr(ExprKind::Assign {
        target: TypeUse::of_class(runnable, UseQualifier::Untagged),
        value: closure,
    });

    b.set_body(compute, vec![Stmt::Expr(into_ui), Stmt::Expr(into_plain)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    // The UI-qualified field absorbs the literal; the untagged one does
    // not.
    assert_eq!(codes(&report.violations), vec!["E5007"]);
}

#[test]
fn return_into_a_ui_signature_promotes_the_literal() {
    let mut b = ProgramBuilder::new();
    let runnable = b.add_poly_class("Runnable");
    let run = b.add_interface_method(runnable, "run");

    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);

    let make_ui_task = b.add_method(app, "make_ui_task");
    b.set_return_type(make_ui_task, TypeUse::of_class(runnable, UseQualifier::Ui));
    let paint_call = b.call(paint, vec![]);
    let closure = b.closure(run, vec![Stmt::Expr(paint_call)]);
    b.set_body(
        make_ui_task,
        vec![Stmt::Return {
            value: Some(closure),
            span: Span::dummy(),
        }],
    );

    let make_plain_task = b.add_method(app, "make_plain_task");
    b.set_return_type(make_plain_task, TypeUse::of_class(runnable, UseQualifier::Untagged));
    let paint_call = b.call(paint, vec![]);
    let closure = b.closure(run, vec![Stmt::Expr(paint_call)]);
    b.set_body(
        make_plain_task,
        vec![Stmt::Return {
            value: Some(closure),
            span: Span::dummy(),
        }],
    );
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    // Only the plain-returning method is at fault.
    assert_eq!(codes(&report.violations), vec!["E5007"]);
}

#[test]
fn conditional_branches_share_the_flow_target() {
    let mut b = ProgramBuilder::new();
    let runnable = b.add_poly_class("Runnable");
    let run = b.add_interface_method(runnable, "run");

    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let compute = b.add_method(app, "compute");
    let then_call = b.call(paint, vec![]);
    let then_closure = b.closure(run, vec![Stmt::Expr(then_call)]);
    let else_closure = b.closure(run, vec![]);
    let cond = b.add_expr(ExprKind::Cond {
        then_branch: then_closure,
        else_branch: else_closure,
    });
    let ty = TypeUse::of_class(runnable, UseQualifier::Ui);
    b.set_body(compute, vec![let_stmt(ty, cond)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    assert!(report.is_clean(), "got {:?}", report.violations);
}

#[test]
fn conditional_literal_takes_the_upper_bound_of_its_branches() {
    let mut b = ProgramBuilder::new();
    let runnable = b.add_poly_class("Runnable");
    let run = b.add_interface_method(runnable, "run");

    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let compute = b.add_method(app, "compute");
    let then_call = b.call(paint, vec![]);
    let then_closure = b.closure(run, vec![Stmt::Expr(then_call)]);
    let else_closure = b.closure(run, vec![]);
    let cond = b.add_expr(ExprKind::Cond {
        then_branch: then_closure,
        else_branch: else_closure,
    });
    let ty = TypeUse::of_class(runnable, UseQualifier::Untagged);
    b.set_body(compute, vec![let_stmt(ty, cond)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    // One branch was promoted to UI, so the combined value no longer fits
    // an untagged (safe) local.
    assert_eq!(codes(&report.violations), vec!["E5007"]);
}

/// Delegates to [`ProgramOracle`] but answers every branch-lub query with
/// a fixed qualifier.
struct PinnedLubOracle {
    inner: ProgramOracle,
    pinned: UseQualifier,
}

impl TypeOracle for PinnedLubOracle {
    fn assignment_target(&self, program: &Program, node: ExprId) -> Option<TypeUse> {
        self.inner.assignment_target(program, node)
    }

    fn branch_lub(&self, _program: &Program, _types: &[TypeUse]) -> TypeUse {
        TypeUse::qualified(self.pinned)
    }

    fn call_target(&self, program: &Program, call: ExprId) -> Option<CallSignature> {
        self.inner.call_target(program, call)
    }
}

#[test]
fn conditional_flow_consults_the_oracle_for_branch_types() {
    let mut b = ProgramBuilder::new();
    let runnable = b.add_poly_class("Runnable");
    let run = b.add_interface_method(runnable, "run");

    let app = b.add_class("App");
    let compute = b.add_method(app, "compute");
    let then_closure = b.closure(run, vec![]);
    let else_closure = b.closure(run, vec![]);
    let cond = b.add_expr(ExprKind::Cond {
        then_branch: then_closure,
        else_branch: else_closure,
    });
    let ty = TypeUse::of_class(runnable, UseQualifier::Untagged);
    b.set_body(compute, vec![let_stmt(ty, cond)]);
    let program = b.finish();

    // Both branches stay polymorphic, so the default oracle accepts the
    // untagged local.
    let report = check_program(&program).expect("balanced traversal");
    assert!(report.is_clean(), "got {:?}", report.violations);

    // An oracle that combines the branches to a UI type is believed.
    let oracle = PinnedLubOracle {
        inner: ProgramOracle::new(&program),
        pinned: UseQualifier::Ui,
    };
    let report = EffectChecker::new(&program, oracle)
        .check()
        .expect("balanced traversal");
    assert_eq!(codes(&report.violations), vec!["E5007"]);
}

#[test]
fn identical_violations_are_each_reported() {
    let mut b = ProgramBuilder::new();
    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let compute = b.add_method(app, "compute");
    let first = b.call(paint, vec![]);
    let second = b.call(paint, vec![]);
    b.set_body(compute, vec![Stmt::Expr(first), Stmt::Expr(second)]);
    let program = b.finish();

    // The two calls carry identical payloads; both must survive into the
    // report.
    let report = check_program(&program).expect("balanced traversal");
    assert_eq!(codes(&report.violations), vec!["E5005", "E5005"]);
}

#[test]
fn static_initializer_context_is_permissive() {
    let mut b = ProgramBuilder::new();
    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let call = b.call(paint, vec![]);
    b.add_initializer(app, call);

    let inner = b.add_class("Inner");
    b.nest_class(app, inner);
    let call = b.call(paint, vec![]);
    b.add_initializer(inner, call);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    assert!(report.is_clean(), "got {:?}", report.violations);
}

#[test]
fn explicit_override_cannot_widen_the_inherited_effect() {
    let mut b = ProgramBuilder::new();
    let base = b.add_class("Base");
    let base_run = b.add_method(base, "run");
    b.tag_method(base_run, EffectTag::Safe);

    let derived = b.add_class("Derived");
    let run = b.add_method(derived, "run");
    b.tag_method(run, EffectTag::Ui);
    b.add_override(run, base_run);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    assert_eq!(
        report.violations,
        vec![EffectViolation::InvalidOverrideEffect {
            method: run,
            found: Effect::Ui,
            required: Effect::Safe,
            span: Span::dummy(),
        }]
    );
}

#[test]
fn untagged_override_inherits_the_ui_effect() {
    let mut b = ProgramBuilder::new();
    let base = b.add_class("Base");
    let base_run = b.add_method(base, "run");
    b.tag_method(base_run, EffectTag::Ui);

    let derived = b.add_class("Derived");
    let paint = ui_method(&mut b, derived);
    let run = b.add_method(derived, "run");
    b.add_override(run, base_run);
    let call = b.call(paint, vec![]);
    b.set_body(run, vec![Stmt::Expr(call)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    assert!(report.is_clean(), "got {:?}", report.violations);
}

#[test]
fn conflicting_annotations_recover_to_safe() {
    let mut b = ProgramBuilder::new();
    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let confused = b.add_method(app, "confused");
    b.tag_method(confused, EffectTag::Safe);
    b.tag_method(confused, EffectTag::Ui);
    let call = b.call(paint, vec![]);
    b.set_body(confused, vec![Stmt::Expr(call)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    // The conflict is reported once, and the body is then checked as if
    // the method were safe.
    assert_eq!(codes(&report.violations), vec!["E5001", "E5005"]);
}

#[test]
fn poly_tag_outside_a_polymorphic_type_is_invalid() {
    let mut b = ProgramBuilder::new();
    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let handler = b.add_method(app, "handler");
    b.tag_method(handler, EffectTag::Poly);
    let call = b.call(paint, vec![]);
    b.set_body(handler, vec![Stmt::Expr(call)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    // The tag is invalid and the method falls back to the safe default,
    // which then rejects the UI call.
    assert_eq!(codes(&report.violations), vec!["E5002", "E5005"]);
}

#[test]
fn ui_qualified_use_of_a_plain_type_is_invalid() {
    let mut b = ProgramBuilder::new();
    let plain = b.add_class("Plain");
    let widget = b.add_tagged_class("Widget", TypeTag::Ui);

    let app = b.add_class("App");
    let m = b.add_method(app, "make");
    b.tag_method(m, EffectTag::Ui);
    let bad = b.add_expr(ExprKind::New {
        class: plain,
        qualifier: UseQualifier::Ui,
    });
    let good = b.add_expr(ExprKind::New {
        class: widget,
        qualifier: UseQualifier::Ui,
    });
    b.set_body(m, vec![Stmt::Expr(bad), Stmt::Expr(good)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    assert_eq!(
        report.violations,
        vec![EffectViolation::InvalidTypeUse {
            class: plain,
            span: Span::dummy(),
        }]
    );
}

#[test]
fn ui_qualified_parameter_of_a_plain_type_is_invalid() {
    let mut b = ProgramBuilder::new();
    let plain = b.add_class("Plain");
    let app = b.add_class("App");
    let m = b.add_method(app, "take");
    b.add_param(m, "p", TypeUse::of_class(plain, UseQualifier::Ui));
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    assert_eq!(codes(&report.violations), vec!["E5004"]);
}

#[test]
fn safe_nominal_literal_is_never_promoted() {
    let mut b = ProgramBuilder::new();
    let callback = b.add_class("Callback");
    let invoke = b.add_interface_method(callback, "invoke");

    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let compute = b.add_method(app, "compute");
    let paint_call = b.call(paint, vec![]);
    let closure = b.closure(invoke, vec![Stmt::Expr(paint_call)]);
    b.set_body(compute, vec![Stmt::Expr(closure)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    // The nominal signature is safe, so the UI call in the body is a
    // violation rather than a promotion.
    assert_eq!(codes(&report.violations), vec!["E5005"]);
}

#[test]
fn ui_nominal_literal_permits_ui_calls_but_not_safe_targets() {
    let mut b = ProgramBuilder::new();
    let callback = b.add_class("Callback");
    let invoke = b.add_interface_method(callback, "invoke");
    b.tag_method(invoke, EffectTag::Ui);

    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let register = b.add_method(app, "register");
    b.add_param(register, "cb", TypeUse::of_class(callback, UseQualifier::Untagged));

    let compute = b.add_method(app, "compute");
    let paint_call = b.call(paint, vec![]);
    let closure = b.closure(invoke, vec![Stmt::Expr(paint_call)]);
    let call = b.call(register, vec![closure]);
    b.set_body(compute, vec![Stmt::Expr(call)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    // The body is fine under the UI nominal effect; the flow into a safe
    // parameter is not.
    assert_eq!(codes(&report.violations), vec!["E5007"]);
}

#[test]
fn nested_literals_promote_independently() {
    let mut b = ProgramBuilder::new();
    let runnable = b.add_poly_class("Runnable");
    let run = b.add_interface_method(runnable, "run");

    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let compute = b.add_method(app, "compute");

    // Outer literal performs no UI work itself; the inner one does.
    let paint_call = b.call(paint, vec![]);
    let inner = b.closure(run, vec![Stmt::Expr(paint_call)]);
    let outer = b.closure(run, vec![Stmt::Expr(inner)]);
    let ty = TypeUse::of_class(runnable, UseQualifier::Untagged);
    b.set_body(compute, vec![let_stmt(ty, outer)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    // The inner literal latches to UI; the outer stays polymorphic and
    // still fits the untagged local.
    assert!(report.is_clean(), "got {:?}", report.violations);
}

#[test]
fn traversal_balances_the_context_stack() {
    let mut b = ProgramBuilder::new();
    let runnable = b.add_poly_class("Runnable");
    let run = b.add_interface_method(runnable, "run");

    let outer = b.add_class("Outer");
    let inner = b.add_class("Inner");
    b.nest_class(outer, inner);
    let paint = ui_method(&mut b, inner);
    let m = b.add_method(inner, "m");
    let paint_call = b.call(paint, vec![]);
    let closure = b.closure(run, vec![Stmt::Expr(paint_call)]);
    b.set_body(m, vec![Stmt::Expr(closure)]);
    let init_call = b.call(paint, vec![]);
    b.add_initializer(outer, init_call);
    let program = b.finish();

    assert!(check_program(&program).is_ok());
}

#[test]
fn report_renders_registered_diagnostic_codes() {
    let mut b = ProgramBuilder::new();
    let app = b.add_class("App");
    let paint = ui_method(&mut b, app);
    let compute = b.add_method(app, "compute");
    let call = b.call(paint, vec![]);
    b.set_body(compute, vec![Stmt::Expr(call)]);
    let program = b.finish();

    let report = check_program(&program).expect("balanced traversal");
    let diagnostics = report.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code.as_deref(), Some("E5005"));

    let registry = uivet_diagnostics::ErrorCodeRegistry::with_standard_codes();
    for diagnostic in &diagnostics {
        let code = diagnostic.code.as_deref().expect("coded diagnostic");
        assert!(registry.get(code).is_some(), "unregistered code {code}");
    }
}
