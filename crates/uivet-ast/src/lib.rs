//! uivet program model
//!
//! Defines the declaration tree the effect checker walks: classes with
//! effect tags, methods and constructors, field/static initializers, and
//! the expression forms the checker cares about (calls, function literals,
//! assignments, instantiations).
//!
//! The tree is arena-style: a [`Program`] owns flat vectors of classes,
//! methods, and expressions, and nodes refer to each other through the
//! `ClassId` / `MethodId` / `ExprId` newtypes. Node identity is the index,
//! which is what the checker keys its caches and inference records on.

pub use smol_str::SmolStr;

use std::fmt;
use std::ops::Range;

/// Source span representing a range in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

impl From<Span> for Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

/// A spanned value - wraps any value with source location info
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn dummy(node: T) -> Self {
        Self {
            node,
            span: Span::dummy(),
        }
    }
}

// ============================================================================
// Node Identity
// ============================================================================

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identity of a class declaration within a [`Program`].
    ClassId,
    "c"
);
define_id!(
    /// Identity of a method or constructor declaration within a [`Program`].
    MethodId,
    "m"
);
define_id!(
    /// Identity of an expression node within a [`Program`].
    ExprId,
    "e"
);

// ============================================================================
// Effect Tags
// ============================================================================

/// Explicit effect annotation on a method or constructor declaration.
///
/// A declaration may carry several of these (that is an error the checker
/// reports), which is why [`MethodDecl::tags`] is a list rather than an
/// option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectTag {
    /// May run in any context.
    Safe,
    /// Inherits the effect of the instantiation context.
    Poly,
    /// May only run in a UI context.
    Ui,
}

impl fmt::Display for EffectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectTag::Safe => write!(f, "@SafeEffect"),
            EffectTag::Poly => write!(f, "@PolyUIEffect"),
            EffectTag::Ui => write!(f, "@UIEffect"),
        }
    }
}

/// Effect tag on a class declaration.
///
/// Controls the structural default for untagged members: members of a
/// `Ui`-tagged class default to the UI effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Safe,
    Poly,
    Ui,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Safe => write!(f, "@AlwaysSafe"),
            TypeTag::Poly => write!(f, "@PolyUI"),
            TypeTag::Ui => write!(f, "@UI"),
        }
    }
}

/// Qualifier written on a use of a declared type (a variable type, a
/// parameter type, an instantiation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UseQualifier {
    /// No qualifier written; defaults to safe.
    #[default]
    Untagged,
    Safe,
    Poly,
    /// Polymorphic over every qualifier hierarchy, not just effects.
    PolyAll,
    Ui,
}

impl fmt::Display for UseQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UseQualifier::Untagged => write!(f, "(untagged)"),
            UseQualifier::Safe => write!(f, "@AlwaysSafe"),
            UseQualifier::Poly => write!(f, "@PolyUI"),
            UseQualifier::PolyAll => write!(f, "@PolyAll"),
            UseQualifier::Ui => write!(f, "@UI"),
        }
    }
}

// ============================================================================
// Type Uses
// ============================================================================

/// A use of a type: the referenced class (when one is statically known)
/// plus the qualifier written at the use site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeUse {
    pub class: Option<ClassId>,
    pub qualifier: UseQualifier,
    pub span: Span,
}

impl TypeUse {
    pub fn untagged() -> Self {
        Self {
            class: None,
            qualifier: UseQualifier::Untagged,
            span: Span::dummy(),
        }
    }

    pub fn qualified(qualifier: UseQualifier) -> Self {
        Self {
            class: None,
            qualifier,
            span: Span::dummy(),
        }
    }

    pub fn of_class(class: ClassId, qualifier: UseQualifier) -> Self {
        Self {
            class: Some(class),
            qualifier,
            span: Span::dummy(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// True if the use site is explicitly UI-qualified.
    pub fn is_ui(&self) -> bool {
        self.qualifier == UseQualifier::Ui
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// A class (or interface) declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: SmolStr,
    /// Effect tag on the declaration itself, if any.
    pub tag: Option<TypeTag>,
    /// Whether the class is declared polymorphic over effect qualifiers.
    pub effect_poly: bool,
    pub methods: Vec<MethodId>,
    /// Field and static initializer expressions that are not lexically
    /// inside any method body.
    pub initializers: Vec<ExprId>,
    pub nested: Vec<ClassId>,
    pub span: Span,
}

impl ClassDecl {
    pub fn is_ui(&self) -> bool {
        self.tag == Some(TypeTag::Ui)
    }
}

/// What kind of executable declaration a [`MethodDecl`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Constructor,
    /// The single abstract method of a functional interface; function
    /// literals name one of these as their nominal signature.
    FunctionalInterface,
}

/// A method or constructor declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: SmolStr,
    /// The class this declaration is a member of.
    pub class: ClassId,
    pub kind: MethodKind,
    /// Explicit effect annotations, in source order. More than one is a
    /// conflict the checker reports.
    pub tags: Vec<Spanned<EffectTag>>,
    /// Declarations this one directly overrides.
    pub overrides: Vec<MethodId>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeUse>,
    pub body: Option<Block>,
    pub span: Span,
}

impl MethodDecl {
    /// The single explicit tag, when exactly one is present.
    pub fn explicit_tag(&self) -> Option<EffectTag> {
        match self.tags.as_slice() {
            [only] => Some(only.node),
            _ => None,
        }
    }

    pub fn has_tag(&self, tag: EffectTag) -> bool {
        self.tags.iter().any(|t| t.node == tag)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: SmolStr,
    pub ty: TypeUse,
    pub span: Span,
}

// ============================================================================
// Statements and Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self {
            stmts,
            span: Span::dummy(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// An expression evaluated for its effect.
    Expr(ExprId),
    /// A local variable declaration with a declared type and an optional
    /// initializer.
    Let {
        name: SmolStr,
        ty: TypeUse,
        init: Option<ExprId>,
        span: Span,
    },
    Return {
        value: Option<ExprId>,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// An invocation of a resolved method or constructor.
    Call {
        callee: MethodId,
        /// The effect tag of the receiver's instantiation, when the call
        /// goes through a concretely-tagged reference.
        receiver_tag: Option<TypeTag>,
        args: Vec<ExprId>,
    },
    /// A function literal (lambda). `iface` is the functional-interface
    /// method giving the literal its nominal signature.
    Closure { iface: MethodId, body: Block },
    /// An assignment to a target of a statically known type.
    Assign { target: TypeUse, value: ExprId },
    /// An instantiation of a declared type (`new C()`), carrying the
    /// qualifier written at the use site.
    New {
        class: ClassId,
        qualifier: UseQualifier,
    },
    /// A two-way conditional expression; the checker combines the branch
    /// types when it needs the expression's static type.
    Cond { then_branch: ExprId, else_branch: ExprId },
    /// An opaque reference the checker has nothing to say about.
    Name(SmolStr),
}

// ============================================================================
// Program
// ============================================================================

/// A checked compilation unit: flat arenas of declarations and expressions
/// plus the list of top-level classes, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    classes: Vec<ClassDecl>,
    methods: Vec<MethodDecl>,
    exprs: Vec<Expr>,
    pub top_level: Vec<ClassId>,
}

impl Program {
    pub fn class(&self, id: ClassId) -> &ClassDecl {
        &self.classes[id.index()]
    }

    pub fn method(&self, id: MethodId) -> &MethodDecl {
        &self.methods[id.index()]
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassDecl)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, c)| (ClassId(i as u32), c))
    }

    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &MethodDecl)> {
        self.methods
            .iter()
            .enumerate()
            .map(|(i, m)| (MethodId(i as u32), m))
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// The class a method is declared in.
    pub fn enclosing_class(&self, id: MethodId) -> &ClassDecl {
        self.class(self.method(id).class)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Incrementally assembles a [`Program`]. Used by tests and by front ends
/// that lower some host syntax into the checked tree.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an untagged, non-polymorphic top-level class.
    pub fn add_class(&mut self, name: impl Into<SmolStr>) -> ClassId {
        self.push_class(name.into(), None, false)
    }

    /// Adds a top-level class with an explicit effect tag.
    pub fn add_tagged_class(&mut self, name: impl Into<SmolStr>, tag: TypeTag) -> ClassId {
        self.push_class(name.into(), Some(tag), false)
    }

    /// Adds a top-level class declared polymorphic over effect qualifiers.
    pub fn add_poly_class(&mut self, name: impl Into<SmolStr>) -> ClassId {
        self.push_class(name.into(), None, true)
    }

    fn push_class(&mut self, name: SmolStr, tag: Option<TypeTag>, effect_poly: bool) -> ClassId {
        let id = ClassId(self.program.classes.len() as u32);
        self.program.classes.push(ClassDecl {
            name,
            tag,
            effect_poly,
            methods: Vec::new(),
            initializers: Vec::new(),
            nested: Vec::new(),
            span: Span::dummy(),
        });
        self.program.top_level.push(id);
        id
    }

    /// Moves a class out of the top level and under `parent`.
    pub fn nest_class(&mut self, parent: ClassId, child: ClassId) {
        self.program.top_level.retain(|c| *c != child);
        self.program.classes[parent.index()].nested.push(child);
    }

    pub fn add_method(&mut self, class: ClassId, name: impl Into<SmolStr>) -> MethodId {
        self.push_method(class, name.into(), MethodKind::Method)
    }

    pub fn add_constructor(&mut self, class: ClassId) -> MethodId {
        self.push_method(class, SmolStr::new("<init>"), MethodKind::Constructor)
    }

    /// Adds the single abstract method of a functional interface.
    pub fn add_interface_method(
        &mut self,
        class: ClassId,
        name: impl Into<SmolStr>,
    ) -> MethodId {
        self.push_method(class, name.into(), MethodKind::FunctionalInterface)
    }

    fn push_method(&mut self, class: ClassId, name: SmolStr, kind: MethodKind) -> MethodId {
        let id = MethodId(self.program.methods.len() as u32);
        self.program.methods.push(MethodDecl {
            name,
            class,
            kind,
            tags: Vec::new(),
            overrides: Vec::new(),
            params: Vec::new(),
            return_type: None,
            body: None,
            span: Span::dummy(),
        });
        self.program.classes[class.index()].methods.push(id);
        id
    }

    pub fn tag_method(&mut self, method: MethodId, tag: EffectTag) {
        self.program.methods[method.index()]
            .tags
            .push(Spanned::dummy(tag));
    }

    pub fn add_override(&mut self, method: MethodId, overridden: MethodId) {
        self.program.methods[method.index()].overrides.push(overridden);
    }

    pub fn add_param(&mut self, method: MethodId, name: impl Into<SmolStr>, ty: TypeUse) {
        let name = name.into();
        self.program.methods[method.index()].params.push(Param {
            name,
            ty,
            span: Span::dummy(),
        });
    }

    pub fn set_return_type(&mut self, method: MethodId, ty: TypeUse) {
        self.program.methods[method.index()].return_type = Some(ty);
    }

    pub fn set_body(&mut self, method: MethodId, stmts: Vec<Stmt>) {
        self.program.methods[method.index()].body = Some(Block::new(stmts));
    }

    /// Adds a field/static initializer expression directly under a class.
    pub fn add_initializer(&mut self, class: ClassId, expr: ExprId) {
        self.program.classes[class.index()].initializers.push(expr);
    }

    pub fn add_expr(&mut self, kind: ExprKind) -> ExprId {
        let id = ExprId(self.program.exprs.len() as u32);
        self.program.exprs.push(Expr {
            kind,
            span: Span::dummy(),
        });
        id
    }

    /// A call with no receiver instantiation tag.
    pub fn call(&mut self, callee: MethodId, args: Vec<ExprId>) -> ExprId {
        self.add_expr(ExprKind::Call {
            callee,
            receiver_tag: None,
            args,
        })
    }

    /// A call through a concretely-tagged receiver.
    pub fn call_on(
        &mut self,
        callee: MethodId,
        receiver_tag: TypeTag,
        args: Vec<ExprId>,
    ) -> ExprId {
        self.add_expr(ExprKind::Call {
            callee,
            receiver_tag: Some(receiver_tag),
            args,
        })
    }

    pub fn closure(&mut self, iface: MethodId, stmts: Vec<Stmt>) -> ExprId {
        self.add_expr(ExprKind::Closure {
            iface,
            body: Block::new(stmts),
        })
    }

    pub fn finish(self) -> Program {
        self.program
    }
}
