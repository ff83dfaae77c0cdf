//! The input tree the generator walks. The parser produces it; the
//! generator never mutates it.

use serde::{Deserialize, Serialize};

use crate::symbol::BitmapField;
use crate::ty::OverflowBehavior;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Qualification at the head of an identifier chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prefix {
    None,
    This,
    Global,
}

/// One bracket group; holds one expression (`x[i]`) or two
/// (`x[start, width]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptGroup {
    pub exprs: Vec<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub subscripts: Vec<SubscriptGroup>,
}

impl Segment {
    pub fn plain(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            subscripts: Vec::new(),
        }
    }
}

/// `prefix.seg[.seg...]` with optional subscripts per segment. Chains
/// are non-empty by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostfixChain {
    pub prefix: Prefix,
    pub segments: Vec<Segment>,
    pub pos: Pos,
}

impl PostfixChain {
    pub fn ident(name: &str, pos: Pos) -> Self {
        Self {
            prefix: Prefix::None,
            segments: vec![Segment::plain(name)],
            pos,
        }
    }

    pub fn base(&self) -> &Segment {
        &self.segments[0]
    }

    /// Bare unqualified identifier with no subscripts.
    pub fn is_simple(&self) -> bool {
        self.prefix == Prefix::None
            && self.segments.len() == 1
            && self.segments[0].subscripts.is_empty()
    }

    pub fn subscript_count(&self) -> usize {
        self.segments.iter().map(|s| s.subscripts.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn c_token(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
            Self::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogAnd,
    LogOr,
}

impl BinaryOp {
    pub fn c_token(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::LogAnd => "&&",
            Self::LogOr => "||",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Self::LogAnd | Self::LogOr)
    }

    pub fn is_shift(&self) -> bool {
        matches!(self, Self::Shl | Self::Shr)
    }

    /// Produces an integer-typed result subject to promotion.
    pub fn is_numeric(&self) -> bool {
        !self.is_comparison() && !self.is_logical()
    }
}

/// The `<-` operator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl AssignOp {
    pub fn is_compound(&self) -> bool {
        !matches!(self, Self::Set)
    }

    pub fn c_token(&self) -> &'static str {
        match self {
            Self::Set => "=",
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Mul => "*=",
            Self::Div => "/=",
            Self::Mod => "%=",
            Self::BitAnd => "&=",
            Self::BitOr => "|=",
            Self::BitXor => "^=",
            Self::Shl => "<<=",
            Self::Shr => ">>=",
        }
    }

    /// The plain binary operator a compound assignment applies.
    pub fn binary(&self) -> Option<BinaryOp> {
        match self {
            Self::Set => None,
            Self::Add => Some(BinaryOp::Add),
            Self::Sub => Some(BinaryOp::Sub),
            Self::Mul => Some(BinaryOp::Mul),
            Self::Div => Some(BinaryOp::Div),
            Self::Mod => Some(BinaryOp::Mod),
            Self::BitAnd => Some(BinaryOp::BitAnd),
            Self::BitOr => Some(BinaryOp::BitOr),
            Self::BitXor => Some(BinaryOp::BitXor),
            Self::Shl => Some(BinaryOp::Shl),
            Self::Shr => Some(BinaryOp::Shr),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallExpr {
    pub callee: PostfixChain,
    pub args: Vec<Expr>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Raw literal text, optional `(u|i)(8|16|32|64)` suffix preserved.
    IntLit { text: String, pos: Pos },
    FloatLit { text: String, pos: Pos },
    StringLit { value: String, pos: Pos },
    BoolLit { value: bool, pos: Pos },
    Path(PostfixChain),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        pos: Pos,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        pos: Pos,
    },
    Call(CallExpr),
    Ternary {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        pos: Pos,
    },
    ArrayLit { elements: Vec<Expr>, pos: Pos },
    /// Fill-all form `[v*]`.
    ArrayFill { value: Box<Expr>, pos: Pos },
    Sizeof { operand: Box<Expr>, pos: Pos },
}

impl Expr {
    pub fn pos(&self) -> Pos {
        match self {
            Expr::IntLit { pos, .. }
            | Expr::FloatLit { pos, .. }
            | Expr::StringLit { pos, .. }
            | Expr::BoolLit { pos, .. }
            | Expr::Unary { pos, .. }
            | Expr::Binary { pos, .. }
            | Expr::Ternary { pos, .. }
            | Expr::ArrayLit { pos, .. }
            | Expr::ArrayFill { pos, .. }
            | Expr::Sizeof { pos, .. } => *pos,
            Expr::Path(chain) => chain.pos,
            Expr::Call(call) => call.pos,
        }
    }

    pub fn int(text: &str, pos: Pos) -> Self {
        Expr::IntLit {
            text: text.to_owned(),
            pos,
        }
    }

    pub fn ident(name: &str, pos: Pos) -> Self {
        Expr::Path(PostfixChain::ident(name, pos))
    }
}

/// Declared (source-level) type of a variable or parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeExpr {
    pub base: String,
    pub is_const: bool,
    pub is_volatile: bool,
    pub is_atomic: bool,
    pub overflow: Option<OverflowBehavior>,
    /// `string<N>`; `string` (unsized) keeps `Some(0)`.
    pub string_capacity: Option<u32>,
    /// `None` entry = empty dimension to be inferred.
    pub array_dims: Vec<Option<Expr>>,
}

impl TypeExpr {
    pub fn named(base: &str) -> Self {
        Self {
            base: base.to_owned(),
            is_const: false,
            is_volatile: false,
            is_atomic: false,
            overflow: None,
            string_capacity: None,
            array_dims: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub init: Option<Expr>,
    /// Parser flags dims written after the identifier (C style).
    pub c_style_dims: bool,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignStmt {
    pub target: PostfixChain,
    pub op: AssignOp,
    pub value: Expr,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    pub labels: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchStmt {
    pub selector: Expr,
    pub cases: Vec<SwitchCase>,
    /// `default(N)` declared coverage count, if spelled.
    pub default_covers: Option<u32>,
    pub default_body: Option<Vec<Stmt>>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    VarDecl(VarDecl),
    Assign(AssignStmt),
    Call(CallExpr),
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
        pos: Pos,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
        pos: Pos,
    },
    DoWhile {
        body: Vec<Stmt>,
        cond: Expr,
        pos: Pos,
    },
    Switch(SwitchStmt),
    Return { value: Option<Expr>, pos: Pos },
    CriticalSection { body: Vec<Stmt>, pos: Pos },
    Break { pos: Pos },
    Continue { pos: Pos },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    /// `None` means `void`.
    pub ret: Option<TypeExpr>,
    pub body: Vec<Stmt>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    pub members: Vec<String>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitmapDecl {
    pub name: String,
    /// Backing type name, e.g. `"u8"`.
    pub backing: String,
    pub fields: Vec<BitmapField>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub ty: TypeExpr,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<StructField>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Item {
    Include {
        path: String,
        /// Set by the driver when a `.cnx` file with the same stem sits
        /// next to the included header.
        cnx_sibling: bool,
        pos: Pos,
    },
    VarDecl(VarDecl),
    Function(Function),
    Scope {
        name: String,
        items: Vec<Item>,
        pos: Pos,
    },
    EnumDecl(EnumDecl),
    BitmapDecl(BitmapDecl),
    StructDecl(StructDecl),
}

/// One source unit handed to the generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Unit {
    pub items: Vec<Item>,
}
