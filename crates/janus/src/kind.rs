//! The closed cursor-kind taxonomy and operator discriminants.
//!
//! Kind names follow libclang's cursor-kind vocabulary (`as_str` yields the
//! `SCREAMING_SNAKE` spelling, e.g. `DO_STMT`). Every native grammar node the
//! classifier sees maps to exactly one kind, with [`CursorKind::Unclassified`]
//! as the fallback for constructs it does not recognize.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Broad grouping of cursor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindCategory {
    /// Declarations and definitions
    Declaration,
    /// References to declared entities (types, namespaces, members)
    Reference,
    /// Statements
    Statement,
    /// Expressions, including literals
    Expression,
    /// Preprocessor directives
    Preprocessing,
    /// The translation unit root and the unclassified sentinel
    Other,
}

macro_rules! cursor_kinds {
    ($( $(#[$doc:meta])* $variant:ident => $name:literal, $category:ident; )+) => {
        /// Kind of a cursor.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum CursorKind {
            $( $(#[$doc])* $variant, )+
        }

        impl CursorKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [CursorKind] = &[ $( CursorKind::$variant, )+ ];

            /// libclang-style name of this kind.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )+
                }
            }

            /// Category this kind belongs to.
            #[must_use]
            pub fn category(self) -> KindCategory {
                match self {
                    $( Self::$variant => KindCategory::$category, )+
                }
            }

            fn variant_name(self) -> &'static str {
                match self {
                    $( Self::$variant => stringify!($variant), )+
                }
            }
        }
    };
}

cursor_kinds! {
    /// Root cursor spanning the whole file
    TranslationUnit => "TRANSLATION_UNIT", Other;
    /// A native construct the classifier does not recognize
    Unclassified => "UNCLASSIFIED", Other;

    // === Declarations ===
    /// Free function
    FunctionDecl => "FUNCTION_DECL", Declaration;
    /// Member function, in-class or out-of-class (`A::f`)
    CxxMethod => "CXX_METHOD", Declaration;
    /// Constructor
    Constructor => "CONSTRUCTOR", Declaration;
    /// Destructor
    Destructor => "DESTRUCTOR", Declaration;
    /// `operator T()` conversion function
    ConversionFunction => "CONVERSION_FUNCTION", Declaration;
    /// Variable (including catch parameters and range-for loop variables)
    VarDecl => "VAR_DECL", Declaration;
    /// Data member
    FieldDecl => "FIELD_DECL", Declaration;
    /// Function parameter
    ParmDecl => "PARM_DECL", Declaration;
    /// `struct`
    StructDecl => "STRUCT_DECL", Declaration;
    /// `class`
    ClassDecl => "CLASS_DECL", Declaration;
    /// `union`
    UnionDecl => "UNION_DECL", Declaration;
    /// `enum` or `enum class`
    EnumDecl => "ENUM_DECL", Declaration;
    /// Enumerator
    EnumConstantDecl => "ENUM_CONSTANT_DECL", Declaration;
    /// `typedef`
    TypedefDecl => "TYPEDEF_DECL", Declaration;
    /// `using X = ...`
    TypeAliasDecl => "TYPE_ALIAS_DECL", Declaration;
    /// `namespace`
    Namespace => "NAMESPACE", Declaration;
    /// `namespace X = Y`
    NamespaceAlias => "NAMESPACE_ALIAS", Declaration;
    /// `using namespace X`
    UsingDirective => "USING_DIRECTIVE", Declaration;
    /// `using X::y`
    UsingDeclaration => "USING_DECLARATION", Declaration;
    /// Class, struct or union template
    ClassTemplate => "CLASS_TEMPLATE", Declaration;
    /// Function template
    FunctionTemplate => "FUNCTION_TEMPLATE", Declaration;
    /// `template<...> using X = ...`
    TypeAliasTemplateDecl => "TYPE_ALIAS_TEMPLATE_DECL", Declaration;
    /// `typename T` template parameter
    TemplateTypeParameter => "TEMPLATE_TYPE_PARAMETER", Declaration;
    /// `int N` template parameter
    NonTypeTemplateParameter => "TEMPLATE_NON_TYPE_PARAMETER", Declaration;
    /// `template<...> class T` template parameter
    TemplateTemplateParameter => "TEMPLATE_TEMPLATE_PARAMETER", Declaration;
    /// `public:` / `private:` / `protected:`
    AccessSpecifier => "CXX_ACCESS_SPEC_DECL", Declaration;
    /// `friend` declaration
    FriendDecl => "FRIEND_DECL", Declaration;
    /// `static_assert`
    StaticAssert => "STATIC_ASSERT", Declaration;
    /// `extern "C"` block
    LinkageSpec => "LINKAGE_SPEC", Declaration;

    // === References ===
    /// Reference to a type name
    TypeRef => "TYPE_REF", Reference;
    /// Reference to a namespace name
    NamespaceRef => "NAMESPACE_REF", Reference;
    /// Member named in a constructor initializer
    MemberRef => "MEMBER_REF", Reference;

    // === Statements ===
    /// `{ ... }`
    CompoundStmt => "COMPOUND_STMT", Statement;
    /// Local declaration
    DeclStmt => "DECL_STMT", Statement;
    /// `if`
    IfStmt => "IF_STMT", Statement;
    /// `for (;;)`
    ForStmt => "FOR_STMT", Statement;
    /// `for (x : range)`
    ForRangeStmt => "CXX_FOR_RANGE_STMT", Statement;
    /// `while`
    WhileStmt => "WHILE_STMT", Statement;
    /// `do ... while`
    DoStmt => "DO_STMT", Statement;
    /// `switch`
    SwitchStmt => "SWITCH_STMT", Statement;
    /// `case` label with the statements it owns
    CaseStmt => "CASE_STMT", Statement;
    /// `default` label with the statements it owns
    DefaultStmt => "DEFAULT_STMT", Statement;
    /// `break`
    BreakStmt => "BREAK_STMT", Statement;
    /// `continue`
    ContinueStmt => "CONTINUE_STMT", Statement;
    /// `return`
    ReturnStmt => "RETURN_STMT", Statement;
    /// `goto label`
    GotoStmt => "GOTO_STMT", Statement;
    /// `label:` with the statement it labels
    LabelStmt => "LABEL_STMT", Statement;
    /// A lone `;`
    NullStmt => "NULL_STMT", Statement;
    /// `try`
    CxxTryStmt => "CXX_TRY_STMT", Statement;
    /// `catch`
    CxxCatchStmt => "CXX_CATCH_STMT", Statement;

    // === Expressions ===
    /// Reference to a variable, function or enumerator
    DeclRefExpr => "DECL_REF_EXPR", Expression;
    /// `a.b` / `a->b`
    MemberRefExpr => "MEMBER_REF_EXPR", Expression;
    /// Function call
    CallExpr => "CALL_EXPR", Expression;
    /// Integer literal
    IntegerLiteral => "INTEGER_LITERAL", Expression;
    /// Floating-point literal
    FloatingLiteral => "FLOATING_LITERAL", Expression;
    /// Character literal
    CharacterLiteral => "CHARACTER_LITERAL", Expression;
    /// String literal (including raw and concatenated strings)
    StringLiteral => "STRING_LITERAL", Expression;
    /// `true` / `false`
    CxxBoolLiteralExpr => "CXX_BOOL_LITERAL_EXPR", Expression;
    /// `nullptr`
    CxxNullPtrLiteralExpr => "CXX_NULL_PTR_LITERAL_EXPR", Expression;
    /// Binary operator, including plain assignment
    BinaryOperator => "BINARY_OPERATOR", Expression;
    /// `+=`, `*=`, ... (see the operator discriminant)
    CompoundAssignOperator => "COMPOUND_ASSIGNMENT_OPERATOR", Expression;
    /// Unary operator, including increments and dereference
    UnaryOperator => "UNARY_OPERATOR", Expression;
    /// `c ? a : b`
    ConditionalOperator => "CONDITIONAL_OPERATOR", Expression;
    /// `a[i]`
    ArraySubscriptExpr => "ARRAY_SUBSCRIPT_EXPR", Expression;
    /// `( expr )`
    ParenExpr => "PAREN_EXPR", Expression;
    /// `(T)expr`
    CStyleCastExpr => "CSTYLE_CAST_EXPR", Expression;
    /// `static_cast`, `dynamic_cast`, `const_cast`, `reinterpret_cast`
    CxxNamedCastExpr => "CXX_NAMED_CAST_EXPR", Expression;
    /// `T{...}` / `T(...)` functional cast
    CxxFunctionalCastExpr => "CXX_FUNCTIONAL_CAST_EXPR", Expression;
    /// `new`
    CxxNewExpr => "CXX_NEW_EXPR", Expression;
    /// `delete` / `delete[]`
    CxxDeleteExpr => "CXX_DELETE_EXPR", Expression;
    /// `this`
    CxxThisExpr => "CXX_THIS_EXPR", Expression;
    /// `throw`
    CxxThrowExpr => "CXX_THROW_EXPR", Expression;
    /// `{a, b, c}`
    InitListExpr => "INIT_LIST_EXPR", Expression;
    /// Lambda
    LambdaExpr => "LAMBDA_EXPR", Expression;
    /// `sizeof`
    SizeOfExpr => "SIZEOF_EXPR", Expression;
    /// `alignof`
    AlignOfExpr => "ALIGNOF_EXPR", Expression;
    /// `a, b`
    CommaExpr => "COMMA_EXPR", Expression;

    // === Preprocessing ===
    /// `#include`
    InclusionDirective => "INCLUSION_DIRECTIVE", Preprocessing;
    /// `#define`
    MacroDefinition => "MACRO_DEFINITION", Preprocessing;
    /// `#pragma`, `#undef` and other non-conditional directives
    PreprocessingDirective => "PREPROCESSING_DIRECTIVE", Preprocessing;
}

impl CursorKind {
    /// Returns `true` for declaration kinds.
    #[must_use]
    pub fn is_declaration(self) -> bool {
        self.category() == KindCategory::Declaration
    }

    /// Returns `true` for reference kinds.
    #[must_use]
    pub fn is_reference(self) -> bool {
        self.category() == KindCategory::Reference
    }

    /// Returns `true` for statement kinds.
    #[must_use]
    pub fn is_statement(self) -> bool {
        self.category() == KindCategory::Statement
    }

    /// Returns `true` for expression kinds, literals included.
    #[must_use]
    pub fn is_expression(self) -> bool {
        self.category() == KindCategory::Expression
    }

    /// Returns `true` for preprocessor directive kinds.
    #[must_use]
    pub fn is_preprocessing(self) -> bool {
        self.category() == KindCategory::Preprocessing
    }

    /// Returns `true` for literal kinds.
    #[must_use]
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::IntegerLiteral
                | Self::FloatingLiteral
                | Self::CharacterLiteral
                | Self::StringLiteral
                | Self::CxxBoolLiteralExpr
                | Self::CxxNullPtrLiteralExpr
        )
    }

    /// Returns `true` for every kind of function-like declaration.
    #[must_use]
    pub fn is_function(self) -> bool {
        matches!(
            self,
            Self::FunctionDecl
                | Self::CxxMethod
                | Self::Constructor
                | Self::Destructor
                | Self::ConversionFunction
                | Self::FunctionTemplate
        )
    }

    /// Returns `true` for variable-like declarations.
    #[must_use]
    pub fn is_variable(self) -> bool {
        matches!(self, Self::VarDecl | Self::FieldDecl | Self::ParmDecl)
    }

    /// Returns `true` for the `Unclassified` sentinel.
    #[must_use]
    pub fn is_unclassified(self) -> bool {
        matches!(self, Self::Unclassified)
    }
}

impl std::fmt::Display for CursorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no cursor kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown cursor kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for CursorKind {
    type Err = UnknownKind;

    /// Accepts either the libclang name (`DO_STMT`, any case) or the variant name (`DoStmt`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s) || kind.variant_name() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

impl Serialize for CursorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CursorKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Operators
// ============================================================================

/// Operator discriminant carried by operator cursors.
///
/// `+=`, `*=` and `/=` all produce a `CompoundAssignOperator` cursor and differ
/// only by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    // Arithmetic
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
    /// `a % b`
    Rem,
    // Bitwise
    /// `a << b`
    Shl,
    /// `a >> b`
    Shr,
    /// `a & b` or `bitand`
    BitAnd,
    /// `a | b` or `bitor`
    BitOr,
    /// `a ^ b` or `xor`
    BitXor,
    // Comparison
    /// `a < b`
    Lt,
    /// `a > b`
    Gt,
    /// `a <= b`
    Le,
    /// `a >= b`
    Ge,
    /// `a == b`
    Eq,
    /// `a != b` or `not_eq`
    Ne,
    /// `a <=> b`
    Spaceship,
    // Logical
    /// `a && b` or `and`
    LogicalAnd,
    /// `a || b` or `or`
    LogicalOr,
    // Assignment
    /// `a = b`
    Assign,
    /// `a += b`
    AddAssign,
    /// `a -= b`
    SubAssign,
    /// `a *= b`
    MulAssign,
    /// `a /= b`
    DivAssign,
    /// `a %= b`
    RemAssign,
    /// `a <<= b`
    ShlAssign,
    /// `a >>= b`
    ShrAssign,
    /// `a &= b` or `and_eq`
    AndAssign,
    /// `a |= b` or `or_eq`
    OrAssign,
    /// `a ^= b` or `xor_eq`
    XorAssign,
    // Unary
    /// `++a`
    PreInc,
    /// `--a`
    PreDec,
    /// `a++`
    PostInc,
    /// `a--`
    PostDec,
    /// Unary `+a`
    Plus,
    /// Unary `-a`
    Minus,
    /// `!a` or `not`
    Not,
    /// `~a` or `compl`
    BitNot,
    /// `*a`
    Deref,
    /// `&a`
    AddrOf,
}

impl Operator {
    /// Parse a binary or assignment operator token.
    ///
    /// Alternative tokens (`and`, `or`, `bitand`, ...) map to their symbolic forms.
    #[must_use]
    pub fn from_binary_token(token: &str) -> Option<Self> {
        let op = match token {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            "<<" => Self::Shl,
            ">>" => Self::Shr,
            "&" | "bitand" => Self::BitAnd,
            "|" | "bitor" => Self::BitOr,
            "^" | "xor" => Self::BitXor,
            "<" => Self::Lt,
            ">" => Self::Gt,
            "<=" => Self::Le,
            ">=" => Self::Ge,
            "==" => Self::Eq,
            "!=" | "not_eq" => Self::Ne,
            "<=>" => Self::Spaceship,
            "&&" | "and" => Self::LogicalAnd,
            "||" | "or" => Self::LogicalOr,
            "=" => Self::Assign,
            "+=" => Self::AddAssign,
            "-=" => Self::SubAssign,
            "*=" => Self::MulAssign,
            "/=" => Self::DivAssign,
            "%=" => Self::RemAssign,
            "<<=" => Self::ShlAssign,
            ">>=" => Self::ShrAssign,
            "&=" | "and_eq" => Self::AndAssign,
            "|=" | "or_eq" => Self::OrAssign,
            "^=" | "xor_eq" => Self::XorAssign,
            _ => return None,
        };
        Some(op)
    }

    /// Parse a prefix unary operator token.
    #[must_use]
    pub fn from_prefix_token(token: &str) -> Option<Self> {
        let op = match token {
            "++" => Self::PreInc,
            "--" => Self::PreDec,
            "+" => Self::Plus,
            "-" => Self::Minus,
            "!" | "not" => Self::Not,
            "~" | "compl" => Self::BitNot,
            "*" => Self::Deref,
            "&" => Self::AddrOf,
            _ => return None,
        };
        Some(op)
    }

    /// Parse a postfix unary operator token.
    #[must_use]
    pub fn from_postfix_token(token: &str) -> Option<Self> {
        match token {
            "++" => Some(Self::PostInc),
            "--" => Some(Self::PostDec),
            _ => None,
        }
    }

    /// Symbolic spelling of the operator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add | Self::Plus => "+",
            Self::Sub | Self::Minus => "-",
            Self::Mul | Self::Deref => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::BitAnd | Self::AddrOf => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Spaceship => "<=>",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::Assign => "=",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
            Self::MulAssign => "*=",
            Self::DivAssign => "/=",
            Self::RemAssign => "%=",
            Self::ShlAssign => "<<=",
            Self::ShrAssign => ">>=",
            Self::AndAssign => "&=",
            Self::OrAssign => "|=",
            Self::XorAssign => "^=",
            Self::PreInc | Self::PostInc => "++",
            Self::PreDec | Self::PostDec => "--",
            Self::Not => "!",
            Self::BitNot => "~",
        }
    }

    /// Returns `true` for `+=`, `-=`, ... (but not plain `=`).
    #[must_use]
    pub fn is_compound_assignment(self) -> bool {
        matches!(
            self,
            Self::AddAssign
                | Self::SubAssign
                | Self::MulAssign
                | Self::DivAssign
                | Self::RemAssign
                | Self::ShlAssign
                | Self::ShrAssign
                | Self::AndAssign
                | Self::OrAssign
                | Self::XorAssign
        )
    }

    /// Returns `true` for unary operators.
    #[must_use]
    pub fn is_unary(self) -> bool {
        matches!(
            self,
            Self::PreInc
                | Self::PreDec
                | Self::PostInc
                | Self::PostDec
                | Self::Plus
                | Self::Minus
                | Self::Not
                | Self::BitNot
                | Self::Deref
                | Self::AddrOf
        )
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
