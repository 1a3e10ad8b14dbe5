//! C++ cursor classification over tree-sitter-cpp syntax trees.
//!
//! The classifier makes a single preorder pass over the native tree. Each
//! native node is either:
//!
//! - **classified**: it opens a cursor of exactly one [`CursorKind`],
//! - **transparent**: grammar glue (declarators, argument lists, condition
//!   clauses, ...) whose named children are spliced into the enclosing cursor,
//! - **skipped**: tokens with no cursor of their own (primitive types,
//!   qualifiers, comments, string fragments),
//! - **unclassified**: anything else, which becomes an `Unclassified` cursor
//!   whose children are still walked.
//!
//! No node is revisited once its cursor is emitted.

use std::collections::HashSet;
use tracing::trace;
use tree_sitter::Node;

use super::tree_sitter_utils::{
    has_token, named_children, named_children_with_fields, node_text, token_child,
};
use crate::extent::trim_trailing_whitespace;
use crate::kind::{CursorKind, Operator};
use crate::tree::{CursorId, TreeBuilder};
use crate::types::SourceExtent;

/// tree-sitter-cpp node kinds with special handling.
mod node_kinds {
    pub const FUNCTION_DECLARATOR: &str = "function_declarator";
    pub const POINTER_DECLARATOR: &str = "pointer_declarator";
    pub const REFERENCE_DECLARATOR: &str = "reference_declarator";
    pub const PARENTHESIZED_DECLARATOR: &str = "parenthesized_declarator";
    pub const ATTRIBUTED_DECLARATOR: &str = "attributed_declarator";
    pub const INIT_DECLARATOR: &str = "init_declarator";
    pub const ARRAY_DECLARATOR: &str = "array_declarator";
    pub const QUALIFIED_IDENTIFIER: &str = "qualified_identifier";
    pub const DESTRUCTOR_NAME: &str = "destructor_name";
    pub const OPERATOR_CAST: &str = "operator_cast";
    pub const TYPE_IDENTIFIER: &str = "type_identifier";
    pub const TEMPLATE_TYPE: &str = "template_type";
    pub const TEMPLATE_FUNCTION: &str = "template_function";
    pub const NAMESPACE_IDENTIFIER: &str = "namespace_identifier";
    pub const NESTED_NAMESPACE_SPECIFIER: &str = "nested_namespace_specifier";
    pub const COMPOUND_STATEMENT: &str = "compound_statement";
    pub const PARAMETER_LIST: &str = "parameter_list";
    pub const PARAMETER_DECLARATION: &str = "parameter_declaration";
    pub const ACCESS_SPECIFIER: &str = "access_specifier";
    pub const COMMENT: &str = "comment";
}

/// Glue nodes: no cursor, children spliced into the parent.
const TRANSPARENT: &[&str] = &[
    "expression_statement",
    "parameter_list",
    "argument_list",
    "condition_clause",
    "declaration_list",
    "field_declaration_list",
    "enumerator_list",
    "template_argument_list",
    "type_descriptor",
    "else_clause",
    "field_initializer_list",
    "new_declarator",
    "subscript_argument_list",
    "abstract_function_declarator",
    "abstract_pointer_declarator",
    "abstract_reference_declarator",
    "abstract_array_declarator",
    "abstract_parenthesized_declarator",
    "lambda_capture_specifier",
    "lambda_default_capture",
    "decltype",
    "dependent_type",
    "init_statement",
    "trailing_return_type",
    "bitfield_clause",
    "initializer_pair",
];

/// Tokens that never produce a cursor.
const SKIPPED: &[&str] = &[
    "comment",
    "primitive_type",
    "sized_type_specifier",
    "type_qualifier",
    "storage_class_specifier",
    "virtual",
    "virtual_specifier",
    "explicit_function_specifier",
    "default_method_clause",
    "delete_method_clause",
    "pure_virtual_clause",
    "placeholder_type_specifier",
    "auto",
    "string_content",
    "escape_sequence",
    "raw_string_delimiter",
    "raw_string_content",
    "character",
    "preproc_arg",
    "field_identifier",
    "statement_identifier",
    "destructor_name",
    "operator_name",
    "attribute_specifier",
    "attribute_declaration",
    "ms_declspec_modifier",
    "noexcept",
    "throw_specifier",
    "literal_suffix",
    "system_lib_string",
    "field_designator",
    "subscript_designator",
    "preproc_params",
];

/// Callee names that make a call a named cast.
const NAMED_CASTS: &[&str] = &["static_cast", "dynamic_cast", "const_cast", "reinterpret_cast"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    File,
    Namespace,
    Class(String),
    Function,
}

/// Builds the cursor tree for one native parse.
pub(crate) struct Classifier<'s> {
    source: &'s [u8],
    builder: TreeBuilder,
    scopes: Vec<Scope>,
    /// Record names seen so far, used to tell `A::f` methods from namespace-qualified functions
    known_records: HashSet<String>,
}

impl<'s> Classifier<'s> {
    pub(crate) fn new(builder: TreeBuilder, source: &'s [u8]) -> Self {
        Self {
            source,
            builder,
            scopes: vec![Scope::File],
            known_records: HashSet::new(),
        }
    }

    /// Classify the children of the native root and hand back the builder.
    pub(crate) fn run(mut self, root: Node<'_>) -> TreeBuilder {
        self.visit_children(root);
        self.builder
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn visit(&mut self, node: Node<'_>) {
        if node.is_missing() {
            return;
        }
        let kind = node.kind();
        if SKIPPED.contains(&kind) {
            return;
        }
        if TRANSPARENT.contains(&kind) {
            if kind == "expression_statement" && named_children(node).is_empty() {
                self.null_statement(node);
            } else {
                self.visit_children(node);
            }
            return;
        }

        match kind {
            // Preprocessor
            "preproc_include" => self.inclusion(node),
            "preproc_def" | "preproc_function_def" => self.macro_definition(node),
            "preproc_call" => self.directive(node),
            "preproc_if" | "preproc_ifdef" | "preproc_elif" | "preproc_elifdef" | "preproc_else" => {
                self.conditional_block(node);
            }

            // Declarations
            "function_definition" => self.function(node, node, &[]),
            "declaration" => self.declaration(node),
            "field_declaration" => self.field_declaration(node),
            "type_definition" => self.typedef(node),
            "alias_declaration" => self.alias(node, node, &[]),
            "class_specifier" | "struct_specifier" | "union_specifier" => {
                self.record(node, node, &[]);
            }
            "enum_specifier" => self.enumeration(node),
            "enumerator" => self.enumerator(node),
            "namespace_definition" => self.namespace(node),
            "namespace_alias_definition" => self.namespace_alias(node),
            "using_declaration" => self.using(node),
            "template_declaration" => self.template(node),
            "template_parameter_list" => self.template_parameters(node),
            "access_specifier" => self.access_specifier(node),
            "friend_declaration" => self.wrap(CursorKind::FriendDecl, node),
            "static_assert_declaration" => self.wrap(CursorKind::StaticAssert, node),
            "linkage_specification" => self.linkage(node),
            "parameter_declaration"
            | "optional_parameter_declaration"
            | "variadic_parameter_declaration" => self.parameter(node, CursorKind::ParmDecl),
            "field_initializer" => self.field_initializer(node),

            // References
            "type_identifier" => self.named_leaf(CursorKind::TypeRef, node),
            "template_type" => self.template_type(node),
            "namespace_identifier" => self.named_leaf(CursorKind::NamespaceRef, node),
            "qualified_identifier" => self.qualified(node),

            // Statements
            "compound_statement" => self.wrap(CursorKind::CompoundStmt, node),
            "if_statement" => self.wrap(CursorKind::IfStmt, node),
            "for_statement" => self.wrap(CursorKind::ForStmt, node),
            "for_range_loop" => self.range_for(node),
            "while_statement" => self.wrap(CursorKind::WhileStmt, node),
            "do_statement" => self.do_statement(node),
            "switch_statement" => self.switch(node),
            "case_statement" => self.case(node),
            "break_statement" => self.leaf(CursorKind::BreakStmt, node),
            "continue_statement" => self.leaf(CursorKind::ContinueStmt, node),
            "return_statement" => self.wrap(CursorKind::ReturnStmt, node),
            "goto_statement" => self.goto(node),
            "labeled_statement" => self.label(node),
            "try_statement" => self.wrap(CursorKind::CxxTryStmt, node),
            "catch_clause" => self.catch(node),
            "throw_statement" | "throw_expression" => self.wrap(CursorKind::CxxThrowExpr, node),

            // Expressions
            "identifier" => self.named_leaf(CursorKind::DeclRefExpr, node),
            "template_function" => self.template_function(node),
            "field_expression" => self.member_expression(node),
            "call_expression" => self.call(node),
            "number_literal" => {
                let kind = if is_floating_literal(&node_text(node, self.source)) {
                    CursorKind::FloatingLiteral
                } else {
                    CursorKind::IntegerLiteral
                };
                self.literal(kind, node);
            }
            "char_literal" => self.literal(CursorKind::CharacterLiteral, node),
            "string_literal" | "raw_string_literal" | "concatenated_string" => {
                self.literal(CursorKind::StringLiteral, node);
            }
            "user_defined_literal" => self.user_defined_literal(node),
            "true" | "false" => self.literal(CursorKind::CxxBoolLiteralExpr, node),
            "null" | "nullptr" => self.literal(CursorKind::CxxNullPtrLiteralExpr, node),
            "this" => self.leaf(CursorKind::CxxThisExpr, node),
            "binary_expression" => self.binary(node),
            "assignment_expression" => self.assignment(node),
            "unary_expression" | "pointer_expression" => self.prefix_unary(node),
            "update_expression" => self.update(node),
            "conditional_expression" => self.wrap(CursorKind::ConditionalOperator, node),
            "subscript_expression" => self.wrap(CursorKind::ArraySubscriptExpr, node),
            "parenthesized_expression" => self.wrap(CursorKind::ParenExpr, node),
            "cast_expression" => self.wrap(CursorKind::CStyleCastExpr, node),
            "compound_literal_expression" => self.wrap(CursorKind::CxxFunctionalCastExpr, node),
            "new_expression" => self.wrap(CursorKind::CxxNewExpr, node),
            "delete_expression" => self.wrap(CursorKind::CxxDeleteExpr, node),
            "sizeof_expression" => self.wrap(CursorKind::SizeOfExpr, node),
            "alignof_expression" => self.wrap(CursorKind::AlignOfExpr, node),
            "comma_expression" => self.wrap(CursorKind::CommaExpr, node),
            "initializer_list" => self.wrap(CursorKind::InitListExpr, node),
            "lambda_expression" => self.lambda(node),

            _ => {
                trace!(native_kind = kind, offset = node.start_byte(), "Unclassified node");
                self.wrap(CursorKind::Unclassified, node);
            }
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        for child in named_children(node) {
            self.visit(child);
        }
    }

    /// Visit a type position: record specifiers without a body are references.
    fn visit_type(&mut self, node: Node<'_>) {
        match node.kind() {
            "class_specifier" | "struct_specifier" | "union_specifier" | "enum_specifier"
                if node.child_by_field_name("body").is_none() =>
            {
                match node.child_by_field_name("name") {
                    Some(name) => self.visit(name),
                    None => self.named_leaf(CursorKind::TypeRef, node),
                }
            }
            _ => self.visit(node),
        }
    }

    // ========================================================================
    // Builder shorthands
    // ========================================================================

    fn extent(&self, node: Node<'_>) -> SourceExtent {
        self.builder.line_index().extent(node.byte_range())
    }

    fn span(&self, start: usize, end: usize) -> SourceExtent {
        self.builder.line_index().extent(start..end)
    }

    fn text(&self, node: Node<'_>) -> String {
        node_text(node, self.source).into_owned()
    }

    fn open(&mut self, kind: CursorKind, node: Node<'_>) -> CursorId {
        let extent = self.extent(node);
        self.builder.open(kind, extent)
    }

    fn spell(&mut self, id: CursorId, name: Node<'_>) {
        let text = self.text(name);
        let extent = self.extent(name);
        self.builder.set_spelling(id, text, extent);
    }

    /// Cursor over `node` with all named children visited.
    fn wrap(&mut self, kind: CursorKind, node: Node<'_>) {
        self.open(kind, node);
        self.visit_children(node);
        self.builder.close();
    }

    /// Childless cursor with no spelling.
    fn leaf(&mut self, kind: CursorKind, node: Node<'_>) {
        let extent = self.extent(node);
        self.builder.leaf(kind, extent);
    }

    /// Childless cursor spelled by its own text.
    fn named_leaf(&mut self, kind: CursorKind, node: Node<'_>) {
        let id = self.open(kind, node);
        self.spell(id, node);
        self.builder.close();
    }

    fn literal(&mut self, kind: CursorKind, node: Node<'_>) {
        self.named_leaf(kind, node);
    }

    fn in_function(&self) -> bool {
        matches!(self.scopes.last(), Some(Scope::Function))
    }

    fn enclosing_class(&self) -> Option<&str> {
        match self.scopes.last() {
            Some(Scope::Class(name)) => Some(name),
            _ => None,
        }
    }

    fn scoped<F: FnOnce(&mut Self)>(&mut self, scope: Scope, f: F) {
        self.scopes.push(scope);
        f(self);
        self.scopes.pop();
    }

    // ========================================================================
    // Preprocessor
    // ========================================================================

    fn directive_extent(&self, node: Node<'_>) -> SourceExtent {
        let range = trim_trailing_whitespace(self.source, node.byte_range());
        self.builder.line_index().extent(range)
    }

    fn inclusion(&mut self, node: Node<'_>) {
        let extent = self.directive_extent(node);
        let id = self.builder.leaf(CursorKind::InclusionDirective, extent);
        if let Some(path) = node.child_by_field_name("path") {
            let text = self.text(path);
            let name = text
                .trim_matches(|c| matches!(c, '"' | '<' | '>'))
                .to_string();
            let path_extent = self.extent(path);
            self.builder.set_spelling(id, name, path_extent);
        }
    }

    fn macro_definition(&mut self, node: Node<'_>) {
        let extent = self.directive_extent(node);
        let id = self.builder.leaf(CursorKind::MacroDefinition, extent);
        if let Some(name) = node.child_by_field_name("name") {
            self.spell(id, name);
        }
    }

    fn directive(&mut self, node: Node<'_>) {
        let extent = self.directive_extent(node);
        let id = self.builder.leaf(CursorKind::PreprocessingDirective, extent);
        if let Some(directive) = node.child_by_field_name("directive") {
            let text = self.text(directive).trim_start_matches('#').trim().to_string();
            let directive_extent = self.extent(directive);
            self.builder.set_spelling(id, text, directive_extent);
        }
    }

    /// `#if` / `#ifdef` / `#else` blocks: guarded items join the enclosing cursor.
    fn conditional_block(&mut self, node: Node<'_>) {
        for (field, child) in named_children_with_fields(node) {
            if matches!(field, Some("condition" | "name")) {
                continue;
            }
            self.visit(child);
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn function_kind(&self, name: Option<Node<'_>>) -> CursorKind {
        let Some(name) = name else {
            return CursorKind::FunctionDecl;
        };
        match name.kind() {
            node_kinds::DESTRUCTOR_NAME => CursorKind::Destructor,
            node_kinds::OPERATOR_CAST => CursorKind::ConversionFunction,
            node_kinds::QUALIFIED_IDENTIFIER => {
                let (scopes, last) = flatten_qualified(name);
                match last.kind() {
                    node_kinds::DESTRUCTOR_NAME => CursorKind::Destructor,
                    node_kinds::OPERATOR_CAST => CursorKind::ConversionFunction,
                    _ => {
                        let owner = scopes.last().map(|s| self.scope_name(*s));
                        match owner {
                            Some(owner) if owner == self.text(last) => CursorKind::Constructor,
                            Some(owner) if self.known_records.contains(&owner) => {
                                CursorKind::CxxMethod
                            }
                            _ => CursorKind::FunctionDecl,
                        }
                    }
                }
            }
            _ => match self.enclosing_class() {
                Some(class) if class == self.text(name) => CursorKind::Constructor,
                Some(_) => CursorKind::CxxMethod,
                None => CursorKind::FunctionDecl,
            },
        }
    }

    /// Name of a scope segment without template arguments.
    fn scope_name(&self, scope: Node<'_>) -> String {
        match scope.kind() {
            node_kinds::TEMPLATE_TYPE => scope
                .child_by_field_name("name")
                .map_or_else(|| self.text(scope), |n| self.text(n)),
            _ => self.text(scope),
        }
    }

    fn function_spelling(&mut self, id: CursorId, name: Node<'_>) {
        match name.kind() {
            node_kinds::QUALIFIED_IDENTIFIER => {
                let (_, last) = flatten_qualified(name);
                self.function_spelling(id, last);
            }
            node_kinds::OPERATOR_CAST => {
                let target = name
                    .child_by_field_name("type")
                    .map(|t| self.text(t))
                    .unwrap_or_default();
                let extent = self.extent(name);
                self.builder
                    .set_spelling(id, format!("operator {target}"), extent);
            }
            _ => self.spell(id, name),
        }
    }

    /// `function_definition`, optionally wrapped by a template declaration.
    fn function(&mut self, node: Node<'_>, outer: Node<'_>, template_params: &[Node<'_>]) {
        let declarator = node.child_by_field_name("declarator");
        let name = declarator.and_then(declarator_name);
        let kind = if !template_params.is_empty() {
            CursorKind::FunctionTemplate
        } else {
            self.function_kind(name)
        };

        let id = self.open(kind, outer);
        if let Some(name) = name {
            self.function_spelling(id, name);
        }
        if node.child_by_field_name("body").is_some() {
            self.builder.mark_definition(id);
        }
        for params in template_params {
            self.visit(*params);
        }

        for (field, child) in named_children_with_fields(node) {
            match field {
                Some("type") => self.visit_type(child),
                Some("declarator") => self.walk_declarator(child),
                Some("body") => self.scoped(Scope::Function, |this| this.visit(child)),
                _ => self.visit(child),
            }
        }
        self.builder.close();
    }

    /// Local declarations are wrapped in a `DeclStmt`; others emit their declarators directly.
    fn declaration(&mut self, node: Node<'_>) {
        let local = self.in_function();
        if local {
            self.open(CursorKind::DeclStmt, node);
        }
        let var_kind = if self.enclosing_class().is_some() {
            CursorKind::FieldDecl
        } else {
            CursorKind::VarDecl
        };
        self.declarators(node, node, var_kind, true, &[]);
        if local {
            self.builder.close();
        }
    }

    fn field_declaration(&mut self, node: Node<'_>) {
        self.declarators(node, node, CursorKind::FieldDecl, true, &[]);
    }

    fn typedef(&mut self, node: Node<'_>) {
        self.declarators(node, node, CursorKind::TypedefDecl, false, &[]);
    }

    /// One cursor per declarator of a declaration-like node.
    ///
    /// The first cursor spans from the start of `outer` (type, specifiers and
    /// any template header included) to the end of its declarator; later ones
    /// cover only their own declarator, so siblings never overlap.
    fn declarators(
        &mut self,
        node: Node<'_>,
        outer: Node<'_>,
        var_kind: CursorKind,
        detect_functions: bool,
        template_params: &[Node<'_>],
    ) {
        let children = named_children_with_fields(node);
        // each declarator owns the initializer or bitfield width that follows it
        let mut declarators: Vec<(Node<'_>, Vec<Node<'_>>)> = Vec::new();
        for (field, child) in &children {
            if *field == Some("declarator") {
                declarators.push((*child, Vec::new()));
            } else if let Some((_, trailing)) = declarators.last_mut() {
                if *field == Some("default_value")
                    || matches!(child.kind(), "bitfield_clause" | "initializer_list")
                {
                    trailing.push(*child);
                }
            }
        }

        if declarators.is_empty() {
            // `struct S { ... };`, `class X;`: the type itself is the declaration
            for (field, child) in &children {
                if *field == Some("type") {
                    self.visit(*child);
                }
            }
            return;
        }

        let type_node = node.child_by_field_name("type");
        for (index, (declarator, trailing)) in declarators.iter().enumerate() {
            let start = if index == 0 { outer.start_byte() } else { declarator.start_byte() };
            let end = trailing
                .last()
                .map_or(declarator.end_byte(), |value| value.end_byte().max(declarator.end_byte()));

            let name = declarator_name(*declarator);
            let function = detect_functions && find_function_declarator(*declarator).is_some();
            let kind = match (!template_params.is_empty(), function) {
                (true, true) => CursorKind::FunctionTemplate,
                (false, true) => self.function_kind(name),
                (_, false) => var_kind,
            };

            let extent = self.span(start, end);
            let id = self.builder.open(kind, extent);
            if let Some(name) = name {
                if function {
                    self.function_spelling(id, name);
                } else {
                    self.spell(id, name);
                }
            }

            if index == 0 {
                for params in template_params {
                    self.visit(*params);
                }
                if let Some(type_node) = type_node {
                    self.visit_type(type_node);
                }
            }
            self.walk_declarator(*declarator);
            for value in trailing {
                self.visit(*value);
            }
            self.builder.close();
        }
    }

    /// Walk a declarator chain, emitting everything but the declared name.
    fn walk_declarator(&mut self, node: Node<'_>) {
        match node.kind() {
            node_kinds::INIT_DECLARATOR => {
                for (field, child) in named_children_with_fields(node) {
                    if field == Some("declarator") {
                        self.walk_declarator(child);
                    } else {
                        self.visit(child);
                    }
                }
            }
            node_kinds::POINTER_DECLARATOR
            | node_kinds::REFERENCE_DECLARATOR
            | node_kinds::PARENTHESIZED_DECLARATOR
            | node_kinds::ATTRIBUTED_DECLARATOR
            | "variadic_declarator" => {
                for child in named_children(node) {
                    self.walk_declarator(child);
                }
            }
            node_kinds::ARRAY_DECLARATOR | node_kinds::FUNCTION_DECLARATOR => {
                for (field, child) in named_children_with_fields(node) {
                    if field == Some("declarator") {
                        self.walk_declarator(child);
                    } else {
                        self.visit(child);
                    }
                }
            }
            node_kinds::QUALIFIED_IDENTIFIER => {
                let (scopes, _) = flatten_qualified(node);
                for scope in scopes {
                    self.scope_reference(scope);
                }
            }
            node_kinds::OPERATOR_CAST => {
                if let Some(target) = node.child_by_field_name("type") {
                    self.visit_type(target);
                }
                if let Some(inner) = node.child_by_field_name("declarator") {
                    self.walk_declarator(inner);
                }
            }
            "identifier" | "field_identifier" | node_kinds::TYPE_IDENTIFIER | node_kinds::DESTRUCTOR_NAME
            | "operator_name" | "structured_binding_declarator" => {}
            _ => self.visit(node),
        }
    }

    fn parameter(&mut self, node: Node<'_>, kind: CursorKind) {
        let declarator = node.child_by_field_name("declarator");
        let id = self.open(kind, node);
        if let Some(name) = declarator.and_then(declarator_name) {
            self.spell(id, name);
        }
        for (field, child) in named_children_with_fields(node) {
            match field {
                Some("type") => self.visit_type(child),
                Some("declarator") => self.walk_declarator(child),
                _ => self.visit(child),
            }
        }
        self.builder.close();
    }

    fn field_initializer(&mut self, node: Node<'_>) {
        let id = self.open(CursorKind::MemberRef, node);
        let children = named_children(node);
        let mut rest = children.as_slice();
        if let Some((name, tail)) = children.split_first() {
            if !matches!(name.kind(), "argument_list" | "initializer_list") {
                self.spell(id, *name);
                rest = tail;
            }
        }
        for child in rest {
            self.visit(*child);
        }
        self.builder.close();
    }

    /// `class` / `struct` / `union`, optionally wrapped by a template declaration.
    fn record(&mut self, node: Node<'_>, outer: Node<'_>, template_params: &[Node<'_>]) {
        let kind = if !template_params.is_empty() {
            CursorKind::ClassTemplate
        } else {
            match node.kind() {
                "struct_specifier" => CursorKind::StructDecl,
                "union_specifier" => CursorKind::UnionDecl,
                _ => CursorKind::ClassDecl,
            }
        };
        let name = node.child_by_field_name("name");
        let class_name = name.map(|n| self.record_name(n)).unwrap_or_default();

        let id = self.open(kind, outer);
        if let Some(name) = name {
            let extent = self.extent(name);
            self.builder.set_spelling(id, class_name.clone(), extent);
        }
        for params in template_params {
            self.visit(*params);
        }
        if node.child_by_field_name("body").is_some() {
            self.builder.mark_definition(id);
            if !class_name.is_empty() {
                self.known_records.insert(class_name.clone());
            }
        }

        for (field, child) in named_children_with_fields(node) {
            match field {
                Some("name") => {
                    // specializations name their arguments: `struct Hash<int>`
                    if child.kind() == node_kinds::TEMPLATE_TYPE {
                        if let Some(args) = child.child_by_field_name("arguments") {
                            self.visit(args);
                        }
                    }
                }
                Some("body") => {
                    let scope = Scope::Class(class_name.clone());
                    self.scoped(scope, |this| this.visit(child));
                }
                _ if child.kind() == "base_class_clause" => self.base_classes(child),
                _ => self.visit(child),
            }
        }
        self.builder.close();
    }

    fn record_name(&self, name: Node<'_>) -> String {
        match name.kind() {
            node_kinds::QUALIFIED_IDENTIFIER => {
                let (_, last) = flatten_qualified(name);
                self.scope_name(last)
            }
            _ => self.scope_name(name),
        }
    }

    fn base_classes(&mut self, node: Node<'_>) {
        for child in named_children(node) {
            if child.kind() != node_kinds::ACCESS_SPECIFIER {
                self.visit(child);
            }
        }
    }

    fn access_specifier(&mut self, node: Node<'_>) {
        // the trailing `:` is a sibling in the native tree
        let end = node
            .next_sibling()
            .filter(|s| s.kind() == ":")
            .map_or(node.end_byte(), |s| s.end_byte());
        let extent = self.span(node.start_byte(), end);
        let id = self.builder.leaf(CursorKind::AccessSpecifier, extent);
        self.spell(id, node);
    }

    fn enumeration(&mut self, node: Node<'_>) {
        let id = self.open(CursorKind::EnumDecl, node);
        if let Some(name) = node.child_by_field_name("name") {
            self.spell(id, name);
        }
        if has_token(node, "class") || has_token(node, "struct") {
            self.builder.mark_scoped(id);
        }
        if node.child_by_field_name("body").is_some() {
            self.builder.mark_definition(id);
        }
        for (field, child) in named_children_with_fields(node) {
            match field {
                Some("name") => {}
                Some("base") => self.visit_type(child),
                _ => self.visit(child),
            }
        }
        self.builder.close();
    }

    fn enumerator(&mut self, node: Node<'_>) {
        let id = self.open(CursorKind::EnumConstantDecl, node);
        if let Some(name) = node.child_by_field_name("name") {
            self.spell(id, name);
        }
        if let Some(value) = node.child_by_field_name("value") {
            self.visit(value);
        }
        self.builder.close();
    }

    /// `using Name = Type;`, optionally wrapped by a template declaration.
    fn alias(&mut self, node: Node<'_>, outer: Node<'_>, params: &[Node<'_>]) {
        let kind = if !params.is_empty() {
            CursorKind::TypeAliasTemplateDecl
        } else {
            CursorKind::TypeAliasDecl
        };
        let id = self.open(kind, outer);
        if let Some(name) = node.child_by_field_name("name") {
            self.spell(id, name);
        }
        for list in params {
            self.visit(*list);
        }
        if let Some(target) = node.child_by_field_name("type") {
            self.visit_type(target);
        }
        self.builder.close();
    }

    /// `namespace A::B { }` opens one `Namespace` cursor per segment, all with
    /// the full extent, so a position lookup lands on the innermost.
    fn namespace(&mut self, node: Node<'_>) {
        let segments = match node.child_by_field_name("name") {
            Some(name) if name.kind() == node_kinds::NESTED_NAMESPACE_SPECIFIER => {
                namespace_segments(name)
            }
            Some(name) => vec![name],
            None => Vec::new(),
        };

        let opened = segments.len().max(1);
        if segments.is_empty() {
            self.open(CursorKind::Namespace, node);
        }
        for segment in &segments {
            let id = self.open(CursorKind::Namespace, node);
            self.spell(id, *segment);
            self.builder.mark_definition(id);
        }

        if let Some(body) = node.child_by_field_name("body") {
            self.scoped(Scope::Namespace, |this| this.visit(body));
        }
        for _ in 0..opened {
            self.builder.close();
        }
    }

    fn namespace_alias(&mut self, node: Node<'_>) {
        let id = self.open(CursorKind::NamespaceAlias, node);
        if let Some(name) = node.child_by_field_name("name") {
            self.spell(id, name);
        }
        if let Some(value) = node.child_by_field_name("value") {
            self.namespace_references(value);
        }
        self.builder.close();
    }

    fn namespace_references(&mut self, node: Node<'_>) {
        match node.kind() {
            node_kinds::NESTED_NAMESPACE_SPECIFIER => {
                for segment in namespace_segments(node) {
                    self.named_leaf(CursorKind::NamespaceRef, segment);
                }
            }
            node_kinds::QUALIFIED_IDENTIFIER => {
                let (scopes, last) = flatten_qualified(node);
                for scope in scopes {
                    self.named_leaf(CursorKind::NamespaceRef, scope);
                }
                self.named_leaf(CursorKind::NamespaceRef, last);
            }
            _ => self.named_leaf(CursorKind::NamespaceRef, node),
        }
    }

    fn using(&mut self, node: Node<'_>) {
        let target = named_children(node).into_iter().last();
        if has_token(node, "namespace") {
            let id = self.open(CursorKind::UsingDirective, node);
            if let Some(target) = target {
                self.spell(id, target);
                self.namespace_references(target);
            }
            self.builder.close();
            return;
        }

        let id = self.open(CursorKind::UsingDeclaration, node);
        if let Some(target) = target {
            if target.kind() == node_kinds::QUALIFIED_IDENTIFIER {
                let (scopes, last) = flatten_qualified(target);
                self.spell(id, last);
                for scope in scopes {
                    self.scope_reference(scope);
                }
            } else {
                self.spell(id, target);
            }
        }
        self.builder.close();
    }

    fn linkage(&mut self, node: Node<'_>) {
        let id = self.open(CursorKind::LinkageSpec, node);
        if let Some(value) = node.child_by_field_name("value") {
            let text = self.text(value).trim_matches('"').to_string();
            let extent = self.extent(value);
            self.builder.set_spelling(id, text, extent);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body);
        }
        self.builder.close();
    }

    // ========================================================================
    // Templates
    // ========================================================================

    /// A template declaration and its templated entity become one cursor.
    ///
    /// Stacked headers (`template <class T> template <class U> ...`, a member
    /// template defined outside its class template) collapse into that same
    /// cursor, with every parameter list as children in source order.
    fn template(&mut self, node: Node<'_>) {
        let mut params = Vec::new();
        let mut current = node;
        let inner = loop {
            let list = current.child_by_field_name("parameters");
            params.extend(list);
            let body = named_children(current)
                .into_iter()
                .rev()
                .find(|child| Some(*child) != list);
            match body {
                Some(body) if body.kind() == "template_declaration" => current = body,
                body => break body,
            }
        };

        let Some(inner) = inner else {
            self.wrap(CursorKind::Unclassified, node);
            return;
        };

        match inner.kind() {
            "function_definition" => self.function(inner, node, &params),
            "class_specifier" | "struct_specifier" | "union_specifier" => {
                self.record(inner, node, &params);
            }
            "alias_declaration" => self.alias(inner, node, &params),
            "declaration" | "field_declaration"
                if declarator_of(inner).is_some_and(|d| find_function_declarator(d).is_some()) =>
            {
                // single-declarator function template declaration
                self.template_declaration(inner, node, &params);
            }
            "declaration" | "field_declaration" => {
                // variable template, or a static data member template
                self.declarators(inner, node, CursorKind::VarDecl, false, &params);
            }
            "friend_declaration" => {
                self.open(CursorKind::FriendDecl, node);
                for list in &params {
                    self.visit(*list);
                }
                self.visit_children(inner);
                self.builder.close();
            }
            _ => {
                trace!(native_kind = inner.kind(), "Unclassified template body");
                self.wrap(CursorKind::Unclassified, node);
            }
        }
    }

    fn template_declaration(&mut self, inner: Node<'_>, outer: Node<'_>, params: &[Node<'_>]) {
        let declarator = declarator_of(inner);
        let name = declarator.and_then(declarator_name);
        let id = self.open(CursorKind::FunctionTemplate, outer);
        if let Some(name) = name {
            self.function_spelling(id, name);
        }
        for list in params {
            self.visit(*list);
        }
        for (field, child) in named_children_with_fields(inner) {
            match field {
                Some("type") => self.visit_type(child),
                Some("declarator") => self.walk_declarator(child),
                _ => self.visit(child),
            }
        }
        self.builder.close();
    }

    fn template_parameters(&mut self, node: Node<'_>) {
        for child in named_children(node) {
            match child.kind() {
                "type_parameter_declaration" | "variadic_type_parameter_declaration" => {
                    let id = self.open(CursorKind::TemplateTypeParameter, child);
                    if let Some(name) = named_children(child)
                        .into_iter()
                        .find(|c| c.kind() == node_kinds::TYPE_IDENTIFIER)
                    {
                        self.spell(id, name);
                    }
                    self.builder.close();
                }
                "optional_type_parameter_declaration" => {
                    let id = self.open(CursorKind::TemplateTypeParameter, child);
                    if let Some(name) = child.child_by_field_name("name") {
                        self.spell(id, name);
                    }
                    if let Some(default) = child.child_by_field_name("default_type") {
                        self.visit_type(default);
                    }
                    self.builder.close();
                }
                "template_template_parameter_declaration" => {
                    let id = self.open(CursorKind::TemplateTemplateParameter, child);
                    let inner_params = child.child_by_field_name("parameters");
                    if let Some(name) = named_children(child)
                        .into_iter()
                        .rev()
                        .find(|c| Some(*c) != inner_params)
                        .and_then(|c| {
                            if c.kind() == node_kinds::TYPE_IDENTIFIER {
                                Some(c)
                            } else {
                                named_children(c)
                                    .into_iter()
                                    .find(|n| n.kind() == node_kinds::TYPE_IDENTIFIER)
                            }
                        })
                    {
                        self.spell(id, name);
                    }
                    if let Some(inner) = inner_params {
                        self.visit(inner);
                    }
                    self.builder.close();
                }
                "parameter_declaration"
                | "optional_parameter_declaration"
                | "variadic_parameter_declaration" => {
                    self.parameter(child, CursorKind::NonTypeTemplateParameter);
                }
                _ => self.visit(child),
            }
        }
    }

    // ========================================================================
    // References
    // ========================================================================

    fn template_type(&mut self, node: Node<'_>) {
        let id = self.open(CursorKind::TypeRef, node);
        self.spell(id, node);
        if let Some(args) = node.child_by_field_name("arguments") {
            self.visit(args);
        }
        self.builder.close();
    }

    /// `a::b::c`: one cursor for the whole name, scope segments as children.
    fn qualified(&mut self, node: Node<'_>) {
        let (scopes, last) = flatten_qualified(node);
        let is_type = matches!(last.kind(), node_kinds::TYPE_IDENTIFIER | node_kinds::TEMPLATE_TYPE);

        if is_type {
            let id = self.open(CursorKind::TypeRef, node);
            self.spell(id, node);
        } else {
            let id = self.open(CursorKind::DeclRefExpr, node);
            let name = if last.kind() == node_kinds::TEMPLATE_FUNCTION {
                last.child_by_field_name("name").unwrap_or(last)
            } else {
                last
            };
            self.spell(id, name);
        }

        for scope in scopes {
            self.scope_reference(scope);
        }
        if matches!(last.kind(), node_kinds::TEMPLATE_TYPE | node_kinds::TEMPLATE_FUNCTION) {
            if let Some(args) = last.child_by_field_name("arguments") {
                self.visit(args);
            }
        }
        self.builder.close();
    }

    fn scope_reference(&mut self, scope: Node<'_>) {
        match scope.kind() {
            // the grammar tags every scope as a namespace; known records are types
            node_kinds::NAMESPACE_IDENTIFIER if self.known_records.contains(&self.text(scope)) => {
                self.named_leaf(CursorKind::TypeRef, scope);
            }
            node_kinds::NAMESPACE_IDENTIFIER => self.named_leaf(CursorKind::NamespaceRef, scope),
            node_kinds::TEMPLATE_TYPE => self.template_type(scope),
            node_kinds::TYPE_IDENTIFIER => self.named_leaf(CursorKind::TypeRef, scope),
            _ => self.visit(scope),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// A lone `;`: zero-width cursor at the terminator.
    fn null_statement(&mut self, node: Node<'_>) {
        let at = token_child(node, ";").map_or(node.start_byte(), |semi| semi.start_byte());
        let extent = self.builder.line_index().point(at);
        self.builder.leaf(CursorKind::NullStmt, extent);
    }

    fn do_statement(&mut self, node: Node<'_>) {
        self.open(CursorKind::DoStmt, node);
        for (field, child) in named_children_with_fields(node) {
            if field == Some("condition") && child.kind() == "parenthesized_expression" {
                self.visit_children(child);
            } else {
                self.visit(child);
            }
        }
        self.builder.close();
    }

    /// Case labels become direct children: the body's braces are transparent.
    fn switch(&mut self, node: Node<'_>) {
        self.open(CursorKind::SwitchStmt, node);
        for (field, child) in named_children_with_fields(node) {
            if field == Some("body") && child.kind() == node_kinds::COMPOUND_STATEMENT {
                self.visit_children(child);
            } else {
                self.visit(child);
            }
        }
        self.builder.close();
    }

    fn case(&mut self, node: Node<'_>) {
        let kind = if node.child_by_field_name("value").is_some() {
            CursorKind::CaseStmt
        } else {
            CursorKind::DefaultStmt
        };
        self.wrap(kind, node);
    }

    fn goto(&mut self, node: Node<'_>) {
        let id = self.open(CursorKind::GotoStmt, node);
        if let Some(label) = node.child_by_field_name("label") {
            self.spell(id, label);
        }
        self.builder.close();
    }

    fn label(&mut self, node: Node<'_>) {
        let id = self.open(CursorKind::LabelStmt, node);
        if let Some(label) = node.child_by_field_name("label") {
            self.spell(id, label);
        }
        self.visit_children(node);
        self.builder.close();
    }

    /// `for (init; T x : range)`: the loop variable becomes a `VarDecl` running
    /// from its first specifier to its declarator.
    fn range_for(&mut self, node: Node<'_>) {
        self.open(CursorKind::ForRangeStmt, node);
        let Some(declarator) = node.child_by_field_name("declarator") else {
            self.visit_children(node);
            self.builder.close();
            return;
        };

        let (head, tail): (Vec<_>, Vec<_>) = named_children_with_fields(node)
            .into_iter()
            .partition(|(_, child)| child.start_byte() < declarator.start_byte());

        for (field, child) in &head {
            if *field == Some("initializer") {
                self.visit(*child);
            }
        }

        let start = head
            .iter()
            .find(|(field, _)| *field != Some("initializer"))
            .map_or(declarator.start_byte(), |(_, child)| child.start_byte());
        let extent = self.span(start, declarator.end_byte());
        let id = self.builder.open(CursorKind::VarDecl, extent);
        if let Some(name) = declarator_name(declarator) {
            self.spell(id, name);
        }
        for (field, child) in &head {
            match field {
                Some("initializer") => {}
                Some("type") => self.visit_type(*child),
                _ => self.visit(*child),
            }
        }
        self.walk_declarator(declarator);
        self.builder.close();

        for (_, child) in tail {
            if child != declarator {
                self.visit(child);
            }
        }
        self.builder.close();
    }

    fn catch(&mut self, node: Node<'_>) {
        self.open(CursorKind::CxxCatchStmt, node);
        for (field, child) in named_children_with_fields(node) {
            if field == Some("parameters") && child.kind() == node_kinds::PARAMETER_LIST {
                for param in named_children(child) {
                    if param.kind() == node_kinds::PARAMETER_DECLARATION {
                        self.parameter(param, CursorKind::VarDecl);
                    } else {
                        self.visit(param);
                    }
                }
            } else {
                self.visit(child);
            }
        }
        self.builder.close();
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn user_defined_literal(&mut self, node: Node<'_>) {
        let inner = named_children(node).into_iter().next();
        let kind = match inner.map(|n| n.kind()) {
            Some("number_literal") => {
                let text = inner.map(|n| self.text(n)).unwrap_or_default();
                if is_floating_literal(&text) {
                    CursorKind::FloatingLiteral
                } else {
                    CursorKind::IntegerLiteral
                }
            }
            Some("char_literal") => CursorKind::CharacterLiteral,
            Some("string_literal" | "raw_string_literal" | "concatenated_string") => {
                CursorKind::StringLiteral
            }
            _ => CursorKind::Unclassified,
        };
        self.literal(kind, node);
    }

    fn template_function(&mut self, node: Node<'_>) {
        let id = self.open(CursorKind::DeclRefExpr, node);
        if let Some(name) = node.child_by_field_name("name") {
            self.spell(id, name);
        }
        if let Some(args) = node.child_by_field_name("arguments") {
            self.visit(args);
        }
        self.builder.close();
    }

    fn member_expression(&mut self, node: Node<'_>) {
        let id = self.open(CursorKind::MemberRefExpr, node);
        if let Some(field) = node.child_by_field_name("field") {
            self.spell(id, field);
        }
        if let Some(argument) = node.child_by_field_name("argument") {
            self.visit(argument);
        }
        self.builder.close();
    }

    fn call(&mut self, node: Node<'_>) {
        let function = node.child_by_field_name("function");
        let arguments = node.child_by_field_name("arguments");

        if let Some(callee) = function.filter(|f| f.kind() == node_kinds::TEMPLATE_FUNCTION) {
            if let Some(name) = callee.child_by_field_name("name") {
                let cast = self.text(name);
                if NAMED_CASTS.contains(&cast.as_str()) {
                    let id = self.open(CursorKind::CxxNamedCastExpr, node);
                    self.spell(id, name);
                    if let Some(args) = callee.child_by_field_name("arguments") {
                        self.visit(args);
                    }
                    if let Some(arguments) = arguments {
                        self.visit(arguments);
                    }
                    self.builder.close();
                    return;
                }
            }
        }

        let id = self.open(CursorKind::CallExpr, node);
        if let Some(name) = function.and_then(callee_name) {
            self.spell(id, name);
        }
        if let Some(function) = function {
            self.visit(function);
        }
        if let Some(arguments) = arguments {
            self.visit(arguments);
        }
        self.builder.close();
    }

    fn operator_token(&self, node: Node<'_>) -> Option<String> {
        node.child_by_field_name("operator").map(|op| self.text(op))
    }

    fn binary(&mut self, node: Node<'_>) {
        let id = self.open(CursorKind::BinaryOperator, node);
        if let Some(op) = self
            .operator_token(node)
            .and_then(|t| Operator::from_binary_token(&t))
        {
            self.builder.set_operator(id, op);
        }
        self.visit_children(node);
        self.builder.close();
    }

    fn assignment(&mut self, node: Node<'_>) {
        let op = self
            .operator_token(node)
            .and_then(|t| Operator::from_binary_token(&t));
        let kind = if op.is_some_and(Operator::is_compound_assignment) {
            CursorKind::CompoundAssignOperator
        } else {
            CursorKind::BinaryOperator
        };
        let id = self.open(kind, node);
        if let Some(op) = op {
            self.builder.set_operator(id, op);
        }
        self.visit_children(node);
        self.builder.close();
    }

    fn prefix_unary(&mut self, node: Node<'_>) {
        let id = self.open(CursorKind::UnaryOperator, node);
        if let Some(op) = self
            .operator_token(node)
            .and_then(|t| Operator::from_prefix_token(&t))
        {
            self.builder.set_operator(id, op);
        }
        self.visit_children(node);
        self.builder.close();
    }

    fn update(&mut self, node: Node<'_>) {
        let id = self.open(CursorKind::UnaryOperator, node);
        let operator = node.child_by_field_name("operator");
        let argument = node.child_by_field_name("argument");
        if let (Some(operator), Some(argument)) = (operator, argument) {
            let token = self.text(operator);
            let op = if operator.start_byte() < argument.start_byte() {
                Operator::from_prefix_token(&token)
            } else {
                Operator::from_postfix_token(&token)
            };
            if let Some(op) = op {
                self.builder.set_operator(id, op);
            }
        }
        self.visit_children(node);
        self.builder.close();
    }

    fn lambda(&mut self, node: Node<'_>) {
        self.open(CursorKind::LambdaExpr, node);
        for (field, child) in named_children_with_fields(node) {
            if field == Some("body") {
                self.scoped(Scope::Function, |this| this.visit(child));
            } else {
                self.visit(child);
            }
        }
        self.builder.close();
    }
}

// ============================================================================
// Native-tree helpers
// ============================================================================

/// Literal subtype from the token's lexical form.
pub(crate) fn is_floating_literal(text: &str) -> bool {
    let lower: String = text
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if let Some(hex) = lower.strip_prefix("0x") {
        return hex.contains('.') || hex.contains('p');
    }
    if lower.starts_with("0b") {
        return false;
    }
    lower.contains('.') || lower.contains('e') || lower.ends_with('f')
}

/// Split `a::b::c` into its scope segments and final name.
fn flatten_qualified(node: Node<'_>) -> (Vec<Node<'_>>, Node<'_>) {
    let mut scopes = Vec::new();
    let mut current = node;
    while current.kind() == node_kinds::QUALIFIED_IDENTIFIER {
        if let Some(scope) = current.child_by_field_name("scope") {
            scopes.push(scope);
        }
        match current.child_by_field_name("name") {
            Some(name) => current = name,
            None => break,
        }
    }
    (scopes, current)
}

fn namespace_segments(node: Node<'_>) -> Vec<Node<'_>> {
    let mut segments = Vec::new();
    for child in named_children(node) {
        match child.kind() {
            node_kinds::NAMESPACE_IDENTIFIER | "identifier" => segments.push(child),
            node_kinds::NESTED_NAMESPACE_SPECIFIER => segments.extend(namespace_segments(child)),
            _ => {}
        }
    }
    segments
}

/// The name a declarator declares.
fn declarator_name(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "identifier"
        | "field_identifier"
        | node_kinds::TYPE_IDENTIFIER
        | node_kinds::DESTRUCTOR_NAME
        | "operator_name"
        | node_kinds::OPERATOR_CAST
        | node_kinds::QUALIFIED_IDENTIFIER
        | node_kinds::TEMPLATE_FUNCTION
        | "structured_binding_declarator" => Some(node),
        node_kinds::COMMENT => None,
        _ => inner_declarator(node).and_then(declarator_name),
    }
}

/// The function declarator inside pointer/reference wrappers, if this declares a function.
///
/// `int (*fp)(int)` declares a variable: a parenthesized inner declarator is a
/// function pointer, not a function.
fn find_function_declarator(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        node_kinds::FUNCTION_DECLARATOR => {
            let inner = node.child_by_field_name("declarator")?;
            (inner.kind() != node_kinds::PARENTHESIZED_DECLARATOR).then_some(node)
        }
        node_kinds::POINTER_DECLARATOR
        | node_kinds::REFERENCE_DECLARATOR
        | node_kinds::ATTRIBUTED_DECLARATOR => {
            inner_declarator(node).and_then(find_function_declarator)
        }
        _ => None,
    }
}

/// The declarator wrapped by `node`.
///
/// Reference and attributed declarators carry no `declarator` field: the
/// wrapped declarator is their last (resp. first) named child.
fn inner_declarator(node: Node<'_>) -> Option<Node<'_>> {
    if let Some(inner) = node.child_by_field_name("declarator") {
        return Some(inner);
    }
    let children = named_children(node);
    if node.kind() == node_kinds::ATTRIBUTED_DECLARATOR {
        children.into_iter().next()
    } else {
        children.into_iter().last()
    }
}

fn declarator_of(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("declarator")
}

/// The identifier a call expression is spelled by.
fn callee_name(function: Node<'_>) -> Option<Node<'_>> {
    match function.kind() {
        "identifier" => Some(function),
        node_kinds::QUALIFIED_IDENTIFIER => {
            let (_, last) = flatten_qualified(function);
            callee_name(last)
        }
        "field_expression" => function.child_by_field_name("field"),
        node_kinds::TEMPLATE_FUNCTION | "template_method" => function.child_by_field_name("name"),
        node_kinds::DESTRUCTOR_NAME | "operator_name" | node_kinds::TYPE_IDENTIFIER => Some(function),
        _ => None,
    }
}
