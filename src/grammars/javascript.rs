//! JavaScript (Babylon AST) rule table.
//!
//! Native nodes carry `start`/`end` byte offsets plus a `loc` block and an
//! `extra` block that only duplicate information found elsewhere; both are
//! dropped during preprocessing. Node kinds without a normalization rule keep
//! their native type and are annotated under that name.

use crate::pattern::{any, arr, field, lit, node, obj, part, quoted, var, Pattern};
use crate::roles::Role;
use crate::rules::{RoleRule, Rule, RuleTable, Selector};
use crate::value::Value;
use once_cell::sync::Lazy;

pub const NAMESPACE: &str = "javascript";

/// The shared JavaScript table, built on first use.
pub static JAVASCRIPT: Lazy<RuleTable> = Lazy::new(table);

/// Builds a fresh copy of the JavaScript table.
pub fn table() -> RuleTable {
    RuleTable::new(NAMESPACE)
        .version(1)
        .preprocess(preprocessors())
        .normalize(normalizers())
        .annotations([annotations()])
}

// ============================================================================
// PREPROCESS
// ============================================================================

fn drop_field(name: &str, key: &str) -> Rule {
    Rule::new(name, part("rest", [field(key, any())]), part("rest", []))
}

fn preprocessors() -> Vec<Rule> {
    vec![drop_field("remove loc", "loc"), drop_field("remove extra", "extra")]
}

// ============================================================================
// NORMALIZE
// ============================================================================

fn normalizers() -> Vec<Rule> {
    vec![
        Rule::map_node(
            "identifier",
            "Identifier",
            "Identifier",
            [field("name", var("name"))],
            [field("name", var("name"))],
        ),
        Rule::map_node(
            "string literal",
            "StringLiteral",
            "String",
            [field("value", quoted(var("val")))],
            [field("value", var("val"))],
        ),
        // Blocks with directives ("use strict") are left native.
        Rule::map_node(
            "block statement",
            "BlockStatement",
            "Block",
            [field("body", var("stmts")), field("directives", arr([]))],
            [field("statements", var("stmts"))],
        ),
        Rule::map_node(
            "function declaration",
            "FunctionDeclaration",
            "FunctionGroup",
            [
                field("id", var("name")),
                field("generator", var("gen")),
                field("async", var("async")),
                field("body", var("body")),
                field("params", var("params")),
            ],
            [field("nodes", arr([function_flags(), function_alias()]))],
        ),
    ]
}

fn function_flags() -> Pattern {
    obj([field("async", var("async")), field("generator", var("gen"))])
}

fn function_alias() -> Pattern {
    let returns_undefined = node(
        "Argument",
        [field(
            "init",
            node("Identifier", [field("name", lit("undefined"))]),
        )],
    );
    node(
        "Alias",
        [
            field("name", var("name")),
            field(
                "node",
                node(
                    "Function",
                    [
                        field(
                            "signature",
                            node(
                                "FunctionType",
                                [
                                    field("arguments", var("params")),
                                    field("returns", arr([returns_undefined])),
                                ],
                            ),
                        ),
                        field("body", var("body")),
                    ],
                ),
            ),
        ],
    )
}

// ============================================================================
// ANNOTATE
// ============================================================================

fn on(type_name: &str, roles: impl IntoIterator<Item = Role>) -> RoleRule {
    RoleRule::on_type(type_name).roles(roles)
}

fn on_any(type_names: &[&str], roles: impl IntoIterator<Item = Role>) -> RoleRule {
    RoleRule::on(Selector::AnyType(
        type_names.iter().map(|t| t.to_string()).collect(),
    ))
    .roles(roles)
}

fn prop(field_name: &str, roles: impl IntoIterator<Item = Role>) -> RoleRule {
    RoleRule::on_field(field_name).roles(roles)
}

fn operator(type_name: &str, op: &str, roles: impl IntoIterator<Item = Role>) -> RoleRule {
    RoleRule::on(Selector::All(vec![
        Selector::Type(type_name.to_string()),
        Selector::FieldIs {
            field: "operator".to_string(),
            value: Value::from(op),
        },
    ]))
    .roles(roles)
}

fn annotations() -> RoleRule {
    use Role::*;
    on("File", [File]).descendants([
        // Identifiers
        on("Identifier", [Expression, Identifier]),
        // Literals
        on("RegExpLiteral", [Expression, Literal, Regexp]),
        on("NullLiteral", [Expression, Literal, Null]),
        on("String", [Expression, Literal, String]),
        on("BooleanLiteral", [Expression, Literal, Boolean]),
        on("NumericLiteral", [Expression, Literal, Number]),
        on("Program", [Module]).descendants(program()),
    ])
}

fn program() -> Vec<RoleRule> {
    let mut rules = statements();
    rules.extend(control_flow());
    rules.extend(expressions());
    rules.extend(operators());
    rules
}

fn statements() -> Vec<RoleRule> {
    use Role::*;
    vec![
        on("ExpressionStatement", [Statement]),
        on("Block", [Statement, Block, Scope]),
        on("EmptyStatement", [Statement]),
        on("DebuggerStatement", [Statement, Incomplete]),
        on("WithStatement", [Statement, Scope, Block, Incomplete])
            .children([prop("object", [Incomplete])]),
        on("FunctionGroup", [Statement, Declaration, Function]),
        on("Alias", [Declaration, Function, Name]),
        on("Function", [Function, Body]),
        on("FunctionType", [Function, Type])
            .children([prop("arguments", [Function, Argument])]),
        on("Argument", [Function, Return, Argument]),
    ]
}

fn control_flow() -> Vec<RoleRule> {
    use Role::*;
    vec![
        on("ReturnStatement", [Statement, Return]),
        on("LabeledStatement", [Statement, Incomplete]),
        on("BreakStatement", [Statement, Break]),
        on("ContinueStatement", [Statement, Continue]),
        on("IfStatement", [Statement, If]).children([
            prop("test", [If, Condition]),
            prop("consequent", [If, Then, Body]),
            prop("alternate", [If, Else, Body]),
        ]),
        on("SwitchStatement", [Statement, Switch])
            .children([prop("discriminant", [Switch, Condition])]),
        on("SwitchCase", [Switch, Case]).children([prop("test", [Case, Condition])]),
        on("ThrowStatement", [Statement, Throw]),
        on("TryStatement", [Statement, Try]).children([prop("finalizer", [Try, Finally])]),
        on("CatchClause", [Try, Catch]),
        on("WhileStatement", [Statement, While]).children([
            prop("test", [While, Condition]),
            prop("body", [While, Body]),
        ]),
        on("DoWhileStatement", [Statement, DoWhile]).children([
            prop("test", [DoWhile, Condition]),
            prop("body", [DoWhile, Body]),
        ]),
        on("ForStatement", [Statement, For]).children([
            prop("init", [For, Initialization]),
            prop("test", [For, Condition]),
            prop("update", [For, Update]),
        ]),
        on_any(&["ForInStatement", "ForOfStatement"], [Statement, For, Iterator]).children([
            prop("left", [For, Iterator]),
            prop("right", [For]),
            prop("body", [For, Body]),
        ]),
    ]
}

fn expressions() -> Vec<RoleRule> {
    use Role::*;
    vec![
        on("Super", [Expression, Identifier, Base]),
        on("Import", [Expression, Import]),
        on("ThisExpression", [Expression, This]),
        on("ArrowFunctionExpression", [Expression, Function]),
        on("YieldExpression", [Expression, Return, Incomplete]),
        on("AwaitExpression", [Expression, Incomplete]),
        on("ArrayExpression", [Expression, Initialization, List, Literal]),
        on("ObjectExpression", [Expression, Initialization, Literal]),
        on("FunctionExpression", [Expression, Function]),
        on("CallExpression", [Expression, Call]).children([
            prop("callee", [Call, Callee]),
            prop("arguments", [Call, Argument, Positional]),
        ]),
        on("MemberExpression", [Qualified, Expression, Identifier]),
        on_any(&["UnaryExpression", "UpdateExpression"], [Expression, Unary]),
        on("BinaryExpression", [Expression, Binary]).children([
            prop("left", [Binary, Left]),
            prop("right", [Binary, Right]),
        ]),
        on("ObjectMethod", [Function, Assignment]),
        on("ObjectProperty", [Identifier, Assignment]),
    ]
}

fn operators() -> Vec<RoleRule> {
    use Role::*;
    vec![
        operator("BinaryExpression", "+", [Operator, Arithmetic, Add]),
        operator("BinaryExpression", "-", [Operator, Arithmetic, Substract]),
        operator("BinaryExpression", "*", [Operator, Arithmetic, Multiply]),
        operator("BinaryExpression", "/", [Operator, Arithmetic, Divide]),
        operator("BinaryExpression", "%", [Operator, Arithmetic, Modulo]),
        operator("BinaryExpression", "==", [Operator, Relational, Equal]),
        operator("BinaryExpression", "===", [Operator, Relational, Identical]),
        operator("BinaryExpression", "<", [Operator, Relational, LessThan]),
        operator("BinaryExpression", "<=", [Operator, Relational, LessThanOrEqual]),
        operator("BinaryExpression", ">", [Operator, Relational, GreaterThan]),
        operator("BinaryExpression", ">=", [Operator, Relational, GreaterThanOrEqual]),
        operator("BinaryExpression", "in", [Operator, Relational, Contains]),
        operator("BinaryExpression", "&", [Operator, Bitwise, And]),
        operator("BinaryExpression", "|", [Operator, Bitwise, Or]),
        operator("BinaryExpression", "^", [Operator, Bitwise, Xor]),
        operator("BinaryExpression", "<<", [Operator, Bitwise, LeftShift]),
        operator("BinaryExpression", ">>", [Operator, Bitwise, RightShift]),
        operator("LogicalExpression", "&&", [Expression, Binary, Operator, Boolean, And]),
        operator("LogicalExpression", "||", [Expression, Binary, Operator, Boolean, Or]),
        operator("UnaryExpression", "!", [Operator, Boolean, Not]),
        operator("UnaryExpression", "-", [Operator, Arithmetic, Negative]),
        operator("UnaryExpression", "+", [Operator, Arithmetic, Positive]),
        operator("UpdateExpression", "++", [Operator, Increment]),
        operator("UpdateExpression", "--", [Operator, Decrement]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_cover_converted_kinds() {
        let known = JAVASCRIPT.known_types();
        for ty in ["Identifier", "StringLiteral", "BlockStatement", "FunctionDeclaration"] {
            assert!(known.native.contains(ty), "{ty} missing from native types");
        }
        for ty in ["String", "Block", "FunctionGroup", "Alias", "Function", "Argument"] {
            assert!(known.canonical.contains(ty), "{ty} missing from canonical types");
        }
    }

    #[test]
    fn table_survives_json_round_trip() {
        let json = serde_json::to_string(&table()).unwrap();
        let loaded = RuleTable::from_json_str(&json).unwrap();
        assert_eq!(loaded.normalize, JAVASCRIPT.normalize);
        assert_eq!(loaded.annotations, JAVASCRIPT.annotations);
    }
}
