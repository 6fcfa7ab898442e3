//! Rule execution and annotation tests.

mod common;

use arbor::config::ErrorPolicy;
use arbor::errors::{MismatchKind, NormalizeError};
use arbor::pattern::*;
use arbor::roles::Role;
use arbor::rules::{
    annotate, Direction, Dispatch, PassRunner, RoleRule, Rule, RuleTable, Selector,
};
use arbor::value::Value;
use common::{at, json, role_names};
use pretty_assertions::assert_eq;

fn rename(from: &str, to: &str) -> Rule {
    Rule::map_node(
        &format!("{from} to {to}"),
        from,
        to,
        [field("child", var("child"))],
        [field("child", var("child"))],
    )
}

#[cfg(test)]
mod chain_dispatch {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_matching_rule_applies_in_order() {
        let rules = vec![
            Rule::new(
                "drop loc",
                part("rest", [field("loc", any())]),
                part("rest", []),
            ),
            Rule::new(
                "drop extra",
                part("rest", [field("extra", any())]),
                part("rest", []),
            ),
        ];
        let tree = json(
            r#"{"type": "A", "loc": 1, "extra": 2, "keep": true,
                "kids": [{"type": "B", "extra": 3, "loc": 4}]}"#,
        );
        let mut pass = PassRunner::new(&rules, Direction::ToCanonical, Dispatch::Chain);
        let out = pass.run(tree).unwrap();
        assert_eq!(
            out,
            json(r#"{"type": "A", "keep": true, "kids": [{"type": "B"}]}"#)
        );
        assert!(pass.report().is_clean());
    }

    #[test]
    fn test_later_rule_sees_earlier_output() {
        let rules = vec![rename("A", "B"), rename("B", "C")];
        let mut pass = PassRunner::new(&rules, Direction::ToCanonical, Dispatch::Chain);
        let out = pass.run(json(r#"{"type": "A", "child": 1}"#)).unwrap();
        assert_eq!(out.node_type(), Some("C"));
    }
}

#[cfg(test)]
mod first_match_dispatch {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_only_first_matching_rule_applies() {
        let rules = vec![rename("A", "B"), rename("B", "C")];
        let mut pass = PassRunner::new(&rules, Direction::ToCanonical, Dispatch::FirstMatch);
        let out = pass.run(json(r#"{"type": "A", "child": 1}"#)).unwrap();
        assert_eq!(out.node_type(), Some("B"));
    }

    #[test]
    fn test_children_are_rewritten_through_bindings() {
        let rules = vec![rename("A", "X"), rename("B", "Y")];
        let mut pass = PassRunner::new(&rules, Direction::ToCanonical, Dispatch::FirstMatch);
        let out = pass
            .run(json(
                r#"{"type": "A", "start": 0, "end": 4,
                    "child": [{"type": "B", "child": null}, {"type": "B", "child": 2}]}"#,
            ))
            .unwrap();
        assert_eq!(
            out,
            json(
                r#"{"type": "X", "start": 0, "end": 4,
                    "child": [{"type": "Y", "child": null}, {"type": "Y", "child": 2}]}"#
            )
        );
    }

    #[test]
    fn test_constructed_structure_is_not_revisited() {
        // The output mentions type A again; revisiting it would loop forever.
        let rules = vec![Rule::new(
            "wrap",
            node("A", [field("v", var("v"))]),
            node("Wrapper", [field("inner", node("A", [field("v", var("v"))]))]),
        )];
        let mut pass = PassRunner::new(&rules, Direction::ToCanonical, Dispatch::FirstMatch);
        let out = pass.run(json(r#"{"type": "A", "v": 1}"#)).unwrap();
        assert_eq!(
            out,
            json(r#"{"type": "Wrapper", "inner": {"type": "A", "v": 1}}"#)
        );
    }

    #[test]
    fn test_partial_pattern_rewrites_remainder_fields() {
        let rules = vec![
            Rule::new(
                "tag",
                part("rest", [field("type", lit("A")), field("tag", any())]),
                part("rest", [field("type", lit("TaggedA"))]),
            ),
            rename("B", "Y"),
        ];
        let mut pass = PassRunner::new(&rules, Direction::ToCanonical, Dispatch::FirstMatch);
        let out = pass
            .run(json(
                r#"{"type": "A", "tag": 1, "inner": {"type": "B", "child": 0}}"#,
            ))
            .unwrap();
        assert_eq!(
            out,
            json(r#"{"type": "TaggedA", "inner": {"type": "Y", "child": 0}}"#)
        );
    }

    #[test]
    fn test_reverse_direction_swaps_pattern_roles() {
        let rules = vec![rename("Native", "Canonical")];
        let mut pass = PassRunner::new(&rules, Direction::ToNative, Dispatch::FirstMatch);
        let out = pass.run(json(r#"{"type": "Canonical", "child": 1}"#)).unwrap();
        assert_eq!(out, json(r#"{"type": "Native", "child": 1}"#));
    }

    #[test]
    fn test_cases_choice_is_stable_and_symmetric() {
        let rules = vec![Rule::new(
            "literal kinds",
            node(
                "Lit",
                [field(
                    "value",
                    cases(
                        "kind",
                        [
                            check(Predicate::IsString, var("v")),
                            check(Predicate::IsNumber, var("v")),
                            var("v"),
                        ],
                    ),
                )],
            ),
            node(
                "Literal",
                [field(
                    "kind",
                    cases("kind", [lit("string"), lit("number"), lit("other")]),
                ), field("value", var("v"))],
            ),
        )];

        for _ in 0..20 {
            let mut pass = PassRunner::new(&rules, Direction::ToCanonical, Dispatch::FirstMatch);
            let out = pass.run(json(r#"{"type": "Lit", "value": 3}"#)).unwrap();
            assert_eq!(at(&out, &["kind"]), &Value::from("number"));
        }

        let mut forward = PassRunner::new(&rules, Direction::ToCanonical, Dispatch::FirstMatch);
        let canonical = forward.run(json(r#"{"type": "Lit", "value": "s"}"#)).unwrap();
        assert_eq!(at(&canonical, &["kind"]), &Value::from("string"));
        let mut back = PassRunner::new(&rules, Direction::ToNative, Dispatch::FirstMatch);
        assert_eq!(
            back.run(canonical).unwrap(),
            json(r#"{"type": "Lit", "value": "s"}"#)
        );
    }

    #[test]
    fn test_rule_roles_are_added_to_constructed_node() {
        let rules = vec![rename("A", "B").with_roles([Role::Expression])];
        let mut pass = PassRunner::new(&rules, Direction::ToCanonical, Dispatch::FirstMatch);
        let out = pass.run(json(r#"{"type": "A", "child": 1}"#)).unwrap();
        assert_eq!(role_names(&out), vec!["Expression"]);
    }
}

#[cfg(test)]
mod errors_and_warnings {
    use super::*;
    use pretty_assertions::assert_eq;

    fn literal_rule() -> Vec<Rule> {
        vec![Rule::map_node(
            "literal",
            "Str",
            "String",
            [field("value", quoted(var("v")))],
            [field("value", var("v"))],
        )]
    }

    #[test]
    fn test_unmatched_nodes_are_classified() {
        let rules = vec![rename("A", "X")];
        let table = RuleTable::new("test").normalize(rules);
        let mut pass = PassRunner::new(&table.normalize, Direction::ToCanonical, Dispatch::FirstMatch)
            .report_mismatches(table.known_types());
        let out = pass
            .run(json(
                r#"{"type": "Root", "start": 2, "items": [
                    {"type": "A", "child": 1, "surprise": true},
                    {"type": "X", "child": 1}
                ]}"#,
            ))
            .unwrap();
        assert_eq!(at(&out, &["items", "0", "type"]), &Value::from("A"));

        let warnings = pass.into_report().warnings;
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].node_type, "Root");
        assert_eq!(warnings[0].kind, MismatchKind::UnknownType);
        assert_eq!(warnings[0].offset, Some(2));
        assert_eq!(warnings[0].to_string(), "no rule matched type Root at offset 2");
        assert_eq!(warnings[1].node_type, "A");
        assert_eq!(warnings[1].kind, MismatchKind::ShapeMismatch);
    }

    #[test]
    fn test_isolate_policy_keeps_going() {
        let rules = literal_rule();
        let mut pass = PassRunner::new(&rules, Direction::ToCanonical, Dispatch::FirstMatch)
            .policy(ErrorPolicy::Isolate);
        let out = pass
            .run(json(
                r#"[{"type": "Str", "start": 0, "end": 4, "value": "'\\q'"},
                    {"type": "Str", "value": "'ok'"}]"#,
            ))
            .unwrap();
        assert_eq!(at(&out, &["0", "type"]), &Value::from("Str"));
        assert_eq!(at(&out, &["1", "value"]), &Value::from("ok"));

        let errors = pass.into_report().errors;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code_suffix(), "escape");
        assert!(!errors[0].is_fatal());
    }

    #[test]
    fn test_abort_policy_stops_at_first_error() {
        let rules = literal_rule();
        let mut pass = PassRunner::new(&rules, Direction::ToCanonical, Dispatch::FirstMatch)
            .policy(ErrorPolicy::Abort);
        let err = pass
            .run(json(r#"{"type": "Str", "value": "'\\q'"}"#))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Escape { .. }));
    }

    #[test]
    fn test_missing_binding_is_fatal_even_when_isolating() {
        let rules = vec![Rule::new(
            "broken",
            node("A", [field("x", var("x"))]),
            node("B", [field("y", var("never_bound"))]),
        )];
        let mut pass = PassRunner::new(&rules, Direction::ToCanonical, Dispatch::FirstMatch)
            .policy(ErrorPolicy::Isolate);
        let err = pass.run(json(r#"{"type": "A", "x": 1}"#)).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::BindingMissing {
                rule: "broken".to_string(),
                var: "never_bound".to_string(),
            }
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_depth_limit() {
        let mut deep = json("1");
        for _ in 0..20 {
            deep = Value::List(vec![deep]);
        }
        let rules: Vec<Rule> = Vec::new();
        let mut shallow = PassRunner::new(&rules, Direction::ToCanonical, Dispatch::FirstMatch)
            .max_depth(10);
        assert_eq!(
            shallow.run(deep.clone()).unwrap_err(),
            NormalizeError::DepthLimit { limit: 10 }
        );

        let mut roomy = PassRunner::new(&rules, Direction::ToCanonical, Dispatch::FirstMatch)
            .max_depth(64);
        assert_eq!(roomy.run(deep.clone()).unwrap(), deep);
    }
}

#[cfg(test)]
mod annotation {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_repeated_roles_are_deduplicated() {
        let rules: Vec<RoleRule> = (0..5)
            .map(|_| RoleRule::on_type("Call").roles([Role::Call, Role::Expression]))
            .collect();
        let out = annotate(json(r#"{"type": "Call"}"#), &rules, true);
        assert_eq!(role_names(&out), vec!["Call", "Expression"]);
    }

    #[test]
    fn test_existing_roles_are_kept_and_not_repeated() {
        let rules = vec![RoleRule::on_type("Call").roles([Role::Call, Role::Expression])];
        let out = annotate(
            json(r#"{"type": "Call", "roles": ["Expression", "Expression"]}"#),
            &rules,
            true,
        );
        assert_eq!(role_names(&out), vec!["Expression", "Call"]);
    }

    #[test]
    fn test_children_and_descendants_are_scoped() {
        let rules = vec![RoleRule::on_type("If")
            .roles([Role::If])
            .children([RoleRule::on_field("test").roles([Role::Condition])])
            .descendants([RoleRule::on_type("Name").roles([Role::Identifier])])];
        let tree = json(
            r#"{"type": "Root",
                "test": {"type": "Name"},
                "body": {"type": "If",
                         "test": {"type": "Cmp", "left": {"type": "Name"}},
                         "then": {"type": "Block", "test": {"type": "Name"}}}}"#,
        );
        let out = annotate(tree, &rules, true);

        assert_eq!(role_names(at(&out, &["test"])), vec!["Unannotated"]);
        assert_eq!(role_names(at(&out, &["body"])), vec!["If"]);
        assert_eq!(role_names(at(&out, &["body", "test"])), vec!["Condition"]);
        assert_eq!(
            role_names(at(&out, &["body", "test", "left"])),
            vec!["Identifier"]
        );
        assert_eq!(role_names(at(&out, &["body", "then"])), vec!["Unannotated"]);
        assert_eq!(
            role_names(at(&out, &["body", "then", "test"])),
            vec!["Identifier"]
        );
    }

    #[test]
    fn test_unannotated_marking_can_be_disabled() {
        let out = annotate(json(r#"{"type": "Lonely"}"#), &[], false);
        assert!(out.get("roles").is_none());
    }

    #[test]
    fn test_selectors() {
        let rules = vec![
            RoleRule::on(Selector::AnyType(vec!["A".into(), "B".into()])).roles([Role::Expression]),
            RoleRule::on(Selector::All(vec![
                Selector::Type("B".into()),
                Selector::FieldIs {
                    field: "operator".into(),
                    value: Value::from("+"),
                },
            ]))
            .roles([Role::Add]),
            RoleRule::on(Selector::Any).roles([Role::Noop]),
        ];
        let out = annotate(
            json(r#"[{"type": "A"}, {"type": "B", "operator": "+"}, {"type": "B", "operator": "-"}]"#),
            &rules,
            true,
        );
        assert_eq!(role_names(at(&out, &["0"])), vec!["Expression", "Noop"]);
        assert_eq!(role_names(at(&out, &["1"])), vec!["Expression", "Add", "Noop"]);
        assert_eq!(role_names(at(&out, &["2"])), vec!["Expression", "Noop"]);
    }

    #[test]
    fn test_plain_maps_are_transparent() {
        let rules = vec![RoleRule::on_type("Group")
            .roles([Role::Function])
            .children([RoleRule::on_field("name").roles([Role::Name])])];
        let out = annotate(
            json(r#"{"type": "Group", "meta": {"name": {"type": "Id"}}}"#),
            &rules,
            true,
        );
        assert_eq!(role_names(at(&out, &["meta", "name"])), vec!["Name"]);
    }
}

#[cfg(test)]
mod tables {
    use super::*;
    use pretty_assertions::assert_eq;

    const TABLE: &str = r#"{
        "namespace": "toy",
        "version": 3,
        "normalize": [
            {
                "name": "ident",
                "native": {"object": {"fields": [
                    {"name": "type", "pattern": {"literal": "Ident"}},
                    {"name": "name", "pattern": {"var": "n"}}
                ]}},
                "canonical": {"object": {"fields": [
                    {"name": "type", "pattern": {"literal": "Identifier"}},
                    {"name": "name", "pattern": {"var": "n"}}
                ]}},
                "roles": ["Identifier"]
            }
        ],
        "annotations": [
            {"selector": {"type": "Identifier"}, "roles": ["Expression"]}
        ]
    }"#;

    #[test]
    fn test_table_loads_from_json() {
        let table = RuleTable::from_json_str(TABLE).unwrap();
        assert_eq!(table.namespace, "toy");
        assert_eq!(table.version, 3);
        assert!(table.preprocess.is_empty());
        assert_eq!(table.normalize[0].roles, vec![Role::Identifier]);
        assert!(table.known_types().native.contains("Ident"));
        assert!(table.known_types().canonical.contains("Identifier"));
    }

    #[test]
    fn test_table_loads_from_yaml() {
        let from_json = RuleTable::from_json_str(TABLE).unwrap();
        let from_yaml = RuleTable::from_yaml_str(TABLE).unwrap();
        assert_eq!(from_yaml.namespace, from_json.namespace);
        assert_eq!(from_yaml.normalize, from_json.normalize);
        assert_eq!(from_yaml.annotations, from_json.annotations);
    }

    #[test]
    fn test_table_rejects_unknown_role() {
        let broken = TABLE.replace(r#"["Expression"]"#, r#"["Expresion"]"#);
        assert!(RuleTable::from_json_str(&broken).is_err());
    }

    #[test]
    fn test_loaded_rule_runs() {
        let table = RuleTable::from_json_str(TABLE).unwrap();
        let mut pass =
            PassRunner::new(&table.normalize, Direction::ToCanonical, Dispatch::FirstMatch);
        let out = pass.run(json(r#"{"type": "Ident", "name": "x"}"#)).unwrap();
        assert_eq!(
            out,
            json(r#"{"type": "Identifier", "name": "x", "roles": ["Identifier"]}"#)
        );
    }
}
