// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn params(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn underscores_become_hyphens() {
    let args = params_as_cli_args(&params(&[(
        "batch_size",
        Value::Number(32.into()),
    )]));
    assert_eq!(args, vec!["--batch-size 32"]);
}

#[test]
fn true_bool_is_a_bare_flag() {
    let args = params_as_cli_args(&params(&[("verbose", Value::Bool(true))]));
    assert_eq!(args, vec!["--verbose"]);
}

#[test]
fn false_bool_is_omitted() {
    let args = params_as_cli_args(&params(&[("verbose", Value::Bool(false))]));
    assert!(args.is_empty());
}

#[test]
fn strings_are_shell_quoted() {
    let args = params_as_cli_args(&params(&[(
        "prefix",
        Value::String("Hello: ".to_string()),
    )]));
    assert_eq!(args, vec!["--prefix 'Hello: '"]);
}

#[test]
fn embedded_single_quotes_are_escaped() {
    let args = params_as_cli_args(&params(&[(
        "label",
        Value::String("it's".to_string()),
    )]));
    assert_eq!(args, vec![r"--label 'it'\''s'"]);
}

#[test]
fn sequences_repeat_the_flag() {
    let args = params_as_cli_args(&params(&[(
        "tag",
        Value::Sequence(vec![
            Value::String("a".to_string()),
            Value::String("b".to_string()),
        ]),
    )]));
    assert_eq!(args, vec!["--tag 'a'", "--tag 'b'"]);
}

#[test]
fn declaration_order_is_preserved() {
    let args = params_as_cli_args(&params(&[
        ("zeta", Value::Number(1.into())),
        ("alpha", Value::Number(2.into())),
    ]));
    assert_eq!(args, vec!["--zeta 1", "--alpha 2"]);
}
