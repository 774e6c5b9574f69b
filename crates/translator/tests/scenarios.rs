// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// end-to-end scenarios: translate a source text and run it to
// completion, checking everything it printed.

use pretty_assertions::assert_eq;

use mathvm_runtime::utils::run_capture;
use mathvm_translator::translate;
use mathvm_types::HostValue;

fn run(source: &str) -> String {
    let program = translate(source).unwrap();
    run_capture(&program, &[]).unwrap()
}

#[test]
fn test_function_call() {
    let source = "function int add(int a, int b) { return a + b; } print(add(2, 3));";
    assert_eq!(run(source), "5");
}

#[test]
fn test_while_loop() {
    let source = "int i; i = 0; while (i < 5) { print(i); i = i + 1; }";
    assert_eq!(run(source), "01234");
}

#[test]
fn test_for_loop_declares_its_variable() {
    assert_eq!(run("for (i in 1..4) { print(i); }"), "1234");
}

#[test]
fn test_int_to_double_coercion() {
    let source = "double x; x = 1; print(x + 2.5);";
    assert_eq!(run(source), "3.5");
}

#[test]
fn test_recursion() {
    let source = "\
        function int f(int n) {
            if (n <= 1) { return 1; }
            return n * f(n - 1);
        }
        print(f(5));
    ";
    assert_eq!(run(source), "120");
}

#[test]
fn test_context_variable_across_frames() {
    let source = "int outer; outer = 7; function void g() { print(outer); } g();";
    assert_eq!(run(source), "7");
}

#[test]
fn test_context_variable_store() {
    let source = "\
        int counter;
        function void bump() { counter += 1; }
        bump(); bump(); bump();
        print(counter);
    ";
    assert_eq!(run(source), "3");
}

#[test]
fn test_string_printing() {
    assert_eq!(run("print('hello', ' ', 'world');"), "hello world");
    // the reserved empty literal
    assert_eq!(run("print('');"), "");
}

#[test]
fn test_comparisons_reduce_to_booleans() {
    assert_eq!(run("print(1 < 2);"), "1");
    assert_eq!(run("print(2 < 1);"), "0");
    assert_eq!(run("print(2 <= 2);"), "1");
    assert_eq!(run("print(2 >= 3);"), "0");
    assert_eq!(run("print(3 >= 2);"), "1");
    assert_eq!(run("print(2 >= 2);"), "1");
    assert_eq!(run("print(3 > 2);"), "1");
    assert_eq!(run("print(2 == 2);"), "1");
    assert_eq!(run("print(2 == 3);"), "0");
    // '!=' keeps the raw three-valued comparison, any non-zero
    // result is truthy
    assert_eq!(run("print(4 != 3);"), "1");
    assert_eq!(run("print(3 != 4);"), "-1");
    assert_eq!(run("print(1.5 < 2.5);"), "1");
}

#[test]
fn test_logical_operators_do_not_short_circuit() {
    // '&&' and '||' are plain bitwise reductions, both operands are
    // always evaluated
    assert_eq!(run("print(1 && 3);"), "1");
    assert_eq!(run("print(2 && 4);"), "0");
    assert_eq!(run("print(2 || 4);"), "6");
    assert_eq!(run("print(0 || 0);"), "0");
}

#[test]
fn test_unary_operators() {
    assert_eq!(run("print(-3);"), "-3");
    assert_eq!(run("int x; x = 5; print(-x);"), "-5");
    assert_eq!(run("print(-2.5);"), "-2.5");
    assert_eq!(run("print(!0);"), "1");
    assert_eq!(run("print(!5);"), "0");
}

#[test]
fn test_integer_division_and_modulo() {
    assert_eq!(run("print(7 / 2);"), "3");
    assert_eq!(run("print(7 % 3);"), "1");
    assert_eq!(run("print(0 - 7 % 3);"), "-1");
}

#[test]
fn test_block_scoping_shadows_outer_variables() {
    let source = "int x; x = 1; { int x; x = 2; print(x); } print(x);";
    assert_eq!(run(source), "21");
}

#[test]
fn test_if_else() {
    let source = "\
        int n; n = 3;
        if (n > 2) { print('big'); } else { print('small'); }
        if (n > 5) { print('big'); } else { print('small'); }
        if (n == 3) { print('!'); }
    ";
    assert_eq!(run(source), "bigsmall!");
}

#[test]
fn test_argument_coercion() {
    let source = "function double half(double d) { return d / 2.0; } print(half(5));";
    assert_eq!(run(source), "2.5");
}

#[test]
fn test_return_value_coercion() {
    let source = "function int trunc(double d) { return d; } print(trunc(3.9));";
    assert_eq!(run(source), "3");
}

#[test]
fn test_string_to_int_conversion() {
    assert_eq!(run("int n; n = '42'; print(n + 1);"), "43");
    assert_eq!(run("print('2' + 3);"), "5");
}

#[test]
fn test_compound_assignment() {
    assert_eq!(run("int i; i = 10; i += 5; print(i);"), "15");
    assert_eq!(run("int i; i = 10; i -= 3; print(i);"), "7");
}

#[test]
fn test_nested_functions_resolve_sibling_calls() {
    let source = "\
        function int twice(int n) { return double_it(n); }
        function int double_it(int n) { return n * 2; }
        print(twice(21));
    ";
    assert_eq!(run(source), "42");
}

#[test]
fn test_initial_vars_reach_the_program() {
    let source = "int x; print(x);";
    let program = translate(source).unwrap();
    assert_eq!(
        run_capture(&program, &[("x", HostValue::Int(9))]).unwrap(),
        "9"
    );
    // unbound variables default to zero
    assert_eq!(run_capture(&program, &[]).unwrap(), "0");
}

#[test]
fn test_division_by_zero_surfaces_as_a_runtime_error() {
    let program = translate("int z; print(1 / z);").unwrap();
    let error = run_capture(&program, &[]).unwrap_err();
    assert!(error.message.contains("division by zero"));
}

#[test]
fn test_deterministic_output() {
    let source = "\
        int acc;
        function int step(int n) { return acc + n * n; }
        for (i in 1..9) { acc = step(i); }
        print(acc, ' ', 2.0 * acc);
    ";
    let first = run(source);
    let second = run(source);
    assert_eq!(first, second);
    assert_eq!(first, "285 570");
}
