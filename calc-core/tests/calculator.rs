use calc_core::history::VISIBLE_RECORDS;
use calc_core::{Calculator, ERROR_INDICATOR, ExprError, ThemeMode};

#[test]
fn appends_concatenate_in_order() {
    let tokens = ["1", "2", "+", "3", "4", "*", "(", "5", "-", "6", ")", "/", "7", "."];
    let mut calc = Calculator::new();
    let mut expected = String::new();
    for token in tokens {
        calc.append(token);
        expected.push_str(token);
        assert_eq!(calc.buffer(), expected);
    }
}

#[test]
fn backspace_removes_one_character() {
    let mut calc = Calculator::new();
    calc.backspace();
    assert_eq!(calc.buffer(), "");

    calc.append("12+3");
    calc.backspace();
    assert_eq!(calc.buffer(), "12+");
    calc.backspace();
    calc.backspace();
    calc.backspace();
    assert_eq!(calc.buffer(), "");
    calc.backspace();
    assert_eq!(calc.buffer(), "");
}

#[test]
fn evaluates_and_records_history() {
    let mut calc = Calculator::new();
    calc.append("2+2");
    assert_eq!(calc.evaluate(), Ok(4.0));
    assert_eq!(calc.buffer(), "4");
    assert_eq!(calc.result_text(), "4");
    assert_eq!(calc.history_text(), "2+2=4");
}

#[test]
fn malformed_input_shows_error_without_history() {
    let mut calc = Calculator::new();
    calc.append("2+");
    assert_eq!(calc.evaluate(), Err(ExprError::UnexpectedEnd));
    assert_eq!(calc.buffer(), "2+");
    assert_eq!(calc.result_text(), ERROR_INDICATOR);
    assert!(calc.history().is_empty());
}

#[test]
fn runaway_brackets_from_memory_are_an_error() {
    let mut calc = Calculator::new();
    calc.press("(");
    for _ in 0..16 {
        calc.press("M+");
        calc.press("MR");
    }
    assert_eq!(calc.buffer().len(), 1 << 16);

    assert_eq!(calc.evaluate(), Err(ExprError::TooLong));
    assert_eq!(calc.result_text(), ERROR_INDICATOR);
    assert!(calc.request_plot().is_err());

    calc.press("C");
    calc.append(&"(".repeat(300));
    assert_eq!(calc.evaluate(), Err(ExprError::TooDeep));
    assert!(calc.history().is_empty());
}

#[test]
fn division_by_zero_is_an_error() {
    let mut calc = Calculator::new();
    calc.append("1/0");
    assert_eq!(calc.evaluate(), Err(ExprError::DivisionByZero));
    assert_eq!(calc.buffer(), "1/0");
    assert!(calc.history().is_empty());
}

#[test]
fn memory_survives_clear() {
    let mut calc = Calculator::new();
    calc.append("3*7");
    calc.memory_store();
    calc.clear();
    assert_eq!(calc.buffer(), "");
    calc.memory_recall();
    assert_eq!(calc.buffer(), "3*7");

    calc.memory_recall();
    assert_eq!(calc.buffer(), "3*73*7");
}

#[test]
fn history_shows_last_five_most_recent_last() {
    let mut calc = Calculator::new();
    for n in 1..=8 {
        calc.clear();
        calc.append(&format!("{n}*10"));
        calc.evaluate().unwrap();

        let text = calc.history_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), n.min(VISIBLE_RECORDS));
        assert_eq!(*lines.last().unwrap(), format!("{n}*10={}", n * 10));
    }
    assert_eq!(calc.history().len(), 8);
    assert_eq!(
        calc.history_text(),
        "4*10=40\n5*10=50\n6*10=60\n7*10=70\n8*10=80"
    );
}

#[test]
fn results_chain_into_next_expression() {
    let mut calc = Calculator::new();
    calc.append("7/2");
    calc.evaluate().unwrap();
    assert_eq!(calc.buffer(), "3.5");
    calc.append("*2");
    calc.evaluate().unwrap();
    assert_eq!(calc.buffer(), "7");
    assert_eq!(calc.history_text(), "7/2=3.5\n3.5*2=7");
}

#[test]
fn theme_toggle_round_trips() {
    let mut calc = Calculator::new();
    let initial = calc.palette();
    calc.toggle_theme();
    assert_eq!(calc.theme(), ThemeMode::Light);
    assert_ne!(calc.palette(), initial);
    calc.toggle_theme();
    assert_eq!(calc.palette(), initial);
}
