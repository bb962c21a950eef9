use dpforge_template::errors::TemplateError;
use dpforge_template::{PyValue, Template};

#[test]
fn fill_expressions_replaces_every_slot() {
    let filled = Template::new("No one VERB the ADJ NOUN!")
        .fill_expressions([("VERB", "expects"), ("ADJ", "Spanish"), ("NOUN", "Inquisition")])
        .and_then(Template::finish)
        .expect("fill");
    assert_eq!(filled, "No one expects the Spanish Inquisition!");
}

#[test]
fn fill_expressions_missing_slot_in_template() {
    let err = Template::new("No one ... the ADJ NOUN!")
        .fill_expressions([("VERB", "expects"), ("ADJ", "Spanish"), ("NOUN", "Inquisition")])
        .expect_err("missing slot");
    assert!(
        err.to_string()
            .starts_with("No 'VERB' slot to fill with 'expects' in string template:\n\n")
    );
}

#[test]
fn fill_expressions_extra_slot_in_template() {
    let err = Template::new("No one VERB ARTICLE ADJ NOUN!")
        .fill_expressions([("VERB", "expects"), ("ADJ", "Spanish"), ("NOUN", "Inquisition")])
        .and_then(Template::finish)
        .expect_err("extra slot");
    assert!(err.to_string().starts_with("'ARTICLE' slot not filled in string template"));
}

#[test]
fn fill_values_renders_python_literals() {
    let filled = Template::new("assert [STRING] * NUM == LIST")
        .fill_values([
            ("STRING", PyValue::from("🙂")),
            ("NUM", PyValue::from(3)),
            ("LIST", PyValue::from(vec!["🙂", "🙂", "🙂"])),
        ])
        .and_then(Template::finish)
        .expect("fill");
    assert_eq!(filled, "assert ['🙂'] * 3 == ['🙂', '🙂', '🙂']");
}

#[test]
fn fill_values_missing_slot_in_template() {
    let err = Template::new("assert [STRING] * ... == LIST")
        .fill_values([
            ("STRING", PyValue::from("🙂")),
            ("NUM", PyValue::from(3)),
            ("LIST", PyValue::from(vec!["🙂", "🙂", "🙂"])),
        ])
        .expect_err("missing slot");
    assert!(err.to_string().starts_with("No 'NUM' slot to fill with '3'"));
}

#[test]
fn fill_values_extra_slot_in_template() {
    let err = Template::new("CMD [STRING] * NUM == LIST")
        .fill_values([
            ("STRING", PyValue::from("🙂")),
            ("NUM", PyValue::from(3)),
            ("LIST", PyValue::from(vec!["🙂", "🙂", "🙂"])),
        ])
        .and_then(Template::finish)
        .expect_err("extra slot");
    assert!(err.to_string().starts_with("'CMD' slot not filled"));
}

#[test]
fn fill_blocks_propagates_indentation() {
    let template = Template::new(
        "# MixedCase is OK\n\nFIRST\n\nwith fake:\n    SECOND\n    if True:\n        THIRD\n",
    );
    let filled = template
        .fill_blocks([
            ("FIRST", "import a\nimport b\nimport c"),
            ("SECOND", "f(1)\nf(2)\nf(3)"),
            ("THIRD", "x()\ny()\nz()"),
        ])
        .and_then(Template::finish)
        .expect("fill");
    assert_eq!(
        filled,
        "# MixedCase is OK\n\nimport a\nimport b\nimport c\n\nwith fake:\n    f(1)\n    f(2)\n    f(3)\n    if True:\n        x()\n        y()\n        z()\n"
    );
}

#[test]
fn fill_blocks_missing_slot_in_template_alone() {
    let err = Template::new("No block slot")
        .fill_blocks([("SLOT", "placeholder")])
        .expect_err("missing");
    assert!(matches!(err, TemplateError::MissingSlot { .. }));
    assert!(err.to_string().starts_with("No 'SLOT' slot"));
}

#[test]
fn fill_blocks_missing_slot_in_template_not_alone() {
    let err = Template::new("No block SLOT")
        .fill_blocks([("SLOT", "placeholder")])
        .expect_err("misplaced");
    assert!(
        err.to_string()
            .starts_with("Block slots must be alone on line; No 'SLOT' slot")
    );
}

#[test]
fn fill_blocks_extra_slot_in_template() {
    let err = Template::new("EXTRA\nSLOT")
        .fill_blocks([("SLOT", "placeholder")])
        .and_then(Template::finish)
        .expect_err("extra");
    assert!(err.to_string().starts_with("'EXTRA' slot not filled"));
}

#[test]
fn fill_blocks_not_string() {
    let err = Template::new("SOMETHING")
        .fill_blocks([("SOMETHING", 123)])
        .expect_err("not a string");
    assert_eq!(
        err.to_string(),
        "For SOMETHING in string template, expected string, not 123"
    );
}

#[test]
fn unfilled_slots_are_sorted_and_quoted() {
    let err = Template::new("ZETA ALPHA MIDDLE")
        .fill_expressions([("MIDDLE", "m")])
        .and_then(Template::finish)
        .expect_err("unfilled");
    assert!(err.to_string().starts_with("'ALPHA', 'ZETA' slot not filled"));
}

#[test]
fn filled_text_is_never_refilled() {
    let filled = Template::new("a = FIRST\nb = SECOND")
        .fill_values([("FIRST", "SECOND")])
        .and_then(|template| template.fill_expressions([("SECOND", "1")]))
        .and_then(Template::finish)
        .expect("fill");
    assert_eq!(filled, "a = 'SECOND'\nb = 1");
}

#[test]
fn finish_ignores_slot_words_inside_filled_values() {
    let filled = Template::new("epsilon = EPSILON\ncolumns = COLUMNS")
        .fill_expressions([("COLUMNS", "{'EPSILON': 1}")])
        .and_then(|template| template.fill_values([("EPSILON", 2.0)]))
        .and_then(Template::finish)
        .expect("fill");
    assert_eq!(filled, "epsilon = 2.0\ncolumns = {'EPSILON': 1}");
}

#[test]
fn filled_block_lines_are_not_block_slots() {
    let filled = Template::new("FIRST\nif True:\n    SECOND\n")
        .fill_blocks([("FIRST", "x = 1\nSECOND"), ("SECOND", "y = 2")])
        .and_then(Template::finish)
        .expect("fill");
    assert_eq!(filled, "x = 1\nSECOND\nif True:\n    y = 2\n");
}

#[test]
fn slot_only_inside_filled_text_is_missing() {
    let err = Template::new("a = FIRST")
        .fill_expressions([("FIRST", "SECOND")])
        .and_then(|template| template.fill_expressions([("SECOND", "1")]))
        .expect_err("nothing left to fill");
    assert!(matches!(err, TemplateError::MissingSlot { .. }));
}
