use dpforge_template::errors::TemplateError;
use dpforge_template::{PyValue, SlotKind, Template, catalog, find_slots};

const KINDS: [&str; 6] = ["histogram", "mean", "median", "quantile", "count", "stdeviation"];

#[test]
fn every_kind_has_all_fragments() {
    let catalog = catalog().expect("catalog verifies");
    for kind in KINDS {
        for suffix in ["config", "query", "notebook_output", "script_output", "report_kv"] {
            let name = format!("{kind}_{suffix}");
            assert!(catalog.entry(&name).is_some(), "missing {name}");
        }
    }
    for name in ["imports", "utils", "privacy_unit", "privacy_loss", "context", "notebook", "script", "reports"] {
        assert!(catalog.entry(name).is_some(), "missing {name}");
    }
}

#[test]
fn declarations_match_text() {
    let catalog = catalog().expect("catalog verifies");
    for name in catalog.names() {
        let entry = catalog.entry(name).expect("entry");
        let declared: Vec<&str> = {
            let mut names: Vec<&str> = entry.slots.iter().map(|decl| decl.name).collect();
            names.sort();
            names
        };
        let found: Vec<String> = find_slots(entry.text).into_iter().collect();
        assert_eq!(declared, found, "slots of {name}");
    }
}

#[test]
fn slot_free_entries_finish_unchanged() {
    let imports = Template::named("imports")
        .and_then(Template::finish)
        .expect("imports");
    assert!(imports.contains("dp.enable_features(\"contrib\")"));
    let utils = Template::named("utils").and_then(Template::finish).expect("utils");
    assert!(utils.contains("def make_cut_points("));
    assert!(utils.contains("def plot_bars("));
}

#[test]
fn unknown_template_name_is_rejected() {
    let err = Template::named("nonexistent").expect_err("unknown");
    assert_eq!(err, TemplateError::UnknownTemplate("nonexistent".to_string()));
}

#[test]
fn filling_with_the_wrong_kind_is_rejected() {
    let err = Template::named("privacy_unit")
        .and_then(|template| template.fill_expressions([("CONTRIBUTIONS", "1")]))
        .expect_err("kind mismatch");
    assert_eq!(
        err,
        TemplateError::SlotKindMismatch {
            slot: "CONTRIBUTIONS".to_string(),
            declared: SlotKind::Value,
            used: SlotKind::Expression,
            template: "'privacy_unit'".to_string(),
        }
    );
}

#[test]
fn privacy_loss_renders_literals() {
    let block = Template::named("privacy_loss")
        .and_then(|template| {
            template.fill_values([("EPSILON", PyValue::number(1.0)), ("DELTA", PyValue::Float(1e-7))])
        })
        .and_then(Template::finish)
        .expect("privacy loss");
    assert_eq!(block, "privacy_loss = dp.loss_of(epsilon=1, delta=1e-07)\n");
}

#[test]
fn catalog_errors_name_the_template() {
    let err = Template::named("privacy_unit")
        .and_then(Template::finish)
        .expect_err("unfilled");
    assert!(err.to_string().starts_with("'CONTRIBUTIONS' slot not filled in 'privacy_unit'"));
}
