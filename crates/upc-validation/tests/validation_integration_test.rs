//! Integration tests for upc-validation
//!
//! These tests drive caller data through input conversion and output
//! validation against the shared schema registry.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use upc_ir::{Action, Value};
use upc_schema::{FieldDefinition, FieldType, ObjectSchema, SchemaRegistry, builtin};
use upc_validation::{Error, ValidationConfig, ValidationEngine, ValidationLevel};

fn engine_with(registry: Arc<SchemaRegistry>) -> ValidationEngine {
    ValidationEngine::with_config(
        registry,
        ValidationConfig {
            today: NaiveDate::from_ymd_opt(2024, 6, 30),
            ..Default::default()
        },
    )
}

#[test]
fn registered_override_is_honoured_by_input_and_output() -> anyhow::Result<()> {
    let registry = Arc::new(SchemaRegistry::with_builtins());
    let engine = engine_with(Arc::clone(&registry));

    let data = json!({"type": 3, "priority": "high"});
    let err = engine
        .elements_from_input("subject", None, Some(Action::Insert), &data, ValidationLevel::Input)
        .unwrap_err();
    assert!(err.to_string().contains("unknown field 'priority' for KnSubject"));

    let mut custom = builtin::subject();
    custom.fields.push(
        FieldDefinition::new("U7A1", FieldType::String)
            .alias("priority")
            .codes(["low", "high"])
            .default_value("low"),
    );
    registry.register(custom);

    let object = engine.object_from_input(
        "subject",
        None,
        Some(Action::Insert),
        &data,
        ValidationLevel::Input,
    )?;
    let validated = engine.validate_elements(&object, None, None)?;
    let element = &validated.elements[0];
    assert_eq!(element.field("U7A1"), Some(&Value::from("high")));
    assert_eq!(
        element.field("Da"),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 6, 30).expect("valid date")))
    );
    Ok(())
}

#[test]
fn custom_type_with_recursive_relation() -> anyhow::Result<()> {
    let registry = Arc::new(SchemaRegistry::with_builtins());
    registry.register(
        ObjectSchema::new("KnProject")
            .with_alias("project")
            .with_field(FieldDefinition::new("PrId", FieldType::String).alias("code").required())
            .with_relation(upc_schema::ObjectRelation::new("KnProject").alias("subproject").recursive()),
    );
    let engine = engine_with(registry);

    let object = engine.object_from_input(
        "project",
        None,
        Some(Action::Insert),
        &json!({"code": "P1", "subproject": [{"code": "P1.1"}, {"code": "P1.2"}]}),
        ValidationLevel::Eager,
    )?;
    let validated = engine.validate_elements(&object, None, None)?;
    let children = validated.elements[0]
        .object("KnProject")
        .map(|o| o.elements.len());
    assert_eq!(children, Some(2));
    Ok(())
}

#[test]
fn output_errors_cover_the_whole_tree() {
    let engine = engine_with(Arc::new(SchemaRegistry::with_builtins()));
    let object = engine
        .object_from_input(
            builtin::SALES_ORDER,
            None,
            Some(Action::Insert),
            &json!({
                "debtor_id": "10001",
                "line": [
                    {"item_code": "A-1", "quantity": 2},
                    {"item_code": "B-2"}
                ]
            }),
            ValidationLevel::Input,
        )
        .expect("input is well-formed");

    let err = engine.validate_elements(&object, None, None).unwrap_err();
    let Error::Output(message) = err else {
        panic!("expected output error");
    };
    assert_eq!(
        message,
        "FbSales[0]/FbSalesLines[1]: 'QuUn' (quantity): a value is required"
    );
}

#[test]
fn engine_is_shareable_across_threads() {
    let engine = Arc::new(engine_with(Arc::new(SchemaRegistry::with_builtins())));
    let handles: Vec<_> = (0..4_i64)
        .map(|i| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                let object = engine
                    .object_from_input(
                        "subject",
                        None,
                        Some(Action::Insert),
                        &json!({"#id": i, "type": 1}),
                        ValidationLevel::Input,
                    )
                    .expect("valid input");
                engine
                    .validate_elements(&object, None, None)
                    .expect("valid output")
                    .elements[0]
                    .id
                    .clone()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let id = handle.join().expect("thread finished");
        assert_eq!(id.map(|a| a.value), Some(Value::Integer(i64::try_from(i).expect("small index"))));
    }
}
