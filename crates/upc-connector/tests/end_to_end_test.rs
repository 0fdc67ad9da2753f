//! End-to-end tests: caller data in, encoded payload out

use std::fs;

use anyhow::Context;
use chrono::NaiveDate;
use serde_json::{Value as Json, json};
use upc_connector::{
    Error, FactoryConfig, OutputFormat, UpdateFactory, UpdateObject, ValidationConfig,
    ValidationLevel,
};
use upc_encoding::EncodeOptions;
use upc_ir::Action;

const XSI: &str = r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn factory() -> UpdateFactory {
    init_tracing();
    UpdateFactory::from_config(&FactoryConfig {
        validation: ValidationConfig {
            today: NaiveDate::from_ymd_opt(2024, 6, 30),
            ..Default::default()
        },
        ..Default::default()
    })
    .expect("built-in factory")
}

fn xml(object: &UpdateObject) -> anyhow::Result<String> {
    Ok(object.output(OutputFormat::Xml, &EncodeOptions::default())?)
}

fn json_text(object: &UpdateObject) -> anyhow::Result<String> {
    Ok(object.output(OutputFormat::Json, &EncodeOptions::default())?)
}

fn subject_batch(factory: &UpdateFactory) -> anyhow::Result<UpdateObject> {
    Ok(factory.create(
        "subject",
        Some(&json!([
            {"#id": 1957, "type": 1, "description": "x"},
            {"#id": 1958, "type": 2, "description": "y"}
        ])),
        Some(Action::Insert),
        None,
    )?)
}

#[test]
fn subject_batch_renders_sibling_elements() -> anyhow::Result<()> {
    let factory = factory();
    let subject = subject_batch(&factory)?;

    assert_eq!(
        xml(&subject)?,
        format!(
            "<KnSubject{XSI}>{}{}</KnSubject>",
            r#"<Element SbId="1957"><Fields Action="insert"><StId>1</StId><Ds>x</Ds><Da>2024-06-30</Da></Fields></Element>"#,
            r#"<Element SbId="1958"><Fields Action="insert"><StId>2</StId><Ds>y</Ds><Da>2024-06-30</Da></Fields></Element>"#
        )
    );
    assert_eq!(
        json_text(&subject)?,
        concat!(
            r#"{"KnSubject":{"Element":["#,
            r#"{"@SbId":1957,"Fields":{"StId":1,"Ds":"x","Da":"2024-06-30"}},"#,
            r#"{"@SbId":1958,"Fields":{"StId":2,"Ds":"y","Da":"2024-06-30"}}"#,
            "]}}"
        )
    );
    Ok(())
}

#[test]
fn person_inserted_into_existing_organisation() -> anyhow::Result<()> {
    let factory = factory();
    let expected = format!(
        "<KnOrganisation{XSI}><Element><Fields Action=\"update\">{}</Fields><Objects><KnContact><Element>{}{}</Element></KnContact></Objects></Element></KnOrganisation>",
        "<MatchOga>0</MatchOga><BcCo>ORG1</BcCo><Nm>Acme</Nm>",
        r#"<Fields Action="insert"><ViKc>PRS</ViKc><FuDs>Owner</FuDs></Fields>"#,
        concat!(
            r#"<Objects><KnPerson><Element><Fields Action="insert">"#,
            "<MatchPer>7</MatchPer><SeNm>JANSEN</SeNm><LaNm>Jansen</LaNm><ViGe>O</ViGe><AutoNum>1</AutoNum>",
            "</Fields></Element></KnPerson></Objects>"
        )
    );

    // Overrides through live handles
    let mut org = factory.create(
        "organisation",
        Some(&json!({
            "code": "ORG1",
            "name": "Acme",
            "contact": {"job_title": "Owner", "person": {"last_name": "Jansen"}}
        })),
        Some(Action::Update),
        None,
    )?;
    {
        let mut contact = org.get_object("contact", None)?;
        contact.set_action(Some(Action::Insert), Some(0))?;
        let mut person = contact.get_object("person", None)?;
        person.set_action(Some(Action::Insert), Some(0))?;
    }
    assert_eq!(xml(&org)?, expected);

    // The same overrides as reserved input keys
    let org = factory.create(
        "organisation",
        Some(&json!({
            "code": "ORG1",
            "name": "Acme",
            "contact": {
                "#action": "insert",
                "job_title": "Owner",
                "person": {"#action": "insert", "last_name": "Jansen"}
            }
        })),
        Some(Action::Update),
        None,
    )?;
    assert_eq!(xml(&org)?, expected);
    Ok(())
}

#[test]
fn missing_po_box_flag_fails_on_output_only() -> anyhow::Result<()> {
    let factory = factory();
    let mut org = factory.create(
        "organisation",
        Some(&json!({"name": "Acme"})),
        Some(Action::Insert),
        Some(ValidationLevel::Input),
    )?;
    org.set_object(
        "address",
        &json!({"street": "Hoofdstraat 12a", "zip_code": "1234 AB", "town": "Utrecht"}),
        None,
        None,
        Some(ValidationLevel::Input),
    )?;

    let err = xml(&org).unwrap_err();
    let message = match err.downcast::<Error>()? {
        Error::Output(message) => message,
        other => anyhow::bail!("expected an output error, got {other}"),
    };
    assert_eq!(
        message,
        "KnOrganisation[0]/KnBasicAddressAdr[0]: 'PbAd' (is_po_box): a value is required"
    );

    org.get_object("address", None)?
        .set_field("is_po_box", &json!(false), None, None)?;
    let text = xml(&org)?;
    assert!(text.contains("<PadAdr>1</PadAdr><AutoNum>1</AutoNum>"));
    assert!(text.contains(concat!(
        "<CoId>NL</CoId><PbAd>0</PbAd><Ad>Hoofdstraat</Ad><HmNr>12</HmNr><HmAd>a</HmAd>",
        "<ZpCd>1234 AB</ZpCd><Rs>Utrecht</Rs><ResZip>0</ResZip><BeginDate>2024-06-30</BeginDate>"
    )));
    Ok(())
}

#[test]
fn eager_level_reports_missing_required_on_input() {
    let factory = factory();
    let err = factory
        .create(
            "address",
            Some(&json!({"street": "Hoofdstraat 12", "zip_code": "1234 AB", "town": "Utrecht"})),
            Some(Action::Insert),
            Some(ValidationLevel::Eager),
        )
        .unwrap_err();
    assert!(err.to_string().contains("'PbAd' (is_po_box): a value is required"));
}

#[test]
fn output_is_deterministic() -> anyhow::Result<()> {
    let factory = factory();
    let subject = subject_batch(&factory)?;
    for format in [OutputFormat::Xml, OutputFormat::Json] {
        for options in [EncodeOptions::default(), EncodeOptions::pretty()] {
            assert_eq!(subject.output(format, &options)?, subject.output(format, &options)?);
        }
    }
    Ok(())
}

#[test]
fn json_fields_round_trip() -> anyhow::Result<()> {
    let factory = factory();
    let person = factory.create(
        "person",
        Some(&json!({"first_name": "Jan Pieter", "last_name": "Jansen", "birth_date": "19800131"})),
        Some(Action::Insert),
        None,
    )?;
    let first = json_text(&person)?;

    let parsed: Json = serde_json::from_str(&first)?;
    let fields = parsed
        .pointer("/KnPerson/Element/Fields")
        .context("person fields")?
        .clone();
    assert_eq!(
        fields,
        json!({
            "MatchPer": 7, "SeNm": "JANSEN", "FiNm": "Jan Pieter", "In": "J.P.",
            "LaNm": "Jansen", "ViGe": "O", "DaBi": "1980-01-31", "AutoNum": true
        })
    );

    let rebuilt = factory.create("person", Some(&fields), Some(Action::Insert), None)?;
    assert_eq!(json_text(&rebuilt)?, first);
    assert_eq!(xml(&rebuilt)?, xml(&person)?);
    Ok(())
}

#[test]
fn tag_and_alias_input_are_equivalent() -> anyhow::Result<()> {
    let factory = factory();
    let by_alias = factory.create(
        "person",
        Some(&json!({"last_name": "Jansen", "email": "jan@example.com", "gender": "M"})),
        Some(Action::Insert),
        None,
    )?;

    let mut by_tag = factory.create("KnPerson", None, Some(Action::Insert), None)?;
    by_tag.set_field("LaNm", &json!("Jansen"), Some(0), None)?;
    by_tag.set_field("EmAd", &json!("jan@example.com"), None, None)?;
    by_tag.set_field("ViGe", &json!("M"), None, None)?;

    assert_eq!(xml(&by_alias)?, xml(&by_tag)?);
    assert_eq!(json_text(&by_alias)?, json_text(&by_tag)?);
    assert_eq!(by_alias.get_elements()?, by_tag.get_elements()?);
    Ok(())
}

#[test]
fn unique_identifier_selects_matching_method() -> anyhow::Result<()> {
    let factory = factory();

    let org = factory.create(
        "organisation",
        Some(&json!({"name": "Acme", "coc_number": "30123456"})),
        Some(Action::Insert),
        None,
    )?;
    let element = org.get_elements()?.elements.remove(0);
    assert_eq!(element.field("MatchOga"), Some(&upc_ir::Value::Integer(1)));
    // Not a provable insert: no auto-numbering
    assert_eq!(element.field("AutoNum"), None);

    let person = factory.create(
        "person",
        Some(&json!({"last_name": "Jansen", "bsn": "123456782"})),
        Some(Action::Update),
        None,
    )?;
    let element = person.get_elements()?.elements.remove(0);
    assert_eq!(element.field("MatchPer"), Some(&upc_ir::Value::Integer(1)));
    Ok(())
}

#[test]
fn fresh_insert_gets_auto_numbering() -> anyhow::Result<()> {
    let factory = factory();
    let org = factory.create(
        "organisation",
        Some(&json!({"name": "Acme"})),
        Some(Action::Insert),
        None,
    )?;
    let text = json_text(&org)?;
    assert_eq!(
        text,
        r#"{"KnOrganisation":{"Element":{"Fields":{"MatchOga":6,"Nm":"Acme","AutoNum":true}}}}"#
    );

    let explicit = factory.create(
        "organisation",
        Some(&json!({"name": "Acme", "auto_number": false})),
        Some(Action::Insert),
        None,
    )?;
    assert!(json_text(&explicit)?.contains(r#""AutoNum":false"#));
    Ok(())
}

#[test]
fn person_and_organisation_match_differently_on_insert_with_code() -> anyhow::Result<()> {
    let factory = factory();

    let person = factory.create(
        "person",
        Some(&json!({"code": "P001", "last_name": "Jansen"})),
        Some(Action::Insert),
        None,
    )?;
    let person = person.get_elements()?.elements.remove(0);
    assert_eq!(person.field("MatchPer"), Some(&upc_ir::Value::Integer(0)));
    // Matching on the code means no ordinary defaults
    assert_eq!(person.field("ViGe"), None);

    let org = factory.create(
        "organisation",
        Some(&json!({"code": "O001", "name": "Acme"})),
        Some(Action::Insert),
        None,
    )?;
    let org = org.get_elements()?.elements.remove(0);
    assert_eq!(org.field("MatchOga"), Some(&upc_ir::Value::Integer(6)));
    // Code supplied: the remote side must not number it
    assert_eq!(org.field("AutoNum"), None);
    Ok(())
}

#[test]
fn input_errors_are_aggregated() {
    let factory = factory();
    let err = factory
        .create(
            "person",
            Some(&json!({"last_name": "Jansen", "LaNm": "Jansen", "gender": "Q", "shoe_size": 44})),
            Some(Action::Insert),
            None,
        )
        .unwrap_err();
    let Error::Input(message) = err else {
        panic!("expected an input error");
    };
    let lines: Vec<_> = message.lines().collect();
    assert_eq!(lines.len(), 3, "{message}");
    assert!(lines.iter().all(|l| l.starts_with("KnPerson[0]: ")));
    assert!(message.contains("supplied both as 'LaNm' and as 'last_name'"));
    assert!(message.contains("'Q' is not one of the allowed codes"));
    assert!(message.contains("unknown field 'shoe_size' for KnPerson"));
}

#[test]
fn factory_from_config_file_loads_custom_types() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    fs::create_dir(dir.path().join("schemas"))?;
    fs::write(
        dir.path().join("schemas").join("course.json"),
        r#"{
            "object_type": "KnCourse",
            "alias": "course",
            "id_field": {"name": "CrId", "type": "integer"},
            "fields": [
                {"tag": "Ds", "alias": "description", "required": true},
                {"tag": "MaPa", "alias": "max_participants", "type": "integer", "default": 20}
            ]
        }"#,
    )?;
    let config_path = dir.path().join("connector.yaml");
    fs::write(
        &config_path,
        "schema_paths:\n  - schemas\noutput:\n  format: json\n",
    )?;

    let config = FactoryConfig::from_file(&config_path)?;
    assert_eq!(config.schema_paths, vec![dir.path().join("schemas")]);

    let factory = UpdateFactory::from_config(&config)?;
    let course = factory.create(
        "course",
        Some(&json!({"#id": 3, "description": "Rust"})),
        Some(Action::Insert),
        None,
    )?;
    assert_eq!(
        factory.render(&course)?,
        r#"{"KnCourse":{"Element":{"@CrId":3,"Fields":{"Ds":"Rust","MaPa":20}}}}"#
    );
    Ok(())
}

#[test]
fn level_none_defers_every_check_to_output() -> anyhow::Result<()> {
    let factory = factory();
    let mut person = factory.create(
        "person",
        Some(&json!({"last_name": "Jansen", "gender": "Q"})),
        Some(Action::Insert),
        Some(ValidationLevel::None),
    )?;
    person.set_field("shoe_size", &json!(44), None, Some(ValidationLevel::None))?;

    let err = person.get_elements().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("'ViGe' (gender): 'Q' is not one of the allowed codes"));
    assert!(message.contains("unknown field 'shoe_size' for KnPerson"));
    Ok(())
}
