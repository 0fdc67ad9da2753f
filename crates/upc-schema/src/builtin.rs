//! Built-in object types
//!
//! Field sets for the update connectors most callers need. Callers can
//! replace or extend any of them at start-up through the registry.

use crate::model::{
    AutoNumberRule, Derivation, FieldDefinition, FieldScope, FieldType, IdentifierMatch,
    MatchingRule, ObjectRelation, ObjectSchema, PostalAddressRule,
};

pub const ORGANISATION: &str = "KnOrganisation";
pub const PERSON: &str = "KnPerson";
pub const CONTACT: &str = "KnContact";
pub const ADDRESS: &str = "KnBasicAddressAdr";
pub const POSTAL_ADDRESS: &str = "KnBasicAddressPad";
pub const SUBJECT: &str = "KnSubject";
pub const SUBJECT_LINK: &str = "KnSubjectLink";
pub const SALES_ORDER: &str = "FbSales";
pub const SALES_ORDER_LINE: &str = "FbSalesLines";

/// Every built-in schema
#[must_use]
pub fn all() -> Vec<ObjectSchema> {
    vec![
        organisation(),
        person(),
        contact(),
        address(ADDRESS, "address"),
        address(POSTAL_ADDRESS, "postal_address"),
        subject(),
        subject_link(),
        sales_order(),
        sales_order_line(),
    ]
}

fn field(tag: &str, field_type: FieldType, alias: &str) -> FieldDefinition {
    FieldDefinition::new(tag, field_type).alias(alias)
}

fn address_relations(schema: ObjectSchema) -> ObjectSchema {
    schema
        .with_relation(ObjectRelation::new(ADDRESS).alias("address"))
        .with_relation(ObjectRelation::new(POSTAL_ADDRESS).alias("postal_address"))
        .with_postal_address(PostalAddressRule {
            field: "PadAdr".to_string(),
            address: ADDRESS.to_string(),
            postal: POSTAL_ADDRESS.to_string(),
        })
}

/// Organisation: matches on code, chamber of commerce or fiscal number
#[must_use]
pub fn organisation() -> ObjectSchema {
    let schema = ObjectSchema::new(ORGANISATION)
        .with_alias("organisation")
        .with_field(field("MatchOga", FieldType::Integer, "match_method").codes(["0", "1", "2", "3", "4", "5", "6"]))
        .with_field(field("BcCo", FieldType::String, "code").max_length(15))
        .with_field(field("SeNm", FieldType::String, "search_name").max_length(10))
        .with_field(field("Nm", FieldType::String, "name").required().max_length(255))
        .with_field(field("ViLe", FieldType::String, "legal_form"))
        .with_field(field("ViLb", FieldType::String, "branche"))
        .with_field(field("CcNr", FieldType::String, "coc_number"))
        .with_field(field("FiNr", FieldType::String, "fiscal_number"))
        .with_field(field("EmAd", FieldType::String, "email"))
        .with_field(field("TeNr", FieldType::String, "phone"))
        .with_field(field("HoPa", FieldType::String, "homepage"))
        .with_field(field("PadAdr", FieldType::Boolean, "postal_address_is_address"))
        .with_field(field("AutoNum", FieldType::Boolean, "auto_number").scope(FieldScope::Insert))
        .with_matching(MatchingRule {
            field: "MatchOga".to_string(),
            primary_key: "BcCo".to_string(),
            primary_key_value: 0,
            always_insert_value: 6,
            identifiers: vec![
                IdentifierMatch {
                    field: "CcNr".to_string(),
                    value: 1,
                },
                IdentifierMatch {
                    field: "FiNr".to_string(),
                    value: 2,
                },
            ],
            primary_key_on_insert: false,
        })
        .with_auto_number(AutoNumberRule {
            field: "AutoNum".to_string(),
            identifier: "BcCo".to_string(),
        });

    address_relations(schema).with_relation(ObjectRelation::new(CONTACT).alias("contact"))
}

/// Person: matches on code or social security number
///
/// Unlike organisations, an insert that carries a code matches on that code
/// (`MatchPer` 0) instead of forcing a new record.
#[must_use]
pub fn person() -> ObjectSchema {
    let schema = ObjectSchema::new(PERSON)
        .with_alias("person")
        .with_field(field("MatchPer", FieldType::Integer, "match_method").codes(["0", "1", "2", "3", "4", "5", "6", "7"]))
        .with_field(field("BcCo", FieldType::String, "code").max_length(15))
        .with_field(field("SeNm", FieldType::String, "search_name").max_length(10))
        .with_field(field("CaNm", FieldType::String, "call_name"))
        .with_field(field("FiNm", FieldType::String, "first_name"))
        .with_field(field("In", FieldType::String, "initials"))
        .with_field(field("Is", FieldType::String, "prefix"))
        .with_field(field("LaNm", FieldType::String, "last_name").required())
        .with_field(field("ViGe", FieldType::String, "gender").codes(["M", "O", "V", "X"]).default_value("O"))
        .with_field(field("SoSe", FieldType::String, "bsn"))
        .with_field(field("DaBi", FieldType::Date, "birth_date"))
        .with_field(field("EmAd", FieldType::String, "email"))
        .with_field(field("TeNr", FieldType::String, "phone"))
        .with_field(field("MbNr", FieldType::String, "mobile"))
        .with_field(field("PadAdr", FieldType::Boolean, "postal_address_is_address"))
        .with_field(field("AutoNum", FieldType::Boolean, "auto_number").scope(FieldScope::Insert))
        .with_matching(MatchingRule {
            field: "MatchPer".to_string(),
            primary_key: "BcCo".to_string(),
            primary_key_value: 0,
            always_insert_value: 7,
            identifiers: vec![IdentifierMatch {
                field: "SoSe".to_string(),
                value: 1,
            }],
            primary_key_on_insert: true,
        })
        .with_auto_number(AutoNumberRule {
            field: "AutoNum".to_string(),
            identifier: "BcCo".to_string(),
        })
        .with_derivation(Derivation::SearchName {
            source: "LaNm".to_string(),
            target: "SeNm".to_string(),
        })
        .with_derivation(Derivation::Initials {
            source: "FiNm".to_string(),
            target: "In".to_string(),
        });

    address_relations(schema).with_relation(ObjectRelation::new(CONTACT).alias("contact"))
}

/// Contact: the link between an organisation and a person
///
/// Standalone contacts name the organisation and person by code; embedded
/// ones get that from their position in the tree.
#[must_use]
pub fn contact() -> ObjectSchema {
    let schema = ObjectSchema::new(CONTACT)
        .with_alias("contact")
        .with_field(field("BcCoOga", FieldType::String, "organisation_code").scope(FieldScope::Standalone))
        .with_field(field("BcCoPer", FieldType::String, "person_code").scope(FieldScope::Standalone))
        .with_field(field("ViKc", FieldType::String, "contact_type").default_value("PRS"))
        .with_field(field("FuDs", FieldType::String, "job_title"))
        .with_field(field("TeNr", FieldType::String, "phone"))
        .with_field(field("MbNr", FieldType::String, "mobile"))
        .with_field(field("EmAd", FieldType::String, "email"))
        .with_field(field("FaNr", FieldType::String, "fax"))
        .with_field(field("Corr", FieldType::Boolean, "correspondence"))
        .with_field(field("PadAdr", FieldType::Boolean, "postal_address_is_address"));

    address_relations(schema).with_relation(ObjectRelation::new(PERSON).alias("person"))
}

/// Address; the same field set serves the visiting and the postal slot
#[must_use]
pub fn address(object_type: &str, alias: &str) -> ObjectSchema {
    ObjectSchema::new(object_type)
        .with_alias(alias)
        .with_field(field("CoId", FieldType::String, "country").default_value("NL"))
        .with_field(field("PbAd", FieldType::Boolean, "is_po_box").required())
        .with_field(field("StAd", FieldType::String, "street_addition"))
        .with_field(field("Ad", FieldType::String, "street").required())
        .with_field(field("HmNr", FieldType::Integer, "house_number"))
        .with_field(field("HmAd", FieldType::String, "house_number_ext"))
        .with_field(field("ZpCd", FieldType::String, "zip_code").required())
        .with_field(field("Rs", FieldType::String, "town").required())
        .with_field(field("ResZip", FieldType::Boolean, "resolve_zip").default_value(false).always_default())
        .with_field(field("BeginDate", FieldType::Date, "begin_date").default_today())
        .with_derivation(Derivation::SplitStreet {
            street: "Ad".to_string(),
            number: "HmNr".to_string(),
            extension: "HmAd".to_string(),
        })
}

/// Subject (dossier item), identified by its `SbId` attribute
#[must_use]
pub fn subject() -> ObjectSchema {
    ObjectSchema::new(SUBJECT)
        .with_alias("subject")
        .with_id_field("SbId", FieldType::Integer)
        .with_field(field("StId", FieldType::Integer, "type").required())
        .with_field(field("Ds", FieldType::String, "description"))
        .with_field(field("SbTx", FieldType::String, "text"))
        .with_field(field("Da", FieldType::Date, "date").default_today())
        .with_field(field("EmId", FieldType::String, "responsible"))
        .with_field(field("St", FieldType::Boolean, "done"))
        .with_relation(ObjectRelation::new(SUBJECT_LINK).alias("subject_link"))
}

/// Links a subject to an organisation, person or other record
#[must_use]
pub fn subject_link() -> ObjectSchema {
    ObjectSchema::new(SUBJECT_LINK)
        .with_alias("subject_link")
        .with_id_field("SbId", FieldType::Integer)
        .with_field(field("DoCRM", FieldType::Boolean, "is_crm"))
        .with_field(field("ToSR", FieldType::Boolean, "to_sales_relation"))
        .with_field(field("SfTp", FieldType::Integer, "source_type"))
        .with_field(field("SfId", FieldType::String, "source_id"))
}

/// Sales order header
#[must_use]
pub fn sales_order() -> ObjectSchema {
    ObjectSchema::new(SALES_ORDER)
        .with_alias("sales_order")
        .with_field(field("OrNu", FieldType::String, "order_number"))
        .with_field(field("DbId", FieldType::String, "debtor_id").required())
        .with_field(field("OrDa", FieldType::Date, "order_date").default_today())
        .with_field(field("Unit", FieldType::Integer, "administration").default_value(1_i64))
        .with_field(field("RfCs", FieldType::String, "reference"))
        .with_field(field("War", FieldType::String, "warehouse"))
        .with_field(field("CuId", FieldType::String, "currency").default_value("EUR"))
        .with_field(field("DaDe", FieldType::Date, "delivery_date"))
        .with_relation(ObjectRelation::new(SALES_ORDER_LINE).alias("line"))
}

/// Sales order line
#[must_use]
pub fn sales_order_line() -> ObjectSchema {
    ObjectSchema::new(SALES_ORDER_LINE)
        .with_alias("sales_order_line")
        .with_field(field("VaIt", FieldType::Integer, "item_type").default_value(6_i64))
        .with_field(field("ItCd", FieldType::String, "item_code").required())
        .with_field(field("Ds", FieldType::String, "description"))
        .with_field(field("BiUn", FieldType::String, "unit").default_value("stk"))
        .with_field(field("QuUn", FieldType::Decimal, "quantity").required())
        .with_field(field("Upri", FieldType::Decimal, "unit_price"))
        .with_field(field("DaDe", FieldType::Date, "delivery_date"))
}
