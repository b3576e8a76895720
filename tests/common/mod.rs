#![allow(dead_code)]
// Record types shared by the integration tests
use chrono::NaiveDateTime;
use objsql::{
    Attribute, AttributeKind, Check, ExtendedAttributes, PersistenceEngine, Record, Rule,
    SqliteStore, Value,
};

pub const SCHEMA: &[&str] = &[
    "create table members (
        id integer primary key autoincrement,
        no text,
        name text,
        gender integer,
        mobile text,
        registered_at text,
        updated_at text,
        extended_attributes text
    )",
    "create table orders (
        id integer primary key autoincrement,
        no text not null,
        member_id integer,
        amount real,
        quantity real,
        sales_at text
    )",
];

pub fn engine() -> PersistenceEngine<SqliteStore> {
    let engine = PersistenceEngine::new(SqliteStore::open_in_memory().expect("store"));
    for ddl in SCHEMA {
        engine.execute(ddl).expect("schema");
    }
    engine
}

pub fn timestamp(text: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").expect("timestamp")
}

// ------------- Member -------------
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Member {
    pub id: Option<i64>,
    pub no: Option<String>,
    pub name: Option<String>,
    pub gender: Option<i64>,
    pub mobile: Option<String>,
    pub registered_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub extended_attributes: Option<ExtendedAttributes>,
}

impl Member {
    pub fn new(no: &str, name: &str) -> Self {
        Member::default()
            .set_no(no)
            .set_name(name)
            .set_gender(0)
            .set_mobile("15011112222")
    }
    pub fn set_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
    pub fn set_no(mut self, no: &str) -> Self {
        self.no = Some(no.to_string());
        self
    }
    pub fn set_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
    pub fn set_gender(mut self, gender: i64) -> Self {
        self.gender = Some(gender);
        self
    }
    pub fn set_mobile(mut self, mobile: &str) -> Self {
        self.mobile = Some(mobile.to_string());
        self
    }
    pub fn set_registered_at(mut self, at: NaiveDateTime) -> Self {
        self.registered_at = Some(at);
        self
    }
    pub fn set_extended_attributes(mut self, attributes: ExtendedAttributes) -> Self {
        self.extended_attributes = Some(attributes);
        self
    }
}

static MEMBER_ATTRIBUTES: &[Attribute<Member>] = &[
    Attribute::new("id", AttributeKind::Integer, |m: &Member| m.id.into(), |m: &mut Member, v: Value| m.id = v.as_integer()),
    Attribute::new("no", AttributeKind::Text, |m: &Member| m.no.clone().into(), |m: &mut Member, v: Value| m.no = v.into_text()),
    Attribute::new("name", AttributeKind::Text, |m: &Member| m.name.clone().into(), |m: &mut Member, v: Value| m.name = v.into_text()),
    Attribute::new("gender", AttributeKind::Integer, |m: &Member| m.gender.into(), |m: &mut Member, v: Value| m.gender = v.as_integer()),
    Attribute::new("mobile", AttributeKind::Text, |m: &Member| m.mobile.clone().into(), |m: &mut Member, v: Value| m.mobile = v.into_text()),
    Attribute::new("registered_at", AttributeKind::Timestamp, |m: &Member| m.registered_at.into(), |m: &mut Member, v: Value| m.registered_at = v.as_timestamp()),
    Attribute::new("updated_at", AttributeKind::Timestamp, |m: &Member| m.updated_at.into(), |m: &mut Member, v: Value| m.updated_at = v.as_timestamp()),
    Attribute::new(
        "extended_attributes",
        AttributeKind::Extended,
        |m: &Member| m.extended_attributes.clone().into(),
        |m: &mut Member, v: Value| m.extended_attributes = v.into_extended(),
    ),
];

static MEMBER_RULES: &[Rule] = &[
    Rule::new("no", Check::Required),
    Rule::new("no", Check::Length { min: 5, max: 10 }),
    Rule::new("name", Check::Required),
    Rule::new("gender", Check::OneOf(&["0", "1"])),
    Rule::new("mobile", Check::Pattern(r"^\d{11}$")),
];

impl Record for Member {
    const TABLE_NAME: &'static str = "members";
    fn attributes() -> &'static [Attribute<Self>] {
        MEMBER_ATTRIBUTES
    }
    fn rules() -> &'static [Rule] {
        MEMBER_RULES
    }
}

// ------------- Order -------------
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Order {
    pub id: Option<i64>,
    pub no: Option<String>,
    pub member_id: Option<i64>,
    pub amount: Option<f64>,
    pub quantity: Option<f64>,
    pub sales_at: Option<NaiveDateTime>,
}

impl Order {
    pub fn new(no: &str, member_id: i64, amount: f64) -> Self {
        Order {
            no: Some(no.to_string()),
            member_id: Some(member_id),
            amount: Some(amount),
            quantity: Some(1.0),
            ..Order::default()
        }
    }
}

static ORDER_ATTRIBUTES: &[Attribute<Order>] = &[
    Attribute::new("id", AttributeKind::Integer, |o: &Order| o.id.into(), |o: &mut Order, v: Value| o.id = v.as_integer()),
    Attribute::new("no", AttributeKind::Text, |o: &Order| o.no.clone().into(), |o: &mut Order, v: Value| o.no = v.into_text()),
    Attribute::new("member_id", AttributeKind::Integer, |o: &Order| o.member_id.into(), |o: &mut Order, v: Value| o.member_id = v.as_integer()),
    Attribute::new("amount", AttributeKind::Real, |o: &Order| o.amount.into(), |o: &mut Order, v: Value| o.amount = v.as_real()),
    Attribute::new("quantity", AttributeKind::Real, |o: &Order| o.quantity.into(), |o: &mut Order, v: Value| o.quantity = v.as_real()),
    Attribute::new("sales_at", AttributeKind::Timestamp, |o: &Order| o.sales_at.into(), |o: &mut Order, v: Value| o.sales_at = v.as_timestamp()),
];

static ORDER_RULES: &[Rule] = &[
    Rule::new("no", Check::Required),
    Rule::new("amount", Check::Range { min: 0.0, max: 1_000_000.0 }),
];

impl Record for Order {
    const TABLE_NAME: &'static str = "orders";
    fn attributes() -> &'static [Attribute<Self>] {
        ORDER_ATTRIBUTES
    }
    fn rules() -> &'static [Rule] {
        ORDER_RULES
    }
}
