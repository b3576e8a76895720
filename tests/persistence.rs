mod common;

use common::{engine, timestamp, Member, Order, SCHEMA};
use objsql::{col, sum, values, Dataset, ObjsqlError, Outcome, PersistenceEngine, Source, SqliteStore, Value};

fn seed_three(engine: &PersistenceEngine<SqliteStore>) -> Vec<Member> {
    engine
        .create_all(
            vec![
                Member::new("200001", "Alice"),
                Member::new("200003", "Mary"),
                Member::new("200004", "Denise"),
            ],
            false,
        )
        .expect("create_all")
        .committed()
        .expect("committed")
}

#[test]
fn created_records_are_counted() {
    let engine = engine();
    let created = seed_three(&engine);
    assert_eq!(created.len(), 3);
    assert_eq!(engine.count_all::<Member>().unwrap(), 3);
}

#[test]
fn generated_keys_are_written_back() {
    let engine = engine();
    let created = seed_three(&engine);
    let ids: Vec<Option<i64>> = created.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
    let single = engine
        .create(Member::new("200005", "Eve"), false)
        .unwrap()
        .committed()
        .unwrap();
    assert_eq!(single.id, Some(4));
}

#[test]
fn destroy_by_primary_key() {
    let engine = engine();
    seed_three(&engine);
    assert_eq!(engine.destroy::<Member>(1).unwrap(), 1);
    assert_eq!(engine.count_all::<Member>().unwrap(), 2);
    assert!(engine.query_by_primary_key::<Member>(1).unwrap().is_none());
    // nothing left to remove
    assert_eq!(engine.destroy::<Member>(1).unwrap(), 0);
}

#[test]
fn update_by_primary_key_touches_only_set_attributes() {
    let engine = engine();
    seed_three(&engine);
    let partial = Member::default().set_name("X");
    let outcome = engine.update(1, &partial, true).unwrap();
    assert_eq!(outcome, Outcome::Committed(1));

    let member = engine.query_by_primary_key::<Member>(1).unwrap().expect("row");
    assert_eq!(member.name.as_deref(), Some("X"));
    assert_eq!(member.no.as_deref(), Some("200001"));
    assert_eq!(member.mobile.as_deref(), Some("15011112222"));

    let untouched = engine.query_by_primary_key::<Member>(2).unwrap().expect("row");
    assert_eq!(untouched.name.as_deref(), Some("Mary"));
}

#[test]
fn update_of_a_missing_row_affects_nothing() {
    let engine = engine();
    seed_three(&engine);
    let outcome = engine.update(42, &Member::new("200042", "Nobody"), false).unwrap();
    assert_eq!(outcome, Outcome::Committed(0));
    assert_eq!(engine.count_all::<Member>().unwrap(), 3);
}

#[test]
fn update_and_destroy_need_a_key() {
    let engine = engine();
    let result = engine.update(Value::Null, &Member::new("200001", "Alice"), true);
    assert!(matches!(result, Err(ObjsqlError::InvalidArgument(_))));
    let result = engine.destroy::<Member>(Value::Null);
    assert!(matches!(result, Err(ObjsqlError::InvalidArgument(_))));
}

#[test]
fn update_by_predicate_renames_matching_rows() {
    let engine = engine();
    seed_three(&engine);
    engine.update(1, &Member::default().set_name("X"), true).unwrap();

    let rows = engine
        .update_where::<Member>("name = ?", "name = ?", values!["Y", "X"])
        .unwrap();
    assert_eq!(rows, 1);
    assert!(engine.query_first::<Member>("name = 'X'", vec![]).unwrap().is_none());
    let renamed = engine.query_first::<Member>("name = ?", values!["Y"]).unwrap().expect("row");
    assert_eq!(renamed.id, Some(1));
}

#[test]
fn update_by_predicate_checks_parameter_count() {
    let engine = engine();
    seed_three(&engine);
    let result = engine.update_where::<Member>("name = ?", "name = ?", values!["Y"]);
    assert!(matches!(result, Err(ObjsqlError::Compilation(_))));
    assert_eq!(engine.count::<Member>("name = ?", values!["Y"]).unwrap(), 0);
}

#[test]
fn destroy_by_predicate_removes_exactly_the_matches() {
    let engine = engine();
    seed_three(&engine);
    engine
        .create_all(vec![Member::new("200006", "Z"), Member::new("200007", "Z")], false)
        .unwrap();
    let before = engine.count_all::<Member>().unwrap();
    let removed = engine.destroy_where::<Member>("name = ?", values!["Z"]).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(engine.count_all::<Member>().unwrap(), before - removed as i64);
    assert_eq!(engine.count::<Member>("name = ?", values!["Z"]).unwrap(), 0);
    assert_eq!(engine.destroy_where::<Member>("name = ?", values!["Z"]).unwrap(), 0);
}

#[test]
fn invalid_records_are_rejected_without_writing() {
    let engine = engine();
    let outcome = engine
        .create(Member::new("1", "Short").set_mobile("123"), false)
        .unwrap();
    let fields: Vec<&str> = outcome.violations().iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, vec!["no", "mobile"]);
    assert!(!outcome.is_committed());
    assert_eq!(engine.count_all::<Member>().unwrap(), 0);
}

#[test]
fn skipping_validation_writes_anyway() {
    let engine = engine();
    let outcome = engine
        .create(Member::new("1", "Short").set_mobile("123"), true)
        .unwrap();
    assert!(outcome.is_committed());
    assert_eq!(engine.count_all::<Member>().unwrap(), 1);
}

#[test]
fn a_rejected_batch_writes_nothing() {
    let engine = engine();
    let outcome = engine
        .create_all(
            vec![
                Member::new("200001", "Alice"),
                Member::new("200002", "Bob").set_gender(7),
                Member::default(),
            ],
            false,
        )
        .unwrap();
    match outcome {
        Outcome::Rejected(violations) => {
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].field, "gender");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_eq!(engine.count_all::<Member>().unwrap(), 0);
}

#[test]
fn a_failing_batch_is_rolled_back() {
    let engine = engine();
    let result = engine.create_all(
        vec![
            Member::new("200001", "Alice").set_id(10),
            Member::new("200002", "Bob").set_id(11),
            Member::new("200003", "Mary").set_id(10),
        ],
        false,
    );
    assert!(matches!(result, Err(ObjsqlError::Persistence(_))));
    assert_eq!(engine.count_all::<Member>().unwrap(), 0);

    // the engine stays usable after the rollback
    seed_three(&engine);
    assert_eq!(engine.count_all::<Member>().unwrap(), 3);
}

#[test]
fn a_batch_failing_at_commit_is_rolled_back() {
    let engine = PersistenceEngine::new(SqliteStore::open_in_memory().unwrap());
    engine.execute("pragma foreign_keys = on").unwrap();
    engine.execute(SCHEMA[0]).unwrap();
    // the foreign key is only checked when the transaction commits
    engine
        .execute(
            "create table orders (
                id integer primary key autoincrement,
                no text not null,
                member_id integer references members(id) deferrable initially deferred,
                amount real,
                quantity real,
                sales_at text
            )",
        )
        .unwrap();

    let result = engine.create_all(vec![Order::new("X-1", 999, 1.0), Order::new("X-2", 999, 2.0)], false);
    assert!(matches!(result, Err(ObjsqlError::Persistence(_))));
    assert_eq!(engine.count_all::<Order>().unwrap(), 0);

    // later writes run in their own transactions again
    let member = engine
        .create(Member::new("200001", "Alice"), false)
        .unwrap()
        .committed()
        .unwrap();
    engine
        .create_all(vec![Order::new("A-1", member.id.unwrap(), 5.0)], false)
        .unwrap();
    assert_eq!(engine.count_all::<Order>().unwrap(), 1);
    assert_eq!(engine.count_all::<Member>().unwrap(), 1);
}

#[test]
fn explicit_keys_are_kept() {
    let engine = engine();
    let created = engine
        .create(Member::new("200100", "Keyed").set_id(100), false)
        .unwrap()
        .committed()
        .unwrap();
    assert_eq!(created.id, Some(100));
    assert!(engine.query_by_primary_key::<Member>(100).unwrap().is_some());
}

#[test]
fn save_creates_then_updates() {
    let engine = engine();
    let saved = engine
        .save(Member::new("200001", "Alice"), false)
        .unwrap()
        .committed()
        .unwrap();
    assert_eq!(saved.id, Some(1));

    let renamed = saved.clone().set_name("Alicia");
    engine.save(renamed, false).unwrap();
    assert_eq!(engine.count_all::<Member>().unwrap(), 1);
    let stored = engine.query_by_primary_key::<Member>(1).unwrap().unwrap();
    assert_eq!(stored.name.as_deref(), Some("Alicia"));

    // a key with no row behind it is created
    engine.save(Member::new("200009", "Ivy").set_id(9), false).unwrap();
    assert_eq!(engine.count_all::<Member>().unwrap(), 2);
}

#[test]
fn save_of_a_bare_key_creates_once() {
    let engine = engine();
    let bare = Member::default().set_id(5);
    let outcome = engine.save(bare.clone(), true).unwrap();
    assert_eq!(outcome, Outcome::Committed(bare.clone()));
    assert!(engine.query_by_primary_key::<Member>(5).unwrap().is_some());

    // the row exists now and there is nothing to change
    assert!(engine.save(bare.clone(), true).unwrap().is_committed());
    assert_eq!(engine.count_all::<Member>().unwrap(), 1);
    // required attributes are still enforced
    assert!(!engine.save(bare, false).unwrap().is_committed());
}

#[test]
fn query_returns_all_matches_mapped() {
    let engine = engine();
    seed_three(&engine);
    let members = engine
        .query::<Member>("name LIKE ? OR no = ?", values!["%e%", "200001"])
        .unwrap();
    let mut names: Vec<String> = members.into_iter().filter_map(|m| m.name).collect();
    names.sort();
    assert_eq!(names, vec!["Alice", "Denise"]);
}

#[test]
fn query_first_of_nothing_is_none() {
    let engine = engine();
    assert!(engine.query_first::<Member>("1 = 1", vec![]).unwrap().is_none());
    assert!(engine.query_by_primary_key::<Member>(1).unwrap().is_none());
}

#[test]
fn timestamps_and_extended_attributes_survive_the_store() {
    let engine = engine();
    let mut extended = objsql::ExtendedAttributes::new();
    extended.insert("level".into(), serde_json::json!("gold"));
    extended.insert("tags".into(), serde_json::json!(["a", "b"]));
    let registered = timestamp("2024-03-01 09:30:00");
    let created = engine
        .create(
            Member::new("200001", "Alice")
                .set_registered_at(registered)
                .set_extended_attributes(extended.clone()),
            false,
        )
        .unwrap()
        .committed()
        .unwrap();

    let stored = engine
        .query_by_primary_key::<Member>(created.id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored.registered_at, Some(registered));
    assert_eq!(stored.extended_attributes, Some(extended));
    assert_eq!(stored, created);
}

#[test]
fn execute_runs_statements_verbatim() {
    let engine = engine();
    seed_three(&engine);
    let rows = engine.execute("update members set gender = 1 where id > 1").unwrap();
    assert_eq!(rows, 2);
    assert_eq!(engine.count::<Member>("gender = ?", values![1]).unwrap(), 2);
    let result = engine.execute("update no_such_table set x = 1");
    assert!(matches!(result, Err(ObjsqlError::Persistence(_))));
}

#[test]
fn execute_accepts_queries_and_scripts() {
    let engine = engine();
    seed_three(&engine);
    // statements returning rows report how many they produced
    assert_eq!(engine.execute("select count(*) from members").unwrap(), 1);
    assert_eq!(engine.execute("select * from members where gender = 0").unwrap(), 3);
    assert_eq!(engine.execute("pragma table_info(orders)").unwrap(), 6);

    let changed = engine
        .execute("update members set gender = 1 where id = 1; update members set gender = 1 where id = 2;")
        .unwrap();
    assert_eq!(changed, 1);
    assert_eq!(engine.count::<Member>("gender = ?", values![1]).unwrap(), 2);
}

#[test]
fn datasets_join_records_of_different_types() {
    let engine = engine();
    let members = seed_three(&engine);
    let alice = members[0].id.unwrap();
    let mary = members[1].id.unwrap();
    engine
        .create_all(
            vec![
                Order::new("A-1", alice, 10.0),
                Order::new("A-2", alice, 32.5),
                Order::new("M-1", mary, 5.0),
            ],
            false,
        )
        .unwrap();

    let dataset = Dataset::new()
        .select([col("m.name"), sum(col("o.amount")).alias("total")])
        .from(Source::aliased("members", "m"))
        .join(Source::aliased("orders", "o"), col("o.member_id").eq(col("m.id")))
        .group_by([col("m.name")])
        .order_by([col("total").desc()]);
    let rows = engine.fetch(&dataset).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], Value::from("Alice"));
    assert_eq!(rows[0]["total"], Value::Real(42.5));
    assert_eq!(rows[1]["name"], Value::from("Mary"));

    let spenders = Dataset::new()
        .from("members")
        .filter(col("id").in_dataset(
            Dataset::new().select([col("member_id")]).from("orders").filter(col("amount").gt(20)),
        ));
    let found: Vec<Member> = engine.fetch_as(&spenders).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name.as_deref(), Some("Alice"));
}

#[test]
fn out_of_range_orders_are_rejected() {
    let engine = engine();
    let outcome = engine.create(Order::new("X-1", 1, -3.0), false).unwrap();
    assert_eq!(outcome.violations().len(), 1);
    assert_eq!(outcome.violations()[0].rule, "range");
    assert_eq!(engine.count_all::<Order>().unwrap(), 0);
}

#[test]
fn cloned_engines_share_the_store() {
    let engine = engine();
    let other = engine.clone();
    seed_three(&engine);
    assert_eq!(other.count_all::<Member>().unwrap(), 3);

    let handle = std::thread::spawn(move || {
        other
            .create(Member::new("200008", "Thread"), false)
            .unwrap()
            .is_committed()
    });
    assert!(handle.join().unwrap());
    assert_eq!(engine.count_all::<Member>().unwrap(), 4);
}
