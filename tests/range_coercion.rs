use std::collections::BTreeSet;

use codingdb::datavalue::{DataValue, Value};
use codingdb::formal_arg::{FargType, FormalArgument, RangeValue};
use codingdb::registry::Id;
use codingdb::timestamp::TimeStamp;
use codingdb::vocab::{MatrixType, VocabElement};
use codingdb::Database;

fn column(db: &mut Database, name: &str, ty: MatrixType) -> (Id, Id) {
    let col = db
        .add_column(VocabElement::column_template(name, ty).unwrap())
        .unwrap();
    let mve = db.column(col).unwrap().mve_id();
    let farg = db.vocab_element(mve).unwrap().fargs()[0].id();
    (col, farg)
}

#[test]
fn floats_are_clamped_into_the_argument_range() {
    let mut db = Database::new("ranges");
    let (_, farg) = column(&mut db, "score", MatrixType::Float);
    db.set_formal_arg_range(farg, Some(RangeValue::Float(-100.0)), Some(RangeValue::Float(100.0)))
        .unwrap();
    let mut dv = DataValue::bound(&db, farg).unwrap();
    assert!(dv.sub_range());
    dv.set(Value::Float(200.0)).unwrap();
    assert_eq!(dv.as_float(), Some(100.0));
    dv.set(Value::Float(-150.0)).unwrap();
    assert_eq!(dv.as_float(), Some(-100.0));
    dv.set(Value::Float(50.0)).unwrap();
    assert_eq!(dv.to_string(), "50.000000");
}

#[test]
fn integer_defaults_start_inside_the_range() {
    let mut db = Database::new("ranges");
    let (_, farg) = column(&mut db, "count", MatrixType::Integer);
    db.set_formal_arg_range(farg, Some(RangeValue::Integer(1)), Some(RangeValue::Integer(10)))
        .unwrap();
    let dv = DataValue::bound(&db, farg).unwrap();
    assert_eq!(dv.as_integer(), Some(1));
    assert!(dv.is_default(db.tps()));
    assert!(db
        .set_formal_arg_range(farg, Some(RangeValue::Integer(3)), Some(RangeValue::Integer(3)))
        .is_err());
}

#[test]
fn stored_cells_follow_a_narrowed_range() {
    let mut db = Database::new("ranges");
    let (col, farg) = column(&mut db, "score", MatrixType::Float);
    let mut matrix = db.new_matrix(col).unwrap();
    matrix
        .set_arg(0, DataValue::with_payload(&db, farg, Value::Float(50.0)).unwrap())
        .unwrap();
    let t = TimeStamp::zero(db.tps());
    let cell = db.append_cell(col, t, t, matrix).unwrap();

    db.set_formal_arg_range(farg, Some(RangeValue::Float(-10.0)), Some(RangeValue::Float(10.0)))
        .unwrap();
    let stored = db.cell(cell).unwrap().value().arg(0).unwrap();
    assert_eq!(stored.as_float(), Some(10.0));
    assert_eq!(stored.range(), Some((RangeValue::Float(-10.0), RangeValue::Float(10.0))));
}

#[test]
fn matrices_built_before_a_range_change_are_clamped_on_append() {
    let mut db = Database::new("ranges");
    let (col, farg) = column(&mut db, "score", MatrixType::Float);
    let mut matrix = db.new_matrix(col).unwrap();
    matrix
        .set_arg(0, DataValue::with_payload(&db, farg, Value::Float(200.0)).unwrap())
        .unwrap();
    db.set_formal_arg_range(farg, Some(RangeValue::Float(-100.0)), Some(RangeValue::Float(100.0)))
        .unwrap();

    let t = TimeStamp::zero(db.tps());
    let cell = db.append_cell(col, t, t, matrix).unwrap();
    let stored = db.cell(cell).unwrap().value().arg(0).unwrap();
    assert!(stored.sub_range());
    assert_eq!(stored.as_float(), Some(100.0));
    assert_eq!(stored.range(), db.formal_arg(farg).unwrap().range());
}

#[test]
fn unapproved_nominals_become_empty() {
    let mut db = Database::new("nominals");
    let (_, farg) = column(&mut db, "side", MatrixType::Nominal);
    let mut updated = db.formal_arg(farg).unwrap().clone();
    let approved: BTreeSet<String> = ["left", "right"].iter().map(|s| s.to_string()).collect();
    updated.set_approved_nominals(Some(approved)).unwrap();
    db.replace_formal_arg(updated).unwrap();

    let mut dv = DataValue::bound(&db, farg).unwrap();
    dv.set(Value::nominal("up")).unwrap();
    assert_eq!(dv.value(), &Value::Nominal(None));
    dv.set(Value::nominal("left")).unwrap();
    assert_eq!(dv.value(), &Value::nominal("left"));
}

#[test]
fn time_stamps_clamp_within_their_base() {
    let mut db = Database::new("times");
    let mut pve = VocabElement::predicate("at").unwrap();
    pve.append_formal_arg(FormalArgument::new("<t>", FargType::TimeStamp).unwrap())
        .unwrap();
    let pve = db.add_vocab_element(pve).unwrap();
    let farg = db.vocab_element(pve).unwrap().fargs()[0].id();
    let lo = TimeStamp::new(60, 60).unwrap();
    let hi = TimeStamp::new(60, 600).unwrap();
    db.set_formal_arg_range(farg, Some(RangeValue::TimeStamp(lo)), Some(RangeValue::TimeStamp(hi)))
        .unwrap();

    let mut dv = DataValue::bound(&db, farg).unwrap();
    assert_eq!(dv.value(), &Value::TimeStamp(lo));
    dv.set(Value::TimeStamp(TimeStamp::new(60, 6000).unwrap())).unwrap();
    assert_eq!(dv.value(), &Value::TimeStamp(hi));
    assert!(dv.set(Value::TimeStamp(TimeStamp::new(30, 100).unwrap())).is_err());
    assert_eq!(dv.value(), &Value::TimeStamp(hi));
}
