use codingdb::datavalue::{DataValue, Predicate, Value};
use codingdb::formal_arg::{FargType, FormalArgument};
use codingdb::timestamp::TimeStamp;
use codingdb::vocab::{MatrixType, VocabElement};
use codingdb::Database;

#[test]
fn copies_of_stored_values_are_independent() {
    let mut db = Database::new("copies");
    let col = db
        .add_column(VocabElement::column_template("n", MatrixType::Integer).unwrap())
        .unwrap();
    let t = TimeStamp::zero(db.tps());
    let first = db.append_cell(col, t, t, db.new_matrix(col).unwrap()).unwrap();
    let second = db.append_cell(col, t, t, db.new_matrix(col).unwrap()).unwrap();

    let stored = db.cell(first).unwrap().value().arg(0).unwrap().clone();
    let mut copy = stored.clone();
    copy.set(Value::Integer(99)).unwrap();
    assert_eq!(db.data_value(stored.id()).unwrap().as_integer(), Some(0));

    db.set_cell_arg(second, 0, copy).unwrap();
    let placed = db.cell(second).unwrap().value().arg(0).unwrap();
    assert_eq!(placed.as_integer(), Some(99));
    assert_ne!(placed.id(), stored.id());
    assert_eq!(placed.cell_id(), second);
    assert_eq!(db.data_value(stored.id()).unwrap().cell_id(), first);
}

#[test]
fn nested_arguments_get_fresh_ids_when_placed() {
    let mut db = Database::new("copies");
    let mut hit = VocabElement::predicate("hit").unwrap();
    hit.append_formal_arg(FormalArgument::new("<x>", FargType::Untyped).unwrap())
        .unwrap();
    let hit = db.add_vocab_element(hit).unwrap();
    let col = db
        .add_column(VocabElement::column_template("acts", MatrixType::Predicate).unwrap())
        .unwrap();
    let val = db.new_matrix(col).unwrap().arg(0).unwrap().farg_id();
    let p = Predicate::new(&db, hit).unwrap();
    let mut matrix = db.new_matrix(col).unwrap();
    matrix
        .set_arg(0, DataValue::with_payload(&db, val, Value::Predicate(Some(p))).unwrap())
        .unwrap();
    let t = TimeStamp::zero(db.tps());
    let first = db.append_cell(col, t, t, matrix.clone()).unwrap();
    let second = db.append_cell(col, t, t, matrix).unwrap();

    let nested_ids = |cell| -> Vec<u64> {
        let mut ids = Vec::new();
        db.cell(cell).unwrap().value().args()[0].walk(&mut |dv| ids.push(dv.id()));
        ids
    };
    let a = nested_ids(first);
    let b = nested_ids(second);
    assert_eq!(a.len(), 2);
    assert!(a.iter().all(|id| !b.contains(id)));
    assert!(a.iter().all(|id| db.data_value(*id).is_ok()));
}
