use codingdb::datavalue::{DataValue, Predicate, Value};
use codingdb::formal_arg::{FargType, FormalArgument};
use codingdb::registry::Id;
use codingdb::timestamp::TimeStamp;
use codingdb::vocab::{MatrixType, VocabElement};
use codingdb::Database;

struct Fixture {
    db: Database,
    hit: Id,
    codes: Id,
    acts: Id,
    code_cell: Id,
    act_cell: Id,
}

fn fixture() -> Fixture {
    let mut db = Database::new("vocab");
    let mut hit = VocabElement::predicate("hit").unwrap();
    hit.append_formal_arg(FormalArgument::new("<x>", FargType::Untyped).unwrap())
        .unwrap();
    let hit = db.add_vocab_element(hit).unwrap();

    let codes = db
        .add_column(VocabElement::column_template("codes", MatrixType::Matrix).unwrap())
        .unwrap();
    let arg0 = db
        .vocab_element(db.column(codes).unwrap().mve_id())
        .unwrap()
        .fargs()[0]
        .id();
    let mut matrix = db.new_matrix(codes).unwrap();
    matrix
        .set_arg(0, DataValue::with_payload(&db, arg0, Value::Integer(1)).unwrap())
        .unwrap();
    let t = TimeStamp::zero(db.tps());
    let code_cell = db.append_cell(codes, t, t, matrix).unwrap();

    let acts = db
        .add_column(VocabElement::column_template("acts", MatrixType::Predicate).unwrap())
        .unwrap();
    let val = db
        .vocab_element(db.column(acts).unwrap().mve_id())
        .unwrap()
        .fargs()[0]
        .id();
    let p = Predicate::new(&db, hit).unwrap();
    let mut matrix = db.new_matrix(acts).unwrap();
    matrix
        .set_arg(0, DataValue::with_payload(&db, val, Value::Predicate(Some(p))).unwrap())
        .unwrap();
    let act_cell = db.append_cell(acts, t, t, matrix).unwrap();

    Fixture {
        db,
        hit,
        codes,
        acts,
        code_cell,
        act_cell,
    }
}

#[test]
fn appended_arguments_reach_existing_cells() {
    let mut f = fixture();
    let codes_mve = f.db.column(f.codes).unwrap().mve_id();
    f.db.append_formal_arg(codes_mve, FormalArgument::new("<b>", FargType::Untyped).unwrap())
        .unwrap();
    f.db.append_formal_arg(f.hit, FormalArgument::new("<y>", FargType::Untyped).unwrap())
        .unwrap();

    let code_cell = f.db.cell(f.code_cell).unwrap();
    assert_eq!(code_cell.value().to_string(), "(1, <b>)");
    let added = code_cell.value().arg(1).unwrap().id();
    assert_eq!(f.db.data_value(added).unwrap().cell_id(), f.code_cell);

    let act_cell = f.db.cell(f.act_cell).unwrap();
    assert_eq!(act_cell.value().to_string(), "(hit(<x>, <y>))");
    assert_eq!(f.db.vocab_element(f.hit).unwrap().to_string(), "hit(<x>, <y>)");
}

#[test]
fn renamed_arguments_rename_undefined_values() {
    let mut f = fixture();
    let x = f.db.vocab_element(f.hit).unwrap().fargs()[0].id();
    let mut renamed = f.db.formal_arg(x).unwrap().clone();
    renamed.set_name("<who>").unwrap();
    f.db.replace_formal_arg(renamed).unwrap();
    assert_eq!(
        f.db.cell(f.act_cell).unwrap().value().to_string(),
        "(hit(<who>))"
    );
    assert_eq!(f.db.formal_arg(x).unwrap().name(), "<who>");
}

#[test]
fn typed_columns_keep_a_single_argument() {
    let mut f = fixture();
    let acts_mve = f.db.column(f.acts).unwrap().mve_id();
    assert!(f
        .db
        .append_formal_arg(acts_mve, FormalArgument::new("<more>", FargType::Untyped).unwrap())
        .is_err());
    assert!(f.db.set_var_len(acts_mve, true).is_err());
}

#[test]
fn predicates_in_use_cannot_be_removed() {
    let mut f = fixture();
    assert!(f.db.remove_vocab_element(f.hit).is_err());
    f.db.remove(f.act_cell).unwrap();
    f.db.remove_vocab_element(f.hit).unwrap();
    assert!(f.db.vocab_id("hit").is_none());
    assert!(f.db.predicates().is_empty());
}
