use codingdb::datavalue::{ColPred, DataValue, Predicate, Value};
use codingdb::formal_arg::{FargType, FormalArgument};
use codingdb::vocab::{MatrixType, VocabElement};
use codingdb::Database;

#[test]
fn every_value_type_has_a_default() {
    let db = Database::new("defaults");
    let shown: Vec<String> = [
        FargType::Float,
        FargType::Integer,
        FargType::TimeStamp,
        FargType::Nominal,
        FargType::QuoteString,
        FargType::Text,
        FargType::Predicate,
        FargType::ColPred,
        FargType::Undefined,
    ]
    .into_iter()
    .map(|ty| DataValue::unbound(&db, ty).unwrap().to_string())
    .collect();
    assert_eq!(
        shown,
        vec!["0.000000", "0", "00:00:00:000", "", "\"\"", "", "()", "()", "<val>"]
    );
}

#[test]
fn untyped_arguments_start_out_undefined() {
    let mut db = Database::new("defaults");
    let mut pve = VocabElement::predicate("hit").unwrap();
    for name in ["<a>", "<b>"] {
        pve.append_formal_arg(FormalArgument::new(name, FargType::Untyped).unwrap())
            .unwrap();
    }
    let pve = db.add_vocab_element(pve).unwrap();
    let a = db.vocab_element(pve).unwrap().fargs()[0].id();

    let dv = DataValue::bound(&db, a).unwrap();
    assert_eq!(dv.value(), &Value::Undefined("<a>".into()));
    assert_eq!(dv.farg_type(), FargType::Untyped);
    assert!(dv.is_default(db.tps()));

    let p = Predicate::new(&db, pve).unwrap();
    assert_eq!(p.to_string(), "hit(<a>, <b>)");
    assert!(!p.var_len());
}

#[test]
fn column_predicates_lead_with_ord_and_times() {
    let mut db = Database::new("defaults");
    let col = db
        .add_column(VocabElement::column_template("trial", MatrixType::Integer).unwrap())
        .unwrap();
    let mve = db.column(col).unwrap().mve_id();
    let cp = ColPred::new(&db, mve).unwrap();
    assert_eq!(cp.to_string(), "trial(0, 00:00:00:000, 00:00:00:000, 0)");
    assert!(Predicate::new(&db, mve).is_err());
}

#[test]
fn fresh_matrices_hold_argument_defaults() {
    let mut db = Database::new("defaults");
    let col = db
        .add_column(VocabElement::column_template("codes", MatrixType::Matrix).unwrap())
        .unwrap();
    assert_eq!(db.new_matrix(col).unwrap().to_string(), "(<arg0>)");
    let text = db
        .add_column(VocabElement::column_template("notes", MatrixType::Text).unwrap())
        .unwrap();
    let matrix = db.new_matrix(text).unwrap();
    assert_eq!(matrix.arg(0).unwrap().value(), &Value::Text(None));
}

#[test]
fn text_rejects_backspace() {
    let db = Database::new("defaults");
    assert!(DataValue::construct(&db, Value::text("a\u{8}b")).is_err());
    assert!(DataValue::construct(&db, Value::text("tab\tand\nnewline")).is_ok());
}

#[test]
fn text_stays_within_latin_1() {
    let db = Database::new("defaults");
    assert!(DataValue::construct(&db, Value::text("caf\u{e9} \u{ff}")).is_ok());
    assert!(DataValue::construct(&db, Value::text("\u{100}")).is_err());
    assert!(DataValue::construct(&db, Value::text("\u{1f600}")).is_err());
}

#[test]
fn floats_must_be_finite() {
    let db = Database::new("defaults");
    let mut dv = DataValue::construct(&db, Value::Float(1.0)).unwrap();
    assert!(dv.set(Value::Float(f64::INFINITY)).is_err());
    assert!(dv.set(Value::Float(f64::NEG_INFINITY)).is_err());
    assert!(dv.set(Value::Float(f64::NAN)).is_err());
    assert_eq!(dv.as_float(), Some(1.0));
}
