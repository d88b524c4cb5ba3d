use codingdb::datavalue::{DataValue, Predicate, Value};
use codingdb::formal_arg::{FargType, FormalArgument, RangeValue};
use codingdb::odb::parse_data_value;
use codingdb::timestamp::TimeStamp;
use codingdb::vocab::{MatrixType, VocabElement};
use codingdb::Database;

fn untyped(names: &[&str], ve: &mut VocabElement) {
    for name in names {
        ve.append_formal_arg(FormalArgument::new(name, FargType::Untyped).unwrap())
            .unwrap();
    }
}

#[test]
fn registered_cell_values_read_back_equal() {
    let mut db = Database::new("strings");
    let mut hit = VocabElement::predicate("hit").unwrap();
    untyped(&["<x>"], &mut hit);
    let hit = db.add_vocab_element(hit).unwrap();
    let x = db.vocab_element(hit).unwrap().fargs()[0].id();

    let mut mve = VocabElement::matrix("events", MatrixType::Matrix).unwrap();
    untyped(&["<a>", "<b>"], &mut mve);
    let col = db.add_column(mve).unwrap();
    let mve = db.column(col).unwrap().mve_id();
    let (a, b) = {
        let fargs = db.vocab_element(mve).unwrap().fargs();
        (fargs[0].id(), fargs[1].id())
    };

    let mut p = Predicate::new(&db, hit).unwrap();
    p.set_arg(0, DataValue::with_payload(&db, x, Value::Integer(5)).unwrap())
        .unwrap();
    let mut matrix = db.new_matrix(col).unwrap();
    matrix
        .set_arg(0, DataValue::with_payload(&db, a, Value::Predicate(Some(p))).unwrap())
        .unwrap();
    matrix
        .set_arg(1, DataValue::with_payload(&db, b, Value::quote_string("it's \\ fine")).unwrap())
        .unwrap();
    let t = TimeStamp::zero(db.tps());
    let cell = db.append_cell(col, t, t, matrix).unwrap();

    for stored in db.cell(cell).unwrap().value().args() {
        let text = stored.to_db_string();
        let parsed = parse_data_value(&db, &text).unwrap();
        assert_eq!(&parsed, stored, "{text}");
        assert_eq!(parsed.cell_id(), cell);
    }
}

#[test]
fn ranged_values_keep_their_range() {
    let mut db = Database::new("strings");
    let col = db
        .add_column(VocabElement::column_template("score", MatrixType::Float).unwrap())
        .unwrap();
    let mve = db.column(col).unwrap().mve_id();
    let farg = db.vocab_element(mve).unwrap().fargs()[0].id();
    db.set_formal_arg_range(farg, Some(RangeValue::Float(-1.5)), Some(RangeValue::Float(1e300)))
        .unwrap();
    let dv = DataValue::with_payload(&db, farg, Value::Float(0.25)).unwrap();
    let text = dv.to_db_string();
    assert!(text.contains("(minVal -1.5) (maxVal 1e300)"), "{text}");
    assert_eq!(parse_data_value(&db, &text).unwrap(), dv);

    // the printed range has to agree with the argument
    let narrowed = text.replace("(maxVal 1e300)", "(maxVal 2.0)");
    assert!(parse_data_value(&db, &narrowed).is_err());
}

#[test]
fn malformed_strings_are_rejected() {
    let db = Database::new("strings");
    assert!(parse_data_value(&db, "(FloatDataValue (id 0)").is_err());
    assert!(parse_data_value(&db, "(BogusDataValue (id 0))").is_err());
    let text = DataValue::construct(&db, Value::Integer(3)).unwrap().to_db_string();
    assert!(parse_data_value(&db, &format!("{text} trailing")).is_err());
}

#[test]
fn control_characters_in_text_survive() {
    let db = Database::new("strings");
    let dv = DataValue::construct(&db, Value::text("a\u{1}b\u{7f}c")).unwrap();
    let text = dv.to_db_string();
    assert!(text.contains("\"a\\\u{1}b\\\u{7f}c\""), "{text}");
    let parsed = parse_data_value(&db, &text).unwrap();
    assert_eq!(parsed.value(), &Value::text("a\u{1}b\u{7f}c"));
}

#[test]
fn oversized_time_stamps_are_errors() {
    let db = Database::new("strings");
    let text = DataValue::construct(&db, Value::TimeStamp(TimeStamp::zero(db.tps())))
        .unwrap()
        .to_db_string();
    assert!(text.contains("(itsValue (60,00:00:00:000))"), "{text}");
    let huge = text.replacen("00:00:00:000", "999999999999999:00:00:000", 1);
    assert!(parse_data_value(&db, &huge).is_err());
}
