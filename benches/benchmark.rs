use std::hint::black_box;

use codingdb::datavalue::{DataValue, Predicate, Value};
use codingdb::formal_arg::{FargType, FormalArgument};
use codingdb::odb::OdbReader;
use codingdb::timestamp::TimeStamp;
use codingdb::vocab::{MatrixType, VocabElement};
use codingdb::Database;
use criterion::{criterion_group, criterion_main, Criterion};

// ------------- fixture -------------
fn synthetic(cells: i64) -> Database {
    let mut db = Database::new("bench");
    let mut hit = VocabElement::predicate("hit").unwrap();
    for name in ["<who>", "<how>"] {
        hit.append_formal_arg(FormalArgument::new(name, FargType::Untyped).unwrap())
            .unwrap();
    }
    let hit = db.add_vocab_element(hit).unwrap();
    let who = db.vocab_element(hit).unwrap().fargs()[0].id();

    let score = db
        .add_column(VocabElement::column_template("score", MatrixType::Float).unwrap())
        .unwrap();
    let acts = db
        .add_column(VocabElement::column_template("acts", MatrixType::Predicate).unwrap())
        .unwrap();
    let score_farg = db.new_matrix(score).unwrap().arg(0).unwrap().farg_id();
    let acts_farg = db.new_matrix(acts).unwrap().arg(0).unwrap().farg_id();
    let tps = db.tps();
    for i in 0..cells {
        let onset = TimeStamp::new(tps, i * 30).unwrap();
        let offset = TimeStamp::new(tps, i * 30 + 29).unwrap();

        let mut m = db.new_matrix(score).unwrap();
        let v = DataValue::with_payload(&db, score_farg, Value::Float(i as f64 / 7.0)).unwrap();
        m.set_arg(0, v).unwrap();
        db.append_cell(score, onset, offset, m).unwrap();

        let mut p = Predicate::new(&db, hit).unwrap();
        p.set_arg(0, DataValue::with_payload(&db, who, Value::Integer(i)).unwrap())
            .unwrap();
        let mut m = db.new_matrix(acts).unwrap();
        let v = DataValue::with_payload(&db, acts_farg, Value::Predicate(Some(p))).unwrap();
        m.set_arg(0, v).unwrap();
        db.append_cell(acts, onset, offset, m).unwrap();
    }
    db
}

fn dump(db: &Database) -> Vec<u8> {
    let mut out = Vec::new();
    db.to_modb_file(&mut out, "\n").unwrap();
    out
}

// ------------- benches -------------
fn read_bench(c: &mut Criterion) {
    let text = dump(&synthetic(2_000));
    c.bench_function("read 4000 cells", |b| {
        b.iter(|| {
            let mut reader = OdbReader::new(black_box(text.as_slice()), std::io::sink(), std::io::sink());
            black_box(reader.read_db().unwrap())
        })
    });
}

fn dump_bench(c: &mut Criterion) {
    let db = synthetic(2_000);
    c.bench_function("dump 4000 cells", |b| b.iter(|| black_box(dump(black_box(&db)))));
}

criterion_group!(benches, read_bench, dump_bench);
criterion_main!(benches);
