//! Data values: the typed contents of cells and predicate arguments.
//!
//! A [`DataValue`] is bound (by id) to the formal argument whose slot it
//! fills and caches that argument's type and restrictions. The payload is a
//! [`Value`], one variant per value type. Whenever a payload is set it is
//! validated first and then coerced into the cached range, so a value never
//! holds something its argument would not accept.

use std::fmt;

use crate::database::Database;
use crate::error::{CodingDbError, Result};
use crate::formal_arg::{real_to_db, Bounds, FargKind, FargType, FormalArgument, RangeValue};
use crate::grammar::{
    check_farg_name, is_valid_nominal, is_valid_quote_string, is_valid_text,
};
use crate::registry::{Id, INVALID_ID};
use crate::timestamp::TimeStamp;
use crate::vocab::VocabElement;

// ------------- Value -------------
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Float(f64),
    Integer(i64),
    TimeStamp(TimeStamp),
    Nominal(Option<String>),
    QuoteString(Option<String>),
    Text(Option<String>),
    Predicate(Option<Predicate>),
    ColPred(Option<ColPred>),
    /// Placeholder for an argument nobody filled in; holds the argument name.
    Undefined(String),
}

impl Value {
    pub fn value_type(&self) -> FargType {
        match self {
            Value::Float(_) => FargType::Float,
            Value::Integer(_) => FargType::Integer,
            Value::TimeStamp(_) => FargType::TimeStamp,
            Value::Nominal(_) => FargType::Nominal,
            Value::QuoteString(_) => FargType::QuoteString,
            Value::Text(_) => FargType::Text,
            Value::Predicate(_) => FargType::Predicate,
            Value::ColPred(_) => FargType::ColPred,
            Value::Undefined(_) => FargType::Undefined,
        }
    }
    /// Default payload of a value type.
    pub fn default_for(ty: FargType, tps: u32) -> Result<Self> {
        Ok(match ty {
            FargType::Float => Value::Float(0.0),
            FargType::Integer => Value::Integer(0),
            FargType::TimeStamp => Value::TimeStamp(TimeStamp::zero(tps)),
            FargType::Nominal => Value::Nominal(None),
            FargType::QuoteString => Value::QuoteString(None),
            FargType::Text => Value::Text(None),
            FargType::Predicate => Value::Predicate(None),
            FargType::ColPred => Value::ColPred(None),
            FargType::Undefined => Value::Undefined("<val>".into()),
            FargType::Untyped => {
                return Err(CodingDbError::TypeMismatch(
                    "UNTYPED is not a value type".into(),
                ));
            }
        })
    }
    pub fn text(s: &str) -> Self {
        Value::Text(Some(s.to_owned()))
    }
    pub fn nominal(s: &str) -> Self {
        Value::Nominal(Some(s.to_owned()))
    }
    pub fn quote_string(s: &str) -> Self {
        Value::QuoteString(Some(s.to_owned()))
    }
    pub fn is_empty(&self) -> bool {
        matches!(
            self,
            Value::Nominal(None)
                | Value::QuoteString(None)
                | Value::Text(None)
                | Value::Predicate(None)
                | Value::ColPred(None)
        )
    }
}

/// Control characters other than line ends and tabs need a `\\` in front,
/// otherwise the lexer drops them from strings.
pub(crate) fn needs_escape(ch: char) -> bool {
    ch.is_ascii_control() && !matches!(ch, '\t' | '\n' | '\r')
}

pub(crate) fn quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        if ch == '"' || ch == '\\' || needs_escape(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

pub(crate) fn symbol(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('|');
    for ch in s.chars() {
        if ch == '|' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('|');
    out
}

fn check_binding(farg: &FormalArgument, ty: FargType) -> Result<()> {
    let accepted = match farg.farg_type() {
        FargType::Untyped => !matches!(ty, FargType::Text | FargType::Untyped),
        other => other == ty,
    };
    if accepted {
        Ok(())
    } else {
        Err(CodingDbError::TypeMismatch(format!(
            "{ty} value cannot fill {} argument {}",
            farg.farg_type(),
            farg.name()
        )))
    }
}

/// Type a freshly bound value takes when the caller does not ask for one.
fn natural_type(farg: &FormalArgument) -> FargType {
    match farg.farg_type() {
        FargType::Untyped => FargType::Undefined,
        other => other,
    }
}

// ------------- DataValue -------------
#[derive(Clone, PartialEq, Debug)]
pub struct DataValue {
    pub(crate) id: Id,
    farg_id: Id,
    farg_type: FargType,
    pub(crate) cell_id: Id,
    constraint: FargKind,
    value: Value,
}

impl DataValue {
    /// Unbound value of the given type holding the type's default.
    pub fn unbound(db: &Database, ty: FargType) -> Result<Self> {
        Self::unbound_with_tps(ty, db.tps())
    }
    pub(crate) fn unbound_with_tps(ty: FargType, tps: u32) -> Result<Self> {
        let value = Value::default_for(ty, tps)?;
        Ok(Self {
            id: INVALID_ID,
            farg_id: INVALID_ID,
            farg_type: FargType::Undefined,
            cell_id: INVALID_ID,
            constraint: FargKind::open(ty),
            value,
        })
    }
    /// Value bound to a formal argument, of the argument's own type (or
    /// undefined for untyped arguments), holding the coerced default.
    pub fn bound(db: &Database, farg_id: Id) -> Result<Self> {
        let farg = db.formal_arg(farg_id)?;
        Ok(Self::for_farg(farg, db.tps()))
    }
    pub fn bound_as(db: &Database, farg_id: Id, ty: FargType) -> Result<Self> {
        let farg = db.formal_arg(farg_id)?;
        Self::for_farg_as(farg, ty, db.tps())
    }
    /// Bound value with an initial payload; the payload decides the type.
    pub fn with_payload(db: &Database, farg_id: Id, value: Value) -> Result<Self> {
        let mut dv = Self::bound_as(db, farg_id, value.value_type())?;
        dv.set(value)?;
        Ok(dv)
    }
    /// Unbound value pre-set to a payload.
    pub fn construct(db: &Database, value: Value) -> Result<Self> {
        let mut dv = Self::unbound(db, value.value_type())?;
        dv.set(value)?;
        Ok(dv)
    }
    pub(crate) fn for_farg(farg: &FormalArgument, tps: u32) -> Self {
        let ty = natural_type(farg);
        let constraint = match ty {
            FargType::Undefined => FargKind::Untyped,
            _ => farg.kind().clone(),
        };
        let value = match farg.kind() {
            FargKind::Untyped => Value::Undefined(farg.name().to_owned()),
            FargKind::Float(_) => Value::Float(0.0),
            FargKind::Integer(_) => Value::Integer(0),
            FargKind::TimeStamp(range) => Value::TimeStamp(TimeStamp::zero(
                range.map_or(tps, |b| b.min.tps()),
            )),
            FargKind::Nominal(_) => Value::Nominal(None),
            FargKind::Predicate(_) => Value::Predicate(None),
            FargKind::QuoteString => Value::QuoteString(None),
            FargKind::Text => Value::Text(None),
            FargKind::ColPred => Value::ColPred(None),
        };
        let mut dv = Self {
            id: INVALID_ID,
            farg_id: farg.id(),
            farg_type: farg.farg_type(),
            cell_id: INVALID_ID,
            constraint,
            value,
        };
        dv.value = dv.coerce_to_range(dv.value.clone());
        dv
    }
    pub(crate) fn for_farg_as(farg: &FormalArgument, ty: FargType, tps: u32) -> Result<Self> {
        check_binding(farg, ty)?;
        if ty == natural_type(farg) {
            return Ok(Self::for_farg(farg, tps));
        }
        // untyped argument holding a typed value: no restrictions apply
        let value = Value::default_for(ty, tps)?;
        Ok(Self {
            id: INVALID_ID,
            farg_id: farg.id(),
            farg_type: farg.farg_type(),
            cell_id: INVALID_ID,
            constraint: FargKind::Untyped,
            value,
        })
    }
    pub fn id(&self) -> Id {
        self.id
    }
    pub fn farg_id(&self) -> Id {
        self.farg_id
    }
    pub fn farg_type(&self) -> FargType {
        self.farg_type
    }
    pub fn cell_id(&self) -> Id {
        self.cell_id
    }
    pub fn is_bound(&self) -> bool {
        self.farg_id != INVALID_ID
    }
    pub fn value_type(&self) -> FargType {
        self.value.value_type()
    }
    pub fn value(&self) -> &Value {
        &self.value
    }
    pub(crate) fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }
    pub fn sub_range(&self) -> bool {
        self.constraint.sub_range()
    }
    pub fn range(&self) -> Option<(RangeValue, RangeValue)> {
        self.constraint.range()
    }
    pub fn constraint(&self) -> &FargKind {
        &self.constraint
    }
    pub fn as_float(&self) -> Option<f64> {
        match self.value {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }
    pub fn as_integer(&self) -> Option<i64> {
        match self.value {
            Value::Integer(v) => Some(v),
            _ => None,
        }
    }
    /// Validates and then stores a payload, coerced into the cached range.
    /// A rejected payload leaves the value untouched.
    pub fn set(&mut self, value: Value) -> Result<()> {
        self.check_payload(&value)?;
        let value = match value {
            Value::Text(Some(s)) if s.is_empty() => Value::Text(None),
            other => other,
        };
        self.value = self.coerce_to_range(value);
        Ok(())
    }
    pub fn is_valid_value(&self, value: &Value) -> bool {
        self.check_payload(value).is_ok()
    }
    fn check_payload(&self, value: &Value) -> Result<()> {
        if value.value_type() != self.value_type() {
            return Err(CodingDbError::TypeMismatch(format!(
                "{} payload for a {} value",
                value.value_type(),
                self.value_type()
            )));
        }
        let invalid = |what: &str, s: &str| -> Result<()> {
            Err(CodingDbError::InvalidValue(format!("{what} {s:?}")))
        };
        match value {
            Value::Float(v) if !v.is_finite() => invalid("float", &v.to_string()),
            Value::Text(Some(s)) if !is_valid_text(s) => invalid("text", s),
            Value::QuoteString(Some(s)) if !is_valid_quote_string(s) => invalid("quote string", s),
            Value::Nominal(Some(s)) if !is_valid_nominal(s) => invalid("nominal", s),
            Value::Undefined(name) => check_farg_name(name),
            Value::TimeStamp(ts) => match &self.constraint {
                FargKind::TimeStamp(Some(b)) if !ts.same_base(&b.min) => {
                    Err(CodingDbError::TypeMismatch(format!(
                        "time stamp at {} ticks per second for a range at {}",
                        ts.tps(),
                        b.min.tps()
                    )))
                }
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }
    /// Clamps into the cached sub-range; identity when there is none.
    /// Nominals and predicates outside their approved sets become empty.
    pub fn coerce_to_range(&self, value: Value) -> Value {
        match (value, &self.constraint) {
            (Value::Float(v), FargKind::Float(Some(b))) => Value::Float(b.clamp(v)),
            (Value::Integer(v), FargKind::Integer(Some(b))) => Value::Integer(b.clamp(v)),
            (Value::TimeStamp(ts), FargKind::TimeStamp(Some(b))) if ts.same_base(&b.min) => {
                Value::TimeStamp(b.clamp(ts))
            }
            (Value::Nominal(Some(s)), FargKind::Nominal(Some(approved)))
                if !approved.contains(&s) =>
            {
                Value::Nominal(None)
            }
            (Value::Predicate(Some(p)), FargKind::Predicate(Some(approved)))
                if !approved.contains(&p.pve_id) =>
            {
                Value::Predicate(None)
            }
            (value, _) => value,
        }
    }
    /// Re-syncs with a formal argument that changed after this value was
    /// bound to it, then re-coerces. Nested predicate arguments follow.
    pub fn update_for_farg_change(&mut self, farg: &FormalArgument) {
        if self.farg_id == farg.id() && self.farg_id != INVALID_ID {
            if let Value::Undefined(name) = &mut self.value {
                *name = farg.name().to_owned();
            } else if self.value.value_type() == farg.farg_type() {
                self.constraint = farg.kind().clone();
            } else {
                self.constraint = FargKind::Untyped;
            }
            self.farg_type = farg.farg_type();
            self.value = self.coerce_to_range(self.value.clone());
        }
        match &mut self.value {
            Value::Predicate(Some(p)) => {
                for arg in p.args.iter_mut() {
                    arg.update_for_farg_change(farg);
                }
            }
            Value::ColPred(Some(cp)) => {
                for arg in cp.args.iter_mut() {
                    arg.update_for_farg_change(farg);
                }
            }
            _ => (),
        }
    }
    /// True when the payload equals the (coerced) default of its argument.
    pub fn is_default(&self, tps: u32) -> bool {
        match Value::default_for(self.value_type(), tps) {
            Ok(Value::Undefined(_)) => true,
            Ok(default) => self.coerce_to_range(default) == self.value,
            Err(_) => false,
        }
    }
    /// Visits this value and every value nested in it, depth first.
    pub fn walk(&self, f: &mut dyn FnMut(&DataValue)) {
        f(self);
        for arg in self.nested_args() {
            arg.walk(f);
        }
    }
    pub(crate) fn walk_mut(&mut self, f: &mut dyn FnMut(&mut DataValue)) {
        f(self);
        let args = match &mut self.value {
            Value::Predicate(Some(p)) => &mut p.args,
            Value::ColPred(Some(cp)) => &mut cp.args,
            _ => return,
        };
        for arg in args.iter_mut() {
            arg.walk_mut(f);
        }
    }
    pub fn find(&self, id: Id) -> Option<&DataValue> {
        if self.id == id {
            return Some(self);
        }
        self.nested_args().iter().find_map(|arg| arg.find(id))
    }
    fn nested_args(&self) -> &[DataValue] {
        match &self.value {
            Value::Predicate(Some(p)) => &p.args,
            Value::ColPred(Some(cp)) => &cp.args,
            _ => &[],
        }
    }
    /// Forgets registration ids so the value can be placed somewhere new.
    pub(crate) fn detach(&mut self) {
        self.walk_mut(&mut |dv| {
            dv.id = INVALID_ID;
            dv.cell_id = INVALID_ID;
        });
    }
    pub(crate) fn restore_ids(&mut self, id: Id, cell_id: Id) {
        self.id = id;
        self.cell_id = cell_id;
    }
    fn class_name(&self) -> &'static str {
        match self.value {
            Value::Float(_) => "FloatDataValue",
            Value::Integer(_) => "IntDataValue",
            Value::TimeStamp(_) => "TimeStampDataValue",
            Value::Nominal(_) => "NominalDataValue",
            Value::QuoteString(_) => "QuoteStringDataValue",
            Value::Text(_) => "TextStringDataValue",
            Value::Predicate(_) => "PredDataValue",
            Value::ColPred(_) => "ColPredDataValue",
            Value::Undefined(_) => "UndefinedDataValue",
        }
    }
    fn db_payload(&self) -> String {
        match &self.value {
            Value::Float(v) => real_to_db(*v),
            Value::Integer(v) => v.to_string(),
            Value::TimeStamp(ts) => ts.to_db_string(),
            Value::Nominal(Some(s)) => symbol(s),
            Value::QuoteString(Some(s)) | Value::Text(Some(s)) => quoted(s),
            Value::Nominal(None) | Value::QuoteString(None) | Value::Text(None) => {
                "<null>".into()
            }
            Value::Predicate(Some(p)) => p.to_db_string(),
            Value::ColPred(Some(cp)) => cp.to_db_string(),
            Value::Predicate(None) | Value::ColPred(None) => "()".into(),
            Value::Undefined(name) => name.clone(),
        }
    }
    /// Canonical form, read back by [`crate::odb::parse_data_value`].
    pub fn to_db_string(&self) -> String {
        let mut s = format!(
            "({} (id {}) (itsFargID {}) (itsFargType {}) (itsCellID {}) (itsValue {}) (subRange {})",
            self.class_name(),
            self.id,
            self.farg_id,
            self.farg_type,
            self.cell_id,
            self.db_payload(),
            self.sub_range()
        );
        match (&self.value, &self.constraint) {
            (Value::Float(_), FargKind::Float(Some(Bounds { min, max }))) => {
                s += &format!(" (minVal {}) (maxVal {})", real_to_db(*min), real_to_db(*max));
            }
            (Value::Float(_), _) => s += " (minVal 0.0) (maxVal 0.0)",
            (Value::Integer(_), FargKind::Integer(Some(Bounds { min, max }))) => {
                s += &format!(" (minVal {min}) (maxVal {max})");
            }
            (Value::Integer(_), _) => s += " (minVal 0) (maxVal 0)",
            (Value::TimeStamp(_), FargKind::TimeStamp(Some(Bounds { min, max }))) => {
                s += &format!(
                    " (minVal {}) (maxVal {})",
                    min.to_db_string(),
                    max.to_db_string()
                );
            }
            _ => (),
        }
        s.push(')');
        s
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.value {
            Value::Float(v) => write!(f, "{v:.6}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::TimeStamp(ts) => write!(f, "{ts}"),
            Value::Nominal(s) | Value::Text(s) => f.write_str(s.as_deref().unwrap_or("")),
            Value::QuoteString(s) => write!(f, "\"{}\"", s.as_deref().unwrap_or("")),
            Value::Predicate(Some(p)) => write!(f, "{p}"),
            Value::ColPred(Some(cp)) => write!(f, "{cp}"),
            Value::Predicate(None) | Value::ColPred(None) => f.write_str("()"),
            Value::Undefined(name) => f.write_str(name),
        }
    }
}

fn fmt_args(f: &mut fmt::Formatter, name: &str, args: &[DataValue]) -> fmt::Result {
    let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    write!(f, "{}({})", name, args.join(", "))
}

fn db_args(args: &[DataValue]) -> String {
    let args: Vec<String> = args.iter().map(|arg| arg.to_db_string()).collect();
    format!("({})", args.join(", "))
}

fn replace_arg(args: &mut [DataValue], index: usize, mut value: DataValue) -> Result<()> {
    let slot = args.get_mut(index).ok_or_else(|| {
        CodingDbError::InvalidValue(format!("argument index {index} out of bounds"))
    })?;
    if value.farg_id != slot.farg_id {
        return Err(CodingDbError::TypeMismatch(format!(
            "value bound to {} cannot fill the slot of {}",
            value.farg_id, slot.farg_id
        )));
    }
    value.detach();
    *slot = value;
    Ok(())
}

// ------------- Predicate -------------
/// An instance of a predicate vocabulary element.
#[derive(Clone, PartialEq, Debug)]
pub struct Predicate {
    pve_id: Id,
    name: String,
    var_len: bool,
    pub(crate) args: Vec<DataValue>,
}

impl Predicate {
    pub fn new(db: &Database, pve_id: Id) -> Result<Self> {
        let ve = db.vocab_element(pve_id)?;
        if !ve.is_predicate() {
            return Err(CodingDbError::TypeMismatch(format!(
                "{} is not a predicate",
                ve.name()
            )));
        }
        Ok(Self::for_vocab(ve, db.tps()))
    }
    pub(crate) fn for_vocab(ve: &VocabElement, tps: u32) -> Self {
        Self {
            pve_id: ve.id(),
            name: ve.name().to_owned(),
            var_len: ve.var_len(),
            args: ve.fargs().iter().map(|farg| DataValue::for_farg(farg, tps)).collect(),
        }
    }
    pub fn pve_id(&self) -> Id {
        self.pve_id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn var_len(&self) -> bool {
        self.var_len
    }
    pub fn args(&self) -> &[DataValue] {
        &self.args
    }
    pub fn arg(&self, index: usize) -> Option<&DataValue> {
        self.args.get(index)
    }
    /// Replaces an argument; the new value must be bound to the same formal
    /// argument as the one it replaces.
    pub fn set_arg(&mut self, index: usize, value: DataValue) -> Result<()> {
        replace_arg(&mut self.args, index, value)
    }
    pub(crate) fn push_arg(&mut self, value: DataValue) {
        self.args.push(value);
    }
    pub fn to_db_string(&self) -> String {
        format!(
            "(predicate (pveID {}) (predName {}) (varLen {}) (argList {}))",
            self.pve_id,
            symbol(&self.name),
            self.var_len,
            db_args(&self.args)
        )
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt_args(f, &self.name, &self.args)
    }
}

// ------------- ColPred -------------
/// A reference to a cell of a column, by ordinal, onset and offset plus the
/// column's own arguments.
#[derive(Clone, PartialEq, Debug)]
pub struct ColPred {
    mve_id: Id,
    name: String,
    var_len: bool,
    pub(crate) args: Vec<DataValue>,
}

impl ColPred {
    pub fn new(db: &Database, mve_id: Id) -> Result<Self> {
        let ve = db.vocab_element(mve_id)?;
        if ve.is_predicate() {
            return Err(CodingDbError::TypeMismatch(format!(
                "{} is not a column",
                ve.name()
            )));
        }
        Ok(Self::for_vocab(ve, db.tps()))
    }
    pub(crate) fn for_vocab(ve: &VocabElement, tps: u32) -> Self {
        Self {
            mve_id: ve.id(),
            name: ve.name().to_owned(),
            var_len: ve.var_len(),
            args: ve
                .cp_fargs()
                .iter()
                .map(|farg| DataValue::for_farg(farg, tps))
                .collect(),
        }
    }
    pub fn mve_id(&self) -> Id {
        self.mve_id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn var_len(&self) -> bool {
        self.var_len
    }
    pub fn args(&self) -> &[DataValue] {
        &self.args
    }
    pub fn set_arg(&mut self, index: usize, value: DataValue) -> Result<()> {
        replace_arg(&mut self.args, index, value)
    }
    pub(crate) fn push_arg(&mut self, value: DataValue) {
        self.args.push(value);
    }
    pub fn to_db_string(&self) -> String {
        format!(
            "(colPred (mveID {}) (mveName {}) (varLen {}) (argList {}))",
            self.mve_id,
            symbol(&self.name),
            self.var_len,
            db_args(&self.args)
        )
    }
}

impl fmt::Display for ColPred {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt_args(f, &self.name, &self.args)
    }
}

// ------------- Matrix -------------
/// The value of a cell: one data value per formal argument of the column's
/// matrix vocabulary element.
#[derive(Clone, PartialEq, Debug)]
pub struct Matrix {
    mve_id: Id,
    pub(crate) args: Vec<DataValue>,
}

impl Matrix {
    pub fn new(db: &Database, mve_id: Id) -> Result<Self> {
        let ve = db.vocab_element(mve_id)?;
        if ve.is_predicate() {
            return Err(CodingDbError::TypeMismatch(format!(
                "{} is not a column",
                ve.name()
            )));
        }
        Ok(Self::for_vocab(ve, db.tps()))
    }
    pub(crate) fn for_vocab(ve: &VocabElement, tps: u32) -> Self {
        Self {
            mve_id: ve.id(),
            args: ve.fargs().iter().map(|farg| DataValue::for_farg(farg, tps)).collect(),
        }
    }
    pub fn mve_id(&self) -> Id {
        self.mve_id
    }
    pub fn args(&self) -> &[DataValue] {
        &self.args
    }
    pub fn arg(&self, index: usize) -> Option<&DataValue> {
        self.args.get(index)
    }
    pub fn set_arg(&mut self, index: usize, value: DataValue) -> Result<()> {
        replace_arg(&mut self.args, index, value)
    }
    pub fn to_db_string(&self) -> String {
        format!("(Matrix (mveID {}) (argList {}))", self.mve_id, db_args(&self.args))
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|arg| arg.to_string()).collect();
        write!(f, "({})", args.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_defaults() {
        let db = Database::new("defaults");
        let f = DataValue::unbound(&db, FargType::Float).unwrap();
        assert_eq!(f.to_string(), "0.000000");
        assert!(!f.is_bound());
        let t = DataValue::unbound(&db, FargType::TimeStamp).unwrap();
        assert_eq!(t.to_string(), "00:00:00:000");
        assert!(DataValue::unbound(&db, FargType::Untyped).is_err());
    }

    #[test]
    fn payload_type_is_fixed() {
        let db = Database::new("types");
        let mut v = DataValue::unbound(&db, FargType::Integer).unwrap();
        assert!(v.set(Value::Float(1.0)).is_err());
        v.set(Value::Integer(7)).unwrap();
        assert_eq!(v.as_integer(), Some(7));
    }

    #[test]
    fn string_grammars_are_enforced_on_set() {
        let db = Database::new("strings");
        let mut q = DataValue::unbound(&db, FargType::QuoteString).unwrap();
        assert!(q.set(Value::quote_string("say \"hi\"")).is_err());
        q.set(Value::quote_string("say hi")).unwrap();
        assert_eq!(q.to_string(), "\"say hi\"");
        let mut n = DataValue::unbound(&db, FargType::Nominal).unwrap();
        assert!(n.set(Value::nominal("trailing ")).is_err());
        assert_eq!(n.value(), &Value::Nominal(None));
        let mut t = DataValue::unbound(&db, FargType::Text).unwrap();
        t.set(Value::text("")).unwrap();
        assert_eq!(t.value(), &Value::Text(None));
        assert!(t.set(Value::Float(f64::NAN)).is_err());
    }

    #[test]
    fn db_string_of_unbound_text() {
        let db = Database::new("db");
        let t = DataValue::construct(&db, Value::text("a \"b\"")).unwrap();
        assert_eq!(
            t.to_db_string(),
            "(TextStringDataValue (id 0) (itsFargID 0) (itsFargType UNDEFINED) (itsCellID 0) (itsValue \"a \\\"b\\\"\") (subRange false))"
        );
    }
}
