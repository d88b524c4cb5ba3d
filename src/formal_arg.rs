use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{CodingDbError, Result};
use crate::grammar::{check_farg_name, is_valid_nominal};
use crate::registry::{Id, INVALID_ID};
use crate::timestamp::TimeStamp;

// ------------- FargType -------------
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FargType {
    Untyped,
    Float,
    Integer,
    TimeStamp,
    Nominal,
    Predicate,
    QuoteString,
    Text,
    ColPred,
    Undefined,
}

impl FargType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FargType::Untyped => "UNTYPED",
            FargType::Float => "FLOAT",
            FargType::Integer => "INTEGER",
            FargType::TimeStamp => "TIME_STAMP",
            FargType::Nominal => "NOMINAL",
            FargType::Predicate => "PREDICATE",
            FargType::QuoteString => "QUOTE_STRING",
            FargType::Text => "TEXT",
            FargType::ColPred => "COL_PREDICATE",
            FargType::Undefined => "UNDEFINED",
        }
    }
}

impl fmt::Display for FargType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FargType {
    type Err = CodingDbError;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "UNTYPED" => FargType::Untyped,
            "FLOAT" => FargType::Float,
            "INTEGER" => FargType::Integer,
            "TIME_STAMP" => FargType::TimeStamp,
            "NOMINAL" => FargType::Nominal,
            "PREDICATE" => FargType::Predicate,
            "QUOTE_STRING" => FargType::QuoteString,
            "TEXT" => FargType::Text,
            "COL_PREDICATE" => FargType::ColPred,
            "UNDEFINED" => FargType::Undefined,
            _ => {
                return Err(CodingDbError::InvalidValue(format!(
                    "unknown formal argument type {s:?}"
                )));
            }
        })
    }
}

// ------------- Ranges -------------
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    pub fn clamp(&self, value: T) -> T {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }
}

/// One end of a numeric or temporal sub-range.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum RangeValue {
    Float(f64),
    Integer(i64),
    TimeStamp(TimeStamp),
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RangeValue::Float(v) => f.write_str(&real_to_db(*v)),
            RangeValue::Integer(v) => write!(f, "{v}"),
            RangeValue::TimeStamp(ts) => f.write_str(&ts.to_db_string()),
        }
    }
}

/// Floats in db strings print the shortest form that parses back exactly,
/// always with a fractional part.
pub(crate) fn real_to_db(v: f64) -> String {
    format!("{v:?}")
}

// ------------- FargKind -------------
/// The type of a formal argument together with whatever restricts the values
/// it accepts. A `None` range or approved set means "anything of the type".
#[derive(Clone, PartialEq, Debug)]
pub enum FargKind {
    Untyped,
    Float(Option<Bounds<f64>>),
    Integer(Option<Bounds<i64>>),
    TimeStamp(Option<Bounds<TimeStamp>>),
    Nominal(Option<BTreeSet<String>>),
    Predicate(Option<BTreeSet<Id>>),
    QuoteString,
    Text,
    ColPred,
}

impl FargKind {
    /// The unrestricted kind of a type. `Undefined` values are held by
    /// untyped arguments.
    pub fn open(ty: FargType) -> Self {
        match ty {
            FargType::Untyped | FargType::Undefined => FargKind::Untyped,
            FargType::Float => FargKind::Float(None),
            FargType::Integer => FargKind::Integer(None),
            FargType::TimeStamp => FargKind::TimeStamp(None),
            FargType::Nominal => FargKind::Nominal(None),
            FargType::Predicate => FargKind::Predicate(None),
            FargType::QuoteString => FargKind::QuoteString,
            FargType::Text => FargKind::Text,
            FargType::ColPred => FargKind::ColPred,
        }
    }
    pub fn farg_type(&self) -> FargType {
        match self {
            FargKind::Untyped => FargType::Untyped,
            FargKind::Float(_) => FargType::Float,
            FargKind::Integer(_) => FargType::Integer,
            FargKind::TimeStamp(_) => FargType::TimeStamp,
            FargKind::Nominal(_) => FargType::Nominal,
            FargKind::Predicate(_) => FargType::Predicate,
            FargKind::QuoteString => FargType::QuoteString,
            FargKind::Text => FargType::Text,
            FargKind::ColPred => FargType::ColPred,
        }
    }
    pub fn sub_range(&self) -> bool {
        match self {
            FargKind::Float(r) => r.is_some(),
            FargKind::Integer(r) => r.is_some(),
            FargKind::TimeStamp(r) => r.is_some(),
            FargKind::Nominal(set) => set.is_some(),
            FargKind::Predicate(set) => set.is_some(),
            _ => false,
        }
    }
    pub fn range(&self) -> Option<(RangeValue, RangeValue)> {
        match self {
            FargKind::Float(Some(b)) => Some((RangeValue::Float(b.min), RangeValue::Float(b.max))),
            FargKind::Integer(Some(b)) => {
                Some((RangeValue::Integer(b.min), RangeValue::Integer(b.max)))
            }
            FargKind::TimeStamp(Some(b)) => {
                Some((RangeValue::TimeStamp(b.min), RangeValue::TimeStamp(b.max)))
            }
            _ => None,
        }
    }
}

// ------------- FormalArgument -------------
/// A typed, named slot of a vocabulary element.
#[derive(Clone, PartialEq, Debug)]
pub struct FormalArgument {
    pub(crate) id: Id,
    pub(crate) ve_id: Id,
    name: String,
    hidden: bool,
    kind: FargKind,
}

impl FormalArgument {
    pub fn new(name: &str, ty: FargType) -> Result<Self> {
        if ty == FargType::Undefined {
            return Err(CodingDbError::TypeMismatch(
                "formal arguments cannot be of type UNDEFINED".into(),
            ));
        }
        Self::with_kind(name, FargKind::open(ty))
    }
    pub fn with_kind(name: &str, kind: FargKind) -> Result<Self> {
        check_farg_name(name)?;
        let mut farg = Self {
            id: INVALID_ID,
            ve_id: INVALID_ID,
            name: name.to_owned(),
            hidden: false,
            kind: FargKind::open(kind.farg_type()),
        };
        match kind {
            FargKind::Float(Some(b)) => farg.set_range(
                Some(RangeValue::Float(b.min)),
                Some(RangeValue::Float(b.max)),
            )?,
            FargKind::Integer(Some(b)) => farg.set_range(
                Some(RangeValue::Integer(b.min)),
                Some(RangeValue::Integer(b.max)),
            )?,
            FargKind::TimeStamp(Some(b)) => farg.set_range(
                Some(RangeValue::TimeStamp(b.min)),
                Some(RangeValue::TimeStamp(b.max)),
            )?,
            FargKind::Nominal(approved) => farg.set_approved_nominals(approved)?,
            FargKind::Predicate(approved) => farg.set_approved_predicates(approved)?,
            _ => (),
        }
        Ok(farg)
    }
    pub fn id(&self) -> Id {
        self.id
    }
    pub fn ve_id(&self) -> Id {
        self.ve_id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn hidden(&self) -> bool {
        self.hidden
    }
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }
    pub fn kind(&self) -> &FargKind {
        &self.kind
    }
    pub fn farg_type(&self) -> FargType {
        self.kind.farg_type()
    }
    pub fn sub_range(&self) -> bool {
        self.kind.sub_range()
    }
    pub fn range(&self) -> Option<(RangeValue, RangeValue)> {
        self.kind.range()
    }
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        check_farg_name(name)?;
        self.name = name.to_owned();
        Ok(())
    }
    /// Sets (both ends given) or clears (neither given) the sub-range of a
    /// float, integer or time stamp argument.
    pub fn set_range(&mut self, min: Option<RangeValue>, max: Option<RangeValue>) -> Result<()> {
        let name = &self.name;
        let inverted = || CodingDbError::InvalidValue(format!("empty range for {name}"));
        match (&mut self.kind, min, max) {
            (FargKind::Float(r), None, None) => *r = None,
            (FargKind::Integer(r), None, None) => *r = None,
            (FargKind::TimeStamp(r), None, None) => *r = None,
            (FargKind::Float(r), Some(RangeValue::Float(min)), Some(RangeValue::Float(max))) => {
                if min.is_nan() || max.is_nan() || min >= max {
                    return Err(inverted());
                }
                *r = Some(Bounds { min, max });
            }
            (
                FargKind::Integer(r),
                Some(RangeValue::Integer(min)),
                Some(RangeValue::Integer(max)),
            ) => {
                if min >= max {
                    return Err(inverted());
                }
                *r = Some(Bounds { min, max });
            }
            (
                FargKind::TimeStamp(r),
                Some(RangeValue::TimeStamp(min)),
                Some(RangeValue::TimeStamp(max)),
            ) => {
                if !min.same_base(&max) {
                    return Err(CodingDbError::TypeMismatch(format!(
                        "range of {name} mixes time bases {} and {}",
                        min.tps(),
                        max.tps()
                    )));
                }
                if min >= max {
                    return Err(inverted());
                }
                *r = Some(Bounds { min, max });
            }
            (FargKind::Float(_) | FargKind::Integer(_) | FargKind::TimeStamp(_), Some(_), None)
            | (FargKind::Float(_) | FargKind::Integer(_) | FargKind::TimeStamp(_), None, Some(_)) => {
                return Err(CodingDbError::InvalidValue(format!(
                    "range of {name} needs both a minimum and a maximum"
                )));
            }
            (kind, _, _) => {
                return Err(CodingDbError::TypeMismatch(format!(
                    "range does not fit {} argument {name}",
                    kind.farg_type()
                )));
            }
        }
        Ok(())
    }
    pub fn set_approved_nominals(&mut self, approved: Option<BTreeSet<String>>) -> Result<()> {
        let FargKind::Nominal(set) = &mut self.kind else {
            return Err(CodingDbError::TypeMismatch(format!(
                "{} is not a nominal argument",
                self.name
            )));
        };
        if let Some(bad) = approved.iter().flatten().find(|v| !is_valid_nominal(v)) {
            return Err(CodingDbError::InvalidValue(format!("invalid nominal {bad:?}")));
        }
        *set = approved;
        Ok(())
    }
    pub fn set_approved_predicates(&mut self, approved: Option<BTreeSet<Id>>) -> Result<()> {
        let FargKind::Predicate(set) = &mut self.kind else {
            return Err(CodingDbError::TypeMismatch(format!(
                "{} is not a predicate argument",
                self.name
            )));
        };
        if approved.iter().flatten().any(|id| *id == INVALID_ID) {
            return Err(CodingDbError::InvalidId(INVALID_ID));
        }
        *set = approved;
        Ok(())
    }
    /// Unregistered copy with the same name and kind.
    pub(crate) fn detached_copy(&self) -> Self {
        Self {
            id: INVALID_ID,
            ve_id: INVALID_ID,
            ..self.clone()
        }
    }
    pub(crate) fn set_kind(&mut self, kind: FargKind) {
        self.kind = kind;
    }
    pub fn to_db_string(&self) -> String {
        let head = format!("{} {}", self.id, self.name);
        match &self.kind {
            FargKind::Untyped => format!("(UnTypedFormalArg {head})"),
            FargKind::Float(r) => {
                let (min, max) = r.map_or((f64::MIN, f64::MAX), |b| (b.min, b.max));
                format!(
                    "(FloatFormalArg {head} {} {} {})",
                    r.is_some(),
                    real_to_db(min),
                    real_to_db(max)
                )
            }
            FargKind::Integer(r) => {
                let (min, max) = r.map_or((i64::MIN, i64::MAX), |b| (b.min, b.max));
                format!("(IntFormalArg {head} {} {min} {max})", r.is_some())
            }
            FargKind::TimeStamp(r) => match r {
                Some(b) => format!(
                    "(TimeStampFormalArg {head} true {} {})",
                    b.min.to_db_string(),
                    b.max.to_db_string()
                ),
                None => format!("(TimeStampFormalArg {head} false null null)"),
            },
            FargKind::Nominal(set) => {
                let approved: Vec<&str> = set.iter().flatten().map(String::as_str).collect();
                format!(
                    "(NominalFormalArg {head} {} ({}))",
                    set.is_some(),
                    approved.join(", ")
                )
            }
            FargKind::Predicate(set) => {
                let approved: Vec<String> = set.iter().flatten().map(Id::to_string).collect();
                format!(
                    "(PredFormalArg {head} {} ({}))",
                    set.is_some(),
                    approved.join(", ")
                )
            }
            FargKind::QuoteString => format!("(QuoteStringFormalArg {head})"),
            FargKind::Text => format!("(TextStringFormalArg {head})"),
            FargKind::ColPred => format!("(ColPredFormalArg {head})"),
        }
    }
}

impl fmt::Display for FormalArgument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}
