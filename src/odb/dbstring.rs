//! Reads the canonical `to_db_string` form of a data value back, with the
//! same lexer the open database reader uses.

use crate::database::Database;
use crate::datavalue::{ColPred, DataValue, Predicate, Value};
use crate::error::{CodingDbError, Result};
use crate::formal_arg::{FargType, RangeValue};
use crate::odb::lexer::Lexer;
use crate::odb::token::{Token, TokenKind};
use crate::registry::{Id, INVALID_ID};
use crate::timestamp::TimeStamp;

/// Parses a data value printed by [`DataValue::to_db_string`]. Ids, the
/// binding and the payload are restored; the printed sub-range has to agree
/// with the one of the formal argument the value is bound to.
pub fn parse_data_value(db: &Database, text: &str) -> Result<DataValue> {
    let mut parser = DbStringParser {
        lexer: Lexer::new(text.as_bytes()),
        peeked: None,
        db,
    };
    let dv = parser.data_value()?;
    let token = parser.next()?;
    if token.kind != TokenKind::Eof {
        return Err(unexpected(&token, "end of input"));
    }
    Ok(dv)
}

fn unexpected(token: &Token, expected: &str) -> CodingDbError {
    CodingDbError::parse_at(
        format!("expected {expected}, found {}", token.kind.describe()),
        token.line,
        token.col,
    )
}

struct DbStringParser<'a> {
    lexer: Lexer<&'a [u8]>,
    peeked: Option<Token>,
    db: &'a Database,
}

impl DbStringParser<'_> {
    fn next(&mut self) -> Result<Token> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token()?,
        };
        if let TokenKind::Error(message) = &token.kind {
            return Err(CodingDbError::parse_at(message.clone(), token.line, token.col));
        }
        Ok(token)
    }
    fn peek_is(&mut self, kind: &TokenKind) -> Result<bool> {
        let token = self.next()?;
        let same = &token.kind == kind;
        self.peeked = Some(token);
        Ok(same)
    }
    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        let token = self.next()?;
        if token.kind == kind {
            Ok(())
        } else {
            Err(unexpected(&token, &kind.describe()))
        }
    }
    fn atom(&mut self) -> Result<String> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Atom(atom) => Ok(atom),
            _ => Err(unexpected(&token, "a name")),
        }
    }
    /// `(name value)`, returning the value token.
    fn field(&mut self, name: &str) -> Result<Token> {
        self.expect(TokenKind::LParen)?;
        let found = self.atom()?;
        if found != name {
            return Err(CodingDbError::InvalidValue(format!(
                "expected field {name}, found {found}"
            )));
        }
        let token = self.next()?;
        self.expect(TokenKind::RParen)?;
        Ok(token)
    }
    fn id_field(&mut self, name: &str) -> Result<Id> {
        let token = self.field(name)?;
        match token.kind {
            TokenKind::Int(i) => Id::try_from(i).map_err(|_| unexpected(&token, "an id")),
            _ => Err(unexpected(&token, "an id")),
        }
    }
    fn bool_field(&mut self, name: &str) -> Result<bool> {
        let token = self.field(name)?;
        match token.kind {
            TokenKind::Bool(b) => Ok(b),
            _ => Err(unexpected(&token, "TRUE or FALSE")),
        }
    }

    fn data_value(&mut self) -> Result<DataValue> {
        self.expect(TokenKind::LParen)?;
        let class = self.atom()?;
        let ty = match class.as_str() {
            "FloatDataValue" => FargType::Float,
            "IntDataValue" => FargType::Integer,
            "TimeStampDataValue" => FargType::TimeStamp,
            "NominalDataValue" => FargType::Nominal,
            "QuoteStringDataValue" => FargType::QuoteString,
            "TextStringDataValue" => FargType::Text,
            "PredDataValue" => FargType::Predicate,
            "ColPredDataValue" => FargType::ColPred,
            "UndefinedDataValue" => FargType::Undefined,
            _ => {
                return Err(CodingDbError::InvalidValue(format!(
                    "unknown data value class {class}"
                )));
            }
        };
        let id = self.id_field("id")?;
        let farg_id = self.id_field("itsFargID")?;
        let farg_type = self.field("itsFargType")?;
        let cell_id = self.id_field("itsCellID")?;
        self.expect(TokenKind::LParen)?;
        if self.atom()? != "itsValue" {
            return Err(CodingDbError::InvalidValue("expected field itsValue".into()));
        }
        let payload = self.payload(ty)?;
        self.expect(TokenKind::RParen)?;
        let sub_range = self.bool_field("subRange")?;
        let mut range = None;
        if !self.peek_is(&TokenKind::RParen)? {
            let min = self.range_value("minVal")?;
            let max = self.range_value("maxVal")?;
            range = Some((min, max));
        }
        self.expect(TokenKind::RParen)?;

        let mut dv = if farg_id == INVALID_ID {
            DataValue::unbound(self.db, ty)?
        } else {
            DataValue::bound_as(self.db, farg_id, ty)?
        };
        let printed_type = match &farg_type.kind {
            TokenKind::Atom(name) => name.parse::<FargType>()?,
            _ => return Err(unexpected(&farg_type, "a type name")),
        };
        if printed_type != dv.farg_type() {
            return Err(CodingDbError::TypeMismatch(format!(
                "value claims a {printed_type} argument, {farg_id} is {}",
                dv.farg_type()
            )));
        }
        if sub_range != dv.sub_range() {
            return Err(CodingDbError::InvalidValue(format!(
                "subRange {sub_range} disagrees with argument {farg_id}"
            )));
        }
        if let (Some(printed), Some(actual)) = (range, dv.range()) {
            if printed != actual {
                return Err(CodingDbError::InvalidValue(format!(
                    "range {} .. {} disagrees with argument {farg_id}",
                    printed.0, printed.1
                )));
            }
        }
        dv.set(payload)?;
        dv.restore_ids(id, cell_id);
        Ok(dv)
    }

    fn range_value(&mut self, name: &str) -> Result<RangeValue> {
        self.expect(TokenKind::LParen)?;
        if self.atom()? != name {
            return Err(CodingDbError::InvalidValue(format!("expected field {name}")));
        }
        let token = self.next()?;
        let value = match &token.kind {
            TokenKind::Float(v) => RangeValue::Float(*v),
            TokenKind::Int(v) => RangeValue::Integer(*v),
            TokenKind::LParen => {
                self.peeked = Some(Token {
                    kind: TokenKind::LParen,
                    line: token.line,
                    col: token.col,
                });
                RangeValue::TimeStamp(self.time_stamp()?)
            }
            TokenKind::Atom(a) => match special_float(a) {
                Some(v) => RangeValue::Float(v),
                None => return Err(unexpected(&token, "a bound")),
            },
            _ => return Err(unexpected(&token, "a bound")),
        };
        self.expect(TokenKind::RParen)?;
        Ok(value)
    }

    /// `(tps,hh:mm:ss:fff)`
    fn time_stamp(&mut self) -> Result<TimeStamp> {
        self.expect(TokenKind::LParen)?;
        let token = self.next()?;
        let TokenKind::Int(tps) = token.kind else {
            return Err(unexpected(&token, "ticks per second"));
        };
        let tps = u32::try_from(tps).map_err(|_| unexpected(&token, "ticks per second"))?;
        self.expect(TokenKind::Comma)?;
        let clock = self.atom()?;
        self.expect(TokenKind::RParen)?;
        TimeStamp::from_hmsf(tps, &clock)
    }

    fn payload(&mut self, ty: FargType) -> Result<Value> {
        if ty == FargType::TimeStamp {
            return Ok(Value::TimeStamp(self.time_stamp()?));
        }
        let token = self.next()?;
        let value = match (ty, &token.kind) {
            (FargType::Float, TokenKind::Float(v)) => Value::Float(*v),
            (FargType::Integer, TokenKind::Int(v)) => Value::Integer(*v),
            (FargType::Nominal, TokenKind::Symbol(s)) => Value::Nominal(Some(s.clone())),
            (FargType::QuoteString, TokenKind::String(s)) => Value::QuoteString(Some(s.clone())),
            (FargType::Text, TokenKind::String(s)) => Value::Text(Some(s.clone())),
            (FargType::Nominal | FargType::QuoteString | FargType::Text, TokenKind::Atom(a))
                if a == "<null>" =>
            {
                Value::default_for(ty, self.db.tps())?
            }
            (FargType::Undefined, TokenKind::Atom(name)) => Value::Undefined(name.clone()),
            (FargType::Predicate | FargType::ColPred, TokenKind::LParen) => {
                if self.peek_is(&TokenKind::RParen)? {
                    self.next()?;
                    Value::default_for(ty, self.db.tps())?
                } else {
                    self.compound(ty)?
                }
            }
            _ => return Err(unexpected(&token, &format!("a {ty} payload"))),
        };
        Ok(value)
    }

    /// `predicate ...)` or `colPred ...)`, after the `(`.
    fn compound(&mut self, ty: FargType) -> Result<Value> {
        let (class, id_field, name_field) = match ty {
            FargType::ColPred => ("colPred", "mveID", "mveName"),
            _ => ("predicate", "pveID", "predName"),
        };
        if self.atom()? != class {
            return Err(CodingDbError::InvalidValue(format!("expected {class}")));
        }
        let ve_id = self.id_field(id_field)?;
        let name = self.field(name_field)?;
        let var_len = self.bool_field("varLen")?;
        self.expect(TokenKind::LParen)?;
        if self.atom()? != "argList" {
            return Err(CodingDbError::InvalidValue("expected field argList".into()));
        }
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.peek_is(&TokenKind::RParen)? {
            self.next()?;
        } else {
            loop {
                args.push(self.data_value()?);
                let token = self.next()?;
                match token.kind {
                    TokenKind::Comma => (),
                    TokenKind::RParen => break,
                    _ => return Err(unexpected(&token, "',' or ')'")),
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::RParen)?;

        let value = match ty {
            FargType::ColPred => {
                let mut cp = ColPred::new(self.db, ve_id)?;
                check_shape(cp.name(), cp.var_len(), cp.args(), &name, var_len, &args)?;
                cp.args = args;
                Value::ColPred(Some(cp))
            }
            _ => {
                let mut p = Predicate::new(self.db, ve_id)?;
                check_shape(p.name(), p.var_len(), p.args(), &name, var_len, &args)?;
                p.args = args;
                Value::Predicate(Some(p))
            }
        };
        Ok(value)
    }
}

/// Range bounds may be infinite; payloads never are.
fn special_float(atom: &str) -> Option<f64> {
    match atom {
        "inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

/// The printed name, length flag and argument bindings must match the
/// vocabulary element.
fn check_shape(
    name: &str,
    var_len: bool,
    expected: &[DataValue],
    printed_name: &Token,
    printed_var_len: bool,
    args: &[DataValue],
) -> Result<()> {
    match &printed_name.kind {
        TokenKind::Symbol(s) if s == name => (),
        _ => return Err(unexpected(printed_name, &format!("the name of {name}"))),
    }
    if var_len != printed_var_len {
        return Err(CodingDbError::InvalidValue(format!(
            "varLen of {name} is {var_len}"
        )));
    }
    let bound: Vec<Id> = args.iter().map(DataValue::farg_id).collect();
    let wanted: Vec<Id> = expected.iter().map(DataValue::farg_id).collect();
    if bound != wanted {
        return Err(CodingDbError::TypeMismatch(format!(
            "arguments do not match the formal arguments of {name}"
        )));
    }
    Ok(())
}
