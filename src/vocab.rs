use std::fmt;

use crate::error::{CodingDbError, Result};
use crate::formal_arg::{FargType, FormalArgument};
use crate::grammar::{check_column_name, check_pred_name};
use crate::registry::{Id, INVALID_ID};

/// Names of the formal arguments every column predicate starts with.
pub const CP_ORD: &str = "<ord>";
pub const CP_ONSET: &str = "<onset>";
pub const CP_OFFSET: &str = "<offset>";
pub const CP_FIXED_ARGS: usize = 3;

// ------------- MatrixType -------------
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MatrixType {
    Float,
    Integer,
    Text,
    Nominal,
    Predicate,
    Matrix,
}

impl MatrixType {
    /// Type tag used in the open database format.
    pub fn tag(&self) -> &'static str {
        match self {
            MatrixType::Float => "<<FLOAT>>",
            MatrixType::Integer => "<<INTEGER>>",
            MatrixType::Text => "<<TEXT>>",
            MatrixType::Nominal => "<<NOMINAL>>",
            MatrixType::Predicate => "<<PREDICATE>>",
            MatrixType::Matrix => "<<MATRIX>>",
        }
    }
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "<<FLOAT>>" => Some(MatrixType::Float),
            "<<INTEGER>>" => Some(MatrixType::Integer),
            "<<TEXT>>" => Some(MatrixType::Text),
            "<<NOMINAL>>" => Some(MatrixType::Nominal),
            "<<PREDICATE>>" => Some(MatrixType::Predicate),
            "<<MATRIX>>" => Some(MatrixType::Matrix),
            _ => None,
        }
    }
    /// Type of the single argument of a non-matrix column.
    pub fn farg_type(&self) -> Option<FargType> {
        match self {
            MatrixType::Float => Some(FargType::Float),
            MatrixType::Integer => Some(FargType::Integer),
            MatrixType::Text => Some(FargType::Text),
            MatrixType::Nominal => Some(FargType::Nominal),
            MatrixType::Predicate => Some(FargType::Predicate),
            MatrixType::Matrix => None,
        }
    }
}

impl fmt::Display for MatrixType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            MatrixType::Float => "FLOAT",
            MatrixType::Integer => "INTEGER",
            MatrixType::Text => "TEXT",
            MatrixType::Nominal => "NOMINAL",
            MatrixType::Predicate => "PREDICATE",
            MatrixType::Matrix => "MATRIX",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VocabKind {
    Predicate,
    Matrix(MatrixType),
}

// ------------- VocabElement -------------
/// A named template: either a predicate definition or the definition of the
/// cells of one column. Built detached, then handed to the database.
#[derive(Clone, PartialEq, Debug)]
pub struct VocabElement {
    pub(crate) id: Id,
    name: String,
    kind: VocabKind,
    system: bool,
    var_len: bool,
    pub(crate) fargs: Vec<FormalArgument>,
    // <ord>, <onset>, <offset> followed by copies of fargs; matrix elements only
    pub(crate) cp_fargs: Vec<FormalArgument>,
}

impl VocabElement {
    pub fn predicate(name: &str) -> Result<Self> {
        check_pred_name(name)?;
        Ok(Self::bare(name, VocabKind::Predicate))
    }
    pub fn matrix(name: &str, matrix_type: MatrixType) -> Result<Self> {
        check_column_name(name)?;
        Ok(Self::bare(name, VocabKind::Matrix(matrix_type)))
    }
    /// Matrix element with the conventional single `<val>` argument for the
    /// typed column kinds, or a single untyped `<arg0>` for matrix columns.
    pub fn column_template(name: &str, matrix_type: MatrixType) -> Result<Self> {
        let mut ve = Self::matrix(name, matrix_type)?;
        let farg = match matrix_type.farg_type() {
            Some(ty) => FormalArgument::new("<val>", ty)?,
            None => FormalArgument::new("<arg0>", FargType::Untyped)?,
        };
        ve.append_formal_arg(farg)?;
        Ok(ve)
    }
    fn bare(name: &str, kind: VocabKind) -> Self {
        Self {
            id: INVALID_ID,
            name: name.to_owned(),
            kind,
            system: false,
            var_len: false,
            fargs: Vec::new(),
            cp_fargs: Vec::new(),
        }
    }
    pub fn id(&self) -> Id {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> VocabKind {
        self.kind
    }
    pub fn is_predicate(&self) -> bool {
        self.kind == VocabKind::Predicate
    }
    pub fn matrix_type(&self) -> Option<MatrixType> {
        match self.kind {
            VocabKind::Matrix(ty) => Some(ty),
            VocabKind::Predicate => None,
        }
    }
    pub fn system(&self) -> bool {
        self.system
    }
    pub fn set_system(&mut self, system: bool) {
        self.system = system;
    }
    pub fn var_len(&self) -> bool {
        self.var_len
    }
    pub fn set_var_len(&mut self, var_len: bool) -> Result<()> {
        if var_len && !self.is_extensible() {
            return Err(CodingDbError::TypeMismatch(format!(
                "{} columns have a fixed argument list",
                self.name
            )));
        }
        self.var_len = var_len;
        Ok(())
    }
    /// Predicates and matrix columns may change their argument lists; the
    /// typed column kinds hold exactly one argument.
    pub fn is_extensible(&self) -> bool {
        matches!(
            self.kind,
            VocabKind::Predicate | VocabKind::Matrix(MatrixType::Matrix)
        )
    }
    pub fn fargs(&self) -> &[FormalArgument] {
        &self.fargs
    }
    pub fn cp_fargs(&self) -> &[FormalArgument] {
        &self.cp_fargs
    }
    pub fn num_fargs(&self) -> usize {
        self.fargs.len()
    }
    pub fn farg(&self, index: usize) -> Option<&FormalArgument> {
        self.fargs.get(index)
    }
    pub fn farg_by_name(&self, name: &str) -> Option<&FormalArgument> {
        self.fargs.iter().find(|farg| farg.name() == name)
    }
    pub fn farg_index(&self, farg_id: Id) -> Option<usize> {
        self.fargs.iter().position(|farg| farg.id() == farg_id)
    }
    /// Appends to a detached element. Registered elements are changed
    /// through the database so existing values follow along.
    pub fn append_formal_arg(&mut self, farg: FormalArgument) -> Result<()> {
        if self.id != INVALID_ID {
            return Err(CodingDbError::IdAlreadyAssigned { id: self.id });
        }
        if farg.id() != INVALID_ID {
            return Err(CodingDbError::IdAlreadyAssigned { id: farg.id() });
        }
        self.check_new_farg(&farg)?;
        self.fargs.push(farg);
        Ok(())
    }
    pub(crate) fn check_new_farg(&self, farg: &FormalArgument) -> Result<()> {
        if self.farg_by_name(farg.name()).is_some() {
            return Err(CodingDbError::InvalidName(format!(
                "{} already has an argument {}",
                self.name,
                farg.name()
            )));
        }
        match self.kind {
            VocabKind::Matrix(MatrixType::Matrix) | VocabKind::Predicate => {
                if matches!(farg.farg_type(), FargType::Text | FargType::ColPred) {
                    return Err(CodingDbError::TypeMismatch(format!(
                        "{} arguments are not allowed in {}",
                        farg.farg_type(),
                        self.name
                    )));
                }
            }
            VocabKind::Matrix(ty) => {
                if !self.fargs.is_empty() {
                    return Err(CodingDbError::TypeMismatch(format!(
                        "{ty} column {} takes a single argument",
                        self.name
                    )));
                }
                if ty.farg_type() != Some(farg.farg_type()) {
                    return Err(CodingDbError::TypeMismatch(format!(
                        "{ty} column {} cannot hold a {} argument",
                        self.name,
                        farg.farg_type()
                    )));
                }
            }
        }
        Ok(())
    }
    /// Checks the element is complete enough to be registered.
    pub fn validate(&self) -> Result<()> {
        if self.fargs.is_empty() {
            return Err(CodingDbError::InvalidValue(format!(
                "{} has no formal arguments",
                self.name
            )));
        }
        Ok(())
    }
    /// Builds the column predicate argument list from the current formal
    /// arguments. Only used before registration.
    pub(crate) fn build_cp_fargs(&mut self) -> Result<()> {
        if self.is_predicate() {
            self.cp_fargs.clear();
            return Ok(());
        }
        let mut cp = vec![
            FormalArgument::new(CP_ORD, FargType::Integer)?,
            FormalArgument::new(CP_ONSET, FargType::TimeStamp)?,
            FormalArgument::new(CP_OFFSET, FargType::TimeStamp)?,
        ];
        cp.extend(self.fargs.iter().map(FormalArgument::detached_copy));
        self.cp_fargs = cp;
        Ok(())
    }
    pub fn to_db_string(&self) -> String {
        let fargs: Vec<String> = self.fargs.iter().map(|f| f.to_db_string()).collect();
        match self.kind {
            VocabKind::Predicate => format!(
                "((PredicateVocabElement: {} {}) (system: {}) (varLen: {}) (fArgList: ({})))",
                self.id,
                self.name,
                self.system,
                self.var_len,
                fargs.join(", ")
            ),
            VocabKind::Matrix(ty) => {
                let cp: Vec<String> = self.cp_fargs.iter().map(|f| f.to_db_string()).collect();
                format!(
                    "((MatrixVocabElement: {} {}) (system: {}) (type: {}) (varLen: {}) (fArgList: ({})) (cpfArgList: ({})))",
                    self.id,
                    self.name,
                    self.system,
                    ty,
                    self.var_len,
                    fargs.join(", "),
                    cp.join(", ")
                )
            }
        }
    }
}

impl fmt::Display for VocabElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names: Vec<&str> = self.fargs.iter().map(|farg| farg.name()).collect();
        write!(f, "{}({})", self.name, names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_columns_take_one_matching_argument() {
        let mut ve = VocabElement::matrix("score", MatrixType::Float).unwrap();
        assert!(ve
            .append_formal_arg(FormalArgument::new("<val>", FargType::Integer).unwrap())
            .is_err());
        ve.append_formal_arg(FormalArgument::new("<val>", FargType::Float).unwrap())
            .unwrap();
        assert!(ve
            .append_formal_arg(FormalArgument::new("<more>", FargType::Float).unwrap())
            .is_err());
        assert!(ve.set_var_len(true).is_err());
    }

    #[test]
    fn predicates_reject_duplicates_and_text() {
        let mut ve = VocabElement::predicate("hit").unwrap();
        ve.append_formal_arg(FormalArgument::new("<a>", FargType::Untyped).unwrap())
            .unwrap();
        assert!(ve
            .append_formal_arg(FormalArgument::new("<a>", FargType::Float).unwrap())
            .is_err());
        assert!(ve
            .append_formal_arg(FormalArgument::new("<t>", FargType::Text).unwrap())
            .is_err());
        assert_eq!(ve.to_string(), "hit(<a>)");
        assert!(VocabElement::predicate("two words").is_err());
    }

    #[test]
    fn column_predicate_args_lead_with_ord_onset_offset() {
        let mut ve = VocabElement::column_template("trial", MatrixType::Integer).unwrap();
        ve.build_cp_fargs().unwrap();
        let names: Vec<&str> = ve.cp_fargs().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec![CP_ORD, CP_ONSET, CP_OFFSET, "<val>"]);
    }
}
