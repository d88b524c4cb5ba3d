//! The database: registry of all entities plus the name and dependency
//! indexes that keep vocabulary changes and cell values in step.

use std::collections::HashMap;

use bimap::BiMap;
use roaring::RoaringTreemap;
use tracing::{debug, info};

use crate::cell::{DataCell, DataColumn};
use crate::datavalue::{DataValue, Matrix, Value};
use crate::error::{CodingDbError, Result};
use crate::formal_arg::{FormalArgument, RangeValue};
use crate::registry::{Element, ElementRef, Id, IdHasher, Registry, INVALID_ID};
use crate::timestamp::{TimeStamp, DEFAULT_TPS};
use crate::vocab::{VocabElement, CP_FIXED_ARGS};

pub const DEFAULT_MAX_ERRORS: u32 = 1;
pub const DEFAULT_MAX_WARNINGS: u32 = 1;

#[derive(Debug)]
pub struct Database {
    name: String,
    tps: u32,
    debug_level: u32,
    max_errors: u32,
    max_warnings: u32,
    registry: Registry,
    vocab_names: BiMap<String, Id>,
    // columns in creation order
    columns: Vec<Id>,
    // vocab element id -> cells holding values built from it
    dependents: HashMap<Id, RoaringTreemap, IdHasher>,
}

impl Database {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            tps: DEFAULT_TPS,
            debug_level: 0,
            max_errors: DEFAULT_MAX_ERRORS,
            max_warnings: DEFAULT_MAX_WARNINGS,
            registry: Registry::new(),
            vocab_names: BiMap::new(),
            columns: Vec::new(),
            dependents: HashMap::default(),
        }
    }
    pub fn with_tps(name: &str, tps: u32) -> Result<Self> {
        if tps == 0 {
            return Err(CodingDbError::InvalidValue(
                "ticks per second must be positive".into(),
            ));
        }
        let mut db = Self::new(name);
        db.tps = tps;
        Ok(db)
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }
    pub fn tps(&self) -> u32 {
        self.tps
    }
    pub fn debug_level(&self) -> u32 {
        self.debug_level
    }
    pub fn set_debug_level(&mut self, level: u32) {
        self.debug_level = level;
    }
    pub fn max_errors(&self) -> u32 {
        self.max_errors
    }
    pub fn set_max_errors(&mut self, max: u32) {
        self.max_errors = max;
    }
    pub fn max_warnings(&self) -> u32 {
        self.max_warnings
    }
    pub fn set_max_warnings(&mut self, max: u32) {
        self.max_warnings = max;
    }
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
    pub fn get(&self, id: Id) -> Result<ElementRef<'_>> {
        self.registry.get(id)
    }

    // ------------- lookups -------------
    pub fn vocab_element(&self, id: Id) -> Result<&VocabElement> {
        match self.registry.get(id)? {
            ElementRef::Vocab(ve) => Ok(ve),
            other => Err(wrong_kind(id, "vocab element", &other)),
        }
    }
    pub fn vocab_element_by_name(&self, name: &str) -> Result<&VocabElement> {
        let id = self
            .vocab_id(name)
            .ok_or_else(|| CodingDbError::InvalidName(name.to_owned()))?;
        self.vocab_element(id)
    }
    pub fn vocab_id(&self, name: &str) -> Option<Id> {
        self.vocab_names.get_by_left(name).copied()
    }
    /// Predicate vocabulary elements in registration order.
    pub fn predicates(&self) -> Vec<&VocabElement> {
        let mut ids: Vec<Id> = self.vocab_names.right_values().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| self.vocab_element(id).ok())
            .filter(|ve| ve.is_predicate())
            .collect()
    }
    pub fn formal_arg(&self, id: Id) -> Result<&FormalArgument> {
        match self.registry.get(id)? {
            ElementRef::Farg(farg) => Ok(farg),
            other => Err(wrong_kind(id, "formal argument", &other)),
        }
    }
    pub fn column(&self, id: Id) -> Result<&DataColumn> {
        match self.registry.get(id)? {
            ElementRef::Column(col) => Ok(col),
            other => Err(wrong_kind(id, "column", &other)),
        }
    }
    pub fn column_by_name(&self, name: &str) -> Result<&DataColumn> {
        self.columns()
            .into_iter()
            .find(|col| col.name() == name)
            .ok_or_else(|| CodingDbError::InvalidName(name.to_owned()))
    }
    /// Columns in creation order.
    pub fn columns(&self) -> Vec<&DataColumn> {
        self.columns
            .iter()
            .filter_map(|id| self.column(*id).ok())
            .collect()
    }
    pub fn cell(&self, id: Id) -> Result<&DataCell> {
        match self.registry.get(id)? {
            ElementRef::Cell(cell) => Ok(cell),
            other => Err(wrong_kind(id, "cell", &other)),
        }
    }
    pub fn cells(&self, column_id: Id) -> Result<Vec<&DataCell>> {
        self.column(column_id)?
            .cells()
            .iter()
            .map(|id| self.cell(*id))
            .collect()
    }
    pub fn data_value(&self, id: Id) -> Result<&DataValue> {
        match self.registry.get(id)? {
            ElementRef::Value(dv) => Ok(dv),
            other => Err(wrong_kind(id, "data value", &other)),
        }
    }

    fn vocab_mut(&mut self, id: Id) -> Result<&mut VocabElement> {
        match self.registry.element_mut(id)? {
            Element::Vocab(ve) => Ok(ve),
            other => Err(wrong_kind(id, "vocab element", &other.as_element_ref())),
        }
    }
    fn column_mut(&mut self, id: Id) -> Result<&mut DataColumn> {
        match self.registry.element_mut(id)? {
            Element::Column(col) => Ok(col),
            other => Err(wrong_kind(id, "column", &other.as_element_ref())),
        }
    }
    fn cell_mut(&mut self, id: Id) -> Result<&mut DataCell> {
        match self.registry.element_mut(id)? {
            Element::Cell(cell) => Ok(cell),
            other => Err(wrong_kind(id, "cell", &other.as_element_ref())),
        }
    }

    // ------------- vocabulary -------------
    /// Registers a detached vocabulary element. Names are unique across
    /// predicates and columns.
    pub fn add_vocab_element(&mut self, mut ve: VocabElement) -> Result<Id> {
        ve.validate()?;
        if self.vocab_names.contains_left(ve.name()) {
            return Err(CodingDbError::InvalidName(format!(
                "{} is already defined",
                ve.name()
            )));
        }
        if ve.id() == INVALID_ID {
            ve.build_cp_fargs()?;
        }
        let name = ve.name().to_owned();
        let id = self.registry.add(ve)?;
        info!(id, name = %name, "added vocab element");
        self.vocab_names.insert(name, id);
        Ok(id)
    }
    /// Appends a formal argument to a registered predicate or matrix
    /// element. Every cell holding values of the element gets a default
    /// value for the new argument.
    pub fn append_formal_arg(&mut self, ve_id: Id, farg: FormalArgument) -> Result<Id> {
        if farg.id() != INVALID_ID {
            return Err(CodingDbError::IdAlreadyAssigned { id: farg.id() });
        }
        {
            let ve = self.vocab_mut(ve_id)?;
            if !ve.is_extensible() {
                return Err(CodingDbError::TypeMismatch(format!(
                    "the argument list of {} is fixed",
                    ve.name()
                )));
            }
            ve.check_new_farg(&farg)?;
            let cp_copy = farg.detached_copy();
            ve.fargs.push(farg);
            if !ve.is_predicate() {
                ve.cp_fargs.push(cp_copy);
            }
        }
        self.registry.reindex(ve_id)?;
        let ve = self.vocab_element(ve_id)?;
        let (new_farg, cp_farg) = match ve.fargs().last() {
            Some(farg) => (farg.clone(), ve.cp_fargs().last().cloned()),
            None => {
                return Err(CodingDbError::Invariant(format!(
                    "{} lost its appended argument",
                    ve.name()
                )));
            }
        };
        let tps = self.tps;
        for cell_id in self.dependents_of(ve_id) {
            let cell = self.cell_mut(cell_id)?;
            if cell.value.mve_id() == ve_id {
                cell.value.args.push(DataValue::for_farg(&new_farg, tps));
            }
            for arg in cell.value.args.iter_mut() {
                arg.walk_mut(&mut |dv| match dv.value_mut() {
                    Value::Predicate(Some(p)) if p.pve_id() == ve_id => {
                        p.push_arg(DataValue::for_farg(&new_farg, tps));
                    }
                    Value::ColPred(Some(cp)) if cp.mve_id() == ve_id => {
                        if let Some(cp_farg) = &cp_farg {
                            cp.push_arg(DataValue::for_farg(cp_farg, tps));
                        }
                    }
                    _ => (),
                });
            }
            self.registry.reindex(cell_id)?;
        }
        debug!(ve_id, farg_id = new_farg.id(), "appended formal argument");
        Ok(new_farg.id())
    }
    /// Replaces a registered formal argument (same id and type) and brings
    /// every value bound to it up to date.
    pub fn replace_formal_arg(&mut self, farg: FormalArgument) -> Result<()> {
        let farg_id = farg.id();
        let existing = self.formal_arg(farg_id)?.clone();
        if existing.farg_type() != farg.farg_type() {
            return Err(CodingDbError::TypeMismatch(format!(
                "{} cannot change type from {} to {}",
                existing.name(),
                existing.farg_type(),
                farg.farg_type()
            )));
        }
        let ve_id = existing.ve_id();
        let mut updated = farg;
        updated.ve_id = ve_id;
        let cp_updated = {
            let ve = self.vocab_mut(ve_id)?;
            let index = ve.farg_index(farg_id).ok_or_else(|| {
                CodingDbError::TypeMismatch(format!(
                    "{} belongs to the column predicate of {}",
                    existing.name(),
                    ve.name()
                ))
            })?;
            if updated.name() != existing.name() && ve.farg_by_name(updated.name()).is_some() {
                return Err(CodingDbError::InvalidName(format!(
                    "{} already has an argument {}",
                    ve.name(),
                    updated.name()
                )));
            }
            ve.fargs[index] = updated.clone();
            match ve.cp_fargs.get_mut(index + CP_FIXED_ARGS) {
                Some(cp) => {
                    cp.set_name(updated.name())?;
                    cp.set_kind(updated.kind().clone());
                    cp.set_hidden(updated.hidden());
                    Some(cp.clone())
                }
                None => None,
            }
        };
        for cell_id in self.dependents_of(ve_id) {
            let cell = self.cell_mut(cell_id)?;
            for arg in cell.value.args.iter_mut() {
                arg.update_for_farg_change(&updated);
                if let Some(cp) = &cp_updated {
                    arg.update_for_farg_change(cp);
                }
            }
        }
        debug!(ve_id, farg_id, "replaced formal argument");
        Ok(())
    }
    pub fn set_formal_arg_range(
        &mut self,
        farg_id: Id,
        min: Option<RangeValue>,
        max: Option<RangeValue>,
    ) -> Result<()> {
        let mut farg = self.formal_arg(farg_id)?.clone();
        farg.set_range(min, max)?;
        self.replace_formal_arg(farg)
    }
    pub fn set_var_len(&mut self, ve_id: Id, var_len: bool) -> Result<()> {
        self.vocab_mut(ve_id)?.set_var_len(var_len)
    }

    // ------------- columns and cells -------------
    /// Registers the matrix vocabulary element of a new column and the
    /// column itself, which takes the element's name.
    pub fn add_column(&mut self, mve: VocabElement) -> Result<Id> {
        if mve.is_predicate() {
            return Err(CodingDbError::TypeMismatch(format!(
                "{} is a predicate, not a column definition",
                mve.name()
            )));
        }
        let name = mve.name().to_owned();
        let mve_id = self.add_vocab_element(mve)?;
        let id = self.registry.add(DataColumn::new(&name, mve_id))?;
        self.columns.push(id);
        info!(id, name = %name, "added column");
        Ok(id)
    }
    pub fn set_column_hidden(&mut self, column_id: Id, hidden: bool) -> Result<()> {
        self.column_mut(column_id)?.set_hidden(hidden);
        Ok(())
    }
    pub fn set_column_width(&mut self, column_id: Id, width: u32) -> Result<()> {
        self.column_mut(column_id)?.set_width(width);
        Ok(())
    }
    /// Default-valued matrix for the cells of a column.
    pub fn new_matrix(&self, column_id: Id) -> Result<Matrix> {
        Matrix::new(self, self.column(column_id)?.mve_id())
    }
    /// Appends a cell at the end of a column.
    pub fn append_cell(
        &mut self,
        column_id: Id,
        onset: TimeStamp,
        offset: TimeStamp,
        value: Matrix,
    ) -> Result<Id> {
        let column = self.column(column_id)?;
        let ord = column.num_cells() + 1;
        if value.mve_id() != column.mve_id() {
            return Err(CodingDbError::TypeMismatch(format!(
                "matrix of element {} does not fit column {}",
                value.mve_id(),
                column.name()
            )));
        }
        let ve = self.vocab_element(column.mve_id())?;
        let bound_to: Vec<Id> = value.args().iter().map(DataValue::farg_id).collect();
        let expected: Vec<Id> = ve.fargs().iter().map(FormalArgument::id).collect();
        if bound_to != expected {
            return Err(CodingDbError::TypeMismatch(format!(
                "matrix arguments do not match the formal arguments of {}",
                ve.name()
            )));
        }
        // the matrix may predate a change to the formal arguments
        let mut value = value;
        for (arg, farg) in value.args.iter_mut().zip(ve.fargs()) {
            arg.update_for_farg_change(farg);
        }
        let mut cell = DataCell::new(column_id, onset, offset, value)?;
        cell.set_ord(ord);
        let cell_id = self.registry.add(cell)?;
        self.column_mut(column_id)?.cells.push(cell_id);
        self.index_cell(cell_id)?;
        debug!(cell_id, column_id, ord, "appended cell");
        Ok(cell_id)
    }
    /// Replaces one argument of a cell's matrix. The value must be bound to
    /// the formal argument of that slot.
    pub fn set_cell_arg(&mut self, cell_id: Id, index: usize, value: DataValue) -> Result<()> {
        let farg_id = self
            .cell(cell_id)?
            .value()
            .arg(index)
            .map(DataValue::farg_id)
            .ok_or_else(|| {
                CodingDbError::InvalidValue(format!("cell {cell_id} has no argument {index}"))
            })?;
        let farg = self.formal_arg(farg_id)?.clone();
        let mut value = value;
        value.update_for_farg_change(&farg);
        self.cell_mut(cell_id)?.value.set_arg(index, value)?;
        self.registry.reindex(cell_id)?;
        self.unindex_cell(cell_id);
        self.index_cell(cell_id)
    }
    pub fn set_cell_times(&mut self, cell_id: Id, onset: TimeStamp, offset: TimeStamp) -> Result<()> {
        if !onset.same_base(&offset) {
            return Err(CodingDbError::TypeMismatch(
                "onset and offset use different time bases".into(),
            ));
        }
        let cell = self.cell_mut(cell_id)?;
        cell.set_onset(onset);
        cell.set_offset(offset);
        Ok(())
    }
    pub fn remove_cell(&mut self, cell_id: Id) -> Result<()> {
        let column_id = self.cell(cell_id)?.column_id();
        self.registry.remove(cell_id)?;
        self.unindex_cell(cell_id);
        let remaining = {
            let column = self.column_mut(column_id)?;
            column.cells.retain(|id| *id != cell_id);
            column.cells.clone()
        };
        for (i, id) in remaining.into_iter().enumerate() {
            self.cell_mut(id)?.set_ord(i + 1);
        }
        debug!(cell_id, column_id, "removed cell");
        Ok(())
    }
    /// Removes a column with all its cells and its matrix element.
    pub fn remove_column(&mut self, column_id: Id) -> Result<()> {
        let (cells, mve_id) = {
            let column = self.column(column_id)?;
            (column.cells().to_vec(), column.mve_id())
        };
        for cell_id in cells {
            self.registry.remove(cell_id)?;
            self.unindex_cell(cell_id);
        }
        self.registry.remove(column_id)?;
        self.columns.retain(|id| *id != column_id);
        self.drop_vocab_element(mve_id)?;
        info!(column_id, "removed column");
        Ok(())
    }
    /// Removes a predicate that no cell uses. Column elements go with
    /// their column.
    pub fn remove_vocab_element(&mut self, ve_id: Id) -> Result<()> {
        let ve = self.vocab_element(ve_id)?;
        if !ve.is_predicate() {
            return Err(CodingDbError::TypeMismatch(format!(
                "{} defines a column; remove the column instead",
                ve.name()
            )));
        }
        if !self.dependents_of(ve_id).is_empty() {
            return Err(CodingDbError::InvalidValue(format!(
                "{} is still in use",
                ve.name()
            )));
        }
        self.drop_vocab_element(ve_id)
    }
    fn drop_vocab_element(&mut self, ve_id: Id) -> Result<()> {
        self.registry.remove(ve_id)?;
        self.vocab_names.remove_by_right(&ve_id);
        self.dependents.remove(&ve_id);
        Ok(())
    }
    /// Removes whatever entity the id names.
    pub fn remove(&mut self, id: Id) -> Result<()> {
        match self.registry.get(id)? {
            ElementRef::Vocab(_) => self.remove_vocab_element(id),
            ElementRef::Column(_) => self.remove_column(id),
            ElementRef::Cell(_) => self.remove_cell(id),
            ElementRef::Farg(farg) => Err(CodingDbError::Nested {
                id,
                container: farg.ve_id(),
            }),
            ElementRef::Value(dv) => Err(CodingDbError::Nested {
                id,
                container: dv.cell_id(),
            }),
        }
    }

    // ------------- dependency index -------------
    fn dependents_of(&self, ve_id: Id) -> Vec<Id> {
        self.dependents
            .get(&ve_id)
            .map(|cells| cells.iter().collect())
            .unwrap_or_default()
    }
    fn index_cell(&mut self, cell_id: Id) -> Result<()> {
        let mut ve_ids = Vec::new();
        {
            let cell = self.cell(cell_id)?;
            ve_ids.push(cell.mve_id());
            for arg in cell.value().args() {
                arg.walk(&mut |dv| match dv.value() {
                    Value::Predicate(Some(p)) => ve_ids.push(p.pve_id()),
                    Value::ColPred(Some(cp)) => ve_ids.push(cp.mve_id()),
                    _ => (),
                });
            }
        }
        for ve_id in ve_ids {
            self.dependents.entry(ve_id).or_default().insert(cell_id);
        }
        Ok(())
    }
    fn unindex_cell(&mut self, cell_id: Id) {
        for cells in self.dependents.values_mut() {
            cells.remove(cell_id);
        }
    }
}

fn wrong_kind(id: Id, wanted: &str, found: &ElementRef<'_>) -> CodingDbError {
    CodingDbError::TypeMismatch(format!("{id} is a {}, not a {wanted}", found.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formal_arg::FargType;
    use crate::vocab::MatrixType;

    #[test]
    fn names_are_unique_across_predicates_and_columns() {
        let mut db = Database::new("names");
        db.add_column(VocabElement::column_template("trial", MatrixType::Float).unwrap())
            .unwrap();
        let mut pve = VocabElement::predicate("trial").unwrap();
        pve.append_formal_arg(FormalArgument::new("<a>", FargType::Untyped).unwrap())
            .unwrap();
        assert!(db.add_vocab_element(pve).is_err());
    }

    #[test]
    fn removing_a_cell_renumbers_the_rest() {
        let mut db = Database::new("cells");
        let col = db
            .add_column(VocabElement::column_template("c", MatrixType::Integer).unwrap())
            .unwrap();
        let t = TimeStamp::zero(60);
        let mut ids = Vec::new();
        for _ in 0..3 {
            let m = db.new_matrix(col).unwrap();
            ids.push(db.append_cell(col, t, t, m).unwrap());
        }
        db.remove(ids[0]).unwrap();
        assert_eq!(db.cell(ids[1]).unwrap().ord(), 1);
        assert_eq!(db.cell(ids[2]).unwrap().ord(), 2);
        assert!(db.cell(ids[0]).is_err());
        db.remove_column(col).unwrap();
        assert!(db.vocab_id("c").is_none());
        assert!(db.registry().is_empty());
    }

    #[test]
    fn lookups_check_the_kind() {
        let mut db = Database::new("kinds");
        let col = db
            .add_column(VocabElement::column_template("c", MatrixType::Text).unwrap())
            .unwrap();
        assert!(db.vocab_element(col).is_err());
        let mve = db.column(col).unwrap().mve_id();
        assert!(db.column(mve).is_err());
        assert!(db.formal_arg(INVALID_ID).is_err());
    }
}
