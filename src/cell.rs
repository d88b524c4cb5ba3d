use std::fmt;

use crate::datavalue::Matrix;
use crate::error::{CodingDbError, Result};
use crate::registry::{Id, INVALID_ID};
use crate::timestamp::TimeStamp;

pub const DEFAULT_COLUMN_WIDTH: u32 = 200;

// ------------- DataColumn -------------
#[derive(Clone, PartialEq, Debug)]
pub struct DataColumn {
    pub(crate) id: Id,
    name: String,
    mve_id: Id,
    hidden: bool,
    width: u32,
    pub(crate) cells: Vec<Id>,
}

impl DataColumn {
    pub(crate) fn new(name: &str, mve_id: Id) -> Self {
        Self {
            id: INVALID_ID,
            name: name.to_owned(),
            mve_id,
            hidden: false,
            width: DEFAULT_COLUMN_WIDTH,
            cells: Vec::new(),
        }
    }
    pub fn id(&self) -> Id {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn mve_id(&self) -> Id {
        self.mve_id
    }
    pub fn hidden(&self) -> bool {
        self.hidden
    }
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn set_width(&mut self, width: u32) {
        self.width = width;
    }
    /// Cell ids in ordinal order.
    pub fn cells(&self) -> &[Id] {
        &self.cells
    }
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }
}

impl fmt::Display for DataColumn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "(DataColumn (id {}) (name {}) (mveID {}) (hidden {}) (numCells {}))",
            self.id,
            self.name,
            self.mve_id,
            self.hidden,
            self.cells.len()
        )
    }
}

// ------------- DataCell -------------
#[derive(Clone, PartialEq, Debug)]
pub struct DataCell {
    pub(crate) id: Id,
    column_id: Id,
    ord: usize,
    onset: TimeStamp,
    offset: TimeStamp,
    pub(crate) value: Matrix,
}

impl DataCell {
    pub(crate) fn new(column_id: Id, onset: TimeStamp, offset: TimeStamp, value: Matrix) -> Result<Self> {
        if !onset.same_base(&offset) {
            return Err(CodingDbError::TypeMismatch(format!(
                "onset at {} and offset at {} ticks per second",
                onset.tps(),
                offset.tps()
            )));
        }
        Ok(Self {
            id: INVALID_ID,
            column_id,
            ord: 0,
            onset,
            offset,
            value,
        })
    }
    pub fn id(&self) -> Id {
        self.id
    }
    pub fn column_id(&self) -> Id {
        self.column_id
    }
    pub fn mve_id(&self) -> Id {
        self.value.mve_id()
    }
    /// Position in the column, starting at 1.
    pub fn ord(&self) -> usize {
        self.ord
    }
    pub(crate) fn set_ord(&mut self, ord: usize) {
        self.ord = ord;
    }
    pub fn onset(&self) -> TimeStamp {
        self.onset
    }
    pub fn offset(&self) -> TimeStamp {
        self.offset
    }
    pub fn set_onset(&mut self, onset: TimeStamp) {
        self.onset = onset;
    }
    pub fn set_offset(&mut self, offset: TimeStamp) {
        self.offset = offset;
    }
    pub fn value(&self) -> &Matrix {
        &self.value
    }
}

impl fmt::Display for DataCell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "(DataCell (id {}) (colID {}) (ord {}) (onset {}) (offset {}) (val {}))",
            self.id, self.column_id, self.ord, self.onset, self.offset, self.value
        )
    }
}
