use core::hash::BuildHasherDefault;
use std::collections::HashMap;
use std::fmt;

use seahash::SeaHasher;
use tracing::debug;

use crate::cell::{DataCell, DataColumn};
use crate::datavalue::DataValue;
use crate::error::{CodingDbError, Result};
use crate::formal_arg::FormalArgument;
use crate::vocab::VocabElement;

// ------------- Id -------------
pub type Id = u64;

pub type IdHasher = BuildHasherDefault<SeaHasher>;

pub const INVALID_ID: Id = 0;

/// Issues ids in increasing order. Ids are never handed out twice, not even
/// after the entity holding one has been removed.
#[derive(Debug)]
pub struct IdGenerator {
    lower_bound: Id,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            lower_bound: INVALID_ID,
        }
    }
    pub fn generate(&mut self) -> Id {
        self.lower_bound += 1;
        self.lower_bound
    }
    pub fn current(&self) -> Id {
        self.lower_bound
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ------------- Element -------------
/// Entities the registry owns directly. Formal arguments live inside their
/// vocabulary element and data values inside their cell; both still get ids
/// and can be looked up, see [`ElementRef`].
#[derive(Clone, Debug)]
pub enum Element {
    Vocab(VocabElement),
    Column(DataColumn),
    Cell(DataCell),
}

impl Element {
    pub fn id(&self) -> Id {
        match self {
            Element::Vocab(ve) => ve.id(),
            Element::Column(col) => col.id(),
            Element::Cell(cell) => cell.id(),
        }
    }
    fn set_id(&mut self, id: Id) {
        match self {
            Element::Vocab(ve) => ve.id = id,
            Element::Column(col) => col.id = id,
            Element::Cell(cell) => cell.id = id,
        }
    }
    fn first_assigned_nested(&self) -> Option<Id> {
        match self {
            Element::Vocab(ve) => ve
                .fargs()
                .iter()
                .chain(ve.cp_fargs().iter())
                .map(|farg| farg.id())
                .find(|id| *id != INVALID_ID),
            Element::Column(_) => None,
            Element::Cell(cell) => {
                let mut found = None;
                for arg in cell.value().args() {
                    arg.walk(&mut |dv| {
                        if found.is_none() && dv.id() != INVALID_ID {
                            found = Some(dv.id());
                        }
                    });
                }
                found
            }
        }
    }
    fn assign_nested(&mut self, container: Id, slot: &mut dyn FnMut(&mut Id)) {
        match self {
            Element::Vocab(ve) => {
                for farg in ve.fargs.iter_mut().chain(ve.cp_fargs.iter_mut()) {
                    slot(&mut farg.id);
                    farg.ve_id = container;
                }
            }
            Element::Column(_) => (),
            Element::Cell(cell) => {
                for arg in cell.value.args.iter_mut() {
                    arg.walk_mut(&mut |dv| {
                        slot(&mut dv.id);
                        dv.cell_id = container;
                    });
                }
            }
        }
    }
    fn find_nested(&self, id: Id) -> Option<ElementRef<'_>> {
        match self {
            Element::Vocab(ve) => ve
                .fargs()
                .iter()
                .chain(ve.cp_fargs().iter())
                .find(|farg| farg.id() == id)
                .map(ElementRef::Farg),
            Element::Column(_) => None,
            Element::Cell(cell) => cell
                .value()
                .args()
                .iter()
                .find_map(|arg| arg.find(id))
                .map(ElementRef::Value),
        }
    }
    pub fn as_element_ref(&self) -> ElementRef<'_> {
        match self {
            Element::Vocab(ve) => ElementRef::Vocab(ve),
            Element::Column(col) => ElementRef::Column(col),
            Element::Cell(cell) => ElementRef::Cell(cell),
        }
    }
}

impl From<VocabElement> for Element {
    fn from(ve: VocabElement) -> Self {
        Element::Vocab(ve)
    }
}
impl From<DataColumn> for Element {
    fn from(col: DataColumn) -> Self {
        Element::Column(col)
    }
}
impl From<DataCell> for Element {
    fn from(cell: DataCell) -> Self {
        Element::Cell(cell)
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ElementRef<'a> {
    Vocab(&'a VocabElement),
    Farg(&'a FormalArgument),
    Column(&'a DataColumn),
    Cell(&'a DataCell),
    Value(&'a DataValue),
}

impl ElementRef<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            ElementRef::Vocab(_) => "vocab element",
            ElementRef::Farg(_) => "formal argument",
            ElementRef::Column(_) => "column",
            ElementRef::Cell(_) => "cell",
            ElementRef::Value(_) => "data value",
        }
    }
}

impl fmt::Display for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ElementRef::Vocab(ve) => write!(f, "{}", ve.to_db_string()),
            ElementRef::Farg(farg) => write!(f, "{}", farg.to_db_string()),
            ElementRef::Column(col) => write!(f, "{}", col),
            ElementRef::Cell(cell) => write!(f, "{}", cell),
            ElementRef::Value(dv) => write!(f, "{}", dv.to_db_string()),
        }
    }
}

// ------------- Registry -------------
/// Sole owner of every entity in a database. Entities refer to each other by
/// id only.
#[derive(Debug, Default)]
pub struct Registry {
    generator: IdGenerator,
    elements: HashMap<Id, Element, IdHasher>,
    // nested id -> id of the element that holds it
    nested: HashMap<Id, Id, IdHasher>,
    children: HashMap<Id, Vec<Id>, IdHasher>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }
    /// Registers an element and assigns fresh ids to it and to everything
    /// nested inside it. Fails if any of those already carries an id.
    pub fn add(&mut self, element: impl Into<Element>) -> Result<Id> {
        let mut element = element.into();
        if element.id() != INVALID_ID {
            return Err(CodingDbError::IdAlreadyAssigned { id: element.id() });
        }
        if let Some(id) = element.first_assigned_nested() {
            return Err(CodingDbError::IdAlreadyAssigned { id });
        }
        let id = self.generator.generate();
        element.set_id(id);
        self.elements.insert(id, element);
        self.reindex(id)?;
        debug!(id, "registered element");
        Ok(id)
    }
    /// Refreshes the nested-id index of a registered element after its
    /// contents changed. Nested entities without an id receive one.
    pub(crate) fn reindex(&mut self, container: Id) -> Result<()> {
        let Self {
            generator,
            elements,
            nested,
            children,
        } = self;
        let element = elements
            .get_mut(&container)
            .ok_or(CodingDbError::InvalidId(container))?;
        if let Some(previous) = children.remove(&container) {
            for id in previous {
                nested.remove(&id);
            }
        }
        let mut ids = Vec::new();
        element.assign_nested(container, &mut |slot: &mut Id| {
            if *slot == INVALID_ID {
                *slot = generator.generate();
            }
            ids.push(*slot);
        });
        for id in &ids {
            nested.insert(*id, container);
        }
        children.insert(container, ids);
        Ok(())
    }
    pub fn get(&self, id: Id) -> Result<ElementRef<'_>> {
        if id == INVALID_ID {
            return Err(CodingDbError::InvalidId(id));
        }
        if let Some(element) = self.elements.get(&id) {
            return Ok(element.as_element_ref());
        }
        let container = self.nested.get(&id).ok_or(CodingDbError::InvalidId(id))?;
        self.elements
            .get(container)
            .and_then(|element| element.find_nested(id))
            .ok_or_else(|| {
                CodingDbError::Invariant(format!("nested id {id} missing from element {container}"))
            })
    }
    pub(crate) fn element_mut(&mut self, id: Id) -> Result<&mut Element> {
        if id == INVALID_ID {
            return Err(CodingDbError::InvalidId(id));
        }
        match self.elements.get_mut(&id) {
            Some(element) => Ok(element),
            None => match self.nested.get(&id) {
                Some(container) => Err(CodingDbError::Nested {
                    id,
                    container: *container,
                }),
                None => Err(CodingDbError::InvalidId(id)),
            },
        }
    }
    /// Removes a directly owned element together with everything nested in
    /// it. Nested ids cannot be removed on their own.
    pub fn remove(&mut self, id: Id) -> Result<Element> {
        self.element_mut(id)?;
        let element = self
            .elements
            .remove(&id)
            .ok_or(CodingDbError::InvalidId(id))?;
        if let Some(previous) = self.children.remove(&id) {
            for nested in previous {
                self.nested.remove(&nested);
            }
        }
        debug!(id, "removed element");
        Ok(element)
    }
    pub fn contains(&self, id: Id) -> bool {
        id != INVALID_ID && (self.elements.contains_key(&id) || self.nested.contains_key(&id))
    }
    /// Number of directly owned elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
    /// Number of ids currently resolvable, nested ones included.
    pub fn live_ids(&self) -> usize {
        self.elements.len() + self.nested.len()
    }
    pub fn last_issued(&self) -> Id {
        self.generator.current()
    }
}
