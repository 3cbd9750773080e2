//! Arena of runtime environments.
//!
//! Each environment is a record of slots plus the index of its parent. A
//! closure keeps the [`EnvId`] it was declared in; the parent chain is a
//! strict ancestor list, so no cycles can form.
//!
//! Environments that no closure captured are handed back to a free list
//! when their block or call finishes. Captured environments outlive their
//! block; [`Environments::sweep`] reclaims the ones no closure reachable
//! from the roots still refers to.

use tracing::{debug, trace};

use crate::value::{Callable, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(usize);

/// Contents of one variable slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Declared but never assigned. Distinct from holding `nil`.
    Undefined,
    Value(Value),
}

/// Why a slot access failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    /// The slot exists but holds [`Slot::Undefined`]
    Uninitialized,
    /// No environment or slot at that address
    Missing,
}

#[derive(Debug, Default)]
struct Record {
    slots: Vec<Slot>,
    parent: Option<EnvId>,
    captured: bool,
    live: bool,
}

#[derive(Debug, Default)]
pub struct Environments {
    records: Vec<Record>,
    free: Vec<usize>,
}

impl Environments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an empty environment chained to `parent`.
    pub fn alloc(&mut self, parent: Option<EnvId>) -> EnvId {
        let record = Record {
            slots: Vec::new(),
            parent,
            captured: false,
            live: true,
        };

        let (index, reused) = match self.free.pop() {
            Some(index) => {
                self.records[index] = record;
                (index, true)
            }
            None => {
                self.records.push(record);
                (self.records.len() - 1, false)
            }
        };
        trace!(env = index, reused, "allocated environment");
        EnvId(index)
    }

    /// Returns `env` to the free list unless a closure captured it.
    pub fn release(&mut self, env: EnvId) {
        let Some(record) = self.records.get_mut(env.0) else {
            return;
        };
        if record.captured {
            return;
        }
        record.slots.clear();
        record.parent = None;
        record.live = false;
        self.free.push(env.0);
    }

    /// Frees every environment not reachable from `roots`, following parent
    /// links and the closures held in slots. Returns how many were freed.
    ///
    /// Only sound while no evaluation is in flight: values held on the Rust
    /// stack are not roots.
    pub fn sweep(&mut self, roots: &[EnvId]) -> usize {
        let mut marked = vec![false; self.records.len()];
        let mut pending: Vec<EnvId> = roots.to_vec();

        while let Some(env) = pending.pop() {
            let Some(record) = self.records.get(env.0) else {
                continue;
            };
            if marked[env.0] || !record.live {
                continue;
            }
            marked[env.0] = true;
            pending.extend(record.parent);

            let mut values: Vec<&Value> = record
                .slots
                .iter()
                .filter_map(|slot| match slot {
                    Slot::Value(value) => Some(value),
                    Slot::Undefined => None,
                })
                .collect();
            while let Some(value) = values.pop() {
                match value {
                    Value::Callable(Callable::Function(function)) => {
                        pending.push(function.closure);
                    }
                    Value::Array(items) => values.extend(items.iter()),
                    _ => {}
                }
            }
        }

        let mut freed = 0;
        for (index, record) in self.records.iter_mut().enumerate() {
            if record.live && !marked[index] {
                record.slots.clear();
                record.parent = None;
                record.captured = false;
                record.live = false;
                self.free.push(index);
                freed += 1;
            }
        }
        if freed > 0 {
            debug!(freed, live = self.live_count(), "swept environments");
        }
        freed
    }

    /// Number of environments currently allocated.
    pub fn live_count(&self) -> usize {
        self.records.iter().filter(|record| record.live).count()
    }

    /// Marks `env` and all of its ancestors as captured by a closure.
    pub fn capture(&mut self, env: EnvId) {
        let mut current = Some(env);
        while let Some(id) = current {
            let Some(record) = self.records.get_mut(id.0) else {
                return;
            };
            if record.captured {
                return;
            }
            record.captured = true;
            current = record.parent;
        }
    }

    /// Appends a slot to `env`.
    pub fn define(&mut self, env: EnvId, slot: Slot) {
        if let Some(record) = self.records.get_mut(env.0) {
            record.slots.push(slot);
        }
    }

    /// Number of slots in `env`.
    pub fn len(&self, env: EnvId) -> usize {
        self.records.get(env.0).map_or(0, |record| record.slots.len())
    }

    /// Grows `env` to at least `len` slots, filling with [`Slot::Undefined`].
    pub fn pad(&mut self, env: EnvId, len: usize) {
        if let Some(record) = self.records.get_mut(env.0)
            && record.slots.len() < len
        {
            record.slots.resize(len, Slot::Undefined);
        }
    }

    fn ancestor(&self, env: EnvId, distance: usize) -> Option<&Record> {
        let mut record = self.records.get(env.0)?;
        for _ in 0..distance {
            record = self.records.get(record.parent?.0)?;
        }
        Some(record)
    }

    fn ancestor_mut(&mut self, env: EnvId, distance: usize) -> Option<&mut Record> {
        let mut id = env;
        for _ in 0..distance {
            id = self.records.get(id.0)?.parent?;
        }
        self.records.get_mut(id.0)
    }

    pub fn get_at(&self, env: EnvId, distance: usize, slot: usize) -> Result<Value, LookupError> {
        match self
            .ancestor(env, distance)
            .and_then(|record| record.slots.get(slot))
        {
            Some(Slot::Value(value)) => Ok(value.clone()),
            Some(Slot::Undefined) => Err(LookupError::Uninitialized),
            None => Err(LookupError::Missing),
        }
    }

    /// Stores `value` in an existing slot. Assigning to an undefined slot
    /// initializes it.
    pub fn assign_at(
        &mut self,
        env: EnvId,
        distance: usize,
        slot: usize,
        value: Value,
    ) -> Result<(), LookupError> {
        let target = self
            .ancestor_mut(env, distance)
            .and_then(|record| record.slots.get_mut(slot))
            .ok_or(LookupError::Missing)?;
        *target = Slot::Value(value);
        Ok(())
    }
}
