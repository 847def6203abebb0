//! Arena of render resources owned by a [`RenderSession`].
//!
//! Every mesh, light and material the session creates is allocated here
//! and released through [`Resources::dispose`]. Handles are generational:
//! a handle to a disposed slot never resolves again, even after the slot
//! is reused.
//!
//! [`RenderSession`]: crate::session::RenderSession

/// What a resource slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    GlobeMesh,
    AmbientLight,
    DirectionalLight,
    MarkerMesh,
}

/// Handle into [`Resources`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    kind: Option<ResourceKind>,
}

/// Arena of render resources owned by one session.
#[derive(Debug, Default)]
pub struct Resources {
    slots: Vec<Slot>,
    free: Vec<u32>,
    disposed: u64,
}

impl Resources {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: ResourceKind) -> ResourceId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.kind = Some(kind);
            return ResourceId {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            kind: Some(kind),
        });
        ResourceId {
            index,
            generation: 0,
        }
    }

    /// Returns the kind behind `id`, or `None` if it has been disposed.
    #[must_use]
    pub fn get(&self, id: ResourceId) -> Option<ResourceKind> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.kind)
    }

    /// Releases `id`. Returns `false` if it was already released.
    pub fn dispose(&mut self, id: ResourceId) -> bool {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return false;
        };
        if slot.generation != id.generation || slot.kind.is_none() {
            return false;
        }
        slot.kind = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.disposed += 1;
        true
    }

    /// Releases every live resource and returns how many there were.
    pub fn dispose_all(&mut self) -> usize {
        let mut released = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.kind.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(u32::try_from(index).unwrap_or(u32::MAX));
                released += 1;
            }
        }
        self.disposed += released as u64;
        released
    }

    #[must_use]
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|slot| slot.kind.is_some()).count()
    }

    #[must_use]
    pub fn live_of(&self, kind: ResourceKind) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.kind == Some(kind))
            .count()
    }

    /// Total number of resources released over the arena's lifetime.
    #[must_use]
    pub const fn disposed(&self) -> u64 {
        self.disposed
    }
}
