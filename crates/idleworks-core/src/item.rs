use crate::id::{ContainerId, ItemId, ItemTypeId};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A single transportable unit tagged with one item type.
///
/// Not `Clone`: an item is owned by exactly one container (or one in-flight
/// record) at a time and moves by value. Dropping it destroys it.
#[derive(Debug, PartialEq, Eq)]
pub struct Item {
    id: ItemId,
    item_type: ItemTypeId,
}

impl Item {
    pub fn new(id: ItemId, item_type: ItemTypeId) -> Self {
        Self { id, item_type }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn item_type(&self) -> ItemTypeId {
        self.item_type
    }
}

/// Hands out fresh item ids. Monotonic, so ids are unique for the lifetime
/// of the simulation.
#[derive(Debug, Default)]
pub struct ItemMint {
    next: u64,
}

impl ItemMint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, item_type: ItemTypeId) -> Item {
        let id = ItemId(self.next);
        self.next += 1;
        Item::new(id, item_type)
    }

    /// Number of items minted so far.
    pub fn minted(&self) -> u64 {
        self.next
    }
}

// ---------------------------------------------------------------------------
// Bounded container
// ---------------------------------------------------------------------------

/// How a container constrains the types it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockMode {
    /// Any mix of types. The type lock is never set.
    Mixed,
    /// The first item added locks the type; the lock is released when the
    /// container empties.
    FirstItem,
    /// Permanently locked to one type (input areas, source stockpiles).
    Fixed(ItemTypeId),
}

/// Why an add was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    CapacityExceeded,
    TypeMismatch,
    /// The container handle does not resolve.
    Missing,
}

/// An item handed back by a refused [`Container::try_add`], untouched.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a rejected item is destroyed when dropped"]
pub struct Rejected {
    pub item: Item,
    pub reason: RejectReason,
}

/// Ordered, capacity-limited holder of items, optionally type-locked.
///
/// Invariants: `len() <= capacity()`; while the type lock is set every
/// contained item has that type.
#[derive(Debug)]
pub struct Container {
    items: Vec<Item>,
    capacity: u32,
    mode: LockMode,
    type_lock: Option<ItemTypeId>,
}

impl Container {
    /// A container whose first item locks its type.
    pub fn new(capacity: u32) -> Self {
        Self::with_mode(capacity, LockMode::FirstItem)
    }

    /// A container that accepts any mix of types.
    pub fn mixed(capacity: u32) -> Self {
        Self::with_mode(capacity, LockMode::Mixed)
    }

    /// A container permanently locked to `item_type`.
    pub fn fixed(capacity: u32, item_type: ItemTypeId) -> Self {
        Self::with_mode(capacity, LockMode::Fixed(item_type))
    }

    pub fn with_mode(capacity: u32, mode: LockMode) -> Self {
        let type_lock = match mode {
            LockMode::Fixed(t) => Some(t),
            LockMode::Mixed | LockMode::FirstItem => None,
        };
        Self {
            items: Vec::new(),
            capacity,
            mode,
            type_lock,
        }
    }

    /// Check whether an item of `item_type` would be accepted right now.
    pub fn check_add(&self, item_type: ItemTypeId) -> Result<(), RejectReason> {
        if self.is_full() {
            return Err(RejectReason::CapacityExceeded);
        }
        match self.type_lock {
            Some(locked) if locked != item_type => Err(RejectReason::TypeMismatch),
            _ => Ok(()),
        }
    }

    pub fn can_accept(&self, item_type: ItemTypeId) -> bool {
        self.check_add(item_type).is_ok()
    }

    /// Append `item` at the end. On refusal the item is handed back.
    pub fn try_add(&mut self, item: Item) -> Result<(), Rejected> {
        if let Err(reason) = self.check_add(item.item_type) {
            return Err(Rejected { item, reason });
        }
        if self.mode == LockMode::FirstItem && self.type_lock.is_none() {
            self.type_lock = Some(item.item_type);
        }
        self.items.push(item);
        Ok(())
    }

    /// Pop the most recently added item.
    pub fn try_remove_last(&mut self) -> Option<Item> {
        let item = self.items.pop()?;
        self.release_if_empty();
        Some(item)
    }

    /// Remove the most recently added item of `item_type`, scanning from the
    /// end. Absence leaves the container untouched.
    pub fn try_remove_of_type(&mut self, item_type: ItemTypeId) -> Option<Item> {
        let index = self.items.iter().rposition(|i| i.item_type == item_type)?;
        let item = self.items.remove(index);
        self.release_if_empty();
        Some(item)
    }

    fn release_if_empty(&mut self) {
        if self.items.is_empty() && self.mode == LockMode::FirstItem {
            self.type_lock = None;
        }
    }

    pub fn len(&self) -> u32 {
        self.items.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn free_space(&self) -> u32 {
        self.capacity.saturating_sub(self.len())
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// The current type lock, if any. Always set for `Fixed` containers.
    pub fn type_lock(&self) -> Option<ItemTypeId> {
        self.type_lock
    }

    /// Type of the most recently added item.
    pub fn last_type(&self) -> Option<ItemTypeId> {
        self.items.last().map(|i| i.item_type)
    }

    pub fn contains_type(&self, item_type: ItemTypeId) -> bool {
        self.items.iter().any(|i| i.item_type == item_type)
    }

    pub fn count_of(&self, item_type: ItemTypeId) -> u32 {
        self.items.iter().filter(|i| i.item_type == item_type).count() as u32
    }

    /// Items oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }
}

// ---------------------------------------------------------------------------
// Transfers between containers
// ---------------------------------------------------------------------------

/// Which item a transfer moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    /// The most recently added item.
    Last,
    /// The most recently added item of the given type.
    OfType(ItemTypeId),
}

/// Outcome of [`transfer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// One item of this type moved.
    Moved(ItemTypeId),
    /// The origin had nothing matching the pick.
    NothingToMove,
    /// The destination would refuse the item. Neither container changed.
    Refused(RejectReason),
    /// One of the handles does not resolve, or both name the same container.
    Missing,
}

/// Move one item from `from` to `to`.
///
/// The destination is checked before anything is removed, so a refused
/// transfer leaves both containers exactly as they were.
pub fn transfer(
    containers: &mut SlotMap<ContainerId, Container>,
    from: ContainerId,
    to: ContainerId,
    pick: Pick,
) -> Transfer {
    if from == to {
        return Transfer::Missing;
    }
    let Some(origin) = containers.get(from) else {
        return Transfer::Missing;
    };
    let item_type = match pick {
        Pick::Last => origin.last_type(),
        Pick::OfType(t) => origin.contains_type(t).then_some(t),
    };
    let Some(item_type) = item_type else {
        return Transfer::NothingToMove;
    };
    let Some(dest) = containers.get(to) else {
        return Transfer::Missing;
    };
    if let Err(reason) = dest.check_add(item_type) {
        return Transfer::Refused(reason);
    }

    let item = match pick {
        Pick::Last => containers[from].try_remove_last(),
        Pick::OfType(t) => containers[from].try_remove_of_type(t),
    };
    let Some(item) = item else {
        return Transfer::NothingToMove;
    };
    match containers[to].try_add(item) {
        Ok(()) => Transfer::Moved(item_type),
        Err(rejected) => {
            // check_add passed above; put the item back where it came from.
            let reason = rejected.reason;
            let _ = containers[from].try_add(rejected.item);
            Transfer::Refused(reason)
        }
    }
}
