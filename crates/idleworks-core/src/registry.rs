//! Item type names and stacking placement.

use crate::fixed::Fixed64;
use crate::id::ItemTypeId;
use std::collections::HashMap;

/// Where an item of this type sits relative to the one below it when
/// stacked, and how it is rotated. Cosmetic only: flow logic never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StackPlacement {
    pub offset: [Fixed64; 3],
    pub rotation: [Fixed64; 3],
}

impl Default for StackPlacement {
    fn default() -> Self {
        Self {
            offset: [Fixed64::ZERO, Fixed64::from_num(0.1), Fixed64::ZERO],
            rotation: [Fixed64::ZERO; 3],
        }
    }
}

/// A registered item type.
#[derive(Debug, Clone)]
pub struct ItemType {
    pub name: String,
    pub placement: StackPlacement,
}

/// Collects item types in registration order. Each type's id is its
/// position in that order.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: Vec<ItemType>,
    by_name: HashMap<String, ItemTypeId>,
    duplicate: Option<String>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repeated name still gets a fresh id; [`RegistryBuilder::build`]
    /// reports the first repeat.
    pub fn register_item(&mut self, name: &str, placement: StackPlacement) -> ItemTypeId {
        let id = ItemTypeId(self.types.len() as u32);
        if self.by_name.contains_key(name) {
            self.duplicate.get_or_insert_with(|| name.to_owned());
        } else {
            self.by_name.insert(name.to_owned(), id);
        }
        self.types.push(ItemType {
            name: name.to_owned(),
            placement,
        });
        id
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.by_name.get(name).copied()
    }

    pub fn build(self) -> Result<Registry, RegistryError> {
        if let Some(name) = self.duplicate {
            return Err(RegistryError::DuplicateName(name));
        }
        Ok(Registry {
            types: self.types,
            by_name: self.by_name,
        })
    }
}

/// Frozen item type table. The engine only consults it for log output.
#[derive(Debug, Default)]
pub struct Registry {
    types: Vec<ItemType>,
    by_name: HashMap<String, ItemTypeId>,
}

impl Registry {
    pub fn get(&self, id: ItemTypeId) -> Option<&ItemType> {
        self.types.get(id.0 as usize)
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.by_name.get(name).copied()
    }

    /// Falls back to `"#<id>"` for unregistered types.
    pub fn item_name(&self, id: ItemTypeId) -> String {
        match self.get(id) {
            Some(ty) => ty.name.clone(),
            None => format!("#{}", id.0),
        }
    }

    pub fn contains(&self, id: ItemTypeId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("item type '{0}' is registered twice")]
    DuplicateName(String),
}
