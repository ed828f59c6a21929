//! Equipment slots and carried weight.
//!
//! The inventory is a collaborator of the status engine, not part of it:
//! nothing here ever blocks or originates a status application.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Inventory failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    /// A raw slot index from the wire does not name a slot.
    #[error("invalid slot {0}")]
    InvalidSlot(u8),

    /// The item cannot be worn.
    #[error("item {item} is not equippable")]
    NotEquippable {
        /// Item id.
        item: u32,
    },

    /// Something is already equipped there.
    #[error("slot {0} is occupied")]
    SlotOccupied(EquipSlot),

    /// Nothing is equipped there.
    #[error("slot {0} empty")]
    SlotEmpty(EquipSlot),

    /// Equipping would exceed the weight capacity.
    #[error("overweight: {weight} + {item_weight} exceeds capacity {capacity}")]
    Overweight {
        /// Weight currently carried.
        weight: u32,
        /// Weight of the item being equipped.
        item_weight: u32,
        /// Maximum weight.
        capacity: u32,
    },
}

/// Where an item can be worn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EquipSlot {
    /// Top headgear
    HeadTop = 1,
    /// Mid headgear
    HeadMid = 2,
    /// Low headgear
    HeadLow = 3,
    /// Body armor
    Body = 4,
    /// Right hand (weapon)
    RightHand = 5,
    /// Left hand (shield)
    LeftHand = 6,
    /// Garment
    Robe = 7,
    /// Footgear
    Shoes = 8,
    /// Left accessory
    AccessoryLeft = 9,
    /// Right accessory
    AccessoryRight = 10,
}

impl EquipSlot {
    /// Every slot in index order.
    pub const ALL: [Self; 10] = [
        Self::HeadTop,
        Self::HeadMid,
        Self::HeadLow,
        Self::Body,
        Self::RightHand,
        Self::LeftHand,
        Self::Robe,
        Self::Shoes,
        Self::AccessoryLeft,
        Self::AccessoryRight,
    ];

    /// Parses a raw slot index.
    ///
    /// # Errors
    ///
    /// [`InventoryError::InvalidSlot`] for indices outside `1..=10`.
    pub fn from_index(index: u8) -> Result<Self, InventoryError> {
        Self::ALL
            .iter()
            .copied()
            .find(|slot| slot.index() == index)
            .ok_or(InventoryError::InvalidSlot(index))
    }

    /// The raw slot index.
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Human-readable slot name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HeadTop => "Top Headgear",
            Self::HeadMid => "Mid Headgear",
            Self::HeadLow => "Low Headgear",
            Self::Body => "Body Armor",
            Self::RightHand => "Right Hand",
            Self::LeftHand => "Left Hand",
            Self::Robe => "Robe",
            Self::Shoes => "Shoes",
            Self::AccessoryLeft => "Left Accessory",
            Self::AccessoryRight => "Right Accessory",
        }
    }
}

impl fmt::Display for EquipSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A carried item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Item id.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Weight units.
    pub weight: u32,
    /// Whether the item can be worn.
    pub equippable: bool,
}

/// Equipped items and their total weight.
///
/// The carried weight is derived state. On deserialization it is recomputed
/// from the equipped items, so a stored `weight` that disagrees with them is
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredInventory")]
pub struct Inventory {
    items: BTreeMap<EquipSlot, Item>,
    weight: u32,
    capacity: u32,
}

/// Wire form of an [`Inventory`] before its weight is re-derived.
#[derive(Deserialize)]
struct StoredInventory {
    #[serde(default)]
    items: BTreeMap<EquipSlot, Item>,
    #[serde(default = "default_capacity")]
    capacity: u32,
}

const fn default_capacity() -> u32 {
    Inventory::DEFAULT_CAPACITY
}

impl TryFrom<StoredInventory> for Inventory {
    type Error = InventoryError;

    fn try_from(stored: StoredInventory) -> Result<Self, Self::Error> {
        let mut inventory = Self::new(stored.capacity);
        for (slot, item) in stored.items {
            inventory.equip(item, slot)?;
        }
        Ok(inventory)
    }
}

impl Inventory {
    /// Default weight capacity for new entities.
    pub const DEFAULT_CAPACITY: u32 = 2_000;

    /// An empty inventory that can carry up to `capacity` weight.
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            items: BTreeMap::new(),
            weight: 0,
            capacity,
        }
    }

    /// Equips `item` into `slot`.
    ///
    /// # Errors
    ///
    /// [`InventoryError::NotEquippable`], [`InventoryError::SlotOccupied`] or
    /// [`InventoryError::Overweight`].
    pub fn equip(&mut self, item: Item, slot: EquipSlot) -> Result<(), InventoryError> {
        if !item.equippable {
            return Err(InventoryError::NotEquippable { item: item.id });
        }
        if self.items.contains_key(&slot) {
            return Err(InventoryError::SlotOccupied(slot));
        }
        let total = self.weight.saturating_add(item.weight);
        if total > self.capacity {
            return Err(InventoryError::Overweight {
                weight: self.weight,
                item_weight: item.weight,
                capacity: self.capacity,
            });
        }

        self.weight = total;
        self.items.insert(slot, item);
        Ok(())
    }

    /// Takes the item out of `slot`.
    ///
    /// # Errors
    ///
    /// [`InventoryError::SlotEmpty`] if nothing is equipped there.
    pub fn unequip(&mut self, slot: EquipSlot) -> Result<Item, InventoryError> {
        let item = self
            .items
            .remove(&slot)
            .ok_or(InventoryError::SlotEmpty(slot))?;
        self.weight = self.weight.saturating_sub(item.weight);
        Ok(item)
    }

    /// The item in `slot`, if any.
    #[must_use]
    pub fn equipped(&self, slot: EquipSlot) -> Option<&Item> {
        self.items.get(&slot)
    }

    /// Weight currently carried.
    #[must_use]
    pub const fn weight(&self) -> u32 {
        self.weight
    }

    /// Maximum weight.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
