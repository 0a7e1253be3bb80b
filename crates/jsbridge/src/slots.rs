//! Generation-tagged slot table
//!
//! Backs every integer handle the bridge hands out. A key packs the slot
//! index into the low 32 bits and the slot generation into the high 32 bits.
//! Generations start at 1, so a valid key is never 0, and a slot's
//! generation is bumped when it is freed: a stale key stops resolving
//! instead of aliasing whatever reuses the slot.

/// Key into a [`SlotTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    index: u32,
    generation: u32,
}

impl SlotKey {
    /// Pack into a positive integer
    pub fn to_raw(self) -> i64 {
        (((self.generation & 0x7fff_ffff) as i64) << 32) | self.index as i64
    }

    /// Unpack a raw integer; `None` for values no table can issue
    pub fn from_raw(raw: i64) -> Option<Self> {
        if raw <= 0 {
            return None;
        }
        let generation = (raw >> 32) as u32;
        if generation == 0 {
            return None;
        }
        Some(Self {
            index: raw as u32,
            generation,
        })
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Arena of values addressed by generation-tagged keys
pub struct SlotTable<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SlotTable<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store `value` and return its key
    pub fn insert(&mut self, value: T) -> SlotKey {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return SlotKey {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            value: Some(value),
        });
        SlotKey {
            index,
            generation: 1,
        }
    }

    pub fn get(&self, key: SlotKey) -> Option<&T> {
        self.slots
            .get(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Remove and return the value; the key and every copy of it go stale
    pub fn remove(&mut self, key: SlotKey) -> Option<T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let value = slot.value.take()?;
        // Wrap within the 31 bits that survive `to_raw`, never back to 0.
        slot.generation = match slot.generation.wrapping_add(1) & 0x7fff_ffff {
            0 => 1,
            next => next,
        };
        self.free.push(key.index);
        self.len -= 1;
        Some(value)
    }

    /// Remove every value, oldest slot first
    pub fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.len);
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(value) = slot.value.take() {
                slot.generation = match slot.generation.wrapping_add(1) & 0x7fff_ffff {
                    0 => 1,
                    next => next,
                };
                self.free.push(index as u32);
                values.push(value);
            }
        }
        self.len = 0;
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get() {
        let mut table = SlotTable::new();
        let a = table.insert("a");
        let b = table.insert("b");

        assert_eq!(table.get(a), Some(&"a"));
        assert_eq!(table.get(b), Some(&"b"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_raw_keys_are_positive_and_increasing() {
        let mut table = SlotTable::new();
        let first = table.insert(1).to_raw();
        let second = table.insert(2).to_raw();

        assert!(first > 0);
        assert!(second > first);
        assert_eq!(SlotKey::from_raw(first).and_then(|k| table.get(k)), Some(&1));
    }

    #[test]
    fn test_stale_key_after_reuse() {
        let mut table = SlotTable::new();
        let old = table.insert("old");
        assert_eq!(table.remove(old), Some("old"));

        let new = table.insert("new");
        assert_ne!(old, new);
        assert!(table.get(old).is_none());
        assert_eq!(table.get(new), Some(&"new"));
        assert!(table.remove(old).is_none());
    }

    #[test]
    fn test_invalid_raw_keys() {
        assert!(SlotKey::from_raw(0).is_none());
        assert!(SlotKey::from_raw(-1).is_none());
        // Generation 0 is never issued.
        assert!(SlotKey::from_raw(7).is_none());
    }

    #[test]
    fn test_drain_invalidates_keys() {
        let mut table = SlotTable::new();
        let a = table.insert(1);
        let b = table.insert(2);

        assert_eq!(table.drain(), vec![1, 2]);
        assert!(table.is_empty());
        assert!(table.get(a).is_none());
        assert!(table.get(b).is_none());
    }
}
