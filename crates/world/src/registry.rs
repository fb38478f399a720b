//! Dimension type and dimension registries.
//!
//! Types are append-only for the lifetime of the process. Dimensions bind a
//! signed id to a registered type; non-negative ids are tracked in a used-id
//! set that feeds the free-id search.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use worldhost_core::{DimensionId, DimensionType, DimensionTypeId, DimensionTypeKey};

use crate::RegistryError;

/// Append-only table of dimension types keyed by type id.
#[derive(Debug, Default, Clone)]
pub struct DimensionTypeRegistry {
    types: BTreeMap<DimensionTypeId, DimensionType>,
}

impl DimensionTypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type under the id after the highest one in use.
    pub fn register(
        &mut self,
        dimension_type: DimensionType,
    ) -> Result<DimensionTypeId, RegistryError> {
        let next = match self.types.keys().next_back() {
            None => 0,
            Some(highest) => usize::from(highest.get()) + 1,
        };
        let id = u8::try_from(next)
            .ok()
            .and_then(DimensionTypeId::new)
            .ok_or(RegistryError::CapacityExceeded {
                capacity: DimensionTypeId::CAPACITY,
            })?;
        self.types.insert(id, dimension_type);
        Ok(id)
    }

    /// Register a type under an explicit id. An occupied id keeps its existing type.
    pub fn register_with_id(
        &mut self,
        id: DimensionTypeId,
        dimension_type: DimensionType,
    ) -> Result<(), RegistryError> {
        if self.types.contains_key(&id) {
            return Err(RegistryError::TypeAlreadyRegistered(id));
        }
        self.types.insert(id, dimension_type);
        Ok(())
    }

    /// Look up a type by id.
    pub fn get(&self, id: DimensionTypeId) -> Option<&DimensionType> {
        self.types.get(&id)
    }

    /// Whether an identical type is registered.
    pub fn contains(&self, dimension_type: &DimensionType) -> bool {
        self.types.values().any(|t| t == dimension_type)
    }

    /// Find a registered type by its key.
    pub fn by_key(&self, key: &DimensionTypeKey) -> Option<(DimensionTypeId, &DimensionType)> {
        self.types
            .iter()
            .find(|(_, t)| t.key() == key)
            .map(|(id, t)| (*id, t))
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate registrations in id order.
    pub fn iter(&self) -> impl Iterator<Item = (DimensionTypeId, &DimensionType)> + '_ {
        self.types.iter().map(|(id, t)| (*id, t))
    }
}

/// Position of an id in the canonical world order: 0, -1, 1, then ascending.
pub fn canonical_rank(id: DimensionId) -> (u8, i32) {
    match id {
        DimensionId::PRIMARY => (0, 0),
        DimensionId::NETHER => (1, 0),
        DimensionId::END => (2, 0),
        other => (3, other.get()),
    }
}

/// Sort dimension ids into canonical order.
pub fn sort_canonical(ids: &mut [DimensionId]) {
    ids.sort_by_key(|id| canonical_rank(*id));
}

/// Registry of dimension slots and the free-id cursor.
#[derive(Debug, Default, Clone)]
pub struct DimensionRegistry {
    types: DimensionTypeRegistry,
    dimensions: BTreeMap<DimensionId, DimensionType>,
    used_ids: BTreeSet<i32>,
    cursor: i32,
}

impl DimensionRegistry {
    /// Create an empty registry with no types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered dimension types.
    pub fn types(&self) -> &DimensionTypeRegistry {
        &self.types
    }

    /// Mutable access to the dimension type table.
    pub fn types_mut(&mut self) -> &mut DimensionTypeRegistry {
        &mut self.types
    }

    /// Bind `id` to a registered type.
    pub fn register_dimension(
        &mut self,
        id: DimensionId,
        dimension_type: DimensionType,
    ) -> Result<(), RegistryError> {
        if !self.types.contains(&dimension_type) {
            return Err(RegistryError::TypeNotRegistered(dimension_type.key().clone()));
        }
        if self.dimensions.contains_key(&id) {
            return Err(RegistryError::DimensionAlreadyRegistered(id));
        }
        debug!(dimension = %id, dimension_type = %dimension_type.key(), "Registered dimension");
        self.dimensions.insert(id, dimension_type);
        if id.get() >= 0 {
            self.used_ids.insert(id.get());
        }
        Ok(())
    }

    /// Remove a dimension registration.
    ///
    /// # Panics
    ///
    /// Panics if `id` was never registered; reaching this with an unknown id is
    /// a caller bug.
    pub fn unregister_dimension(&mut self, id: DimensionId) {
        if self.dimensions.remove(&id).is_none() {
            panic!("failed to unregister dimension {id}: it was never registered");
        }
        self.used_ids.remove(&id.get());
        debug!(dimension = %id, "Unregistered dimension");
    }

    /// Find the next free non-negative id, starting at the last id handed out.
    ///
    /// `is_live` reports ids bound to a live world even if the used set says
    /// otherwise. The cursor never moves backwards, so ids freed below it are
    /// not found again until [`DimensionRegistry::reset`].
    pub fn next_free_dimension_id(
        &mut self,
        is_live: impl Fn(DimensionId) -> bool,
    ) -> DimensionId {
        let mut next = self.cursor;
        while self.used_ids.contains(&next) || is_live(DimensionId(next)) {
            next += 1;
        }
        self.cursor = next;
        debug!(dimension = next, "Allocated free dimension id");
        DimensionId(next)
    }

    /// Whether `id` has a registration.
    pub fn is_registered(&self, id: DimensionId) -> bool {
        self.dimensions.contains_key(&id)
    }

    /// Type bound to `id`.
    pub fn type_of(&self, id: DimensionId) -> Option<&DimensionType> {
        self.dimensions.get(&id)
    }

    /// Whether `id` is in the used-id set.
    pub fn is_used(&self, id: DimensionId) -> bool {
        self.used_ids.contains(&id.get())
    }

    /// All registrations in numeric order.
    pub fn registrations(&self) -> impl Iterator<Item = (DimensionId, &DimensionType)> + '_ {
        self.dimensions.iter().map(|(id, t)| (*id, t))
    }

    /// All registrations in canonical order.
    pub fn sorted_by_convention(&self) -> Vec<(DimensionId, DimensionType)> {
        let mut sorted: Vec<_> = self
            .dimensions
            .iter()
            .map(|(id, t)| (*id, t.clone()))
            .collect();
        sorted.sort_by_key(|(id, _)| canonical_rank(*id));
        sorted
    }

    /// Drop every dimension registration and rewind the cursor. Types are kept.
    pub fn reset(&mut self) {
        self.dimensions.clear();
        self.used_ids.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worldhost_core::Environment;

    fn custom_type(n: usize) -> DimensionType {
        let key = DimensionTypeKey::parse(&format!("test:type_{n}")).unwrap();
        DimensionType::new(key, Environment::SURFACE)
    }

    fn registry_with_primordials() -> DimensionRegistry {
        let mut registry = DimensionRegistry::new();
        registry.types_mut().register(DimensionType::overworld()).unwrap();
        registry.types_mut().register(DimensionType::nether()).unwrap();
        registry.types_mut().register(DimensionType::the_end()).unwrap();
        registry.register_dimension(DimensionId::PRIMARY, DimensionType::overworld()).unwrap();
        registry.register_dimension(DimensionId::NETHER, DimensionType::nether()).unwrap();
        registry.register_dimension(DimensionId::END, DimensionType::the_end()).unwrap();
        registry
    }

    #[test]
    fn type_ids_are_sequential_until_capacity() {
        let mut types = DimensionTypeRegistry::new();
        for n in 0..DimensionTypeId::CAPACITY {
            let id = types.register(custom_type(n)).unwrap();
            assert_eq!(usize::from(id.get()), n);
        }
        assert_eq!(
            types.register(custom_type(999)),
            Err(RegistryError::CapacityExceeded { capacity: 128 })
        );
        assert_eq!(types.len(), 128);
    }

    #[test]
    fn auto_registration_continues_after_highest_explicit_id() {
        let mut types = DimensionTypeRegistry::new();
        types
            .register_with_id(DimensionTypeId::new(10).unwrap(), custom_type(0))
            .unwrap();
        let id = types.register(custom_type(1)).unwrap();
        assert_eq!(id.get(), 11);
    }

    #[test]
    fn explicit_id_keeps_existing_mapping() {
        let mut types = DimensionTypeRegistry::new();
        let id = DimensionTypeId::new(3).unwrap();
        types.register_with_id(id, custom_type(0)).unwrap();
        assert_eq!(
            types.register_with_id(id, custom_type(1)),
            Err(RegistryError::TypeAlreadyRegistered(id))
        );
        assert_eq!(types.get(id), Some(&custom_type(0)));
        assert!(!types.contains(&custom_type(1)));
    }

    #[test]
    fn dimension_requires_registered_type() {
        let mut registry = DimensionRegistry::new();
        let err = registry
            .register_dimension(DimensionId(4), custom_type(4))
            .unwrap_err();
        assert!(matches!(err, RegistryError::TypeNotRegistered(_)));
        assert!(!registry.is_registered(DimensionId(4)));
    }

    #[test]
    fn duplicate_dimension_is_rejected() {
        let mut registry = registry_with_primordials();
        assert_eq!(
            registry.register_dimension(DimensionId::PRIMARY, DimensionType::nether()),
            Err(RegistryError::DimensionAlreadyRegistered(DimensionId::PRIMARY))
        );
        assert_eq!(registry.type_of(DimensionId::PRIMARY), Some(&DimensionType::overworld()));
    }

    #[test]
    fn negative_ids_are_not_marked_used() {
        let registry = registry_with_primordials();
        assert!(registry.is_used(DimensionId::PRIMARY));
        assert!(registry.is_used(DimensionId::END));
        assert!(!registry.is_used(DimensionId::NETHER));
        assert!(registry.is_registered(DimensionId::NETHER));
    }

    #[test]
    fn canonical_order_places_primordials_first() {
        let mut registry = registry_with_primordials();
        registry.register_dimension(DimensionId(5), DimensionType::overworld()).unwrap();
        registry.register_dimension(DimensionId(3), DimensionType::overworld()).unwrap();
        let order: Vec<i32> = registry
            .sorted_by_convention()
            .into_iter()
            .map(|(id, _)| id.get())
            .collect();
        assert_eq!(order, vec![0, -1, 1, 3, 5]);
    }

    #[test]
    fn canonical_order_without_primordials() {
        let mut ids = vec![DimensionId(7), DimensionId(-4), DimensionId(2)];
        sort_canonical(&mut ids);
        assert_eq!(ids, vec![DimensionId(-4), DimensionId(2), DimensionId(7)]);
    }

    #[test]
    fn free_id_skips_used_and_live_ids() {
        let mut registry = registry_with_primordials();
        assert_eq!(registry.next_free_dimension_id(|_| false), DimensionId(2));
        // Not registered yet, so the same id is handed out again.
        assert_eq!(registry.next_free_dimension_id(|_| false), DimensionId(2));
        assert_eq!(registry.next_free_dimension_id(|id| id == DimensionId(2)), DimensionId(3));
    }

    #[test]
    fn freed_id_at_cursor_is_reused() {
        let mut registry = registry_with_primordials();
        let two = registry.next_free_dimension_id(|_| false);
        registry.register_dimension(two, DimensionType::overworld()).unwrap();
        let three = registry.next_free_dimension_id(|_| false);
        registry.register_dimension(three, DimensionType::overworld()).unwrap();
        assert_eq!(three, DimensionId(3));

        registry.unregister_dimension(three);
        assert!(!registry.is_registered(three));
        assert_eq!(registry.next_free_dimension_id(|_| false), DimensionId(3));
    }

    #[test]
    fn freed_id_below_cursor_is_not_reclaimed() {
        let mut registry = registry_with_primordials();
        for _ in 0..3 {
            let id = registry.next_free_dimension_id(|_| false);
            registry.register_dimension(id, DimensionType::overworld()).unwrap();
        }
        registry.unregister_dimension(DimensionId(2));
        assert_eq!(registry.next_free_dimension_id(|_| false), DimensionId(5));

        registry.reset();
        assert_eq!(registry.next_free_dimension_id(|_| false), DimensionId(0));
    }

    #[test]
    #[should_panic(expected = "never registered")]
    fn unregistering_unknown_dimension_panics() {
        let mut registry = registry_with_primordials();
        registry.unregister_dimension(DimensionId(42));
    }
}
