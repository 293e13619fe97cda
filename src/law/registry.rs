//! LawRegistry: law id → [`BondLaw`] instance.
//!
//! The registry is an owned value scoped to a simulation run. It is populated at
//! configuration time and only read during computation, so clones handed to several
//! partitions share the same `Arc`'d law objects without locking.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::law::{BondLaw, DEFAULT_LAW_ID, DefaultBondLaw, FnBondLaw, LawFunctions, LawId};
use crate::pd_error::PdError;

#[derive(Clone)]
pub struct LawRegistry<const D: usize> {
    default: DefaultBondLaw,
    laws: BTreeMap<LawId, Arc<dyn BondLaw<D>>>,
}

impl<const D: usize> LawRegistry<D> {
    /// Registry holding only the default law under [`DEFAULT_LAW_ID`].
    pub fn new(default: DefaultBondLaw) -> Self {
        let mut laws: BTreeMap<LawId, Arc<dyn BondLaw<D>>> = BTreeMap::new();
        laws.insert(DEFAULT_LAW_ID, Arc::new(default));
        Self { default, laws }
    }

    /// Install or overwrite the law for `id`.
    pub fn register(&mut self, id: LawId, law: Arc<dyn BondLaw<D>>) {
        if self.laws.insert(id, law).is_some() {
            log::info!("bond law {id} re-registered");
        } else {
            log::debug!("bond law {id} registered");
        }
    }

    /// Install a law assembled from function slots; unset slots are bound to the
    /// built-in default law now, not at lookup time.
    pub fn register_functions(&mut self, id: LawId, fns: LawFunctions<D>) {
        self.register(id, Arc::new(FnBondLaw::resolve(fns, self.default)));
    }

    /// Law for `id`, or `None` if it was never registered.
    pub fn get(&self, id: LawId) -> Option<&Arc<dyn BondLaw<D>>> {
        self.laws.get(&id)
    }

    /// Law for `id`, or [`PdError::UnregisteredLaw`] attributed to `bond` on `level`.
    pub fn lookup(&self, id: LawId, level: usize, bond: usize) -> Result<&Arc<dyn BondLaw<D>>, PdError> {
        self.get(id).ok_or(PdError::UnregisteredLaw {
            law_id: id,
            level,
            bond,
        })
    }

    pub fn contains(&self, id: LawId) -> bool {
        self.laws.contains_key(&id)
    }

    /// Registered ids, ascending.
    pub fn ids(&self) -> impl Iterator<Item = LawId> + '_ {
        self.laws.keys().copied()
    }

    /// The built-in law used to fill unset function slots.
    pub fn default_law(&self) -> &DefaultBondLaw {
        &self.default
    }
}

impl<const D: usize> fmt::Debug for LawRegistry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LawRegistry")
            .field("default", &self.default)
            .field("ids", &self.laws.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ElasticConfig;
    use crate::data::tensor::Tensor;

    fn registry() -> LawRegistry<2> {
        LawRegistry::new(DefaultBondLaw::new(ElasticConfig::default()))
    }

    #[test]
    fn id_zero_is_always_present() {
        let reg = registry();
        assert!(reg.contains(DEFAULT_LAW_ID));
        assert_eq!(reg.ids().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn unknown_ids_are_errors_not_fallbacks() {
        let reg = registry();
        let err = reg.lookup(4, 1, 9).err().unwrap();
        assert_eq!(
            err,
            PdError::UnregisteredLaw {
                law_id: 4,
                level: 1,
                bond: 9
            }
        );
    }

    #[test]
    fn registration_overwrites() {
        let mut reg = registry();
        reg.register_functions(3, LawFunctions::new(|_, _, _| Tensor::<2>::identity()));
        reg.register_functions(
            3,
            LawFunctions::new(|_, _, _| Tensor::<2>::zeros()).with_breakage_threshold(0.25),
        );
        assert_eq!(reg.lookup(3, 0, 0).unwrap().breakage_threshold(), 0.25);
        assert_eq!(reg.ids().collect::<Vec<_>>(), vec![0, 3]);
    }
}
