//! Persisted module parameters.

use crate::domain::entities::Params;
use crate::domain::keys::KeyPrefix;
use crate::errors::StoreError;
use crate::ports::outbound::KeyValueStore;

/// Singleton `Params` slot. Reads fall back to `Params::default()` until the
/// first write.
pub struct ParamsStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> ParamsStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn get(&self) -> Result<Params, StoreError> {
        match self.store.get(&KeyPrefix::params_key())? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(Params::default()),
        }
    }

    /// Overwrite the stored params. Callers validate first.
    pub fn set(&mut self, params: &Params) -> Result<(), StoreError> {
        let bytes = bincode::serialize(params)?;
        self.store.put(&KeyPrefix::params_key(), &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryKVStore;
    use crate::domain::value_objects::Coin;

    #[test]
    fn test_params_default_then_set() {
        let mut store = ParamsStore::new(InMemoryKVStore::new());
        assert_eq!(store.get().unwrap(), Params::default());

        let params = Params {
            error_stored_time: 5,
            disable_error_callbacks: true,
            subscription_fee: Coin::new("aqc", 100),
            subscription_period: 10,
        };
        store.set(&params).unwrap();
        assert_eq!(store.get().unwrap(), params);
    }
}
