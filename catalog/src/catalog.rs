use crate::context::{Context, ContextError};
use crate::protocol::catalog::{Filter, Laptop};
use crate::search::is_qualified;
use std::collections::BTreeMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("laptop ID is not a valid UUID: {0}")]
    InvalidId(String),
    #[error("record already exists: {0}")]
    AlreadyExists(String),
    #[error("laptop store lock is poisoned")]
    Poisoned,
}

/// Storage for catalog records. Implementations hand out copies, never
/// references into their own state.
pub trait LaptopStore: Send + Sync {
    /// Saves a laptop whose ID the caller has already assigned
    fn save(&self, laptop: &Laptop) -> Result<(), CatalogError>;

    /// Finds a laptop by ID. Absence is not an error.
    fn find(&self, id: &str) -> Result<Option<Laptop>, CatalogError>;

    /// Visits every laptop matching `filter` once. The context is checked before
    /// each laptop is evaluated; an error from `visit` stops the scan and is
    /// returned unchanged.
    fn search<E, F>(&self, ctx: &Context, filter: &Filter, visit: F) -> Result<(), E>
    where
        Self: Sized,
        E: From<ContextError> + From<CatalogError>,
        F: FnMut(Laptop) -> Result<(), E>;
}

/// Laptops kept in memory, ordered by ID
#[derive(Debug, Default)]
pub struct InMemoryLaptopStore {
    data: RwLock<BTreeMap<String, Laptop>>,
}

impl InMemoryLaptopStore {
    pub fn new() -> InMemoryLaptopStore {
        InMemoryLaptopStore::default()
    }

    pub fn len(&self) -> Result<usize, CatalogError> {
        let data = self.data.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(data.len())
    }

    pub fn is_empty(&self) -> Result<bool, CatalogError> {
        Ok(self.len()? == 0)
    }
}

impl LaptopStore for InMemoryLaptopStore {
    fn save(&self, laptop: &Laptop) -> Result<(), CatalogError> {
        Uuid::parse_str(&laptop.id).map_err(|e| CatalogError::InvalidId(e.to_string()))?;

        let mut data = self.data.write().map_err(|_| CatalogError::Poisoned)?;
        if data.contains_key(&laptop.id) {
            return Err(CatalogError::AlreadyExists(laptop.id.clone()));
        }
        data.insert(laptop.id.clone(), laptop.clone());
        Ok(())
    }

    fn find(&self, id: &str) -> Result<Option<Laptop>, CatalogError> {
        let data = self.data.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(data.get(id).cloned())
    }

    fn search<E, F>(&self, ctx: &Context, filter: &Filter, mut visit: F) -> Result<(), E>
    where
        E: From<ContextError> + From<CatalogError>,
        F: FnMut(Laptop) -> Result<(), E>,
    {
        // Copy out under the lock so a slow visitor never blocks writers.
        let snapshot: Vec<Laptop> = {
            let data = self.data.read().map_err(|_| CatalogError::Poisoned)?;
            data.values().cloned().collect()
        };

        for laptop in snapshot {
            if let Err(e) = ctx.err() {
                warn!("search stopped before laptop {}: {}", laptop.id, e);
                return Err(e.into());
            }
            if is_qualified(filter, &laptop) {
                debug!("laptop {} matches the filter", laptop.id);
                visit(laptop)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::catalog::{memory::Unit, Cpu, Memory};
    use std::time::{Duration, Instant};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Context(ContextError),
        Catalog(String),
        Stop,
    }

    impl From<ContextError> for TestError {
        fn from(e: ContextError) -> Self {
            TestError::Context(e)
        }
    }

    impl From<CatalogError> for TestError {
        fn from(e: CatalogError) -> Self {
            TestError::Catalog(e.to_string())
        }
    }

    fn new_laptop(price_usd: f64) -> Laptop {
        Laptop {
            id: Uuid::new_v4().to_string(),
            brand: "Dell".to_string(),
            name: "XPS".to_string(),
            cpu: Some(Cpu {
                brand: "Intel".to_string(),
                name: "Core i7".to_string(),
                number_cores: 4,
                number_threads: 8,
                min_ghz: 2.5,
                max_ghz: 4.5,
            }),
            ram: Some(Memory {
                value: 8,
                unit: Unit::Gigabyte as i32,
            }),
            price_usd,
            release_year: 2020,
            ..Default::default()
        }
    }

    fn cheap_filter() -> Filter {
        Filter {
            max_price_usd: 2000.0,
            min_cpu_cores: 4,
            min_cpu_ghz: 2.5,
            min_ram: Some(Memory {
                value: 8,
                unit: Unit::Gigabyte as i32,
            }),
        }
    }

    fn collect(store: &InMemoryLaptopStore, ctx: &Context, filter: &Filter) -> Result<Vec<Laptop>, TestError> {
        let mut found = Vec::new();
        store.search(ctx, filter, |laptop| {
            found.push(laptop);
            Ok::<(), TestError>(())
        })?;
        Ok(found)
    }

    #[test]
    fn save_then_find_returns_equal_copy() {
        let store = InMemoryLaptopStore::new();
        let laptop = new_laptop(1500.0);
        store.save(&laptop).unwrap();

        let found = store.find(&laptop.id).unwrap().unwrap();
        assert_eq!(found, laptop);
        assert!(store.find(&Uuid::new_v4().to_string()).unwrap().is_none());
    }

    #[test]
    fn duplicate_id_already_exists() {
        let store = InMemoryLaptopStore::new();
        let laptop = new_laptop(1500.0);
        store.save(&laptop).unwrap();

        let err = store.save(&laptop).unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyExists(ref id) if *id == laptop.id));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn malformed_or_empty_id_is_rejected() {
        let store = InMemoryLaptopStore::new();
        let mut laptop = new_laptop(1500.0);
        laptop.id = "not-a-uuid".to_string();
        assert!(matches!(store.save(&laptop), Err(CatalogError::InvalidId(_))));

        laptop.id.clear();
        assert!(matches!(store.save(&laptop), Err(CatalogError::InvalidId(_))));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn poisoned_store_reports_poisoned_len() {
        let store = std::sync::Arc::new(InMemoryLaptopStore::new());
        let held = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = held.data.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(matches!(store.len(), Err(CatalogError::Poisoned)));
        assert!(matches!(store.is_empty(), Err(CatalogError::Poisoned)));
    }

    #[test]
    fn caller_mutation_does_not_leak_into_store() {
        let store = InMemoryLaptopStore::new();
        let mut laptop = new_laptop(1500.0);
        store.save(&laptop).unwrap();
        laptop.price_usd = 1.0;

        let mut found = store.find(&laptop.id).unwrap().unwrap();
        assert_eq!(found.price_usd, 1500.0);
        found.brand = "changed".to_string();
        assert_eq!(store.find(&laptop.id).unwrap().unwrap().brand, "Dell");
    }

    #[test]
    fn search_returns_only_matching_laptop() {
        let store = InMemoryLaptopStore::new();
        let expensive = new_laptop(2500.0);
        let cheap = new_laptop(1500.0);
        store.save(&expensive).unwrap();
        store.save(&cheap).unwrap();

        let found = collect(&store, &Context::background(), &cheap_filter()).unwrap();
        assert_eq!(found, vec![cheap]);
    }

    #[test]
    fn canceled_context_stops_before_any_visit() {
        let store = InMemoryLaptopStore::new();
        store.save(&new_laptop(1500.0)).unwrap();
        let ctx = Context::background();
        ctx.cancel();

        let err = collect(&store, &ctx, &cheap_filter()).unwrap_err();
        assert_eq!(err, TestError::Context(ContextError::Canceled));
    }

    #[test]
    fn expired_deadline_reported() {
        let store = InMemoryLaptopStore::new();
        store.save(&new_laptop(1500.0)).unwrap();
        let ctx = Context::with_deadline(Instant::now() - Duration::from_secs(1));

        let err = collect(&store, &ctx, &cheap_filter()).unwrap_err();
        assert_eq!(err, TestError::Context(ContextError::DeadlineExceeded));
    }

    #[test]
    fn visitor_error_aborts_scan() {
        let store = InMemoryLaptopStore::new();
        for _ in 0..3 {
            store.save(&new_laptop(1000.0)).unwrap();
        }

        let mut visited = 0;
        let res = store.search(&Context::background(), &cheap_filter(), |_| {
            visited += 1;
            Err(TestError::Stop)
        });
        assert_eq!(res, Err(TestError::Stop));
        assert_eq!(visited, 1);
    }

    #[test]
    fn cancel_during_scan_stops_further_visits() {
        let store = InMemoryLaptopStore::new();
        for _ in 0..5 {
            store.save(&new_laptop(1000.0)).unwrap();
        }
        let ctx = Context::background();

        let mut visited = 0;
        let res = store.search(&ctx, &cheap_filter(), |_| {
            visited += 1;
            ctx.cancel();
            Ok::<(), TestError>(())
        });
        assert_eq!(res, Err(TestError::Context(ContextError::Canceled)));
        assert_eq!(visited, 1);
    }
}
