//! Registry of output flavors.

use crate::traits::Flavor;
use std::collections::BTreeMap;

/// Builds a fresh flavor instance.
pub type FlavorConstructor = fn() -> Box<dyn Flavor>;

/// Name → constructor table.
///
/// Owned by the caller and threaded explicitly; there is no process-wide
/// registry. [`FlavorRegistry::builtin`] holds the flavors compiled in via
/// `backend-*` features.
#[derive(Clone, Default)]
pub struct FlavorRegistry {
    constructors: BTreeMap<&'static str, FlavorConstructor>,
}

impl FlavorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every flavor compiled into this build.
    pub fn builtin() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "backend-zod")]
        registry.register("zod", || Box::new(crate::output::ZodFlavor::zod()));

        #[cfg(feature = "backend-valibot")]
        registry.register("valibot", || Box::new(crate::output::ValibotFlavor::valibot()));

        registry
    }

    /// Add or replace a flavor.
    pub fn register(&mut self, name: &'static str, constructor: FlavorConstructor) {
        self.constructors.insert(name, constructor);
    }

    /// Construct a fresh flavor by name.
    pub fn create(&self, name: &str) -> Option<Box<dyn Flavor>> {
        self.constructors.get(name).map(|make| make())
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.constructors.keys().copied().collect()
    }
}

impl std::fmt::Debug for FlavorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.constructors.keys()).finish()
    }
}
