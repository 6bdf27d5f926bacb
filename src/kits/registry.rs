use crate::kits::{dbcan, fegenie, heme, kofam, methyl, peptidase, DatabaseKit, KitContext};
use crate::{AnnotError, Result};

/// Constructor for a configured kit
pub type KitBuilder = fn(&KitContext) -> Result<Box<dyn DatabaseKit>>;

/// Static description of a built-in kit
#[derive(Clone, Copy)]
pub struct KitDescriptor {
    pub name: &'static str,
    pub formal_name: &'static str,
    pub citation: &'static str,
    pub build: KitBuilder,
}

impl std::fmt::Debug for KitDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KitDescriptor")
            .field("name", &self.name)
            .field("formal_name", &self.formal_name)
            .finish()
    }
}

const BUILTIN: &[KitDescriptor] = &[
    KitDescriptor {
        name: peptidase::NAME,
        formal_name: peptidase::FORMAL_NAME,
        citation: peptidase::CITATION,
        build: peptidase::build,
    },
    KitDescriptor {
        name: methyl::NAME,
        formal_name: methyl::FORMAL_NAME,
        citation: methyl::CITATION,
        build: methyl::build,
    },
    KitDescriptor {
        name: fegenie::NAME,
        formal_name: fegenie::FORMAL_NAME,
        citation: fegenie::CITATION,
        build: fegenie::build,
    },
    KitDescriptor {
        name: dbcan::NAME,
        formal_name: dbcan::FORMAL_NAME,
        citation: dbcan::CITATION,
        build: dbcan::build,
    },
    KitDescriptor {
        name: kofam::NAME,
        formal_name: kofam::FORMAL_NAME,
        citation: kofam::CITATION,
        build: kofam::build,
    },
    KitDescriptor {
        name: heme::NAME,
        formal_name: heme::FORMAL_NAME,
        citation: heme::CITATION,
        build: heme::build,
    },
];

/// Name-to-constructor table of the kits this build knows
#[derive(Debug, Clone)]
pub struct KitRegistry {
    kits: Vec<KitDescriptor>,
}

impl Default for KitRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KitRegistry {
    pub fn builtin() -> Self {
        Self {
            kits: BUILTIN.to_vec(),
        }
    }

    /// Registry with extra descriptors, e.g. for tests
    pub fn with_kit(mut self, descriptor: KitDescriptor) -> Self {
        self.kits.retain(|k| k.name != descriptor.name);
        self.kits.push(descriptor);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.kits.iter().map(|k| k.name)
    }

    pub fn descriptors(&self) -> &[KitDescriptor] {
        &self.kits
    }

    pub fn get(&self, name: &str) -> Option<&KitDescriptor> {
        self.kits.iter().find(|k| k.name == name)
    }

    /// Configure every named kit, failing on the first unknown name or bad configuration
    pub fn build<S: AsRef<str>>(&self, names: &[S], ctx: &KitContext) -> Result<Vec<Box<dyn DatabaseKit>>> {
        let unknown: Vec<&str> = names
            .iter()
            .map(AsRef::as_ref)
            .filter(|n| self.get(n).is_none())
            .collect();
        if !unknown.is_empty() {
            return Err(AnnotError::Usage(format!(
                "unknown database {}; choose from {}",
                unknown.join(", "),
                self.names().collect::<Vec<_>>().join(", ")
            )));
        }

        names
            .iter()
            .filter_map(|n| self.get(n.as_ref()))
            .map(|descriptor| {
                tracing::debug!("Configuring {}", descriptor.formal_name);
                (descriptor.build)(ctx)
            })
            .collect()
    }
}
