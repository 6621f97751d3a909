#[derive(Debug, Clone)]
pub struct ProviderRegistry<T: NamedProvider> {
    providers: Vec<T>,
}

pub trait NamedProvider {
    fn name(&self) -> &str;
}

impl<T: NamedProvider> ProviderRegistry<T> {
    pub fn new(providers: Vec<T>) -> Self {
        Self { providers }
    }

    /// Consumes the registry, keeping providers in the order `names` lists
    /// them. Unknown names and repeats are skipped.
    pub fn into_ordered(self, names: &[String]) -> Vec<T> {
        let mut pool: Vec<Option<T>> = self.providers.into_iter().map(Some).collect();
        let mut picked = Vec::new();
        for name in names {
            let wanted = name.trim();
            let slot = pool.iter_mut().find(|slot| {
                slot.as_ref()
                    .map(|provider| provider.name() == wanted)
                    .unwrap_or(false)
            });
            if let Some(provider) = slot.and_then(Option::take) {
                picked.push(provider);
            }
        }
        picked
    }
}

#[cfg(test)]
mod tests {
    use super::{NamedProvider, ProviderRegistry};

    #[derive(Clone, Debug)]
    struct DummyProvider {
        name: String,
    }

    impl NamedProvider for DummyProvider {
        fn name(&self) -> &str {
            self.name.as_str()
        }
    }

    fn registry(names: &[&str]) -> ProviderRegistry<DummyProvider> {
        ProviderRegistry::new(
            names
                .iter()
                .map(|name| DummyProvider {
                    name: name.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn into_ordered_follows_requested_names_and_skips_unknown() {
        let registry = registry(&["siliconcloud", "huggingface", "local"]);
        let names = ["local", "missing", " siliconcloud ", "local"]
            .iter()
            .map(|name| name.to_string())
            .collect::<Vec<String>>();
        let picked = registry
            .into_ordered(&names)
            .into_iter()
            .map(|provider| provider.name().to_string())
            .collect::<Vec<String>>();
        assert_eq!(picked, vec!["local", "siliconcloud"]);
    }
}
