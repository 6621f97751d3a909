use indexmap::IndexMap;

/// A hosted model and the fixed generation parameters the adapters send it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub width: u32,
    pub height: u32,
    pub inference_steps: Option<u32>,
    pub guidance_scale: Option<f32>,
}

impl ModelSpec {
    pub fn size_label(&self, separator: char) -> String {
        format!("{}{separator}{}", self.width, self.height)
    }
}

#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: IndexMap<String, ModelSpec>,
}

impl ModelCatalog {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    /// Models registered for `provider`, in catalog order.
    pub fn candidates(&self, provider: &str) -> Vec<ModelSpec> {
        self.models
            .values()
            .filter(|model| model.provider == provider)
            .cloned()
            .collect()
    }

    pub fn first_for(&self, provider: &str) -> Option<ModelSpec> {
        self.models
            .values()
            .find(|model| model.provider == provider)
            .cloned()
    }

    /// Replaces the candidate list of `provider` with `names`, in that order.
    /// Names the catalog does not know inherit the parameters of the
    /// provider's first default model.
    pub fn with_candidates(mut self, provider: &str, names: &[String]) -> Self {
        let names: Vec<&str> = names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect();
        if names.is_empty() {
            return self;
        }
        let Some(template) = self.first_for(provider) else {
            return self;
        };
        let mut previous = IndexMap::new();
        self.models.retain(|name, spec| {
            if spec.provider == provider {
                previous.insert(name.clone(), spec.clone());
                return false;
            }
            true
        });
        for name in names {
            let spec = previous.get(name).cloned().unwrap_or_else(|| ModelSpec {
                name: name.to_string(),
                ..template.clone()
            });
            self.models.insert(name.to_string(), spec);
        }
        self
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new(None)
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str,
                      provider: &str,
                      size: (u32, u32),
                      inference_steps: Option<u32>,
                      guidance_scale: Option<f32>| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                provider: provider.to_string(),
                width: size.0,
                height: size.1,
                inference_steps,
                guidance_scale,
            },
        );
    };

    insert(
        "stabilityai/stable-diffusion-xl-base-1.0",
        "siliconcloud",
        (1024, 1024),
        Some(25),
        Some(8.0),
    );
    insert(
        "prompthero/openjourney-v4",
        "huggingface",
        (512, 512),
        Some(20),
        Some(9.0),
    );
    insert(
        "runwayml/stable-diffusion-v1-5",
        "huggingface",
        (512, 512),
        Some(20),
        Some(9.0),
    );
    insert(
        "stabilityai/stable-diffusion-2-1",
        "huggingface",
        (512, 512),
        Some(20),
        Some(9.0),
    );
    insert(
        "dreamlike-art/dreamlike-anime-1.0",
        "huggingface",
        (512, 512),
        Some(20),
        Some(9.0),
    );
    insert("dall-e-3", "openai", (1024, 1024), None, None);
    insert("ernie-vilg", "baidu", (512, 512), None, None);
    insert("wanx-v1", "aliyun", (1024, 1024), None, None);

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huggingface_candidates_keep_catalog_order() {
        let names: Vec<String> = ModelCatalog::default()
            .candidates("huggingface")
            .into_iter()
            .map(|model| model.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "prompthero/openjourney-v4",
                "runwayml/stable-diffusion-v1-5",
                "stabilityai/stable-diffusion-2-1",
                "dreamlike-art/dreamlike-anime-1.0",
            ]
        );
    }

    #[test]
    fn primary_model_carries_generation_parameters() {
        let model = ModelCatalog::default()
            .first_for("siliconcloud")
            .expect("siliconcloud default model");
        assert_eq!(model.size_label('x'), "1024x1024");
        assert_eq!(model.inference_steps, Some(25));
        assert_eq!(model.guidance_scale, Some(8.0));
    }

    #[test]
    fn with_candidates_replaces_only_the_named_provider() {
        let catalog = ModelCatalog::default().with_candidates(
            "huggingface",
            &[
                "custom/cat-diffusion".to_string(),
                " runwayml/stable-diffusion-v1-5 ".to_string(),
            ],
        );
        let names: Vec<String> = catalog
            .candidates("huggingface")
            .into_iter()
            .map(|model| model.name)
            .collect();
        assert_eq!(
            names,
            vec!["custom/cat-diffusion", "runwayml/stable-diffusion-v1-5"]
        );
        let custom = catalog.get("custom/cat-diffusion").expect("custom model");
        assert_eq!(custom.provider, "huggingface");
        assert_eq!(custom.inference_steps, Some(20));
        assert!(catalog.first_for("siliconcloud").is_some());
    }

    #[test]
    fn with_candidates_ignores_blank_lists() {
        let catalog = ModelCatalog::default().with_candidates("huggingface", &["  ".to_string()]);
        assert_eq!(catalog.candidates("huggingface").len(), 4);
    }
}
