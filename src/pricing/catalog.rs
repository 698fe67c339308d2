//! Static model catalog: CLI aliases, their endpoints, and the flat rates used
//! when no dynamic pricing is reachable.

/// Operation a catalog model performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Generation,
    Upscale,
    BackgroundRemoval,
}

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub alias: &'static str,
    pub endpoint_id: &'static str,
    pub edit_endpoint_id: Option<&'static str>,
    pub kind: ModelKind,
    /// Approximate USD price per image (or per call for upscale/removal)
    pub flat_rate: f64,
}

impl CatalogEntry {
    pub fn endpoint_for(&self, edit: bool) -> &'static str {
        match (edit, self.edit_endpoint_id) {
            (true, Some(edit_id)) => edit_id,
            _ => self.endpoint_id,
        }
    }
}

pub const CATALOG: &[CatalogEntry] = &[
    // Generation
    CatalogEntry {
        alias: "banana",
        endpoint_id: "fal-ai/nano-banana-pro",
        edit_endpoint_id: Some("fal-ai/nano-banana-pro/edit"),
        kind: ModelKind::Generation,
        flat_rate: 0.15,
    },
    CatalogEntry {
        alias: "gpt",
        endpoint_id: "fal-ai/gpt-image-1.5",
        edit_endpoint_id: Some("fal-ai/gpt-image-1.5/edit"),
        kind: ModelKind::Generation,
        flat_rate: 0.05,
    },
    CatalogEntry {
        alias: "flux",
        endpoint_id: "fal-ai/flux-2-pro",
        edit_endpoint_id: Some("fal-ai/flux-2-pro/edit"),
        kind: ModelKind::Generation,
        flat_rate: 0.03,
    },
    CatalogEntry {
        alias: "seedream",
        endpoint_id: "fal-ai/bytedance/seedream/v4/text-to-image",
        edit_endpoint_id: Some("fal-ai/bytedance/seedream/v4/edit"),
        kind: ModelKind::Generation,
        flat_rate: 0.03,
    },
    // Upscale
    CatalogEntry {
        alias: "clarity",
        endpoint_id: "fal-ai/clarity-upscaler",
        edit_endpoint_id: None,
        kind: ModelKind::Upscale,
        flat_rate: 0.03,
    },
    CatalogEntry {
        alias: "seedvr",
        endpoint_id: "fal-ai/seedvr/upscale/image",
        edit_endpoint_id: None,
        kind: ModelKind::Upscale,
        flat_rate: 0.02,
    },
    CatalogEntry {
        alias: "topaz",
        endpoint_id: "fal-ai/topaz/upscale/image",
        edit_endpoint_id: None,
        kind: ModelKind::Upscale,
        flat_rate: 0.08,
    },
    // Background removal
    CatalogEntry {
        alias: "birefnet",
        endpoint_id: "fal-ai/birefnet/v2",
        edit_endpoint_id: None,
        kind: ModelKind::BackgroundRemoval,
        flat_rate: 0.01,
    },
    CatalogEntry {
        alias: "bria",
        endpoint_id: "fal-ai/bria/background/remove",
        edit_endpoint_id: None,
        kind: ModelKind::BackgroundRemoval,
        flat_rate: 0.018,
    },
];

/// Look up a model by alias or by full endpoint id (case-insensitive).
pub fn lookup(model: &str) -> Option<&'static CatalogEntry> {
    let wanted = model.trim().to_lowercase();
    CATALOG.iter().find(|entry| {
        entry.alias == wanted
            || entry.endpoint_id == wanted
            || entry.edit_endpoint_id == Some(wanted.as_str())
    })
}

/// Flat-rate cost of `quantity` units, or `None` for an unknown model.
pub fn fallback_cost(model: &str, quantity: u32) -> Option<f64> {
    lookup(model).map(|entry| entry.flat_rate * quantity as f64)
}

/// Every endpoint the catalog knows, edit endpoints included.
pub fn all_endpoint_ids() -> Vec<String> {
    CATALOG
        .iter()
        .flat_map(|entry| std::iter::once(entry.endpoint_id).chain(entry.edit_endpoint_id))
        .map(str::to_string)
        .collect()
}

pub fn models_of_kind(kind: ModelKind) -> impl Iterator<Item = &'static CatalogEntry> {
    CATALOG.iter().filter(move |entry| entry.kind == kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_alias_and_endpoint() {
        let by_alias = lookup("banana").unwrap();
        assert_eq!(by_alias.endpoint_id, "fal-ai/nano-banana-pro");

        let by_endpoint = lookup("fal-ai/nano-banana-pro/edit").unwrap();
        assert_eq!(by_endpoint.alias, "banana");

        assert_eq!(lookup(" Banana ").unwrap().alias, "banana");
        assert!(lookup("unknown-model").is_none());
    }

    #[test]
    fn test_fallback_cost_is_linear() {
        for entry in CATALOG {
            let single = fallback_cost(entry.alias, 1).unwrap();
            for n in 1..=100u32 {
                assert_eq!(
                    fallback_cost(entry.alias, n).unwrap(),
                    n as f64 * single,
                    "{} x{}",
                    entry.alias,
                    n
                );
            }
        }
    }

    #[test]
    fn test_banana_flat_rate() {
        assert_eq!(fallback_cost("banana", 1), Some(0.15));
        assert_eq!(fallback_cost("nope", 3), None);
    }

    #[test]
    fn test_endpoint_for_edit() {
        let banana = lookup("banana").unwrap();
        assert_eq!(banana.endpoint_for(false), "fal-ai/nano-banana-pro");
        assert_eq!(banana.endpoint_for(true), "fal-ai/nano-banana-pro/edit");

        let clarity = lookup("clarity").unwrap();
        assert_eq!(clarity.endpoint_for(true), "fal-ai/clarity-upscaler");
    }

    #[test]
    fn test_all_endpoint_ids_unique() {
        let ids = all_endpoint_ids();
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(ids.len(), deduped.len());
        assert_eq!(models_of_kind(ModelKind::Upscale).count(), 3);
    }
}
