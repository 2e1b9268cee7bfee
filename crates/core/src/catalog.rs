//! Static provider/model catalog and model-reference resolution.
//!
//! Clients may send a fully qualified `provider/model` string, a bare model
//! id, or nothing at all. Resolution is permissive: qualified references are
//! split without an existence check (an unknown provider surfaces later as
//! an upstream "unsupported provider" failure), bare ids are searched across
//! every provider, and the absence of a model string falls back to the
//! catalog default.

/// A concrete (provider, model) pair produced by [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    pub provider_id: String,
    pub model_id: String,
}

/// One model entry in the static catalog.
#[derive(Debug)]
pub struct CatalogModel {
    pub id: &'static str,
    pub label: &'static str,
    /// At most one model in the whole catalog carries this flag.
    pub default: bool,
}

/// One provider entry in the static catalog.
#[derive(Debug)]
pub struct CatalogProvider {
    pub id: &'static str,
    pub label: &'static str,
    pub models: &'static [CatalogModel],
}

/// The configured catalog. Google is currently the only supported provider.
pub const CATALOG: &[CatalogProvider] = &[CatalogProvider {
    id: "google",
    label: "Google",
    models: &[
        CatalogModel {
            id: "gemini-2.5-flash",
            label: "Gemini 2.5 Flash",
            default: true,
        },
        CatalogModel {
            id: "gemini-2.5-pro",
            label: "Gemini 2.5 Pro",
            default: false,
        },
        CatalogModel {
            id: "gemini-2.5-flash-lite",
            label: "Gemini 2.5 Flash Lite",
            default: false,
        },
    ],
}];

/// Cheapest catalog model, used for short utility calls (title generation).
pub const UTILITY_MODEL: &str = "gemini-2.5-flash-lite";

/// The catalog-configured default: first model flagged `default`, else the
/// first model of the first provider, else `None` if the catalog is empty.
pub fn default_model() -> Option<ModelRef> {
    for provider in CATALOG {
        if let Some(model) = provider.models.iter().find(|m| m.default) {
            return Some(ModelRef {
                provider_id: provider.id.to_string(),
                model_id: model.id.to_string(),
            });
        }
    }
    CATALOG.first().and_then(|provider| {
        provider.models.first().map(|model| ModelRef {
            provider_id: provider.id.to_string(),
            model_id: model.id.to_string(),
        })
    })
}

/// Resolve a client-supplied model string to a (provider, model) pair.
pub fn resolve(model: Option<&str>) -> Option<ModelRef> {
    let model = match model {
        Some(m) if !m.is_empty() => m,
        _ => return default_model(),
    };

    // Qualified reference: split directly, no existence check.
    if let Some((provider_id, model_id)) = model.split_once('/') {
        return Some(ModelRef {
            provider_id: provider_id.to_string(),
            model_id: model_id.to_string(),
        });
    }

    // Bare model id: search every provider's model list.
    for provider in CATALOG {
        if provider.models.iter().any(|m| m.id == model) {
            return Some(ModelRef {
                provider_id: provider.id.to_string(),
                model_id: model.to_string(),
            });
        }
    }
    None
}
