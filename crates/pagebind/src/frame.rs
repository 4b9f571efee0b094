//! Process-wide frame registry.
//!
//! Frame maps are page types marked `frame_map` whose frame-typed properties
//! name the frames of an application. Pages declaring a route frame are
//! rooted in the document of the frame found here.

use crate::locator::LocatorExpr;
use crate::native::{ElementKind, NativeRef};
use crate::page_object::{normalize_property_name, PageTypeRef, PropertyKind};
use crate::result::{PageError, PageResult};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// One named frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEntry {
    /// Declared frame property name
    pub name: String,
    /// Frame map declaring it
    pub declared_by: String,
    /// Compiled locator of the frame element
    pub locator: LocatorExpr,
}

/// Frame maps registered with a page builder
#[derive(Debug, Default)]
pub struct FrameRegistry {
    sources: RwLock<Vec<PageTypeRef>>,
    map: RwLock<Option<Arc<HashMap<String, FrameEntry>>>>,
}

impl FrameRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a frame map. Registering the same type twice is a no-op.
    pub fn register(&self, frame_map: PageTypeRef) -> PageResult<()> {
        let descriptor = frame_map.descriptor();
        if !descriptor.is_frame_map() {
            return Err(PageError::configuration(
                descriptor.name(),
                "type is not marked as a frame map",
            ));
        }
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        if !sources.contains(&frame_map) {
            sources.push(frame_map);
            *self.map.write().unwrap_or_else(PoisonError::into_inner) = None;
            tracing::debug!(frame_map = descriptor.name(), "registered frame map");
        }
        Ok(())
    }

    /// Number of registered frame maps
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no frame map is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build(&self) -> PageResult<Arc<HashMap<String, FrameEntry>>> {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        let mut map = HashMap::new();
        for source in sources.iter() {
            let descriptor = source.descriptor();
            for property in descriptor.properties() {
                if !matches!(property.kind(), PropertyKind::Frame) {
                    continue;
                }
                let locator = property
                    .locator()
                    .ok_or_else(|| {
                        PageError::configuration(
                            descriptor.name(),
                            format!("frame '{}' has no locator", property.name()),
                        )
                    })?
                    .compile(&ElementKind::Frame, descriptor.name(), property.name())?;
                let entry = FrameEntry {
                    name: property.name().to_string(),
                    declared_by: descriptor.name().to_string(),
                    locator,
                };
                if let Some(existing) = map.insert(property.key(), entry) {
                    return Err(PageError::configuration(
                        descriptor.name(),
                        format!(
                            "frame '{}' is also declared by '{}'",
                            property.name(),
                            existing.declared_by
                        ),
                    ));
                }
            }
        }
        tracing::debug!(frames = map.len(), "built frame registry");
        Ok(Arc::new(map))
    }

    fn frames(&self) -> PageResult<Arc<HashMap<String, FrameEntry>>> {
        if let Some(map) = self.map.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return Ok(Arc::clone(map));
        }
        let built = self.build()?;
        let mut slot = self.map.write().unwrap_or_else(PoisonError::into_inner);
        // A racing builder may have published first; keep the published map
        Ok(Arc::clone(slot.get_or_insert(built)))
    }

    /// Look up a frame by name
    pub fn lookup(&self, frame: &str) -> PageResult<Option<FrameEntry>> {
        Ok(self.frames()?.get(&normalize_property_name(frame)).cloned())
    }

    /// Document of `frame`, searched from `root`
    pub fn resolve(&self, frame: &str, page: &str, root: &NativeRef) -> PageResult<NativeRef> {
        let entry = self.lookup(frame)?.ok_or_else(|| PageError::FrameNotFound {
            frame: frame.to_string(),
            page: page.to_string(),
        })?;
        let element = root.find(&entry.locator);
        tracing::debug!(frame, page, locator = %entry.locator, "resolving frame");
        element
            .frame_document()
            .ok_or_else(|| PageError::FrameDocumentMissing {
                frame: frame.to_string(),
                page: page.to_string(),
            })
    }
}
