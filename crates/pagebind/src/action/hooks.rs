//! Hooks registered by [`ActionRepository::initialize`].

use super::{Action, ActionContext, ActionRepository, ActionResult, LocatorAction, PostAction, PreAction};
use crate::property::PropertyData;
use crate::result::PageResult;
use crate::validation::{builtin_comparers, TokenManager};
use std::sync::Weak;

/// Binds the context's validation table before the action runs.
///
/// Rows are matched against the repository's comparers and their values
/// token-expanded. An unknown rule fails the pipeline before the action
/// runs.
#[derive(Debug)]
pub struct ValidationTablePreAction {
    repository: Weak<ActionRepository>,
    tokens: TokenManager,
}

impl ValidationTablePreAction {
    /// Pre-action reading comparers from `repository`
    #[must_use]
    pub const fn new(repository: Weak<ActionRepository>, tokens: TokenManager) -> Self {
        Self { repository, tokens }
    }
}

impl PreAction for ValidationTablePreAction {
    fn name(&self) -> &str {
        "ValidationTablePreAction"
    }

    fn perform(&self, action: &dyn Action, context: &mut ActionContext) -> PageResult<()> {
        let Some(table) = context.validation_mut() else {
            return Ok(());
        };
        if table.is_bound() {
            return Ok(());
        }
        let comparers = self
            .repository
            .upgrade()
            .map_or_else(builtin_comparers, |repo| repo.comparers());
        table.bind_all(&comparers, &self.tokens)?;
        tracing::debug!(action = action.name(), rows = table.len(), "bound validation table");
        Ok(())
    }
}

/// Logs the outcome of every action
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPostAction;

impl PostAction for TracingPostAction {
    fn name(&self) -> &str {
        "TracingPostAction"
    }

    fn perform(
        &self,
        action: &dyn Action,
        context: &ActionContext,
        result: &ActionResult,
    ) -> PageResult<()> {
        match result.error() {
            None => tracing::debug!(
                action = action.name(),
                property = context.property_name(),
                "action succeeded"
            ),
            Some(error) => tracing::info!(
                action = action.name(),
                property = context.property_name(),
                error = %error,
                "action failed"
            ),
        }
        Ok(())
    }
}

/// Highlights every element as it is located
#[derive(Debug, Clone, Copy, Default)]
pub struct HighlightLocatorAction;

impl LocatorAction for HighlightLocatorAction {
    fn on_locate(&self, _name: &str) {}

    fn on_locate_complete(&self, name: &str, property: Option<&PropertyData>) {
        if let Some(property) = property.filter(|p| p.is_element()) {
            if let Err(e) = property.highlight() {
                tracing::debug!(property = name, error = %e, "highlight skipped");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::action::{ActionValue, ElementLocator};
    use crate::builder::PageBuilder;
    use crate::locator::LocatorMetadata;
    use crate::mock::{MockDocument, MockNode};
    use crate::native::ElementKind;
    use crate::page_object::{PageDescriptor, PageModel};
    use crate::validation::ValidationTable;

    #[derive(Debug)]
    struct Probe;

    impl Action for Probe {
        fn name(&self) -> &str {
            "Probe"
        }

        fn set_element_locator(&mut self, _locator: ElementLocator) {}

        fn execute(&self, _context: &ActionContext) -> PageResult<ActionValue> {
            Ok(ActionValue::Unit)
        }
    }

    mod validation_pre_action_tests {
        use super::*;

        #[test]
        fn test_binds_and_expands_tokens() {
            let repo = ActionRepository::new();
            repo.initialize();
            repo.tokens().set_token("order", "A-17");
            let hook = ValidationTablePreAction::new(std::sync::Arc::downgrade(&repo), repo.tokens());

            let mut context = ActionContext::new()
                .with_validation(ValidationTable::new().with("Order Id", "equals", "{order}"));
            hook.perform(&Probe, &mut context).unwrap();

            let table = context.validation().unwrap();
            assert!(table.is_bound());
            assert_eq!(table.validations()[0].comparison_value(), "A-17");
        }

        #[test]
        fn test_unknown_rule_fails() {
            let repo = ActionRepository::new();
            repo.initialize();
            let hook = ValidationTablePreAction::new(std::sync::Arc::downgrade(&repo), repo.tokens());
            let mut context = ActionContext::new()
                .with_validation(ValidationTable::new().with("Name", "rhymes with", "x"));
            assert!(hook.perform(&Probe, &mut context).is_err());
        }

        #[test]
        fn test_without_table_is_noop() {
            let hook = ValidationTablePreAction::new(Weak::new(), TokenManager::new());
            let mut context = ActionContext::new();
            hook.perform(&Probe, &mut context).unwrap();
        }

        #[test]
        fn test_dropped_repository_falls_back_to_builtins() {
            let hook = ValidationTablePreAction::new(Weak::new(), TokenManager::new());
            let mut context = ActionContext::new()
                .with_validation(ValidationTable::new().with("Name", "contains", "a"));
            hook.perform(&Probe, &mut context).unwrap();
            assert!(context.validation().unwrap().is_bound());
        }
    }

    mod highlight_tests {
        use super::*;

        struct Banner;

        impl PageModel for Banner {
            fn descriptor() -> PageDescriptor {
                PageDescriptor::builder("Banner")
                    .document()
                    .element("Message", ElementKind::Div, LocatorMetadata::id("msg"))
                    .scalar("Theme", "dark")
                    .build()
            }
        }

        #[test]
        fn test_located_elements_are_highlighted() {
            let doc = MockDocument::new(MockNode::new("html").child(MockNode::new("div").id("msg")));
            let page = PageBuilder::new().build_page::<Banner>(&doc).unwrap();
            let hook: std::sync::Arc<dyn LocatorAction> = std::sync::Arc::new(HighlightLocatorAction);
            let locator = ElementLocator::new(page, vec![hook]);

            locator.get_element("message").unwrap();
            locator.get_property("theme").unwrap();
            assert!(locator.try_get_element("missing").is_none());

            assert_eq!(doc.events(), vec!["highlight #msg"]);
        }
    }
}
