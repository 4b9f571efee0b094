//! Registry of hooks, comparers and action factories.

use super::builtin::{
    ClickItemAction, EnterDataAction, GetItemValueAction, GetListItemByCriteriaAction,
    GetListItemByIndexAction, HighlightItemAction, ValidateItemAction, ValidateListAction,
    ValidateListRowCountAction, WaitForElementAction,
};
use super::hooks::{HighlightLocatorAction, TracingPostAction, ValidationTablePreAction};
use super::{Action, LocatorAction, PostAction, PreAction};
use crate::config::PagebindConfig;
use crate::result::{PageError, PageResult};
use crate::validation::{builtin_comparers, TokenManager, ValidationComparer};
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

/// Builds a fresh action; receives the repository for injection
pub type ActionFactory = Arc<dyn Fn(&ActionRepository) -> Box<dyn Action> + Send + Sync>;

#[derive(Default)]
struct RepositoryState {
    initialized: bool,
    config: PagebindConfig,
    pre_actions: Vec<Arc<dyn PreAction>>,
    post_actions: Vec<Arc<dyn PostAction>>,
    locator_actions: Vec<Arc<dyn LocatorAction>>,
    comparers: Vec<Arc<dyn ValidationComparer>>,
    actions: HashMap<TypeId, (&'static str, ActionFactory)>,
}

/// Registry consulted by the pipeline.
///
/// Empty until [`ActionRepository::initialize`] registers the built-ins;
/// explicit registration works before or after initialization.
pub struct ActionRepository {
    state: RwLock<RepositoryState>,
    tokens: TokenManager,
    this: Weak<ActionRepository>,
}

impl fmt::Debug for ActionRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("ActionRepository")
            .field("initialized", &state.initialized)
            .field("pre_actions", &state.pre_actions.len())
            .field("post_actions", &state.post_actions.len())
            .field("locator_actions", &state.locator_actions.len())
            .field("comparers", &state.comparers.len())
            .field("actions", &state.actions.len())
            .finish()
    }
}

impl ActionRepository {
    /// Empty repository
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            state: RwLock::new(RepositoryState::default()),
            tokens: TokenManager::new(),
            this: this.clone(),
        })
    }

    /// Process-wide repository
    pub fn global() -> &'static Arc<Self> {
        static GLOBAL: OnceLock<Arc<ActionRepository>> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    fn read(&self) -> RwLockReadGuard<'_, RepositoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RepositoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the built-ins with the default configuration. Later calls
    /// are no-ops.
    pub fn initialize(&self) {
        self.initialize_with(&PagebindConfig::default());
    }

    /// Register the built-ins with `config`. Later calls are no-ops.
    pub fn initialize_with(&self, config: &PagebindConfig) {
        let mut state = self.write();
        if state.initialized {
            return;
        }
        state.config = config.clone();
        self.register_builtins(&mut state);
    }

    /// Drop everything and register the built-ins again with the last
    /// configuration
    pub fn reinitialize(&self) {
        let mut state = self.write();
        let config = std::mem::take(&mut state.config);
        *state = RepositoryState {
            config,
            ..RepositoryState::default()
        };
        self.register_builtins(&mut state);
    }

    /// Whether the built-ins are registered
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.read().initialized
    }

    fn register_builtins(&self, state: &mut RepositoryState) {
        for (name, value) in &state.config.tokens {
            self.tokens.set_token(name.clone(), value.clone());
        }

        state.comparers.extend(builtin_comparers());
        state.pre_actions.push(Arc::new(ValidationTablePreAction::new(
            self.this.clone(),
            self.tokens.clone(),
        )));
        state.post_actions.push(Arc::new(TracingPostAction));
        if state.config.highlight_on_locate {
            state.locator_actions.push(Arc::new(HighlightLocatorAction));
        }

        Self::insert_action(state, |_| ClickItemAction::default());
        Self::insert_action(state, |repo| EnterDataAction::new(repo.tokens()));
        Self::insert_action(state, |_| GetItemValueAction::default());
        Self::insert_action(state, |_| ValidateItemAction::default());
        Self::insert_action(state, |_| ValidateListAction::default());
        Self::insert_action(state, |_| GetListItemByIndexAction::default());
        Self::insert_action(state, |_| GetListItemByCriteriaAction::default());
        Self::insert_action(state, |_| ValidateListRowCountAction::default());
        Self::insert_action(state, |repo| WaitForElementAction::new(repo.default_wait_timeout()));
        Self::insert_action(state, |_| HighlightItemAction::default());

        state.initialized = true;
        tracing::debug!(
            comparers = state.comparers.len(),
            actions = state.actions.len(),
            highlight = state.config.highlight_on_locate,
            "initialized action repository"
        );
    }

    fn insert_action<A, F>(state: &mut RepositoryState, factory: F)
    where
        A: Action + 'static,
        F: Fn(&Self) -> A + Send + Sync + 'static,
    {
        let factory: ActionFactory =
            Arc::new(move |repo: &Self| -> Box<dyn Action> { Box::new(factory(repo)) });
        state
            .actions
            .insert(TypeId::of::<A>(), (type_name::<A>(), factory));
    }

    /// Add a pre-action
    pub fn register_pre_action(&self, action: Arc<dyn PreAction>) {
        self.write().pre_actions.push(action);
    }

    /// Add a post-action
    pub fn register_post_action(&self, action: Arc<dyn PostAction>) {
        self.write().post_actions.push(action);
    }

    /// Add a locator hook
    pub fn register_locator_action(&self, action: Arc<dyn LocatorAction>) {
        self.write().locator_actions.push(action);
    }

    /// Add a comparer; it is consulted after the ones already registered
    pub fn register_comparer(&self, comparer: Arc<dyn ValidationComparer>) {
        self.write().comparers.push(comparer);
    }

    /// Register (or replace) the factory for `A`
    pub fn register_action<A, F>(&self, factory: F)
    where
        A: Action + 'static,
        F: Fn(&Self) -> A + Send + Sync + 'static,
    {
        Self::insert_action(&mut self.write(), factory);
    }

    /// Registered pre-actions, in registration order
    #[must_use]
    pub fn pre_actions(&self) -> Vec<Arc<dyn PreAction>> {
        self.read().pre_actions.clone()
    }

    /// Registered post-actions
    #[must_use]
    pub fn post_actions(&self) -> Vec<Arc<dyn PostAction>> {
        self.read().post_actions.clone()
    }

    /// Registered locator hooks
    #[must_use]
    pub fn locator_actions(&self) -> Vec<Arc<dyn LocatorAction>> {
        self.read().locator_actions.clone()
    }

    /// Registered comparers
    #[must_use]
    pub fn comparers(&self) -> Vec<Arc<dyn ValidationComparer>> {
        self.read().comparers.clone()
    }

    /// Token store shared with the validation pre-action and data entry
    #[must_use]
    pub fn tokens(&self) -> TokenManager {
        self.tokens.clone()
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> PagebindConfig {
        self.read().config.clone()
    }

    /// Timeout used by waits that do not name one
    #[must_use]
    pub fn default_wait_timeout(&self) -> Duration {
        self.read().config.default_wait_timeout()
    }

    /// Fresh instance of `A`
    ///
    /// # Errors
    /// Returns [`PageError::ActionNotRegistered`] when no factory for `A`
    /// is registered
    pub fn create_action<A: Action + 'static>(&self) -> PageResult<Box<dyn Action>> {
        let factory = self
            .read()
            .actions
            .get(&TypeId::of::<A>())
            .map(|(_, factory)| Arc::clone(factory))
            .ok_or_else(|| PageError::ActionNotRegistered {
                name: type_name::<A>().to_string(),
            })?;
        Ok(factory(self))
    }

    /// Type names of the registered actions, sorted
    #[must_use]
    pub fn action_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.read().actions.values().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::action::{ActionContext, ActionValue, ElementLocator};
    use crate::validation::EqualsComparer;

    #[derive(Debug, Default)]
    struct Noop;

    impl Action for Noop {
        fn name(&self) -> &str {
            "Noop"
        }

        fn set_element_locator(&mut self, _locator: ElementLocator) {}

        fn execute(&self, _context: &ActionContext) -> PageResult<ActionValue> {
            Ok(ActionValue::Unit)
        }
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn test_empty_before_initialize() {
            let repo = ActionRepository::new();
            assert!(!repo.is_initialized());
            assert!(repo.pre_actions().is_empty());
            assert!(repo.post_actions().is_empty());
            assert!(repo.locator_actions().is_empty());
            assert!(repo.comparers().is_empty());
            assert!(repo.create_action::<ClickItemAction>().is_err());
        }

        #[test]
        fn test_initialize_is_idempotent() {
            let repo = ActionRepository::new();
            repo.initialize();
            let comparers = repo.comparers().len();
            let actions = repo.action_names().len();
            repo.initialize();
            assert_eq!(repo.comparers().len(), comparers);
            assert_eq!(repo.action_names().len(), actions);
            assert_eq!(repo.pre_actions().len(), 1);
            assert_eq!(repo.post_actions().len(), 1);
            assert!(repo.locator_actions().is_empty());
            assert_eq!(actions, 10);
        }

        #[test]
        fn test_reinitialize_drops_explicit_registrations() {
            let repo = ActionRepository::new();
            repo.initialize();
            repo.register_comparer(Arc::new(EqualsComparer));
            repo.register_action(|_| Noop);
            let before = repo.comparers().len();

            repo.reinitialize();
            assert_eq!(repo.comparers().len(), before - 1);
            assert!(repo.create_action::<Noop>().is_err());
            assert!(repo.is_initialized());
        }

        #[test]
        fn test_config_enables_highlight_and_tokens() {
            let repo = ActionRepository::new();
            let mut config = PagebindConfig {
                highlight_on_locate: true,
                default_wait_timeout_ms: 50,
                ..PagebindConfig::default()
            };
            config.tokens.insert("customer".into(), "ACME".into());
            repo.initialize_with(&config);

            assert_eq!(repo.locator_actions().len(), 1);
            assert_eq!(repo.tokens().expand("{customer}"), "ACME");
            assert_eq!(repo.default_wait_timeout(), Duration::from_millis(50));

            repo.reinitialize();
            assert_eq!(repo.locator_actions().len(), 1);
        }
    }

    mod action_factory_tests {
        use super::*;

        #[test]
        fn test_factory_receives_repository() {
            let repo = ActionRepository::new();
            repo.tokens().set_token("who", "Ann");
            repo.register_action(|r| EnterDataAction::new(r.tokens()));
            let action = repo.create_action::<EnterDataAction>().unwrap();
            assert_eq!(action.name(), "EnterData");
            assert!(repo.create_action::<Noop>().is_err());
        }

        #[test]
        fn test_unregistered_action_names_type() {
            let repo = ActionRepository::new();
            match repo.create_action::<Noop>().unwrap_err() {
                PageError::ActionNotRegistered { name } => assert!(name.ends_with("Noop")),
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn test_builtin_actions_are_registered() {
            let repo = ActionRepository::new();
            repo.initialize();
            assert!(repo.create_action::<ClickItemAction>().is_ok());
            assert!(repo.create_action::<ValidateListAction>().is_ok());
            assert!(repo.action_names().iter().any(|n| n.ends_with("EnterDataAction")));
        }
    }
}
