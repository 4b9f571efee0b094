//! Runs an action between its pre- and post-actions.

use super::{Action, ActionContext, ActionRepository, ActionResult, ElementLocator};
use crate::page::Page;
use crate::result::{ErrorList, PageError, PageResult};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::instrument;

/// Action pipeline over a repository
#[derive(Debug, Clone)]
pub struct ActionPipelineService {
    repository: Arc<ActionRepository>,
}

impl ActionPipelineService {
    /// Pipeline over `repository`
    #[must_use]
    pub const fn new(repository: Arc<ActionRepository>) -> Self {
        Self { repository }
    }

    /// Pipeline over the process-wide repository
    #[must_use]
    pub fn global() -> Self {
        Self::new(Arc::clone(ActionRepository::global()))
    }

    /// Repository in use
    #[must_use]
    pub const fn repository(&self) -> &Arc<ActionRepository> {
        &self.repository
    }

    /// Run `action` against `page`.
    ///
    /// Every pre-action runs even when an earlier one fails. A single
    /// failure is returned as is; several become [`PageError::Aggregate`]
    /// in invocation order. The action itself runs only when all
    /// pre-actions succeeded. Every post-action then sees the final result;
    /// their own failures are logged and never change it. A panic in any of
    /// these steps is reported as [`PageError::ActionFailed`] for that step.
    #[instrument(skip_all, fields(action = action.name(), page = page.name()))]
    pub fn perform_action(
        &self,
        page: &Arc<Page>,
        action: &mut dyn Action,
        context: &mut ActionContext,
    ) -> ActionResult {
        action.set_element_locator(ElementLocator::new(
            Arc::clone(page),
            self.repository.locator_actions(),
        ));

        let mut failures: Vec<Arc<PageError>> = Vec::new();
        for pre in self.repository.pre_actions() {
            if let Err(e) = guarded(pre.name(), || pre.perform(&*action, context)) {
                tracing::debug!(pre_action = pre.name(), error = %e, "pre-action failed");
                failures.push(Arc::new(e));
            }
        }

        let result = match failures.len() {
            0 => ActionResult::from(guarded(action.name(), || action.execute(context))),
            1 => ActionResult::failure(failures.remove(0)),
            _ => ActionResult::failure(Arc::new(PageError::Aggregate(ErrorList::new(failures)))),
        };

        for post in self.repository.post_actions() {
            if let Err(e) = guarded(post.name(), || post.perform(&*action, context, &result)) {
                tracing::warn!(post_action = post.name(), error = %e, "post-action failed");
            }
        }

        tracing::debug!(success = result.is_success(), "action complete");
        result
    }

    /// Resolve `A` from the repository and run it
    pub fn perform<A: Action + 'static>(
        &self,
        page: &Arc<Page>,
        context: &mut ActionContext,
    ) -> ActionResult {
        match self.repository.create_action::<A>() {
            Ok(mut action) => self.perform_action(page, action.as_mut(), context),
            Err(e) => ActionResult::failure(Arc::new(e)),
        }
    }
}

/// Run one pipeline step, reporting a panic as a failure of `step`
fn guarded<T>(step: &str, f: impl FnOnce() -> PageResult<T>) -> PageResult<T> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::error!(step, %message, "pipeline step panicked");
        Err(PageError::ActionFailed {
            action: step.to_string(),
            message: format!("panicked: {message}"),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::action::{ActionValue, PostAction, PreAction};
    use crate::builder::PageBuilder;
    use crate::mock::{MockDocument, MockNode};
    use crate::page_object::HtmlDocument;
    use crate::result::PageResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Journal {
        entries: Mutex<Vec<String>>,
    }

    impl Journal {
        fn push(&self, entry: impl Into<String>) {
            self.entries.lock().unwrap().push(entry.into());
        }

        fn entries(&self) -> Vec<String> {
            self.entries.lock().unwrap().clone()
        }
    }

    #[derive(Debug)]
    struct Step {
        journal: Arc<Journal>,
        fail: bool,
        located: bool,
    }

    impl Action for Step {
        fn name(&self) -> &str {
            "Step"
        }

        fn set_element_locator(&mut self, _locator: ElementLocator) {
            self.located = true;
        }

        fn execute(&self, _context: &ActionContext) -> PageResult<ActionValue> {
            self.journal.push(format!("execute located={}", self.located));
            if self.fail {
                Err(PageError::Driver {
                    message: "step broke".into(),
                })
            } else {
                Ok(ActionValue::Count(7))
            }
        }
    }

    #[derive(Debug)]
    struct Pre {
        name: &'static str,
        journal: Arc<Journal>,
        fail: bool,
    }

    impl PreAction for Pre {
        fn name(&self) -> &str {
            self.name
        }

        fn perform(&self, _action: &dyn Action, _context: &mut ActionContext) -> PageResult<()> {
            self.journal.push(format!("pre {}", self.name));
            if self.fail {
                Err(PageError::Driver {
                    message: format!("{} broke", self.name),
                })
            } else {
                Ok(())
            }
        }
    }

    #[derive(Debug)]
    struct Post {
        journal: Arc<Journal>,
        fail: bool,
        seen: Mutex<Vec<ActionResult>>,
    }

    impl PostAction for Post {
        fn name(&self) -> &str {
            "Post"
        }

        fn perform(
            &self,
            _action: &dyn Action,
            _context: &ActionContext,
            result: &ActionResult,
        ) -> PageResult<()> {
            self.journal.push(format!("post success={}", result.is_success()));
            self.seen.lock().unwrap().push(result.clone());
            if self.fail {
                Err(PageError::Driver {
                    message: "post broke".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    struct Harness {
        service: ActionPipelineService,
        journal: Arc<Journal>,
        post: Arc<Post>,
        page: Arc<Page>,
    }

    fn harness(pre_failures: &[bool], post_fails: bool) -> Harness {
        let repo = ActionRepository::new();
        let journal = Arc::new(Journal::default());
        for (i, fail) in pre_failures.iter().enumerate() {
            let name = ["first", "second", "third"][i];
            repo.register_pre_action(Arc::new(Pre {
                name,
                journal: Arc::clone(&journal),
                fail: *fail,
            }));
        }
        let post = Arc::new(Post {
            journal: Arc::clone(&journal),
            fail: post_fails,
            seen: Mutex::new(Vec::new()),
        });
        repo.register_post_action(Arc::clone(&post) as Arc<dyn PostAction>);

        let doc = MockDocument::new(MockNode::new("html"));
        let page = PageBuilder::new().build_page::<HtmlDocument>(&doc).unwrap();
        Harness {
            service: ActionPipelineService::new(repo),
            journal,
            post,
            page,
        }
    }

    fn step(harness: &Harness, fail: bool) -> Step {
        Step {
            journal: Arc::clone(&harness.journal),
            fail,
            located: false,
        }
    }

    mod ordering_tests {
        use super::*;

        #[test]
        fn test_success_runs_every_hook_once_in_order() {
            let h = harness(&[false, false, false], false);
            let mut action = step(&h, false);
            let result = h
                .service
                .perform_action(&h.page, &mut action, &mut ActionContext::new());

            assert!(result.is_success());
            assert!(matches!(result.result(), Some(ActionValue::Count(7))));
            assert_eq!(
                h.journal.entries(),
                vec![
                    "pre first",
                    "pre second",
                    "pre third",
                    "execute located=true",
                    "post success=true",
                ]
            );
        }

        #[test]
        fn test_action_error_reaches_post_actions() {
            let h = harness(&[false], false);
            let mut action = step(&h, true);
            let result = h
                .service
                .perform_action(&h.page, &mut action, &mut ActionContext::new());

            assert!(!result.is_success());
            let error = result.error().unwrap();
            assert!(error.to_string().contains("step broke"));
            let seen = h.post.seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert!(Arc::ptr_eq(seen[0].error().unwrap(), error));
        }

        #[test]
        fn test_post_action_failure_does_not_replace_result() {
            let h = harness(&[], true);
            let mut action = step(&h, false);
            let result = h
                .service
                .perform_action(&h.page, &mut action, &mut ActionContext::new());
            assert!(result.is_success());
        }
    }

    mod pre_action_failure_tests {
        use super::*;

        #[test]
        fn test_single_failure_is_returned_as_is() {
            let h = harness(&[false, true, false], false);
            let mut action = step(&h, false);
            let result = h
                .service
                .perform_action(&h.page, &mut action, &mut ActionContext::new());

            assert!(!result.is_success());
            assert!(matches!(&**result.error().unwrap(), PageError::Driver { message } if message == "second broke"));
            assert!(!h.journal.entries().iter().any(|e| e.starts_with("execute")));
            // every pre-action still ran, then the post-action saw the same error
            assert_eq!(h.journal.entries().len(), 4);
            let seen = h.post.seen.lock().unwrap();
            assert!(Arc::ptr_eq(seen[0].error().unwrap(), result.error().unwrap()));
        }

        #[test]
        fn test_several_failures_aggregate_in_order() {
            let h = harness(&[true, false, true], false);
            let mut action = step(&h, false);
            let result = h
                .service
                .perform_action(&h.page, &mut action, &mut ActionContext::new());

            match &**result.error().unwrap() {
                PageError::Aggregate(list) => {
                    let messages: Vec<String> = list.errors().iter().map(ToString::to_string).collect();
                    assert_eq!(messages.len(), 2);
                    assert!(messages[0].contains("first broke"));
                    assert!(messages[1].contains("third broke"));
                }
                other => panic!("unexpected error: {other}"),
            }
            assert!(!h.journal.entries().iter().any(|e| e.starts_with("execute")));
        }
    }

    mod panic_tests {
        use super::*;

        #[derive(Debug)]
        struct Exploding;

        impl Action for Exploding {
            fn name(&self) -> &str {
                "Exploding"
            }

            fn set_element_locator(&mut self, _locator: ElementLocator) {}

            fn execute(&self, _context: &ActionContext) -> PageResult<ActionValue> {
                panic!("driver exploded");
            }
        }

        #[derive(Debug)]
        struct ExplodingPre;

        impl PreAction for ExplodingPre {
            fn name(&self) -> &str {
                "ExplodingPre"
            }

            fn perform(&self, _action: &dyn Action, _context: &mut ActionContext) -> PageResult<()> {
                std::panic::panic_any(format!("{} lost its session", self.name()));
            }
        }

        #[derive(Debug)]
        struct ExplodingPost;

        impl PostAction for ExplodingPost {
            fn name(&self) -> &str {
                "ExplodingPost"
            }

            fn perform(
                &self,
                _action: &dyn Action,
                _context: &ActionContext,
                _result: &ActionResult,
            ) -> PageResult<()> {
                panic!("screenshot failed");
            }
        }

        #[test]
        fn test_panicking_action_fails_and_post_actions_still_run() {
            let h = harness(&[false], false);
            let result = h
                .service
                .perform_action(&h.page, &mut Exploding, &mut ActionContext::new());

            match &**result.error().unwrap() {
                PageError::ActionFailed { action, message } => {
                    assert_eq!(action, "Exploding");
                    assert_eq!(message, "panicked: driver exploded");
                }
                other => panic!("unexpected error: {other}"),
            }
            assert_eq!(h.journal.entries(), vec!["pre first", "post success=false"]);
            let seen = h.post.seen.lock().unwrap();
            assert!(Arc::ptr_eq(seen[0].error().unwrap(), result.error().unwrap()));
        }

        #[test]
        fn test_panicking_pre_action_aggregates_with_other_failures() {
            let h = harness(&[true], false);
            h.service.repository().register_pre_action(Arc::new(ExplodingPre));
            let mut action = step(&h, false);
            let result = h
                .service
                .perform_action(&h.page, &mut action, &mut ActionContext::new());

            match &**result.error().unwrap() {
                PageError::Aggregate(list) => {
                    assert_eq!(list.errors().len(), 2);
                    assert!(list.errors()[0].to_string().contains("first broke"));
                    assert!(matches!(
                        &*list.errors()[1],
                        PageError::ActionFailed { action, message }
                            if action == "ExplodingPre" && message.contains("lost its session")
                    ));
                }
                other => panic!("unexpected error: {other}"),
            }
            assert!(!h.journal.entries().iter().any(|e| e.starts_with("execute")));
        }

        #[test]
        fn test_panicking_post_action_keeps_the_result() {
            let h = harness(&[], false);
            h.service.repository().register_post_action(Arc::new(ExplodingPost));
            let mut action = step(&h, false);
            let result = h
                .service
                .perform_action(&h.page, &mut action, &mut ActionContext::new());

            assert!(result.is_success());
            assert_eq!(h.journal.entries(), vec!["execute located=true", "post success=true"]);
        }
    }

    mod resolve_tests {
        use super::*;

        #[derive(Debug, Default)]
        struct Counted;

        static RUNS: AtomicUsize = AtomicUsize::new(0);

        impl Action for Counted {
            fn name(&self) -> &str {
                "Counted"
            }

            fn set_element_locator(&mut self, _locator: ElementLocator) {}

            fn execute(&self, _context: &ActionContext) -> PageResult<ActionValue> {
                RUNS.fetch_add(1, Ordering::SeqCst);
                Ok(ActionValue::Unit)
            }
        }

        #[test]
        fn test_perform_resolves_from_repository() {
            let h = harness(&[], false);
            assert!(!h
                .service
                .perform::<Counted>(&h.page, &mut ActionContext::new())
                .is_success());

            h.service.repository().register_action(|_| Counted);
            assert!(h
                .service
                .perform::<Counted>(&h.page, &mut ActionContext::new())
                .is_success());
            assert_eq!(RUNS.load(Ordering::SeqCst), 1);
        }
    }
}
