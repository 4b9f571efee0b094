//! Repeated elements projected as pages.

use crate::builder::PageBuilder;
use crate::locator::LocatorExpr;
use crate::native::{ElementKind, NativeRef};
use crate::page::Page;
use crate::page_object::PageTypeRef;
use crate::result::{ErrorKind, PageError, PageResult};
use crate::validation::{
    FieldValidationResult, ItemValidationResult, ListComparison, ValidationResult, ValidationTable,
};
use std::sync::Arc;

/// Default upper bound on items enumerated from one list
const MAX_LIST_ITEMS: usize = 10_000;

/// A list property: items located under a container, each projected as a
/// page of the item type.
#[derive(Debug, Clone)]
pub struct ElementList {
    container: NativeRef,
    item_locator: LocatorExpr,
    item_type: PageTypeRef,
    item_kind: ElementKind,
    builder: PageBuilder,
    max_items: usize,
}

impl ElementList {
    pub(crate) fn new(
        container: NativeRef,
        item_locator: LocatorExpr,
        item_type: PageTypeRef,
        item_kind: ElementKind,
        builder: PageBuilder,
    ) -> Self {
        Self {
            container,
            item_locator,
            item_type,
            item_kind,
            builder,
            max_items: MAX_LIST_ITEMS,
        }
    }

    /// Same list with a different enumeration limit
    #[must_use]
    pub fn with_max_items(mut self, limit: usize) -> Self {
        self.max_items = limit;
        self
    }

    /// Most items [`ElementList::items`] will enumerate
    #[must_use]
    pub const fn max_items(&self) -> usize {
        self.max_items
    }

    /// Element the items are searched under
    #[must_use]
    pub fn container(&self) -> &NativeRef {
        &self.container
    }

    /// Item page type
    #[must_use]
    pub const fn item_type(&self) -> PageTypeRef {
        self.item_type
    }

    /// Native kind of each item
    #[must_use]
    pub const fn item_kind(&self) -> &ElementKind {
        &self.item_kind
    }

    /// Locator of the item at a 1-based position: a row position for table
    /// rows, the n-th match otherwise.
    #[must_use]
    pub fn item_locator(&self, position: u32) -> LocatorExpr {
        self.item_locator.clone().nth(position)
    }

    fn native_at(&self, index: usize) -> Option<NativeRef> {
        let position = u32::try_from(index).ok().filter(|p| *p > 0)?;
        let native = self.container.find(&self.item_locator(position));
        native.exists().then_some(native)
    }

    /// Item at a 1-based index, `None` past the end
    pub fn item_at(&self, index: usize) -> PageResult<Option<Arc<Page>>> {
        let Some(native) = self.native_at(index) else {
            return Ok(None);
        };
        let factory = self.builder.create_element_for(self.item_type)?;
        factory(native, None).map(Some)
    }

    /// One past the limit, so an overfull list is visible
    fn natives(&self) -> Vec<NativeRef> {
        self.container
            .find_all(&self.item_locator, self.max_items.saturating_add(1))
    }

    /// Every item in order.
    ///
    /// Fails with [`PageError::ListLimitExceeded`] rather than returning a
    /// truncated list.
    pub fn items(&self) -> PageResult<Vec<Arc<Page>>> {
        let natives = self.natives();
        if natives.len() > self.max_items {
            return Err(PageError::ListLimitExceeded {
                item_type: self.item_type.type_name().to_string(),
                limit: self.max_items,
            });
        }
        let factory = self.builder.create_element_for(self.item_type)?;
        natives.into_iter().map(|native| factory(native, None)).collect()
    }

    /// Number of items present, capped at [`ElementList::max_items`]
    #[must_use]
    pub fn count(&self) -> usize {
        let count = self.natives().len();
        if count > self.max_items {
            tracing::warn!(
                item_type = self.item_type.type_name(),
                limit = self.max_items,
                "list count reached its limit"
            );
            return self.max_items;
        }
        count
    }

    /// First item satisfying every validation
    pub fn find_item(&self, table: &ValidationTable) -> PageResult<Option<Arc<Page>>> {
        for (position, item) in self.items()?.into_iter().enumerate() {
            if validate_item_page(position + 1, &item, table)?.is_valid() {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    /// Judge the list against a table.
    ///
    /// `Equals` needs every item to pass and `Contains` at least one.
    /// `StartsWith` and `EndsWith` check only the first or last item and fail
    /// on an empty list. The negated modes need every item to fail. Any other
    /// mode is never valid.
    pub fn validate(
        &self,
        comparison: &ListComparison,
        table: &ValidationTable,
    ) -> PageResult<ValidationResult> {
        let items = self.items()?;
        let mut result = ValidationResult::new(items.len());

        let check = |position: usize, result: &mut ValidationResult| -> PageResult<bool> {
            let outcome = validate_item_page(position, &items[position - 1], table)?;
            let passed = outcome.is_valid();
            result.push_item(outcome);
            Ok(passed)
        };

        let is_valid = match comparison {
            ListComparison::Equals => {
                let mut all = true;
                for position in 1..=items.len() {
                    all &= check(position, &mut result)?;
                }
                all
            }
            ListComparison::Contains => {
                let mut any = false;
                for position in 1..=items.len() {
                    if check(position, &mut result)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            ListComparison::StartsWith => !items.is_empty() && check(1, &mut result)?,
            ListComparison::EndsWith => !items.is_empty() && check(items.len(), &mut result)?,
            ListComparison::DoesNotContain | ListComparison::DoesNotEqual => {
                let mut none = true;
                for position in 1..=items.len() {
                    none &= !check(position, &mut result)?;
                }
                none
            }
            ListComparison::Other(mode) => {
                tracing::debug!(mode = %mode, "unrecognized list comparison");
                false
            }
        };
        result.is_valid = is_valid;

        tracing::debug!(
            item_type = self.item_type.type_name(),
            items = result.item_count,
            valid = result.is_valid,
            %comparison,
            "validated list"
        );
        Ok(result)
    }
}

/// Evaluate every validation of `table` against one projected item.
///
/// A field the item does not declare passes only under a comparer that
/// tolerates absence; element failures on the item count as a failed field.
pub(crate) fn validate_item_page(
    position: usize,
    item: &Arc<Page>,
    table: &ValidationTable,
) -> PageResult<ItemValidationResult> {
    let mut fields = Vec::with_capacity(table.len());
    for validation in table {
        let comparer = validation.comparer()?;
        let outcome = match item.get_property(&validation.field_name()) {
            Some(property) => match property.validate_item(validation) {
                Ok(outcome) => outcome,
                Err(e) if e.kind() == ErrorKind::ElementExecute => FieldValidationResult {
                    field: validation.raw_field_name().to_string(),
                    rule: validation.raw_comparison_type().to_string(),
                    expected: validation.comparison_value().to_string(),
                    actual: None,
                    is_valid: false,
                },
                Err(e) => return Err(e),
            },
            None => FieldValidationResult {
                field: validation.raw_field_name().to_string(),
                rule: validation.raw_comparison_type().to_string(),
                expected: validation.comparison_value().to_string(),
                actual: None,
                is_valid: comparer.tolerates_missing_field(),
            },
        };
        fields.push(outcome);
    }
    Ok(ItemValidationResult {
        index: position,
        fields,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::locator::LocatorMetadata;
    use crate::mock::{MockDocument, MockNode};
    use crate::page_object::{PageDescriptor, PageModel};
    use crate::validation::{builtin_comparers, TokenManager};

    struct UserRow;

    impl PageModel for UserRow {
        fn descriptor() -> PageDescriptor {
            PageDescriptor::builder("UserRow")
                .element("Name", ElementKind::Generic, LocatorMetadata::tag("td").with_class("name"))
                .element("Role", ElementKind::Generic, LocatorMetadata::tag("td").with_class("role"))
                .build()
        }
    }

    struct Users;

    impl PageModel for Users {
        fn descriptor() -> PageDescriptor {
            PageDescriptor::builder("Users")
                .document()
                .list::<UserRow>("Rows", ElementKind::TableRow, LocatorMetadata::new())
                .build()
        }
    }

    fn row(name: &str, role: &str) -> MockNode {
        MockNode::new("tr")
            .child(MockNode::new("td").class("name").text(name))
            .child(MockNode::new("td").class("role").text(role))
    }

    fn users(rows: Vec<MockNode>) -> MockDocument {
        MockDocument::new(MockNode::new("html").child(MockNode::new("table").children(rows)))
    }

    fn rows(doc: &MockDocument) -> ElementList {
        let page = PageBuilder::new().build_page::<Users>(doc).unwrap();
        page.list("rows").unwrap()
    }

    fn table(rows: &[(&str, &str, &str)]) -> ValidationTable {
        let mut table = ValidationTable::new();
        for (f, r, v) in rows {
            table.add_validation(*f, *r, *v);
        }
        table.bind_all(&builtin_comparers(), &TokenManager::new()).unwrap();
        table
    }

    fn three_users() -> MockDocument {
        users(vec![row("Ann", "admin"), row("Bob", "user"), row("Cid", "user")])
    }

    mod enumeration_tests {
        use super::*;

        #[test]
        fn test_table_rows_use_row_positions() {
            let doc = three_users();
            let list = rows(&doc);
            assert!(matches!(list.item_locator(2), LocatorExpr::Row { position: 2, .. }));
            assert_eq!(list.count(), 3);
            let second = list.item_at(2).unwrap().unwrap();
            assert_eq!(
                second.get_property("name").unwrap().current_value().unwrap().as_deref(),
                Some("Bob")
            );
            assert!(list.item_at(0).unwrap().is_none());
            assert!(list.item_at(4).unwrap().is_none());
        }

        #[test]
        fn test_enumeration_limit_is_an_error_not_a_truncation() {
            let doc = three_users();
            let list = rows(&doc);
            assert_eq!(list.max_items(), MAX_LIST_ITEMS);
            assert_eq!(list.clone().with_max_items(3).items().unwrap().len(), 3);

            let capped = list.with_max_items(2);
            assert_eq!(capped.count(), 2);
            let err = capped.items().unwrap_err();
            assert!(matches!(err, PageError::ListLimitExceeded { limit: 2, .. }));
            assert_eq!(err.kind(), ErrorKind::ElementExecute);
            assert!(capped
                .validate(&ListComparison::Contains, &table(&[("name", "equals", "Ann")]))
                .is_err());
        }

        #[test]
        fn test_find_item_returns_first_match() {
            let doc = three_users();
            let found = rows(&doc)
                .find_item(&table(&[("role", "equals", "user")]))
                .unwrap()
                .unwrap();
            assert_eq!(
                found.get_property("name").unwrap().current_value().unwrap().as_deref(),
                Some("Bob")
            );
            assert!(rows(&doc)
                .find_item(&table(&[("name", "equals", "Dee")]))
                .unwrap()
                .is_none());
        }
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn test_contains_with_single_matching_item() {
            let doc = three_users();
            let result = rows(&doc)
                .validate(
                    &ListComparison::Contains,
                    &table(&[("name", "equals", "Bob"), ("role", "equals", "user")]),
                )
                .unwrap();
            assert!(result.is_valid);
            assert_eq!(result.item_count, 3);
        }

        #[test]
        fn test_equals_requires_every_item() {
            let doc = three_users();
            let list = rows(&doc);
            assert!(!list
                .validate(&ListComparison::Equals, &table(&[("role", "equals", "user")]))
                .unwrap()
                .is_valid);
            assert!(list
                .validate(&ListComparison::Equals, &table(&[("name", "ends with", "")]))
                .unwrap()
                .is_valid);
        }

        #[test]
        fn test_starts_and_ends_with_check_one_item() {
            let doc = three_users();
            let list = rows(&doc);
            let admin = table(&[("role", "equals", "admin")]);
            assert!(list.validate(&ListComparison::StartsWith, &admin).unwrap().is_valid);
            assert!(!list.validate(&ListComparison::EndsWith, &admin).unwrap().is_valid);
            let result = list.validate(&ListComparison::EndsWith, &admin).unwrap();
            assert_eq!(result.checked_items.len(), 1);
            assert_eq!(result.checked_items[0].index, 3);
        }

        #[test]
        fn test_ends_with_judges_the_last_of_many() {
            let doc = users(vec![
                row("Ann", "admin"),
                row("Bob", "user"),
                row("Cid", "user"),
                row("Dee", "guest"),
                row("Eve", "owner"),
            ]);
            let list = rows(&doc);
            let result = list
                .validate(&ListComparison::EndsWith, &table(&[("name", "equals", "Eve")]))
                .unwrap();
            assert!(result.is_valid);
            assert_eq!(result.item_count, 5);
            assert_eq!(result.checked_items.len(), 1);
            assert_eq!(result.checked_items[0].index, 5);
            assert!(!list
                .validate(&ListComparison::EndsWith, &table(&[("name", "equals", "Dee")]))
                .unwrap()
                .is_valid);
        }

        #[test]
        fn test_empty_list_fails_starts_with() {
            let doc = users(Vec::new());
            let result = rows(&doc)
                .validate(&ListComparison::StartsWith, &table(&[("name", "equals", "x")]))
                .unwrap();
            assert!(!result.is_valid);
            assert_eq!(result.item_count, 0);
        }

        #[test]
        fn test_negated_modes_need_every_item_to_fail() {
            let doc = three_users();
            let list = rows(&doc);
            let guest = table(&[("role", "equals", "guest")]);
            let user = table(&[("role", "equals", "user")]);
            assert!(list.validate(&ListComparison::DoesNotContain, &guest).unwrap().is_valid);
            assert!(!list.validate(&ListComparison::DoesNotEqual, &user).unwrap().is_valid);
        }

        #[test]
        fn test_other_mode_is_never_valid() {
            let doc = three_users();
            let result = rows(&doc)
                .validate(&ListComparison::Other("roughly".into()), &table(&[]))
                .unwrap();
            assert!(!result.is_valid);
        }

        #[test]
        fn test_missing_field_only_passes_for_does_not_contain() {
            let doc = three_users();
            let list = rows(&doc);
            let absent = table(&[("email", "does not contain", "@")]);
            assert!(list.validate(&ListComparison::Equals, &absent).unwrap().is_valid);
            let required = table(&[("email", "contains", "@")]);
            let result = list.validate(&ListComparison::Equals, &required).unwrap();
            assert!(!result.is_valid);
            assert!(result.report().contains("[x] email contains '@'"));
        }

        #[test]
        fn test_unbound_table_is_an_error() {
            let doc = three_users();
            let unbound = ValidationTable::new().with("name", "equals", "Ann");
            assert!(rows(&doc).validate(&ListComparison::Equals, &unbound).is_err());
        }
    }
}
