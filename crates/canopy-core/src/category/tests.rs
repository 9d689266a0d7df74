use super::*;
use crate::error::CategoryError;
use crate::events::{BeforeSaveHook, CategoryHooks, HookResult};
use crate::group::{CategoryGroup, GroupLocale};
use crate::storage::CategoryRepository;
use crate::test_support::{Call, MemoryBackend, RecordingObserver};
use crate::types::{ElementId, GroupId, SaveOutcome};
use crate::CategoryService;
use std::sync::Arc;

struct Fixture {
    backend: Arc<MemoryBackend>,
    service: CategoryService,
    observer: Arc<RecordingObserver>,
    group: GroupId,
}

impl Fixture {
    fn new() -> Self {
        Self::with(CategoryHooks::new(), LifecycleOptions::default(), 0)
    }

    fn with(hooks: CategoryHooks, options: LifecycleOptions, max_levels: u32) -> Self {
        let backend = MemoryBackend::new();
        let observer = Arc::new(RecordingObserver::new());
        let hooks = hooks.with_observer(observer.clone());
        let service = CategoryService::with_options(backend.backends(), hooks, options);

        let mut group = CategoryGroup::new("G1", "g1")
            .with_urls("g1/_category")
            .with_max_levels(max_levels)
            .with_locale(
                GroupLocale::new("en")
                    .with_url_format("categories/{slug}")
                    .with_nested_url_format("{parent.uri}/{slug}"),
            );
        assert!(service.groups().save(&mut group).unwrap().is_saved());
        backend.clear_calls();

        Self {
            backend,
            service,
            observer,
            group: group.id.unwrap(),
        }
    }

    fn lifecycle(&self) -> &CategoryLifecycle {
        self.service.categories()
    }

    fn create(&self, title: &str, parent: Option<ElementId>) -> Category {
        let mut category = Category::new(self.group, "en", title);
        if let Some(parent) = parent {
            category = category.with_parent(parent);
        }
        assert_eq!(self.lifecycle().save(&mut category).unwrap(), SaveOutcome::Saved);
        category
    }

    fn reload(&self, category: &Category) -> Category {
        self.lifecycle()
            .category_by_id(category.id.unwrap(), None)
            .unwrap()
            .unwrap()
    }
}

#[test]
fn test_top_level_and_child_scenario() {
    let fx = Fixture::new();

    let c1 = fx.create("C1", None);
    assert_eq!(c1.uri.as_deref(), Some("categories/c1"));
    assert_eq!(c1.level(), Some(1));

    let c2 = fx.create("C2", c1.id);
    assert_eq!(c2.level(), Some(c1.level().unwrap() + 1));
    assert_eq!(c2.uri.as_deref(), Some("categories/c1/c2"));
    assert!(fx
        .backend
        .calls()
        .contains(&Call::AppendUnder(c2.id.unwrap(), c1.id.unwrap())));
    assert_eq!(fx.observer.ids_for("after_save"), [c1.id.unwrap(), c2.id.unwrap()]);
}

#[test]
fn test_has_new_parent() {
    let fx = Fixture::new();
    let lifecycle = fx.lifecycle();
    let c1 = fx.create("C1", None);
    let c2 = fx.create("C2", c1.id);
    let c3 = fx.create("C3", None);

    assert!(lifecycle.has_new_parent(&Category::new(fx.group, "en", "New")).unwrap());

    let c2 = fx.reload(&c2);
    assert!(!lifecycle.has_new_parent(&c2).unwrap());

    let mut same = c2.clone();
    same.new_parent = NewParent::Parent(c1.id.unwrap());
    assert!(!lifecycle.has_new_parent(&same).unwrap());

    let mut other = c2.clone();
    other.new_parent = NewParent::Parent(c3.id.unwrap());
    assert!(lifecycle.has_new_parent(&other).unwrap());

    let mut to_root = c2;
    to_root.new_parent = NewParent::Root;
    assert!(lifecycle.has_new_parent(&to_root).unwrap());

    let mut top = fx.reload(&c3);
    top.new_parent = NewParent::Root;
    assert!(!lifecycle.has_new_parent(&top).unwrap());
    top.new_parent = NewParent::Parent(c1.id.unwrap());
    assert!(lifecycle.has_new_parent(&top).unwrap());
}

#[test]
fn test_move_to_root_and_back() {
    let fx = Fixture::new();
    let c1 = fx.create("C1", None);
    let c2 = fx.create("C2", c1.id);

    let mut moved = fx.reload(&c2);
    moved.new_parent = NewParent::Root;
    assert!(fx.lifecycle().save(&mut moved).unwrap().is_saved());
    assert_eq!(moved.level(), Some(1));
    assert_eq!(moved.uri.as_deref(), Some("categories/c2"));

    let mut back = fx.reload(&moved);
    back.new_parent = NewParent::Parent(c1.id.unwrap());
    assert!(fx.lifecycle().save(&mut back).unwrap().is_saved());
    assert_eq!(fx.reload(&back).level(), Some(2));
}

#[test]
fn test_move_updates_uris_in_every_locale() {
    let fx = Fixture::new();
    let mut group = fx.service.groups().group_by_id(fx.group).unwrap().unwrap();
    group.set_locale(
        GroupLocale::new("de")
            .with_url_format("kategorien/{slug}")
            .with_nested_url_format("{parent.uri}/{slug}"),
    );
    assert!(fx.service.groups().save(&mut group).unwrap().is_saved());

    let translate = |category: &Category| {
        let mut de = fx.reload(category);
        de.locale = "de".into();
        assert!(fx.lifecycle().save(&mut de).unwrap().is_saved());
    };
    let a = fx.create("A", None);
    translate(&a);
    let b = fx.create("B", None);
    translate(&b);
    let child = fx.create("Child", a.id);
    translate(&child);
    let leaf = fx.create("Leaf", child.id);
    translate(&leaf);
    assert_eq!(
        fx.backend.uri_of(child.id.unwrap(), "de").as_deref(),
        Some("kategorien/a/child")
    );

    let mut moved = fx
        .lifecycle()
        .category_by_id(child.id.unwrap(), Some(&"en".into()))
        .unwrap()
        .unwrap();
    moved.new_parent = NewParent::Parent(b.id.unwrap());
    assert!(fx.lifecycle().save(&mut moved).unwrap().is_saved());

    let child_id = child.id.unwrap();
    let leaf_id = leaf.id.unwrap();
    assert_eq!(fx.backend.uri_of(child_id, "en").as_deref(), Some("categories/b/child"));
    assert_eq!(fx.backend.uri_of(child_id, "de").as_deref(), Some("kategorien/b/child"));
    assert_eq!(fx.backend.uri_of(leaf_id, "de").as_deref(), Some("kategorien/b/child/leaf"));
}

#[test]
fn test_renaming_parent_updates_descendant_uris() {
    let fx = Fixture::new();
    let c1 = fx.create("C1", None);
    let c2 = fx.create("C2", c1.id);
    let c3 = fx.create("C3", c2.id);

    let mut renamed = fx.reload(&c1);
    renamed.slug = "renamed".to_string();
    assert!(fx.lifecycle().save(&mut renamed).unwrap().is_saved());

    assert!(fx
        .backend
        .calls()
        .contains(&Call::UpdateDescendantSlugsAndUris(c1.id.unwrap())));
    assert_eq!(
        fx.backend.uri_of(c3.id.unwrap(), "en").as_deref(),
        Some("categories/renamed/c2/c3")
    );
}

#[test]
fn test_missing_parent_is_not_found() {
    let fx = Fixture::new();
    let mut category = Category::new(fx.group, "en", "Orphan").with_parent(ElementId(999));

    let err = fx.lifecycle().save(&mut category).unwrap_err();
    assert!(matches!(err, CategoryError::CategoryNotFound { id } if id == ElementId(999)));
    assert!(fx.backend.calls().is_empty());
}

#[test]
fn test_validation_failures_open_no_transaction() {
    let fx = Fixture::new();

    let mut untitled = Category::new(fx.group, "en", "  ");
    assert_eq!(fx.lifecycle().save(&mut untitled).unwrap(), SaveOutcome::Invalid);
    assert!(untitled.errors().has("title"));

    let mut lost = Category::new(GroupId(12345), "en", "Lost");
    assert_eq!(fx.lifecycle().save(&mut lost).unwrap(), SaveOutcome::Invalid);
    assert!(lost.errors().has("groupId"));

    assert!(fx.backend.calls().is_empty());
}

#[test]
fn test_parent_must_be_in_same_group() {
    let fx = Fixture::new();
    let mut other_group = CategoryGroup::new("G2", "g2");
    assert!(fx.service.groups().save(&mut other_group).unwrap().is_saved());
    let mut foreign = Category::new(other_group.id.unwrap(), "en", "Foreign");
    assert!(fx.lifecycle().save(&mut foreign).unwrap().is_saved());

    let mut category = Category::new(fx.group, "en", "Local").with_parent(foreign.id.unwrap());
    assert_eq!(fx.lifecycle().save(&mut category).unwrap(), SaveOutcome::Invalid);
    assert!(category.errors().has("newParentId"));
    assert!(category.id.is_none());
}

#[test]
fn test_cannot_move_under_own_descendant() {
    let fx = Fixture::new();
    let c1 = fx.create("C1", None);
    let c2 = fx.create("C2", c1.id);

    let mut parent = fx.reload(&c1);
    parent.new_parent = NewParent::Parent(c2.id.unwrap());
    assert_eq!(fx.lifecycle().save(&mut parent).unwrap(), SaveOutcome::Invalid);
    assert!(parent.errors().has("newParentId"));

    let mut own = fx.reload(&c2);
    own.new_parent = NewParent::Parent(c2.id.unwrap());
    assert_eq!(fx.lifecycle().save(&mut own).unwrap(), SaveOutcome::Invalid);
}

#[test]
fn test_max_levels_enforced() {
    let fx = Fixture::with(CategoryHooks::new(), LifecycleOptions::default(), 2);
    let c1 = fx.create("C1", None);
    let c2 = fx.create("C2", c1.id);

    let mut deep = Category::new(fx.group, "en", "C3").with_parent(c2.id.unwrap());
    assert_eq!(fx.lifecycle().save(&mut deep).unwrap(), SaveOutcome::Invalid);
    assert!(deep.errors().has("newParentId"));

    // Moving C1 (which has a child) under another top-level category would
    // push C2 to level 3
    let c4 = fx.create("C4", None);
    let mut subtree = fx.reload(&c1);
    subtree.new_parent = NewParent::Parent(c4.id.unwrap());
    assert_eq!(fx.lifecycle().save(&mut subtree).unwrap(), SaveOutcome::Invalid);
}

#[test]
fn test_group_cannot_change() {
    let fx = Fixture::new();
    let mut other_group = CategoryGroup::new("G2", "g2");
    assert!(fx.service.groups().save(&mut other_group).unwrap().is_saved());
    let c1 = fx.create("C1", None);

    let mut moved = fx.reload(&c1);
    moved.group_id = other_group.id.unwrap();
    assert_eq!(fx.lifecycle().save(&mut moved).unwrap(), SaveOutcome::Invalid);
    assert!(moved.errors().has("groupId"));
}

#[test]
fn test_taken_uri_rolls_back() {
    let fx = Fixture::new();
    fx.create("C1", None);
    let elements = fx.backend.element_count();

    let mut twin = Category::new(fx.group, "en", "C1");
    assert_eq!(fx.lifecycle().save(&mut twin).unwrap(), SaveOutcome::Invalid);

    assert!(twin.errors().has("uri"));
    assert!(twin.id.is_none());
    assert_eq!(fx.backend.calls().last(), Some(&Call::Rollback));
    assert_eq!(fx.backend.element_count(), elements);
}

#[test]
fn test_storage_failure_rolls_back_new_category() {
    let fx = Fixture::new();
    fx.backend.fail_on("append_to_root");

    let mut category = Category::new(fx.group, "en", "C1");
    assert!(fx.lifecycle().save(&mut category).is_err());

    assert!(category.id.is_none());
    assert_eq!(fx.backend.element_count(), 0);
    assert_eq!(fx.backend.rolled_back(), 1);
    assert!(fx.observer.events().is_empty());
}

struct CancelWithSideEffect {
    backend: Arc<MemoryBackend>,
    group: GroupId,
}

impl BeforeSaveHook for CancelWithSideEffect {
    fn before_save(&self, _category: &mut Category, _is_new: bool) -> HookResult {
        self.backend
            .save_category_row(ElementId(777), self.group)
            .unwrap();
        HookResult::Cancel
    }
}

fn cancelling(policy: CancelPolicy) -> Fixture {
    let fx = Fixture::with(
        CategoryHooks::new(),
        LifecycleOptions {
            cancel_policy: policy,
        },
        0,
    );
    let hook = CancelWithSideEffect {
        backend: fx.backend.clone(),
        group: fx.group,
    };
    let hooks = CategoryHooks::new().with_before_save(Arc::new(hook));
    Fixture {
        service: CategoryService::with_options(
            fx.backend.backends(),
            hooks,
            LifecycleOptions {
                cancel_policy: policy,
            },
        ),
        ..fx
    }
}

#[test]
fn test_cancelled_save_commits_hook_writes() {
    let fx = cancelling(CancelPolicy::Commit);

    let mut category = Category::new(fx.group, "en", "C1");
    assert_eq!(fx.lifecycle().save(&mut category).unwrap(), SaveOutcome::Cancelled);

    assert!(category.id.is_none());
    assert!(!fx.backend.calls().iter().any(|c| matches!(c, Call::SaveElement(_))));
    assert_eq!(fx.backend.calls().last(), Some(&Call::Commit));
    assert_eq!(
        fx.backend.category_group_id(ElementId(777)).unwrap(),
        Some(fx.group)
    );
}

#[test]
fn test_cancelled_save_can_roll_back() {
    let fx = cancelling(CancelPolicy::Rollback);

    let mut category = Category::new(fx.group, "en", "C1");
    assert_eq!(fx.lifecycle().save(&mut category).unwrap(), SaveOutcome::Cancelled);

    assert_eq!(fx.backend.calls().last(), Some(&Call::Rollback));
    assert_eq!(fx.backend.category_group_id(ElementId(777)).unwrap(), None);
}

#[test]
fn test_delete_cascades_bottom_up() {
    let fx = Fixture::new();
    let c1 = fx.create("C1", None);
    let c2 = fx.create("C2", c1.id);
    let c3 = fx.create("C3", c2.id);
    let c4 = fx.create("C4", c2.id);
    let c5 = fx.create("C5", None);
    let id = |c: &Category| c.id.unwrap();
    fx.backend.clear_calls();

    assert!(fx.lifecycle().delete(&[fx.reload(&c1)]).unwrap());

    assert_eq!(
        fx.backend.writes(),
        [Call::DeleteByIds(vec![id(&c4), id(&c3), id(&c2), id(&c1)])]
    );
    assert_eq!(
        fx.observer.ids_for("before_delete"),
        [id(&c4), id(&c3), id(&c2), id(&c1)]
    );
    assert_eq!(fx.observer.ids_for("after_delete"), [id(&c1)]);
    assert!(fx.lifecycle().category_by_id(id(&c5), None).unwrap().is_some());
    assert!(fx.lifecycle().category_by_id(id(&c3), None).unwrap().is_none());
}

#[test]
fn test_delete_parent_and_child_collects_child_once() {
    let fx = Fixture::new();
    let c1 = fx.create("C1", None);
    let c2 = fx.create("C2", c1.id);
    fx.backend.clear_calls();

    let ids = [c1.id.unwrap(), c2.id.unwrap()];
    assert!(fx.lifecycle().delete_by_ids(&ids).unwrap());

    assert_eq!(fx.backend.writes(), [Call::DeleteByIds(vec![ids[1], ids[0]])]);
    assert_eq!(fx.observer.ids_for("after_delete"), ids);
}

#[test]
fn test_delete_nothing() {
    let fx = Fixture::new();
    assert!(!fx.lifecycle().delete(&[]).unwrap());
    assert!(!fx.lifecycle().delete_by_ids(&[ElementId(41)]).unwrap());
    assert!(fx.lifecycle().delete_by_id(ElementId(41)).unwrap_err().is_not_found());
    assert!(fx.backend.calls().is_empty());
}

#[test]
fn test_failed_delete_rolls_back_without_after_events() {
    let fx = Fixture::new();
    let c1 = fx.create("C1", None);
    fx.backend.fail_on("delete_by_ids");

    assert!(fx.lifecycle().delete_by_id(c1.id.unwrap()).is_err());

    assert_eq!(fx.backend.rolled_back(), 1);
    assert!(fx.observer.ids_for("after_delete").is_empty());
    assert!(fx.lifecycle().category_by_id(c1.id.unwrap(), None).unwrap().is_some());
}

#[test]
fn test_fill_gaps_adds_ancestors() {
    let fx = Fixture::new();
    let grandparent = fx.create("Grandparent", None);
    let parent = fx.create("Parent", grandparent.id);
    let grandchild = fx.create("Grandchild", parent.id);
    let sibling = fx.create("Sibling", None);

    let filled = fx.lifecycle().fill_gaps(&[grandchild.id.unwrap()]).unwrap();
    assert_eq!(
        filled,
        [grandparent.id.unwrap(), parent.id.unwrap(), grandchild.id.unwrap()]
    );

    let again = fx.lifecycle().fill_gaps(&filled).unwrap();
    assert_eq!(again, filled);

    let mixed = fx
        .lifecycle()
        .fill_gaps(&[sibling.id.unwrap(), parent.id.unwrap()])
        .unwrap();
    assert_eq!(
        mixed,
        [grandparent.id.unwrap(), parent.id.unwrap(), sibling.id.unwrap()]
    );

    assert!(fx.lifecycle().fill_gaps(&[]).unwrap().is_empty());
}
