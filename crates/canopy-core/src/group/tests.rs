use super::*;
use crate::category::Category;
use crate::error::CategoryError;
use crate::storage::Boundary;
use crate::test_support::{Call, MemoryBackend};
use crate::types::{GroupId, LocaleId, SaveOutcome, UserId};
use crate::{CategoryService, FieldLayout};
use std::sync::Arc;

fn setup() -> (Arc<MemoryBackend>, CategoryService) {
    let backend = MemoryBackend::new();
    let service = CategoryService::new(backend.backends());
    (backend, service)
}

fn en() -> GroupLocale {
    GroupLocale::new("en")
        .with_url_format("categories/{slug}")
        .with_nested_url_format("{parent.uri}/{slug}")
}

fn de() -> GroupLocale {
    GroupLocale::new("de")
        .with_url_format("kategorien/{slug}")
        .with_nested_url_format("{parent.uri}/{slug}")
}

fn topics() -> CategoryGroup {
    CategoryGroup::new("Topics", "topics")
        .with_urls("topics/_category")
        .with_locale(en())
}

fn saved(service: &CategoryService, mut group: CategoryGroup) -> CategoryGroup {
    assert_eq!(service.groups().save(&mut group).unwrap(), SaveOutcome::Saved);
    group
}

fn category(service: &CategoryService, group: &CategoryGroup, locale: &str, title: &str) -> Category {
    let mut category = Category::new(group.id.unwrap(), locale, title);
    assert_eq!(
        service.categories().save(&mut category).unwrap(),
        SaveOutcome::Saved
    );
    category
}

#[test]
fn test_save_new_group() {
    let (backend, service) = setup();
    let mut group = topics()
        .with_max_levels(3)
        .with_locale(de());
    group.field_layout = FieldLayout::default().with_field("description", false);

    assert_eq!(service.groups().save(&mut group).unwrap(), SaveOutcome::Saved);

    let id = group.id.unwrap();
    assert!(group.structure_id.is_some());
    assert!(group.field_layout_id.is_some());
    assert_eq!(backend.committed(), 1);
    assert!(backend.calls().contains(&Call::InsertGroupLocales(
        id,
        vec![LocaleId::from("de"), LocaleId::from("en")]
    )));

    let loaded = service.groups().group_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.max_levels, 3);
    assert_eq!(loaded.locales.len(), 2);
    assert_eq!(loaded.field_layout.fields.len(), 1);
}

#[test]
fn test_invalid_group_persists_nothing() {
    let (backend, service) = setup();
    let mut group = CategoryGroup::new("Topics", "topics")
        .with_urls("topics/_category")
        .with_locale(GroupLocale::new("en"));

    assert_eq!(service.groups().save(&mut group).unwrap(), SaveOutcome::Invalid);

    assert!(group.errors().has("urlFormat-en"));
    assert!(group.errors().has("nestedUrlFormat-en"));
    assert!(group.id.is_none());
    assert!(backend.calls().is_empty());
}

#[test]
fn test_group_without_urls_clears_formats_and_template() {
    let (_backend, service) = setup();
    let mut group = topics();
    group.has_urls = false;

    let group = saved(&service, group);

    assert_eq!(group.template, None);
    let locales = service.groups().group_locales(group.id.unwrap()).unwrap();
    let en = &locales[&LocaleId::from("en")];
    assert_eq!(en.url_format, None);
    assert_eq!(en.nested_url_format, None);
}

#[test]
fn test_single_level_group_stores_no_nested_format() {
    let (_backend, service) = setup();
    let group = saved(&service, topics().with_max_levels(1));

    let locales = service.groups().group_locales(group.id.unwrap()).unwrap();
    let en = &locales[&LocaleId::from("en")];
    assert_eq!(en.url_format.as_deref(), Some("categories/{slug}"));
    assert_eq!(en.nested_url_format, None);
}

#[test]
fn test_handle_and_name_must_be_unique() {
    let (_backend, service) = setup();
    saved(&service, topics());

    let mut twin = topics();
    assert_eq!(service.groups().save(&mut twin).unwrap(), SaveOutcome::Invalid);
    assert!(twin.errors().has("handle"));
    assert!(twin.errors().has("name"));
}

#[test]
fn test_update_missing_group_is_not_found() {
    let (_backend, service) = setup();
    let mut group = topics();
    group.id = Some(GroupId(404));

    let err = service.groups().save(&mut group).unwrap_err();
    assert!(matches!(err, CategoryError::GroupNotFound { id } if id == GroupId(404)));
}

#[test]
fn test_changed_url_format_updates_only_that_locale() {
    let (backend, service) = setup();
    let mut group = saved(&service, topics().with_locale(de()));

    let mut c1 = category(&service, &group, "en", "C1");
    c1.locale = LocaleId::from("de");
    c1.title = "K1".to_string();
    c1.slug.clear();
    assert!(service.categories().save(&mut c1).unwrap().is_saved());
    let id = c1.id.unwrap();
    assert_eq!(backend.uri_of(id, "de").as_deref(), Some("kategorien/k1"));

    backend.clear_calls();
    group.set_locale(
        GroupLocale::new("en")
            .with_url_format("topics/{slug}")
            .with_nested_url_format("{parent.uri}/{slug}"),
    );
    assert!(service.groups().save(&mut group).unwrap().is_saved());

    let updates: Vec<Call> = backend
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::UpdateSlugAndUri(..)))
        .collect();
    assert_eq!(updates, [Call::UpdateSlugAndUri(id, LocaleId::from("en"))]);
    assert_eq!(backend.uri_of(id, "en").as_deref(), Some("topics/c1"));
    assert_eq!(backend.uri_of(id, "de").as_deref(), Some("kategorien/k1"));
}

#[test]
fn test_dropped_locale_deletes_content() {
    let (backend, service) = setup();
    let mut group = saved(&service, topics().with_locale(de()));
    let mut c1 = category(&service, &group, "en", "C1");
    c1.locale = LocaleId::from("de");
    assert!(service.categories().save(&mut c1).unwrap().is_saved());
    let id = c1.id.unwrap();

    group.locales.remove(&LocaleId::from("de"));
    assert!(service.groups().save(&mut group).unwrap().is_saved());

    assert!(backend.has_content(id, "en"));
    assert!(!backend.has_content(id, "de"));
    let locales = service.groups().group_locales(group.id.unwrap()).unwrap();
    assert_eq!(locales.keys().collect::<Vec<_>>(), [&LocaleId::from("en")]);
}

#[test]
fn test_turning_off_urls_clears_uris() {
    let (backend, service) = setup();
    let mut group = saved(&service, topics());
    let c1 = category(&service, &group, "en", "C1");
    let id = c1.id.unwrap();
    assert!(backend.uri_of(id, "en").is_some());

    group.has_urls = false;
    assert!(service.groups().save(&mut group).unwrap().is_saved());

    assert!(backend.calls().contains(&Call::ClearUris(vec![id])));
    assert_eq!(backend.uri_of(id, "en"), None);
}

#[test]
fn test_failed_save_rolls_back() {
    let (backend, service) = setup();
    backend.fail_on("insert_group_locales");

    let mut group = topics();
    let err = service.groups().save(&mut group).unwrap_err();

    assert!(matches!(err, CategoryError::Storage(_)));
    assert!(group.id.is_none());
    assert!(group.structure_id.is_none());
    assert_eq!(backend.rolled_back(), 1);
    assert_eq!(backend.group_count(), 0);
    assert_eq!(backend.structure_count(), 0);
    assert_eq!(backend.layout_count(), 0);
}

#[test]
fn test_joined_boundary_leaves_transaction_to_caller() {
    let (backend, service) = setup();
    let mut group = topics();

    service
        .groups()
        .save_in(&mut group, Boundary::Joined)
        .unwrap();

    assert!(group.id.is_some());
    assert_eq!(backend.committed(), 0);
    assert!(!backend.calls().contains(&Call::Begin));
}

#[test]
fn test_delete_group_cascades() {
    let (backend, service) = setup();
    let mut topics_group = topics();
    topics_group.field_layout = FieldLayout::default().with_field("icon", false);
    let group = saved(&service, topics_group);
    let c1 = category(&service, &group, "en", "C1");
    let mut c2 = Category::new(group.id.unwrap(), "en", "C2").with_parent(c1.id.unwrap());
    assert!(service.categories().save(&mut c2).unwrap().is_saved());

    assert!(service.groups().delete_by_id(group.id.unwrap()).unwrap());

    assert_eq!(backend.group_count(), 0);
    assert_eq!(backend.structure_count(), 0);
    assert_eq!(backend.layout_count(), 0);
    assert_eq!(backend.element_count(), 0);
    assert_eq!(service.groups().group_by_id(group.id.unwrap()).unwrap(), None);
}

#[test]
fn test_delete_group_failure_restores_everything() {
    let (backend, service) = setup();
    let group = saved(&service, topics());
    let id = group.id.unwrap();
    category(&service, &group, "en", "C1");

    backend.fail_on("delete_group");
    assert!(service.groups().delete_by_id(id).is_err());

    let calls = backend.calls();
    assert!(calls.iter().any(|c| matches!(c, Call::DeleteByIds(_))));
    assert_eq!(calls.last(), Some(&Call::Rollback));
    assert_eq!(backend.group_count(), 1);
    assert_eq!(backend.element_count(), 1);
    assert_eq!(backend.layout_count(), 1);

    backend.clear_failures();
    let restored = service.groups().group_by_id(id).unwrap().unwrap();
    assert_eq!(restored.handle, "topics");
}

#[test]
fn test_delete_missing_group_is_not_found() {
    let (backend, service) = setup();
    let err = service.groups().delete_by_id(GroupId(7)).unwrap_err();
    assert!(err.is_not_found());
    assert!(backend.calls().is_empty());
}

#[test]
fn test_negative_cache_until_invalidated() {
    let (backend, service) = setup();
    assert_eq!(service.groups().group_by_id(GroupId(3)).unwrap(), None);

    // Written by a second store, as another process would
    let other = GroupStore::new(backend.backends());
    let group = {
        let mut group = topics();
        other.save(&mut group).unwrap();
        group
    };
    let id = group.id.unwrap();
    assert_eq!(id, GroupId(3));
    assert_eq!(service.groups().group_by_id(id).unwrap(), None);

    service.groups().invalidate_cache();
    assert_eq!(
        service.groups().group_by_id(id).unwrap().map(|g| g.handle),
        Some("topics".to_string())
    );
}

#[test]
fn test_group_by_handle_queries_fresh() {
    let (backend, service) = setup();
    assert!(service.groups().all_group_ids().unwrap().is_empty());

    let other = GroupStore::new(backend.backends());
    let mut group = topics();
    other.save(&mut group).unwrap();

    let found = service.groups().group_by_handle("topics").unwrap().unwrap();
    assert_eq!(found.id, group.id);
    assert_eq!(found.locales.len(), 1);
}

#[test]
fn test_all_groups_ordered_and_indexed() {
    let (_backend, service) = setup();
    saved(&service, topics());
    saved(&service, CategoryGroup::new("Colors", "colors"));

    let names: Vec<String> = service
        .groups()
        .all_groups()
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(names, ["Colors", "Topics"]);

    let by_handle = service.groups().all_groups_by(|g| g.handle.clone()).unwrap();
    assert!(by_handle.contains_key("colors"));
    assert_eq!(service.groups().total_groups().unwrap(), 2);
}

#[test]
fn test_editable_groups_follow_permissions() {
    let (backend, service) = setup();
    let topics = saved(&service, topics());
    saved(&service, CategoryGroup::new("Colors", "colors"));
    let user = UserId(5);
    backend.grant(CategoryGroup::edit_permission(topics.id.unwrap()), user);

    assert_eq!(service.groups().editable_group_ids(user).unwrap(), [topics.id.unwrap()]);
    let editable = service.groups().editable_groups(user).unwrap();
    assert_eq!(editable.len(), 1);
    assert_eq!(editable[0].handle, "topics");
    assert!(service.groups().editable_group_ids(UserId(6)).unwrap().is_empty());
}

#[test]
fn test_template_validity() {
    let (backend, service) = setup();
    let group = topics();
    assert!(!service.groups().is_group_template_valid(&group));

    backend.add_template("topics/_category");
    assert!(service.groups().is_group_template_valid(&group));

    let plain = CategoryGroup::new("Colors", "colors");
    assert!(!service.groups().is_group_template_valid(&plain));
}
