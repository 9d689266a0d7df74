//! Shared setup for the SQLite integration tests

#![allow(dead_code)]

use canopy_core::storage::{Backends, PermissionChecker, TemplateResolver};
use canopy_core::types::UserId;
use canopy_core::{Category, CategoryGroup, CategoryService, GroupLocale, SaveOutcome};
use canopy_sqlite::{create_backends, SqlitePool};
use std::collections::HashSet;
use std::sync::Arc;

/// Permission keys granted to user 1
pub struct Grants(pub HashSet<String>);

impl PermissionChecker for Grants {
    fn check(&self, permission: &str, user: UserId) -> bool {
        user == UserId(1) && self.0.contains(permission)
    }
}

pub struct Templates(pub HashSet<String>);

impl TemplateResolver for Templates {
    fn site_template_exists(&self, path: &str) -> bool {
        self.0.contains(path)
    }
}

pub fn backends(pool: &SqlitePool) -> Backends {
    create_backends(
        pool.clone(),
        Arc::new(Grants(HashSet::new())),
        Arc::new(Templates(["topics/_category".to_string()].into_iter().collect())),
    )
}

pub fn setup() -> (SqlitePool, CategoryService) {
    let pool = SqlitePool::memory().expect("memory pool");
    let service = CategoryService::new(backends(&pool));
    (pool, service)
}

pub fn en() -> GroupLocale {
    GroupLocale::new("en")
        .with_url_format("categories/{slug}")
        .with_nested_url_format("{parent.uri}/{slug}")
}

pub fn de() -> GroupLocale {
    GroupLocale::new("de")
        .with_url_format("kategorien/{slug}")
        .with_nested_url_format("{parent.uri}/{slug}")
}

pub fn save_group(service: &CategoryService, mut group: CategoryGroup) -> CategoryGroup {
    let outcome = service.groups().save(&mut group).expect("group save");
    assert_eq!(outcome, SaveOutcome::Saved, "errors: {}", group.errors());
    group
}

pub fn topics(service: &CategoryService) -> CategoryGroup {
    save_group(
        service,
        CategoryGroup::new("Topics", "topics")
            .with_urls("topics/_category")
            .with_locale(en()),
    )
}

pub fn create(
    service: &CategoryService,
    group: &CategoryGroup,
    title: &str,
    parent: Option<&Category>,
) -> Category {
    let mut category = Category::new(group.id.expect("saved group"), "en", title);
    if let Some(parent) = parent {
        category = category.with_parent(parent.id.expect("saved parent"));
    }
    let outcome = service.categories().save(&mut category).expect("category save");
    assert_eq!(outcome, SaveOutcome::Saved, "errors: {}", category.errors());
    category
}

pub fn count(pool: &SqlitePool, sql: &str) -> i64 {
    pool.with_connection(|conn| Ok(conn.query_row(sql, [], |row| row.get(0))?))
        .expect("count query")
}
