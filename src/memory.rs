//! In-process store behind `STORE_BACKEND=memory`.
//!
//! Mirrors the PostgreSQL schema closely enough that handlers cannot tell
//! the two apart: serial ids, a unique email, and a restricting foreign key
//! from products to categories.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{NewUser, User},
    },
    categories::{
        repo::CategoryRepo,
        repo_types::{Category, CategoryDraft},
    },
    error::{RepoError, RepoResult},
    password_reset::{repo::ResetRepo, repo_types::ResetRequest},
    products::{
        query::ProductQuery,
        repo::ProductRepo,
        repo_types::{Product, ProductInput},
    },
};

#[derive(Debug, Clone)]
struct ProductRecord {
    id: i64,
    name: String,
    description: Option<String>,
    price: Decimal,
    stock: i32,
    category_id: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    categories: BTreeMap<i64, Category>,
    products: BTreeMap<i64, ProductRecord>,
    resets: BTreeMap<i64, ResetRequest>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn hydrate(&self, record: &ProductRecord) -> RepoResult<Product> {
        let category = self
            .categories
            .get(&record.category_id)
            .cloned()
            .ok_or(RepoError::ForeignKeyViolation)?;
        Ok(Product {
            id: record.id,
            name: record.name.clone(),
            description: record.description.clone(),
            price: record.price,
            stock: record.stock,
            category,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let t = self.inner.read().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> RepoResult<User> {
        let mut t = self.inner.write().await;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(RepoError::UniqueViolation);
        }
        let id = t.next_id();
        let row = User {
            id,
            email: user.email,
            password_hash: user.password_hash,
            roles: user.roles,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.insert(id, row.clone());
        Ok(row)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> RepoResult<()> {
        let mut t = self.inner.write().await;
        if let Some(user) = t.users.get_mut(&id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryRepo for MemoryStore {
    async fn list(&self) -> RepoResult<Vec<Category>> {
        Ok(self.inner.read().await.categories.values().cloned().collect())
    }

    async fn find(&self, id: i64) -> RepoResult<Option<Category>> {
        Ok(self.inner.read().await.categories.get(&id).cloned())
    }

    async fn insert(&self, draft: &CategoryDraft) -> RepoResult<Category> {
        let mut t = self.inner.write().await;
        let id = t.next_id();
        let row = Category {
            id,
            name: draft.name.clone(),
            description: draft.description.clone(),
        };
        t.categories.insert(id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: i64, draft: &CategoryDraft) -> RepoResult<Option<Category>> {
        let mut t = self.inner.write().await;
        Ok(t.categories.get_mut(&id).map(|c| {
            c.name = draft.name.clone();
            c.description = draft.description.clone();
            c.clone()
        }))
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let mut t = self.inner.write().await;
        if t.products.values().any(|p| p.category_id == id) {
            return Err(RepoError::ForeignKeyViolation);
        }
        Ok(t.categories.remove(&id).is_some())
    }
}

#[async_trait]
impl ProductRepo for MemoryStore {
    async fn list(&self, query: &ProductQuery) -> RepoResult<(Vec<Product>, i64)> {
        let t = self.inner.read().await;
        let mut matching = Vec::new();
        for record in t.products.values() {
            let product = t.hydrate(record)?;
            if query.matches(&product) {
                matching.push(product);
            }
        }
        matching.sort_by(|a, b| query.compare(a, b));

        let total = matching.len() as i64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(0);
        let page = matching.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    async fn find(&self, id: i64) -> RepoResult<Option<Product>> {
        let t = self.inner.read().await;
        t.products.get(&id).map(|r| t.hydrate(r)).transpose()
    }

    async fn insert(&self, input: &ProductInput) -> RepoResult<Product> {
        let mut t = self.inner.write().await;
        if !t.categories.contains_key(&input.category_id) {
            return Err(RepoError::ForeignKeyViolation);
        }
        let id = t.next_id();
        let now = OffsetDateTime::now_utc();
        let record = ProductRecord {
            id,
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.price,
            stock: input.stock,
            category_id: input.category_id,
            created_at: now,
            updated_at: now,
        };
        let product = t.hydrate(&record)?;
        t.products.insert(id, record);
        Ok(product)
    }

    async fn update(&self, id: i64, input: &ProductInput) -> RepoResult<Option<Product>> {
        let mut t = self.inner.write().await;
        if !t.categories.contains_key(&input.category_id) {
            return Err(RepoError::ForeignKeyViolation);
        }
        let Some(record) = t.products.get_mut(&id) else {
            return Ok(None);
        };
        record.name = input.name.clone();
        record.description = input.description.clone();
        record.price = input.price;
        record.stock = input.stock;
        record.category_id = input.category_id;
        record.updated_at = OffsetDateTime::now_utc();
        let record = record.clone();
        t.hydrate(&record).map(Some)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        Ok(self.inner.write().await.products.remove(&id).is_some())
    }
}

#[async_trait]
impl ResetRepo for MemoryStore {
    async fn replace_for_user(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> RepoResult<ResetRequest> {
        let mut t = self.inner.write().await;
        t.resets.retain(|_, r| r.user_id != user_id);
        let id = t.next_id();
        let row = ResetRequest {
            id,
            user_id,
            token_hash: token_hash.to_string(),
            expires_at,
        };
        t.resets.insert(id, row.clone());
        Ok(row)
    }

    async fn take_valid(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> RepoResult<Option<ResetRequest>> {
        let mut t = self.inner.write().await;
        let id = t
            .resets
            .values()
            .find(|r| r.token_hash == token_hash && r.is_live(now))
            .map(|r| r.id);
        Ok(id.and_then(|id| t.resets.remove(&id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    async fn seed_user(store: &MemoryStore, email: &str) -> User {
        UserRepo::create(
            store,
            NewUser {
                email: email.into(),
                password_hash: "hash".into(),
                roles: vec!["ROLE_USER".into()],
            },
        )
        .await
        .expect("create user")
    }

    fn input(name: &str, category_id: i64) -> ProductInput {
        ProductInput {
            name: name.into(),
            description: None,
            price: Decimal::new(100, 2),
            stock: 1,
            category_id,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let store = MemoryStore::new();
        seed_user(&store, "a@x.com").await;
        let err = UserRepo::create(
            &store,
            NewUser {
                email: "a@x.com".into(),
                password_hash: "other".into(),
                roles: vec![],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::UniqueViolation));
    }

    #[tokio::test]
    async fn referenced_category_cannot_be_deleted() {
        let store = MemoryStore::new();
        let cat = CategoryRepo::insert(
            &store,
            &CategoryDraft {
                name: "Books".into(),
                description: None,
            },
        )
        .await
        .unwrap();
        let product = ProductRepo::insert(&store, &input("Dune", cat.id)).await.unwrap();

        let err = CategoryRepo::delete(&store, cat.id).await.unwrap_err();
        assert!(matches!(err, RepoError::ForeignKeyViolation));

        assert!(ProductRepo::delete(&store, product.id).await.unwrap());
        assert!(CategoryRepo::delete(&store, cat.id).await.unwrap());
        assert!(!CategoryRepo::delete(&store, cat.id).await.unwrap());
    }

    #[tokio::test]
    async fn product_insert_checks_category() {
        let store = MemoryStore::new();
        let err = ProductRepo::insert(&store, &input("Orphan", 99)).await.unwrap_err();
        assert!(matches!(err, RepoError::ForeignKeyViolation));
    }

    #[tokio::test]
    async fn update_refreshes_updated_at_only() {
        let store = MemoryStore::new();
        let cat = CategoryRepo::insert(
            &store,
            &CategoryDraft {
                name: "Books".into(),
                description: None,
            },
        )
        .await
        .unwrap();
        let created = ProductRepo::insert(&store, &input("Dune", cat.id)).await.unwrap();
        let updated = ProductRepo::update(&store, created.id, &input("Dune II", cat.id))
            .await
            .unwrap()
            .expect("exists");
        assert_eq!(updated.name, "Dune II");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);

        assert!(ProductRepo::update(&store, 999, &input("x", cat.id))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn reset_requests_are_single_use_and_expire() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "r@x.com").await;
        let now = OffsetDateTime::now_utc();

        store
            .replace_for_user(user.id, "old", now + Duration::hours(1))
            .await
            .unwrap();
        let issued = store
            .replace_for_user(user.id, "new", now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(issued.token_hash, "new");
        assert_eq!(issued.expires_at, now + Duration::hours(1));
        assert!(store.take_valid("old", now).await.unwrap().is_none());

        // expired at the time of redemption
        assert!(store
            .take_valid("new", now + Duration::hours(2))
            .await
            .unwrap()
            .is_none());

        let taken = store.take_valid("new", now).await.unwrap().expect("live");
        assert_eq!(taken.user_id, user.id);
        assert!(store.take_valid("new", now).await.unwrap().is_none());
    }
}
