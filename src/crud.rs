// ===============================
// src/crud.rs
// ===============================
//
// 1:1 mapping of create/read/update/delete onto a REST collection.
// No retry, no idempotency keys, no optimistic concurrency: failures are
// returned verbatim.
//
use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use tracing::info;
use validator::Validate;

use crate::catalog::{
    Category, CategoryRequest, Product, ProductRequest, Provider, ProviderRequest, Role,
    RoleRequest, Schedule, ScheduleRequest, Store, StoreRequest, User, UserRequest, Worker,
    WorkerRequest,
};
use crate::error::Result;
use crate::http::ApiClient;

pub struct Repository<Req, Res> {
    api: ApiClient,
    path: &'static str,
    _types: PhantomData<fn(&Req) -> Res>,
}

impl<Req, Res> Clone for Repository<Req, Res> {
    fn clone(&self) -> Self {
        Self { api: self.api.clone(), path: self.path, _types: PhantomData }
    }
}

impl<Req, Res> Repository<Req, Res>
where
    Req: Serialize + Validate + Sync,
    Res: DeserializeOwned,
{
    pub fn new(api: ApiClient, path: &'static str) -> Self {
        Self { api, path, _types: PhantomData }
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    fn item(&self, id: i64) -> String {
        format!("{}/{}", self.path, id)
    }

    pub async fn list(&self) -> Result<Vec<Res>> {
        Ok(self.api.get_optional(self.path).await?.unwrap_or_default())
    }

    pub async fn get(&self, id: i64) -> Result<Res> {
        self.api.get(&self.item(id)).await
    }

    pub async fn create(&self, req: &Req) -> Result<Res> {
        req.validate()?;
        let res = self.api.post(self.path, req).await?;
        info!(path = self.path, "created");
        Ok(res)
    }

    pub async fn update(&self, id: i64, req: &Req) -> Result<Res> {
        req.validate()?;
        let res = self.api.put(&self.item(id), req).await?;
        info!(path = self.path, id, "updated");
        Ok(res)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.api.delete(&self.item(id)).await?;
        info!(path = self.path, id, "deleted");
        Ok(())
    }
}

pub type CategoryRepository = Repository<CategoryRequest, Category>;
pub type ProductRepository = Repository<ProductRequest, Product>;
pub type ProviderRepository = Repository<ProviderRequest, Provider>;
pub type RoleRepository = Repository<RoleRequest, Role>;
pub type ScheduleRepository = Repository<ScheduleRequest, Schedule>;
pub type StoreRepository = Repository<StoreRequest, Store>;
pub type WorkerRepository = Repository<WorkerRequest, Worker>;
pub type UserRepository = Repository<UserRequest, User>;

pub fn categories(api: ApiClient) -> CategoryRepository {
    Repository::new(api, "/api/categories")
}

pub fn products(api: ApiClient) -> ProductRepository {
    Repository::new(api, "/api/products")
}

pub fn providers(api: ApiClient) -> ProviderRepository {
    Repository::new(api, "/api/providers")
}

pub fn roles(api: ApiClient) -> RoleRepository {
    Repository::new(api, "/api/roles")
}

pub fn schedules(api: ApiClient) -> ScheduleRepository {
    Repository::new(api, "/api/schedules")
}

pub fn stores(api: ApiClient) -> StoreRepository {
    Repository::new(api, "/api/stores")
}

pub fn workers(api: ApiClient) -> WorkerRepository {
    Repository::new(api, "/api/workers")
}

pub fn users(api: ApiClient) -> UserRepository {
    Repository::new(api, "/api/users")
}
