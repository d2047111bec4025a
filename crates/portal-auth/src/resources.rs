//! Resource API helpers for the hospital records the portal manages.
//!
//! Every call goes through [`SessionContext::authorized_call`], so a rejected
//! session is handled the same way no matter which resource noticed it.

use crate::api_client::{ApiRequest, Method};
use crate::session::SessionContext;
use crate::{AuthError, AuthResult};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use url::form_urlencoded;

/// A backend collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Patients,
    Doctors,
    Appointments,
    Staff,
    Beds,
}

/// How an update replaces the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    #[default]
    Full,
    Partial,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Patients,
        Resource::Doctors,
        Resource::Appointments,
        Resource::Staff,
        Resource::Beds,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Patients => "patients",
            Resource::Doctors => "doctors",
            Resource::Appointments => "appointments",
            Resource::Staff => "staff",
            Resource::Beds => "beds",
        }
    }

    pub fn collection_path(&self) -> String {
        format!("/{}/", self.name())
    }

    pub fn item_path(&self, id: i64) -> String {
        format!("/{}/{}/", self.name(), id)
    }

    /// Search endpoint for `query`, or `None` if the collection has no search.
    pub fn search_path(&self, query: &str) -> Option<String> {
        let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
        match self {
            Resource::Beds => None,
            // Staff search is a filter on the collection itself.
            Resource::Staff => Some(format!("/staff/?search={}", encoded)),
            _ => Some(format!("/{}/search/?search={}", self.name(), encoded)),
        }
    }

    pub fn stats_path(&self) -> String {
        format!("/{}/stats/", self.name())
    }

    /// Only doctors accept partial updates; everything else is replaced whole.
    pub fn update_method(&self, mode: UpdateMode) -> Method {
        match (self, mode) {
            (Resource::Doctors, UpdateMode::Partial) => Method::PATCH,
            _ => Method::PUT,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Resource::ALL
            .into_iter()
            .find(|r| r.name() == normalized)
            .ok_or_else(|| AuthError::Unsupported(format!("unknown resource: {}", s)))
    }
}

fn with_query(path: String, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return path;
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish();
    format!("{}?{}", path, query)
}

/// Typed access to the portal's resource endpoints.
#[derive(Clone)]
pub struct ResourceApi {
    session: Arc<SessionContext>,
}

impl ResourceApi {
    pub fn new(session: Arc<SessionContext>) -> Self {
        Self { session }
    }

    async fn send(&self, endpoint: &str, request: ApiRequest) -> AuthResult<Value> {
        debug!(method = %request.method, endpoint, "Resource call");
        let response = self.session.authorized_call(endpoint, request).await?;
        Ok(response.into_value())
    }

    /// List a collection, optionally filtered by query parameters.
    pub async fn list(&self, resource: Resource, params: &[(String, String)]) -> AuthResult<Value> {
        let endpoint = with_query(resource.collection_path(), params);
        self.send(&endpoint, ApiRequest::get()).await
    }

    pub async fn get(&self, resource: Resource, id: i64) -> AuthResult<Value> {
        self.send(&resource.item_path(id), ApiRequest::get()).await
    }

    pub async fn create(&self, resource: Resource, record: Value) -> AuthResult<Value> {
        self.send(&resource.collection_path(), ApiRequest::post(record))
            .await
    }

    pub async fn update(
        &self,
        resource: Resource,
        id: i64,
        record: Value,
        mode: UpdateMode,
    ) -> AuthResult<Value> {
        let request = ApiRequest::new(resource.update_method(mode)).with_body(record);
        self.send(&resource.item_path(id), request).await
    }

    pub async fn delete(&self, resource: Resource, id: i64) -> AuthResult<Value> {
        self.send(&resource.item_path(id), ApiRequest::delete()).await
    }

    pub async fn search(&self, resource: Resource, query: &str) -> AuthResult<Value> {
        let endpoint = resource
            .search_path(query)
            .ok_or_else(|| AuthError::Unsupported(format!("{} cannot be searched", resource)))?;
        self.send(&endpoint, ApiRequest::get()).await
    }

    pub async fn stats(&self, resource: Resource) -> AuthResult<Value> {
        self.send(&resource.stats_path(), ApiRequest::get()).await
    }

    pub async fn appointments_today(&self) -> AuthResult<Value> {
        self.send("/appointments/today/", ApiRequest::get()).await
    }

    pub async fn appointments_upcoming(&self) -> AuthResult<Value> {
        self.send("/appointments/upcoming/", ApiRequest::get())
            .await
    }
}
