//! Record service client (json-server style REST over `/categories`).
//!
//! | Method | Path               | Use                          |
//! |--------|--------------------|------------------------------|
//! | GET    | `/categories`      | load                         |
//! | POST   | `/categories`      | category created             |
//! | DELETE | `/categories/{id}` | category removed             |
//! | GET    | `/categories/{id}` | fetch before a session patch |
//! | PATCH  | `/categories/{id}` | rename, session list changes |
//!
//! Session changes fetch the category, edit its session list, then PATCH
//! the whole list back. Two overlapping patches against the same
//! category can overwrite each other (last write wins); nothing here
//! serializes them.

use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::json;
use url::Url;

use super::Persistence;
use crate::error::PersistenceError;
use crate::model::{Category, Id, TimerSession};
use crate::store::Change;

const MAX_MESSAGE_LEN: usize = 200;

#[derive(Debug, Clone)]
pub struct RecordClient {
    base: Url,
    http: Client,
}

impl RecordClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PersistenceError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { base, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn categories_url(&self) -> Result<Url, PersistenceError> {
        Ok(self.base.join("categories")?)
    }

    fn category_url(&self, id: &Id) -> Result<Url, PersistenceError> {
        let mut url = self.categories_url()?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .push(id.as_str());
        Ok(url)
    }

    /// Map non-2xx responses to `PersistenceError::Status`.
    async fn check(resp: Response) -> Result<Response, PersistenceError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let reason = status.canonical_reason().unwrap_or("request failed");
        let body = resp.text().await.unwrap_or_default();
        let message = match body.trim() {
            "" | "{}" => reason.to_string(),
            text => text.chars().take(MAX_MESSAGE_LEN).collect(),
        };
        Err(PersistenceError::Status {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, PersistenceError> {
        let resp = self.http.get(self.categories_url()?).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn create_category(&self, category: &Category) -> Result<Category, PersistenceError> {
        let resp = self
            .http
            .post(self.categories_url()?)
            .json(category)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn delete_category(&self, id: &Id) -> Result<(), PersistenceError> {
        let resp = self.http.delete(self.category_url(id)?).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn fetch_category(&self, id: &Id) -> Result<Category, PersistenceError> {
        let resp = self.http.get(self.category_url(id)?).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PersistenceError::MissingCategory(id.to_string()));
        }
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn patch_category(
        &self,
        id: &Id,
        fields: &serde_json::Value,
    ) -> Result<Category, PersistenceError> {
        let resp = self
            .http
            .patch(self.category_url(id)?)
            .json(fields)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Fetch the category, let `edit` change its sessions, patch them back.
    async fn edit_sessions<F>(&self, category_id: &Id, edit: F) -> Result<(), PersistenceError>
    where
        F: FnOnce(&mut Vec<TimerSession>),
    {
        let mut category = self.fetch_category(category_id).await?;
        edit(&mut category.sessions);
        self.patch_category(category_id, &json!({ "sessions": category.sessions }))
            .await?;
        Ok(())
    }
}

impl Persistence for RecordClient {
    async fn load(&self) -> Result<Vec<Category>, PersistenceError> {
        self.list_categories().await
    }

    async fn mirror(&self, change: &Change, _snapshot: &[Category]) -> Result<(), PersistenceError> {
        tracing::debug!(?change, "mirroring to record service");
        match change {
            Change::Loaded => Ok(()),
            Change::CategoryCreated(category) => {
                self.create_category(category).await?;
                Ok(())
            }
            Change::CategoryRenamed { id, name } => {
                self.patch_category(id, &json!({ "name": name })).await?;
                Ok(())
            }
            Change::CategoryRemoved(category) => self.delete_category(&category.id).await,
            Change::SessionAdded {
                category_id,
                session,
            } => {
                self.edit_sessions(category_id, |sessions| {
                    if !sessions.iter().any(|s| s.id == session.id) {
                        sessions.push(session.clone());
                    }
                })
                .await
            }
            Change::SessionUpdated {
                category_id,
                session,
            } => {
                self.edit_sessions(category_id, |sessions| {
                    match sessions.iter_mut().find(|s| s.id == session.id) {
                        Some(slot) => *slot = session.clone(),
                        None => sessions.push(session.clone()),
                    }
                })
                .await
            }
            Change::SessionRemoved {
                category_id,
                session_id,
            } => {
                self.edit_sessions(category_id, |sessions| {
                    sessions.retain(|s| &s.id != session_id);
                })
                .await
            }
        }
    }
}
