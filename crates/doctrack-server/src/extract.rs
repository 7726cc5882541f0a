//! Request extractors: the authenticated caller and mixed JSON/multipart
//! bodies.

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Path, Query, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::extract::{CookieJar, WithRejection};
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use doctrack_core::models::user::User;
use doctrack_core::policy::Caller;
use doctrack_records::Upload;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Name of the HTTP-only cookie carrying the access token.
pub const TOKEN_COOKIE: &str = "token";

/// Standard extractors whose rejections render as [`ApiError`] bodies.
pub type JsonBody<T> = WithRejection<Json<T>, ApiError>;
pub type QueryParams<T> = WithRejection<Query<T>, ApiError>;
pub type PathParam<T> = WithRejection<Path<T>, ApiError>;

/// The authenticated principal, resolved from `Authorization: Bearer` or,
/// failing that, the `token` cookie.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub caller: Caller,
    pub user: User,
    pub session_id: Uuid,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(Authorization(bearer))| bearer.token().to_owned());
        let token = bearer
            .or_else(|| {
                CookieJar::from_headers(&parts.headers)
                    .get(TOKEN_COOKIE)
                    .map(|c| c.value().to_owned())
            })
            .filter(|t| !t.is_empty())
            .ok_or_else(ApiError::unauthenticated)?;

        let authenticated = state.auth.authenticate(&token).await?;
        Ok(Self {
            caller: Caller::from(&authenticated.user),
            user: authenticated.user,
            session_id: authenticated.session_id,
        })
    }
}

/// A body accepted either as JSON or as `multipart/form-data`. Text parts
/// become fields of `T`; file parts are kept with their form field name.
#[derive(Debug)]
pub struct FormOrJson<T> {
    pub data: T,
    pub files: Vec<(String, Upload)>,
}

impl<T> FormOrJson<T> {
    /// Files sent under `name`, `name[]` or `name[i]`, in upload order.
    pub fn take_files(&mut self, name: &str) -> Vec<Upload> {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(field, _)| {
                field == name || field.strip_prefix(name).is_some_and(|s| s.starts_with('['))
            });
        self.files = rest;
        matching.into_iter().map(|(_, upload)| upload).collect()
    }
}

impl<S, T> FromRequest<S> for FormOrJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if !is_multipart {
            let Json(data) = Json::<T>::from_request(req, state).await?;
            return Ok(Self {
                data,
                files: Vec::new(),
            });
        }

        let mut multipart = Multipart::from_request(req, state).await?;
        let mut fields = Map::new();
        let mut files = Vec::new();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_owned);
                    let bytes = field.bytes().await?;
                    files.push((
                        name,
                        Upload {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    ));
                }
                None => {
                    let text = field.text().await?;
                    fields.insert(name, Value::String(text));
                }
            }
        }

        let data = serde_json::from_value(Value::Object(fields))
            .map_err(|e| ApiError::bad_input("body", e.to_string()))?;
        Ok(Self { data, files })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str) -> Upload {
        Upload {
            file_name: name.into(),
            content_type: None,
            bytes: vec![],
        }
    }

    #[test]
    fn take_files_matches_array_style_names() {
        let mut form = FormOrJson {
            data: (),
            files: vec![
                ("images[]".into(), upload("a.png")),
                ("file".into(), upload("doc.pdf")),
                ("images[1]".into(), upload("b.png")),
                ("imagesX".into(), upload("c.png")),
            ],
        };
        let images: Vec<String> = form
            .take_files("images")
            .into_iter()
            .map(|u| u.file_name)
            .collect();
        assert_eq!(images, ["a.png", "b.png"]);
        assert_eq!(form.files.len(), 2);
        assert_eq!(form.take_files("file").len(), 1);
    }
}
