//! Extractors whose rejections render through [`ApiError`].

use axum::extract::{FromRequest, FromRequestParts};

use super::ApiError;

#[derive(FromRequestParts, Debug)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

/// JSON request body.
#[derive(FromRequest, Debug)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Payload<T>(pub T);
