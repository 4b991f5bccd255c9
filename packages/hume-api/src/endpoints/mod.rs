//! Endpoint definitions for the Hume REST API.
//!
//! Each endpoint is a type implementing [`HumeEndpoint`]; the client turns
//! one into a request, sends it, and hands the response back to the endpoint
//! to produce its typed body.

pub(crate) use crate::error::{Error, Result};
pub(crate) use reqwest::{Method, Response, Url};
pub(crate) use serde::{Deserialize, Serialize};
pub(crate) use serde_json::Value;

pub mod tts;
pub mod voices;

pub(crate) type QueryValues = Vec<(&'static str, String)>;

#[derive(Debug)]
pub enum RequestBody {
    Json(Value),
    Empty,
}

#[allow(async_fn_in_trait)]
pub trait HumeEndpoint {
    const PATH: &'static str;

    const METHOD: Method;

    type ResponseBody;

    fn query_params(&self) -> Option<QueryValues> {
        None
    }

    fn request_body(&self) -> Result<RequestBody> {
        Ok(RequestBody::Empty)
    }

    async fn response_body(self, resp: Response) -> Result<Self::ResponseBody>;

    fn url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.set_path(Self::PATH);
        if let Some(params) = self.query_params() {
            url.query_pairs_mut().extend_pairs(params);
        }
        url
    }
}
