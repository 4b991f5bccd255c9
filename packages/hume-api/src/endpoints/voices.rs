//! Voice library endpoints: list, create from a generation, delete.

use super::tts::VoiceProvider;
use super::*;

const VOICES_PATH: &str = "/v0/tts/voices";

/// Page through the voices visible to the account.
#[derive(Debug, Clone)]
pub struct ListVoices {
    pub provider: VoiceProvider,
    pub page_number: u32,
    pub page_size: u32,
}

impl Default for ListVoices {
    fn default() -> Self {
        Self {
            provider: VoiceProvider::CustomVoice,
            page_number: 0,
            page_size: 100,
        }
    }
}

impl HumeEndpoint for ListVoices {
    const PATH: &'static str = VOICES_PATH;

    const METHOD: Method = Method::GET;

    type ResponseBody = VoicesPage;

    fn query_params(&self) -> Option<QueryValues> {
        Some(vec![
            ("provider", self.provider.as_str().to_string()),
            ("page_number", self.page_number.to_string()),
            ("page_size", self.page_size.to_string()),
        ])
    }

    async fn response_body(self, resp: Response) -> Result<Self::ResponseBody> {
        Ok(resp.json().await?)
    }
}

/// Save a previous generation as a named, reusable voice.
#[derive(Debug, Clone, Serialize)]
pub struct CreateVoice {
    pub generation_id: String,
    pub name: String,
}

impl HumeEndpoint for CreateVoice {
    const PATH: &'static str = VOICES_PATH;

    const METHOD: Method = Method::POST;

    type ResponseBody = ReturnVoice;

    fn request_body(&self) -> Result<RequestBody> {
        Ok(RequestBody::Json(serde_json::to_value(self)?))
    }

    async fn response_body(self, resp: Response) -> Result<Self::ResponseBody> {
        Ok(resp.json().await?)
    }
}

/// Remove a custom voice by name.
#[derive(Debug, Clone)]
pub struct DeleteVoice {
    pub name: String,
}

impl HumeEndpoint for DeleteVoice {
    const PATH: &'static str = VOICES_PATH;

    const METHOD: Method = Method::DELETE;

    type ResponseBody = ();

    fn query_params(&self) -> Option<QueryValues> {
        Some(vec![("name", self.name.clone())])
    }

    async fn response_body(self, _resp: Response) -> Result<Self::ResponseBody> {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoicesPage {
    #[serde(default)]
    pub page_number: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_pages: u32,
    pub voices_page: Vec<ReturnVoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReturnVoice {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub provider: Option<VoiceProvider>,
}
