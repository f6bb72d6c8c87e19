//! Signed vendor REST client for the catalog cross-check path.
//!
//! Every request is signed per `sign`; identifier batches are capped at 50
//! per call; and the vendor reports failures through an explicit error code
//! that must be checked even on HTTP 200.

mod sign;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub use sign::sign_request;

/// Identifier batch cap per vendor call.
pub const BATCH_LIMIT: usize = 50;

const PATH_ITEM_BASE_INFO: &str = "/api/v2/product/get_item_base_info";
const PATH_GET_MODEL_LIST: &str = "/api/v2/product/get_model_list";

/// Partner API configuration. The signing key never lives in the config
/// file; only the name of the environment variable holding it does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerApiSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub partner_id: i64,

    /// Environment variable carrying the partner signing key.
    #[serde(default = "default_partner_key_env")]
    pub partner_key_env: String,
}

fn default_host() -> String {
    "https://partner.shopeemobile.com".to_string()
}

fn default_partner_key_env() -> String {
    "SHOPEE_PARTNER_KEY".to_string()
}

impl Default for PartnerApiSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            partner_id: 0,
            partner_key_env: default_partner_key_env(),
        }
    }
}

/// Per-shop access credentials.
#[derive(Debug, Clone)]
pub struct ShopCredentials {
    pub shop_id: i64,
    pub access_token: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error {code}: {message}")]
    Api { code: String, message: String },
    #[error("missing configuration: {0}")]
    Config(String),
}

/// Generic vendor response envelope. `error` is set (non-empty string or
/// non-zero number) on failure even when the HTTP status is 200.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    response: Option<T>,
}

/// True when the envelope's error field actually signals an error.
fn error_code_present(error: &Value) -> bool {
    match error {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_i64() != Some(0),
        _ => true,
    }
}

impl<T> Envelope<T> {
    fn into_response(self) -> Result<Option<T>, ApiError> {
        if let Some(error) = &self.error {
            if error_code_present(error) {
                return Err(ApiError::Api {
                    code: error.to_string(),
                    message: self.message.unwrap_or_default(),
                });
            }
        }
        Ok(self.response)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ItemListResponse {
    #[serde(default)]
    item_list: Vec<ItemBaseInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemBaseInfo {
    pub item_id: i64,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_info: Option<DescriptionInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DescriptionInfo {
    #[serde(default)]
    pub extended_description: Option<ExtendedDescription>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtendedDescription {
    #[serde(default)]
    pub field_list: Vec<DescriptionField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescriptionField {
    #[serde(default)]
    pub field_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl ItemBaseInfo {
    /// Extended description text fields joined by newline, falling back to
    /// the plain description field.
    pub fn description_text(&self) -> Option<String> {
        let extended: Vec<&str> = self
            .description_info
            .as_ref()
            .and_then(|info| info.extended_description.as_ref())
            .map(|ext| {
                ext.field_list
                    .iter()
                    .filter(|f| f.field_type == "text")
                    .filter_map(|f| f.text.as_deref())
                    .collect()
            })
            .unwrap_or_default();
        if !extended.is_empty() {
            return Some(extended.join("\n"));
        }
        self.description.clone().filter(|d| !d.is_empty())
    }
}

/// A named axis of variation options (vendor term: tier variation).
#[derive(Debug, Clone, Deserialize)]
pub struct TierVariation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub option_list: Vec<TierOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TierOption {
    #[serde(default)]
    pub option: String,
    #[serde(default)]
    pub image: Option<TierImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TierImage {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelListResponse {
    #[serde(default)]
    pub tier_variation: Vec<TierVariation>,
}

impl ModelListResponse {
    /// Flatten to (option name, image URL) pairs in tier order.
    pub fn options(&self) -> Vec<(String, Option<String>)> {
        self.tier_variation
            .iter()
            .flat_map(|tier| tier.option_list.iter())
            .map(|opt| {
                (
                    opt.option.clone(),
                    opt.image.as_ref().and_then(|i| i.image_url.clone()),
                )
            })
            .collect()
    }
}

/// Signed partner API client.
pub struct PartnerClient {
    http: reqwest::Client,
    settings: PartnerApiSettings,
    partner_key: Vec<u8>,
}

impl PartnerClient {
    pub fn new(settings: PartnerApiSettings) -> Result<Self, ApiError> {
        if settings.partner_id == 0 {
            return Err(ApiError::Config("partner_api.partner_id is not set".into()));
        }
        let partner_key = std::env::var(&settings.partner_key_env)
            .map_err(|_| {
                ApiError::Config(format!(
                    "environment variable {} is not set",
                    settings.partner_key_env
                ))
            })?
            .into_bytes();
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            settings,
            partner_key,
        })
    }

    fn signed_url(&self, path: &str, shop: &ShopCredentials) -> String {
        let timestamp = chrono::Utc::now().timestamp();
        let sign = sign_request(
            &self.partner_key,
            self.settings.partner_id,
            path,
            timestamp,
            &shop.access_token,
            shop.shop_id,
        );
        format!(
            "{host}{path}?sign={sign}&shop_id={shop_id}&partner_id={partner_id}\
             &access_token={token}&timestamp={timestamp}",
            host = self.settings.host,
            shop_id = shop.shop_id,
            partner_id = self.settings.partner_id,
            token = shop.access_token,
        )
    }

    /// Fetch base info for up to `BATCH_LIMIT` identifiers per call,
    /// chunking transparently.
    pub async fn item_base_info(
        &self,
        shop: &ShopCredentials,
        item_ids: &[i64],
    ) -> Result<Vec<ItemBaseInfo>, ApiError> {
        let mut items = Vec::with_capacity(item_ids.len());
        for chunk in item_ids.chunks(BATCH_LIMIT) {
            items.extend(self.item_base_info_chunk(shop, chunk).await?);
        }
        Ok(items)
    }

    async fn item_base_info_chunk(
        &self,
        shop: &ShopCredentials,
        item_ids: &[i64],
    ) -> Result<Vec<ItemBaseInfo>, ApiError> {
        let id_list = item_ids
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let url = format!(
            "{}&item_id_list={id_list}&need_tax_info=false&need_complaint_policy=false\
             &fields=item_id,item_name,description,image,tier_variation",
            self.signed_url(PATH_ITEM_BASE_INFO, shop)
        );

        debug!("fetching base info for {} item(s)", item_ids.len());
        let envelope: Envelope<ItemListResponse> = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(envelope.into_response()?.unwrap_or_default().item_list)
    }

    /// Fetch the tier-variation/model list for a single item.
    pub async fn model_list(
        &self,
        shop: &ShopCredentials,
        item_id: i64,
    ) -> Result<ModelListResponse, ApiError> {
        let url = format!("{}&item_id={item_id}", self.signed_url(PATH_GET_MODEL_LIST, shop));

        debug!("fetching model list for item {item_id}");
        let envelope: Envelope<ModelListResponse> = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(envelope.into_response()?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_zero_error_codes_are_success() {
        assert!(!error_code_present(&Value::String(String::new())));
        assert!(!error_code_present(&Value::from(0)));
        assert!(!error_code_present(&Value::Null));
        assert!(error_code_present(&Value::String("error_auth".into())));
        assert!(error_code_present(&Value::from(10012)));
    }

    #[test]
    fn envelope_with_error_code_fails_despite_http_200() {
        let envelope: Envelope<ItemListResponse> = serde_json::from_str(
            r#"{"error":"error_param","message":"item_id_list invalid","response":null}"#,
        )
        .unwrap();
        let err = envelope.into_response().unwrap_err();
        match err {
            ApiError::Api { code, message } => {
                assert!(code.contains("error_param"));
                assert_eq!(message, "item_id_list invalid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn extended_description_wins_over_plain() {
        let item: ItemBaseInfo = serde_json::from_str(
            r#"{
                "item_id": 1,
                "item_name": "widget",
                "description": "plain",
                "description_info": {
                    "extended_description": {
                        "field_list": [
                            {"field_type": "text", "text": "line one"},
                            {"field_type": "image", "text": null},
                            {"field_type": "text", "text": "line two"}
                        ]
                    }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(item.description_text().as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn plain_description_is_the_fallback() {
        let item: ItemBaseInfo =
            serde_json::from_str(r#"{"item_id":1,"item_name":"w","description":"plain"}"#).unwrap();
        assert_eq!(item.description_text().as_deref(), Some("plain"));
    }

    #[test]
    fn tier_variations_flatten_in_order() {
        let response: ModelListResponse = serde_json::from_str(
            r#"{
                "tier_variation": [
                    {"name": "Color", "option_list": [
                        {"option": "Red", "image": {"image_url": "https://img/red.jpg"}},
                        {"option": "Blue"}
                    ]},
                    {"name": "Size", "option_list": [{"option": "M"}]}
                ]
            }"#,
        )
        .unwrap();
        let options = response.options();
        assert_eq!(
            options,
            vec![
                ("Red".to_string(), Some("https://img/red.jpg".to_string())),
                ("Blue".to_string(), None),
                ("M".to_string(), None),
            ]
        );
    }

    #[test]
    fn batch_limit_matches_vendor_cap() {
        let ids: Vec<i64> = (0..120).collect();
        let chunks: Vec<_> = ids.chunks(BATCH_LIMIT).collect();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= 50));
    }
}
