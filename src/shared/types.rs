use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub meta: Option<Meta>,
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Meta {
    pub total: i64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: Option<T>, message: Option<String>, meta: Option<Meta>) -> Self {
        Self {
            success: true,
            data,
            message,
            meta,
            errors: None,
        }
    }

    pub fn error(message: Option<String>, errors: Option<Vec<String>>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message,
            meta: None,
            errors,
        }
    }
}

/// Sort direction for public search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchOrder {
    #[default]
    Newest,
    Oldest,
}

impl SearchOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SearchOrder::Newest => "DESC",
            SearchOrder::Oldest => "ASC",
        }
    }
}

/// Ordering mode for the public feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FeedOrder {
    #[default]
    Newest,
    Random,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_order_sql() {
        assert_eq!(SearchOrder::Newest.as_sql(), "DESC");
        assert_eq!(SearchOrder::Oldest.as_sql(), "ASC");
    }

    #[test]
    fn test_orders_deserialize_lowercase() {
        let order: SearchOrder = serde_json::from_str("\"oldest\"").unwrap();
        assert_eq!(order, SearchOrder::Oldest);
        let feed: FeedOrder = serde_json::from_str("\"random\"").unwrap();
        assert_eq!(feed, FeedOrder::Random);
    }

    #[test]
    fn test_error_response_shape() {
        let body = ApiResponse::<()>::error(Some("nope".to_string()), None);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "nope");
    }
}
