use serde::Deserialize;

/// Body of `GET /api/v1/models`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelsBody {
    pub models: Vec<String>,
    #[serde(default)]
    pub count: usize,
}

/// Body of `GET /api/v1/auth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AuthBody {
    pub required: bool,
}

/// Machine-readable error body returned on non-success statuses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
}
