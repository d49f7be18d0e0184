use thiserror::Error;

/// A metric template that cannot be compiled into an exact-match pattern.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateError {
    #[error("unbalanced parentheses at offset {offset} in metric template: {template}")]
    UnbalancedParentheses { template: String, offset: usize },

    #[error("metric template {template} does not compile to a valid pattern: {source}")]
    InvalidPattern {
        template: String,
        #[source]
        source: regex::Error,
    },
}

/// Raised while loading settings or the metric registry. Never raised during collection.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("invalid metric template for {component} property {property_id}: {source}")]
    Template {
        component: String,
        property_id: String,
        #[source]
        source: TemplateError,
    },

    #[error(
        "property {property_id} of {component} references ${placeholder} but metric template {metric} has only \
         {captures} capture groups"
    )]
    Placeholder {
        component: String,
        property_id: String,
        metric: String,
        placeholder: usize,
        captures: usize,
    },

    #[error("invalid settings: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("invalid collector request header: {0}")]
    Header(String),

    #[error("invalid collector url: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to build collector HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl From<reqwest::header::InvalidHeaderName> for ConfigurationError {
    fn from(error: reqwest::header::InvalidHeaderName) -> Self {
        Self::Header(error.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for ConfigurationError {
    fn from(error: reqwest::header::InvalidHeaderValue) -> Self {
        Self::Header(error.to_string())
    }
}

/// Topology lookups backing the liveness gate and collector endpoint resolution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("no collector topology known for cluster: {0}")]
    UnknownCluster(String),

    #[error("collector topology lookup failed for cluster {cluster}: {reason}")]
    Lookup { cluster: String, reason: String },
}

impl TopologyError {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::UnknownCluster(_) => "topology::unknown_cluster",
            Self::Lookup { .. } => "topology::lookup",
        }
    }
}

/// Failure of a single collector fetch. Recovered at the batch boundary.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("failed to build collector query url: {0}")]
    Url(#[from] url::ParseError),

    #[error("collector url cannot be a base to query: {0}")]
    NotABaseUrl(url::Url),

    #[error("timeline metrics API call failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("error occurred in HTTP middleware calling the collector: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    #[error("failed processing timeline metrics JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Topology(#[from] TopologyError),
}

impl CollectionError {
    /// Label used for the error-type dimension of collection metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Url(_) => "http::url",
            Self::NotABaseUrl(_) => "http::url::NotABaseUrl",
            Self::HttpRequest(err) if err.is_timeout() => "http::timeout",
            Self::HttpRequest(err) if err.is_status() => "http::status",
            Self::HttpRequest(_) => "http::request",
            Self::HttpMiddleware(_) => "http::middleware",
            Self::Json(_) => "http::json",
            Self::Topology(err) => err.label(),
        }
    }
}
