//! Connection settings shared by the built-in sources.

use serde::{Deserialize, Serialize};

/// Placeholder substituted with the ticker in endpoint URL templates.
pub const TICKER_PLACEHOLDER: &str = "{ticker}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub http_timeout_secs: u64,
    pub max_retries: u32,
    pub user_agent: String,
    pub fred_base_url: String,
    pub yahoo_base_url: String,
    pub cftc_base_url: String,
    /// SEC requires a contact string in the User-Agent; without it the
    /// `sec` source cannot be instantiated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sec_user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investing_url_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ycharts_url_template: Option<String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            http_timeout_secs: 30,
            max_retries: 3,
            user_agent: "Mozilla/5.0 (compatible; macrofeed)".into(),
            fred_base_url: "https://fred.stlouisfed.org/graph/fredgraph.csv".into(),
            yahoo_base_url: "https://query2.finance.yahoo.com/v8/finance/chart".into(),
            cftc_base_url: "https://www.cftc.gov/dea/newcot/data".into(),
            sec_user_agent: None,
            investing_url_template: None,
            ycharts_url_template: None,
        }
    }
}

impl SourceSettings {
    /// Templates that are set but lack the `{ticker}` placeholder.
    pub fn invalid_templates(&self) -> Vec<&'static str> {
        let mut bad = Vec::new();
        if let Some(t) = &self.investing_url_template {
            if !t.contains(TICKER_PLACEHOLDER) {
                bad.push("investing_url_template");
            }
        }
        if let Some(t) = &self.ycharts_url_template {
            if !t.contains(TICKER_PLACEHOLDER) {
                bad.push("ycharts_url_template");
            }
        }
        bad
    }
}
