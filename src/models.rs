use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub image_url: Option<String>,
}

/// Fields extracted from the model's reply. Absent labels serialize as `null`.
#[derive(Debug, Default, Serialize, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub category: Option<String>,
    pub item: Option<String>,
    pub description: Option<String>,
    pub quality: Option<String>,
}
