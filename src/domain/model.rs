use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 排名 API 列表頁中的一筆資料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorporateRow {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorporatePage {
    #[serde(default)]
    pub rows: Vec<CorporateRow>,
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartupPartner {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub theme_gd: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Corporate profile as returned by `GetCorporateDetails`, with the partner
/// count replaced by the value derived from the partner API. Fields the
/// upstream adds later survive in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corporate {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub hq_city: Option<String>,
    #[serde(default)]
    pub hq_country: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub twitter_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub startup_partners_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub startup_partners: Vec<StartupPartner>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub startup_themes: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Corporate {
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    /// Theme tags as plain strings. Upstream sends either bare strings or
    /// `[name, weight]` pairs; the name is the tag.
    pub fn theme_tags(&self) -> Vec<String> {
        self.startup_themes
            .iter()
            .filter_map(|theme| match theme {
                Value::String(s) => Some(s.clone()),
                Value::Array(parts) => parts
                    .iter()
                    .find_map(|p| p.as_str().map(str::to_string)),
                _ => None,
            })
            .filter(|tag| !tag.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorporateCollection {
    pub corporate_details: Vec<Corporate>,
    pub corporate_count: usize,
}

impl CorporateCollection {
    pub fn from_details(corporate_details: Vec<Corporate>) -> Self {
        let corporate_count = corporate_details.len();
        Self {
            corporate_details,
            corporate_count,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchStatus {
    #[default]
    #[serde(rename = "not started")]
    NotStarted,
    #[serde(rename = "started")]
    Started,
    #[serde(rename = "done")]
    Done,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatus::NotStarted => "not started",
            FetchStatus::Started => "started",
            FetchStatus::Done => "done",
        }
    }
}

impl std::fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMember {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub cluster_id: usize,
    pub companies: Vec<ClusterMember>,
    pub countries: IndexMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterReport {
    pub clusters: IndexMap<String, ClusterInfo>,
    /// Top three HQ countries per cluster, keyed like `clusters`.
    pub sorted_countries: IndexMap<String, Vec<(String, usize)>>,
    pub total_countries: IndexMap<String, usize>,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

impl ClusterReport {
    pub fn assigned_count(&self) -> usize {
        self.clusters.values().map(|c| c.companies.len()).sum()
    }
}
