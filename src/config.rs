// ⚙️ Configuration - endpoints, defaults, header aliases

use std::time::Duration;

use crate::schema::Field;

pub const API_URL: &str = "https://ys.endata.cn/enlib-api/api/home/getrank_mainland.do";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/105.0.0.0 Safari/537.36";

pub const ACCEPT: &str = "application/json, text/plain, */*";

/// Ranking list requested by default (top-N)
pub const DEFAULT_TOP: u32 = 50;

pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Prefix shared by the output directory and every artifact stem
pub const OUTPUT_PREFIX: &str = "movie_income";

/// Timestamp layout of the run token (YYYYMMDD_HHMMSS)
pub const TOKEN_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Fixed header lookup for local input files: (English, localized) per canonical field.
/// Nothing outside this table is recognized.
pub const HEADER_ALIASES: &[(Field, &str, &str)] = &[
    (Field::Rank, "Rank", "排名"),
    (Field::Title, "MovieName", "电影名称"),
    (Field::ReleaseDate, "ReleaseDate", "上映时间"),
    (Field::BoxOffice, "TotalBoxOffice(10k RMB)", "总票房(万元)"),
    (Field::AvgTicketPrice, "AvgTicketPrice(RMB)", "平均票价(元)"),
    (Field::AvgAudience, "AvgAudienceCount", "平均场次观众数"),
];

/// Settings for the remote ranking API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub api_url: String,
    pub top: u32,
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            api_url: API_URL.to_string(),
            top: DEFAULT_TOP,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl RemoteConfig {
    pub fn with_top(mut self, top: u32) -> Self {
        self.top = top;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}
