use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Google credentials and endpoints used by the photo and visit stores.
#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub sheet_id: String,
    pub drive_folder_id: Option<String>,
    pub token_url: String,
    pub drive_base_url: String,
    pub sheets_base_url: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub user_agent: String,
    pub geocode_language: String,
    pub geocode_timeout_secs: u64,
    pub nominatim_base_url: String,
    pub bigdatacloud_base_url: String,
    pub google: GoogleConfig,
    pub visit_sheet: String,
    pub sales_sheet: String,
    pub status_sheet: String,
    pub photo_max_dimension: u32,
    pub photo_target_max_bytes: usize,
    pub max_upload_bytes: usize,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("sheet_id", &self.sheet_id)
            .field("drive_folder_id", &self.drive_folder_id)
            .field("token_url", &self.token_url)
            .field("drive_base_url", &self.drive_base_url)
            .field("sheets_base_url", &self.sheets_base_url)
            .finish()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("user_agent", &self.user_agent)
            .field("geocode_language", &self.geocode_language)
            .field("geocode_timeout_secs", &self.geocode_timeout_secs)
            .field("nominatim_base_url", &self.nominatim_base_url)
            .field("bigdatacloud_base_url", &self.bigdatacloud_base_url)
            .field("google", &self.google)
            .field("visit_sheet", &self.visit_sheet)
            .field("sales_sheet", &self.sales_sheet)
            .field("status_sheet", &self.status_sheet)
            .field("photo_max_dimension", &self.photo_max_dimension)
            .field("photo_target_max_bytes", &self.photo_target_max_bytes)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}
