use std::collections::HashMap;

pub const DEFAULT_SERVICE_TYPE: &str = "_file-sharing._tcp";
pub const DEFAULT_DOMAIN: &str = "local";

#[derive(Debug, Clone)]
pub struct ServiceRecord {
    pub instance_name: String,
    pub service_type: String,
    pub domain: String,
    pub port: u16,
    pub text_records: HashMap<String, String>,
}

impl ServiceRecord {
    pub fn new(instance_name: impl Into<String>, port: u16) -> Self {
        let mut text_records = HashMap::new();
        text_records.insert("desc".to_string(), "Local file sender".to_string());
        Self {
            instance_name: instance_name.into(),
            service_type: DEFAULT_SERVICE_TYPE.to_string(),
            domain: DEFAULT_DOMAIN.to_string(),
            port,
            text_records,
        }
    }

    /// Fully qualified service type as `mdns-sd` expects it, e.g.
    /// `_file-sharing._tcp.local.`.
    pub fn fqst(&self) -> String {
        format!("{}.{}.", self.service_type, self.domain)
    }
}

/// One outbound discovery snapshot: either the current known set of
/// services, or a terminal error.
#[derive(Debug, Clone)]
pub enum DiscoverySnapshot {
    Services(Vec<ServiceRecord>),
    Error(String),
}
