use std::collections::HashMap;

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::error::{DiscoveryError, Result};
use super::types::{DiscoverySnapshot, ServiceRecord};

/// mDNS/DNS-SD announce + browse, built on `mdns-sd`'s `ServiceDaemon`.
pub struct DiscoveryAdapter {
    daemon: ServiceDaemon,
}

impl DiscoveryAdapter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            daemon: ServiceDaemon::new()?,
        })
    }

    /// Registers `record` and keeps it advertised until `cancel` fires.
    /// Cancellation is normal shutdown, not an error.
    pub async fn announce(&self, record: ServiceRecord, cancel: CancellationToken) -> Result<()> {
        let host_name = format!("{}.{}.", hostname_label(&record.instance_name), record.domain);
        let info = ServiceInfo::new(
            &record.service_type,
            &record.instance_name,
            &host_name,
            "",
            record.port,
            text_records_to_properties(&record.text_records),
        )
        .map_err(|e| DiscoveryError::InvalidRecord(e.to_string()))?;

        self.daemon.register(info)?;
        cancel.cancelled().await;
        let _ = self.daemon.unregister(&format!(
            "{}.{}",
            record.instance_name,
            record.fqst()
        ));
        Ok(())
    }

    /// Browses `service_type` (e.g. `_file-sharing._tcp.local.`), publishing a
    /// fresh snapshot of the full known set on every add/remove event.
    ///
    /// Backed by a `watch` channel rather than a buffered `mpsc`: the
    /// receiver only ever sees the most recent snapshot, so a slow consumer
    /// never blocks the producer and never sees stale intermediate states —
    /// discovery prefers the latest view over a complete history of every
    /// one in between.
    pub fn discover(
        &self,
        service_type: &str,
        cancel: CancellationToken,
    ) -> Result<watch::Receiver<DiscoverySnapshot>> {
        let browse_rx = self.daemon.browse(service_type)?;
        let (tx, rx) = watch::channel(DiscoverySnapshot::Services(Vec::new()));

        tokio::spawn(async move {
            let mut known: HashMap<String, ServiceRecord> = HashMap::new();
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = browse_rx.recv_async() => {
                        match event {
                            Ok(ServiceEvent::ServiceResolved(info)) => {
                                let record = service_info_to_record(&info);
                                known.insert(record.instance_name.clone(), record);
                                let snapshot = DiscoverySnapshot::Services(known.values().cloned().collect());
                                let _ = tx.send(snapshot);
                            }
                            Ok(ServiceEvent::ServiceRemoved(_, fullname)) => {
                                known.retain(|name, _| !fullname.starts_with(name.as_str()));
                                let snapshot = DiscoverySnapshot::Services(known.values().cloned().collect());
                                let _ = tx.send(snapshot);
                            }
                            Ok(_) => {}
                            Err(err) => {
                                let _ = tx.send(DiscoverySnapshot::Error(err.to_string()));
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

fn hostname_label(instance_name: &str) -> String {
    instance_name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

fn text_records_to_properties(records: &HashMap<String, String>) -> HashMap<String, String> {
    records.clone()
}

fn service_info_to_record(info: &ServiceInfo) -> ServiceRecord {
    let service_type = info.get_type().trim_end_matches('.').to_string();
    let (service_type, domain) = match service_type.rsplit_once('.') {
        Some((svc, dom)) => (svc.to_string(), dom.to_string()),
        None => (service_type, super::types::DEFAULT_DOMAIN.to_string()),
    };
    ServiceRecord {
        instance_name: info.get_fullname().to_string(),
        service_type,
        domain,
        port: info.get_port(),
        text_records: info
            .get_properties()
            .iter()
            .map(|p| (p.key().to_string(), p.val_str().to_string()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_label_sanitizes_special_characters() {
        assert_eq!(hostname_label("my service!"), "my-service-");
    }
}
