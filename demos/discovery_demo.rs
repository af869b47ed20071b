use std::time::Duration;

use lanshare_engine::discovery::{DiscoveryAdapter, DiscoverySnapshot, ServiceRecord, DEFAULT_SERVICE_TYPE};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("lanshare-engine - mDNS discovery demo");
    println!("======================================\n");

    let adapter = DiscoveryAdapter::new()?;
    let record = ServiceRecord::new("lanshare-demo-peer", 9876);

    let announce_cancel = CancellationToken::new();
    let announce_handle = {
        let adapter_record = record.clone();
        let cancel = announce_cancel.clone();
        tokio::spawn(async move {
            let adapter = DiscoveryAdapter::new().expect("second daemon handle for announce task");
            if let Err(err) = adapter.announce(adapter_record, cancel).await {
                eprintln!("announce failed: {err}");
            }
        })
    };

    println!("Announcing {} on {}...", record.instance_name, record.fqst());
    tokio::time::sleep(Duration::from_millis(500)).await;

    let discover_cancel = CancellationToken::new();
    let mut snapshots = adapter.discover(DEFAULT_SERVICE_TYPE, discover_cancel.clone())?;

    println!("Browsing for {DEFAULT_SERVICE_TYPE} peers for three seconds...");
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                match &*snapshots.borrow_and_update() {
                    DiscoverySnapshot::Services(services) => {
                        println!("   {} peer(s) known:", services.len());
                        for svc in services {
                            println!("      - {} on port {}", svc.instance_name, svc.port);
                        }
                    }
                    DiscoverySnapshot::Error(err) => {
                        println!("   discovery error: {err}");
                    }
                }
            }
        }
    }

    discover_cancel.cancel();
    announce_cancel.cancel();
    let _ = announce_handle.await;

    println!("\nDone.");
    Ok(())
}
