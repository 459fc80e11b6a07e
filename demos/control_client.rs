//! Simple control client for a running minerlink daemon.
//!
//! Run with: cargo run --example control_client -- [host] [port]
//!
//! Walks the action set:
//! 1. connect + welcome device snapshot
//! 2. get_device_info
//! 3. set_threads
//! 4. set_hashrate_limit
//! 5. start_mining / get_stats / stop_mining
//! 6. unknown command rejection

use std::env;

use minerlink::client::RemoteClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let host = args.get(1).map(String::as_str).unwrap_or("127.0.0.1");
    let port: u16 = args.get(2).map(|p| p.parse()).transpose()?.unwrap_or(8888);

    println!("=== Minerlink Control Client ===\n");

    let client = RemoteClient::default();

    println!("Step 1: connect to {}:{}", host, port);
    let device = client.connect(host, port).await?;
    println!(
        "Connected to {} ({} cores, {})\n",
        device.device_name, device.available_cores, device.os_version
    );

    println!("Step 2: get_device_info");
    let info = client.get_device_info().await?;
    println!("{:#?}\n", info);

    println!("Step 3: set_threads 2");
    client.set_threads(2).await?;
    println!("OK\n");

    println!("Step 4: set_hashrate_limit 1500.0");
    client.set_hashrate_limit(1500.0).await?;
    println!("OK\n");

    println!("Step 5: start_mining / get_stats / stop_mining");
    client.start_mining().await?;
    let stats = client.get_stats().await?;
    println!(
        "hashrate: {} H/s, cpu: {:.1}%, uptime: {}s",
        stats.hashrate, stats.cpu_usage_percent, stats.uptime_seconds
    );
    client.stop_mining().await?;
    println!("OK\n");

    println!("Step 6: unknown command rejection");
    let response = client.send_command("frobnicate", None).await?;
    println!(
        "success={}, message={:?}\n",
        response.success, response.message
    );

    client.disconnect().await;
    println!("Done.");
    Ok(())
}
