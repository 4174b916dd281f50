//! Two nodes on an in-memory radio medium discover each other and exchange
//! a message larger than one frame.

use std::time::Duration;

use rfmesh::mesh::{ManualClock, MeshEvent};
use rfmesh::{MeshConfig, MeshEngine, MessageType, RadioMedium};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("rfmesh ping-pong");
    println!("================\n");

    let medium = RadioMedium::default();
    let clock = ManualClock::new();
    let mut ping = MeshEngine::with_clock(medium.attach(), MeshConfig::default(), clock.clone())?;
    let mut pong = MeshEngine::with_clock(medium.attach(), MeshConfig::default(), clock.clone())?;
    ping.begin()?;
    pong.begin()?;

    let mut events: Vec<MeshEvent> = Vec::new();
    for _ in 0..2 {
        ping.update(&mut events);
        pong.update(&mut events);
        clock.advance(Duration::from_millis(100));
    }
    println!("ping is {}, pong is {}", ping.address(), pong.address());
    println!("ping knows {} peer(s)", ping.peers().count());

    let question = b"ping! this message is long enough to need several radio frames";
    ping.send_message(pong.address(), MessageType::USER, question, false)?;

    events.clear();
    pong.update(&mut events);
    for event in &events {
        if let MeshEvent::Message { header, payload } = event {
            println!(
                "pong got {} bytes from {}: {:?}",
                payload.len(),
                header.address_from(),
                String::from_utf8_lossy(payload)
            );
            pong.send_message(header.address_from(), MessageType::USER, b"pong!", false)?;
        }
    }

    events.clear();
    ping.update(&mut events);
    for event in &events {
        if let MeshEvent::Message { payload, .. } = event {
            println!("ping got {:?}", String::from_utf8_lossy(payload));
        }
    }

    println!("\nping metrics: {:?}", ping.metrics());
    Ok(())
}
