use std::time::Duration;

use rfmesh::mesh::publisher::{self, EVENT};
use rfmesh::mesh::{ManualClock, MeshEvent};
use rfmesh::{MemoryTransport, MeshConfig, MeshEngine, Publisher, RadioMedium};

type Engine = MeshEngine<MemoryTransport, ManualClock>;

fn engine(medium: &RadioMedium, clock: &ManualClock, seed: u64) -> Engine {
    let config = MeshConfig::default().with_seed(seed);
    let mut engine = MeshEngine::with_clock(medium.attach(), config, clock.clone()).unwrap();
    engine.begin().unwrap();
    engine
}

#[test]
fn subscriber_receives_published_events_until_lost() {
    let medium = RadioMedium::default();
    let clock = ManualClock::new();
    let mut publisher = Publisher::new(engine(&medium, &clock, 100));
    let mut subscriber = engine(&medium, &clock, 200);

    publisher.update(&mut Vec::<MeshEvent>::new());
    let mut events: Vec<MeshEvent> = Vec::new();
    subscriber.update(&mut events);

    // The subscriber learns the publisher and its capability from discovery.
    let publisher_address = publisher.engine().address();
    let Some(MeshEvent::NewPeer(peer)) = events.first() else {
        panic!("expected the publisher as a new peer, got {events:?}");
    };
    assert_eq!(peer.address(), publisher_address);
    assert!(peer.capabilities().publishes_events());

    publisher::subscribe(&mut subscriber, publisher_address).unwrap();

    let mut forwarded: Vec<MeshEvent> = Vec::new();
    publisher.update(&mut forwarded);
    // Subscribe requests are consumed; only the discovery of the subscriber surfaces.
    assert!(
        forwarded
            .iter()
            .all(|event| matches!(event, MeshEvent::NewPeer(_)))
    );
    let subscribers: Vec<u32> = publisher.subscribers().collect();
    assert_eq!(subscribers, vec![subscriber.address()]);

    assert_eq!(publisher.publish(42).unwrap(), 1);
    let mut received: Vec<MeshEvent> = Vec::new();
    subscriber.update(&mut received);
    assert!(matches!(
        received.as_slice(),
        [MeshEvent::Message { header, payload }]
            if header.message_type() == EVENT && payload.as_ref() == &[42u8][..]
    ));

    // Subscriber goes quiet; two maintenance ticks later it is gone.
    for _ in 0..2 {
        clock.advance(Duration::from_millis(4000));
        publisher.update(&mut Vec::<MeshEvent>::new());
    }
    assert_eq!(publisher.subscribers().count(), 0);
    assert_eq!(publisher.publish(7).unwrap(), 0);
}

#[test]
fn duplicate_subscribe_is_recorded_once() {
    let medium = RadioMedium::default();
    let clock = ManualClock::new();
    let mut publisher = Publisher::new(engine(&medium, &clock, 1));
    let mut subscriber = engine(&medium, &clock, 2);

    publisher.update(&mut Vec::<MeshEvent>::new());
    subscriber.update(&mut Vec::<MeshEvent>::new());
    let target = publisher.engine().address();
    publisher::subscribe(&mut subscriber, target).unwrap();
    publisher::subscribe(&mut subscriber, target).unwrap();
    publisher.update(&mut Vec::<MeshEvent>::new());

    assert_eq!(publisher.subscribers().count(), 1);
}
