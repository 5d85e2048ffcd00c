use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use planetoid::session::RegistryConfig;
use planetoid::{
    ClientSocket, ClientState, ConnectionId, Delivery, Message, NoTerrain, ServerSocket,
    ServerState, ShipWorld, SocketEvent, Transport, TransportError, UserRegistry,
};

static PORT_COUNTER: AtomicU16 = AtomicU16::new(41000);

fn next_port() -> u16 {
    PORT_COUNTER.fetch_add(10, Ordering::SeqCst)
}

fn wait_for_events(socket: &mut ServerSocket, timeout_ms: u64) -> Vec<SocketEvent> {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        let events = socket.poll().unwrap();
        if !events.is_empty() {
            return events;
        }
        thread::sleep(Duration::from_millis(1));
    }
    Vec::new()
}

fn wait_for_frames(socket: &mut ClientSocket, timeout_ms: u64) -> Vec<Vec<u8>> {
    let start = Instant::now();
    let mut frames = Vec::new();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        frames.extend(socket.poll().unwrap());
        if !frames.is_empty() {
            // let the rest of the burst land
            thread::sleep(Duration::from_millis(5));
            frames.extend(socket.poll().unwrap());
            return frames;
        }
        thread::sleep(Duration::from_millis(1));
    }
    frames
}

#[test]
fn test_register_over_udp() {
    let port = next_port();
    let server_addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();

    let mut server_socket = ServerSocket::bind(server_addr, 8, Duration::from_secs(5)).unwrap();
    let mut client_socket = ClientSocket::connect("127.0.0.1:0", server_addr).unwrap();

    let mut server = ServerState::new(
        UserRegistry::new(RegistryConfig::default()),
        ShipWorld::default(),
        NoTerrain,
    );
    let mut client = ClientState::new("Alice", ShipWorld::default(), NoTerrain);

    client.request_join();
    client.flush(&mut client_socket);

    let events = wait_for_events(&mut server_socket, 500);
    let conn = match events.as_slice() {
        [SocketEvent::Connected(id), SocketEvent::Frame { from, frame }] => {
            assert_eq!(id, from);
            server.handle_message(*from, frame).unwrap();
            *from
        }
        other => panic!("unexpected socket events {other:?}"),
    };
    server.tick(1.0 / 60.0);
    server.flush(&mut server_socket);

    for frame in wait_for_frames(&mut client_socket, 500) {
        client.handle_message(&frame).unwrap();
    }

    let guid = client.local_guid().expect("registration should succeed");
    assert_eq!(
        server.join().registry().get_by_connection(conn).unwrap().guid(),
        guid
    );
    assert_eq!(client.registry().local_user().unwrap().username(), "Alice");
    assert!(client.local_ship().is_some());
    assert!(client_socket.stats().packets_received >= 3);
}

#[test]
fn test_ship_state_round_trip_over_udp() {
    let port = next_port();
    let server_addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();

    let mut server_socket = ServerSocket::bind(server_addr, 8, Duration::from_secs(5)).unwrap();
    let mut client_socket = ClientSocket::connect("127.0.0.1:0", server_addr).unwrap();

    let mut server = ServerState::new(
        UserRegistry::new(RegistryConfig::default()),
        ShipWorld::default(),
        NoTerrain,
    );
    let mut client = ClientState::new("Bob", ShipWorld::default(), NoTerrain);

    client.request_join();
    client.flush(&mut client_socket);
    for event in wait_for_events(&mut server_socket, 500) {
        if let SocketEvent::Frame { from, frame } = event {
            server.handle_message(from, &frame).unwrap();
        }
    }
    server.flush(&mut server_socket);
    for frame in wait_for_frames(&mut client_socket, 500) {
        client.handle_message(&frame).unwrap();
    }
    let guid = client.local_guid().expect("registration should succeed");

    client.tick(1.0 / 60.0, 0x2000);
    client.flush(&mut client_socket);
    for event in wait_for_events(&mut server_socket, 500) {
        if let SocketEvent::Frame { from, frame } = event {
            server.handle_message(from, &frame).unwrap();
        }
    }
    assert!(server.world().get(guid).unwrap().action.is_thrusting());

    server.tick(1.0 / 60.0);
    server.flush(&mut server_socket);
    let echoes: Vec<Message> = wait_for_frames(&mut client_socket, 500)
        .iter()
        .map(|frame| Message::decode(frame).unwrap())
        .collect();
    match echoes.as_slice() {
        [Message::ServerShipState(state)] => {
            assert_eq!(state.guid, guid);
            assert_eq!(state.sequence, 1);
        }
        other => panic!("expected one ship state, got {other:?}"),
    }
}

#[test]
fn test_unknown_connection_and_oversized_frames() {
    let port = next_port();
    let server_addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let mut server_socket = ServerSocket::bind(server_addr, 1, Duration::from_secs(5)).unwrap();
    let mut client_socket = ClientSocket::connect("127.0.0.1:0", server_addr).unwrap();

    assert!(matches!(
        server_socket.send(ConnectionId::new(77), Delivery::Reliable, &[1]),
        Err(TransportError::UnknownConnection(_))
    ));
    assert!(matches!(
        client_socket.send(ConnectionId::SERVER, Delivery::Unreliable, &vec![0; 4096]),
        Err(TransportError::FrameTooLarge { .. })
    ));
}

#[test]
fn test_connection_limit_and_timeout() {
    let port = next_port();
    let server_addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let mut server_socket =
        ServerSocket::bind(server_addr, 1, Duration::from_millis(50)).unwrap();

    let mut first = ClientSocket::connect("127.0.0.1:0", server_addr).unwrap();
    let mut second = ClientSocket::connect("127.0.0.1:0", server_addr).unwrap();

    first.send(ConnectionId::SERVER, Delivery::Unreliable, &[0x17]).unwrap();
    let events = wait_for_events(&mut server_socket, 500);
    assert!(matches!(events[0], SocketEvent::Connected(_)));

    second.send(ConnectionId::SERVER, Delivery::Unreliable, &[0x17]).unwrap();
    thread::sleep(Duration::from_millis(20));
    let events = server_socket.poll().unwrap();
    assert!(events.iter().all(|e| !matches!(e, SocketEvent::Connected(_))));

    thread::sleep(Duration::from_millis(80));
    let events = server_socket.poll().unwrap();
    assert!(events.iter().any(|e| matches!(e, SocketEvent::TimedOut(_))));
    assert!(server_socket.connections().is_empty());
}
