/// Benchmarks for decoding inbound chat frames.
///
/// Every frame the server pushes goes through `parse_events`, so the common
/// room traffic (new messages, user counts) and the larger join payload with
/// history are the paths that matter.
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use regional_chat_client::chat::{ServerEvent, parse_events};

fn bench_parse_events(c: &mut Criterion) {
    let mut group = c.benchmark_group("chat/parse_events");

    let new_message = r#"{
        "type": "NEW_MESSAGE",
        "id": 1024,
        "content": "Is the main stage running late?",
        "nickname": "Alice",
        "userId": 42,
        "region": "Seoul",
        "timestamp": "2024-05-01T12:30:00.123"
    }"#;
    group.throughput(Throughput::Bytes(new_message.len() as u64));
    group.bench_function("NEW_MESSAGE", |b| {
        b.iter(|| {
            let events = parse_events(std::hint::black_box(new_message.as_bytes()))
                .expect("Parsing should succeed");
            assert!(matches!(events.as_slice(), [ServerEvent::NewMessage(_)]));
        });
    });

    let user_count = r#"{"type": "USER_COUNT", "count": 128, "region": "Seoul"}"#;
    group.throughput(Throughput::Bytes(user_count.len() as u64));
    group.bench_function("USER_COUNT", |b| {
        b.iter(|| {
            let _: Vec<ServerEvent> = parse_events(std::hint::black_box(user_count.as_bytes()))
                .expect("Parsing should succeed");
        });
    });

    let history: Vec<_> = (0..50)
        .map(|id| {
            format!(
                r#"{{"id": {id}, "content": "message {id}", "nickname": "user{id}", "userId": "{id}", "timestamp": "2024-05-01T12:30:00"}}"#
            )
        })
        .collect();
    let join_success = format!(
        r#"{{"type": "JOIN_SUCCESS", "region": "Seoul", "userCount": 50, "messages": [{}]}}"#,
        history.join(",")
    );
    group.throughput(Throughput::Bytes(join_success.len() as u64));
    group.bench_function("JOIN_SUCCESS/50_history", |b| {
        b.iter(|| {
            let _: Vec<ServerEvent> = parse_events(std::hint::black_box(join_success.as_bytes()))
                .expect("Parsing should succeed");
        });
    });

    let unknown = r#"{"type": "TYPING", "userId": "u7", "region": "Seoul"}"#;
    group.throughput(Throughput::Bytes(unknown.len() as u64));
    group.bench_function("unknown", |b| {
        b.iter(|| {
            let _: Vec<ServerEvent> = parse_events(std::hint::black_box(unknown.as_bytes()))
                .expect("Parsing should succeed");
        });
    });

    group.finish();
}

criterion_group!(chat_benches, bench_parse_events);
criterion_main!(chat_benches);
