use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

use tandem::signaling::{ClientMessage, RoomId, Router};

const OFFER: &str = r#"{"type":"offer","offer":{"type":"offer","sdp":"v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n"}}"#;

/// inbound frame decoding benchmark
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("Decode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("offer", |b| {
        b.iter(|| {
            let msg = ClientMessage::decode(black_box(OFFER)).unwrap();
            black_box(msg)
        })
    });

    group.finish();
}

/// join + leave cycle against a fresh room
fn bench_join_leave(c: &mut Criterion) {
    let mut router = Router::new();
    let x = router.connect();
    let y = router.connect();
    let join = ClientMessage::Join {
        room: Some(RoomId::from("bench")),
    };

    let mut group = c.benchmark_group("Membership");
    group.throughput(Throughput::Elements(1));

    group.bench_function("join_join_leave_leave", |b| {
        b.iter(|| {
            black_box(router.handle(&x, join.clone()).unwrap());
            black_box(router.handle(&y, join.clone()).unwrap());
            black_box(router.handle(&y, ClientMessage::Leave).unwrap());
            black_box(router.handle(&x, ClientMessage::Leave).unwrap());
        })
    });

    group.finish();
}

/// relay between two joined connections
fn bench_relay(c: &mut Criterion) {
    let mut router = Router::new();
    let x = router.connect();
    let y = router.connect();
    let join = ClientMessage::Join {
        room: Some(RoomId::from("bench")),
    };
    router.handle(&x, join.clone()).unwrap();
    router.handle(&y, join).unwrap();
    let offer = ClientMessage::decode(OFFER).unwrap();

    let mut group = c.benchmark_group("Relay");
    group.throughput(Throughput::Elements(1));

    group.bench_function("offer", |b| {
        b.iter(|| {
            let out = router.handle(&x, black_box(offer.clone())).unwrap();
            black_box(out)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_join_leave, bench_relay);
criterion_main!(benches);
