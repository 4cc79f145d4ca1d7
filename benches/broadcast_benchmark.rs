use std::sync::Arc;

use chatwave::{ClientIntent, RoomRelay};
use criterion::{criterion_group, criterion_main, Criterion};
use tokio::sync::mpsc;

const ROOM_SIZE: usize = 64;

pub fn criterion_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    let relay = Arc::new(RoomRelay::new());

    // Fill one room; each member's receiver is drained by its own task so
    // the outbound channels never pile up.
    let sender_id = runtime.block_on(async {
        let mut sender_id = 0;
        for i in 0..ROOM_SIZE {
            let (tx, mut rx) = mpsc::unbounded_channel();
            tokio::spawn(async move { while rx.recv().await.is_some() {} });
            let id = relay.connect(tx).await;
            relay
                .handle_intent(
                    id,
                    ClientIntent::JoinRoom {
                        room: "benchmark_test".into(),
                        username: format!("user-{}", i),
                    },
                )
                .await
                .unwrap();
            sender_id = id;
        }
        sender_id
    });

    c.bench_function("fan out to 64 members", |b| {
        b.to_async(&runtime).iter(|| {
            let relay = relay.clone();
            async move {
                relay
                    .handle_intent(
                        sender_id,
                        ClientIntent::Message {
                            room: "benchmark_test".into(),
                            message: "hello, world".to_owned(),
                            sender: String::new(),
                        },
                    )
                    .await
                    .unwrap();
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
