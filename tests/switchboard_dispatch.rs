// ==============================================
// SWITCHBOARD DISPATCH TESTS (integration)
// ==============================================
//
// Many producers speaking into one registry while a consumer drains a
// channel listener.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use roundkit::switchboard::{Item, MessageType, SenderId, Switchboard};

const TEXT: MessageType = MessageType(3);

#[derive(Debug, Clone)]
struct Envelope {
    sender: SenderId,
    kind: MessageType,
    seq: usize,
}

impl Item for Envelope {
    fn sender(&self) -> SenderId {
        self.sender
    }

    fn message_type(&self) -> MessageType {
        self.kind
    }
}

// ==============================================
// Channel listener under contention
// ==============================================

mod channel_listener {
    use super::*;

    #[test]
    fn every_item_from_every_producer_is_heard() {
        let num_threads = 8;
        let per_thread = 2_000;

        let board = Arc::new(Switchboard::new());
        let (_, queue) = board.listen_channel(SenderId::ZERO, MessageType::ANY, 12);
        let user = SenderId::from_uints([0, 0, 0, 3]);
        let barrier = Arc::new(Barrier::new(num_threads));

        let producers: Vec<_> = (0..num_threads)
            .map(|tid| {
                let board = board.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..per_thread {
                        let heard = board.speak(&Envelope {
                            sender: user,
                            kind: TEXT,
                            seq: tid * per_thread + i,
                        });
                        assert_eq!(heard, 1);
                    }
                })
            })
            .collect();

        let mut seen = vec![false; num_threads * per_thread];
        for _ in 0..num_threads * per_thread {
            let item = queue
                .recv_timeout(Duration::from_secs(10))
                .expect("producer stalled");
            assert!(!seen[item.seq], "item {} heard twice", item.seq);
            seen[item.seq] = true;
        }

        for producer in producers {
            producer.join().unwrap();
        }

        assert!(seen.iter().all(|&s| s));
        assert!(queue.try_recv().is_err(), "extra item on the channel");
    }
}

// ==============================================
// Registration churn
// ==============================================

mod churn {
    use super::*;

    #[test]
    fn register_and_unregister_while_speaking() {
        let board = Arc::new(Switchboard::new());
        let stable = Arc::new(AtomicUsize::new(0));
        {
            let stable = stable.clone();
            board.register(SenderId::ZERO, TEXT, move |_: &Envelope, _| {
                stable.fetch_add(1, Ordering::SeqCst);
            });
        }

        let barrier = Arc::new(Barrier::new(2));
        let speaker = {
            let board = board.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for seq in 0..5_000 {
                    let heard = board.speak(&Envelope {
                        sender: SenderId::from_uints([0, 0, 0, 1]),
                        kind: TEXT,
                        seq,
                    });
                    assert!(heard >= 1);
                }
            })
        };

        let churner = {
            let board = board.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..1_000 {
                    let id = board.register(SenderId::ZERO, MessageType::ANY, |_: &Envelope, _| {});
                    assert!(board.unregister(id));
                }
            })
        };

        speaker.join().unwrap();
        churner.join().unwrap();

        assert_eq!(stable.load(Ordering::SeqCst), 5_000);
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn heard_elsewhere_reflects_match_count() {
        let board = Switchboard::new();
        let flags = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for sender in [SenderId::ZERO, SenderId::from_uints([0, 0, 0, 9])] {
            let flags = flags.clone();
            board.register(sender, TEXT, move |_: &Envelope, elsewhere| {
                flags.lock().push(elsewhere);
            });
        }

        // both registrations match sender 9, only the wildcard matches sender 8
        let from = |n| Envelope {
            sender: SenderId::from_uints([0, 0, 0, n]),
            kind: TEXT,
            seq: 0,
        };
        assert_eq!(board.speak(&from(9)), 2);
        assert_eq!(board.speak(&from(8)), 1);
        assert_eq!(*flags.lock(), vec![true, true, false]);
    }
}
