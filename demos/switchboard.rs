//! Routing items to listeners by sender and type.
//!
//! Run with: cargo run --example switchboard

use std::thread;

use roundkit::switchboard::{Item, MessageType, SenderId, Switchboard};

const TEXT: MessageType = MessageType(1);
const RECEIPT: MessageType = MessageType(2);

#[derive(Debug, Clone)]
struct Note {
    from: SenderId,
    kind: MessageType,
    body: String,
}

impl Item for Note {
    fn sender(&self) -> SenderId {
        self.from
    }

    fn message_type(&self) -> MessageType {
        self.kind
    }
}

fn main() {
    println!("=== Switchboard ===\n");

    let alice = SenderId::from_uints([0, 0, 0, 1]);
    let bob = SenderId::from_uints([0, 0, 0, 2]);

    let board = Switchboard::new();
    board.register(alice, MessageType::ANY, |note: &Note, elsewhere| {
        println!("   [alice-any] {} (heard elsewhere: {elsewhere})", note.body);
    });
    board.register(SenderId::ZERO, TEXT, |note: &Note, elsewhere| {
        println!("   [any-text]  {} (heard elsewhere: {elsewhere})", note.body);
    });
    let (channel_id, rx) = board.listen_channel(SenderId::ZERO, RECEIPT, 16);

    let consumer = thread::spawn(move || {
        for note in rx.iter() {
            println!("   [receipts]  {} from {:?}", note.body, note.from);
        }
    });

    let notes = [
        Note { from: alice, kind: TEXT, body: "hello from alice".into() },
        Note { from: bob, kind: TEXT, body: "hello from bob".into() },
        Note { from: bob, kind: RECEIPT, body: "bob read it".into() },
        Note { from: bob, kind: MessageType(9), body: "nobody listens".into() },
    ];
    for note in &notes {
        let heard = board.speak(note);
        println!("'{}' reached {heard} listener(s)", note.body);
    }

    // Dropping the registration drops the channel sender and ends the consumer
    board.unregister(channel_id);
    let _ = consumer.join();
    println!("\n{} listener(s) still registered", board.len());
}
