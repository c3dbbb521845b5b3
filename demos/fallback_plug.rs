//! Single plug with a fallback value: pending first, ready after the stream
//! emits

use std::thread;
use std::time::Duration;

use patchbay::{Plug, PlugState, Provider, Store, Subject};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Fallback Plug ===\n");

    println!("1. Building the store");
    let status: Subject<String> = Subject::new();
    let store = Store::builder().stream("status", status.clone()).build();
    let provider = Provider::new(store).expect("store has entries");

    println!("\n2. Activating a plug with a 'waiting' fallback");
    let plug = Plug::new(|s| s.stream::<String>("status")).with_default("waiting".to_string());
    let active = plug.activate(&provider.scope()).expect("combinator is valid");
    println!(
        "   State: {:?} | Rendered: {:?}",
        active.state(),
        active.value()
    );
    assert_eq!(active.state(), PlugState::Pending);

    println!("\n3. Emitting from a background task after 200ms");
    let pusher = status.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        pusher.next("loaded".to_string());
    });
    handle.join().unwrap();
    println!(
        "   State: {:?} | Rendered: {:?}",
        active.state(),
        active.value()
    );

    println!("\n4. Children-as-function rendering");
    let line = active.render(|value| format!("<p>{}</p>", value.unwrap()));
    println!("   {line}");

    println!("\n5. Deactivating (subscription released exactly once)");
    active.deactivate();
    println!("   Subscribers left on stream: {}", status.subscriber_count());

    println!("\n✓ Fallback plug demo complete!");
}
