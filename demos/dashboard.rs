//! Multi plug dashboard: combine-latest over named streams, re-rendering
//! once per combined update

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use patchbay::{MultiPlug, Provider, RenderHost, Store, Subject};

struct Repaints(AtomicUsize);

impl RenderHost for Repaints {
    fn invalidate(&self) {
        let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        println!("   [host] repaint #{n}");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Dashboard ===\n");

    println!("1. Store with three metric streams");
    let cpu: Subject<u64> = Subject::new();
    let memory: Subject<u64> = Subject::new();
    let disk: Subject<u64> = Subject::new();
    let store = Store::builder()
        .stream("cpu", cpu.clone())
        .stream("memory", memory.clone())
        .stream("disk", disk.clone())
        .build();
    let provider = Provider::new(store).expect("store has entries");

    println!("\n2. Activating the multi plug (key order: cpu, memory, disk)");
    let host = Arc::new(Repaints(AtomicUsize::new(0)));
    let plug = MultiPlug::new()
        .plug("cpu", |s: &Store| s.stream::<u64>("cpu"))
        .plug("memory", |s: &Store| s.stream::<u64>("memory"))
        .plug("disk", |s: &Store| s.stream::<u64>("disk"));
    let active = plug
        .activate_with_host(&provider.scope(), host)
        .expect("all combinators are valid");

    println!("\n3. Emitting: nothing renders until every key has a value");
    cpu.next(12);
    memory.next(48);
    println!("   state after two emissions: {:?}", active.state());
    disk.next(73);

    active.render(|values| {
        let values = values.expect("all keys emitted");
        print!("   dashboard:");
        for (key, value) in values.iter() {
            print!(" {key}={value}%");
        }
        println!();
    });

    println!("\n4. A later cpu sample updates just its key");
    cpu.next(19);
    let values = active.values().unwrap();
    println!(
        "   cpu={}% memory={}% disk={}%",
        values.get("cpu").unwrap(),
        values.get("memory").unwrap(),
        values.get("disk").unwrap()
    );

    println!("\n✓ Dashboard demo complete!");
}
