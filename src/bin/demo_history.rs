// Quick demonstration of the undo/redo history engine
// Run with: cargo run --bin demo_history
// Set RUST_LOG=mapforge=debug to see the history trace.

use mapforge::history::{SetStoreValue, UpdateFeature};
use mapforge::messaging::channels::drain;
use mapforge::{
    DomainKey, DrawInteraction, Feature, FeatureLayer, Geometry, HistoryConfig, HistoryRegistry,
    KeyChord, MemoryLayer, MemoryStore, StateStore, TriggerAdapter, create_notification_channel,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 64;
/// How long a notification stays on screen as a toast
const NOTIFICATION_TOAST_MS: i64 = 5_000;

fn print_status(registry: &HistoryRegistry, key: DomainKey) {
    let status = registry.status(key);
    println!(
        "   [{}] undo: {} ({:?}) | redo: {} ({:?})",
        key, status.undo_count, status.undo_description, status.redo_count, status.redo_description
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🗺️  MapForge - History Engine Demo");
    println!("==================================");

    let config = match HistoryConfig::default_path() {
        Some(path) => HistoryConfig::load_or_default(&path)?,
        None => HistoryConfig::default(),
    };
    println!("History depth: {} steps per domain", config.max_depth);

    let registry = Arc::new(HistoryRegistry::with_config(config));
    let layer = Arc::new(MemoryLayer::new("sketch"));
    let store = Arc::new(MemoryStore::new());
    let (notification_tx, mut notification_rx) =
        create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    let triggers = TriggerAdapter::new(registry.clone(), Arc::new(Mutex::new(notification_tx)));

    // Draw a triangle
    let mut draw = DrawInteraction::new(registry.clone(), layer.clone(), DomainKey::Map);
    draw.begin("Draw polygon", || println!("   (overlay discarded)"))
        .await?;
    let triangle = Feature::new(Geometry::Polygon(vec![vec![
        [0.0, 0.0],
        [4.0, 0.0],
        [2.0, 3.0],
        [0.0, 0.0],
    ]]))
    .with_property("name", "Field");
    draw.confirm(vec![triangle.clone()]).await?;
    println!(
        "\n✏️  Drew a triangle ({} vertices)",
        triangle.geometry.vertex_count()
    );
    print_status(&registry, DomainKey::Map);

    // Rename it
    let before = layer.get(triangle.id).ok_or("triangle missing")?;
    let after = before.clone().with_property("name", "Meadow");
    layer.replace(after.clone()).await?;
    registry.register(
        DomainKey::Map,
        UpdateFeature::new(layer.clone(), before, after)?,
    );
    println!("\n🏷️  Renamed it to Meadow");
    print_status(&registry, DomainKey::Map);

    // Set the print layout title in an independent domain
    let before = store.select("layout.title");
    let title = json!("Meadow survey");
    store.dispatch("layout.title", Some(title.clone())).await?;
    registry.register(
        DomainKey::Layout,
        SetStoreValue::new(store.clone(), "layout.title", before, Some(title)),
    );
    println!("\n📄 Set layout title");
    print_status(&registry, DomainKey::Layout);

    // Ctrl+Z twice on the map
    println!("\n↩️  Ctrl+Z, Ctrl+Z on the map");
    for _ in 0..2 {
        if let Some(outcome) = triggers.handle_chord(DomainKey::Map, KeyChord::ctrl('z')).await {
            println!("   {:?}", outcome?);
        }
    }
    println!("   features on layer: {}", layer.len());
    print_status(&registry, DomainKey::Map);
    print_status(&registry, DomainKey::Layout);

    // Ctrl+Y once
    println!("\n↪️  Ctrl+Y on the map");
    if let Some(outcome) = triggers.handle_chord(DomainKey::Map, KeyChord::ctrl('y')).await {
        println!("   {:?}", outcome?);
    }
    println!("   features on layer: {}", layer.len());

    // Start a drawing, then cancel it with undo
    println!("\n🚫 Start drawing, then cancel");
    draw.begin("Draw line", || println!("   (overlay discarded)"))
        .await?;
    draw.abort().await?;
    print_status(&registry, DomainKey::Map);

    // New project: history goes away without touching the surface
    println!("\n📂 Loading a new project");
    registry.clear_all();
    for key in DomainKey::ALL {
        print_status(&registry, key);
    }
    let _ = triggers.handle_chord(DomainKey::Map, KeyChord::ctrl('z')).await;

    println!("\n🔔 Notifications:");
    for notification in drain(&mut notification_rx) {
        let shown = if notification.is_recent(NOTIFICATION_TOAST_MS) {
            "toast"
        } else {
            "log only"
        };
        println!(
            "   {:?}: {} ({})",
            notification.level, notification.message, shown
        );
    }

    println!("\n✅ Demo finished");
    Ok(())
}
