//! Basic CRUD operations: create, get, search, update, batch create, list
//! and delete memories.
//!
//! ```text
//! export RECALLBRICKS_API_KEY='rb_live_your_key_here'
//! cargo run -p recallbricks --example basic_crud
//! ```
//!
//! Set `RECALLBRICKS_BASE_URL=http://localhost:8787` to run it against
//! `recallbricks-local`.

use recallbricks::{
    Client, CreateMemory, ListOptions, SearchOptions, SortOrder, UpdateMemory,
};
use serde_json::json;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    if let Err(error) = run().await {
        println!("❌ Error: {error}");
        if let Some(code) = error.code() {
            println!("   Code: {code}");
        }
        std::process::exit(1);
    }
}

async fn run() -> recallbricks::Result<()> {
    let rb = Client::from_env()?;
    let memories = rb.memories();

    println!("🧱 RecallBricks Basic CRUD Example\n");

    // CREATE
    println!("1. Creating memories...");

    let memory1 = memories
        .create(
            "User prefers dark mode interface",
            json!({"category": "user_preferences", "importance": "high", "user_id": "user_123"}),
        )
        .await?;
    println!("✓ Created memory: {}", memory1.id);

    let memory2 = memories
        .create(
            "User timezone is PST (UTC-8)",
            json!({"category": "user_preferences", "importance": "medium", "user_id": "user_123"}),
        )
        .await?;
    println!("✓ Created memory: {}", memory2.id);

    let memory3 = memories
        .create(
            "User last logged in from San Francisco",
            json!({
                "category": "user_activity",
                "importance": "low",
                "user_id": "user_123",
                "location": "San Francisco, CA"
            }),
        )
        .await?;
    println!("✓ Created memory: {}\n", memory3.id);

    // READ
    println!("2. Retrieving memory by ID...");

    let retrieved = memories.get(&memory1.id).await?;
    println!("✓ Retrieved: \"{}\"", retrieved.content);
    println!("  Category: {}", retrieved.meta_str("category").unwrap_or("-"));
    println!("  Created: {}\n", retrieved.created_at);

    // SEARCH
    println!("3. Searching memories...");

    let search_results = memories
        .search(
            "user preferences and settings",
            SearchOptions::new()
                .limit(5)
                .weights(0.7, 0.3)
                .metadata(json!({"user_id": "user_123"}))
                .min_score(0.7),
        )
        .await?;
    println!("✓ Found {} results:", search_results.len());
    for (index, result) in search_results.iter().enumerate() {
        println!("  {}. \"{}\"", index + 1, result.memory.content);
        println!(
            "     Score: {:.3} (semantic: {:.3}, recency: {:.3})",
            result.score, result.semantic_score, result.recency_score
        );
    }
    println!();

    // UPDATE
    println!("4. Updating memory...");

    let updated = memories
        .update(
            &memory1.id,
            UpdateMemory::default()
                .content("User strongly prefers dark mode interface with high contrast")
                .metadata(json!({
                    "importance": "critical",
                    "last_confirmed": chrono::Utc::now().to_rfc3339()
                })),
        )
        .await?;
    println!("✓ Updated memory: {}", updated.id);
    println!("  New content: \"{}\"", updated.content);
    println!(
        "  New importance: {}\n",
        updated.meta_str("importance").unwrap_or("-")
    );

    // BATCH CREATE
    println!("5. Batch creating memories...");

    let notifications = json!({"category": "notifications", "user_id": "user_123"});
    let batch = memories
        .create_batch(vec![
            CreateMemory::new("User prefers email notifications", notifications.clone()),
            CreateMemory::new("User disabled SMS alerts", notifications.clone()),
            CreateMemory::new("User subscribed to weekly digest", notifications),
        ])
        .await?;
    println!("✓ Created {} memories in batch\n", batch.len());

    // LIST
    println!("6. Listing all memories...");

    let page = memories
        .list(
            ListOptions::new()
                .page(1)
                .limit(10)
                .sort(SortOrder::CreatedDesc),
        )
        .await?;
    println!("✓ Total memories: {}", page.pagination.total);
    println!("  Showing {} of {}", page.data.len(), page.pagination.total);
    println!(
        "  Page {} of {}\n",
        page.pagination.page, page.pagination.total_pages
    );

    // DELETE
    println!("7. Deleting memory...");

    memories.delete(&memory3.id).await?;
    println!("✓ Deleted memory: {}\n", memory3.id);

    // VERIFY
    println!("8. Verifying deletion...");

    match memories.get(&memory3.id).await {
        Ok(_) => println!("✗ Memory still exists (unexpected)"),
        Err(error) if error.code() == Some("MEMORY_NOT_FOUND") => {
            println!("✓ Memory successfully deleted\n");
        }
        Err(error) => return Err(error),
    }

    println!("✅ Basic CRUD operations completed successfully!");
    println!("\nKey takeaways:");
    println!("  • Use create() for single memories, create_batch() for multiple");
    println!("  • search() provides semantic search with customizable weighting");
    println!("  • Metadata enables powerful filtering and organization");
    println!("  • update() merges new data with existing metadata");
    println!("  • All operations return structured, typed values");

    Ok(())
}
