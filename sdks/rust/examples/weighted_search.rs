//! Weighted search: how the semantic/recency blend changes which memories
//! rank first, and when to use which strategy.
//!
//! ```text
//! cargo run -p recallbricks --example weighted_search
//! ```

use std::time::Duration;

use recallbricks::{Client, CreateMemory, SearchOptions, SearchResult, SearchWeights};
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

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn print_scored(results: &[SearchResult]) {
    for (index, result) in results.iter().enumerate() {
        println!("  {}. \"{}...\"", index + 1, preview(&result.memory.content, 60));
        println!("     Total Score: {:.3}", result.score);
        println!(
            "     Semantic: {:.3}, Recency: {:.3}\n",
            result.semantic_score, result.recency_score
        );
    }
}

fn print_contents(results: &[SearchResult]) {
    for (index, result) in results.iter().enumerate() {
        println!("  {}. {}", index + 1, result.memory.content);
    }
    println!();
}

async fn run() -> recallbricks::Result<()> {
    let rb = Client::from_env()?;
    let memories = rb.memories();

    println!("⚖️  RecallBricks Weighted Search Example\n");

    // Setup: memories of different ages
    println!("Setting up test memories...\n");

    memories
        .create(
            "Comprehensive guide to API authentication with detailed examples and security best practices",
            json!({"category": "documentation", "type": "comprehensive"}),
        )
        .await?;

    tokio::time::sleep(Duration::from_secs(2)).await;

    memories
        .create(
            "Quick tip: Use Bearer tokens for API auth",
            json!({"category": "documentation", "type": "quick_tip"}),
        )
        .await?;

    println!("✓ Created old (comprehensive) and recent (quick tip) memories\n");

    println!("1. Semantic-Heavy Search (Best for: Documentation, Research)\n");
    let semantic_results = memories
        .search(
            "API authentication guide",
            SearchOptions::new().weights(0.9, 0.1).limit(5),
        )
        .await?;
    println!("Results (prioritizing semantic match):");
    print_scored(&semantic_results);

    println!("2. Recency-Heavy Search (Best for: News, Activity, Trends)\n");
    let recency_results = memories
        .search(
            "API authentication",
            SearchOptions::new().weights(0.2, 0.8).limit(5),
        )
        .await?;
    println!("Results (prioritizing recent):");
    print_scored(&recency_results);

    println!("3. Balanced Search (Best for: General queries)\n");
    let balanced_results = memories
        .search(
            "API authentication",
            SearchOptions::new().weights(0.5, 0.5).limit(5),
        )
        .await?;
    println!("Results (balanced approach):");
    print_scored(&balanced_results);

    println!("4. AI-Optimized Weights\n");
    let patterns = rb.metacognition().get_patterns().await?;
    let optimal = patterns.query_patterns.optimal_weights;
    println!("AI-Learned Optimal Weights:");
    println!("  Semantic: {}", optimal.semantic);
    println!("  Recency: {}\n", optimal.recency);

    let optimized_results = memories
        .search(
            "API authentication",
            SearchOptions::new()
                .weights(optimal.semantic, optimal.recency)
                .limit(5),
        )
        .await?;
    println!("Results (using AI-learned weights):");
    for (index, result) in optimized_results.iter().enumerate() {
        println!("  {}. \"{}...\"", index + 1, preview(&result.memory.content, 60));
        println!("     Score: {:.3}\n", result.score);
    }

    println!("5. Real-World Use Case: News Feed\n");
    memories
        .create_batch(vec![
            CreateMemory::new(
                "Breaking: AI model GPT-5 announced today",
                json!({"category": "news", "type": "breaking"}),
            ),
            CreateMemory::new(
                "Historical overview of AI development from 1950s to today",
                json!({"category": "news", "type": "evergreen"}),
            ),
        ])
        .await?;
    let news = memories
        .search(
            "AI news",
            SearchOptions::new()
                .weights(0.3, 0.7)
                .metadata(json!({"category": "news"})),
        )
        .await?;
    println!("News Feed (recent news first):");
    print_contents(&news);

    println!("6. Real-World Use Case: Documentation Search\n");
    memories
        .create_batch(vec![
            CreateMemory::new(
                "API Rate Limits: Detailed explanation of all tiers",
                json!({"category": "docs", "type": "comprehensive"}),
            ),
            CreateMemory::new(
                "Rate limit update: Tier 3 now 200 req/sec (updated yesterday)",
                json!({"category": "docs", "type": "update"}),
            ),
        ])
        .await?;
    let docs = memories
        .search(
            "rate limits",
            SearchOptions::new()
                .weights(0.85, 0.15)
                .metadata(json!({"category": "docs"})),
        )
        .await?;
    println!("Documentation (comprehensive first):");
    print_contents(&docs);

    println!("7. Real-World Use Case: User Activity\n");
    memories
        .create_batch(vec![
            CreateMemory::new(
                "User viewed pricing page",
                json!({"category": "activity", "user_id": "user_123"}),
            ),
            CreateMemory::new(
                "User signed up 3 months ago",
                json!({"category": "activity", "user_id": "user_123"}),
            ),
        ])
        .await?;
    let activity = memories
        .search(
            "user activity",
            SearchOptions::new()
                .weights(0.2, 0.8)
                .metadata(json!({"user_id": "user_123"})),
        )
        .await?;
    println!("User Activity (recent first):");
    print_contents(&activity);

    println!("8. Strategy Comparison\n");
    let strategies = [
        ("Semantic-Heavy", SearchWeights::new(0.9, 0.1)),
        ("Balanced", SearchWeights::new(0.5, 0.5)),
        ("Recency-Heavy", SearchWeights::new(0.1, 0.9)),
    ];
    for (name, weights) in strategies {
        let results = memories
            .search(
                "authentication guide",
                SearchOptions::new()
                    .weights(weights.semantic, weights.recency)
                    .limit(1),
            )
            .await?;
        println!("{name}:");
        println!(
            "  Weights: Semantic {}, Recency {}",
            weights.semantic, weights.recency
        );
        if let Some(top) = results.first() {
            println!("  Top Result: \"{}...\"", preview(&top.memory.content, 50));
            println!("  Score: {:.3}\n", top.score);
        }
    }

    println!("✅ Weighted Search Example Completed!\n");
    println!("Key takeaways:");
    println!("  • Semantic-heavy (0.9/0.1): Best for docs, research, theory");
    println!("  • Recency-heavy (0.1/0.9): Best for news, activity, trends");
    println!("  • Balanced (0.5/0.5): Good default for general queries");
    println!("  • AI-optimized: Let RecallBricks learn optimal weights");
    println!("  • Different use cases need different strategies");
    println!("  • Weights dramatically affect which results rank highest");

    Ok(())
}
